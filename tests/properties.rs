// Universal invariants and round-trip/idempotence properties.

use tdigest_core::{Budget, TDigest};

#[test]
fn centroid_count_never_exceeds_the_budget() {
    for &cap in &[1u32, 2, 3, 5, 16, 64] {
        let budget = Budget::bounded(cap).unwrap();
        let digest = TDigest::from_values(0..2000, budget).unwrap();
        assert!(
            digest.n_centroids() <= cap as usize,
            "cap={cap} got={}",
            digest.n_centroids()
        );
    }
}

#[test]
fn total_weight_matches_observation_count() {
    let budget = Budget::bounded(20).unwrap();
    let digest = TDigest::from_values(0..777, budget).unwrap();
    assert_eq!(digest.n_values(), 777.0);
}

#[test]
fn centroid_means_are_non_decreasing() {
    let budget = Budget::bounded(20).unwrap();
    let digest = TDigest::from_values((-500..500).rev(), budget).unwrap();
    let dict = digest.to_dict();
    assert!(dict.centroids.windows(2).all(|w| w[0].m <= w[1].m));
}

#[test]
fn quantiles_stay_within_the_observed_range() {
    let budget = Budget::bounded(10).unwrap();
    let digest = TDigest::from_values(-37..463, budget).unwrap();
    let min = digest.min().unwrap();
    let max = digest.max().unwrap();
    let mut q = 0.0;
    while q <= 1.0 {
        let v = digest.quantile(q).unwrap();
        assert!(v >= min - 1e-9 && v <= max + 1e-9, "q={q} v={v}");
        q += 0.05;
    }
}

#[test]
fn min_max_mean_are_exact_under_ingestion() {
    let values = [3.0, -7.5, 42.0, 0.0, -1000.25, 6.0];
    let budget = Budget::bounded(3).unwrap();
    let digest = TDigest::from_values(values, budget).unwrap();
    assert_eq!(digest.min().unwrap(), -1000.25);
    assert_eq!(digest.max().unwrap(), 42.0);
    let expected_mean = values.iter().sum::<f64>() / values.len() as f64;
    assert_eq!(digest.mean().unwrap(), expected_mean);
}

#[test]
fn from_dict_of_to_dict_is_equal() {
    let budget = Budget::bounded(5).unwrap();
    let digest = TDigest::from_values(0..300, budget).unwrap();
    let roundtripped = TDigest::from_dict(digest.to_dict()).unwrap();
    assert_eq!(roundtripped, digest);
}

#[test]
fn compress_is_idempotent() {
    let mut digest = TDigest::from_values(0..=1000, Budget::Unbounded).unwrap();
    digest.compress(10).unwrap();
    let after_first = digest.to_dict();
    digest.compress(10).unwrap();
    assert_eq!(digest.to_dict(), after_first);
}

#[test]
fn merge_is_commutative_up_to_reassociation() {
    let budget = Budget::bounded(8).unwrap();
    let a = TDigest::from_values(0..150, budget).unwrap();
    let b = TDigest::from_values(150..301, budget).unwrap();

    let ab = a.merge(&b);
    let ba = b.merge(&a);

    for q in [0.1, 0.25, 0.5, 0.75, 0.9] {
        let left = ab.quantile(q).unwrap();
        let right = ba.quantile(q).unwrap();
        assert!((left - right).abs() < 1e-9, "q={q} left={left} right={right}");
    }
}

#[test]
fn merge_is_associative_up_to_reassociation() {
    let budget = Budget::bounded(8).unwrap();
    let a = TDigest::from_values(0..100, budget).unwrap();
    let b = TDigest::from_values(100..200, budget).unwrap();
    let c = TDigest::from_values(200..301, budget).unwrap();

    let left_first = a.merge(&b).merge(&c);
    let right_first = a.merge(&b.merge(&c));

    for q in [0.1, 0.25, 0.5, 0.75, 0.9] {
        let l = left_first.quantile(q).unwrap();
        let r = right_first.quantile(q).unwrap();
        assert!((l - r).abs() < 1e-6, "q={q} l={l} r={r}");
    }
}
