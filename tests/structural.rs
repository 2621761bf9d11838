// Source of approach: snaury/tdigest-go's tdigest_test.go digest_10/
// digest_1_000_000 cases, adapted to this crate's f64/error-returning API
// (expected quantiles recomputed for the piecewise-linear interpolation
// scheme here, not ported from the ClickHouse-scale-function original).

use tdigest_core::TDigest;

#[test]
fn digest_10() {
    let mut digest = TDigest::new();
    digest.extend((1u8..=10).map(f64::from));
    assert_eq!(digest.len(), 10);

    for (quantile, expected) in [(0.0, 1.0), (0.1, 1.5), (0.5, 5.5), (0.9, 9.5), (1.0, 10.0)] {
        assert_eq!(digest.quantile(quantile).unwrap(), expected, "q={quantile}");
    }
}

#[test]
fn digest_1_000_000() {
    let mut digest = TDigest::new();
    digest.extend((1u32..=1_000_000).map(f64::from));
    assert_eq!(digest.len(), 1_000_000);

    for (quantile, expected) in [
        (0.0, 1.0),
        (0.1, 100_000.5),
        (0.5, 500_000.5),
        (0.9, 900_000.5),
        (1.0, 1_000_000.0),
    ] {
        assert_eq!(digest.quantile(quantile).unwrap(), expected, "q={quantile}");
    }
}

#[test]
fn negative_values_round_trip_through_the_median() {
    let digest = TDigest::from([-1.0, -2.0, -3.0]);
    assert_eq!(digest.quantile(0.5).unwrap(), -2.0);
}

#[test]
fn repeated_values_collapse_to_one_centroid_unbounded() {
    let values = [1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 3.0];
    let digest = TDigest::from_iter(values.iter().copied());
    assert_eq!(digest.quantile(0.5).unwrap(), 2.0);
    assert_eq!(digest.n_values(), values.len() as f64);
    assert_eq!(digest.n_centroids(), 3);
}
