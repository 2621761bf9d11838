#![cfg(feature = "serde")]

use tdigest_core::{Budget, DigestDict, TDigest};

#[test]
fn dict_round_trips_through_json() {
    let budget = Budget::bounded(16).unwrap();
    let digest = TDigest::from_values(0..=200, budget).unwrap();

    let dict = digest.to_dict();
    let json = serde_json::to_string(&dict).unwrap();
    let restored_dict: DigestDict = serde_json::from_str(&json).unwrap();
    let restored = TDigest::from_dict(restored_dict).unwrap();

    assert_eq!(restored, digest);
    assert_eq!(restored.quantile(0.0).unwrap(), digest.quantile(0.0).unwrap());
    assert_eq!(restored.quantile(1.0).unwrap(), digest.quantile(1.0).unwrap());
}

#[test]
fn dict_omits_max_centroids_when_unbounded() {
    let digest = TDigest::from_iter([1.0, 2.0, 3.0]);
    let dict = digest.to_dict();
    assert_eq!(dict.max_centroids, None);

    let json = serde_json::to_string(&dict).unwrap();
    let restored: DigestDict = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.max_centroids, None);
}

#[test]
fn malformed_dict_is_rejected() {
    let bad = DigestDict {
        max_centroids: None,
        centroids: vec![tdigest_core::CentroidDict { m: 1.0, c: 0.0 }],
    };
    assert!(TDigest::from_dict(bad).is_err());

    let bad_mean = DigestDict {
        max_centroids: None,
        centroids: vec![tdigest_core::CentroidDict {
            m: f64::NAN,
            c: 1.0,
        }],
    };
    assert!(TDigest::from_dict(bad_mean).is_err());
}
