//! The serialization contract (spec §6): a plain, JSON-shaped
//! representation of a digest's centroids and budget.
//!
//! These types carry no validation of their own — [`crate::TDigest::from_dict`]
//! is where `c > 0` and finiteness are checked, so that a malformed
//! dict produces a proper [`crate::error::Error::MalformedInput`] rather
//! than a panic deep in reconstruction.

/// One centroid in the wire representation: `{ "m": mean, "c": weight }`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CentroidDict {
    /// The centroid's mean.
    pub m: f64,
    /// The centroid's weight; must be positive and finite.
    pub c: f64,
}

/// The wire representation of a whole digest.
///
/// `max_centroids` is `None` for an unbounded digest — this is also
/// what a missing or `null` field deserializes to, per spec §6.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DigestDict {
    /// The digest's centroid budget, or `None` for unbounded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_centroids: Option<u32>,
    /// The digest's centroids, in no particular required order — loading
    /// sorts them.
    pub centroids: Vec<CentroidDict>,
}
