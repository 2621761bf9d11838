#![warn(missing_docs)]
#![cfg_attr(doc, feature(doc_auto_cfg))]

//! A Rust library for approximate rank/quantile statistics over
//! unbounded streams of real-valued observations, using a
//! scale-function-bounded [t-digest][Dunning19] data structure.
//!
//! A t-digest is a compact, mergeable summary of a stream: it supports
//! online ingestion, lossless merging of independently built digests,
//! and estimation of quantiles, cumulative probabilities, and trimmed
//! means. Accuracy is biased toward the distribution tails, where the
//! [`scale`] module's scale function keeps centroids small.
//!
//! [Dunning19]: https://github.com/tdunning/t-digest/blob/main/docs/t-digest-paper/histo.pdf
//!
//! # Examples
//!
//! ```
//! use tdigest_core::TDigest;
//!
//! let mut digest = TDigest::new();
//!
//! digest.update(1.0).unwrap();
//! digest.update(2.0).unwrap();
//! digest.update(3.0).unwrap();
//!
//! assert_eq!(digest.quantile(0.5).unwrap(), 2.0);
//! ```
//!
//! # Reconstruction from a dict is lossy
//!
//! [`TDigest::to_dict`]/[`TDigest::from_dict`] round-trip the centroid
//! list and budget, but not the raw ingestion history. After
//! `from_dict`, [`TDigest::mean`] is computed from `sum(mean * weight)`
//! over the reconstructed centroids rather than from the original
//! values, so it is only exact when every centroid happens to be a
//! singleton. This is documented behavior, not a bug — see `DESIGN.md`.

mod centroid;
mod dict;
mod digest;
mod error;
mod merge;
mod query;
mod scale;

pub use centroid::{Centroid, CentroidStore};
pub use dict::{CentroidDict, DigestDict};
pub use digest::{merge_all, TDigest, TDigestBuilder};
pub use error::{Error, Result};
pub use scale::Budget;
