use std::ops::{BitOr, BitOrAssign};

use crate::centroid::{Centroid, CentroidStore};
use crate::dict::{CentroidDict, DigestDict};
use crate::error::{Error, Result};
use crate::merge::merge_pass;
use crate::query;
use crate::scale::Budget;

/// A `TDigestBuilder` can be used to create a [`TDigest`] with custom
/// configuration.
///
/// # Examples
///
/// ```
/// use tdigest_core::{TDigest, Budget};
///
/// let digest = TDigest::builder()
///     .max_centroids(128)
///     .unwrap()
///     .build();
/// assert_eq!(digest.max_centroids(), Budget::bounded(128).unwrap());
/// ```
#[derive(Debug)]
pub struct TDigestBuilder {
    max_centroids: Budget,
}

impl TDigestBuilder {
    /// Constructs a new `TDigestBuilder`, defaulting to an unbounded budget.
    ///
    /// This is the same as `TDigest::builder()`.
    pub fn new() -> Self {
        Self {
            max_centroids: Budget::Unbounded,
        }
    }

    /// Sets the centroid budget. Fails if `max_centroids` is zero.
    pub fn max_centroids(&mut self, max_centroids: u32) -> Result<&mut Self> {
        self.max_centroids = Budget::bounded(max_centroids)
            .ok_or_else(|| Error::domain("max_centroids", "must be positive"))?;
        Ok(self)
    }

    /// Sets the centroid budget directly from a [`Budget`].
    pub fn budget(&mut self, budget: Budget) -> &mut Self {
        self.max_centroids = budget;
        self
    }

    /// Returns a [`TDigest`] using this builder's configuration.
    #[must_use]
    pub fn build(&self) -> TDigest {
        TDigest {
            centroids: CentroidStore::new(),
            total_weight: 0.0,
            min_value: None,
            max_value: None,
            sum_value: 0.0,
            max_centroids: self.max_centroids,
        }
    }
}

impl Default for TDigestBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// A t-digest: a compact, mergeable summary of a stream of real-valued
/// observations, supporting approximate quantile/CDF queries with
/// accuracy biased toward the distribution tails.
///
/// # Examples
///
/// ```
/// use tdigest_core::TDigest;
///
/// let mut digest = TDigest::new();
/// digest.update(1.0).unwrap();
/// digest.update(2.0).unwrap();
/// digest.update(3.0).unwrap();
///
/// assert_eq!(digest.quantile(0.5).unwrap(), 2.0);
/// ```
#[derive(Clone, Debug)]
pub struct TDigest {
    centroids: CentroidStore,
    total_weight: f64,
    min_value: Option<f64>,
    max_value: Option<f64>,
    sum_value: f64,
    max_centroids: Budget,
}

impl TDigest {
    /// Creates an empty, unbounded `TDigest`.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty `TDigest` bounded to `max_centroids` centroids.
    ///
    /// Fails with [`Error::Domain`] if `max_centroids` is zero.
    pub fn with_max_centroids(max_centroids: u32) -> Result<Self> {
        let budget = Budget::bounded(max_centroids)
            .ok_or_else(|| Error::domain("max_centroids", "must be positive"))?;
        Ok(Self::builder().budget(budget).build())
    }

    /// Creates a `TDigestBuilder` to configure a `TDigest`.
    ///
    /// This is the same as `TDigestBuilder::new()`.
    #[inline]
    #[must_use]
    pub fn builder() -> TDigestBuilder {
        TDigestBuilder::new()
    }

    /// Builds a `TDigest` from a batch of values under the given budget.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdigest_core::{TDigest, Budget};
    ///
    /// let digest = TDigest::from_values(0..=100, Budget::bounded(3).unwrap()).unwrap();
    /// assert_eq!(digest.n_centroids(), 3);
    /// assert_eq!(digest.min().unwrap(), 0.0);
    /// assert_eq!(digest.max().unwrap(), 100.0);
    /// ```
    pub fn from_values<I, T>(values: I, max_centroids: Budget) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<f64>,
    {
        let mut digest = Self::builder().budget(max_centroids).build();
        let values: Vec<f64> = values.into_iter().map(Into::into).collect();
        digest.batch_update(&values)?;
        Ok(digest)
    }

    /// Adds a single observation.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdigest_core::TDigest;
    ///
    /// let mut digest = TDigest::new();
    /// digest.update(1.0).unwrap();
    /// assert_eq!(digest.n_values(), 1.0);
    /// ```
    pub fn update(&mut self, value: f64) -> Result<()> {
        self.batch_update(&[value])
    }

    /// Adds a batch of observations.
    ///
    /// No-op on an empty slice. Rejects NaN with [`Error::Domain`];
    /// infinities are accepted and propagate into min/max/mean per
    /// IEEE-754. On failure, the digest is left completely unchanged
    /// (no partial mutation).
    pub fn batch_update(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        for &v in values {
            if v.is_nan() {
                return Err(Error::domain("value", "NaN is not a valid observation"));
            }
        }

        let mut min_candidate = self.min_value;
        let mut max_candidate = self.max_value;
        let mut sum_candidate = self.sum_value;
        let mut total_candidate = self.total_weight;
        for &v in values {
            min_candidate = Some(min_candidate.map_or(v, |m| m.min(v)));
            max_candidate = Some(max_candidate.map_or(v, |m| m.max(v)));
            sum_candidate += v;
            total_candidate += 1.0;
        }

        let mut sources: Vec<Centroid> = self.centroids.iter().copied().collect();
        sources.extend(values.iter().map(|&v| Centroid::singleton(v)));
        let merged = merge_pass(sources, self.max_centroids, min_candidate, max_candidate);

        self.centroids.replace(merged);
        self.total_weight = total_candidate;
        self.sum_value = sum_candidate;
        self.min_value = min_candidate;
        self.max_value = max_candidate;
        Ok(())
    }

    /// Returns a new digest that is the union of `self` and `other`.
    ///
    /// The result's budget is `max(self.max_centroids(), other.max_centroids())`,
    /// with [`Budget::Unbounded`] dominating any integer budget.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdigest_core::{TDigest, Budget};
    ///
    /// let a = TDigest::from_values(0..50, Budget::bounded(3).unwrap()).unwrap();
    /// let b = TDigest::from_values(50..101, Budget::bounded(3).unwrap()).unwrap();
    /// let merged = a.merge(&b);
    /// assert_eq!(merged.n_values(), 101.0);
    /// assert_eq!(merged.min().unwrap(), 0.0);
    /// assert_eq!(merged.max().unwrap(), 100.0);
    /// ```
    #[must_use]
    pub fn merge(&self, other: &TDigest) -> TDigest {
        let budget = self.max_centroids.dominant(other.max_centroids);
        let (centroids, total_weight, sum_value, min_value, max_value) =
            Self::combine(self, other, budget);
        TDigest {
            centroids: CentroidStore::default_with(centroids),
            total_weight,
            sum_value,
            min_value,
            max_value,
            max_centroids: budget,
        }
    }

    /// Merges `other` into `self` in place.
    ///
    /// Unlike [`TDigest::merge`], `self`'s configured `max_centroids` is
    /// left unchanged by this operation (both as the compression budget
    /// used for the pass, and as the resulting property) — this is the
    /// one deliberate reading of an ambiguity in the merge contract,
    /// recorded in `DESIGN.md`: using a borrowed, larger budget here
    /// could leave more centroids than `self.max_centroids()` permits,
    /// breaking the size invariant on the next query.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdigest_core::TDigest;
    ///
    /// let mut a = TDigest::from_iter([1.0, 2.0, 3.0]);
    /// let b = TDigest::from_iter([3.0, 4.0, 5.0]);
    /// a.merge_inplace(&b);
    /// assert_eq!(a.n_values(), 6.0);
    /// ```
    pub fn merge_inplace(&mut self, other: &TDigest) {
        let budget = self.max_centroids;
        let (centroids, total_weight, sum_value, min_value, max_value) =
            Self::combine(self, other, budget);
        self.centroids.replace(centroids);
        self.total_weight = total_weight;
        self.sum_value = sum_value;
        self.min_value = min_value;
        self.max_value = max_value;
    }

    fn combine(
        a: &TDigest,
        b: &TDigest,
        budget: Budget,
    ) -> (Vec<Centroid>, f64, f64, Option<f64>, Option<f64>) {
        let total_weight = a.total_weight + b.total_weight;
        let sum_value = a.sum_value + b.sum_value;
        let min_value = match (a.min_value, b.min_value) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        };
        let max_value = match (a.max_value, b.max_value) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        };
        let mut sources: Vec<Centroid> = a.centroids.iter().copied().collect();
        sources.extend(b.centroids.iter().copied());
        let centroids = merge_pass(sources, budget, min_value, max_value);
        (centroids, total_weight, sum_value, min_value, max_value)
    }

    /// Recompresses `self` under a temporary budget of
    /// `max(max_centroids, min(total_weight, 3))`, then restores the
    /// digest's originally configured budget. The floor of three
    /// anchors guarantees non-trivial digests keep at least enough
    /// centroids for quantile interpolation to be meaningful.
    ///
    /// Calling `compress(k)` twice in a row with the same `k` leaves the
    /// centroid list unchanged (idempotent).
    pub fn compress(&mut self, max_centroids: u32) -> Result<()> {
        if max_centroids == 0 {
            return Err(Error::domain("max_centroids", "must be positive"));
        }
        let floor = self.total_weight.min(3.0).max(0.0) as u32;
        let effective = max_centroids.max(floor).max(1);
        let temp_budget = Budget::bounded(effective)
            .expect("effective is at least 1, so Budget::bounded never returns None");

        let original = self.max_centroids;
        self.max_centroids = temp_budget;
        let sources: Vec<Centroid> = self.centroids.iter().copied().collect();
        let merged = merge_pass(sources, temp_budget, self.min_value, self.max_value);
        self.centroids.replace(merged);
        self.max_centroids = original;
        Ok(())
    }

    /// The digest's configured centroid budget.
    #[must_use]
    pub fn max_centroids(&self) -> Budget {
        self.max_centroids
    }

    /// Updates the digest's configured centroid budget.
    ///
    /// This does not itself trigger compression — the new budget is
    /// enforced starting with the next mutating operation (`update`,
    /// `batch_update`, `merge_inplace`), or immediately via an explicit
    /// call to `compress`.
    pub fn set_max_centroids(&mut self, max_centroids: Budget) {
        self.max_centroids = max_centroids;
    }

    /// The number of observations ingested (exact).
    #[must_use]
    pub fn n_values(&self) -> f64 {
        self.total_weight
    }

    /// The number of centroids currently stored.
    #[must_use]
    pub fn n_centroids(&self) -> usize {
        self.centroids.len()
    }

    /// Alias for [`TDigest::n_centroids`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_centroids()
    }

    /// Whether the digest has ingested no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0.0
    }

    /// The exact minimum value ingested. Fails with [`Error::EmptyDigest`]
    /// when empty.
    pub fn min(&self) -> Result<f64> {
        self.min_value.ok_or(Error::EmptyDigest)
    }

    /// The exact maximum value ingested. Fails with [`Error::EmptyDigest`]
    /// when empty.
    pub fn max(&self) -> Result<f64> {
        self.max_value.ok_or(Error::EmptyDigest)
    }

    /// The exact arithmetic mean, `sum_value / total_weight`. Fails with
    /// [`Error::EmptyDigest`] when empty.
    ///
    /// Exact when computed via ingestion. If `self` was reconstructed
    /// via [`TDigest::from_dict`], this is only as exact as the
    /// centroids it was built from (see the module docs).
    pub fn mean(&self) -> Result<f64> {
        if self.total_weight == 0.0 {
            return Err(Error::EmptyDigest);
        }
        Ok(self.sum_value / self.total_weight)
    }

    /// The estimated value at cumulative probability `q` (`q` in `[0, 1]`).
    pub fn quantile(&self, q: f64) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::EmptyDigest);
        }
        query::quantile(
            q,
            self.centroids.as_slice(),
            self.total_weight,
            self.min_value.unwrap(),
            self.max_value.unwrap(),
        )
    }

    /// The estimated value at percentile `p` (`p` in `[0, 100]`).
    pub fn percentile(&self, p: f64) -> Result<f64> {
        self.quantile(p / 100.0)
    }

    /// The estimated median, `quantile(0.5)`.
    pub fn median(&self) -> Result<f64> {
        self.quantile(0.5)
    }

    /// The estimated interquartile range, `quantile(0.75) - quantile(0.25)`.
    pub fn iqr(&self) -> Result<f64> {
        Ok(self.quantile(0.75)? - self.quantile(0.25)?)
    }

    /// The estimated cumulative probability that an observation is `<= x`.
    pub fn cdf(&self, x: f64) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::EmptyDigest);
        }
        query::cdf(
            x,
            self.centroids.as_slice(),
            self.total_weight,
            self.min_value.unwrap(),
            self.max_value.unwrap(),
        )
    }

    /// The estimated probability mass in `[x1, x2]`, `cdf(x2) - cdf(x1)`.
    ///
    /// Fails with [`Error::Domain`] if `x1 > x2`.
    pub fn probability(&self, x1: f64, x2: f64) -> Result<f64> {
        if x1 > x2 {
            return Err(Error::domain("x1/x2", "require x1 <= x2"));
        }
        Ok(self.cdf(x2)? - self.cdf(x1)?)
    }

    /// The mean of values whose cumulative rank lies in `[q1, q2]`.
    ///
    /// Fails with [`Error::Domain`] unless `0 <= q1 < q2 <= 1`, and with
    /// [`Error::EmptyDigest`] when empty.
    pub fn trimmed_mean(&self, q1: f64, q2: f64) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::EmptyDigest);
        }
        query::trimmed_mean(q1, q2, self.centroids.as_slice(), self.total_weight)
    }

    /// Converts the digest into its serializable dict form (spec §6).
    #[must_use]
    pub fn to_dict(&self) -> DigestDict {
        DigestDict {
            max_centroids: self.max_centroids.as_u32(),
            centroids: self
                .centroids
                .iter()
                .map(|c| CentroidDict {
                    m: c.mean,
                    c: c.weight,
                })
                .collect(),
        }
    }

    /// Reconstructs a digest from its dict form.
    ///
    /// The input centroid list need not be sorted. `min_value`/`max_value`
    /// are taken as the smallest/largest centroid means, `sum_value` as
    /// `sum(m * c)`, and `total_weight` as `sum(c)` — these are the best
    /// possible reconstructions from a lossy representation. `mean()` on
    /// the result is therefore only exact when every centroid is a
    /// singleton.
    ///
    /// Fails with [`Error::MalformedInput`] if any weight is non-finite
    /// or non-positive, or any mean is non-finite.
    pub fn from_dict(dict: DigestDict) -> Result<Self> {
        let max_centroids = match dict.max_centroids {
            None => Budget::Unbounded,
            Some(n) => Budget::bounded(n)
                .ok_or_else(|| Error::malformed("max_centroids must be positive"))?,
        };

        let mut centroids: Vec<Centroid> = Vec::with_capacity(dict.centroids.len());
        let mut sum_value = 0.0;
        let mut total_weight = 0.0;
        let mut min_value: Option<f64> = None;
        let mut max_value: Option<f64> = None;
        for entry in &dict.centroids {
            if !entry.m.is_finite() {
                return Err(Error::malformed("centroid mean must be finite"));
            }
            if !(entry.c.is_finite() && entry.c > 0.0) {
                return Err(Error::malformed("centroid weight must be finite and positive"));
            }
            sum_value += entry.m * entry.c;
            total_weight += entry.c;
            min_value = Some(min_value.map_or(entry.m, |m: f64| m.min(entry.m)));
            max_value = Some(max_value.map_or(entry.m, |m: f64| m.max(entry.m)));
            centroids.push(Centroid::new(entry.m, entry.c));
        }
        centroids.sort_by(crate::centroid::cmp_by_mean);

        Ok(TDigest {
            centroids: CentroidStore::default_with(centroids),
            total_weight,
            sum_value,
            min_value,
            max_value,
            max_centroids,
        })
    }
}

impl Default for TDigest {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TDigest {
    /// Two digests are equal iff their centroid lists match element-wise
    /// under IEEE-754 equality and their `max_centroids` settings agree.
    /// This is strict equality, not approximate — approximate comparison
    /// is left to the caller.
    fn eq(&self, other: &Self) -> bool {
        self.max_centroids == other.max_centroids && self.centroids == other.centroids
    }
}

impl BitOr<&TDigest> for &TDigest {
    type Output = TDigest;

    /// Returns the union of `self` and `rhs` as a new `TDigest`. Same as
    /// [`TDigest::merge`].
    fn bitor(self, rhs: &TDigest) -> TDigest {
        self.merge(rhs)
    }
}

impl BitOrAssign<&TDigest> for TDigest {
    /// Merges `rhs` into `self`. Same as [`TDigest::merge_inplace`].
    fn bitor_assign(&mut self, rhs: &TDigest) {
        self.merge_inplace(rhs);
    }
}

impl Extend<f64> for TDigest {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        let values: Vec<f64> = iter.into_iter().collect();
        // Extend cannot report an Err. If any value is NaN, batch_update
        // rejects the whole batch and this extend is silently a no-op,
        // mirroring the teacher's own `Extend` impl not propagating a
        // `Result`.
        let _ = self.batch_update(&values);
    }
}

impl<const N: usize> From<[f64; N]> for TDigest {
    fn from(array: [f64; N]) -> Self {
        let mut digest = TDigest::new();
        digest.extend(array);
        digest
    }
}

impl FromIterator<f64> for TDigest {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut digest = TDigest::new();
        digest.extend(iter);
        digest
    }
}

impl CentroidStore {
    pub(crate) fn default_with(centroids: Vec<Centroid>) -> Self {
        let mut store = CentroidStore::new();
        store.replace(centroids);
        store
    }
}

/// Folds an iterable of digests into one, as a single batched
/// compression pass over the concatenation of all their centroid lists
/// (not a sequence of pairwise merges — this avoids the extra rounding
/// a fold over [`TDigest::merge`] would introduce).
///
/// When `max_centroids` is omitted, the budget is the maximum over all
/// source budgets, with [`Budget::Unbounded`] dominating any integer.
/// An empty iterable yields an empty digest with the supplied budget
/// (or unbounded, if none was supplied).
///
/// # Examples
///
/// ```
/// use tdigest_core::{merge_all, TDigest, Budget};
///
/// let budget = Budget::bounded(3).unwrap();
/// let digests = vec![
///     TDigest::from_values(0..34, budget).unwrap(),
///     TDigest::from_values(34..67, budget).unwrap(),
///     TDigest::from_values(67..101, budget).unwrap(),
/// ];
/// let merged = merge_all(digests, None);
/// assert_eq!(merged.n_values(), 101.0);
/// ```
#[must_use]
pub fn merge_all<I>(digests: I, max_centroids: Option<Budget>) -> TDigest
where
    I: IntoIterator<Item = TDigest>,
{
    let digests: Vec<TDigest> = digests.into_iter().collect();
    if digests.is_empty() {
        return TDigest::builder()
            .budget(max_centroids.unwrap_or(Budget::Unbounded))
            .build();
    }

    let budget = max_centroids.unwrap_or_else(|| {
        digests
            .iter()
            .map(|d| d.max_centroids)
            .reduce(Budget::dominant)
            .unwrap_or(Budget::Unbounded)
    });

    let mut sources = Vec::new();
    let mut total_weight = 0.0;
    let mut sum_value = 0.0;
    let mut min_value: Option<f64> = None;
    let mut max_value: Option<f64> = None;
    for d in &digests {
        sources.extend(d.centroids.iter().copied());
        total_weight += d.total_weight;
        sum_value += d.sum_value;
        min_value = match (min_value, d.min_value) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        max_value = match (max_value, d.max_value) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
    }

    let centroids = merge_pass(sources, budget, min_value, max_value);
    TDigest {
        centroids: CentroidStore::default_with(centroids),
        total_weight,
        sum_value,
        min_value,
        max_value,
        max_centroids: budget,
    }
}
