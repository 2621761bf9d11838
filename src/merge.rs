//! The merging engine: the single compression pass every mutation runs
//! through.
//!
//! This is the densest module in the crate — it is where the scale
//! function, the endpoint-protection rule, and the incremental
//! weighted-mean update all meet. Read [`merge_pass`] top to bottom; the
//! rest of the crate calls it as a black box.

use crate::centroid::{cmp_by_mean, Centroid};
use crate::scale::{may_merge_delta, Budget};

/// Upper bound on how many times the compression pass will halve its
/// scale parameter while searching for one that honors the centroid
/// cap (see `merge_pass`). `k1` is linear in `delta`, so its spread has
/// long since collapsed the whole non-protected middle into a single
/// cluster well before this many halvings; it exists as a loop
/// backstop, not a realistic case.
const MAX_DELTA_HALVINGS: u32 = 48;

/// Runs one compression pass over `sources`, producing a new centroid
/// list honoring `budget`.
///
/// `min_value`/`max_value` are the digest's exact running extremes
/// *after* `sources` has been folded in; they are used only to decide
/// which, if any, of `sources`' two endpoint centroids are protected
/// singletons that must survive the pass untouched.
///
/// `sources` need not be sorted or weight-positive-checked by the
/// caller — sorting happens here, and callers are expected to have
/// already rejected non-finite/non-positive weights before this point
/// (this function trusts its input).
///
/// `n_centroids <= max_centroids` is a hard invariant (spec §3 invariant
/// 4, §8 property 1), not a best-effort target of the scale predicate.
/// A single scale-bounded scan can leave more clusters than the budget
/// allows — endpoint protection alone forces at least two whenever
/// `min != max`, and the scan's scale parameter only bounds the *rate*
/// of merging, not the final count directly — so a pass that lands over
/// cap is retried with a progressively tighter scale parameter, and
/// anything still over cap after that is force-fused regardless of
/// protection. See `scale_scan` and `force_fuse_to_cap` below.
pub(crate) fn merge_pass(
    mut sources: Vec<Centroid>,
    budget: Budget,
    min_value: Option<f64>,
    max_value: Option<f64>,
) -> Vec<Centroid> {
    if sources.is_empty() {
        return Vec::new();
    }

    // Stable sort: ties keep their input order, as required by the spec.
    sources.sort_by(cmp_by_mean);

    let total_weight: f64 = sources.iter().map(|c| c.weight).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    if budget.is_unbounded() {
        return fuse_exact_ties(sources);
    }

    let cap = budget.as_u32().expect("checked above: budget is bounded") as usize;
    let n = sources.len();
    let protected_first = min_value
        .map(|m| sources[0].mean == m && sources[0].is_singleton())
        .unwrap_or(false);
    let protected_last = max_value
        .map(|m| sources[n - 1].mean == m && sources[n - 1].is_singleton())
        .unwrap_or(false);

    let mut delta = f64::from(cap as u32);
    let mut output = scale_scan(&sources, total_weight, delta, protected_first, protected_last);

    // Tighten delta and re-scan until the cap holds. k1 is linear in
    // delta, so a smaller delta shrinks k1's spread for the same q
    // range, making the merge predicate easier to satisfy — a halved
    // delta merges progressively more of the (unprotected) middle away.
    // The protected endpoints are untouched by delta either way, so
    // this converges whenever the cap is reachable at all.
    let mut halvings = 0;
    while output.len() > cap && halvings < MAX_DELTA_HALVINGS {
        delta /= 2.0;
        halvings += 1;
        output = scale_scan(&sources, total_weight, delta, protected_first, protected_last);
    }

    // Backstop: a cap smaller than the number of protected endpoints, or
    // a set of values that can never combine (e.g. clashing infinities),
    // can't be reached by tightening delta alone, since protection itself
    // doesn't depend on delta. Force-fuse past it if that's what's left.
    if output.len() > cap {
        output = force_fuse_to_cap(output, cap);
    }

    output
}

/// One scale-bounded left-to-right scan: stable-sorted `sources` folded
/// into a pending cluster that absorbs neighbors while `may_merge_delta`
/// allows it, with `sources[0]`/`sources[last]` held out of merging
/// entirely when protected.
fn scale_scan(
    sources: &[Centroid],
    total_weight: f64,
    delta: f64,
    protected_first: bool,
    protected_last: bool,
) -> Vec<Centroid> {
    let n = sources.len();
    let mut output = Vec::with_capacity(n);
    let mut emitted_weight = 0.0_f64;
    let mut pending = sources[0];
    let mut pending_is_protected = protected_first;

    for (i, &candidate) in sources.iter().enumerate().skip(1) {
        let candidate_is_protected = protected_last && i == n - 1;

        let q_lo = emitted_weight / total_weight;
        let q_hi = (emitted_weight + pending.weight + candidate.weight) / total_weight;

        let mergeable = !pending_is_protected
            && !candidate_is_protected
            && can_combine(pending.mean, candidate.mean)
            && may_merge_delta(q_lo, q_hi, delta);

        if mergeable {
            // Incremental weighted-mean update: numerically stable to
            // O(n*eps) rather than recomputing sum(w*m)/sum(w) from
            // scratch, which would be O(n^2*eps) under repeated merges.
            // Skipping the update entirely when the means already agree
            // also keeps two same-signed infinities from producing a
            // NaN via inf - inf.
            let new_weight = pending.weight + candidate.weight;
            let new_mean = if candidate.mean == pending.mean {
                pending.mean
            } else {
                pending.mean + (candidate.weight / new_weight) * (candidate.mean - pending.mean)
            };
            pending = Centroid::new(new_mean, new_weight);
        } else {
            emitted_weight += pending.weight;
            output.push(pending);
            pending = candidate;
            pending_is_protected = candidate_is_protected;
        }
    }
    output.push(pending);
    output
}

/// Repeatedly fuses the adjacent pair with the smallest mean gap,
/// ignoring endpoint protection, until `output.len() <= cap` or no
/// combinable pair remains.
///
/// Only called once delta-tightening has already failed to reach the
/// cap — meaning protection (or an irreconcilable value pair) is what's
/// standing in the way, and the hard cap invariant takes priority over
/// the soft preference for keeping protected singletons untouched.
/// `TDigest::min`/`TDigest::max` stay exact regardless, since they are
/// tracked independently of the centroid list.
fn force_fuse_to_cap(mut output: Vec<Centroid>, cap: usize) -> Vec<Centroid> {
    while output.len() > cap && output.len() > 1 {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..output.len() - 1 {
            let (a, b) = (output[i], output[i + 1]);
            if !can_combine(a.mean, b.mean) {
                continue;
            }
            let gap = b.mean - a.mean;
            if best.map_or(true, |(_, best_gap)| gap < best_gap) {
                best = Some((i, gap));
            }
        }
        let Some((i, _)) = best else {
            // Nothing left can combine (e.g. NEG_INFINITY vs INFINITY
            // means with no path to bridge them) — the cap is
            // unreachable for this input; stop rather than loop forever.
            break;
        };
        let (a, b) = (output[i], output[i + 1]);
        let new_weight = a.weight + b.weight;
        let new_mean = if a.mean == b.mean {
            a.mean
        } else {
            a.mean + (b.weight / new_weight) * (b.mean - a.mean)
        };
        output[i] = Centroid::new(new_mean, new_weight);
        output.remove(i + 1);
    }
    output
}

/// Whether two means may be combined at all, independent of the scale
/// budget. Equal means always may; otherwise neither may be infinite —
/// blending `+inf` with a finite value, or `+inf` with `-inf`, in the
/// incremental mean update below would either lose information
/// silently or produce NaN.
fn can_combine(a: f64, b: f64) -> bool {
    a == b || (!a.is_infinite() && !b.is_infinite())
}

/// The unbounded fast path: fuse only centroids whose means are bitwise
/// equal after sorting. No interpolation loss occurs, since a fused
/// centroid's mean is, by construction, identical to its (tied) inputs.
fn fuse_exact_ties(sources: Vec<Centroid>) -> Vec<Centroid> {
    let mut output: Vec<Centroid> = Vec::with_capacity(sources.len());
    for c in sources {
        match output.last_mut() {
            Some(last) if last.mean == c.mean => {
                last.weight += c.weight;
            }
            _ => output.push(c),
        }
    }
    output
}
