//! The query engine: quantile, CDF, interval probability, and trimmed
//! mean, all built on monotone piecewise-linear interpolation over the
//! centroid sequence plus the exact min/max endpoints.

use crate::centroid::Centroid;
use crate::error::{Error, Result};

fn interpolate(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let fraction = (x - x0) / (x1 - x0);
    y0 + fraction * (y1 - y0)
}

/// Cumulative weight strictly before centroid `i`, for each `i`.
fn cumulative_before(centroids: &[Centroid]) -> Vec<f64> {
    let mut cum = Vec::with_capacity(centroids.len());
    let mut running = 0.0;
    for c in centroids {
        cum.push(running);
        running += c.weight;
    }
    cum
}

/// The mean's own cumulative-weight position: `sum(weight before) +
/// weight/2`, per spec §4.4.
fn midpoints(centroids: &[Centroid]) -> Vec<f64> {
    let before = cumulative_before(centroids);
    before
        .into_iter()
        .zip(centroids.iter())
        .map(|(b, c)| b + c.weight / 2.0)
        .collect()
}

/// Estimates the value at cumulative probability `q`.
///
/// `centroids` must be non-empty and `total_weight` the sum of its
/// weights (callers are expected to have already checked for an empty
/// digest — this function assumes at least one centroid).
pub(crate) fn quantile(
    q: f64,
    centroids: &[Centroid],
    total_weight: f64,
    min_value: f64,
    max_value: f64,
) -> Result<f64> {
    if q.is_nan() || !(0.0..=1.0).contains(&q) {
        return Err(Error::domain("q", "must lie in [0, 1]"));
    }
    if q == 0.0 {
        return Ok(min_value);
    }
    if q == 1.0 {
        return Ok(max_value);
    }

    let mids = midpoints(centroids);
    let target = q * total_weight;
    let last = centroids.len() - 1;

    if target <= mids[0] {
        return Ok(interpolate(target, 0.0, min_value, mids[0], centroids[0].mean));
    }
    if target >= mids[last] {
        return Ok(interpolate(
            target,
            mids[last],
            centroids[last].mean,
            total_weight,
            max_value,
        ));
    }
    for i in 0..last {
        if target >= mids[i] && target <= mids[i + 1] {
            return Ok(interpolate(
                target,
                mids[i],
                centroids[i].mean,
                mids[i + 1],
                centroids[i + 1].mean,
            ));
        }
    }
    // Unreachable given the bracketing checks above, but a total_weight
    // rounding hair could in principle leave target just past the last
    // bracket; fall back to the nearest anchor rather than panicking.
    Ok(centroids[last].mean)
}

/// Estimates the cumulative probability that an observation is `<= x`.
pub(crate) fn cdf(
    x: f64,
    centroids: &[Centroid],
    total_weight: f64,
    min_value: f64,
    max_value: f64,
) -> Result<f64> {
    if x.is_nan() {
        return Err(Error::domain("x", "must not be NaN"));
    }
    if x <= min_value {
        return Ok(0.0);
    }
    if x >= max_value {
        return Ok(1.0);
    }

    let mids = midpoints(centroids);
    let last = centroids.len() - 1;

    let cumulative = if x <= centroids[0].mean {
        interpolate(x, min_value, 0.0, centroids[0].mean, mids[0])
    } else if x >= centroids[last].mean {
        interpolate(x, centroids[last].mean, mids[last], max_value, total_weight)
    } else {
        let mut found = None;
        for i in 0..last {
            if x >= centroids[i].mean && x <= centroids[i + 1].mean {
                found = Some(interpolate(
                    x,
                    centroids[i].mean,
                    mids[i],
                    centroids[i + 1].mean,
                    mids[i + 1],
                ));
                break;
            }
        }
        found.unwrap_or(mids[last])
    };

    Ok((cumulative / total_weight).clamp(0.0, 1.0))
}

/// The mean of values whose cumulative rank lies in `[q1, q2]`,
/// approximated by integrating the piecewise-linear inverse CDF.
pub(crate) fn trimmed_mean(
    q1: f64,
    q2: f64,
    centroids: &[Centroid],
    total_weight: f64,
) -> Result<f64> {
    if q1.is_nan() || q2.is_nan() || !(0.0..=1.0).contains(&q1) || !(0.0..=1.0).contains(&q2) {
        return Err(Error::domain("q1/q2", "must lie in [0, 1]"));
    }
    if !(q1 < q2) {
        return Err(Error::domain("q1/q2", "require q1 < q2"));
    }

    let low = q1 * total_weight;
    let high = q2 * total_weight;

    let mut cum = 0.0;
    let mut weighted_sum = 0.0;
    let mut overlap_total = 0.0;
    for c in centroids {
        let start = cum;
        let end = cum + c.weight;
        let overlap = (end.min(high) - start.max(low)).max(0.0);
        if overlap > 0.0 {
            weighted_sum += overlap * c.mean;
            overlap_total += overlap;
        }
        cum = end;
    }

    if overlap_total <= 0.0 {
        return Err(Error::domain("q1/q2", "window covers no observations"));
    }
    Ok(weighted_sum / overlap_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_1_to_10() -> Vec<Centroid> {
        (1..=10).map(|v| Centroid::singleton(v as f64)).collect()
    }

    #[test]
    fn quantile_endpoints_are_exact() {
        let cs = digest_1_to_10();
        assert_eq!(quantile(0.0, &cs, 10.0, 1.0, 10.0).unwrap(), 1.0);
        assert_eq!(quantile(1.0, &cs, 10.0, 1.0, 10.0).unwrap(), 10.0);
    }

    #[test]
    fn quantile_rejects_out_of_domain() {
        let cs = digest_1_to_10();
        assert!(quantile(-0.1, &cs, 10.0, 1.0, 10.0).is_err());
        assert!(quantile(1.1, &cs, 10.0, 1.0, 10.0).is_err());
        assert!(quantile(f64::NAN, &cs, 10.0, 1.0, 10.0).is_err());
    }

    #[test]
    fn quantile_is_monotone_non_decreasing() {
        let cs = digest_1_to_10();
        let mut prev = f64::NEG_INFINITY;
        let mut q = 0.0;
        while q <= 1.0 {
            let v = quantile(q, &cs, 10.0, 1.0, 10.0).unwrap();
            assert!(v >= prev - 1e-9, "q={q} v={v} prev={prev}");
            prev = v;
            q += 0.01;
        }
    }

    #[test]
    fn cdf_of_min_and_max_are_zero_and_one() {
        let cs = digest_1_to_10();
        assert_eq!(cdf(1.0, &cs, 10.0, 1.0, 10.0).unwrap(), 0.0);
        assert_eq!(cdf(10.0, &cs, 10.0, 1.0, 10.0).unwrap(), 1.0);
        assert_eq!(cdf(0.0, &cs, 10.0, 1.0, 10.0).unwrap(), 0.0);
        assert_eq!(cdf(11.0, &cs, 10.0, 1.0, 10.0).unwrap(), 1.0);
    }

    #[test]
    fn cdf_is_monotone_non_decreasing() {
        let cs = digest_1_to_10();
        let mut prev = 0.0;
        let mut x = 1.0;
        while x <= 10.0 {
            let p = cdf(x, &cs, 10.0, 1.0, 10.0).unwrap();
            assert!(p >= prev - 1e-9);
            prev = p;
            x += 0.1;
        }
    }

    #[test]
    fn quantile_cdf_roundtrip_is_approximate_inverse() {
        let cs = digest_1_to_10();
        for q in [0.1, 0.25, 0.5, 0.75, 0.9] {
            let x = quantile(q, &cs, 10.0, 1.0, 10.0).unwrap();
            let back = cdf(x, &cs, 10.0, 1.0, 10.0).unwrap();
            assert!((back - q).abs() < 0.15, "q={q} back={back}");
        }
    }

    #[test]
    fn trimmed_mean_requires_q1_lt_q2() {
        let cs = digest_1_to_10();
        assert!(trimmed_mean(0.5, 0.5, &cs, 10.0).is_err());
        assert!(trimmed_mean(0.6, 0.4, &cs, 10.0).is_err());
    }

    #[test]
    fn trimmed_mean_of_symmetric_window_is_near_median() {
        let cs = digest_1_to_10();
        let tm = trimmed_mean(0.1, 0.9, &cs, 10.0).unwrap();
        assert!((tm - 5.5).abs() < 1.0, "tm={tm}");
    }
}
