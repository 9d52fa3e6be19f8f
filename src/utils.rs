//! Common utilities used across the crate.
//!
//! This module provides the statistical helpers shared by the tree
//! interpreter, the vote combiner and the anomaly scorer, plus the
//! parallelism switch used to fan ensemble members out over threads.

use rayon::prelude::*;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::erf::erfc;

// =============================================================================
// Statistical Utilities
// =============================================================================

/// z-value of the 95% two-sided normal interval.
pub const DEFAULT_Z: f64 = 1.96;

/// Euler–Mascheroni constant, used for the expected isolation depth.
pub const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Wilson score lower bound for a binomial proportion.
///
/// `p` is the observed proportion of successes and `n` the number of trials.
/// The result is clamped to `[0, 1]`; an empty sample has no support and
/// yields `0`.
///
/// ```text
/// (p + z²/2n − z·√(p(1−p)/n + z²/4n²)) / (1 + z²/n)
/// ```
#[inline]
pub fn wilson_score(p: f64, n: f64, z: f64) -> f64 {
    if n <= 0.0 || !p.is_finite() {
        return 0.0;
    }
    let z2 = z * z;
    let centre = p + z2 / (2.0 * n);
    let spread = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).max(0.0).sqrt();
    ((centre - spread) / (1.0 + z2 / n)).clamp(0.0, 1.0)
}

/// Total instance count of a weighted distribution.
#[inline]
pub fn total_count<K>(distribution: &[(K, f64)]) -> f64 {
    distribution.iter().map(|(_, c)| c).sum()
}

/// Merge two weighted distributions, summing counts at equal keys.
///
/// The result is sorted by key, so `merge_counts(a, b) == merge_counts(b, a)`
/// and the total count is the sum of both totals.
pub fn merge_counts<K>(a: &[(K, f64)], b: &[(K, f64)]) -> Vec<(K, f64)>
where
    K: PartialOrd + Clone,
{
    let mut merged: Vec<(K, f64)> = a.to_vec();
    for (key, count) in b {
        match merged.iter_mut().find(|(k, _)| k == key) {
            Some((_, c)) => *c += count,
            None => merged.push((key.clone(), *count)),
        }
    }
    merged.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));
    merged
}

/// Reduce a sorted numeric distribution to at most `limit` bins.
///
/// Repeatedly merges the two adjacent bins whose values are closest, the new
/// bin taking the count-weighted average value and the summed count. A
/// `limit` of zero leaves the distribution untouched.
pub fn merge_bins(mut distribution: Vec<(f64, f64)>, limit: usize) -> Vec<(f64, f64)> {
    if limit == 0 {
        return distribution;
    }
    while distribution.len() > limit && distribution.len() >= 2 {
        let mut merge_at = 1;
        let mut shortest = f64::INFINITY;
        for idx in 1..distribution.len() {
            let gap = distribution[idx].0 - distribution[idx - 1].0;
            if gap < shortest {
                shortest = gap;
                merge_at = idx;
            }
        }
        let (left_value, left_count) = distribution[merge_at - 1];
        let (right_value, right_count) = distribution.remove(merge_at);
        let count = left_count + right_count;
        let value = if count > 0.0 {
            (left_value * left_count + right_value * right_count) / count
        } else {
            (left_value + right_value) / 2.0
        };
        distribution[merge_at - 1] = (value, count);
    }
    distribution
}

/// Count-weighted mean of a numeric distribution. NaN when empty.
pub fn mean(distribution: &[(f64, f64)]) -> f64 {
    let total = total_count(distribution);
    if total <= 0.0 {
        return f64::NAN;
    }
    distribution.iter().map(|(v, c)| v * c).sum::<f64>() / total
}

/// Unbiased sample variance of a numeric distribution around `mean`.
///
/// NaN when the distribution holds fewer than two instances.
pub fn unbiased_variance(distribution: &[(f64, f64)], mean: f64) -> f64 {
    let total = total_count(distribution);
    if total <= 1.0 {
        return f64::NAN;
    }
    distribution
        .iter()
        .map(|(v, c)| c * (v - mean) * (v - mean))
        .sum::<f64>()
        / (total - 1.0)
}

/// Median of a sorted numeric distribution.
///
/// With an even instance count whose middle falls between two bins, the
/// average of both bin values is returned. NaN when empty.
pub fn median(distribution: &[(f64, f64)]) -> f64 {
    let total = total_count(distribution);
    let half = total / 2.0;
    let mut cumulative = 0.0;
    let mut previous: Option<f64> = None;
    for &(value, count) in distribution {
        cumulative += count;
        if cumulative > half {
            let even = total.fract() == 0.0 && (total as u64) % 2 == 0;
            if let (true, Some(prev)) = (even && cumulative - count == half, previous) {
                return (value + prev) / 2.0;
            }
            return value;
        }
        previous = Some(value);
    }
    f64::NAN
}

/// Error bound of a regression estimate.
///
/// Uses the chi-squared interval of the sample variance:
///
/// ```text
/// sqrt(variance·(n−1) / χ²ₙ⁻¹(1 − erf(z/√2)) · (√n + z)² / n)
/// ```
///
/// Returns NaN when `instances <= 1` or the variance is not finite.
pub fn regression_error(variance: f64, instances: f64, z: f64) -> f64 {
    if instances <= 1.0 || !variance.is_finite() {
        return f64::NAN;
    }
    let alpha = erfc(z / std::f64::consts::SQRT_2);
    let ppf = chi_squared_inverse_cdf(alpha, instances);
    if ppf <= 0.0 || !ppf.is_finite() {
        return f64::NAN;
    }
    let error = variance * (instances - 1.0) / ppf * (instances.sqrt() + z).powi(2);
    (error / instances).sqrt()
}

/// Inverse CDF (quantile) of the chi-squared distribution with `dof`
/// degrees of freedom, by bisection on the CDF. NaN for a non-positive `dof`.
pub fn chi_squared_inverse_cdf(p: f64, dof: f64) -> f64 {
    let Ok(dist) = ChiSquared::new(dof) else {
        return f64::NAN;
    };
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let mut lo = 0.0;
    let mut hi = dof.max(1.0);
    while dist.cdf(hi) < p {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if dist.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 * hi.max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Ensemble members vote independently; when `Parallel`, votes are computed
/// with `rayon` parallel iterators, otherwise sequentially in model order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, preserving input order in the result.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (the global rayon pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = a dedicated pool of exactly `n` threads
///
/// If a dedicated pool cannot be created the closure runs sequentially.
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel if n_threads == 0 => f(Parallelism::Parallel),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    tracing::warn!(%err, n_threads, "cannot build thread pool, running sequentially");
                    f(Parallelism::Sequential)
                }
            }
        }
    }
}
