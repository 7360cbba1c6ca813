//! Statistical classification of values into ordinal display classes.
//!
//! Every method produces ascending class upper bounds (`bins`); a value
//! belongs to the first class whose bound is not below it. Classes are
//! therefore monotone in the value and equal values share a class.

use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    Error,
    model::{ClassificationMethod, MAX_CLASS_COUNT},
};

/// Result of one classification run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub method: ClassificationMethod,
    /// Upper bound of each class, ascending
    pub bins: Vec<f64>,
    /// Class of every input value, in input order, in `0..k`
    pub class_ids: Vec<usize>,
    /// Number of classes actually produced, at most the requested count
    pub k: usize,
}

impl Classification {
    /// Every value in class 0
    pub fn uniform(method: ClassificationMethod, len: usize) -> Self {
        Self {
            method,
            bins: Vec::new(),
            class_ids: vec![0; len],
            k: 1,
        }
    }
}

/// Classifies `values`, degrading to a single class on any failure.
/// Errors are logged and never returned.
pub fn classify_or_default(
    values: &[f64],
    method: ClassificationMethod,
    class_count: usize,
) -> Classification {
    classify(values, method, class_count).unwrap_or_else(|e| {
        warn!("Classification failed, assigning class 0 to all {} values: {e}", values.len());
        Classification::uniform(method, values.len())
    })
}

/// Bins `values` into at most `class_count` classes.
///
/// When there are fewer distinct values than requested classes the class
/// count shrinks to the number of distinct values.
///
/// # Errors
///
/// Returns [`Error::Classification`] for empty input, non-finite values or a
/// class count outside `1..=MAX_CLASS_COUNT`.
pub fn classify(
    values: &[f64],
    method: ClassificationMethod,
    class_count: usize,
) -> Result<Classification, Error> {
    if !(1..=MAX_CLASS_COUNT).contains(&class_count) {
        return Err(Error::Classification(format!(
            "class count must be between 1 and {MAX_CLASS_COUNT}, got {class_count}"
        )));
    }
    if values.is_empty() {
        return Err(Error::Classification("no values to classify".into()));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::Classification(format!(
            "cannot classify non-finite value {bad}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let distinct: Vec<(f64, usize)> = sorted
        .iter()
        .copied()
        .dedup_with_count()
        .map(|(count, value)| (value, count))
        .collect();

    let k = class_count.min(distinct.len());
    if k < class_count {
        debug!(
            "Only {} distinct values, reducing class count from {class_count} to {k}",
            distinct.len()
        );
    }

    let bins = if k == 1 {
        vec![sorted[sorted.len() - 1]]
    } else {
        match method {
            ClassificationMethod::EqualInterval => equal_interval_bins(&sorted, k),
            ClassificationMethod::Quantile => quantile_bins(&sorted, k),
            ClassificationMethod::NaturalBreaks => natural_breaks_bins(&distinct, k),
        }
    };

    let max = sorted[sorted.len() - 1];
    if bins.is_empty()
        || bins.iter().tuple_windows().any(|(a, b)| a > b)
        || bins[bins.len() - 1] < max
    {
        return Err(Error::Classification(format!(
            "{method} produced invalid class bounds {bins:?}"
        )));
    }

    let class_ids = values.iter().map(|&value| class_of(&bins, value)).collect();

    Ok(Classification {
        method,
        k: bins.len(),
        bins,
        class_ids,
    })
}

fn class_of(bins: &[f64], value: f64) -> usize {
    bins.partition_point(|&bound| bound < value)
        .min(bins.len() - 1)
}

/// `k` classes of equal width between the minimum and the maximum
fn equal_interval_bins(sorted: &[f64], k: usize) -> Vec<f64> {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let width = (max - min) / k as f64;

    (1..k)
        .map(|i| min + width * i as f64)
        .chain(std::iter::once(max))
        .collect()
}

/// Linearly interpolated percentiles at `1/k, 2/k, .., 1`, duplicates removed
fn quantile_bins(sorted: &[f64], k: usize) -> Vec<f64> {
    (1..=k)
        .map(|i| percentile(sorted, i as f64 / k as f64))
        .dedup()
        .collect()
}

fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let position = fraction * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let weight = position - lower as f64;

    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Fisher-Jenks optimal partition of the distinct values (weighted by their
/// multiplicity) into `k` contiguous classes minimising the within-class sum
/// of squared deviations.
///
/// The optimal split point of a layer is monotone in the class end, so each
/// layer is filled by divide and conquer in `O(m log m)`.
fn natural_breaks_bins(distinct: &[(f64, usize)], k: usize) -> Vec<f64> {
    let m = distinct.len();
    let cost = SquaredDeviation::new(distinct);

    let mut previous: Vec<f64> = (0..=m).map(|end| cost.between(0, end)).collect();
    let mut current = vec![f64::INFINITY; m + 1];
    // split[j][end]: start of the last class when `end` values form j + 1 classes
    let mut split = vec![vec![0usize; m + 1]; k];

    for classes in 2..=k {
        current.fill(f64::INFINITY);
        let layer = Layer {
            previous: &previous,
            cost: &cost,
            classes,
        };
        layer.fill(
            &mut current,
            &mut split[classes - 1],
            classes,
            m,
            classes - 1,
            m - 1,
        );
        std::mem::swap(&mut previous, &mut current);
    }

    let mut ends = Vec::with_capacity(k);
    let mut end = m;
    for classes in (1..=k).rev() {
        ends.push(end);
        end = if classes > 1 { split[classes - 1][end] } else { 0 };
    }

    ends.into_iter()
        .rev()
        .map(|end| distinct[end - 1].0)
        .collect()
}

struct Layer<'a> {
    previous: &'a [f64],
    cost: &'a SquaredDeviation,
    classes: usize,
}

impl Layer<'_> {
    /// Fills `current[lo..=hi]` knowing the optimal split lies in
    /// `opt_lo..=opt_hi`
    fn fill(
        &self,
        current: &mut [f64],
        split: &mut [usize],
        lo: usize,
        hi: usize,
        opt_lo: usize,
        opt_hi: usize,
    ) {
        if lo > hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let first = opt_lo.max(self.classes - 1);
        let last = opt_hi.min(mid - 1);

        let mut best = f64::INFINITY;
        let mut best_split = first;
        for start in first..=last {
            let total = self.previous[start] + self.cost.between(start, mid);
            if total < best {
                best = total;
                best_split = start;
            }
        }

        current[mid] = best;
        split[mid] = best_split;

        if mid > lo {
            self.fill(current, split, lo, mid - 1, opt_lo, best_split);
        }
        self.fill(current, split, mid + 1, hi, best_split, opt_hi);
    }
}

/// Weighted prefix sums for O(1) within-class squared deviation
struct SquaredDeviation {
    weight: Vec<f64>,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl SquaredDeviation {
    fn new(distinct: &[(f64, usize)]) -> Self {
        let total_weight: usize = distinct.iter().map(|&(_, count)| count).sum();
        let mean = distinct
            .iter()
            .map(|&(value, count)| value * count as f64)
            .sum::<f64>()
            / total_weight as f64;

        let mut weight = Vec::with_capacity(distinct.len() + 1);
        let mut sum = Vec::with_capacity(distinct.len() + 1);
        let mut sum_sq = Vec::with_capacity(distinct.len() + 1);
        let (mut w, mut s, mut ss) = (0.0, 0.0, 0.0);
        weight.push(w);
        sum.push(s);
        sum_sq.push(ss);

        for &(value, count) in distinct {
            // centred to limit cancellation in `sum_sq - sum^2 / weight`
            let centred = value - mean;
            let count = count as f64;
            w += count;
            s += count * centred;
            ss += count * centred * centred;
            weight.push(w);
            sum.push(s);
            sum_sq.push(ss);
        }

        Self {
            weight,
            sum,
            sum_sq,
        }
    }

    /// Sum of squared deviations of the distinct values `start..end`
    fn between(&self, start: usize, end: usize) -> f64 {
        let weight = self.weight[end] - self.weight[start];
        if weight <= 0.0 {
            return 0.0;
        }
        let sum = self.sum[end] - self.sum[start];
        let sum_sq = self.sum_sq[end] - self.sum_sq[start];
        (sum_sq - sum * sum / weight).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHODS: [ClassificationMethod; 3] = [
        ClassificationMethod::NaturalBreaks,
        ClassificationMethod::EqualInterval,
        ClassificationMethod::Quantile,
    ];

    /// Deterministic pseudo-random values in `0..1000`
    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 33) % 1000) as f64
            })
            .collect()
    }

    #[test]
    fn quantile_groups_eight_values_in_pairs() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let result = classify(&values, ClassificationMethod::Quantile, 4).unwrap();
        assert_eq!(result.class_ids, vec![0, 0, 1, 1, 2, 2, 3, 3]);
        assert_eq!(result.k, 4);
        assert_eq!(result.bins, vec![2.75, 4.5, 6.25, 8.0]);
    }

    #[test]
    fn equal_interval_bins_span_the_range() {
        let values = vec![0.0, 1.0, 4.9, 5.0, 5.1, 10.0];
        let result = classify(&values, ClassificationMethod::EqualInterval, 2).unwrap();
        assert_eq!(result.bins, vec![5.0, 10.0]);
        assert_eq!(result.class_ids, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn natural_breaks_finds_obvious_clusters() {
        let values = vec![21.0, 1.0, 12.0, 2.0, 3.0, 10.0, 11.0, 20.0, 22.0];
        let result = classify(&values, ClassificationMethod::NaturalBreaks, 3).unwrap();
        assert_eq!(result.bins, vec![3.0, 12.0, 22.0]);
        assert_eq!(result.class_ids, vec![2, 0, 1, 0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn natural_breaks_matches_exhaustive_search() {
        for seed in 1..6 {
            let values = noise(40, seed);
            let k = 4;
            let result = classify(&values, ClassificationMethod::NaturalBreaks, k).unwrap();

            let mut distinct: Vec<(f64, usize)> = Vec::new();
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            for value in sorted {
                match distinct.last_mut() {
                    Some((last, count)) if *last == value => *count += 1,
                    _ => distinct.push((value, 1)),
                }
            }

            let cost = SquaredDeviation::new(&distinct);
            let m = distinct.len();
            // plain O(k m^2) dynamic programme
            let mut best = vec![vec![f64::INFINITY; m + 1]; k + 1];
            best[0][0] = 0.0;
            for classes in 1..=k {
                for end in classes..=m {
                    for start in classes - 1..end {
                        let total = best[classes - 1][start] + cost.between(start, end);
                        if total < best[classes][end] {
                            best[classes][end] = total;
                        }
                    }
                }
            }

            let mut achieved = 0.0;
            let mut start = 0;
            for bound in &result.bins {
                let end = distinct.partition_point(|(value, _)| value <= bound);
                achieved += cost.between(start, end);
                start = end;
            }
            assert!(
                (achieved - best[k][m]).abs() <= 1e-6 * best[k][m].max(1.0),
                "seed {seed}: {achieved} vs optimum {}",
                best[k][m]
            );
        }
    }

    #[test]
    fn classes_are_monotone_in_value() {
        for seed in 1..4 {
            let values = noise(200, seed);
            for method in METHODS {
                for k in [1, 2, 5, 7] {
                    let result = classify(&values, method, k).unwrap();
                    assert!(result.k <= k);

                    let mut pairs: Vec<(f64, usize)> = values
                        .iter()
                        .copied()
                        .zip(result.class_ids.iter().copied())
                        .collect();
                    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                    for window in pairs.windows(2) {
                        assert!(window[0].1 <= window[1].1, "{method} k={k}");
                        if window[0].0 == window[1].0 {
                            assert_eq!(window[0].1, window[1].1);
                        }
                    }
                    assert!(pairs.iter().all(|&(_, class)| class < result.k));
                }
            }
        }
    }

    #[test]
    fn identical_values_all_land_in_class_zero() {
        let values = vec![4.2; 10];
        for method in METHODS {
            let result = classify(&values, method, 5).unwrap();
            assert_eq!(result.k, 1);
            assert!(result.class_ids.iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn class_count_shrinks_to_distinct_values() {
        let values = vec![1.0, 1.0, 2.0, 2.0, 3.0];
        let result = classify(&values, ClassificationMethod::NaturalBreaks, 5).unwrap();
        assert_eq!(result.k, 3);
        assert_eq!(result.class_ids, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn failures_degrade_to_class_zero() {
        let values = vec![1.0, f64::NAN, 3.0];
        assert!(classify(&values, ClassificationMethod::Quantile, 3).is_err());

        let result = classify_or_default(&values, ClassificationMethod::Quantile, 3);
        assert_eq!(result.class_ids, vec![0, 0, 0]);
        assert_eq!(result.k, 1);

        let empty = classify_or_default(&[], ClassificationMethod::EqualInterval, 3);
        assert!(empty.class_ids.is_empty());
    }

    #[test]
    fn oversized_class_count_is_refused_before_any_table_is_built() {
        let values: Vec<f64> = (0..3000).map(f64::from).collect();
        assert!(matches!(
            classify(&values, ClassificationMethod::NaturalBreaks, usize::MAX),
            Err(Error::Classification(_))
        ));

        let result =
            classify_or_default(&values, ClassificationMethod::NaturalBreaks, usize::MAX);
        assert_eq!(result.k, 1);
        assert!(result.class_ids.iter().all(|&c| c == 0));

        let capped =
            classify(&values, ClassificationMethod::NaturalBreaks, MAX_CLASS_COUNT).unwrap();
        assert_eq!(capped.k, MAX_CLASS_COUNT);
    }
}
