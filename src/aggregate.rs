//! Group-by aggregation of repeated trials into mean/std series.

use crate::table::Table;
use anyhow::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One aggregated point of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub mean: f64,
    pub std: f64,
}

/// A plotted series: a legend label and its points in ascending x
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn xs(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.x)
    }

    /// Largest finite `mean + std`, used for the y range
    pub fn upper_extent(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| if p.std.is_finite() { p.mean + p.std } else { p.mean })
            .filter(|v| v.is_finite())
            .max_by(f64::total_cmp)
    }
}

/// Exact-equality key for grouping on floating point x values
#[derive(Debug, Clone, Copy)]
struct GroupKey(f64);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Running sums for one group
#[derive(Debug, Default)]
struct Accumulator {
    values: Vec<f64>,
}

impl Accumulator {
    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation (n - 1 denominator)
    fn std(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return f64::NAN;
        }
        let mean = self.mean();
        let var = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    }
}

/// Group `ys` by the exact value of the matching `xs` entry.
///
/// Rows with a missing x are dropped. Missing y values are ignored inside a
/// group; a group with no valid y has a NaN mean, and one with fewer than two
/// a NaN std.
pub fn group_stats(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<SeriesPoint> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

    for (x, y) in xs.iter().zip(ys) {
        let Some(x) = x else { continue };
        // -0.0 and 0.0 are the same step
        let acc = groups.entry(GroupKey(x + 0.0)).or_default();
        if let Some(y) = y {
            acc.values.push(*y);
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| SeriesPoint {
            x: key.0,
            mean: acc.mean(),
            std: acc.std(),
        })
        .collect()
}

/// Uniform moving average with "same"-length convolution semantics.
///
/// Positions outside the input count as zeros, so the first and last
/// `window / 2` outputs are attenuated. A window of 1 returns the input.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return values.to_vec();
    }

    let n = values.len() as isize;
    let w = window as isize;
    let weight = 1.0 / window as f64;
    let shift = (w - 1) / 2;

    (0..n)
        .map(|i| {
            let hi = i + shift;
            let lo = (hi - (w - 1)).max(0);
            let hi = hi.min(n - 1);
            (lo..=hi).map(|j| values[j as usize] * weight).sum()
        })
        .collect()
}

/// Aggregate a merged table into smoothed mean/std points.
///
/// An empty table yields no points.
pub fn aggregate(table: &Table, xaxis: &str, yaxis: &str, window: usize) -> Result<Vec<SeriesPoint>> {
    let xs = table.numeric_column(xaxis)?;
    let ys = table.numeric_column(yaxis)?;
    Ok(smooth(group_stats(&xs, &ys), window))
}

/// Smooth the mean and std sequences of `points` independently
pub fn smooth(mut points: Vec<SeriesPoint>, window: usize) -> Vec<SeriesPoint> {
    if window <= 1 {
        return points;
    }

    let means: Vec<f64> = points.iter().map(|p| p.mean).collect();
    let stds: Vec<f64> = points.iter().map(|p| p.std).collect();
    let means = moving_average(&means, window);
    let stds = moving_average(&stds, window);

    for ((p, m), s) in points.iter_mut().zip(means).zip(stds) {
        p.mean = m;
        p.std = s;
    }
    points
}
