//! Per-feature histogram and density estimation.
//!
//! For each plotted feature the pooled observations are turned into an
//! equal-width histogram, a Gaussian kernel density curve and a combined
//! series that aligns both on the bin midpoints (bars plus a line on a second
//! axis).

use serde::Serialize;
use std::f64::consts::PI;

use super::feature_aggregator::FeatureAggregate;
use super::feature_matching::{FeatureOrder, OrderSource};
use super::feature_names::display_name;
use crate::api::BatchResult;

/// Points the density curve is sampled at.
pub const DENSITY_POINTS: usize = 101;

const MIN_BINS: usize = 5;
const MAX_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// `"{start}-{end}"` with three decimals, trailing zeros trimmed.
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityPoint {
    pub x: f64,
    pub density: f64,
}

/// One histogram bin with the density at its midpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedPoint {
    pub label: String,
    pub midpoint: f64,
    pub count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureDistribution {
    pub histogram: Vec<HistogramBin>,
    pub density: Vec<DensityPoint>,
    pub combined: Vec<CombinedPoint>,
}

impl FeatureDistribution {
    /// Nothing to render.
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }
}

/// Descriptive statistics of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl DistributionStats {
    /// Compute statistics over the finite values. All fields are zero when
    /// there are none.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                sum: 0.0,
            };
        }

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mean = sum / count as f64;

        let variance = sorted
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Self {
            count,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
            sum,
        }
    }

    /// Caption line, e.g. `n = 3 | Mean = 420.0000 | Std = 8.1650`.
    pub fn caption(&self) -> String {
        if self.count == 0 {
            return "n = 0 | Mean = N/A | Std = N/A".to_string();
        }
        format!(
            "n = {} | Mean = {:.4} | Std = {:.4}",
            self.count, self.mean, self.std_dev
        )
    }
}

/// `clamp(round(sqrt(n)), 5, 20)`.
pub fn bin_count(n: usize) -> usize {
    ((n as f64).sqrt().round() as usize).clamp(MIN_BINS, MAX_BINS)
}

/// KDE bandwidth `range / n^0.2`.
///
/// An approximation of Silverman's rule `1.06·σ·n^-1/5` that uses the range
/// in place of `1.06·σ`.
pub fn bandwidth(range: f64, n: usize) -> f64 {
    range / (n as f64).powf(0.2)
}

/// A bin edge with three decimals and trailing zeros removed.
pub fn format_edge(value: f64) -> String {
    let fixed = format!("{:.3}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn bin_label(start: f64, end: f64) -> String {
    format!("{}-{}", format_edge(start), format_edge(end))
}

/// Split a bin label back into its edges.
///
/// The separator is the first `-` after the first character, so a negative
/// lower edge (`"-6.075--5.073"`) and a range crossing zero (`"-1.5-2"`) both
/// parse.
pub fn parse_bin_label(label: &str) -> Option<(f64, f64)> {
    let label = label.trim();
    let (split, _) = label.char_indices().skip(1).find(|(_, c)| *c == '-')?;
    let start = label[..split].trim().parse::<f64>().ok()?;
    let end = label[split + 1..].trim().parse::<f64>().ok()?;
    (start.is_finite() && end.is_finite()).then_some((start, end))
}

fn gaussian_density(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    let norm = bandwidth * (2.0 * PI).sqrt();
    let total: f64 = values
        .iter()
        .map(|value| {
            let u = (x - value) / bandwidth;
            (-0.5 * u * u).exp() / norm
        })
        .sum();
    total / values.len() as f64
}

/// Density at the sampled point closest to `x`; the first one wins ties.
fn nearest_density(density: &[DensityPoint], x: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for point in density {
        let distance = (point.x - x).abs();
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, point.density)),
        }
    }
    best.map(|(_, density)| density)
}

fn combine(histogram: &[HistogramBin], density: &[DensityPoint]) -> Vec<CombinedPoint> {
    histogram
        .iter()
        .filter_map(|bin| {
            let (start, end) = parse_bin_label(&bin.label)?;
            let midpoint = start / 2.0 + end / 2.0;
            Some(CombinedPoint {
                label: bin.label.clone(),
                midpoint,
                count: bin.count,
                density: nearest_density(density, midpoint)?,
            })
        })
        .collect()
}

/// Histogram, density curve and combined series of one feature.
///
/// Non-finite values are ignored. No values at all yields an empty
/// distribution; identical values yield a single bin and a single density
/// point of 1.0.
pub fn estimate(values: &[f64]) -> FeatureDistribution {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = values.len();
    if n == 0 {
        return FeatureDistribution::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range == 0.0 {
        let label = format!("{:.3}-{:.3}", min, min);
        return FeatureDistribution {
            histogram: vec![HistogramBin {
                label: label.clone(),
                start: min,
                end: min,
                count: n,
            }],
            density: vec![DensityPoint { x: min, density: 1.0 }],
            combined: vec![CombinedPoint {
                label,
                midpoint: min,
                count: n,
                density: 1.0,
            }],
        };
    }

    // Values spanning more than f64::MAX are binned and smoothed in units of
    // the largest magnitude; densities are converted back per original unit.
    let scale = if range.is_finite() {
        1.0
    } else {
        min.abs().max(max.abs())
    };
    let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();
    let (min_s, max_s) = (min / scale, max / scale);
    let range_s = max_s - min_s;

    let bins = bin_count(n);
    let width = range_s / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| {
            let start = ((min_s + i as f64 * width) * scale).max(min);
            let end = ((min_s + (i + 1) as f64 * width) * scale).min(max);
            HistogramBin {
                label: bin_label(start, end),
                start,
                end,
                count: 0,
            }
        })
        .collect();
    for value in &scaled {
        let index = (((value - min_s) / width).floor() as usize).min(bins - 1);
        histogram[index].count += 1;
    }

    let h = bandwidth(range_s, n);
    let steps = (DENSITY_POINTS - 1) as f64;
    let density: Vec<DensityPoint> = (0..DENSITY_POINTS)
        .map(|i| {
            let x = min_s + (i as f64 / steps) * range_s;
            DensityPoint {
                x: (x * scale).clamp(min, max),
                density: gaussian_density(x, &scaled, h) / scale,
            }
        })
        .filter(|point| point.density.is_finite())
        .collect();

    let combined = combine(&histogram, &density);
    FeatureDistribution {
        histogram,
        density,
        combined,
    }
}

/// Everything needed to render one feature panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturePanel {
    pub feature: String,
    pub display_name: String,
    pub stats: DistributionStats,
    pub distribution: FeatureDistribution,
}

/// Distribution panels of a batch, in plotting order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDistributions {
    pub source: OrderSource,
    pub panels: Vec<FeaturePanel>,
}

/// Reconcile the summary names with the pooled names and estimate every
/// resolved feature. Features without values are skipped.
pub fn build_feature_distributions(
    aggregate: &FeatureAggregate,
    summary_names: &[String],
) -> FeatureDistributions {
    let order = FeatureOrder::resolve(summary_names, &aggregate.pooled_names());
    let panels = order
        .names
        .iter()
        .filter_map(|feature| {
            let values = aggregate.values(feature)?;
            let distribution = estimate(values);
            if distribution.is_empty() {
                return None;
            }
            Some(FeaturePanel {
                feature: feature.clone(),
                display_name: display_name(feature),
                stats: DistributionStats::from_values(values),
                distribution,
            })
        })
        .collect();

    FeatureDistributions {
        source: order.source,
        panels,
    }
}

/// [`build_feature_distributions`] for a whole batch result.
pub fn distributions_for(result: &BatchResult) -> FeatureDistributions {
    let aggregate = super::feature_aggregator::aggregate(&result.individual_results);
    build_feature_distributions(&aggregate, &result.summary_features())
}
