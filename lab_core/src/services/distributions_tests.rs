use super::distributions::*;
use super::feature_aggregator::FeatureAggregate;
use super::feature_matching::OrderSource;
use proptest::prelude::*;

#[test]
fn test_bin_count_bounds() {
    assert_eq!(bin_count(1), 5);
    assert_eq!(bin_count(24), 5);
    assert_eq!(bin_count(42), 6);
    assert_eq!(bin_count(100), 10);
    assert_eq!(bin_count(10_000), 20);
}

#[test]
fn test_format_edge() {
    assert_eq!(format_edge(1.5), "1.5");
    assert_eq!(format_edge(2.0), "2");
    assert_eq!(format_edge(100.0), "100");
    assert_eq!(format_edge(-6.0754), "-6.075");
    assert_eq!(format_edge(0.12345), "0.123");
    assert_eq!(format_edge(-0.0001), "0");
}

#[test]
fn test_parse_bin_label() {
    assert_eq!(parse_bin_label("1.5-2.25"), Some((1.5, 2.25)));
    assert_eq!(parse_bin_label("-6.075--5.073"), Some((-6.075, -5.073)));
    assert_eq!(parse_bin_label("-1.5-2"), Some((-1.5, 2.0)));
    assert_eq!(parse_bin_label("0-10"), Some((0.0, 10.0)));
    assert_eq!(parse_bin_label("-5.000--5.000"), Some((-5.0, -5.0)));
    assert_eq!(parse_bin_label("abc"), None);
    assert_eq!(parse_bin_label("-"), None);
    assert_eq!(parse_bin_label("1.5-"), None);
}

#[test]
fn test_estimate_empty() {
    assert!(estimate(&[]).is_empty());
    let distribution = estimate(&[f64::NAN, f64::INFINITY]);
    assert!(distribution.histogram.is_empty());
    assert!(distribution.density.is_empty());
    assert!(distribution.combined.is_empty());
}

#[test]
fn test_estimate_degenerate() {
    let distribution = estimate(&[7.25, 7.25, 7.25]);
    assert_eq!(distribution.histogram.len(), 1);
    assert_eq!(distribution.histogram[0].label, "7.250-7.250");
    assert_eq!(distribution.histogram[0].count, 3);
    assert_eq!(
        distribution.density,
        vec![DensityPoint {
            x: 7.25,
            density: 1.0
        }]
    );
    assert_eq!(distribution.combined.len(), 1);
    assert_eq!(distribution.combined[0].density, 1.0);

    let single = estimate(&[-3.0]);
    assert_eq!(single.histogram[0].label, "-3.000--3.000");
    assert_eq!(single.histogram[0].count, 1);
}

#[test]
fn test_estimate_assigns_max_to_last_bin() {
    let values: Vec<f64> = (0..=10).map(f64::from).collect();
    let distribution = estimate(&values);
    assert_eq!(distribution.histogram.len(), 5);
    assert_eq!(distribution.histogram[0].label, "0-2");
    assert_eq!(distribution.histogram[4].label, "8-10");
    // 8, 9 and the maximum 10
    assert_eq!(distribution.histogram[4].count, 3);
    assert_eq!(distribution.density.len(), DENSITY_POINTS);
    assert_eq!(distribution.density[0].x, 0.0);
    assert!((distribution.density[100].x - 10.0).abs() < 1e-9);
}

#[test]
fn test_combined_uses_midpoints() {
    let values = [-10.0, -5.0, 0.0, 5.0, 10.0];
    let distribution = estimate(&values);
    let midpoints: Vec<f64> = distribution.combined.iter().map(|p| p.midpoint).collect();
    assert_eq!(midpoints, vec![-8.0, -4.0, 0.0, 4.0, 8.0]);
    assert_eq!(distribution.histogram[2].label, "-2-2");

    // midpoint 0 is sampled exactly at x = 0 (index 50)
    assert_eq!(distribution.combined[2].density, distribution.density[50].density);
}

#[test]
fn test_negative_range_labels_round_trip() {
    let values = [-6.075, -5.9, -5.5, -5.2, -1.0];
    let distribution = estimate(&values);
    assert_eq!(distribution.combined.len(), distribution.histogram.len());
    for (bin, point) in distribution.histogram.iter().zip(&distribution.combined) {
        let (start, end) = parse_bin_label(&bin.label).unwrap();
        assert!(start < end, "label {} parsed as {} .. {}", bin.label, start, end);
        assert!((point.midpoint - (bin.start + bin.end) / 2.0).abs() < 1e-3);
    }
}

#[test]
fn test_density_is_kernel_average() {
    let values = [0.0, 1.0];
    let distribution = estimate(&values);
    let h = bandwidth(1.0, 2);
    let norm = h * (2.0 * std::f64::consts::PI).sqrt();
    let expected = (1.0 + (-0.5 / (h * h)).exp()) / norm / 2.0;
    assert!((distribution.density[0].density - expected).abs() < 1e-12);
}

#[test]
fn test_estimate_range_beyond_f64_max() {
    for values in [vec![-1e308, 1e308], vec![-f64::MAX, 0.0, f64::MAX]] {
        let distribution = estimate(&values);

        assert_eq!(distribution.density.len(), DENSITY_POINTS);
        assert!(distribution
            .density
            .iter()
            .all(|p| p.x.is_finite() && p.density.is_finite() && p.density >= 0.0));
        assert_eq!(distribution.density[0].x, values[0]);
        assert_eq!(distribution.density[100].x, values[values.len() - 1]);

        let counted: usize = distribution.histogram.iter().map(|bin| bin.count).sum();
        assert_eq!(counted, values.len());
        assert_eq!(distribution.histogram[0].start, values[0]);
        assert_eq!(distribution.histogram[4].end, values[values.len() - 1]);
        assert_eq!(distribution.histogram[0].count, 1);
        assert_eq!(distribution.histogram[4].count, 1);
        for bin in &distribution.histogram {
            assert!(!bin.label.contains("NaN") && !bin.label.contains("inf"));
        }
        assert_eq!(distribution.combined.len(), distribution.histogram.len());
        assert!(distribution.combined.iter().all(|p| p.midpoint.is_finite()));
    }
}

#[test]
fn test_compute_stats() {
    let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let stats = DistributionStats::from_values(&values);

    assert_eq!(stats.count, 5);
    assert_eq!(stats.mean, 3.0);
    assert_eq!(stats.median, 3.0);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 5.0);
    assert_eq!(stats.sum, 15.0);
    assert!((stats.std_dev - std::f64::consts::SQRT_2).abs() < 0.001);
    assert_eq!(stats.caption(), "n = 5 | Mean = 3.0000 | Std = 1.4142");
}

#[test]
fn test_compute_stats_empty() {
    let stats = DistributionStats::from_values(&[]);

    assert_eq!(stats.count, 0);
    assert_eq!(stats.mean, 0.0);
    assert_eq!(stats.caption(), "n = 0 | Mean = N/A | Std = N/A");
}

#[test]
fn test_compute_stats_even_count_median() {
    let stats = DistributionStats::from_values(&[4.0, 1.0, 3.0, 2.0]);
    assert_eq!(stats.median, 2.5);
}

fn aggregate_of(entries: &[(&str, &[f64])]) -> FeatureAggregate {
    let mut aggregate = FeatureAggregate::default();
    for (name, values) in entries {
        aggregate.pooled.insert(name.to_string(), values.to_vec());
    }
    aggregate
}

#[test]
fn test_build_feature_distributions_follows_summary() {
    let aggregate = aggregate_of(&[
        ("TST", &[420.0, 410.0, 430.0]),
        ("mesor", &[25.0, 30.0]),
        ("IS", &[0.5]),
    ]);
    let summary = vec!["cosinor_mesor".to_string(), "sleep_TST".to_string()];

    let distributions = build_feature_distributions(&aggregate, &summary);
    assert_eq!(distributions.source, OrderSource::Summary);
    let features: Vec<&str> = distributions.panels.iter().map(|p| p.feature.as_str()).collect();
    // "sleep_TST" resolves through the substring matcher
    assert_eq!(features, vec!["mesor", "TST"]);
    assert_eq!(distributions.panels[0].display_name, "MESOR");
    assert_eq!(distributions.panels[1].stats.count, 3);
}

#[test]
fn test_build_feature_distributions_fallback_and_skip() {
    let aggregate = aggregate_of(&[("TST", &[420.0]), ("empty", &[])]);
    let distributions = build_feature_distributions(&aggregate, &[]);
    assert_eq!(distributions.source, OrderSource::AllPooled);
    assert_eq!(distributions.panels.len(), 1);
    assert_eq!(distributions.panels[0].feature, "TST");
}

proptest! {
    #[test]
    fn prop_histogram_counts_sum_to_input(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..400)
    ) {
        let distribution = estimate(&values);
        let total: usize = distribution.histogram.iter().map(|bin| bin.count).sum();
        prop_assert_eq!(total, values.len());
    }

    #[test]
    fn prop_density_has_101_non_negative_points(
        mut values in prop::collection::vec(-1.0e3f64..1.0e3, 1..200),
        offset in 0.5f64..100.0
    ) {
        // guarantee at least one distinct value
        let first = values[0];
        values.push(first + offset);
        let distribution = estimate(&values);
        prop_assert_eq!(distribution.density.len(), DENSITY_POINTS);
        prop_assert!(distribution.density.iter().all(|p| p.density >= 0.0));
        let bins = distribution.histogram.len();
        prop_assert!((5..=20).contains(&bins));
    }

    #[test]
    fn prop_identical_values_single_bin(value in -1.0e6f64..1.0e6, n in 1usize..50) {
        let values = vec![value; n];
        let distribution = estimate(&values);
        prop_assert_eq!(distribution.histogram.len(), 1);
        prop_assert_eq!(distribution.histogram[0].count, n);
        prop_assert_eq!(distribution.density.len(), 1);
        prop_assert_eq!(distribution.density[0].x, value);
        prop_assert_eq!(distribution.density[0].density, 1.0);
    }

    #[test]
    fn prop_bin_labels_parse(start in -1.0e4f64..1.0e4, width in 0.001f64..1.0e3) {
        let label = bin_label(start, start + width);
        let parsed = parse_bin_label(&label);
        prop_assert!(parsed.is_some(), "label {} did not parse", label);
    }
}
