//! Reconciles summary feature names with pooled feature names.
//!
//! The summary table names features with a category prefix
//! (`cosinor_mesor`) that the per-file payloads usually lack (`mesor`).
//! Each summary name is resolved by the first matcher in
//! [`default_matchers`] that finds a pooled name.

use serde::Serialize;
use tracing::debug;

/// Prefixes the summary table may put in front of a pooled name.
pub const SUMMARY_PREFIXES: [&str; 3] = ["cosinor_", "nonparam_", "physical_activity_"];

/// One strategy for finding the pooled name of a summary name.
pub trait FeatureMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn find<'a>(&self, summary_name: &str, pooled: &'a [String]) -> Option<&'a String>;
}

/// Identical names.
pub struct ExactMatcher;

impl FeatureMatcher for ExactMatcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find<'a>(&self, summary_name: &str, pooled: &'a [String]) -> Option<&'a String> {
        pooled.iter().find(|p| *p == summary_name)
    }
}

/// Identical after removing the first matching prefix of the summary name.
pub struct PrefixStrippedMatcher {
    pub prefixes: Vec<String>,
}

impl Default for PrefixStrippedMatcher {
    fn default() -> Self {
        Self {
            prefixes: SUMMARY_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl FeatureMatcher for PrefixStrippedMatcher {
    fn name(&self) -> &'static str {
        "prefix_stripped"
    }

    fn find<'a>(&self, summary_name: &str, pooled: &'a [String]) -> Option<&'a String> {
        let stripped = self
            .prefixes
            .iter()
            .find_map(|prefix| summary_name.strip_prefix(prefix.as_str()))?;
        pooled.iter().find(|p| *p == stripped)
    }
}

pub struct CaseInsensitiveMatcher;

impl FeatureMatcher for CaseInsensitiveMatcher {
    fn name(&self) -> &'static str {
        "case_insensitive"
    }

    fn find<'a>(&self, summary_name: &str, pooled: &'a [String]) -> Option<&'a String> {
        let wanted = summary_name.to_lowercase();
        pooled.iter().find(|p| p.to_lowercase() == wanted)
    }
}

/// Case-insensitive containment in either direction.
pub struct SubstringMatcher;

impl FeatureMatcher for SubstringMatcher {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn find<'a>(&self, summary_name: &str, pooled: &'a [String]) -> Option<&'a String> {
        let wanted = summary_name.to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        pooled.iter().find(|p| {
            let candidate = p.to_lowercase();
            !candidate.is_empty() && (candidate.contains(&wanted) || wanted.contains(&candidate))
        })
    }
}

/// Matchers in resolution order.
pub fn default_matchers() -> Vec<Box<dyn FeatureMatcher>> {
    vec![
        Box::new(ExactMatcher),
        Box::new(PrefixStrippedMatcher::default()),
        Box::new(CaseInsensitiveMatcher),
        Box::new(SubstringMatcher),
    ]
}

/// How the plotted feature order was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// At least one summary name resolved; order follows the summary.
    Summary,
    /// No summary name resolved; every pooled feature in pooled order.
    AllPooled,
}

/// Ordered pooled feature names to plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureOrder {
    pub names: Vec<String>,
    pub source: OrderSource,
}

impl FeatureOrder {
    /// Resolve with [`default_matchers`].
    pub fn resolve(summary_names: &[String], pooled_names: &[String]) -> Self {
        Self::resolve_with(&default_matchers(), summary_names, pooled_names)
    }

    /// Resolve each summary name with the first matcher that finds a pooled
    /// name. Unresolved names are dropped, duplicates keep their first
    /// position.
    pub fn resolve_with(
        matchers: &[Box<dyn FeatureMatcher>],
        summary_names: &[String],
        pooled_names: &[String],
    ) -> Self {
        let mut names: Vec<String> = Vec::new();
        for summary_name in summary_names {
            let found = matchers.iter().find_map(|matcher| {
                matcher
                    .find(summary_name, pooled_names)
                    .map(|pooled| (matcher.name(), pooled))
            });
            match found {
                Some((matcher, pooled)) => {
                    debug!(summary = %summary_name, pooled = %pooled, matcher, "Resolved feature");
                    if !names.contains(pooled) {
                        names.push(pooled.clone());
                    }
                }
                None => debug!(summary = %summary_name, "Summary feature has no pooled values"),
            }
        }

        if names.is_empty() {
            return Self {
                names: pooled_names.to_vec(),
                source: OrderSource::AllPooled,
            };
        }
        Self {
            names,
            source: OrderSource::Summary,
        }
    }
}
