//! Pools per-file feature values into one observation vector per feature.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::api::PerFileResult;
use crate::models::FeatureValue;

/// Pooled observations of a batch, in first-seen feature order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureAggregate {
    /// Feature name → every finite number reported for it across files.
    pub pooled: IndexMap<String, Vec<f64>>,
    /// Feature name → values that produced no finite number at all.
    pub rejected: IndexMap<String, Vec<FeatureValue>>,
}

impl FeatureAggregate {
    pub fn pooled_names(&self) -> Vec<String> {
        self.pooled.keys().cloned().collect()
    }

    pub fn values(&self, feature: &str) -> Option<&[f64]> {
        self.pooled.get(feature).map(Vec::as_slice)
    }
}

/// Pool every feature of every file.
///
/// Scalars and composite values of the same name pool together: a composite
/// contributes all of its finite leaves under its top-level name, so a
/// per-day array lands in the same distribution as a scalar.
pub fn aggregate(results: &[PerFileResult]) -> FeatureAggregate {
    let mut aggregate = FeatureAggregate::default();

    for result in results {
        for (category, features) in &result.features {
            for (name, value) in features {
                let leaves = value.numeric_leaves(name);
                if leaves.is_empty() {
                    debug!(
                        file = %result.filename,
                        category = %category,
                        feature = %name,
                        "Feature has no numeric values"
                    );
                    aggregate
                        .rejected
                        .entry(name.clone())
                        .or_default()
                        .push(value.clone());
                    continue;
                }

                if !leaves.rejected.is_empty() {
                    debug!(
                        file = %result.filename,
                        feature = %name,
                        skipped = leaves.rejected.len(),
                        paths = ?leaves.rejected.iter().map(|leaf| leaf.path.as_str()).collect::<Vec<_>>(),
                        "Skipped non-numeric leaves"
                    );
                }
                aggregate
                    .pooled
                    .entry(name.clone())
                    .or_default()
                    .extend(leaves.values);
            }
        }
    }

    aggregate
}
