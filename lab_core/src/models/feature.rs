//! Per-file feature payloads.
//!
//! Biomarkers come back in different shapes under the same logical name: a plain
//! number, one number per day, or structured per-day objects. [`FeatureValue`]
//! keeps that shape instead of flattening it at the type level.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Feature name → value, within one category.
pub type FeatureMap = IndexMap<String, FeatureValue>;

/// Category (e.g. `sleep`, `cosinor`) → features of that category.
pub type CategoryMap = IndexMap<String, FeatureMap>;

/// A single feature value as reported for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// A plain number.
    Scalar(f64),
    /// An ordered sequence, typically one entry per day.
    Series(Vec<FeatureValue>),
    /// A structured value keyed by name (per-day sub-objects and similar).
    Nested(IndexMap<String, FeatureValue>),
    /// Anything else the service sent: null, strings, booleans.
    Opaque(serde_json::Value),
}

/// A leaf that could not contribute a finite number.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLeaf {
    /// Debug path, e.g. `TST_2` or `M10_day1`.
    pub path: String,
    pub value: FeatureValue,
}

/// Result of folding a [`FeatureValue`] down to its numeric leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericLeaves {
    pub values: Vec<f64>,
    pub rejected: Vec<RejectedLeaf>,
}

impl NumericLeaves {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FeatureValue {
    /// Collect every finite numeric leaf, depth first, in payload order.
    ///
    /// Array indices and object keys are appended to `root` with `_` to build
    /// the debug path of rejected leaves; they never affect the numbers.
    pub fn numeric_leaves(&self, root: &str) -> NumericLeaves {
        let mut leaves = NumericLeaves::default();
        self.fold_into(root.to_string(), &mut leaves);
        leaves
    }

    fn fold_into(&self, path: String, leaves: &mut NumericLeaves) {
        match self {
            FeatureValue::Scalar(v) if v.is_finite() => leaves.values.push(*v),
            FeatureValue::Series(items) => {
                for (index, item) in items.iter().enumerate() {
                    item.fold_into(format!("{}_{}", path, index), leaves);
                }
            }
            FeatureValue::Nested(entries) => {
                for (key, item) in entries {
                    item.fold_into(format!("{}_{}", path, key), leaves);
                }
            }
            // non-finite scalars and opaque values
            other => leaves.rejected.push(RejectedLeaf {
                path,
                value: other.clone(),
            }),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Scalar(value)
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(values: Vec<f64>) -> Self {
        FeatureValue::Series(values.into_iter().map(FeatureValue::Scalar).collect())
    }
}
