//! Service layer: batch lifecycle and feature analytics.
//!
//! The lifecycle side ([`batch_controller`], [`batch_state`], the two guards
//! [`schema_validator`] and [`cosinorage_gate`]) talks to the analysis
//! service. The analytics side ([`feature_aggregator`], [`feature_matching`],
//! [`distributions`], [`correlation`]) is pure and works on a finished
//! [`BatchResult`](crate::api::BatchResult).

pub mod batch_controller;
pub mod batch_outcome;
pub mod batch_state;
pub mod column_defaults;
pub mod correlation;
pub mod cosinorage_gate;
pub mod distributions;
pub mod feature_aggregator;
pub mod feature_matching;
pub mod feature_names;
pub mod schema_validator;

#[cfg(test)]
#[path = "distributions_tests.rs"]
mod distributions_tests;

pub use batch_controller::{BatchController, ControllerError, ControllerResult};
pub use batch_outcome::BatchOutcome;
pub use batch_state::{reduce, BatchEvent, BatchState, TransitionError};
pub use column_defaults::{default_column_selection, ColumnDefaults};
pub use correlation::{color_for, heatmap, Heatmap, HeatmapCell, Rgb};
pub use cosinorage_gate::GateStatus;
pub use distributions::{
    build_feature_distributions, distributions_for, estimate, DistributionStats,
    FeatureDistribution, FeatureDistributions,
};
pub use feature_aggregator::{aggregate, FeatureAggregate};
pub use feature_matching::{FeatureMatcher, FeatureOrder, OrderSource};
pub use feature_names::display_name;
