//! Domain models shared by the services.

pub mod batch_config;
pub mod cosinor;
pub mod feature;

pub use batch_config::{
    BatchConfig, ColumnMapping, ConfigDraft, ConfigError, DataType, DataUnit, TimestampFormat,
};
pub use cosinor::{CosinorAgeInput, Gender};
pub use feature::{CategoryMap, FeatureMap, FeatureValue, NumericLeaves, RejectedLeaf};
