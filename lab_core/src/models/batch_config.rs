//! Column and format configuration shared by every file of a batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of signal stored in the uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Accelerometer,
    Enmo,
    AlternativeCount,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Accelerometer => "accelerometer",
            DataType::Enmo => "enmo",
            DataType::AlternativeCount => "alternative_count",
        }
    }

    /// Units offered for this data type. Empty when the type is unitless.
    pub fn allowed_units(&self) -> &'static [DataUnit] {
        match self {
            DataType::Accelerometer => &[DataUnit::MilliG, DataUnit::G, DataUnit::MetersPerSecondSquared],
            DataType::Enmo => &[DataUnit::MilliG, DataUnit::G],
            DataType::AlternativeCount => &[],
        }
    }

    pub fn requires_unit(&self) -> bool {
        !self.allowed_units().is_empty()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accelerometer" => Ok(Self::Accelerometer),
            "enmo" => Ok(Self::Enmo),
            "alternative_count" | "alternative-count" => Ok(Self::AlternativeCount),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }
}

/// Physical unit of the data columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataUnit {
    #[serde(rename = "mg")]
    MilliG,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "m/s²")]
    MetersPerSecondSquared,
}

impl DataUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataUnit::MilliG => "mg",
            DataUnit::G => "g",
            DataUnit::MetersPerSecondSquared => "m/s²",
        }
    }
}

impl fmt::Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mg" => Ok(Self::MilliG),
            "g" => Ok(Self::G),
            "m/s²" | "m/s2" | "m/s^2" => Ok(Self::MetersPerSecondSquared),
            _ => Err(format!("Unknown data unit: {}", s)),
        }
    }
}

/// How the time column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampFormat {
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "unix-s")]
    UnixSeconds,
    #[serde(rename = "unix-ms")]
    UnixMilliseconds,
}

impl TimestampFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampFormat::Datetime => "datetime",
            TimestampFormat::UnixSeconds => "unix-s",
            TimestampFormat::UnixMilliseconds => "unix-ms",
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "datetime" => Ok(Self::Datetime),
            "unix-s" => Ok(Self::UnixSeconds),
            "unix-ms" => Ok(Self::UnixMilliseconds),
            _ => Err(format!("Unknown timestamp format: {}", s)),
        }
    }
}

/// Which columns carry the signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnMapping {
    /// Three distinct acceleration axes.
    Axes { x: String, y: String, z: String },
    /// One or more data columns (ENMO, counts).
    Columns(Vec<String>),
}

impl ColumnMapping {
    /// Ordered column list as sent to the service.
    pub fn data_columns(&self) -> Vec<String> {
        match self {
            ColumnMapping::Axes { x, y, z } => vec![x.clone(), y.clone(), z.clone()],
            ColumnMapping::Columns(columns) => columns.clone(),
        }
    }
}

/// Reasons a [`ConfigDraft`] cannot become a [`BatchConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Data unit '{unit}' is not valid for data type '{data_type}'")]
    IncompatibleUnit { data_type: DataType, unit: DataUnit },

    #[error("Column '{0}' is selected more than once")]
    DuplicateColumn(String),

    #[error("Column '{0}' is used as both time column and data column")]
    TimeColumnReused(String),

    #[error("Column '{0}' does not exist in the uploaded files")]
    UnknownColumn(String),
}

/// Complete batch configuration.
///
/// Only [`ConfigDraft::finalize`] builds one, so holding a `BatchConfig` means
/// every required field is present and consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchConfig {
    data_type: DataType,
    data_unit: Option<DataUnit>,
    timestamp_format: TimestampFormat,
    time_column: String,
    columns: ColumnMapping,
}

impl BatchConfig {
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn data_unit(&self) -> Option<DataUnit> {
        self.data_unit
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn data_columns(&self) -> Vec<String> {
        self.columns.data_columns()
    }

    /// Back to an editable draft, e.g. to tweak one field and re-finalize.
    pub fn to_draft(&self) -> ConfigDraft {
        let mut draft = ConfigDraft {
            data_type: Some(self.data_type),
            data_unit: self.data_unit,
            timestamp_format: Some(self.timestamp_format),
            time_column: Some(self.time_column.clone()),
            ..Default::default()
        };
        match &self.columns {
            ColumnMapping::Axes { x, y, z } => {
                draft.x_column = Some(x.clone());
                draft.y_column = Some(y.clone());
                draft.z_column = Some(z.clone());
            }
            ColumnMapping::Columns(columns) => draft.data_columns = columns.clone(),
        }
        draft
    }
}

/// User-editable, possibly incomplete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDraft {
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub data_unit: Option<DataUnit>,
    #[serde(default)]
    pub timestamp_format: Option<TimestampFormat>,
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub x_column: Option<String>,
    #[serde(default)]
    pub y_column: Option<String>,
    #[serde(default)]
    pub z_column: Option<String>,
    #[serde(default)]
    pub data_columns: Vec<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ConfigDraft {
    /// Validate the draft against the known column names of the batch.
    ///
    /// `known_columns` may be empty when the column listing could not be
    /// fetched; membership is only checked when it is not.
    pub fn finalize(&self, known_columns: &[String]) -> Result<BatchConfig, ConfigError> {
        let data_type = self.data_type.ok_or(ConfigError::MissingField("data_type"))?;

        let data_unit = if data_type.requires_unit() {
            let unit = self.data_unit.ok_or(ConfigError::MissingField("data_unit"))?;
            if !data_type.allowed_units().contains(&unit) {
                return Err(ConfigError::IncompatibleUnit { data_type, unit });
            }
            Some(unit)
        } else {
            None
        };

        let timestamp_format = self
            .timestamp_format
            .ok_or(ConfigError::MissingField("timestamp_format"))?;
        let time_column = non_empty(&self.time_column)
            .ok_or(ConfigError::MissingField("time_column"))?
            .to_string();

        let columns = match data_type {
            DataType::Accelerometer => {
                let x = non_empty(&self.x_column).ok_or(ConfigError::MissingField("x_column"))?;
                let y = non_empty(&self.y_column).ok_or(ConfigError::MissingField("y_column"))?;
                let z = non_empty(&self.z_column).ok_or(ConfigError::MissingField("z_column"))?;
                ColumnMapping::Axes {
                    x: x.to_string(),
                    y: y.to_string(),
                    z: z.to_string(),
                }
            }
            DataType::Enmo | DataType::AlternativeCount => {
                let columns: Vec<String> = self
                    .data_columns
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                if columns.is_empty() {
                    return Err(ConfigError::MissingField("data_columns"));
                }
                ColumnMapping::Columns(columns)
            }
        };

        let data_columns = columns.data_columns();
        for (i, column) in data_columns.iter().enumerate() {
            if data_columns[..i].contains(column) {
                return Err(ConfigError::DuplicateColumn(column.clone()));
            }
            if *column == time_column {
                return Err(ConfigError::TimeColumnReused(column.clone()));
            }
        }

        if !known_columns.is_empty() {
            for column in std::iter::once(&time_column).chain(data_columns.iter()) {
                if !known_columns.contains(column) {
                    return Err(ConfigError::UnknownColumn(column.clone()));
                }
            }
        }

        Ok(BatchConfig {
            data_type,
            data_unit,
            timestamp_format,
            time_column,
            columns,
        })
    }

    pub fn is_complete(&self, known_columns: &[String]) -> bool {
        self.finalize(known_columns).is_ok()
    }
}
