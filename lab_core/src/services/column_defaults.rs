//! Initial column selection proposed after the schema is accepted.

use crate::models::{ConfigDraft, DataType};

/// Column names commonly used for the time column, in preference order.
pub const TIME_COLUMN_CANDIDATES: [&str; 5] = ["timestamp", "time", "datetime", "date", "t"];

/// Proposed column selection for one data type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDefaults {
    pub time_column: Option<String>,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub z_column: Option<String>,
    pub data_columns: Vec<String>,
}

impl ColumnDefaults {
    /// Write the proposal into `draft`, replacing its column fields.
    pub fn apply_to(&self, draft: &mut ConfigDraft) {
        draft.time_column = self.time_column.clone();
        draft.x_column = self.x_column.clone();
        draft.y_column = self.y_column.clone();
        draft.z_column = self.z_column.clone();
        draft.data_columns = self.data_columns.clone();
    }
}

/// Propose a time column and data columns from the batch's column names.
///
/// The time column is the first well-known name present, else the first
/// column. Accelerometer axes are the last columns whose lowercase name
/// contains `x`, `y` and `z` respectively (a column is tried as x first,
/// then y, then z); when any axis is missing the first three non-time
/// columns are used instead.
pub fn default_column_selection(columns: &[String], data_type: Option<DataType>) -> ColumnDefaults {
    let time_column = TIME_COLUMN_CANDIDATES
        .iter()
        .find(|candidate| columns.iter().any(|c| c == *candidate))
        .map(|candidate| candidate.to_string())
        .or_else(|| columns.first().cloned());

    let non_time: Vec<&String> = columns
        .iter()
        .filter(|c| Some(c.as_str()) != time_column.as_deref())
        .collect();

    let mut defaults = ColumnDefaults {
        time_column,
        ..Default::default()
    };

    match data_type {
        Some(DataType::Accelerometer) => {
            let (mut x, mut y, mut z) = (None, None, None);
            for column in &non_time {
                let lower = column.to_lowercase();
                if lower.contains('x') {
                    x = Some((*column).clone());
                } else if lower.contains('y') {
                    y = Some((*column).clone());
                } else if lower.contains('z') {
                    z = Some((*column).clone());
                }
            }
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => {
                    defaults.x_column = Some(x);
                    defaults.y_column = Some(y);
                    defaults.z_column = Some(z);
                }
                _ if non_time.len() >= 3 => {
                    defaults.x_column = Some(non_time[0].clone());
                    defaults.y_column = Some(non_time[1].clone());
                    defaults.z_column = Some(non_time[2].clone());
                }
                _ => {}
            }
        }
        Some(DataType::Enmo) => {
            let column = non_time
                .iter()
                .find(|c| c.to_lowercase().contains("enmo"))
                .or_else(|| non_time.first());
            defaults.data_columns = column.map(|c| (*c).clone()).into_iter().collect();
        }
        Some(DataType::AlternativeCount) => {
            defaults.data_columns = non_time.into_iter().cloned().collect();
        }
        None => {}
    }

    defaults
}
