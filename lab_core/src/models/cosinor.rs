//! Per-file inputs for the optional biological-age (cosinorage) step.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::UploadedFile;

/// Age assigned to freshly uploaded files.
pub const DEFAULT_AGE: &str = "50";

/// Oldest chronological age accepted by the prediction model.
pub const MAX_AGE: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

/// Age and gender for one uploaded file, as edited by the user.
///
/// `age` keeps the raw text so that a half-typed value can be represented;
/// `gender == None` is the "not selected" state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosinorAgeInput {
    pub file_id: String,
    pub filename: String,
    pub age: String,
    pub gender: Option<Gender>,
}

impl CosinorAgeInput {
    /// Defaults used right after upload: age 50, gender unknown.
    pub fn for_file(file: &UploadedFile) -> Self {
        Self {
            file_id: file.file_id.clone(),
            filename: file.filename.clone(),
            age: DEFAULT_AGE.to_string(),
            gender: Some(Gender::Unknown),
        }
    }

    /// Parsed age when it is a finite number in (0, 120].
    pub fn parsed_age(&self) -> Option<f64> {
        let age: f64 = self.age.trim().parse().ok()?;
        (age.is_finite() && age > 0.0 && age <= MAX_AGE).then_some(age)
    }

    pub fn is_usable(&self) -> bool {
        self.parsed_age().is_some() && self.gender.is_some()
    }
}
