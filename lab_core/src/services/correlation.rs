//! Diverging colour scale and layout of the correlation heatmap.

use serde::Serialize;
use std::fmt;

use crate::api::CorrelationMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

pub const WHITE: Rgb = Rgb::new(255, 255, 255);
/// Colour of a coefficient of +1.
pub const POSITIVE_ANCHOR: Rgb = Rgb::new(0, 52, 240);
/// Colour of a coefficient of -1.
pub const NEGATIVE_ANCHOR: Rgb = Rgb::new(220, 53, 69);

fn mix(from: u8, to: u8, t: f64) -> u8 {
    let value = f64::from(from) + (f64::from(to) - f64::from(from)) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Colour of one coefficient: white at 0, blending linearly per channel
/// toward the positive or negative anchor by `|c|`. Input is clamped to
/// [-1, 1]; NaN is drawn as 0.
pub fn color_for(coefficient: f64) -> Rgb {
    let c = if coefficient.is_nan() {
        0.0
    } else {
        coefficient.clamp(-1.0, 1.0)
    };
    let anchor = if c >= 0.0 {
        POSITIVE_ANCHOR
    } else {
        NEGATIVE_ANCHOR
    };
    let t = c.abs();
    Rgb::new(
        mix(WHITE.r, anchor.r, t),
        mix(WHITE.g, anchor.g, t),
        mix(WHITE.b, anchor.b, t),
    )
}

/// One cell of the upper-triangular heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeatmapCell {
    /// A feature against itself.
    Diagonal { feature: String },
    /// Lower triangle, not drawn.
    Suppressed,
    Value {
        row: String,
        col: String,
        /// `None` when the matrix has no finite coefficient for the pair.
        coefficient: Option<f64>,
        color: Rgb,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub features: Vec<String>,
    /// `cells[i][j]` is row feature `i` against column feature `j`.
    pub cells: Vec<Vec<HeatmapCell>>,
}

/// Lay out the matrix as an upper-triangular grid in matrix key order.
///
/// The coefficient of cell (row, col) is read as `matrix[col][row]`.
pub fn heatmap(matrix: &CorrelationMatrix) -> Heatmap {
    let features: Vec<String> = matrix.keys().cloned().collect();
    let cells = features
        .iter()
        .enumerate()
        .map(|(i, row)| {
            features
                .iter()
                .enumerate()
                .map(|(j, col)| {
                    if i == j {
                        HeatmapCell::Diagonal {
                            feature: row.clone(),
                        }
                    } else if i > j {
                        HeatmapCell::Suppressed
                    } else {
                        let coefficient = matrix
                            .get(col)
                            .and_then(|column| column.get(row))
                            .copied()
                            .flatten()
                            .filter(|c| c.is_finite());
                        HeatmapCell::Value {
                            row: row.clone(),
                            col: col.clone(),
                            coefficient,
                            color: color_for(coefficient.unwrap_or(0.0)),
                        }
                    }
                })
                .collect()
        })
        .collect();

    Heatmap { features, cells }
}
