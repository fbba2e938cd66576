//! Diagnosis data model
//!
//! The shape of one analysis result as returned by the model. All fields
//! are required; a response missing any of them fails deserialization,
//! which the client treats as a contract violation rather than a partial
//! result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnosed condition
///
/// Closed set; an unknown severity string in a response is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Mild => write!(f, "Mild"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Severe => write!(f, "Severe"),
        }
    }
}

/// A labeled region of interest on the captured image
///
/// `box_2d` is `[ymin, xmin, ymax, xmax]` on a 0-1000 normalized scale,
/// independent of the image's pixel dimensions or aspect ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Detection {
    pub label: String,
    pub box_2d: [f64; 4],
}

/// Fractional placement of a detection overlay within the displayed
/// image bounds (each component in 0.0..=1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OverlayRect {
    pub top: f64,
    pub left: f64,
    pub height: f64,
    pub width: f64,
}

impl Detection {
    /// Whether the box lies inside the 0-1000 scale with positive extent
    /// on both axes
    pub(crate) fn has_valid_box(&self) -> bool {
        let [ymin, xmin, ymax, xmax] = self.box_2d;
        let in_range = self
            .box_2d
            .iter()
            .all(|v| v.is_finite() && (0.0..=1000.0).contains(v));
        in_range && ymin < ymax && xmin < xmax
    }

    /// Convert the 0-1000 box to fractional offsets of the rendered image
    ///
    /// The caller scales these by the displayed bounds, which preserves
    /// the image's actual aspect ratio.
    pub(crate) fn overlay(&self) -> OverlayRect {
        let [ymin, xmin, ymax, xmax] = self.box_2d;
        OverlayRect {
            top: ymin / 1000.0,
            left: xmin / 1000.0,
            height: (ymax - ymin) / 1000.0,
            width: (xmax - xmin) / 1000.0,
        }
    }
}

/// Structured result of one analysis call
///
/// Produced atomically by the analysis client; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Diagnosis {
    pub condition: String,
    pub confidence: f64,
    pub description: String,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    #[serde(rename = "suggestedIngredients")]
    pub suggested_ingredients: Vec<String>,
    pub disclaimer: String,
    pub detections: Vec<Detection>,
}
