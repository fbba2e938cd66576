//! Scan history persistence
//!
//! The bounded scan history lives in one JSON document under the
//! platform data directory. Loading is forgiving: a missing or corrupt
//! file is an empty history, never an error. Saving is best-effort; a
//! failed save is logged and the in-memory history stays authoritative.

use crate::analysis::Diagnosis;
use crate::capture::CapturedImage;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Maximum number of retained entries; older scans fall off the end
pub(crate) const HISTORY_CAP: usize = 5;

/// One past scan session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct HistoryEntry {
    /// Time-derived unique id (millisecond timestamp)
    pub id: String,
    /// Human-readable scan date
    pub date: String,
    /// Condition label, for list display
    pub condition: String,
    /// The captured image this diagnosis refers to
    pub image: CapturedImage,
    /// The full diagnosis
    pub result: Diagnosis,
}

impl HistoryEntry {
    /// Build an entry for a diagnosis completed at `at`
    pub(crate) fn new(image: CapturedImage, result: Diagnosis, at: DateTime<Local>) -> Self {
        Self {
            id: at.timestamp_millis().to_string(),
            date: at.format("%Y-%m-%d").to_string(),
            condition: result.condition.clone(),
            image,
            result,
        }
    }
}

/// Prepend an entry and truncate to the cap
///
/// Existing entries keep their relative order; only the oldest beyond
/// the cap is evicted.
pub(crate) fn push_entry(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.insert(0, entry);
    history.truncate(HISTORY_CAP);
}

/// Get the history file path
fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Dermalens").join("history.json"))
}

/// Load history from disk
///
/// Returns an empty history if the file doesn't exist or can't be read.
pub(crate) fn load_history() -> Vec<HistoryEntry> {
    let Some(path) = history_path() else {
        return Vec::new();
    };
    load_from(&path)
}

/// Save history to disk (full overwrite)
pub(crate) fn save_history(entries: &[HistoryEntry]) {
    let Some(path) = history_path() else {
        error!("Could not determine data directory; history not saved");
        return;
    };
    if let Err(e) = save_to(&path, entries) {
        // Not surfaced to the user; the session keeps its in-memory copy
        error!("Failed to save history: {}", e);
    }
}

fn load_from(path: &Path) -> Vec<HistoryEntry> {
    if !path.exists() {
        return Vec::new();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
            Ok(mut entries) => {
                entries.truncate(HISTORY_CAP);
                entries
            }
            Err(e) => {
                warn!("Failed to parse history, starting empty: {}", e);
                Vec::new()
            }
        },
        Err(e) => {
            warn!("Failed to read history file, starting empty: {}", e);
            Vec::new()
        }
    }
}

fn save_to(path: &Path, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created history directory: {:?}", parent);
        }
    }

    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json)?;
    info!("Saved {} history entries to {:?}", entries.len(), path);

    Ok(())
}

/// History persistence errors
#[derive(Debug, thiserror::Error)]
pub(crate) enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry(id_seed: i64) -> HistoryEntry {
        let at = Local.timestamp_millis_opt(1_700_000_000_000 + id_seed).unwrap();
        let diagnosis: Diagnosis = serde_json::from_value(serde_json::json!({
            "condition": format!("Condition {id_seed}"),
            "confidence": 0.9,
            "description": "A description.",
            "severity": "Moderate",
            "recommendations": ["Do this"],
            "suggestedIngredients": ["Niacinamide"],
            "disclaimer": "Not medical advice.",
            "detections": [{"label": "Spot", "box_2d": [10, 10, 20, 20]}]
        }))
        .expect("diagnosis");
        let image = CapturedImage {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8, id_seed as u8],
        };
        HistoryEntry::new(image, diagnosis, at)
    }

    #[test]
    fn test_push_entry_prepends_newest_first() {
        let mut history = Vec::new();
        push_entry(&mut history, sample_entry(1));
        push_entry(&mut history, sample_entry(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].condition, "Condition 2");
        assert_eq!(history[1].condition, "Condition 1");
    }

    #[test]
    fn test_push_entry_evicts_only_the_oldest_at_cap() {
        let mut history = Vec::new();
        for seed in 0..HISTORY_CAP as i64 {
            push_entry(&mut history, sample_entry(seed));
        }
        let before: Vec<String> = history.iter().map(|e| e.id.clone()).collect();

        push_entry(&mut history, sample_entry(99));

        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history[0].condition, "Condition 99");
        // survivors keep their relative order
        let after: Vec<String> = history[1..].iter().map(|e| e.id.clone()).collect();
        assert_eq!(after, before[..HISTORY_CAP - 1]);
    }

    #[test]
    fn test_save_load_round_trip_preserves_values_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");

        let entries = vec![sample_entry(3), sample_entry(2), sample_entry(1)];
        save_to(&path, &entries).expect("save");

        let loaded = load_from(&path);
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_from(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").expect("write");
        assert!(load_from(&path).is_empty());
    }

    #[test]
    fn test_load_truncates_oversized_file_to_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");

        let entries: Vec<HistoryEntry> = (0..8).map(sample_entry).collect();
        save_to(&path, &entries).expect("save");

        assert_eq!(load_from(&path).len(), HISTORY_CAP);
    }
}
