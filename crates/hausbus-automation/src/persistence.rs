//! Schedule persistence using JSON file storage

use crate::trigger::Trigger;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Durable form of one scheduled task: the trigger plus the name of the
/// registered action it resolves to on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub trigger: Trigger,
    pub task: String,
}

/// Load persisted schedule records.
///
/// A missing file means a fresh start. Records that fail to parse are
/// logged and skipped individually, so one malformed entry cannot take
/// down the whole reload.
pub async fn load_schedules(path: &Path) -> HashMap<String, ScheduleRecord> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No schedule file found at {:?}, starting fresh", path);
            return HashMap::new();
        }
        Err(e) => {
            tracing::warn!("Failed to read schedule file {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let raw: HashMap<String, serde_json::Value> = match serde_json::from_str(&contents) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Failed to parse schedule file {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let mut records = HashMap::new();
    for (id, value) in raw {
        match serde_json::from_value::<ScheduleRecord>(value) {
            Ok(record) => {
                records.insert(id, record);
            }
            Err(e) => {
                tracing::warn!("Skipping malformed schedule record '{}': {}", id, e);
            }
        }
    }
    tracing::info!("Loaded {} schedule records from {:?}", records.len(), path);
    records
}

/// Save schedule records to a JSON file atomically.
pub async fn save_schedules(
    path: &Path,
    records: &HashMap<String, ScheduleRecord>,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    // Write atomically: write to temp file, then rename
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).await?;
    fs::rename(&tmp_path, path).await?;

    tracing::debug!("Saved {} schedule records to {:?}", records.len(), path);
    Ok(())
}
