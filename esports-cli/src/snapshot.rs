//! Resumable snapshots of tournament state

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tournament state plus what is needed to continue it identically
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub saved_at: DateTime<Utc>,
    /// Base seed every match stream is derived from
    pub seed: u64,
    pub state: T,
}

impl<T> Snapshot<T> {
    pub fn new(seed: u64, state: T) -> Self {
        Self {
            saved_at: Utc::now(),
            seed,
            state,
        }
    }
}

pub fn save_snapshot<T: Serialize>(path: &Path, snapshot: &Snapshot<T>) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    tracing::info!(path = %path.display(), "snapshot saved");
    Ok(())
}

pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Snapshot<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: Snapshot<T> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    tracing::info!(path = %path.display(), saved_at = %snapshot.saved_at, seed = snapshot.seed, "snapshot loaded");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("esports-snapshot-{}.json", std::process::id()));
        let snapshot = Snapshot::new(99, vec![1u64, 2, 3]);
        save_snapshot(&path, &snapshot).unwrap();

        let loaded: Snapshot<Vec<u64>> = load_snapshot(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.seed, 99);
        assert_eq!(loaded.state, vec![1, 2, 3]);
        assert_eq!(loaded.saved_at, snapshot.saved_at);
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let result: Result<Snapshot<u64>> = load_snapshot(Path::new("/nonexistent/esports.json"));
        assert!(result.is_err());
    }
}
