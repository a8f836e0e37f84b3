//! Enabled-station list stored as a flat text file (one station ID per line).

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

/// File name of the enabled-station list inside the data directory.
pub const ENABLED_STATIONS_FILE: &str = "enabled_stations.txt";

/// Loads the enabled-station list.
///
/// A missing file is not an error: a warning is logged and an empty list is
/// returned. Blank lines are ignored, surrounding whitespace is trimmed and
/// duplicates are dropped (first occurrence wins).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_enabled_stations(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        tracing::warn!("Enabled station list not found: {}", path.display());
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut seen = HashSet::new();
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(String::from)
        .collect())
}

/// Overwrites the enabled-station list, one ID per line.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn save_enabled_stations(path: &Path, station_ids: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut content = String::new();
    for id in station_ids {
        // Writing to a String cannot fail.
        let _ = writeln!(content, "{id}");
    }

    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use tracing::subscriber::with_default;
    use tracing_mock::{expect, subscriber};

    use super::*;

    #[test]
    fn test_save_and_load_roundtrip_keeps_order() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENABLED_STATIONS_FILE);
        let ids = vec![String::from("TBS"), String::from("LFR"), String::from("QRR")];

        // Act
        save_enabled_stations(&path, &ids).unwrap();
        let loaded = load_enabled_stations(&path).unwrap();

        // Assert
        assert_eq!(loaded, ids);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TBS\nLFR\nQRR\n");
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENABLED_STATIONS_FILE);
        save_enabled_stations(&path, &[String::from("OLD1"), String::from("OLD2")]).unwrap();

        // Act
        save_enabled_stations(&path, &[String::from("NEW")]).unwrap();

        // Assert
        assert_eq!(load_enabled_stations(&path).unwrap(), vec![String::from("NEW")]);
    }

    #[test]
    fn test_save_empty_list_creates_empty_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(ENABLED_STATIONS_FILE);

        // Act
        save_enabled_stations(&path, &[]).unwrap();

        // Assert
        assert!(path.exists());
        assert!(load_enabled_stations(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_skips_blank_lines_and_duplicates() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENABLED_STATIONS_FILE);
        std::fs::write(&path, "TBS\n\n  LFR  \nTBS\n\n").unwrap();

        // Act
        let loaded = load_enabled_stations(&path).unwrap();

        // Assert
        assert_eq!(loaded, vec![String::from("TBS"), String::from("LFR")]);
    }

    #[test]
    fn test_load_missing_file_warns_and_returns_empty() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");
        let (subscriber, handle) = subscriber::mock()
            .event(expect::event().at_level(tracing::Level::WARN))
            .run_with_handle();

        // Act
        let loaded = with_default(subscriber, || load_enabled_stations(&path).unwrap());

        // Assert
        assert!(loaded.is_empty());
        handle.assert_finished();
    }
}
