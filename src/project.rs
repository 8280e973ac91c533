//! Markers identifying a scaffolded spectrena project.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory that marks a scaffolded project root.
pub const SPECTRENA_DIR: &str = ".spectrena";

/// Version reported before any release has been applied.
const UNSYNCED_VERSION: &str = "0.0.0";

/// The `.spectrena/` directory under a project root.
pub fn spectrena_dir(project_root: &Path) -> PathBuf {
    project_root.join(SPECTRENA_DIR)
}

/// Whether the directory is a spectrena project.
pub fn is_project(project_root: &Path) -> bool {
    spectrena_dir(project_root).is_dir()
}

fn version_file(project_root: &Path) -> PathBuf {
    spectrena_dir(project_root).join(".version")
}

/// Currently applied template version, or `0.0.0` when no marker exists.
pub fn current_version(project_root: &Path) -> String {
    fs::read_to_string(version_file(project_root))
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| UNSYNCED_VERSION.to_string())
}

/// Persist the applied version. Written only after a successful apply.
pub fn save_version(project_root: &Path, version: &str) -> Result<()> {
    let path = version_file(project_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, version)
        .with_context(|| format!("Failed to write version marker: {}", path.display()))?;
    Ok(())
}

/// Whether a lineage store exists. The store itself belongs to the lineage
/// tracker; this engine only detects its presence.
pub fn lineage_store_exists(project_root: &Path) -> bool {
    spectrena_dir(project_root).join("lineage.db").exists()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn is_project_requires_marker_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_project(tmp.path()));

        fs::create_dir(tmp.path().join(SPECTRENA_DIR)).unwrap();
        assert!(is_project(tmp.path()));
    }

    #[test]
    fn current_version_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(current_version(tmp.path()), "0.0.0");
    }

    #[test]
    fn version_round_trips_trimmed() {
        let tmp = TempDir::new().unwrap();
        save_version(tmp.path(), "1.4.0").unwrap();
        assert_eq!(current_version(tmp.path()), "1.4.0");

        fs::write(version_file(tmp.path()), "2.0.0\n").unwrap();
        assert_eq!(current_version(tmp.path()), "2.0.0");
    }

    #[test]
    fn lineage_store_detected() {
        let tmp = TempDir::new().unwrap();
        assert!(!lineage_store_exists(tmp.path()));

        fs::create_dir_all(tmp.path().join(SPECTRENA_DIR).join("lineage.db")).unwrap();
        assert!(lineage_store_exists(tmp.path()));
    }
}
