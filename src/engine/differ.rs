//! Unified diffs for files deferred to manual reconciliation.

use anyhow::{Context, Result};
use similar::TextDiff;
use std::fs;
use std::path::Path;

/// Unified diff between the current and incoming version of a file.
/// Headers follow the `current/` vs `updated/` convention used by the
/// reconciliation document.
pub fn unified_diff(old: &str, new: &str, name: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("current/{name}"), &format!("updated/{name}"))
        .to_string()
}

/// Diff two files on disk, or `None` when either side is not valid UTF-8.
/// Binary templates get no inline diff.
pub fn diff_files(old_path: &Path, new_path: &Path) -> Result<Option<String>> {
    let old = fs::read(old_path)
        .with_context(|| format!("Failed to read {}", old_path.display()))?;
    let new = fs::read(new_path)
        .with_context(|| format!("Failed to read {}", new_path.display()))?;

    match (String::from_utf8(old).ok(), String::from_utf8(new).ok()) {
        (Some(old_text), Some(new_text)) => {
            let name = new_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file");
            Ok(Some(unified_diff(&old_text, &new_text, name)))
        }
        _ => Ok(None),
    }
}

// ============================================================================
// Tests
// ============================================================================
