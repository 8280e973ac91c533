//! Update plan construction.

use crate::engine::differ;
use crate::engine::hash;
use crate::engine::ledger::HashLedger;
use crate::engine::patterns::{PatternSet, UpdateAction};
use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// A single per-file decision in an update plan.
#[derive(Debug, Clone)]
pub struct FileUpdate {
    /// Root-relative, forward-slash path.
    pub path: String,
    pub action: UpdateAction,
    pub reason: &'static str,
    /// Digest of the current local file, if one exists.
    pub old_hash: Option<String>,
    /// Digest of the incoming template file.
    pub new_hash: String,
    /// Unified diff, attached only to merge entries whose local copy
    /// pre-existed (and is text).
    pub diff: Option<String>,
}

/// Ordered pre-mutation decisions for one update run. Built fresh per
/// invocation and never persisted.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub from_version: String,
    pub to_version: String,
    pub files: Vec<FileUpdate>,
}

impl UpdatePlan {
    fn count(&self, action: UpdateAction) -> usize {
        self.files.iter().filter(|f| f.action == action).count()
    }

    pub fn preserve_count(&self) -> usize {
        self.count(UpdateAction::Preserve)
    }

    pub fn update_count(&self) -> usize {
        self.count(UpdateAction::Update)
    }

    pub fn merge_count(&self) -> usize {
        self.count(UpdateAction::Merge)
    }

    pub fn add_count(&self) -> usize {
        self.count(UpdateAction::Add)
    }
}

/// Walk the incoming template tree and decide an action for every file.
///
/// The plan covers exactly the incoming tree in sorted traversal order;
/// files that exist only locally are never represented. A file counts as
/// modified when it exists locally and its digest differs from the ledger
/// entry; a file with no ledger entry is conservatively treated as
/// modified even when it is byte-identical to the incoming version.
pub fn create_update_plan(
    project_root: &Path,
    template_root: &Path,
    current_version: &str,
    new_version: &str,
    patterns: &PatternSet,
) -> Result<UpdatePlan> {
    let ledger = HashLedger::load(project_root)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(template_root).sort_by_file_name() {
        let entry = entry.with_context(|| {
            format!("Failed to walk template tree: {}", template_root.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(template_root).with_context(|| {
            format!("Template entry outside root: {}", entry.path().display())
        })?;
        let rel_path = to_slash(rel);

        let local_path = project_root.join(rel);
        let exists = local_path.exists();
        let old_hash = hash::digest_file(&local_path)?;
        let new_hash = hash::digest_file(entry.path())?
            .with_context(|| format!("Template file vanished: {}", entry.path().display()))?;

        let modified = exists && old_hash.as_deref() != ledger.get(&rel_path);
        let (action, reason) = patterns.classify(&rel_path, exists, modified);

        let diff = if action == UpdateAction::Merge && exists {
            differ::diff_files(&local_path, entry.path())?
        } else {
            None
        };

        files.push(FileUpdate {
            path: rel_path,
            action,
            reason,
            old_hash,
            new_hash,
            diff,
        });
    }

    Ok(UpdatePlan {
        from_version: current_version.to_string(),
        to_version: new_version.to_string(),
        files,
    })
}

/// Forward-slash rendition of a relative path, for pattern matching and
/// the ledger.
fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Tests
// ============================================================================
