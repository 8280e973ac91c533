//! File categorization: maps (path, exists, modified) to an update action.

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Paths the user owns. Never touched, no matter what.
const PRESERVE_PATTERNS: &[&str] = &[
    ".spectrena/memory/**",
    ".spectrena/config.yml",
    ".spectrena/backlog.md",
    ".spectrena/lineage.db/**",
    ".spectrena/discovery.md",
    "specs/**",
];

/// Framework-owned paths, safe to overwrite on every update.
const UPDATE_PATTERNS: &[&str] = &[
    ".spectrena/scripts/**",
    ".claude/commands/*",
    ".cursor/commands/*",
    ".github/copilot-instructions.md",
    ".windsurf/commands/*",
    ".cline/commands/*",
    ".roo-cline/commands/*",
];

/// Shared-ownership paths: overwritten only while the local copy is pristine.
const MERGE_PATTERNS: &[&str] = &[".spectrena/templates/*"];

/// Action to take for a file during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Don't touch
    Preserve,
    /// Overwrite
    Update,
    /// Needs review
    Merge,
    /// New file
    Add,
}

/// Three ordered glob tables evaluated in fixed priority.
///
/// An explicit value rather than module-level state so classification is
/// independently testable and swappable.
#[derive(Debug, Clone)]
pub struct PatternSet {
    preserve: GlobSet,
    update: GlobSet,
    merge: GlobSet,
}

impl PatternSet {
    pub fn new(preserve: &[&str], update: &[&str], merge: &[&str]) -> Result<Self> {
        Ok(Self {
            preserve: compile(preserve)?,
            update: compile(update)?,
            merge: compile(merge)?,
        })
    }

    /// The built-in tables shipped with the tool.
    pub fn builtin() -> Result<Self> {
        Self::new(PRESERVE_PATTERNS, UPDATE_PATTERNS, MERGE_PATTERNS)
    }

    /// Decide the action for a forward-slash, root-relative path.
    ///
    /// Pure: the result depends only on the arguments and the tables.
    pub fn classify(
        &self,
        rel_path: &str,
        exists: bool,
        modified: bool,
    ) -> (UpdateAction, &'static str) {
        if self.preserve.is_match(rel_path) {
            return (UpdateAction::Preserve, "user content, never modified");
        }

        if self.update.is_match(rel_path) {
            return if exists {
                (UpdateAction::Update, "framework file, will be updated")
            } else {
                (UpdateAction::Add, "new framework file")
            };
        }

        if self.merge.is_match(rel_path) {
            return if !exists {
                (UpdateAction::Add, "new template")
            } else if modified {
                (UpdateAction::Merge, "template modified, needs review")
            } else {
                (UpdateAction::Update, "template unchanged, safe to update")
            };
        }

        // Default: add new, preserve existing
        if exists {
            (UpdateAction::Preserve, "unknown file, preserving")
        } else {
            (UpdateAction::Add, "new file")
        }
    }
}

/// Shell-style globs: `*` does not cross `/`, `**` is recursive,
/// matching is case-sensitive.
fn compile(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

// ============================================================================
// Tests
// ============================================================================
