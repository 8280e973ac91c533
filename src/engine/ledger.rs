//! Persisted digests of files the engine last wrote.
//!
//! The ledger is the engine's only durable memory of prior syncs: a flat
//! `path -> digest` JSON map. A file whose current digest differs from its
//! ledger entry (or that has no entry at all) counts as locally modified.

use crate::engine::patterns::UpdateAction;
use crate::engine::planner::UpdatePlan;
use crate::project;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Ledger location under `.spectrena/`.
const LEDGER_FILE: &str = ".template-hashes.json";

/// Flat `path -> digest-at-last-sync` mapping.
#[derive(Debug, Default, Clone)]
pub struct HashLedger {
    entries: BTreeMap<String, String>,
}

impl HashLedger {
    fn ledger_file(project_root: &Path) -> PathBuf {
        project::spectrena_dir(project_root).join(LEDGER_FILE)
    }

    /// Load the persisted ledger. An absent file means "never synced", not
    /// an error; an unreadable file degrades to an empty ledger with a
    /// warning so updates stay possible.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = Self::ledger_file(project_root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read hash ledger: {}", path.display()))?;

        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => Ok(Self { entries }),
            Err(e) => {
                log::warn!(
                    "Hash ledger {} is unreadable ({e}); treating every file as locally modified",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Digest recorded at last sync for a root-relative path.
    pub fn get(&self, rel_path: &str) -> Option<&str> {
        self.entries.get(rel_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the ledger wholesale from a just-applied plan. Only UPDATE
    /// and ADD entries contribute their new digest; PRESERVE and MERGE
    /// files drop out rather than retaining a stale entry.
    pub fn save(project_root: &Path, plan: &UpdatePlan) -> Result<()> {
        let mut entries = BTreeMap::new();
        for file in &plan.files {
            if matches!(file.action, UpdateAction::Update | UpdateAction::Add) {
                entries.insert(file.path.clone(), file.new_hash.clone());
            }
        }

        let path = Self::ledger_file(project_root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&entries)
            .context("Failed to serialize hash ledger")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write hash ledger: {}", path.display()))?;

        log::debug!("Saved {} ledger entries to {}", entries.len(), path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::planner::FileUpdate;
    use tempfile::TempDir;

    fn file_update(path: &str, action: UpdateAction, new_hash: &str) -> FileUpdate {
        FileUpdate {
            path: path.to_string(),
            action,
            reason: "test",
            old_hash: None,
            new_hash: new_hash.to_string(),
            diff: None,
        }
    }

    fn plan(files: Vec<FileUpdate>) -> UpdatePlan {
        UpdatePlan {
            from_version: "0.1.0".to_string(),
            to_version: "0.2.0".to_string(),
            files,
        }
    }

    #[test]
    fn load_missing_ledger_is_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger = HashLedger::load(tmp.path()).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn load_corrupt_ledger_is_empty_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".spectrena");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".template-hashes.json"), "{not json").unwrap();

        let ledger = HashLedger::load(tmp.path()).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn save_records_only_update_and_add() {
        let tmp = TempDir::new().unwrap();
        let plan = plan(vec![
            file_update("a.md", UpdateAction::Update, "aaa111bbb222"),
            file_update("b.md", UpdateAction::Add, "ccc333ddd444"),
            file_update("c.md", UpdateAction::Preserve, "eee555fff666"),
            file_update("d.md", UpdateAction::Merge, "aaa777bbb888"),
        ]);

        HashLedger::save(tmp.path(), &plan).unwrap();

        let ledger = HashLedger::load(tmp.path()).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get("a.md"), Some("aaa111bbb222"));
        assert_eq!(ledger.get("b.md"), Some("ccc333ddd444"));
        assert_eq!(ledger.get("c.md"), None);
        assert_eq!(ledger.get("d.md"), None);
    }

    #[test]
    fn save_replaces_ledger_wholesale() {
        let tmp = TempDir::new().unwrap();

        let first = plan(vec![file_update("old.md", UpdateAction::Add, "111111111111")]);
        HashLedger::save(tmp.path(), &first).unwrap();

        let second = plan(vec![file_update("new.md", UpdateAction::Add, "222222222222")]);
        HashLedger::save(tmp.path(), &second).unwrap();

        let ledger = HashLedger::load(tmp.path()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("old.md"), None);
        assert_eq!(ledger.get("new.md"), Some("222222222222"));
    }

    #[test]
    fn ledger_file_is_flat_string_mapping() {
        let tmp = TempDir::new().unwrap();
        let plan = plan(vec![file_update("a.md", UpdateAction::Add, "aaa111bbb222")]);
        HashLedger::save(tmp.path(), &plan).unwrap();

        let raw =
            fs::read_to_string(tmp.path().join(".spectrena").join(".template-hashes.json"))
                .unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.get("a.md").map(String::as_str), Some("aaa111bbb222"));
    }
}
