//! Applies a confirmed update plan to the project tree.

use crate::engine::ledger::HashLedger;
use crate::engine::patterns::UpdateAction;
use crate::engine::planner::{FileUpdate, UpdatePlan};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Reconciliation document for files deferred to manual review, written
/// under `.spectrena/`.
const PENDING_FILE: &str = "pending-updates.md";

/// What an apply actually did, per action kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub preserved: usize,
    pub updated: usize,
    pub added: usize,
    pub deferred: usize,
}

/// Execute every entry of a plan against the project tree.
///
/// UPDATE and ADD copy the incoming file into place; PRESERVE touches
/// nothing; MERGE leaves the local file alone and collects it into the
/// reconciliation document. The hash ledger is rewritten last so a failed
/// copy never records state it did not reach.
pub fn apply_plan(
    plan: &UpdatePlan,
    project_root: &Path,
    template_root: &Path,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();
    let mut pending: Vec<&FileUpdate> = Vec::new();

    for file in &plan.files {
        match file.action {
            UpdateAction::Preserve => {
                println!("  {} {}", "SKIP".dimmed(), file.path);
                summary.preserved += 1;
            }
            UpdateAction::Update => {
                copy_file(template_root, project_root, &file.path)?;
                println!("  {} {}", "UPDATE".green(), file.path);
                summary.updated += 1;
            }
            UpdateAction::Add => {
                copy_file(template_root, project_root, &file.path)?;
                println!("  {} {}", "ADD".cyan(), file.path);
                summary.added += 1;
            }
            UpdateAction::Merge => {
                println!("  {} {}", "REVIEW".yellow(), file.path);
                pending.push(file);
                summary.deferred += 1;
            }
        }
    }

    if !pending.is_empty() {
        write_pending_updates(&pending, project_root, template_root)?;
    }

    HashLedger::save(project_root, plan)?;
    Ok(summary)
}

fn copy_file(template_root: &Path, project_root: &Path, rel_path: &str) -> Result<()> {
    let source = template_root.join(rel_path);
    let dest = project_root.join(rel_path);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(&source, &dest)
        .with_context(|| format!("Failed to copy {} -> {}", source.display(), dest.display()))?;
    Ok(())
}

/// Write the reconciliation document. Overwrites any previous one: pending
/// entries from older runs are stale once a new plan has been applied.
fn write_pending_updates(
    pending: &[&FileUpdate],
    project_root: &Path,
    template_root: &Path,
) -> Result<()> {
    let mut doc = String::new();
    doc.push_str("# Pending Template Updates\n\n");
    doc.push_str("These files have been modified from the original template.\n");
    doc.push_str("Use `/spectrena.review-updates` to review and merge changes.\n\n");
    doc.push_str("---\n\n");

    for file in pending {
        doc.push_str(&format!("## {}\n\n", file.path));
        doc.push_str(&format!(
            "**Your version hash:** `{}`\n",
            file.old_hash.as_deref().unwrap_or("(none)")
        ));
        doc.push_str(&format!("**New version hash:** `{}`\n\n", file.new_hash));

        // an empty diff carries no information, show the placeholder instead
        let diff = file
            .diff
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("(diff not available)\n");
        doc.push_str("### Diff\n\n```diff\n");
        doc.push_str(diff);
        doc.push_str("```\n\n");

        let incoming = fs::read(template_root.join(&file.path)).with_context(|| {
            format!("Failed to read template file: {}", file.path)
        })?;
        doc.push_str("### New Version Content\n\n```markdown\n");
        doc.push_str(&String::from_utf8_lossy(&incoming));
        if !incoming.ends_with(b"\n") {
            doc.push('\n');
        }
        doc.push_str("```\n\n");
        doc.push_str("---\n\n");
    }

    let path = crate::project::spectrena_dir(project_root).join(PENDING_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, doc)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!();
    println!(
        "  {} {} file(s) deferred to {}",
        "⚠".yellow(),
        pending.len(),
        path.display()
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::patterns::PatternSet;
    use crate::engine::planner;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn read_file(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    fn plan_and_apply(project: &Path, template: &Path) -> (planner::UpdatePlan, ApplySummary) {
        let patterns = PatternSet::builtin().unwrap();
        let plan =
            planner::create_update_plan(project, template, "0.1.0", "0.2.0", &patterns).unwrap();
        let summary = apply_plan(&plan, project, template).unwrap();
        (plan, summary)
    }

    #[test]
    fn apply_touches_exactly_what_the_plan_says() {
        // one of each action: preserved config, updated command, added
        // script, deferred template
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/config.yml", "my config");
        write_file(&template, ".spectrena/config.yml", "upstream config");
        write_file(&project, ".claude/commands/foo.md", "old command");
        write_file(&template, ".claude/commands/foo.md", "new command");
        write_file(&template, ".spectrena/scripts/setup.sh", "#!/bin/sh\n");
        write_file(&project, ".spectrena/templates/bar.md", "locally edited\n");
        write_file(&template, ".spectrena/templates/bar.md", "upstream v2\n");

        let (_, summary) = plan_and_apply(&project, &template);

        assert_eq!(
            summary,
            ApplySummary { preserved: 1, updated: 1, added: 1, deferred: 1 }
        );
        assert_eq!(read_file(&project, ".spectrena/config.yml"), "my config");
        assert_eq!(read_file(&project, ".claude/commands/foo.md"), "new command");
        assert_eq!(read_file(&project, ".spectrena/scripts/setup.sh"), "#!/bin/sh\n");
        assert_eq!(read_file(&project, ".spectrena/templates/bar.md"), "locally edited\n");
    }

    #[test]
    fn deferred_files_land_in_pending_document() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/templates/bar.md", "locally edited\n");
        write_file(&template, ".spectrena/templates/bar.md", "upstream v2\n");

        plan_and_apply(&project, &template);

        let doc = read_file(&project, ".spectrena/pending-updates.md");
        assert!(doc.contains("# Pending Template Updates"));
        assert!(doc.contains("## .spectrena/templates/bar.md"));
        assert!(doc.contains("-locally edited"));
        assert!(doc.contains("+upstream v2"));
        assert!(doc.contains("upstream v2\n"));
    }

    #[test]
    fn ledger_records_applied_files_only() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&template, ".claude/commands/foo.md", "new command");
        write_file(&project, ".spectrena/templates/bar.md", "edited");
        write_file(&template, ".spectrena/templates/bar.md", "upstream");

        plan_and_apply(&project, &template);

        let ledger = HashLedger::load(&project).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.get(".claude/commands/foo.md"),
            Some(crate::engine::hash::digest_bytes(b"new command").as_str())
        );
        assert_eq!(ledger.get(".spectrena/templates/bar.md"), None);
    }

    #[test]
    fn apply_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&template, ".claude/commands/foo.md", "command");
        write_file(&template, ".spectrena/scripts/run.sh", "script");

        let (_, first) = plan_and_apply(&project, &template);
        let first_ledger = fs::read_to_string(
            project.join(".spectrena").join(".template-hashes.json"),
        )
        .unwrap();

        let (_, second) = plan_and_apply(&project, &template);
        let second_ledger = fs::read_to_string(
            project.join(".spectrena").join(".template-hashes.json"),
        )
        .unwrap();

        assert_eq!(first.added, 2);
        assert_eq!(second.updated, 2);
        assert_eq!(second.added, 0);
        assert_eq!(first_ledger, second_ledger);
        assert_eq!(read_file(&project, ".claude/commands/foo.md"), "command");
    }

    #[test]
    fn no_merges_leaves_existing_pending_document_alone() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/pending-updates.md", "old pending doc");
        write_file(&template, ".claude/commands/foo.md", "command");

        plan_and_apply(&project, &template);

        assert_eq!(
            read_file(&project, ".spectrena/pending-updates.md"),
            "old pending doc"
        );
    }

    #[test]
    fn identical_never_synced_merge_gets_placeholder_diff() {
        // first sync with a byte-identical local copy: deferred, but the
        // diff is empty so the document shows the placeholder
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/templates/bar.md", "identical\n");
        write_file(&template, ".spectrena/templates/bar.md", "identical\n");

        let (_, summary) = plan_and_apply(&project, &template);

        assert_eq!(summary.deferred, 1);
        let doc = read_file(&project, ".spectrena/pending-updates.md");
        assert!(doc.contains("(diff not available)"));
        assert!(!doc.contains("```diff\n```"));
    }

    #[test]
    fn sections_are_separated() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/templates/a.md", "edited a\n");
        write_file(&template, ".spectrena/templates/a.md", "upstream a\n");
        write_file(&project, ".spectrena/templates/b.md", "edited b\n");
        write_file(&template, ".spectrena/templates/b.md", "upstream b\n");

        plan_and_apply(&project, &template);

        let doc = read_file(&project, ".spectrena/pending-updates.md");
        // one separator after the intro, one closing each file section
        assert_eq!(doc.matches("---\n").count(), 3);
        assert!(doc.trim_end().ends_with("---"));
    }

    #[test]
    fn binary_merge_gets_placeholder_diff() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let template = tmp.path().join("template");

        write_file(&project, ".spectrena/templates/bar.md", "edited");
        fs::create_dir_all(template.join(".spectrena/templates")).unwrap();
        fs::write(
            template.join(".spectrena/templates/bar.md"),
            [0xff, 0xfe, 0x00],
        )
        .unwrap();

        plan_and_apply(&project, &template);

        let doc = read_file(&project, ".spectrena/pending-updates.md");
        assert!(doc.contains("(diff not available)"));
    }
}
