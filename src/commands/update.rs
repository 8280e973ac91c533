//! `spectrena update`: bring a scaffolded project up to a template release.

use crate::engine::patterns::PatternSet;
use crate::engine::planner::{self, UpdatePlan};
use crate::engine::{executor, patterns::UpdateAction};
use crate::{cli::UpdateArgs, project, release, ui, Context};
use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use dialoguer::Confirm;
use std::env;

pub fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let project_root = env::current_dir().context("Failed to resolve current directory")?;
    if !project::is_project(&project_root) {
        bail!("Not a spectrena project (no .spectrena/ directory). Run 'spectrena init' first.");
    }

    let current = project::current_version(&project_root);
    let (detected_agent, detected_script) = release::detect_agent_and_script(&project_root);
    let agent = args.agent.unwrap_or(detected_agent);
    let script = args.script.unwrap_or(detected_script);

    let fetcher = release::ReleaseFetcher::new();
    let target = fetcher.resolve_version(args.version.as_deref());

    if !ctx.quiet {
        ui::header("Spectrena Update");
        ui::kv("Current version", &current);
        ui::kv("Target version", &target);
        ui::kv("Agent", &format!("{agent} ({script})"));
    }

    // Staging area lives for the whole run and is removed on every exit path
    let staging = tempfile::tempdir().context("Failed to create staging directory")?;
    let template_root = staging.path().join("template");

    let archive = fetcher.download(&target, &agent, &script)?;
    if !ctx.quiet {
        ui::dim(&format!("Downloaded {}", ui::format_size(archive.len() as u64)));
    }
    release::ReleaseFetcher::extract(&archive, &template_root)?;

    let patterns = PatternSet::builtin()?;
    let plan =
        planner::create_update_plan(&project_root, &template_root, &current, &target, &patterns)?;

    display_plan(&plan, ctx.verbose > 0);

    if args.dry_run {
        ui::info("Dry run, no changes made");
        return Ok(());
    }

    if !confirm_apply(args.force)? {
        ui::warn("Update cancelled");
        return Ok(());
    }

    println!();
    let summary = executor::apply_plan(&plan, &project_root, &template_root)?;
    project::save_version(&project_root, &target)?;

    println!();
    ui::success(&format!(
        "Updated to {target}: {} updated, {} added, {} preserved, {} need review",
        summary.updated, summary.added, summary.preserved, summary.deferred
    ));
    if project::lineage_store_exists(&project_root) {
        ui::info("Lineage store detected; run 'spectrena lineage migrate' if prompted by your workflow");
    }

    Ok(())
}

fn display_plan(plan: &UpdatePlan, verbose: bool) {
    println!();
    println!(
        "{}",
        format!("Update Plan: {} -> {}", plan.from_version, plan.to_version).bold()
    );
    println!();
    println!("  {:<24} {}", "Action".dimmed(), "Count".dimmed());
    println!("  {:<24} {}", "─".repeat(22).dimmed(), "─".repeat(5).dimmed());
    println!("  {:<24} {}", "Preserve".dimmed(), plan.preserve_count());
    println!("  {:<24} {}", "Update".green(), plan.update_count());
    println!("  {:<24} {}", "Add".cyan(), plan.add_count());
    println!(
        "  {:<24} {}",
        "Merge (review needed)".yellow(),
        plan.merge_count()
    );

    let merges: Vec<_> = plan
        .files
        .iter()
        .filter(|f| f.action == UpdateAction::Merge)
        .collect();
    if !merges.is_empty() {
        println!();
        println!("  Files requiring review:");
        for file in merges {
            println!("    {} {}", "•".yellow(), file.path);
        }
    }

    if verbose {
        println!();
        for file in &plan.files {
            println!("  {:<50} {}", file.path, file.reason.dimmed());
        }
    }
    println!();
}

/// Resolve the apply decision up front; nothing downstream ever prompts.
fn confirm_apply(force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt("Apply updates?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")
}
