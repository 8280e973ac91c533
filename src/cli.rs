use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "spectrena")]
#[command(version)]
#[command(about = "Spec-driven scaffolding with template drift detection", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Update the project to a newer template release
    Update(UpdateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct UpdateArgs {
    /// Target template version (defaults to the latest release)
    pub version: Option<String>,

    /// Build and display the update plan without touching any files
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Override the detected agent (e.g. claude, cursor)
    #[arg(long)]
    pub agent: Option<String>,

    /// Override the detected script variant (sh or ps)
    #[arg(long)]
    pub script: Option<String>,
}
