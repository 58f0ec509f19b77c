use clap::{Parser as ClapParser, Subcommand};

#[derive(ClapParser)]
#[command(
    name = "avow",
    about = "Purity and match-exhaustiveness checker for program models"
)]
pub(super) struct Cli {
    #[command(subcommand)]
    pub(super) command: Commands,
    /// Log analysis progress (`-vv` for per-match detail); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(super) verbose: u8,
}

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Check a JSON program model and report diagnostics
    Check {
        file: String,
        /// Analyzer configuration (JSON)
        #[arg(long)]
        config: Option<String>,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Treat all warnings as errors (exit 1 if any warning)
        #[arg(long)]
        strict: bool,
        /// Do not report unreachable match arms
        #[arg(long)]
        no_unreachable: bool,
        /// Do not warn about effectful declarations that perform no effects
        #[arg(long)]
        no_hygiene: bool,
        /// Worker threads (default: one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Show declared and effective purity of every function
    Purity {
        file: String,
        /// Analyzer configuration (JSON)
        #[arg(long)]
        config: Option<String>,
    },
}
