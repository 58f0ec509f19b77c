use clap::Parser as ClapParser;
use tracing_subscriber::{fmt, EnvFilter};

#[path = "main/cli.rs"]
mod cli;
#[path = "main/commands.rs"]
mod commands;

use cli::{Cli, Commands};
use commands::{cmd_check, cmd_purity, CheckOptions};

/// Diagnostics go to stdout; logs go to stderr and stay quiet unless asked.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "avow=debug",
            _ => "avow=trace",
        })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Check {
            file,
            config,
            json,
            strict,
            no_unreachable,
            no_hygiene,
            jobs,
        } => {
            cmd_check(
                file,
                CheckOptions {
                    config: config.as_deref(),
                    json: *json,
                    strict: *strict,
                    no_unreachable: *no_unreachable,
                    no_hygiene: *no_hygiene,
                    jobs: *jobs,
                },
            );
        }
        Commands::Purity { file, config } => {
            cmd_purity(file, config.as_deref());
        }
    }
}
