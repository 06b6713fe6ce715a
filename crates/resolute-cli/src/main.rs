//! Resolute CLI: resilient browser journeys from the command line
//!
//! ## Usage
//!
//! ```bash
//! resolute validate journeys/*.yaml          # Check playbooks
//! resolute run journeys/track.yaml -f json   # Run a playbook (browser feature)
//! resolute flow cart --dry-run               # Print a built-in journey
//! resolute config                            # Show effective configuration
//! ```

use clap::Parser;
use console::style;
use resolute_cli::{logging, runner, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let prefix = if config.color.should_color() {
                style("Error:").red().bold().to_string()
            } else {
                "Error:".to_string()
            };
            eprintln!("{prefix} {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &CliConfig) -> CliResult<()> {
    logging::init_logging(config)?;

    match cli.command {
        Commands::Validate(args) => runner::run_validate(config, &args),
        Commands::Run(args) => runner::run_playbook(config, &args),
        Commands::Flow(args) => runner::run_flow(config, &args),
        Commands::Config(args) => runner::run_config(config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_log_json(cli.log_json)
}
