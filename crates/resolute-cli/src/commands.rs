//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Resolute: run resilient browser journeys from YAML playbooks
#[derive(Parser, Debug)]
#[command(name = "resolute")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate playbooks without running them
    Validate(ValidateArgs),

    /// Run a playbook against a browser
    Run(RunArgs),

    /// Run or print a built-in journey
    Flow(FlowArgs),

    /// Show effective configuration
    Config(ConfigArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Playbook YAML file(s)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Playbook YAML file
    pub playbook: PathBuf,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,

    /// Engine configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the flow command
#[derive(Parser, Debug)]
pub struct FlowArgs {
    /// Journey to run
    pub flow: FlowName,

    /// Print the steps instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,

    /// Engine configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Site profile overriding the built-in selectors
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Cart plan overriding the built-in product choices
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

/// Built-in journeys
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowName {
    /// Customer service to "Track your package"
    TrackPackage,
    /// Search, add to cart, raise quantity, sign in, empty the cart
    Cart,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Engine configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Scenario report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
