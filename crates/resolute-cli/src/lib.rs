//! Resolute CLI library
//!
//! Command-line interface over the Resolute engine: playbook validation,
//! playbook runs, built-in journeys and configuration inspection.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, FlowArgs, FlowName, ReportFormat, RunArgs, ValidateArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_plan, render_report, Reporter};
