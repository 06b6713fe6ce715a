//! Subcommand handlers

use crate::commands::{ConfigArgs, FlowArgs, FlowName, ReportFormat, RunArgs, ValidateArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_plan, render_report, Reporter};
use resolute::flows::{self, CartPlan, SiteProfile};
use resolute::{ActOptions, Driver, Engine, EngineConfig, Playbook, Scenario, ScenarioReport, ScenarioRunner};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Validate playbook files, reporting each one
pub fn run_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    let reporter = reporter(config);
    let mut failed = Vec::new();

    for file in &args.files {
        match Playbook::load(file) {
            Ok(playbook) => {
                reporter.success(&format!(
                    "{}: `{}` ({} steps)",
                    file.display(),
                    playbook.name,
                    playbook.step_count()
                ));
                if config.verbosity.is_verbose() {
                    let scenario = playbook
                        .to_scenario(&ActOptions::new())
                        .map_err(|e| CliError::playbook(file, e.to_string()))?;
                    reporter.block(&render_plan(&scenario));
                }
            }
            Err(e) => {
                reporter.failure(&format!("{}: {e}", file.display()));
                failed.push(file.display().to_string());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Playbook {
            path: failed.join(", "),
            message: "validation failed".to_string(),
        })
    }
}

/// Run a playbook against a browser
pub fn run_playbook(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let engine_config = load_engine_config(args.config.as_deref())?;
    let playbook = Playbook::load(&args.playbook).map_err(|e| CliError::playbook(&args.playbook, e.to_string()))?;
    let scenario = playbook
        .to_scenario(&engine_config.act_options())
        .map_err(|e| CliError::playbook(&args.playbook, e.to_string()))?;
    execute(&scenario, &engine_config, args.format, &reporter(config))
}

/// Print or run a built-in journey
pub fn run_flow(config: &CliConfig, args: &FlowArgs) -> CliResult<()> {
    let engine_config = load_engine_config(args.config.as_deref())?;
    let site: SiteProfile = load_or_default(args.site.as_deref())?;
    let options = engine_config.act_options();
    let scenario = match args.flow {
        FlowName::TrackPackage => flows::track_package(&site, &options)?,
        FlowName::Cart => {
            let plan: CartPlan = load_or_default(args.plan.as_deref())?;
            flows::cart_workflow(&site, &plan, &options)?
        }
    };

    tracing::debug!(scenario = %scenario.name, steps = scenario.steps.len(), "flow built");

    let reporter = reporter(config);
    if args.dry_run {
        reporter.block(&render_plan(&scenario));
        return Ok(());
    }
    execute(&scenario, &engine_config, args.format, &reporter)
}

/// Print the effective engine configuration
pub fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let engine_config = load_engine_config(args.config.as_deref())?;
    let reporter = reporter(config);
    reporter.block(&engine_config.to_yaml()?);

    let credentials = engine_config.credentials();
    for (name, var) in [
        (resolute::Credentials::EMAIL, &engine_config.credentials.email_var),
        (resolute::Credentials::PASSWORD, &engine_config.credentials.password_var),
    ] {
        let state = if credentials.contains(name) { "set" } else { "not set" };
        reporter.info(&format!("{name} ({var}): {state}"));
    }
    Ok(())
}

/// Run `scenario` on an existing engine and emit its report
///
/// A failed scenario is returned as [`CliError::ScenarioFailed`] after the
/// report has been written.
pub fn run_scenario<D: Driver>(
    engine: &mut Engine<D>,
    scenario: &Scenario,
    format: ReportFormat,
    reporter: &Reporter,
) -> CliResult<ScenarioReport> {
    let report = ScenarioRunner::new().run(engine, scenario)?;
    match format {
        ReportFormat::Json => reporter.block(&format!("{}\n", report.to_json()?)),
        ReportFormat::Text => reporter.block(&render_report(&report, reporter.use_color)),
    }
    match &report.failure {
        Some(message) => Err(CliError::ScenarioFailed {
            scenario: report.scenario.clone(),
            message: message.clone(),
        }),
        None => Ok(report),
    }
}

fn reporter(config: &CliConfig) -> Reporter {
    Reporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

fn load_engine_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> CliResult<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let yaml = std::fs::read_to_string(path)?;
    serde_yaml_ng::from_str(&yaml).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}

fn check_secrets(scenario: &Scenario, engine_config: &EngineConfig) -> CliResult<()> {
    let credentials = engine_config.credentials();
    match scenario.secrets_required().into_iter().find(|s| !credentials.contains(s)) {
        Some(missing) => Err(resolute::ResoluteError::precondition(format!(
            "secret `{missing}` required by scenario `{}`",
            scenario.name
        ))
        .into()),
        None => Ok(()),
    }
}

#[cfg(feature = "browser")]
fn execute(
    scenario: &Scenario,
    engine_config: &EngineConfig,
    format: ReportFormat,
    reporter: &Reporter,
) -> CliResult<()> {
    check_secrets(scenario, engine_config)?;
    reporter.info(&format!("launching browser for `{}`", scenario.name));
    let driver = resolute::CdpDriver::launch(engine_config.driver.clone())?;
    let mut engine = Engine::new(driver).with_credentials(engine_config.credentials());
    let result = run_scenario(&mut engine, scenario, format, reporter);
    if let Err(e) = engine.into_driver().close() {
        tracing::warn!(error = %e, "browser did not close cleanly");
    }
    result.map(|_| ())
}

#[cfg(not(feature = "browser"))]
fn execute(
    scenario: &Scenario,
    engine_config: &EngineConfig,
    _format: ReportFormat,
    _reporter: &Reporter,
) -> CliResult<()> {
    check_secrets(scenario, engine_config)?;
    Err(CliError::BrowserUnavailable)
}
