//! Output formatting for scenario plans and reports

use console::{style, Term};
use resolute::{Scenario, ScenarioReport, Step, StepStatus};

/// Writes status lines to stdout, coloured when enabled
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Create a reporter on stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line(&status_prefix(StepStatus::Passed, self.use_color), message);
        }
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line(&status_prefix(StepStatus::Failed, self.use_color), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a block of text as-is
    pub fn block(&self, text: &str) {
        if !self.quiet {
            let _ = self.term.write_str(text);
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

fn status_prefix(status: StepStatus, use_color: bool) -> String {
    match (status, use_color) {
        (StepStatus::Passed, true) => style("✓").green().bold().to_string(),
        (StepStatus::Skipped, true) => style("-").yellow().bold().to_string(),
        (StepStatus::Failed, true) => style("✗").red().bold().to_string(),
        (StepStatus::Passed, false) => "PASS".to_string(),
        (StepStatus::Skipped, false) => "SKIP".to_string(),
        (StepStatus::Failed, false) => "FAIL".to_string(),
    }
}

/// Render a scenario report as text
#[must_use]
pub fn render_report(report: &ScenarioReport, use_color: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("Scenario: {}\n", report.scenario));
    for step in &report.steps {
        out.push_str(&format!(
            "{} {} ({}ms)",
            status_prefix(step.status, use_color),
            step.name,
            step.elapsed_ms
        ));
        if let Some(strategy) = &step.strategy {
            out.push_str(&format!(" via {strategy}"));
        }
        if let Some(message) = &step.message {
            out.push_str(&format!(": {message}"));
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "\n{} passed, {} skipped, {} failed in {}ms\n",
        report.count(StepStatus::Passed),
        report.count(StepStatus::Skipped),
        report.count(StepStatus::Failed),
        report.elapsed_ms
    ));
    if let Some(failure) = &report.failure {
        out.push_str(&format!("Failure: {failure}\n"));
    }
    out
}

/// Render the steps of a scenario without running it
#[must_use]
pub fn render_plan(scenario: &Scenario) -> String {
    let mut out = format!("Scenario: {} ({} steps)\n", scenario.name, scenario.steps.len());
    for (i, entry) in scenario.steps.iter().enumerate() {
        out.push_str(&format!("{:>3}. {} [{}]\n", i + 1, entry.name, entry.step.kind()));
        match &entry.step {
            Step::Act(act) => {
                let marker = if act.required { "" } else { " (optional)" };
                out.push_str(&format!("       {}{marker}\n", act.intent.describe()));
                for label in act.strategies.labels() {
                    out.push_str(&format!("       - {label}\n"));
                }
                if let Some(retry) = &act.retry {
                    out.push_str(&format!("       retry: {}\n", retry.labels().join(" | ")));
                }
            }
            Step::DismissOverlays(sweep) => {
                let groups: Vec<&str> = sweep.groups.iter().map(|g| g.label.as_str()).collect();
                out.push_str(&format!("       groups: {}\n", groups.join(", ")));
            }
            Step::Converge(c) => {
                out.push_str(&format!("       {} to {} (bound {})\n", c.label, c.target, c.max_iterations));
            }
            Step::ClickUntilGone { label, max_clicks, .. } => {
                out.push_str(&format!("       {label}, at most {max_clicks} click(s)\n"));
            }
            Step::SetCookie(cookie) => out.push_str(&format!("       {}={}\n", cookie.name, cookie.value)),
            Step::Redirect { when_url_contains, to } => {
                out.push_str(&format!("       when url contains {when_url_contains:?} go to {to}\n"));
            }
            Step::Verify { effect, .. } => out.push_str(&format!("       {}\n", effect.describe())),
            Step::Unless { condition, step } => {
                out.push_str(&format!("       unless {}: {}\n", condition.describe(), step.kind()));
                if let Step::Act(act) = step.as_ref() {
                    out.push_str(&format!("       {}\n", act.intent.describe()));
                }
            }
            Step::Reload => {}
        }
    }
    let secrets = scenario.secrets_required();
    if !secrets.is_empty() {
        out.push_str(&format!("Secrets required: {}\n", secrets.join(", ")));
    }
    out
}
