//! Check battery run inside a freshly built Node.js image
//!
//! Every scenario runs the same five commands in order. A failing check
//! is recorded and the battery continues with the next one.

use serde::Serialize;
use tracing::{info, warn};

use metrics::counter;
use nodeprobe_core::metrics::{CHECKS_FAILED_TOTAL, CHECKS_PASSED_TOTAL, LABEL_VERSION};
use nodeprobe_image_lifecycle::{CommandOutput, CommandRunner, DockerClient};

/// What a check requires from a command's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Exit status 0.
    Succeeds,
    /// Exit status 0 and stdout containing the given text.
    StdoutContains(String),
}

/// One command of the battery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub command: String,
    pub expect: Expectation,
}

impl Check {
    fn new(command: &str, expect: Expectation) -> Self {
        Self {
            command: command.to_owned(),
            expect,
        }
    }

    /// Judge a command's output against this check.
    pub fn evaluate(&self, output: &CommandOutput) -> CheckResult {
        let detail = match &self.expect {
            _ if !output.success() => Some(format!(
                "exit status {}: {}",
                output.exit_status,
                first_line(&output.stderr)
            )),
            Expectation::StdoutContains(needle) if !output.stdout.contains(needle.as_str()) => {
                Some(format!(
                    "expected stdout to contain '{needle}', got '{}'",
                    first_line(&output.stdout)
                ))
            }
            _ => None,
        };

        CheckResult {
            command: self.command.clone(),
            passed: detail.is_none(),
            exit_status: Some(output.exit_status),
            detail,
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub command: String,
    pub passed: bool,
    /// `None` when the command could not be executed at all.
    pub exit_status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The battery for an image expected to ship `node_version`.
pub fn battery(node_version: &str) -> Vec<Check> {
    vec![
        Check::new(
            "node -v",
            Expectation::StdoutContains(node_version.to_owned()),
        ),
        Check::new("npm version", Expectation::Succeeds),
        Check::new("npm install -g json", Expectation::Succeeds),
        Check::new("json --version", Expectation::Succeeds),
        Check::new(
            r#"echo '{"foo":"bar"}' | json foo"#,
            Expectation::StdoutContains("bar".to_owned()),
        ),
    ]
}

/// Run every check in order and collect the results.
pub async fn run_battery<D: DockerClient>(
    runner: &mut CommandRunner<D>,
    checks: &[Check],
) -> Vec<CheckResult> {
    let version = runner.target().version.clone();
    let mut results = Vec::with_capacity(checks.len());

    for check in checks {
        let result = match runner.run(&check.command).await {
            Ok(output) => check.evaluate(&output),
            Err(e) => CheckResult {
                command: check.command.clone(),
                passed: false,
                exit_status: None,
                detail: Some(e.to_string()),
            },
        };

        if result.passed {
            counter!(CHECKS_PASSED_TOTAL, LABEL_VERSION => version.clone()).increment(1);
            info!(version = %version, command = %result.command, "check passed");
        } else {
            counter!(CHECKS_FAILED_TOTAL, LABEL_VERSION => version.clone()).increment(1);
            warn!(
                version = %version,
                command = %result.command,
                detail = result.detail.as_deref().unwrap_or_default(),
                "check failed"
            );
        }
        results.push(result);
    }

    results
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default().trim()
}
