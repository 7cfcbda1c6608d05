//! `nodeprobe run` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use nodeprobe_core::config::{NodeprobeConfig, validate_version_label};
use nodeprobe_image_lifecycle::{
    CommandRunner, DockerClient, ImageLifecycleManager, LifecycleConfig, TeardownReport,
};

use crate::checks::{self, CheckResult};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

use super::connect_docker;

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: &NodeprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let versions = resolve_versions(&args.versions, args.target.as_deref(), config);
    if versions.is_empty() {
        return Err(CliError::Command(
            "no versions to run (pass VERSION, set TARGET_HOST or configure harness.scenarios)"
                .to_owned(),
        ));
    }
    for version in &versions {
        validate_version_label(version).map_err(|e| CliError::Command(e.to_string()))?;
    }

    let docker = Arc::new(connect_docker(config).await?);
    let mut manager = ImageLifecycleManager::new(docker, LifecycleConfig::from_core(config))?;

    let mut scenarios = Vec::with_capacity(versions.len());
    for version in &versions {
        scenarios.push(run_scenario(&mut manager, config, version).await);
    }

    let report = RunReport {
        target: args.target,
        scenarios,
    };
    writer.render(&report)?;
    report.into_result()
}

/// Explicit versions win, then the environment-supplied target, then every
/// configured scenario.
fn resolve_versions(
    versions: &[String],
    target: Option<&str>,
    config: &NodeprobeConfig,
) -> Vec<String> {
    if !versions.is_empty() {
        return versions.to_vec();
    }
    if let Some(target) = target.filter(|t| !t.trim().is_empty()) {
        return vec![target.trim().to_owned()];
    }
    config
        .harness
        .scenarios
        .iter()
        .map(|s| s.version.clone())
        .collect()
}

/// Node.js version `node -v` must report. Unconfigured labels are taken literally.
fn expected_node_version(config: &NodeprobeConfig, version: &str) -> String {
    config
        .scenario(version)
        .map(|s| s.node_version.clone())
        .unwrap_or_else(|| version.to_owned())
}

async fn run_scenario<D: DockerClient>(
    manager: &mut ImageLifecycleManager<D>,
    config: &NodeprobeConfig,
    version: &str,
) -> ScenarioReport {
    let node_version = expected_node_version(config, version);
    let battery = checks::battery(&node_version);
    let docker = manager.docker();

    info!(version, node_version = %node_version, "running scenario");

    let result = manager
        .scoped(version, |target| async move {
            let image_id = target.image_id.clone();
            let mut runner = CommandRunner::new(docker, target);
            let results = checks::run_battery(&mut runner, &battery).await;
            (image_id, results)
        })
        .await;

    match result {
        Ok(((image_id, checks), teardown)) => {
            if !teardown.is_clean() {
                warn!(version, teardown = %teardown, "teardown finished with warnings");
            }
            let status = if checks.iter().all(|c| c.passed) {
                ScenarioStatus::Passed
            } else {
                ScenarioStatus::Failed
            };
            ScenarioReport {
                version: version.to_owned(),
                node_version,
                status,
                image_id: Some(image_id),
                checks,
                teardown: Some(teardown),
                error: None,
            }
        }
        Err(e) => ScenarioReport {
            version: version.to_owned(),
            node_version,
            status: ScenarioStatus::BuildFailed,
            image_id: None,
            checks: Vec::new(),
            teardown: None,
            error: Some(e.to_string()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    BuildFailed,
}

#[derive(Serialize)]
pub struct ScenarioReport {
    pub version: String,
    pub node_version: String,
    pub status: ScenarioStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub checks: Vec<CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown: Option<TeardownReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    /// Build failures take precedence over check failures.
    fn into_result(self) -> Result<(), CliError> {
        let total = self.scenarios.len();
        let build_failed = self.count(ScenarioStatus::BuildFailed);
        if build_failed > 0 {
            return Err(CliError::BuildFailed(format!(
                "{build_failed} of {total} scenario(s) could not be built"
            )));
        }
        let failed = self.count(ScenarioStatus::Failed);
        if failed > 0 {
            return Err(CliError::ChecksFailed(format!(
                "{failed} of {total} scenario(s) failed"
            )));
        }
        Ok(())
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        for scenario in &self.scenarios {
            let status = match scenario.status {
                ScenarioStatus::Passed => "PASSED".green().bold(),
                ScenarioStatus::Failed => "FAILED".red().bold(),
                ScenarioStatus::BuildFailed => "BUILD FAILED".red().bold(),
            };
            writeln!(
                w,
                "Scenario {} (node {}): {}",
                scenario.version.bold(),
                scenario.node_version,
                status
            )?;

            if let Some(ref error) = scenario.error {
                writeln!(w, "  Error: {}", error.red())?;
            }

            for check in &scenario.checks {
                if check.passed {
                    writeln!(w, "  {} {}", "[PASS]".green(), check.command)?;
                } else {
                    writeln!(
                        w,
                        "  {} {}  {}",
                        "[FAIL]".red(),
                        check.command,
                        check.detail.as_deref().unwrap_or_default().dimmed()
                    )?;
                }
            }

            if let Some(ref teardown) = scenario.teardown {
                let line = format!("  Teardown: {teardown}");
                if teardown.is_clean() {
                    writeln!(w, "{line}")?;
                } else {
                    writeln!(w, "{}", line.yellow())?;
                }
            }
            writeln!(w)?;
        }

        writeln!(
            w,
            "{} scenario(s): {} passed, {} failed, {} build failed",
            self.scenarios.len(),
            self.count(ScenarioStatus::Passed),
            self.count(ScenarioStatus::Failed),
            self.count(ScenarioStatus::BuildFailed)
        )?;

        Ok(())
    }
}
