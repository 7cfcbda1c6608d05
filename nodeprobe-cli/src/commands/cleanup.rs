//! `nodeprobe cleanup` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use nodeprobe_core::config::{NodeprobeConfig, validate_version_label};
use nodeprobe_core::short_id;
use nodeprobe_image_lifecycle::{
    DockerClient, ImageLifecycleManager, LifecycleConfig, LifecycleError, TeardownReport,
};

use crate::cli::CleanupArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

use super::connect_docker;

/// Execute the `cleanup` command.
pub async fn execute(
    args: CleanupArgs,
    config: &NodeprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    validate_version_label(&args.version).map_err(|e| CliError::Command(e.to_string()))?;

    let docker = Arc::new(connect_docker(config).await?);
    let mut manager = ImageLifecycleManager::new(docker, LifecycleConfig::from_core(config))?;

    let report = cleanup(&mut manager, &args.version).await?;
    writer.render(&report)?;
    Ok(())
}

/// Resolve `repo:version` and run the regular teardown on it.
///
/// A missing image is not an error: there is simply nothing left to clean.
async fn cleanup<D: DockerClient>(
    manager: &mut ImageLifecycleManager<D>,
    version: &str,
) -> Result<CleanupReport, CliError> {
    let reference = format!("{}:{}", manager.config().repository, version);

    match manager.adopt(version).await {
        Ok(target) => {
            info!(reference = %reference, image_id = %target.image_id, "cleaning up leftovers");
            let teardown = manager.release().await;
            Ok(CleanupReport {
                reference,
                found: true,
                teardown: Some(teardown),
            })
        }
        Err(LifecycleError::NotFound(_)) => {
            info!(reference = %reference, "no leftover image found");
            Ok(CleanupReport {
                reference,
                found: false,
                teardown: None,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Serialize)]
pub struct CleanupReport {
    pub reference: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown: Option<TeardownReport>,
}

impl Render for CleanupReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Cleanup: {}", self.reference.bold())?;
        match &self.teardown {
            None => writeln!(w, "  {}", "nothing to clean up".green())?,
            Some(teardown) => {
                for sweep in &teardown.containers {
                    writeln!(
                        w,
                        "  container {:<12} ({}) {}",
                        short_id(&sweep.container_id, 12),
                        sweep.state,
                        sweep.outcome().as_str()
                    )?;
                }
                if let Some(ref error) = teardown.sweep_error {
                    writeln!(w, "  {} {}", "container sweep skipped:".yellow(), error)?;
                }
                let summary = teardown.to_string();
                if teardown.is_clean() {
                    writeln!(w, "  {}", summary.green())?;
                } else {
                    writeln!(w, "  {}", summary.yellow())?;
                }
            }
        }
        Ok(())
    }
}
