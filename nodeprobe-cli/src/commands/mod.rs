//! Command handlers -- one module per subcommand

pub mod cleanup;
pub mod config;
pub mod run;

use tracing::debug;

use nodeprobe_core::config::NodeprobeConfig;
use nodeprobe_image_lifecycle::{BollardDockerClient, DockerClient};

use crate::error::CliError;

/// Connect to the configured Docker daemon and make sure it answers.
async fn connect_docker(config: &NodeprobeConfig) -> Result<BollardDockerClient, CliError> {
    let docker = BollardDockerClient::connect(&config.docker.socket, config.docker.timeout_secs)
        .map_err(|e| CliError::DockerUnavailable(e.to_string()))?;
    docker
        .ping()
        .await
        .map_err(|e| CliError::DockerUnavailable(e.to_string()))?;
    debug!(socket = %config.docker.socket, "docker daemon reachable");
    Ok(docker)
}
