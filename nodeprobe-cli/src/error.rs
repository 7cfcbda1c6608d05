//! CLI-specific error types and exit code mapping

use nodeprobe_core::error::NodeprobeError;
use nodeprobe_image_lifecycle::LifecycleError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot connect to the Docker daemon.
    #[error("docker not reachable: {0}")]
    DockerUnavailable(String),

    /// At least one check of the battery failed.
    #[error("checks failed: {0}")]
    ChecksFailed(String),

    /// At least one image could not be built or tagged.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from nodeprobe-core.
    #[error("{0}")]
    Core(#[from] NodeprobeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 3    | Docker daemon unreachable            |
    /// | 4    | One or more checks failed            |
    /// | 5    | One or more image builds failed      |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(NodeprobeError::Config(_)) => 2,
            Self::DockerUnavailable(_) => 3,
            Self::ChecksFailed(_) => 4,
            Self::BuildFailed(_) | Self::Core(NodeprobeError::Build { .. }) => 5,
            Self::Io(_) | Self::Core(NodeprobeError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<LifecycleError> for CliError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::DockerConnection(_) => Self::DockerUnavailable(e.to_string()),
            LifecycleError::Build { .. } => Self::BuildFailed(e.to_string()),
            LifecycleError::Config { .. } => Self::Config(e.to_string()),
            _ => Self::Command(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        use nodeprobe_core::error::ConfigError;
        let err = CliError::Core(NodeprobeError::Config(ConfigError::FileNotFound {
            path: "nodeprobe.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_docker_unavailable() {
        let err = CliError::DockerUnavailable("connection refused".to_owned());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_checks_and_build_failures() {
        assert_eq!(CliError::ChecksFailed("2 of 5".to_owned()).exit_code(), 4);
        assert_eq!(CliError::BuildFailed("22".to_owned()).exit_code(), 5);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_lifecycle_connection_error() {
        let err: CliError = LifecycleError::DockerConnection("socket not found".to_owned()).into();
        assert!(matches!(err, CliError::DockerUnavailable(_)));
        assert!(err.to_string().contains("socket not found"));
    }

    #[test]
    fn test_from_lifecycle_build_error() {
        let err: CliError = LifecycleError::Build {
            version: "22".to_owned(),
            reason: "step failed".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_from_lifecycle_not_found_is_command_error() {
        let err: CliError = LifecycleError::NotFound("no such image: node:22".to_owned()).into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
