//! Explicit command-execution target.
//!
//! `acquire` hands back an [`ExecutionTarget`] instead of mutating any
//! process-wide backend settings; whoever executes commands receives it
//! as a value.

use std::fmt;

use serde::Serialize;

use nodeprobe_core::short_id;

/// Which backend executes commands against the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Commands run through the Docker daemon in a container of the image.
    Docker,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => f.write_str("docker"),
        }
    }
}

/// Where and how subsequent commands of one scenario are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTarget {
    /// Version label of the scenario.
    pub version: String,
    /// Image to run commands against.
    pub image_id: String,
    /// OS family of the image (e.g. `debian`).
    pub os_family: String,
    /// Execution backend.
    pub backend: BackendKind,
}

impl ExecutionTarget {
    /// Shell used to interpret command strings.
    pub fn shell(&self) -> &'static str {
        "/bin/sh"
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} image={} os={}",
            self.backend,
            short_id(&self.image_id, 19),
            self.os_family
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_tolerates_non_ascii_image_id() {
        let target = ExecutionTarget {
            version: "22".to_owned(),
            image_id: "ü".repeat(30),
            os_family: "debian".to_owned(),
            backend: BackendKind::Docker,
        };
        let expected = format!("docker image={} os=debian", "ü".repeat(19));
        assert_eq!(target.to_string(), expected);
    }

    #[test]
    fn display_shortens_image_id() {
        let target = ExecutionTarget {
            version: "22".to_owned(),
            image_id: "sha256:abcdef0123456789abcdef0123456789".to_owned(),
            os_family: "debian".to_owned(),
            backend: BackendKind::Docker,
        };
        assert_eq!(target.to_string(), "docker image=sha256:abcdef012345 os=debian");
        assert_eq!(target.shell(), "/bin/sh");
    }
}
