//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐   ┌───────────────┐
//! │ ImageLifecycleManager │   │ CommandRunner │
//! └───────────┬───────────┘   └───────┬───────┘
//!             └──────────┬────────────┘
//!                        ▼
//!                 ┌─────────────┐
//!                 │DockerClient │ (trait)
//!                 └─────────────┘
//!                    │      │
//!                    ▼      ▼
//!              ┌───────┐ ┌──────┐
//!              │Bollard│ │ Mock │
//!              └───┬───┘ └──────┘
//!                  │
//!                  ▼
//!            Docker Daemon
//! ```
//!
//! # Error classification
//!
//! Every bollard error is mapped onto [`LifecycleError`]:
//! - HTTP 304 becomes [`LifecycleError::NotModified`]
//! - HTTP 404 becomes [`LifecycleError::NotFound`]
//! - socket/IO/timeout failures become [`LifecycleError::DockerConnection`]
//! - everything else becomes [`LifecycleError::DockerApi`]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tracing::debug;

use nodeprobe_core::types::ContainerDescriptor;

use crate::error::LifecycleError;
use crate::exec::CommandOutput;

/// Validates a container ID before it is interpolated into an API path.
///
/// Docker container IDs are 64-character hex strings (or shorter prefix forms).
fn validate_container_id(id: &str) -> Result<(), LifecycleError> {
    if id.is_empty() || id.len() > 64 {
        return Err(LifecycleError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LifecycleError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting the container-runtime operations the harness consumes.
///
/// The trait is `Send + Sync + 'static`, allowing the client to be shared
/// between the lifecycle manager and command runners through an `Arc`.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: Production implementation using the `bollard` library
/// - `MockDockerClient`: Scriptable test implementation (available in tests only)
pub trait DockerClient: Send + Sync + 'static {
    /// Builds an image from a directory containing a `Dockerfile`.
    ///
    /// Returns the runtime-assigned image ID.
    ///
    /// # Errors
    ///
    /// Any build step failure, an unreadable context or an unreachable daemon.
    fn build_image(
        &self,
        context_dir: &Path,
    ) -> impl Future<Output = Result<String, LifecycleError>> + Send;

    /// Tags an image as `repo:tag`.
    ///
    /// `force` is recorded for callers; the Docker Engine API always
    /// overwrites an existing tag of the same name.
    fn tag_image(
        &self,
        image_id: &str,
        repo: &str,
        tag: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Resolves an image name or ID to its full image ID.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::NotFound`: No such image (404)
    fn inspect_image(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<String, LifecycleError>> + Send;

    /// Lists containers. With `all = true` stopped containers are included.
    fn list_containers(
        &self,
        all: bool,
    ) -> impl Future<Output = Result<Vec<ContainerDescriptor>, LifecycleError>> + Send;

    /// Stops a container, sending SIGKILL after `grace`.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::NotModified`: Container already stopped (304)
    fn stop_container(
        &self,
        id: &str,
        grace: Duration,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Deletes a container.
    fn remove_container(
        &self,
        id: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Removes an image.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::NotFound`: Image already removed (404)
    fn remove_image(
        &self,
        image_id: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Creates an idle container from an image and returns its ID.
    fn create_container(
        &self,
        image_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<String, LifecycleError>> + Send;

    /// Starts a created container.
    fn start_container(&self, id: &str) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Runs `argv` inside a running container and waits for it to finish.
    fn exec(
        &self,
        container_id: &str,
        argv: &[String],
    ) -> impl Future<Output = Result<CommandOutput, LifecycleError>> + Send;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), LifecycleError>> + Send;
}

/// Maps a bollard error onto the lifecycle error kinds.
fn classify(err: bollard::errors::Error, context: &str) -> LifecycleError {
    use bollard::errors::Error;

    match err {
        Error::DockerResponseServerError {
            status_code: 304,
            message,
        } => LifecycleError::NotModified(format!("{context}: {message}")),
        Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => LifecycleError::NotFound(format!("{context}: {message}")),
        e @ (Error::IOError { .. } | Error::RequestTimeoutError | Error::SocketNotFoundError(_)) => {
            LifecycleError::DockerConnection(format!("{context}: {e}"))
        }
        e => LifecycleError::DockerApi(format!("{context}: {e}")),
    }
}

/// Packs a build context directory into an uncompressed tar archive.
fn pack_context(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(true);
    builder.append_dir_all(".", dir)?;
    builder.into_inner()
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket.
/// Internally uses `Arc<bollard::Docker>` for cheap cloning into runners.
///
/// # Examples
///
/// ```ignore
/// use nodeprobe_image_lifecycle::BollardDockerClient;
///
/// // Connect to default Docker socket
/// let client = BollardDockerClient::connect_local()?;
///
/// // Or connect to a specific socket
/// let client = BollardDockerClient::connect_with_socket("/run/docker.sock", 120)?;
/// # Ok::<(), nodeprobe_image_lifecycle::LifecycleError>(())
/// ```
#[derive(Clone)]
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::DockerConnection` if the connection fails
    /// (e.g., socket not found, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, LifecycleError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            LifecycleError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path and request timeout.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::DockerConnection` if the connection fails.
    pub fn connect_with_socket(socket_path: &str, timeout_secs: u64) -> Result<Self, LifecycleError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            LifecycleError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects using the socket from configuration, or platform defaults when empty.
    pub fn connect(socket_path: &str, timeout_secs: u64) -> Result<Self, LifecycleError> {
        if socket_path.is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(socket_path, timeout_secs)
        }
    }
}

impl DockerClient for BollardDockerClient {
    async fn build_image(&self, context_dir: &Path) -> Result<String, LifecycleError> {
        use bollard::image::BuildImageOptions;

        let dir: PathBuf = context_dir.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || pack_context(&dir))
            .await
            .map_err(|e| LifecycleError::DockerApi(format!("context packing task failed: {e}")))?
            .map_err(|e| {
                LifecycleError::DockerApi(format!(
                    "failed to read build context {}: {e}",
                    context_dir.display()
                ))
            })?;

        let options = BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_owned(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(
            options,
            None,
            Some(Bytes::from(archive)),
        );

        let mut image_id = None;
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| classify(e, "build image"))?;
            if let Some(detail) = info.error_detail.and_then(|d| d.message) {
                return Err(LifecycleError::DockerApi(detail));
            }
            if let Some(error) = info.error {
                return Err(LifecycleError::DockerApi(error));
            }
            if let Some(line) = info
                .stream
                .as_deref()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
            {
                debug!(output = line, "build");
            }
            if let Some(id) = info.aux.and_then(|aux| aux.id) {
                image_id = Some(id);
            }
        }

        image_id.ok_or_else(|| {
            LifecycleError::DockerApi("build finished without reporting an image id".to_owned())
        })
    }

    async fn tag_image(
        &self,
        image_id: &str,
        repo: &str,
        tag: &str,
        force: bool,
    ) -> Result<(), LifecycleError> {
        use bollard::image::TagImageOptions;

        debug!(image_id, repo, tag, force, "tagging image");
        self.docker
            .tag_image(
                image_id,
                Some(TagImageOptions {
                    repo: repo.to_owned(),
                    tag: tag.to_owned(),
                }),
            )
            .await
            .map_err(|e| classify(e, "tag image"))
    }

    async fn inspect_image(&self, name: &str) -> Result<String, LifecycleError> {
        let details = self
            .docker
            .inspect_image(name)
            .await
            .map_err(|e| classify(e, "inspect image"))?;
        details
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LifecycleError::DockerApi(format!("image '{name}' has no id")))
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerDescriptor>, LifecycleError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| classify(e, "list containers"))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerDescriptor {
                id: c.id.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                image_id: c.image_id.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
            })
            .collect())
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), LifecycleError> {
        validate_container_id(id)?;

        use bollard::container::StopContainerOptions;

        let t = i64::try_from(grace.as_secs()).unwrap_or(i64::MAX);
        self.docker
            .stop_container(id, Some(StopContainerOptions { t }))
            .await
            .map_err(|e| classify(e, "stop container"))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), LifecycleError> {
        validate_container_id(id)?;

        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| classify(e, "remove container"))
    }

    async fn remove_image(&self, image_id: &str, force: bool) -> Result<(), LifecycleError> {
        use bollard::image::RemoveImageOptions;

        self.docker
            .remove_image(
                image_id,
                Some(RemoveImageOptions {
                    force,
                    ..Default::default()
                }),
                None,
            )
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "remove image"))
    }

    async fn create_container(&self, image_id: &str, name: &str) -> Result<String, LifecycleError> {
        use bollard::container::{Config, CreateContainerOptions};

        let options = CreateContainerOptions {
            name: name.to_owned(),
            platform: None,
        };
        // Keep the container alive so commands can be exec'd one by one.
        let config = Config {
            image: Some(image_id.to_owned()),
            entrypoint: Some(vec![
                "/bin/sh".to_owned(),
                "-c".to_owned(),
                "tail -f /dev/null".to_owned(),
            ]),
            tty: Some(false),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| classify(e, "create container"))?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), LifecycleError> {
        validate_container_id(id)?;

        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| classify(e, "start container"))
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<CommandOutput, LifecycleError> {
        validate_container_id(container_id)?;

        use bollard::container::LogOutput;
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let exec_err = |reason: String| LifecycleError::Exec {
            container_id: container_id.to_owned(),
            reason,
        };

        let created = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions::<String> {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| exec_err(format!("create exec: {e}")))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        match self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(|e| exec_err(format!("start exec: {e}")))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk.map_err(|e| exec_err(format!("read output: {e}")))? {
                        LogOutput::StdOut { message } => stdout.extend_from_slice(&message),
                        LogOutput::StdErr { message } => stderr.extend_from_slice(&message),
                        LogOutput::Console { message } => stdout.extend_from_slice(&message),
                        LogOutput::StdIn { .. } => {}
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(exec_err("exec unexpectedly detached".to_owned()));
            }
        }

        let inspected = self
            .docker
            .inspect_exec(&created.id)
            .await
            .map_err(|e| exec_err(format!("inspect exec: {e}")))?;

        Ok(CommandOutput {
            exit_status: inspected.exit_code.unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn ping(&self) -> Result<(), LifecycleError> {
        self.docker
            .ping()
            .await
            .map_err(|e| LifecycleError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}
