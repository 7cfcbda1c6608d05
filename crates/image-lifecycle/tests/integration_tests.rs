//! 통합 테스트 -- 전체 시나리오 플로우 검증
//!
//! acquire → 명령 실행 → release 흐름을 상태를 가진 가짜 데몬
//! (`TestDockerClient`) 위에서 실행하고, 시나리오가 끝난 뒤 이미지와
//! 컨테이너가 하나도 남지 않는지 확인합니다.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nodeprobe_core::types::ContainerDescriptor;
use nodeprobe_image_lifecycle::{
    CommandOutput, CommandRunner, HandleState, ImageLifecycleManager, ImageRemoval,
    LifecycleConfigBuilder, LifecycleError,
};
use tempfile::TempDir;

// Stateful fake daemon for integration tests
mod mock {
    use super::*;
    use nodeprobe_image_lifecycle::DockerClient;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Daemon {
        next_id: u32,
        /// image id -> tags
        images: HashMap<String, Vec<String>>,
        containers: Vec<ContainerDescriptor>,
    }

    pub struct TestDockerClient {
        daemon: Arc<Mutex<Daemon>>,
        node_version: String,
    }

    impl TestDockerClient {
        pub fn new(node_version: &str) -> Self {
            Self {
                daemon: Arc::new(Mutex::new(Daemon::default())),
                node_version: node_version.to_owned(),
            }
        }

        pub async fn add_image(&self, image_id: &str, tag: &str) {
            self.daemon
                .lock()
                .await
                .images
                .insert(image_id.to_owned(), vec![tag.to_owned()]);
        }

        pub async fn add_container(&self, id: &str, image_id: &str, state: &str) {
            self.daemon.lock().await.containers.push(ContainerDescriptor {
                id: id.to_owned(),
                image: image_id.to_owned(),
                image_id: image_id.to_owned(),
                state: state.to_owned(),
            });
        }

        pub async fn forget_image(&self, image_id: &str) {
            self.daemon.lock().await.images.remove(image_id);
        }

        pub async fn image_count(&self) -> usize {
            self.daemon.lock().await.images.len()
        }

        pub async fn container_count(&self) -> usize {
            self.daemon.lock().await.containers.len()
        }
    }

    impl DockerClient for TestDockerClient {
        async fn build_image(&self, context_dir: &Path) -> Result<String, LifecycleError> {
            if !context_dir.join("Dockerfile").is_file() {
                return Err(LifecycleError::DockerApi(
                    "Cannot locate specified Dockerfile: Dockerfile".to_owned(),
                ));
            }
            let mut daemon = self.daemon.lock().await;
            daemon.next_id += 1;
            let id = format!("sha256:{:064x}", 0xfeed_0000u64 + u64::from(daemon.next_id));
            daemon.images.insert(id.clone(), Vec::new());
            Ok(id)
        }

        async fn tag_image(
            &self,
            image_id: &str,
            repo: &str,
            tag: &str,
            _force: bool,
        ) -> Result<(), LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            let reference = format!("{repo}:{tag}");
            for tags in daemon.images.values_mut() {
                tags.retain(|t| t != &reference);
            }
            daemon
                .images
                .get_mut(image_id)
                .ok_or_else(|| LifecycleError::NotFound(format!("no such image: {image_id}")))?
                .push(reference);
            Ok(())
        }

        async fn inspect_image(&self, name: &str) -> Result<String, LifecycleError> {
            let daemon = self.daemon.lock().await;
            daemon
                .images
                .iter()
                .find(|(id, tags)| id.as_str() == name || tags.iter().any(|t| t == name))
                .map(|(id, _)| id.clone())
                .ok_or_else(|| LifecycleError::NotFound(format!("no such image: {name}")))
        }

        async fn list_containers(
            &self,
            all: bool,
        ) -> Result<Vec<ContainerDescriptor>, LifecycleError> {
            let daemon = self.daemon.lock().await;
            Ok(daemon
                .containers
                .iter()
                .filter(|c| all || c.state == "running")
                .cloned()
                .collect())
        }

        async fn stop_container(&self, id: &str, _grace: Duration) -> Result<(), LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            let container = daemon
                .containers
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| LifecycleError::NotFound(format!("no such container: {id}")))?;
            if container.state != "running" {
                return Err(LifecycleError::NotModified(format!(
                    "container {id} is not running"
                )));
            }
            container.state = "exited".to_owned();
            Ok(())
        }

        async fn remove_container(&self, id: &str, _force: bool) -> Result<(), LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            let before = daemon.containers.len();
            daemon.containers.retain(|c| c.id != id);
            if daemon.containers.len() == before {
                return Err(LifecycleError::NotFound(format!("no such container: {id}")));
            }
            Ok(())
        }

        async fn remove_image(&self, image_id: &str, force: bool) -> Result<(), LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            if !force && daemon.containers.iter().any(|c| c.image_id == image_id) {
                return Err(LifecycleError::DockerApi(
                    "conflict: image is being used by a container".to_owned(),
                ));
            }
            daemon
                .images
                .remove(image_id)
                .map(|_| ())
                .ok_or_else(|| LifecycleError::NotFound(format!("no such image: {image_id}")))
        }

        async fn create_container(
            &self,
            image_id: &str,
            _name: &str,
        ) -> Result<String, LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            if !daemon.images.contains_key(image_id) {
                return Err(LifecycleError::NotFound(format!("no such image: {image_id}")));
            }
            daemon.next_id += 1;
            let id = format!("{:016x}", 0xc0de_0000u64 + u64::from(daemon.next_id));
            daemon.containers.push(ContainerDescriptor {
                id: id.clone(),
                image: image_id.to_owned(),
                image_id: image_id.to_owned(),
                state: "created".to_owned(),
            });
            Ok(id)
        }

        async fn start_container(&self, id: &str) -> Result<(), LifecycleError> {
            let mut daemon = self.daemon.lock().await;
            let container = daemon
                .containers
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| LifecycleError::NotFound(format!("no such container: {id}")))?;
            container.state = "running".to_owned();
            Ok(())
        }

        async fn exec(
            &self,
            container_id: &str,
            argv: &[String],
        ) -> Result<CommandOutput, LifecycleError> {
            let daemon = self.daemon.lock().await;
            if !daemon
                .containers
                .iter()
                .any(|c| c.id == container_id && c.state == "running")
            {
                return Err(LifecycleError::Exec {
                    container_id: container_id.to_owned(),
                    reason: "container is not running".to_owned(),
                });
            }
            let command = argv.last().map(String::as_str).unwrap_or_default();
            let output = match command {
                "node -v" => CommandOutput {
                    exit_status: 0,
                    stdout: format!("v{}\n", self.node_version),
                    stderr: String::new(),
                },
                _ => CommandOutput {
                    exit_status: 127,
                    stdout: String::new(),
                    stderr: format!("sh: 1: {command}: not found\n"),
                },
            };
            Ok(output)
        }

        async fn ping(&self) -> Result<(), LifecycleError> {
            Ok(())
        }
    }
}

use mock::TestDockerClient;

fn contexts(versions: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for v in versions {
        let ctx = dir.path().join(v);
        std::fs::create_dir_all(&ctx).unwrap();
        std::fs::write(ctx.join("Dockerfile"), format!("FROM node:{v}\n")).unwrap();
    }
    dir
}

fn manager(
    docker: &Arc<TestDockerClient>,
    dir: &TempDir,
) -> ImageLifecycleManager<TestDockerClient> {
    let config = LifecycleConfigBuilder::new()
        .contexts_dir(dir.path())
        .stop_timeout_secs(1)
        .build()
        .unwrap();
    ImageLifecycleManager::new(Arc::clone(docker), config).unwrap()
}

#[tokio::test]
async fn scenario_leaves_no_images_or_containers() {
    let dir = contexts(&["22"]);
    let docker = Arc::new(TestDockerClient::new("22.18.0"));
    let mut manager = manager(&docker, &dir);

    let target = manager.acquire("22").await.unwrap();
    let mut runner = CommandRunner::new(manager.docker(), target);
    let output = runner.run("node -v").await.unwrap();
    assert!(output.success());
    assert!(output.stdout.contains("22.18.0"));

    let missing = runner.run("json --version").await.unwrap();
    assert_eq!(missing.exit_status, 127);
    assert_eq!(docker.container_count().await, 1);

    let report = manager.release().await;
    assert!(report.is_clean(), "unexpected warnings: {report:?}");
    assert_eq!(report.containers_removed(), 1);
    assert_eq!(report.image, ImageRemoval::Removed);
    assert_eq!(docker.image_count().await, 0);
    assert_eq!(docker.container_count().await, 0);
    assert_eq!(manager.state(), HandleState::Gone);
}

#[tokio::test]
async fn sequential_scenarios_do_not_share_images() {
    let dir = contexts(&["14", "22", "24"]);
    let docker = Arc::new(TestDockerClient::new("24.13.0"));
    let mut manager = manager(&docker, &dir);

    let mut seen = HashSet::new();
    for version in ["14", "22", "24"] {
        let (image_id, report) = manager
            .scoped(version, |target| {
                let docker = Arc::clone(&docker);
                async move {
                    let mut runner = CommandRunner::new(docker, target.clone());
                    runner.run("node -v").await.unwrap();
                    target.image_id
                }
            })
            .await
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(docker.image_count().await, 0);
        seen.insert(image_id);
    }

    assert_eq!(seen.len(), 3);
    assert_eq!(docker.container_count().await, 0);
}

#[tokio::test]
async fn missing_dockerfile_is_build_failure_and_nothing_leaks() {
    let dir = contexts(&[]);
    std::fs::create_dir(dir.path().join("18")).unwrap();
    let docker = Arc::new(TestDockerClient::new("18.0.0"));
    let mut manager = manager(&docker, &dir);

    let err = manager.acquire("18").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Build { .. }));
    assert!(err.to_string().contains("Dockerfile"));

    let report = manager.release().await;
    assert!(report.skipped);
    assert_eq!(docker.image_count().await, 0);
}

#[tokio::test]
async fn release_sweeps_leftovers_from_previous_runs() {
    let dir = contexts(&[]);
    let docker = Arc::new(TestDockerClient::new("22.18.0"));
    let image_id = format!("sha256:{}", "ab".repeat(32));
    docker.add_image(&image_id, "node:22").await;
    docker.add_container("0000aaaa", &image_id, "exited").await;
    docker.add_container("0000bbbb", &image_id, "running").await;
    docker
        .add_container("0000cccc", "sha256:ffffffff", "running")
        .await;

    let mut manager = manager(&docker, &dir);
    manager.adopt("22").await.unwrap();
    let report = manager.release().await;

    assert!(report.is_clean());
    assert_eq!(report.containers.len(), 2);
    assert_eq!(report.image, ImageRemoval::Removed);
    // 다른 이미지의 컨테이너는 남아 있어야 함
    assert_eq!(docker.container_count().await, 1);
    assert_eq!(docker.image_count().await, 0);
}

#[tokio::test]
async fn image_removed_externally_is_not_a_warning() {
    let dir = contexts(&["22"]);
    let docker = Arc::new(TestDockerClient::new("22.18.0"));
    let mut manager = manager(&docker, &dir);

    let target = manager.acquire("22").await.unwrap();
    docker.forget_image(&target.image_id).await;

    let report = manager.release().await;
    assert_eq!(report.image, ImageRemoval::AlreadyGone);
    assert!(report.is_clean());
}

/// 실제 Docker 데몬이 필요한 테스트: `cargo test -- --ignored`
#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn live_daemon_build_exec_release() {
    use nodeprobe_image_lifecycle::BollardDockerClient;

    let dir = TempDir::new().unwrap();
    let ctx = dir.path().join("live");
    std::fs::create_dir(&ctx).unwrap();
    std::fs::write(ctx.join("Dockerfile"), "FROM busybox:latest\n").unwrap();

    let docker = Arc::new(BollardDockerClient::connect_local().unwrap());
    let config = LifecycleConfigBuilder::new()
        .contexts_dir(dir.path())
        .repository("nodeprobe-live")
        .build()
        .unwrap();
    let mut manager = ImageLifecycleManager::new(docker, config).unwrap();

    let target = manager.acquire("live").await.unwrap();
    let mut runner = CommandRunner::new(manager.docker(), target);
    let output = runner.run("echo hello").await.unwrap();
    assert_eq!(output.stdout.trim(), "hello");

    let report = manager.release().await;
    assert!(report.image.is_success(), "{report}");
    assert_eq!(report.containers.len(), 1);
}
