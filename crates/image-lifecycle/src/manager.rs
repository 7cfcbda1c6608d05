//! 이미지 생명주기 관리자 -- 빌드/태깅/정리 전체 흐름 관리
//!
//! [`ImageLifecycleManager`]는 한 번에 하나의 [`ImageHandle`]만 보유하며,
//! 시나리오마다 다음 순서를 따릅니다.
//!
//! ```text
//! acquire(version)
//!     ├── build_image(<contexts_dir>/<version>)   실패 → LifecycleError::Build
//!     ├── tag_image(repo, version, force)
//!     └── ExecutionTarget 반환
//! [외부에서 명령 실행]
//! release()
//!     ├── list_containers(all) → 파생 컨테이너마다 stop(필요 시) + 강제 삭제
//!     ├── remove_image(force)  (위 단계 결과와 무관하게 항상 1회)
//!     └── 핸들 해제, TeardownReport 반환
//! ```
//!
//! `release()`는 절대 실패하지 않습니다. 정리 중 발생한 에러는 모두
//! 로그로 남기고 [`TeardownReport`]에 기록합니다.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, warn};

use nodeprobe_core::config::validate_version_label;
use nodeprobe_core::metrics::{
    IMAGE_BUILD_FAILURES_TOTAL, IMAGES_BUILT_TOTAL, LABEL_RESULT, LABEL_VERSION,
    TEARDOWN_CONTAINERS_TOTAL, TEARDOWN_WARNINGS_TOTAL,
};
use nodeprobe_core::types::ContainerDescriptor;

use crate::config::LifecycleConfig;
use crate::docker::DockerClient;
use crate::error::LifecycleError;
use crate::handle::{HandleState, ImageHandle, TagSpec};
use crate::report::{ContainerSweep, ImageRemoval, StepOutcome, TeardownReport};
use crate::target::{BackendKind, ExecutionTarget};

/// 이미지 생명주기 관리자
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use nodeprobe_image_lifecycle::{BollardDockerClient, ImageLifecycleManager, LifecycleConfig};
///
/// let docker = Arc::new(BollardDockerClient::connect_local()?);
/// let mut manager = ImageLifecycleManager::new(docker, LifecycleConfig::default())?;
///
/// let target = manager.acquire("22").await?;
/// // ... target으로 명령 실행 ...
/// let report = manager.release().await;
/// ```
pub struct ImageLifecycleManager<D: DockerClient> {
    /// 설정
    config: LifecycleConfig,
    /// Docker 클라이언트 (공유)
    docker: Arc<D>,
    /// 현재 보유 중인 이미지 (최대 1개)
    held: Option<ImageHandle>,
    /// 마지막 핸들의 상태
    state: HandleState,
}

impl<D: DockerClient> ImageLifecycleManager<D> {
    /// 새 관리자를 생성합니다.
    pub fn new(docker: Arc<D>, config: LifecycleConfig) -> Result<Self, LifecycleError> {
        config.validate()?;
        Ok(Self {
            config,
            docker,
            held: None,
            state: HandleState::Unbuilt,
        })
    }

    /// Docker 클라이언트에 대한 Arc 참조를 반환합니다.
    pub fn docker(&self) -> Arc<D> {
        Arc::clone(&self.docker)
    }

    /// 설정
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// 현재 보유 중인 핸들
    pub fn held(&self) -> Option<&ImageHandle> {
        self.held.as_ref()
    }

    /// 마지막 핸들의 상태
    pub fn state(&self) -> HandleState {
        self.state
    }

    fn tag_for(&self, version: &str) -> TagSpec {
        TagSpec {
            repo: self.config.repository.clone(),
            tag: version.to_owned(),
            force: self.config.force_tag,
        }
    }

    fn target_for(&self, handle: &ImageHandle) -> ExecutionTarget {
        ExecutionTarget {
            version: handle.version.clone(),
            image_id: handle.image_id.clone(),
            os_family: self.config.os_family.clone(),
            backend: BackendKind::Docker,
        }
    }

    /// 빌드 실패를 기록하고 에러를 생성합니다.
    fn build_failed(&mut self, version: &str, reason: String) -> LifecycleError {
        self.state = HandleState::Failed;
        counter!(IMAGE_BUILD_FAILURES_TOTAL, LABEL_VERSION => version.to_owned()).increment(1);
        error!(version, reason = %reason, "image build failed");
        LifecycleError::Build {
            version: version.to_owned(),
            reason,
        }
    }

    /// 버전의 빌드 컨텍스트로 이미지를 빌드하고 태그를 붙입니다.
    ///
    /// 성공하면 이후 명령 실행에 쓸 [`ExecutionTarget`]을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::AlreadyHeld`: 이전 핸들이 아직 해제되지 않음 (빌드하지 않음)
    /// - `LifecycleError::Build`: 컨텍스트 누락, 런타임 연결 실패, 빌드/태그 실패
    pub async fn acquire(&mut self, version: &str) -> Result<ExecutionTarget, LifecycleError> {
        if let Some(held) = &self.held {
            return Err(LifecycleError::AlreadyHeld {
                held: held.version.clone(),
                requested: version.to_owned(),
            });
        }

        self.state = HandleState::Unbuilt;

        if let Err(e) = validate_version_label(version) {
            return Err(self.build_failed(version, e.to_string()));
        }

        let context = self.config.context_dir(version);
        if !context.is_dir() {
            return Err(self.build_failed(
                version,
                format!("build context not found: {}", context.display()),
            ));
        }

        info!(version, context = %context.display(), "building image");
        let image_id = match self.docker.build_image(&context).await {
            Ok(id) if !id.trim().is_empty() => id,
            Ok(_) => {
                return Err(self.build_failed(version, "runtime returned an empty image id".to_owned()));
            }
            Err(e) => return Err(self.build_failed(version, e.to_string())),
        };
        self.state = HandleState::Built;

        let tag = self.tag_for(version);
        if let Err(e) = self
            .docker
            .tag_image(&image_id, &tag.repo, &tag.tag, tag.force)
            .await
        {
            // 태그 없는 이미지가 남지 않도록 한 번만 제거 시도
            if let Err(rm) = self.docker.remove_image(&image_id, true).await {
                warn!(image_id = %image_id, error = %rm, "failed to remove untagged image");
            }
            return Err(self.build_failed(version, format!("failed to tag {tag}: {e}")));
        }

        let handle = ImageHandle {
            version: version.to_owned(),
            image_id,
            tag,
        };
        let target = self.target_for(&handle);

        counter!(IMAGES_BUILT_TOTAL, LABEL_VERSION => version.to_owned()).increment(1);
        info!(
            version,
            image_id = %handle.image_id,
            tag = %handle.tag,
            "image built and tagged"
        );

        self.held = Some(handle);
        self.state = HandleState::Tagged;
        Ok(target)
    }

    /// 이전 실행이 남긴 `repo:version` 이미지를 핸들로 가져옵니다.
    ///
    /// 빌드 없이 `release()`로 정리만 하고 싶을 때 사용합니다.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::AlreadyHeld`: 이전 핸들이 아직 해제되지 않음
    /// - `LifecycleError::NotFound`: 해당 태그의 이미지가 없음
    pub async fn adopt(&mut self, version: &str) -> Result<ExecutionTarget, LifecycleError> {
        if let Some(held) = &self.held {
            return Err(LifecycleError::AlreadyHeld {
                held: held.version.clone(),
                requested: version.to_owned(),
            });
        }

        let tag = self.tag_for(version);
        let image_id = self.docker.inspect_image(&tag.reference()).await?;
        info!(version, image_id = %image_id, tag = %tag, "adopted existing image");

        let handle = ImageHandle {
            version: version.to_owned(),
            image_id,
            tag,
        };
        let target = self.target_for(&handle);
        self.held = Some(handle);
        self.state = HandleState::Tagged;
        Ok(target)
    }

    /// 보유 이미지와 그 이미지에서 파생된 모든 컨테이너를 정리합니다.
    ///
    /// 보유 핸들이 없으면 아무것도 하지 않습니다. 여러 번 호출해도 안전하며,
    /// 어떤 경우에도 에러를 반환하지 않습니다.
    pub async fn release(&mut self) -> TeardownReport {
        let Some(handle) = self.held.take() else {
            debug!("release called without a held image, nothing to do");
            return TeardownReport::skipped();
        };

        self.state = HandleState::Cleaning;
        info!(version = %handle.version, image_id = %handle.image_id, "deleting image");

        let mut report = TeardownReport {
            version: Some(handle.version.clone()),
            image_id: Some(handle.image_id.clone()),
            skipped: false,
            containers: Vec::new(),
            sweep_error: None,
            image: ImageRemoval::NotAttempted,
        };

        // 1. 이 이미지에서 파생된 컨테이너 정리 (정지된 것 포함)
        let match_key = match_key(&handle.image_id);
        match self.docker.list_containers(true).await {
            Ok(containers) => {
                for container in containers.iter().filter(|c| c.derives_from(match_key)) {
                    let sweep = self.sweep_container(container).await;
                    counter!(TEARDOWN_CONTAINERS_TOTAL, LABEL_RESULT => sweep.outcome().as_str())
                        .increment(1);
                    report.containers.push(sweep);
                }
            }
            Err(e) => {
                warn!(
                    image_id = %handle.image_id,
                    error = %e,
                    "failed to list containers, skipping container sweep"
                );
                report.sweep_error = Some(e.to_string());
            }
        }

        // 2. 이미지 삭제 (컨테이너 정리 결과와 무관)
        report.image = match self.docker.remove_image(&handle.image_id, true).await {
            Ok(()) => {
                info!(image_id = %handle.image_id, "image removed");
                ImageRemoval::Removed
            }
            Err(e) if e.is_not_found() => {
                info!(image_id = %handle.image_id, "image already removed");
                ImageRemoval::AlreadyGone
            }
            Err(e) => {
                warn!(image_id = %handle.image_id, error = %e, "failed to remove image");
                ImageRemoval::Failed(e.to_string())
            }
        };

        let warnings = report.warning_count();
        if warnings > 0 {
            counter!(TEARDOWN_WARNINGS_TOTAL).increment(warnings as u64);
        }

        self.state = HandleState::Gone;
        report
    }

    /// 파생 컨테이너 하나를 정지(필요 시) 후 강제 삭제합니다.
    ///
    /// 실패는 결과 값으로만 기록하며 다음 컨테이너 처리를 막지 않습니다.
    async fn sweep_container(&self, container: &ContainerDescriptor) -> ContainerSweep {
        let id = container.id.as_str();

        let stop = if container.is_exited() {
            StepOutcome::Skipped
        } else {
            match self.docker.stop_container(id, self.config.stop_grace()).await {
                Ok(()) => StepOutcome::Done,
                Err(e) if e.is_not_modified() || e.is_not_found() => {
                    debug!(container_id = id, reason = %e, "container already stopped");
                    StepOutcome::Ignored(e.to_string())
                }
                Err(e) => {
                    warn!(container_id = id, error = %e, "failed to stop container");
                    StepOutcome::Warning(e.to_string())
                }
            }
        };

        let delete = match self.docker.remove_container(id, true).await {
            Ok(()) => {
                debug!(container_id = id, "container removed");
                StepOutcome::Done
            }
            Err(e) if e.is_not_found() => {
                info!(container_id = id, "container already removed");
                StepOutcome::Ignored(e.to_string())
            }
            Err(e) => {
                warn!(container_id = id, error = %e, "failed to remove container");
                StepOutcome::Warning(e.to_string())
            }
        };

        ContainerSweep {
            container_id: container.id.clone(),
            state: container.state.clone(),
            stop,
            delete,
        }
    }

    /// acquire → `body` → release를 한 번에 수행합니다.
    ///
    /// `body`가 어떤 값을 반환하든 (에러를 담은 `Result` 포함) `release()`가
    /// 반드시 실행됩니다. acquire가 실패하면 `body`와 `release()` 모두 호출되지 않으며,
    /// `AlreadyHeld`인 경우 기존 핸들은 그대로 유지됩니다.
    pub async fn scoped<F, Fut, T>(
        &mut self,
        version: &str,
        body: F,
    ) -> Result<(T, TeardownReport), LifecycleError>
    where
        F: FnOnce(ExecutionTarget) -> Fut,
        Fut: Future<Output = T>,
    {
        let target = self.acquire(version).await?;

        let value = body(target).await;
        let report = self.release().await;
        Ok((value, report))
    }
}

/// 컨테이너 매칭에 쓰는 키. `sha256:` 접두어를 떼어 짧은/긴 형식 모두와 비교합니다.
fn match_key(image_id: &str) -> &str {
    image_id.strip_prefix("sha256:").unwrap_or(image_id)
}
