//! 명령 실행 -- 획득한 이미지의 컨테이너 안에서 셸 명령 실행
//!
//! [`CommandRunner`]는 [`ExecutionTarget`]을 명시적으로 받아,
//! 첫 명령 실행 시점에 대상 이미지로 유휴 컨테이너를 하나 만들고
//! 이후 명령들을 그 컨테이너 안에서 `/bin/sh -c`로 실행합니다.
//!
//! 생성한 컨테이너는 대상 이미지에서 파생되므로 정리하지 않고
//! `release()`의 컨테이너 정리 단계에 맡깁니다.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::docker::DockerClient;
use crate::error::LifecycleError;
use crate::target::ExecutionTarget;

/// 명령 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// 종료 코드 (런타임이 보고하지 않으면 -1)
    pub exit_status: i64,
    /// 표준 출력
    pub stdout: String,
    /// 표준 에러
    pub stderr: String,
}

impl CommandOutput {
    /// 종료 코드가 0인지 여부
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// 한 시나리오 동안 명령을 실행하는 실행기
pub struct CommandRunner<D: DockerClient> {
    /// Docker 클라이언트 (공유)
    docker: Arc<D>,
    /// 실행 대상
    target: ExecutionTarget,
    /// 지연 생성된 실행용 컨테이너
    container_id: Option<String>,
}

impl<D: DockerClient> CommandRunner<D> {
    /// 새 실행기를 생성합니다. 컨테이너는 첫 `run` 호출 때 만들어집니다.
    pub fn new(docker: Arc<D>, target: ExecutionTarget) -> Self {
        Self {
            docker,
            target,
            container_id: None,
        }
    }

    /// 실행 대상
    pub fn target(&self) -> &ExecutionTarget {
        &self.target
    }

    /// 생성된 실행용 컨테이너 ID
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// 셸 명령 하나를 실행하고 결과를 반환합니다.
    ///
    /// 0이 아닌 종료 코드는 에러가 아니라 [`CommandOutput`]으로 전달됩니다.
    pub async fn run(&mut self, command: &str) -> Result<CommandOutput, LifecycleError> {
        let container_id = self.ensure_container().await?;
        let argv = vec![
            self.target.shell().to_owned(),
            "-c".to_owned(),
            command.to_owned(),
        ];

        debug!(container_id = %container_id, command, "executing command");
        let output = self.docker.exec(&container_id, &argv).await?;
        debug!(
            container_id = %container_id,
            command,
            exit_status = output.exit_status,
            "command finished"
        );
        Ok(output)
    }

    async fn ensure_container(&mut self) -> Result<String, LifecycleError> {
        if let Some(id) = &self.container_id {
            return Ok(id.clone());
        }

        let name = format!(
            "nodeprobe-{}-{}",
            self.target.version,
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let id = self
            .docker
            .create_container(&self.target.image_id, &name)
            .await?;
        self.docker.start_container(&id).await?;

        info!(
            container_id = %id,
            name = %name,
            target = %self.target,
            "started command container"
        );
        self.container_id = Some(id.clone());
        Ok(id)
    }
}
