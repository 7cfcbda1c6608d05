//! 이미지 생명주기 설정
//!
//! [`LifecycleConfig`]는 core의 [`NodeprobeConfig`]에서
//! 생명주기 관리자가 쓰는 값만 모아 둔 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use nodeprobe_core::config::NodeprobeConfig;
//! use nodeprobe_image_lifecycle::config::LifecycleConfig;
//!
//! let core_config = NodeprobeConfig::default();
//! let config = LifecycleConfig::from_core(&core_config);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nodeprobe_core::config::NodeprobeConfig;

use crate::error::LifecycleError;

/// 설정 상한값 상수
const MAX_STOP_TIMEOUT_SECS: u64 = 300;

/// 이미지 생명주기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// 버전별 빌드 컨텍스트 디렉토리들의 루트
    pub contexts_dir: PathBuf,
    /// 태그 저장소명
    pub repository: String,
    /// 같은 이름의 기존 태그를 덮어쓸지 여부
    pub force_tag: bool,
    /// 명령 실행 대상 OS 계열
    pub os_family: String,
    /// 컨테이너 정지 유예 시간 (초)
    pub stop_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            contexts_dir: PathBuf::from("."),
            repository: "node".to_owned(),
            force_tag: true,
            os_family: "debian".to_owned(),
            stop_timeout_secs: 10,
        }
    }
}

impl LifecycleConfig {
    /// core 설정에서 생명주기 설정을 생성합니다.
    pub fn from_core(core: &NodeprobeConfig) -> Self {
        Self {
            contexts_dir: PathBuf::from(&core.harness.contexts_dir),
            repository: core.harness.repository.clone(),
            os_family: core.harness.os_family.clone(),
            stop_timeout_secs: core.docker.stop_timeout_secs,
            ..Self::default()
        }
    }

    /// 버전의 빌드 컨텍스트 경로 (`<contexts_dir>/<version>`)
    pub fn context_dir(&self, version: &str) -> PathBuf {
        self.contexts_dir.join(version)
    }

    /// 정지 유예 시간
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.repository.trim().is_empty() {
            return Err(LifecycleError::Config {
                field: "repository".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.os_family.trim().is_empty() {
            return Err(LifecycleError::Config {
                field: "os_family".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.stop_timeout_secs > MAX_STOP_TIMEOUT_SECS {
            return Err(LifecycleError::Config {
                field: "stop_timeout_secs".to_owned(),
                reason: format!("must be 0-{MAX_STOP_TIMEOUT_SECS}"),
            });
        }

        if self.contexts_dir.as_os_str().is_empty() {
            return Err(LifecycleError::Config {
                field: "contexts_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 생명주기 설정 빌더
#[derive(Default)]
pub struct LifecycleConfigBuilder {
    config: LifecycleConfig,
}

impl LifecycleConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌드 컨텍스트 루트를 설정합니다.
    pub fn contexts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.contexts_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 태그 저장소명을 설정합니다.
    pub fn repository(mut self, repo: impl Into<String>) -> Self {
        self.config.repository = repo.into();
        self
    }

    /// 태그 덮어쓰기 여부를 설정합니다.
    pub fn force_tag(mut self, force: bool) -> Self {
        self.config.force_tag = force;
        self
    }

    /// OS 계열을 설정합니다.
    pub fn os_family(mut self, family: impl Into<String>) -> Self {
        self.config.os_family = family.into();
        self
    }

    /// 정지 유예 시간(초)을 설정합니다.
    pub fn stop_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stop_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 `LifecycleConfig`를 생성합니다.
    pub fn build(self) -> Result<LifecycleConfig, LifecycleError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
