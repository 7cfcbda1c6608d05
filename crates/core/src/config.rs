//! 설정 관리 -- nodeprobe.toml 파싱 및 런타임 설정
//!
//! [`NodeprobeConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`NODEPROBE_DOCKER_SOCKET=/run/docker.sock` 형식)
//! 3. 설정 파일 (`nodeprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), nodeprobe_core::error::NodeprobeError> {
//! use nodeprobe_core::config::NodeprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = NodeprobeConfig::load("nodeprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = NodeprobeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NodeprobeError};

/// 설정 상한값 상수
const MAX_DOCKER_TIMEOUT_SECS: u64 = 3600;
const MAX_STOP_TIMEOUT_SECS: u64 = 300;

/// nodeprobe 통합 설정
///
/// `nodeprobe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 데몬 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 하네스(빌드 컨텍스트, 시나리오) 설정
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl NodeprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NodeprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    ///
    /// CLI의 `run`처럼 설정 파일 없이도 동작해야 하는 명령에서 사용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, NodeprobeError> {
        match Self::load(path.as_ref()).await {
            Err(NodeprobeError::Config(ConfigError::FileNotFound { path })) => {
                warn!(path = %path, "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NodeprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NodeprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NodeprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, NodeprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            NodeprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `NODEPROBE_{SECTION}_{FIELD}`
    /// 예: `NODEPROBE_HARNESS_CONTEXTS_DIR=/srv/docker-node`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NODEPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NODEPROBE_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "NODEPROBE_DOCKER_SOCKET");
        override_u64(&mut self.docker.timeout_secs, "NODEPROBE_DOCKER_TIMEOUT_SECS");
        override_u64(
            &mut self.docker.stop_timeout_secs,
            "NODEPROBE_DOCKER_STOP_TIMEOUT_SECS",
        );

        // Harness
        override_string(
            &mut self.harness.contexts_dir,
            "NODEPROBE_HARNESS_CONTEXTS_DIR",
        );
        override_string(&mut self.harness.repository, "NODEPROBE_HARNESS_REPOSITORY");
        override_string(&mut self.harness.os_family, "NODEPROBE_HARNESS_OS_FAMILY");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NodeprobeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.docker.timeout_secs == 0 || self.docker.timeout_secs > MAX_DOCKER_TIMEOUT_SECS {
            return Err(invalid(
                "docker.timeout_secs",
                format!("must be 1-{MAX_DOCKER_TIMEOUT_SECS}"),
            ));
        }

        if self.docker.stop_timeout_secs > MAX_STOP_TIMEOUT_SECS {
            return Err(invalid(
                "docker.stop_timeout_secs",
                format!("must be 0-{MAX_STOP_TIMEOUT_SECS}"),
            ));
        }

        if self.harness.repository.trim().is_empty() {
            return Err(invalid("harness.repository", "must not be empty".to_owned()));
        }

        if self.harness.os_family.trim().is_empty() {
            return Err(invalid("harness.os_family", "must not be empty".to_owned()));
        }

        // 시나리오 버전은 디렉토리명이자 태그명으로 쓰이므로 경로 구분자를 허용하지 않음
        let mut seen = std::collections::HashSet::new();
        for scenario in &self.harness.scenarios {
            validate_version_label(&scenario.version)?;
            if scenario.node_version.trim().is_empty() {
                return Err(invalid(
                    "harness.scenarios.node_version",
                    format!("scenario '{}' has an empty node_version", scenario.version),
                ));
            }
            if !seen.insert(scenario.version.as_str()) {
                return Err(invalid(
                    "harness.scenarios.version",
                    format!("duplicate scenario '{}'", scenario.version),
                ));
            }
        }

        Ok(())
    }

    /// 버전 라벨로 시나리오를 찾습니다.
    pub fn scenario(&self, version: &str) -> Option<&ScenarioConfig> {
        self.harness.scenarios.iter().find(|s| s.version == version)
    }
}

/// 버전 라벨(빌드 컨텍스트 디렉토리명 겸 태그명)을 검증합니다.
///
/// Docker 태그 규칙: 영숫자, `.`, `_`, `-`만 허용, 최대 128자, 첫 글자는 `.`/`-` 불가.
pub fn validate_version_label(version: &str) -> Result<(), NodeprobeError> {
    if version.is_empty() || version.len() > 128 {
        return Err(invalid(
            "harness.scenarios.version",
            format!("'{version}' must be 1-128 characters"),
        ));
    }
    if version.starts_with('.') || version.starts_with('-') {
        return Err(invalid(
            "harness.scenarios.version",
            format!("'{version}' must not start with '.' or '-'"),
        ));
    }
    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid(
            "harness.scenarios.version",
            format!("'{version}' contains characters not allowed in a tag"),
        ));
    }
    Ok(())
}

fn invalid(field: &str, reason: String) -> NodeprobeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Docker 데몬 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (빈 문자열이면 플랫폼 기본값)
    pub socket: String,
    /// 데몬 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 컨테이너 정지 유예 시간 (초)
    pub stop_timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: "/var/run/docker.sock".to_owned(),
            timeout_secs: 120,
            stop_timeout_secs: 10,
        }
    }
}

/// 하네스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// 버전별 빌드 컨텍스트 디렉토리들이 위치한 루트
    pub contexts_dir: String,
    /// 태그 저장소명
    pub repository: String,
    /// 명령 실행 대상 OS 계열
    pub os_family: String,
    /// 지원 버전 목록
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            contexts_dir: ".".to_owned(),
            repository: "node".to_owned(),
            os_family: "debian".to_owned(),
            scenarios: vec![
                ScenarioConfig::new("14", "14.17.1"),
                ScenarioConfig::new("22", "22.18.0"),
                ScenarioConfig::new("24", "24.13.0"),
            ],
        }
    }
}

/// 한 버전의 시나리오 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// 버전 라벨 (빌드 컨텍스트 디렉토리명이자 태그명)
    pub version: String,
    /// `node -v` 출력에 포함되어야 하는 Node.js 버전
    pub node_version: String,
}

impl ScenarioConfig {
    /// 새 시나리오 정의를 생성합니다.
    pub fn new(version: impl Into<String>, node_version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            node_version: node_version.into(),
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
