//! 이미지 생명주기 에러 타입
//!
//! [`LifecycleError`]는 이미지 빌드, 컨테이너 정리, 명령 실행 중 발생하는
//! 모든 에러를 표현합니다. `From<LifecycleError> for NodeprobeError` 변환이
//! 구현되어 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 런타임 응답은 [`classify`](crate::docker)에서 세 종류로 분류됩니다:
//! 변경 없음(304), 없음(404), 그 외 일반 런타임 에러.

use nodeprobe_core::error::NodeprobeError;

/// 이미지 생명주기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// 이미지 빌드 또는 태깅 실패 (시나리오 전체가 무효화됨)
    #[error("image build failed for '{version}': {reason}")]
    Build {
        /// 빌드 대상 버전 라벨
        version: String,
        /// 런타임이 보고한 실패 사유
        reason: String,
    },

    /// 이미 다른 이미지 핸들을 보유 중
    #[error("image for '{held}' is still held; release it before acquiring '{requested}'")]
    AlreadyHeld {
        /// 현재 보유 중인 버전
        held: String,
        /// 새로 요청된 버전
        requested: String,
    },

    /// 대상이 이미 요청된 상태임 (HTTP 304)
    #[error("not modified: {0}")]
    NotModified(String),

    /// 대상이 존재하지 않음 (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너 내부 명령 실행 실패
    #[error("exec failed in container '{container_id}': {reason}")]
    Exec {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl LifecycleError {
    /// 304 응답 (이미 정지된 컨테이너 등) 여부
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified(_))
    }

    /// 404 응답 여부
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<LifecycleError> for NodeprobeError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Build { version, reason } => NodeprobeError::Build { version, reason },
            LifecycleError::Config { field, reason } => {
                NodeprobeError::Config(nodeprobe_core::error::ConfigError::InvalidValue {
                    field,
                    reason,
                })
            }
            other => NodeprobeError::Runtime(other.to_string()),
        }
    }
}
