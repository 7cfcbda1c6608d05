//! 에러 타입 -- 도메인별 에러 정의

/// nodeprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum NodeprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 이미지 빌드 실패 (시나리오 전체가 무효화됨)
    #[error("image build failed for '{version}': {reason}")]
    Build { version: String, reason: String },

    /// 컨테이너 런타임 에러
    #[error("container runtime error: {0}")]
    Runtime(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
