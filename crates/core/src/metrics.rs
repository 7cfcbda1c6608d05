//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않으면 facade는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `nodeprobe_`
//! - 모듈명: `image_`, `teardown_`, `check_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(nodeprobe_core::metrics::IMAGES_BUILT_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 버전 레이블 키 (14, 22, 24 ...)
pub const LABEL_VERSION: &str = "version";

/// 결과 레이블 키 (removed, ignored, warning)
pub const LABEL_RESULT: &str = "result";

// ─── 이미지 생명주기 메트릭 ─────────────────────────────────────────

/// 빌드 및 태깅에 성공한 이미지 수 (counter)
pub const IMAGES_BUILT_TOTAL: &str = "nodeprobe_image_built_total";

/// 빌드 실패 수 (counter)
pub const IMAGE_BUILD_FAILURES_TOTAL: &str = "nodeprobe_image_build_failures_total";

/// 정리 과정에서 처리된 컨테이너 수 (counter, label: result)
pub const TEARDOWN_CONTAINERS_TOTAL: &str = "nodeprobe_teardown_containers_total";

/// 정리 과정의 경고 수 (counter)
pub const TEARDOWN_WARNINGS_TOTAL: &str = "nodeprobe_teardown_warnings_total";

// ─── 검사 메트릭 ───────────────────────────────────────────────────

/// 통과한 명령 검사 수 (counter, label: version)
pub const CHECKS_PASSED_TOTAL: &str = "nodeprobe_check_passed_total";

/// 실패한 명령 검사 수 (counter, label: version)
pub const CHECKS_FAILED_TOTAL: &str = "nodeprobe_check_failed_total";
