//! 정리(teardown) 결과 보고서
//!
//! 컨테이너별 정리 결과를 예외 억제 대신 명시적인 값으로 모아
//! 정리 과정을 감사하고 테스트할 수 있게 합니다.

use std::fmt;

use serde::Serialize;

/// 정리 단계 하나(정지 또는 삭제)의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum StepOutcome {
    /// 수행 완료
    Done,
    /// 수행할 필요 없음 (이미 exited 상태)
    Skipped,
    /// 예상된 실패로 무시함 (304 not modified 등)
    Ignored(String),
    /// 예상치 못한 실패, 경고로 기록하고 계속 진행
    Warning(String),
}

impl StepOutcome {
    /// 경고 여부
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

/// 컨테이너 하나에 대한 정리 결과 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
    /// 정지/삭제 모두 문제 없이 끝남
    Removed,
    /// 예상된 실패가 있었지만 삭제됨
    Ignored,
    /// 한 단계 이상이 경고로 끝남
    Warning,
}

impl SweepOutcome {
    /// 메트릭 레이블용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::Ignored => "ignored",
            Self::Warning => "warning",
        }
    }
}

/// 컨테이너 하나의 정리 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSweep {
    /// 컨테이너 ID
    pub container_id: String,
    /// 정리 시작 시점의 상태
    pub state: String,
    /// 정지 단계 결과
    pub stop: StepOutcome,
    /// 강제 삭제 단계 결과
    pub delete: StepOutcome,
}

impl ContainerSweep {
    /// 두 단계를 합친 결과
    pub fn outcome(&self) -> SweepOutcome {
        if self.stop.is_warning() || self.delete.is_warning() {
            SweepOutcome::Warning
        } else if matches!(self.stop, StepOutcome::Ignored(_))
            || matches!(self.delete, StepOutcome::Ignored(_))
        {
            SweepOutcome::Ignored
        } else {
            SweepOutcome::Removed
        }
    }
}

/// 이미지 삭제 단계 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ImageRemoval {
    /// 보유 이미지가 없어 시도하지 않음
    NotAttempted,
    /// 삭제됨
    Removed,
    /// 이미 없음 (이전 부분 실행 등), 성공과 동일하게 취급
    AlreadyGone,
    /// 삭제 실패 (경고)
    Failed(String),
}

impl ImageRemoval {
    /// 이미지가 더 이상 존재하지 않는 것으로 볼 수 있는지 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Removed | Self::AlreadyGone)
    }
}

/// `release()` 한 번의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// 정리 대상 버전 (보유 핸들이 없었으면 `None`)
    pub version: Option<String>,
    /// 정리 대상 이미지 ID
    pub image_id: Option<String>,
    /// 보유 핸들이 없어 아무것도 하지 않았는지 여부
    pub skipped: bool,
    /// 컨테이너별 정리 기록
    pub containers: Vec<ContainerSweep>,
    /// 컨테이너 목록 조회 자체가 실패한 경우의 사유
    pub sweep_error: Option<String>,
    /// 이미지 삭제 결과
    pub image: ImageRemoval,
}

impl TeardownReport {
    /// 보유 핸들이 없을 때의 빈 보고서
    pub fn skipped() -> Self {
        Self {
            version: None,
            image_id: None,
            skipped: true,
            containers: Vec::new(),
            sweep_error: None,
            image: ImageRemoval::NotAttempted,
        }
    }

    /// 경고 개수 (컨테이너 단계 경고 + 목록 조회 실패 + 이미지 삭제 실패)
    pub fn warning_count(&self) -> usize {
        let container_warnings = self
            .containers
            .iter()
            .map(|c| usize::from(c.stop.is_warning()) + usize::from(c.delete.is_warning()))
            .sum::<usize>();
        container_warnings
            + usize::from(self.sweep_error.is_some())
            + usize::from(matches!(self.image, ImageRemoval::Failed(_)))
    }

    /// 경고 없이 정리가 끝났는지 여부
    pub fn is_clean(&self) -> bool {
        self.warning_count() == 0
    }

    /// 삭제된 컨테이너 수 (경고 없이 삭제 단계가 끝난 것)
    pub fn containers_removed(&self) -> usize {
        self.containers
            .iter()
            .filter(|c| c.delete == StepOutcome::Done)
            .count()
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return f.write_str("nothing to release");
        }
        write!(
            f,
            "{} container(s) swept, image {}, {} warning(s)",
            self.containers.len(),
            match &self.image {
                ImageRemoval::NotAttempted => "not attempted",
                ImageRemoval::Removed => "removed",
                ImageRemoval::AlreadyGone => "already gone",
                ImageRemoval::Failed(_) => "removal failed",
            },
            self.warning_count()
        )
    }
}
