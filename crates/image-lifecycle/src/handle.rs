//! 이미지 핸들과 상태 정의
//!
//! [`ImageHandle`]은 한 번의 acquire/release 주기 동안만 존재하는
//! 빌드된 이미지를 나타냅니다. 버전 간에 캐시하거나 재사용하지 않습니다.

use std::fmt;

use serde::Serialize;

/// 태그 지정 (저장소, 태그명, 덮어쓰기 여부)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSpec {
    /// 저장소명 (기본값 "node")
    pub repo: String,
    /// 태그명 (버전 라벨과 동일)
    pub tag: String,
    /// 같은 이름의 기존 태그 덮어쓰기
    pub force: bool,
}

impl TagSpec {
    /// `repo:tag` 형식의 참조
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repo, self.tag)
    }
}

impl fmt::Display for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.tag)
    }
}

/// 빌드된 이미지 하나에 대한 핸들
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageHandle {
    /// 버전 라벨 (빌드 컨텍스트 디렉토리명이자 태그명)
    pub version: String,
    /// 런타임이 부여한 이미지 ID (항상 비어 있지 않음)
    pub image_id: String,
    /// 부여된 태그
    pub tag: TagSpec,
}

/// 이미지 핸들의 생명주기 상태
///
/// ```text
/// Unbuilt ──acquire──> Built ──tag──> Tagged ──release──> Cleaning ──> Gone
///    │
///    └──build/tag failure──> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// 아직 빌드하지 않음
    Unbuilt,
    /// 빌드 완료, 태그 전
    Built,
    /// 태그 완료, 테스트 가능
    Tagged,
    /// 정리 진행 중
    Cleaning,
    /// 정리 완료 (종료 상태)
    Gone,
    /// 빌드 실패 (종료 상태, 핸들 없음)
    Failed,
}

impl HandleState {
    /// 상태명
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unbuilt => "unbuilt",
            Self::Built => "built",
            Self::Tagged => "tagged",
            Self::Cleaning => "cleaning",
            Self::Gone => "gone",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
