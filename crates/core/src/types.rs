//! 도메인 타입 -- 런타임에 독립적인 컨테이너 서술자

use std::fmt;

use serde::{Deserialize, Serialize};

/// 컨테이너 목록 조회 결과의 한 항목
///
/// 정리(teardown) 시점에만 조회되며 보관하지 않습니다.
/// 런타임은 `image_id`를 `sha256:` 접두어가 붙은 전체 해시로,
/// `image`를 태그명 또는 짧은 ID로 보고할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// 컨테이너 ID
    pub id: String,
    /// 컨테이너를 만든 원본 이미지 참조
    pub image: String,
    /// 원본 이미지 ID
    pub image_id: String,
    /// 생명주기 상태 (running, exited 등)
    pub state: String,
}

impl ContainerDescriptor {
    /// 이미 종료된 컨테이너인지 여부
    pub fn is_exited(&self) -> bool {
        self.state == "exited"
    }

    /// 이 컨테이너가 주어진 이미지 ID로부터 생성되었는지 판단합니다.
    ///
    /// `image` 또는 `image_id` 중 하나라도 `image_id`를 부분 문자열로 포함하면
    /// 일치로 봅니다. 한 이미지의 ID가 무관한 이미지 ID의 부분 문자열이면
    /// 오탐이 날 수 있습니다.
    pub fn derives_from(&self, image_id: &str) -> bool {
        if image_id.is_empty() {
            return false;
        }
        self.image.contains(image_id) || self.image_id.contains(image_id)
    }
}

/// ID의 앞 `len`글자. 문자 경계에서 자르므로 비 ASCII 입력에도 패닉하지 않습니다.
pub fn short_id(id: &str, len: usize) -> &str {
    id.char_indices().nth(len).map_or(id, |(end, _)| &id[..end])
}

impl fmt::Display for ContainerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} image={} state={}",
            short_id(&self.id, 12),
            self.image,
            self.state,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(image: &str, image_id: &str, state: &str) -> ContainerDescriptor {
        ContainerDescriptor {
            id: "0123456789abcdef0123".to_owned(),
            image: image.to_owned(),
            image_id: image_id.to_owned(),
            state: state.to_owned(),
        }
    }

    #[test]
    fn long_prefixed_image_id_matches_short_id() {
        let c = container(
            "node:22",
            "sha256:abcd1234ef567890abcd1234ef567890abcd1234ef567890abcd1234ef567890",
            "running",
        );
        assert!(c.derives_from("abcd1234"));
    }

    #[test]
    fn image_reference_alone_is_enough() {
        let c = container("abcd1234ef56", "", "exited");
        assert!(c.derives_from("abcd1234"));
    }

    #[test]
    fn short_id_truncates_on_char_boundary() {
        assert_eq!(short_id("0123456789abcdef", 12), "0123456789ab");
        assert_eq!(short_id("abc", 12), "abc");
        assert_eq!(short_id("ééééé", 3), "ééé");
        assert_eq!(short_id("", 12), "");
    }

    #[test]
    fn display_with_multibyte_id_does_not_panic() {
        let mut c = container("node:22", "", "running");
        c.id = "컨테이너컨테이너컨테이너컨테이너".to_owned();
        assert!(c.to_string().starts_with("컨테이너컨테이너컨테이너 image=node:22"));
    }

    #[test]
    fn prefixed_image_reference_matches_short_id() {
        let c = container(
            "sha256:abcd1234ef567890abcd1234ef567890abcd1234ef567890abcd1234ef567890",
            "",
            "exited",
        );
        assert!(c.derives_from("abcd1234"));
    }

    #[test]
    fn unrelated_container_does_not_match() {
        let c = container("nginx:latest", "sha256:ffff0000", "running");
        assert!(!c.derives_from("abcd1234"));
    }

    #[test]
    fn empty_image_id_never_matches() {
        let c = container("node:22", "sha256:abcd", "running");
        assert!(!c.derives_from(""));
    }

    #[test]
    fn exited_state_detection() {
        assert!(container("a", "b", "exited").is_exited());
        assert!(!container("a", "b", "running").is_exited());
        assert!(!container("a", "b", "created").is_exited());
    }

    #[test]
    fn display_truncates_id() {
        let display = container("node:22", "sha256:abcd", "running").to_string();
        assert!(display.starts_with("0123456789ab "));
        assert!(display.contains("node:22"));
    }
}
