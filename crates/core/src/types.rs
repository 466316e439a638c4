//! 도메인 타입 — 스테이지, 알림 페이로드, 이미지 참조
//!
//! 하네스의 모든 모듈이 공유하는 기본 데이터 타입을 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 고유 식별자 길이 (16진수 문자 수)
const UNIQUE_ID_LEN: usize = 12;

/// 테스트 생명주기 스테이지
///
/// 고정된 순서로 실행됩니다: `InitApply` → `Validate` → `Destroy`.
/// `Destroy`는 앞선 스테이지의 실패와 관계없이 항상 실행됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 실행 컨텍스트 생성 + 인프라 프로비저닝 + 기준 이미지 푸시
    InitApply,
    /// 검증기 실행
    Validate,
    /// 인프라 정리
    Destroy,
}

impl Stage {
    /// 실행 순서대로 나열된 전체 스테이지
    pub const ALL: [Stage; 3] = [Stage::InitApply, Stage::Validate, Stage::Destroy];

    /// 마커 파일 및 로그에 사용되는 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitApply => "init_apply",
            Self::Validate => "validate",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init_apply" | "init-apply" => Ok(Self::InitApply),
            "validate" => Ok(Self::Validate),
            "destroy" => Ok(Self::Destroy),
            other => Err(format!(
                "unknown stage '{other}', expected one of: init_apply, validate, destroy"
            )),
        }
    }
}

/// 재태깅 요청 알림 페이로드
///
/// 와이어 형식은 정확히 세 필드를 가진 평탄한 JSON 객체입니다:
/// `{"ecr_repo_name", "ecr_tag_to_update", "ecr_tag_to_add"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationPayload {
    /// 대상 저장소 이름
    #[serde(rename = "ecr_repo_name")]
    pub repo_name: String,
    /// 현재 이미지를 가리키는 태그
    #[serde(rename = "ecr_tag_to_update")]
    pub tag_to_update: String,
    /// 새로 추가할 태그 (실행 내 고유)
    #[serde(rename = "ecr_tag_to_add")]
    pub tag_to_add: String,
}

impl NotificationPayload {
    /// `tag_to_update`가 가리키는 이미지에 새 고유 태그를 요청하는 페이로드를 생성합니다.
    pub fn retag(repo_name: impl Into<String>, tag_to_update: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            tag_to_update: tag_to_update.into(),
            tag_to_add: unique_id(),
        }
    }

    /// 와이어 형식(JSON)으로 직렬화합니다.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 레지스트리 목록의 태그/다이제스트 쌍
///
/// 단일 조회 시도 동안만 유효하며 캐시하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// 이미지 태그 (태그 없는 이미지는 `None`)
    pub tag: Option<String>,
    /// 콘텐츠 주소 다이제스트 (예: `sha256:...`)
    pub digest: String,
}

impl ImageRef {
    /// 태그가 있는 이미지 참조를 생성합니다.
    pub fn tagged(tag: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            digest: digest.into(),
        }
    }
}

/// 소문자 16진수로 된 짧은 고유 식별자를 생성합니다.
///
/// UUID v4의 앞 48비트를 사용하므로 실행 간 충돌 가능성은 무시할 수 있습니다.
pub fn unique_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(UNIQUE_ID_LEN);
    id
}

/// 접두사와 고유 식별자를 결합한 실행 이름을 생성합니다 (예: `ecs-test-1a2b3c4d5e6f`).
pub fn unique_name(prefix: &str) -> String {
    if prefix.is_empty() {
        unique_id()
    } else {
        format!("{prefix}-{}", unique_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn stage_order_is_fixed() {
        assert_eq!(
            Stage::ALL,
            [Stage::InitApply, Stage::Validate, Stage::Destroy]
        );
    }

    #[test]
    fn stage_names_roundtrip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!("init-apply".parse::<Stage>().unwrap(), Stage::InitApply);
    }

    #[test]
    fn stage_parse_rejects_unknown() {
        let err = "setup".parse::<Stage>().unwrap_err();
        assert!(err.contains("setup"));
    }

    #[test]
    fn payload_wire_format_has_exactly_three_fields() {
        let payload = NotificationPayload {
            repo_name: "ecs-test-abc".to_owned(),
            tag_to_update: "latest".to_owned(),
            tag_to_add: "v2".to_owned(),
        };
        let value: serde_json::Value = serde_json::from_str(&payload.to_wire().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["ecr_repo_name"], "ecs-test-abc");
        assert_eq!(obj["ecr_tag_to_update"], "latest");
        assert_eq!(obj["ecr_tag_to_add"], "v2");
    }

    #[test]
    fn payload_rejects_unknown_fields() {
        let json = r#"{"ecr_repo_name":"r","ecr_tag_to_update":"a","ecr_tag_to_add":"b","x":1}"#;
        assert!(serde_json::from_str::<NotificationPayload>(json).is_err());
    }

    #[test]
    fn retag_generates_distinct_tags() {
        let a = NotificationPayload::retag("repo", "latest");
        let b = NotificationPayload::retag("repo", "latest");
        assert_eq!(a.tag_to_update, "latest");
        assert_ne!(a.tag_to_add, b.tag_to_add);
    }

    #[test]
    fn unique_id_is_short_lowercase_hex() {
        let id = unique_id();
        assert_eq!(id.len(), UNIQUE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn unique_ids_do_not_collide() {
        let ids: HashSet<String> = (0..1000).map(|_| unique_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn unique_name_uses_prefix() {
        let name = unique_name("ecs-test");
        assert!(name.starts_with("ecs-test-"));
        assert_eq!(name.len(), "ecs-test-".len() + UNIQUE_ID_LEN);
        assert_eq!(unique_name("").len(), UNIQUE_ID_LEN);
    }
}
