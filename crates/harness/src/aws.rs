//! Thin AWS client backed by the `aws` command line.
//!
//! [`AwsCli`] implements the three service calls the harness needs:
//!
//! | Trait | Command |
//! |---|---|
//! | [`RegistryClient`] | `aws ecr list-images` |
//! | [`TopicClient`] | `aws sns publish` |
//! | [`AccountResolver`] | `aws sts get-caller-identity` |
//!
//! Credentials and profiles come from the usual AWS CLI environment. The CLI
//! follows pagination itself, so one `list-images` call returns the complete
//! listing.

use std::future::Future;

use serde::Deserialize;

use tagprobe_core::types::ImageRef;

use crate::error::HarnessError;
use crate::notification::TopicClient;
use crate::process::{self, CommandSpec};
use crate::registry::RegistryClient;

/// 계정 ID 조회 추상화 (이미지 푸시 스크립트 인자)
pub trait AccountResolver: Send + Sync + 'static {
    /// 현재 자격 증명의 계정 ID를 반환합니다.
    ///
    /// # Errors
    ///
    /// 조회 실패 시 `HarnessError::Identity`를 반환합니다.
    fn account_id(&self, region: &str) -> impl Future<Output = Result<String, HarnessError>> + Send;
}

/// `aws` CLI 클라이언트
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: String,
}

impl AwsCli {
    /// 지정한 실행 파일을 사용하는 클라이언트를 생성합니다.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, region: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(args.iter().copied())
            .args(["--region", region])
    }
}

impl RegistryClient for AwsCli {
    async fn list_images(
        &self,
        region: &str,
        repository: &str,
    ) -> Result<Vec<ImageRef>, HarnessError> {
        let spec = self.command(
            region,
            &[
                "ecr",
                "list-images",
                "--repository-name",
                repository,
                "--output",
                "json",
            ],
        );
        let registry_error = |reason: String| HarnessError::Registry {
            repository: repository.to_owned(),
            region: region.to_owned(),
            reason,
        };
        let output = process::run(&spec)
            .await
            .map_err(|e| registry_error(e.to_string()))?;
        parse_image_listing(&output.stdout).map_err(|e| registry_error(e.to_string()))
    }
}

impl TopicClient for AwsCli {
    async fn publish(
        &self,
        region: &str,
        topic: &str,
        message: &str,
    ) -> Result<String, HarnessError> {
        let spec = self.command(
            region,
            &[
                "sns",
                "publish",
                "--topic-arn",
                topic,
                "--message",
                message,
                "--output",
                "json",
            ],
        );
        let publish_error = |reason: String| HarnessError::Publish {
            topic: topic.to_owned(),
            reason,
        };
        let output = process::run(&spec)
            .await
            .map_err(|e| publish_error(e.to_string()))?;
        parse_message_id(&output.stdout).map_err(|e| publish_error(e.to_string()))
    }
}

impl AccountResolver for AwsCli {
    async fn account_id(&self, region: &str) -> Result<String, HarnessError> {
        let spec = self.command(
            region,
            &[
                "sts",
                "get-caller-identity",
                "--query",
                "Account",
                "--output",
                "text",
            ],
        );
        let output = process::run(&spec)
            .await
            .map_err(|e| HarnessError::Identity {
                region: region.to_owned(),
                reason: e.to_string(),
            })?;
        let account = output.stdout.trim();
        if account.is_empty() || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(HarnessError::Identity {
                region: region.to_owned(),
                reason: format!("unexpected account id '{account}'"),
            });
        }
        Ok(account.to_owned())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    image_ids: Vec<ImageIdentifier>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageIdentifier {
    image_digest: Option<String>,
    image_tag: Option<String>,
}

#[derive(Deserialize)]
struct PublishResponse {
    #[serde(rename = "MessageId")]
    message_id: String,
}

/// `ecr list-images` 출력을 태그가 있는 이미지 목록으로 변환합니다. 응답 순서를 유지합니다.
fn parse_image_listing(stdout: &str) -> Result<Vec<ImageRef>, serde_json::Error> {
    let response: ListImagesResponse = serde_json::from_str(stdout)?;
    Ok(response
        .image_ids
        .into_iter()
        .filter_map(|id| match (id.image_tag, id.image_digest) {
            (Some(tag), Some(digest)) => Some(ImageRef::tagged(tag, digest)),
            _ => None,
        })
        .collect())
}

fn parse_message_id(stdout: &str) -> Result<String, serde_json::Error> {
    let response: PublishResponse = serde_json::from_str(stdout)?;
    Ok(response.message_id)
}
