//! Baseline image publishing.
//!
//! `init_apply` seeds the run's repository with a known image so validators have
//! something to re-tag. The push itself is delegated to an external script
//! invoked as `push-image.sh <accountId> <region> <repoName> <tag>`.

use std::future::Future;

use tracing::info;

use crate::error::HarnessError;
use crate::process::{self, CommandSpec};

/// 기준 이미지 푸시 추상화
pub trait ImagePublisher: Send + Sync + 'static {
    /// 이미지를 `repository:tag`로 푸시합니다.
    ///
    /// # Errors
    ///
    /// 스크립트가 실행되지 않거나 0이 아닌 코드로 종료하면 `HarnessError::ImagePush`를 반환합니다.
    /// 재시도하지 않습니다.
    fn push(
        &self,
        account_id: &str,
        region: &str,
        repository: &str,
        tag: &str,
    ) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// 외부 스크립트로 이미지를 푸시하는 구현
#[derive(Debug, Clone)]
pub struct ScriptImagePublisher {
    script: String,
}

impl ScriptImagePublisher {
    /// 스크립트 경로로 퍼블리셔를 생성합니다.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl ImagePublisher for ScriptImagePublisher {
    async fn push(
        &self,
        account_id: &str,
        region: &str,
        repository: &str,
        tag: &str,
    ) -> Result<(), HarnessError> {
        let spec = CommandSpec::new(&self.script).args([account_id, region, repository, tag]);

        process::run(&spec)
            .await
            .map_err(|e| HarnessError::ImagePush {
                repository: repository.to_owned(),
                tag: tag.to_owned(),
                region: region.to_owned(),
                reason: e.to_string(),
            })?;

        info!(repository, tag, region, "baseline image pushed");
        Ok(())
    }
}
