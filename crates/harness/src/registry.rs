//! Registry poller.
//!
//! [`RegistryPoller::resolve_digest`] observes eventually consistent registry
//! state. Each attempt fetches the complete listing of a repository and scans it
//! client-side; the first entry whose tag equals the target wins. Only
//! "tag not found yet" is retried. Any error from the listing call itself is an
//! environment failure and ends the poll immediately.
//!
//! # Attempt budget
//!
//! | `max_attempts` | listing calls | sleeps |
//! |---|---|---|
//! | 0 | 1 | 0 |
//! | N | at most N | at most N-1 |

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use tagprobe_core::retry::{RetryPolicy, retry_with_fixed_delay};
use tagprobe_core::types::ImageRef;

use crate::error::HarnessError;

/// 레지스트리 읽기 API 추상화
pub trait RegistryClient: Send + Sync + 'static {
    /// 저장소의 모든 태그/다이제스트 쌍을 나열합니다.
    ///
    /// # Errors
    ///
    /// API 호출 실패 시 `HarnessError::Registry`를 반환합니다.
    fn list_images(
        &self,
        region: &str,
        repository: &str,
    ) -> impl Future<Output = Result<Vec<ImageRef>, HarnessError>> + Send;
}

/// 목록에서 태그의 다이제스트를 찾습니다. 중복 태그는 목록 순서상 첫 항목이 우선합니다.
pub fn find_digest<'a>(images: &'a [ImageRef], tag: &str) -> Option<&'a str> {
    images
        .iter()
        .find(|image| image.tag.as_deref() == Some(tag))
        .map(|image| image.digest.as_str())
}

/// 태그가 다이제스트로 해석될 때까지 레지스트리를 폴링합니다.
#[derive(Debug, Clone)]
pub struct RegistryPoller<R> {
    client: Arc<R>,
    region: String,
}

impl<R: RegistryClient> RegistryPoller<R> {
    /// 리전에 고정된 폴러를 생성합니다.
    pub fn new(client: Arc<R>, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// 내부 클라이언트 참조
    pub fn client(&self) -> &R {
        &self.client
    }

    /// 태그를 다이제스트로 해석합니다.
    ///
    /// # Errors
    ///
    /// - `HarnessError::TagNotFound`: 모든 시도에서 태그가 보이지 않음 (태그와 저장소 이름 포함)
    /// - `HarnessError::Registry`: 목록 조회 자체가 실패함 (재시도하지 않음)
    pub async fn resolve_digest(
        &self,
        repository: &str,
        tag: &str,
        policy: &RetryPolicy,
    ) -> Result<String, HarnessError> {
        let operation = format!("resolve {repository}:{tag}");
        retry_with_fixed_delay(policy, &operation, HarnessError::is_transient, |attempt| async move {
            let images = self.client.list_images(&self.region, repository).await?;
            debug!(
                repository,
                tag,
                attempt,
                images = images.len(),
                "registry listing fetched"
            );
            match find_digest(&images, tag) {
                Some(digest) => Ok(digest.to_owned()),
                None => Err(HarnessError::TagNotFound {
                    tag: tag.to_owned(),
                    repository: repository.to_owned(),
                    attempts: attempt,
                }),
            }
        })
        .await
    }
}
