//! Notification publishing.
//!
//! Triggers the system under test by publishing a [`NotificationPayload`] to the
//! topic created during provisioning. Publish failures are fatal to the
//! validation attempt and are never retried.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use tagprobe_core::types::NotificationPayload;

use crate::error::HarnessError;

/// 메시지 토픽 클라이언트 추상화
pub trait TopicClient: Send + Sync + 'static {
    /// 메시지를 토픽에 발행하고 메시지 ID를 반환합니다.
    ///
    /// # Errors
    ///
    /// 발행 실패 시 `HarnessError::Publish`를 반환합니다.
    fn publish(
        &self,
        region: &str,
        topic: &str,
        message: &str,
    ) -> impl Future<Output = Result<String, HarnessError>> + Send;
}

/// 재태깅 요청 발행기
#[derive(Debug, Clone)]
pub struct NotificationPublisher<T> {
    client: Arc<T>,
    region: String,
}

impl<T: TopicClient> NotificationPublisher<T> {
    /// 리전에 고정된 발행기를 생성합니다.
    pub fn new(client: Arc<T>, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// 페이로드를 와이어 형식으로 직렬화해 발행합니다.
    pub async fn publish(
        &self,
        payload: &NotificationPayload,
        topic: &str,
    ) -> Result<String, HarnessError> {
        let message = payload.to_wire()?;
        let message_id = self.client.publish(&self.region, topic, &message).await?;
        info!(
            topic,
            message_id = %message_id,
            repository = %payload.repo_name,
            tag_to_update = %payload.tag_to_update,
            tag_to_add = %payload.tag_to_add,
            "notification published"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// 발행된 메시지를 기록하는 mock 토픽 클라이언트
    #[derive(Default)]
    pub struct MockTopicClient {
        /// (region, topic, message) 기록
        pub published: Mutex<Vec<(String, String, String)>>,
        /// 발행 실패를 시뮬레이션할지 여부
        pub fail: bool,
    }

    impl MockTopicClient {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl TopicClient for MockTopicClient {
        async fn publish(
            &self,
            region: &str,
            topic: &str,
            message: &str,
        ) -> Result<String, HarnessError> {
            if self.fail {
                return Err(HarnessError::Publish {
                    topic: topic.to_owned(),
                    reason: "mock failure".to_owned(),
                });
            }
            let mut published = self.published.lock().unwrap_or_else(|e| e.into_inner());
            published.push((region.to_owned(), topic.to_owned(), message.to_owned()));
            Ok(format!("msg-{}", published.len()))
        }
    }
}
