//! Validators and their concurrent runner.
//!
//! A [`Validator`] is a named assertion over the persisted [`RunContext`].
//! [`run_validators`] spawns one task per validator, lets them run concurrently
//! against a shared read-only context, and collects one [`ValidatorReport`] per
//! validator in registration order.
//!
//! [`TaggingValidator`] is the re-tag check:
//!
//! 1. resolve the baseline tag's digest with the initial budget
//! 2. publish a payload asking for a new unique tag on that image
//! 3. resolve the new tag with the settle budget
//! 4. require both digests to be equal

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tagprobe_core::retry::RetryPolicy;
use tagprobe_core::types::{NotificationPayload, Stage};

use crate::context::RunContext;
use crate::error::{ErrorClass, HarnessError};
use crate::notification::{NotificationPublisher, TopicClient};
use crate::provisioner::Provisioner;
use crate::registry::{RegistryClient, RegistryPoller};

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 검증기
pub trait Validator: Send + Sync + 'static {
    /// 보고서와 로그에 사용되는 이름
    fn name(&self) -> &str;

    /// 실행 컨텍스트에 대해 검증을 수행합니다.
    fn validate(&self, ctx: &RunContext) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// dyn-compatible 검증기 trait
///
/// `Validator`는 RPITIT를 사용하므로 `dyn Validator`가 불가합니다.
/// `DynValidator`는 `BoxFuture`를 반환하여 `Vec<Arc<dyn DynValidator>>`로
/// 검증기를 등록할 수 있게 합니다.
pub trait DynValidator: Send + Sync {
    /// 검증기 이름
    fn name(&self) -> &str;

    /// 검증을 수행합니다.
    fn validate<'a>(&'a self, ctx: &'a RunContext) -> BoxFuture<'a, Result<(), HarnessError>>;
}

/// Validator를 구현한 타입은 자동으로 DynValidator도 구현됩니다.
impl<T: Validator> DynValidator for T {
    fn name(&self) -> &str {
        Validator::name(self)
    }

    fn validate<'a>(&'a self, ctx: &'a RunContext) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(Validator::validate(self, ctx))
    }
}

/// 검증 실패 원인
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// 에러 분류
    pub class: ErrorClass,
    /// 에러 메시지
    pub message: String,
}

impl From<&HarnessError> for FailureReport {
    fn from(err: &HarnessError) -> Self {
        Self {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

/// 검증기 하나의 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorReport {
    /// 검증기 이름
    pub name: String,
    /// 통과 여부
    pub passed: bool,
    /// 실패 원인 (통과 시 `None`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
}

impl ValidatorReport {
    fn from_result(name: String, result: &Result<(), HarnessError>, elapsed_ms: u64) -> Self {
        Self {
            name,
            passed: result.is_ok(),
            failure: result.as_ref().err().map(FailureReport::from),
            elapsed_ms,
        }
    }
}

/// 모든 검증기를 동시에 실행하고 등록 순서대로 보고서를 반환합니다.
///
/// 취소 토큰이 취소되면 진행 중인 검증기는 `Cancelled`로 보고됩니다.
/// 검증기 태스크가 패닉하면 `ValidatorAborted`로 보고됩니다.
pub async fn run_validators(
    validators: &[Arc<dyn DynValidator>],
    ctx: Arc<RunContext>,
    cancel: &CancellationToken,
) -> Vec<ValidatorReport> {
    let handles: Vec<_> = validators
        .iter()
        .map(|validator| {
            let validator = Arc::clone(validator);
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                info!(validator = validator.name(), "validator started");
                let result = tokio::select! {
                    result = validator.validate(&ctx) => result,
                    () = cancel.cancelled() => Err(HarnessError::Cancelled { stage: Stage::Validate }),
                };
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                match &result {
                    Ok(()) => info!(validator = validator.name(), elapsed_ms, "validator passed"),
                    Err(e) => warn!(
                        validator = validator.name(),
                        class = %e.class(),
                        error = %e,
                        elapsed_ms,
                        "validator failed"
                    ),
                }
                ValidatorReport::from_result(validator.name().to_owned(), &result, elapsed_ms)
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (validator, handle) in validators.iter().zip(handles) {
        let report = match handle.await {
            Ok(report) => report,
            Err(e) => {
                let err = HarnessError::ValidatorAborted {
                    name: validator.name().to_owned(),
                    reason: e.to_string(),
                };
                warn!(validator = validator.name(), error = %err, "validator task aborted");
                ValidatorReport::from_result(validator.name().to_owned(), &Err(err), 0)
            }
        };
        reports.push(report);
    }
    reports
}

/// 알림으로 추가된 태그가 기준 이미지를 가리키는지 검증합니다.
pub struct TaggingValidator<R, T, P> {
    registry: Arc<R>,
    topics: Arc<T>,
    provisioner: Arc<P>,
    topic_output: String,
    baseline_tag: String,
    initial_policy: RetryPolicy,
    settle_policy: RetryPolicy,
}

impl<R, T, P> TaggingValidator<R, T, P>
where
    R: RegistryClient,
    T: TopicClient,
    P: Provisioner,
{
    /// 검증기 이름
    pub const NAME: &'static str = "ValidateTagging";

    /// 새 검증기를 생성합니다. 기본 정책은 재시도 없음입니다.
    pub fn new(
        registry: Arc<R>,
        topics: Arc<T>,
        provisioner: Arc<P>,
        topic_output: impl Into<String>,
        baseline_tag: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            topics,
            provisioner,
            topic_output: topic_output.into(),
            baseline_tag: baseline_tag.into(),
            initial_policy: RetryPolicy::once(),
            settle_policy: RetryPolicy::once(),
        }
    }

    /// 기준 태그 조회 정책을 설정합니다.
    pub fn with_initial_policy(mut self, policy: RetryPolicy) -> Self {
        self.initial_policy = policy;
        self
    }

    /// 새 태그 조회 정책을 설정합니다.
    pub fn with_settle_policy(mut self, policy: RetryPolicy) -> Self {
        self.settle_policy = policy;
        self
    }
}

impl<R, T, P> Validator for TaggingValidator<R, T, P>
where
    R: RegistryClient,
    T: TopicClient,
    P: Provisioner,
{
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn validate(&self, ctx: &RunContext) -> Result<(), HarnessError> {
        let repository = ctx.repository();
        let poller = RegistryPoller::new(Arc::clone(&self.registry), &ctx.region);

        let expected = poller
            .resolve_digest(repository, &self.baseline_tag, &self.initial_policy)
            .await?;
        info!(
            repository,
            tag = %self.baseline_tag,
            digest = %expected,
            "baseline digest resolved"
        );

        // 토픽 ARN은 캐시하지 않고 매번 조회
        let topic = self
            .provisioner
            .output(&ctx.provision, &self.topic_output)
            .await?;

        let payload = NotificationPayload::retag(repository, &self.baseline_tag);
        NotificationPublisher::new(Arc::clone(&self.topics), &ctx.region)
            .publish(&payload, &topic)
            .await?;

        let actual = poller
            .resolve_digest(repository, &payload.tag_to_add, &self.settle_policy)
            .await?;

        if actual != expected {
            return Err(HarnessError::DigestMismatch {
                tag: payload.tag_to_add,
                expected,
                actual,
            });
        }

        info!(
            repository,
            tag = %payload.tag_to_add,
            digest = %actual,
            "added tag points at baseline image"
        );
        Ok(())
    }
}
