//! Lifecycle orchestration.
//!
//! [`Harness`] wires the stage runner, the provisioning and image adapters and
//! the registered validators into the fixed stage order:
//!
//! ```text
//! init_apply ──▶ validate ──▶ destroy
//!     │  (skipped if init_apply failed)  ▲
//!     └──────────────────────────────────┘ always
//! ```
//!
//! Every stage outcome is recorded in a [`RunReport`]. The first failing stage
//! decides the run's failure class; a `destroy` failure after an earlier
//! failure is logged and recorded but does not replace it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tagprobe_core::config::TagprobeConfig;
use tagprobe_core::types::Stage;

use crate::aws::AccountResolver;
use crate::context::RunContext;
use crate::error::{ErrorClass, HarnessError};
use crate::image::ImagePublisher;
use crate::provisioner::Provisioner;
use crate::stage::{SkipReason, StageOutcome, StageRunner};
use crate::store::ContextStore;
use crate::validator::{DynValidator, ValidatorReport, run_validators};

/// 스테이지 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// 실행되어 성공함
    Executed,
    /// 건너뜀
    Skipped {
        /// 건너뛴 이유
        reason: SkipReason,
    },
    /// 실행되었으나 실패함
    Failed {
        /// 에러 분류
        class: ErrorClass,
        /// 에러 메시지
        message: String,
    },
    /// 앞선 스테이지 실패로 실행하지 않음
    NotRun,
}

/// 스테이지 하나의 보고서
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// 스테이지
    pub stage: Stage,
    /// 결과
    #[serde(flatten)]
    pub status: StageStatus,
}

/// 실행 전체 보고서
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// 실행 디렉토리
    pub run_dir: PathBuf,
    /// 스테이지별 결과 (실행 순서)
    pub stages: Vec<StageReport>,
    /// 검증기별 결과 (등록 순서)
    pub validators: Vec<ValidatorReport>,
}

impl RunReport {
    /// 실패한 스테이지와 검증기가 없으면 `true`
    pub fn passed(&self) -> bool {
        self.failure_class().is_none() && self.validators.iter().all(|v| v.passed)
    }

    /// 처음 실패한 스테이지의 에러 분류
    pub fn failure_class(&self) -> Option<ErrorClass> {
        self.stages.iter().find_map(|s| match &s.status {
            StageStatus::Failed { class, .. } => Some(*class),
            _ => None,
        })
    }

    /// 실패한 검증기 수
    pub fn failed_validators(&self) -> usize {
        self.validators.iter().filter(|v| !v.passed).count()
    }

    fn record(&mut self, stage: Stage, result: &Result<StageOutcome, HarnessError>) {
        let status = match result {
            Ok(StageOutcome::Executed) => StageStatus::Executed,
            Ok(StageOutcome::Skipped(reason)) => StageStatus::Skipped { reason: *reason },
            Err(e) => StageStatus::Failed {
                class: e.class(),
                message: e.to_string(),
            },
        };
        self.stages.push(StageReport { stage, status });
    }
}

/// 테스트 생명주기 오케스트레이터
pub struct Harness<P, I, A> {
    config: TagprobeConfig,
    runner: StageRunner,
    provisioner: Arc<P>,
    images: Arc<I>,
    identity: Arc<A>,
    validators: Vec<Arc<dyn DynValidator>>,
    cancel: CancellationToken,
}

impl<P, I, A> Harness<P, I, A>
where
    P: Provisioner,
    I: ImagePublisher,
    A: AccountResolver,
{
    /// 설정의 실행 디렉토리(`<working_dir>/<test_name>`)를 사용하는 하네스를 생성합니다.
    pub fn new(config: TagprobeConfig, provisioner: Arc<P>, images: Arc<I>, identity: Arc<A>) -> Self {
        let runner = StageRunner::new(ContextStore::new(config.harness.run_dir()));
        Self {
            config,
            runner,
            provisioner,
            images,
            identity,
            validators: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// 실행 디렉토리를 지정합니다.
    pub fn with_run_dir(mut self, run_dir: impl Into<PathBuf>) -> Self {
        self.runner = self.runner.with_store(ContextStore::new(run_dir));
        self
    }

    /// 검증기를 등록합니다. 보고서는 등록 순서를 따릅니다.
    pub fn with_validator(mut self, validator: Arc<dyn DynValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// 마커와 관계없이 스테이지를 실행하도록 설정합니다.
    pub fn force(mut self, stage: Stage) -> Self {
        self.runner = self.runner.force(stage);
        self
    }

    /// 모든 스테이지를 강제 실행하도록 설정합니다.
    pub fn force_all(mut self) -> Self {
        self.runner = self.runner.force_all();
        self
    }

    /// `SKIP_<stage>` 환경변수로 지정된 스테이지를 건너뜁니다.
    pub fn with_env_skips(mut self) -> Self {
        self.runner = self.runner.with_env_skips();
        self
    }

    /// 외부에서 취소할 수 있는 토큰을 지정합니다.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 스테이지 실행기 참조
    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }

    /// 전체 생명주기를 실행합니다.
    ///
    /// `destroy`는 앞선 스테이지의 성공 여부와 관계없이 항상 실행됩니다.
    pub async fn run(&self) -> RunReport {
        let mut report = self.new_report();

        let init = self.init_apply().await;
        report.record(Stage::InitApply, &init);

        if init.is_ok() {
            let validate = self.validate(&mut report.validators).await;
            report.record(Stage::Validate, &validate);
        } else {
            warn!("init_apply failed, skipping validate");
            report.stages.push(StageReport {
                stage: Stage::Validate,
                status: StageStatus::NotRun,
            });
        }

        let earlier_failure = report.failure_class();
        let destroy = self.destroy().await;
        if let (Err(e), Some(class)) = (&destroy, earlier_failure) {
            error!(
                error = %e,
                earlier_class = %class,
                "destroy failed after an earlier failure, resources may be left behind"
            );
        }
        report.record(Stage::Destroy, &destroy);

        info!(
            passed = report.passed(),
            failed_validators = report.failed_validators(),
            "run finished"
        );
        report
    }

    /// 스테이지 하나만 실행합니다.
    pub async fn run_stage(&self, stage: Stage) -> RunReport {
        let mut report = self.new_report();
        let result = match stage {
            Stage::InitApply => self.init_apply().await,
            Stage::Validate => self.validate(&mut report.validators).await,
            Stage::Destroy => self.destroy().await,
        };
        report.record(stage, &result);
        report
    }

    fn new_report(&self) -> RunReport {
        RunReport {
            run_dir: self.runner.store().run_dir().to_path_buf(),
            ..Default::default()
        }
    }

    async fn init_apply(&self) -> Result<StageOutcome, HarnessError> {
        self.runner
            .run_stage(Stage::InitApply, || async {
                let store = self.runner.store();
                let ctx = RunContext::setup(&self.config, store.run_dir())?;
                // apply가 중간에 실패해도 destroy가 같은 설정을 쓰도록 먼저 저장
                ctx.save(store).await?;

                self.provisioner.apply(&ctx.provision).await?;

                let account_id = self.identity.account_id(&ctx.region).await?;
                self.images
                    .push(
                        &account_id,
                        &ctx.region,
                        ctx.repository(),
                        &self.config.image.baseline_tag,
                    )
                    .await
            })
            .await
    }

    async fn validate(
        &self,
        reports: &mut Vec<ValidatorReport>,
    ) -> Result<StageOutcome, HarnessError> {
        self.runner
            .run_stage(Stage::Validate, move || async move {
                if self.cancel.is_cancelled() {
                    return Err(HarnessError::Cancelled {
                        stage: Stage::Validate,
                    });
                }
                let ctx = Arc::new(RunContext::load(self.runner.store()).await?);
                *reports = run_validators(&self.validators, ctx, &self.cancel).await;

                if self.cancel.is_cancelled() {
                    return Err(HarnessError::Cancelled {
                        stage: Stage::Validate,
                    });
                }
                let failures: Vec<ErrorClass> = reports
                    .iter()
                    .filter_map(|r| r.failure.as_ref().map(|f| f.class))
                    .collect();
                let class = failures.iter().copied().max_by_key(|c| c.severity());
                match class {
                    Some(class) => Err(HarnessError::ValidationFailed {
                        failed: failures.len(),
                        total: reports.len(),
                        class,
                    }),
                    None => Ok(()),
                }
            })
            .await
    }

    async fn destroy(&self) -> Result<StageOutcome, HarnessError> {
        self.runner
            .run_stage(Stage::Destroy, || async {
                let ctx = RunContext::load(self.runner.store()).await?;
                self.provisioner.destroy(&ctx.provision).await
            })
            .await
    }
}
