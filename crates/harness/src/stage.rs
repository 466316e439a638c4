//! Idempotent stage execution.
//!
//! [`StageRunner::run_stage`] runs a stage body at most once per run directory.
//! A successful body sets the stage's completion marker; later calls see the
//! marker and skip the body unless the stage is forced. A failing body leaves
//! the marker untouched so the stage runs again next time.
//!
//! A stage can also be skipped for one invocation by setting `SKIP_<stage>`
//! (for example `SKIP_destroy=true`) in the environment. The environment is
//! read once by [`StageRunner::with_env_skips`]; skips never touch the marker.

use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use tagprobe_core::types::Stage;

use crate::error::HarnessError;
use crate::store::ContextStore;

/// 스테이지를 건너뛴 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 완료 마커가 이미 있음
    AlreadyComplete,
    /// `SKIP_<stage>` 환경변수로 건너뜀
    SkippedByEnv,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyComplete => f.write_str("already complete"),
            Self::SkippedByEnv => f.write_str("skipped by environment"),
        }
    }
}

/// 성공한 `run_stage` 호출의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// 본문이 실행되어 성공함
    Executed,
    /// 본문이 실행되지 않음
    Skipped(SkipReason),
}

/// 스테이지 하나의 현재 상태 (마커 + 환경변수)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageState {
    /// 스테이지
    pub stage: Stage,
    /// 완료 마커 존재 여부
    pub complete: bool,
    /// `SKIP_<stage>` 설정 여부
    pub skip_env: bool,
}

/// 스테이지 실행기
#[derive(Debug, Clone)]
pub struct StageRunner {
    store: ContextStore,
    forced: HashSet<Stage>,
    skipped: HashSet<Stage>,
}

impl StageRunner {
    /// 저장소의 마커를 사용하는 실행기를 생성합니다.
    pub fn new(store: ContextStore) -> Self {
        Self {
            store,
            forced: HashSet::new(),
            skipped: HashSet::new(),
        }
    }

    /// 마커와 관계없이 실행할 스테이지를 지정합니다.
    pub fn force(mut self, stage: Stage) -> Self {
        self.forced.insert(stage);
        self
    }

    /// 모든 스테이지를 강제 실행하도록 설정합니다.
    pub fn force_all(mut self) -> Self {
        self.forced.extend(Stage::ALL);
        self
    }

    /// 강제/건너뛰기 설정을 유지한 채 저장소를 교체합니다.
    pub(crate) fn with_store(mut self, store: ContextStore) -> Self {
        self.store = store;
        self
    }

    /// 이번 실행에서 건너뛸 스테이지를 지정합니다. 마커는 변경되지 않습니다.
    pub fn skip(mut self, stage: Stage) -> Self {
        self.skipped.insert(stage);
        self
    }

    /// 프로세스 환경변수 `SKIP_<stage>`에서 건너뛸 스테이지를 읽습니다.
    pub fn with_env_skips(self) -> Self {
        self.with_skips_from(|name| std::env::var(name).ok())
    }

    fn with_skips_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for stage in Stage::ALL {
            if lookup(&skip_env_var(stage)).is_some_and(|v| !v.is_empty()) {
                self.skipped.insert(stage);
            }
        }
        self
    }

    /// 저장소 참조
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// 스테이지 본문을 실행합니다.
    ///
    /// # Errors
    ///
    /// 본문이 반환한 에러를 그대로 전파합니다. 이 경우 마커는 기록되지 않습니다.
    pub async fn run_stage<F, Fut>(&self, stage: Stage, body: F) -> Result<StageOutcome, HarnessError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), HarnessError>>,
    {
        if self.skipped.contains(&stage) {
            info!(stage = %stage, "stage skipped by environment");
            return Ok(StageOutcome::Skipped(SkipReason::SkippedByEnv));
        }

        let forced = self.forced.contains(&stage);
        if !forced && self.store.is_complete(stage).await? {
            info!(stage = %stage, "stage already complete, skipping");
            return Ok(StageOutcome::Skipped(SkipReason::AlreadyComplete));
        }

        info!(stage = %stage, forced, "stage started");
        let started = Instant::now();

        if let Err(e) = body().await {
            warn!(
                stage = %stage,
                error = %e,
                class = %e.class(),
                elapsed_ms = elapsed_ms(started),
                "stage failed"
            );
            return Err(e);
        }

        self.store.mark_complete(stage).await?;
        info!(
            stage = %stage,
            elapsed_ms = elapsed_ms(started),
            "stage completed"
        );
        Ok(StageOutcome::Executed)
    }

    /// 모든 스테이지의 현재 상태를 실행 순서대로 반환합니다.
    pub async fn status(&self) -> Result<Vec<StageState>, HarnessError> {
        let mut states = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            states.push(StageState {
                stage,
                complete: self.store.is_complete(stage).await?,
                skip_env: self.skipped.contains(&stage),
            });
        }
        Ok(states)
    }

    /// 스테이지 마커를 지웁니다. 마커가 있었으면 `true`를 반환합니다.
    pub async fn clear(&self, stage: Stage) -> Result<bool, HarnessError> {
        self.store.clear_marker(stage).await
    }

    /// 모든 스테이지 마커를 지웁니다. 지운 스테이지 목록을 반환합니다.
    pub async fn clear_all(&self) -> Result<Vec<Stage>, HarnessError> {
        let mut cleared = Vec::new();
        for stage in Stage::ALL {
            if self.clear(stage).await? {
                cleared.push(stage);
            }
        }
        Ok(cleared)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// `SKIP_<stage>` 환경변수 이름
pub fn skip_env_var(stage: Stage) -> String {
    format!("SKIP_{}", stage.as_str())
}
