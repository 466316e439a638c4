//! Run-directory key/value store.
//!
//! [`ContextStore`] persists named entries under a run directory so a later
//! stage (possibly in another process) can resume from what an earlier stage
//! produced. It also owns the stage completion markers.
//!
//! # Layout
//!
//! ```text
//! <run_dir>/
//! ├── .test-data/
//! │   ├── randomName.json
//! │   ├── awsRegion.json
//! │   └── TerraformOptions.json
//! └── .stages/
//!     ├── init_apply.done
//!     └── validate.done
//! ```
//!
//! Writes go to a temporary file first and are then renamed into place, so a
//! reader never sees a half-written entry.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use tagprobe_core::error::StoreError;
use tagprobe_core::types::Stage;

use crate::error::HarnessError;

/// 데이터 항목 디렉토리 이름
const DATA_DIR: &str = ".test-data";
/// 스테이지 마커 디렉토리 이름
const STAGES_DIR: &str = ".stages";

/// 실행 디렉토리 범위의 키/값 저장소
#[derive(Debug, Clone)]
pub struct ContextStore {
    run_dir: PathBuf,
}

impl ContextStore {
    /// 실행 디렉토리에 대한 저장소를 생성합니다. 디렉토리는 첫 쓰기 시 생성됩니다.
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    /// 실행 디렉토리 경로
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// 문자열 항목을 저장합니다.
    pub async fn save_string(&self, key: &str, value: &str) -> Result<(), HarnessError> {
        self.save_json(key, &value).await
    }

    /// 문자열 항목을 읽습니다.
    pub async fn load_string(&self, key: &str) -> Result<String, HarnessError> {
        self.load_json(key).await
    }

    /// 직렬화 가능한 값을 JSON 항목으로 저장합니다.
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), HarnessError> {
        let path = self.entry_path(key)?;
        let body = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &body).await?;
        debug!(key, path = %path.display(), "saved context entry");
        Ok(())
    }

    /// JSON 항목을 읽어 역직렬화합니다.
    ///
    /// # Errors
    ///
    /// - `StoreError::Missing`: 항목 파일이 없음
    /// - `StoreError::Corrupt`: 파일 내용이 기대한 형식이 아님
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, HarnessError> {
        let path = self.entry_path(key)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    key: key.to_owned(),
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&body).map_err(|e| {
            StoreError::Corrupt {
                key: key.to_owned(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// 스테이지 완료 마커를 기록합니다.
    pub async fn mark_complete(&self, stage: Stage) -> Result<(), HarnessError> {
        let path = self.marker_path(stage);
        write_atomic(&path, stage.as_str().as_bytes()).await?;
        debug!(stage = %stage, "stage marker set");
        Ok(())
    }

    /// 스테이지 완료 마커가 있는지 확인합니다.
    pub async fn is_complete(&self, stage: Stage) -> Result<bool, HarnessError> {
        Ok(tokio::fs::try_exists(self.marker_path(stage)).await?)
    }

    /// 스테이지 완료 마커를 지웁니다. 마커가 없으면 아무 일도 하지 않습니다.
    pub async fn clear_marker(&self, stage: Stage) -> Result<bool, HarnessError> {
        match tokio::fs::remove_file(self.marker_path(stage)).await {
            Ok(()) => {
                debug!(stage = %stage, "stage marker cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, HarnessError> {
        validate_key(key)?;
        Ok(self.run_dir.join(DATA_DIR).join(format!("{key}.json")))
    }

    fn marker_path(&self, stage: Stage) -> PathBuf {
        self.run_dir
            .join(STAGES_DIR)
            .join(format!("{}.done", stage.as_str()))
    }
}

/// 키는 파일 이름으로 사용되므로 경로 문자를 허용하지 않습니다.
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(StoreError::InvalidKey {
            key: key.to_owned(),
        });
    }
    Ok(())
}

async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await
}
