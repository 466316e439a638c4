//! Persisted run context.
//!
//! [`RunContext`] is created once by `init_apply` and written to the
//! [`ContextStore`]; `validate` and `destroy` reload it instead of deriving the
//! values again. The unique name doubles as the registry repository name that
//! the provisioning module creates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use tagprobe_core::config::TagprobeConfig;
use tagprobe_core::types::unique_name;

use crate::error::HarnessError;
use crate::store::ContextStore;

/// 고유 실행 이름 항목 키
pub const KEY_RANDOM_NAME: &str = "randomName";
/// 리전 항목 키
pub const KEY_AWS_REGION: &str = "awsRegion";
/// 프로비저닝 설정 항목 키
pub const KEY_TERRAFORM_OPTIONS: &str = "TerraformOptions";

/// Terraform 변수 파일 이름 (실행 디렉토리 내)
const VAR_FILE_NAME: &str = "tagprobe.auto.tfvars.json";

/// 프로비저닝 도구 설정
///
/// 실행 간에 그대로 직렬화되며, `destroy`가 `apply`와 정확히 같은 입력을 사용하도록 보장합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionOptions {
    /// Terraform 모듈 디렉토리 (절대 경로)
    pub terraform_dir: PathBuf,
    /// Terraform 입력 변수
    pub vars: Map<String, Value>,
    /// 프로비저닝 도구에 전달할 환경변수
    pub env_vars: BTreeMap<String, String>,
    /// 변수 파일 경로 (절대 경로)
    pub var_file: PathBuf,
}

impl ProvisionOptions {
    /// 고유 이름과 리전으로 프로비저닝 설정을 구성합니다.
    ///
    /// 변수: `name` = 고유 이름, `tags.TerraformTest` = 고유 이름.
    /// 환경변수: `AWS_DEFAULT_REGION` = 리전.
    pub fn new(
        terraform_dir: impl AsRef<Path>,
        run_dir: impl AsRef<Path>,
        unique_name: &str,
        region: &str,
    ) -> Result<Self, HarnessError> {
        let mut vars = Map::new();
        vars.insert("name".to_owned(), Value::String(unique_name.to_owned()));
        vars.insert("tags".to_owned(), json!({ "TerraformTest": unique_name }));

        let mut env_vars = BTreeMap::new();
        env_vars.insert("AWS_DEFAULT_REGION".to_owned(), region.to_owned());

        Ok(Self {
            terraform_dir: std::path::absolute(terraform_dir.as_ref())?,
            vars,
            env_vars,
            var_file: std::path::absolute(run_dir.as_ref().join(VAR_FILE_NAME))?,
        })
    }
}

/// 한 번의 테스트 실행을 식별하는 컨텍스트
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunContext {
    /// AWS 리전
    pub region: String,
    /// 실행 고유 이름 (레지스트리 저장소 이름)
    pub unique_name: String,
    /// 프로비저닝 설정
    pub provision: ProvisionOptions,
    /// 실행 디렉토리
    pub working_dir: PathBuf,
}

impl RunContext {
    /// 설정에서 새 실행 컨텍스트를 생성합니다. 호출할 때마다 새 고유 이름이 생성됩니다.
    pub fn setup(config: &TagprobeConfig, working_dir: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let working_dir = working_dir.into();
        let region = config.harness.region.clone();
        let unique_name = unique_name(&config.harness.name_prefix);
        let provision =
            ProvisionOptions::new(&config.terraform.dir, &working_dir, &unique_name, &region)?;

        info!(
            unique_name = %unique_name,
            region = %region,
            working_dir = %working_dir.display(),
            "run context created"
        );

        Ok(Self {
            region,
            unique_name,
            provision,
            working_dir,
        })
    }

    /// 레지스트리 저장소 이름
    pub fn repository(&self) -> &str {
        &self.unique_name
    }

    /// 컨텍스트를 저장소에 기록합니다.
    pub async fn save(&self, store: &ContextStore) -> Result<(), HarnessError> {
        store.save_string(KEY_RANDOM_NAME, &self.unique_name).await?;
        store.save_string(KEY_AWS_REGION, &self.region).await?;
        store
            .save_json(KEY_TERRAFORM_OPTIONS, &self.provision)
            .await?;
        Ok(())
    }

    /// 저장소에서 컨텍스트를 복원합니다.
    ///
    /// # Errors
    ///
    /// 항목이 없거나 손상되었으면 해당 키를 담은 `HarnessError::Store`를 반환합니다.
    pub async fn load(store: &ContextStore) -> Result<Self, HarnessError> {
        let unique_name = store.load_string(KEY_RANDOM_NAME).await?;
        let region = store.load_string(KEY_AWS_REGION).await?;
        let provision = store.load_json(KEY_TERRAFORM_OPTIONS).await?;
        Ok(Self {
            region,
            unique_name,
            provision,
            working_dir: store.run_dir().to_path_buf(),
        })
    }
}
