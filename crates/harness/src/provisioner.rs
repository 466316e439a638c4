//! Infrastructure provisioning adapter.
//!
//! The harness treats provisioning as an all-or-nothing black box: `apply`
//! either creates every resource or fails the stage, and `destroy` removes them.
//! Outputs are read on demand with [`Provisioner::output`] and never cached.
//!
//! [`TerraformCli`] drives the `terraform` binary. Variables are written to a
//! JSON var file inside the run directory and passed with `-var-file`, so
//! `destroy` sees exactly the inputs `apply` used.

use std::future::Future;
use std::path::Path;

use tracing::info;

use crate::context::ProvisionOptions;
use crate::error::HarnessError;
use crate::process::{self, CommandSpec};

/// 프로비저닝 도구 추상화
///
/// 모든 호출은 이 트레이트를 거치므로 테스트에서 모의 구현으로 대체할 수 있습니다.
pub trait Provisioner: Send + Sync + 'static {
    /// 인프라를 생성합니다 (init + apply).
    ///
    /// # Errors
    ///
    /// 실패 시 `HarnessError::Provision`을 반환합니다.
    fn apply(&self, options: &ProvisionOptions)
    -> impl Future<Output = Result<(), HarnessError>> + Send;

    /// 이름이 지정된 출력 값을 조회합니다.
    ///
    /// # Errors
    ///
    /// 출력이 없거나 읽을 수 없으면 `HarnessError::OutputUnavailable`을 반환합니다.
    fn output(
        &self,
        options: &ProvisionOptions,
        name: &str,
    ) -> impl Future<Output = Result<String, HarnessError>> + Send;

    /// 인프라를 제거합니다.
    ///
    /// # Errors
    ///
    /// 실패 시 `HarnessError::Provision`을 반환합니다.
    fn destroy(
        &self,
        options: &ProvisionOptions,
    ) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// `terraform` CLI 기반 프로비저너
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: String,
}

impl TerraformCli {
    /// 지정한 실행 파일을 사용하는 프로비저너를 생성합니다.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, options: &ProvisionOptions, args: &[&str]) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .arg(format!("-chdir={}", options.terraform_dir.display()))
            .args(args.iter().copied())
            .env("TF_IN_AUTOMATION", "1")
            .envs(options.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    fn var_file_arg(options: &ProvisionOptions) -> String {
        format!("-var-file={}", options.var_file.display())
    }

    async fn write_var_file(options: &ProvisionOptions) -> Result<(), HarnessError> {
        if let Some(parent) = options.var_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&options.vars)?;
        tokio::fs::write(&options.var_file, body).await?;
        Ok(())
    }

    async fn run_step(
        &self,
        operation: &str,
        options: &ProvisionOptions,
        args: &[&str],
    ) -> Result<(), HarnessError> {
        process::run(&self.command(options, args))
            .await
            .map(|_| ())
            .map_err(|e| provision_error(operation, &options.terraform_dir, e))
    }
}

impl Provisioner for TerraformCli {
    async fn apply(&self, options: &ProvisionOptions) -> Result<(), HarnessError> {
        Self::write_var_file(options)
            .await
            .map_err(|e| provision_error("apply", &options.terraform_dir, e))?;

        self.run_step("init", options, &["init", "-input=false"])
            .await?;

        let var_file = Self::var_file_arg(options);
        self.run_step(
            "apply",
            options,
            &["apply", "-auto-approve", "-input=false", &var_file],
        )
        .await?;

        info!(dir = %options.terraform_dir.display(), "infrastructure applied");
        Ok(())
    }

    async fn output(&self, options: &ProvisionOptions, name: &str) -> Result<String, HarnessError> {
        let spec = self.command(options, &["output", "-json", name]);
        let output = process::run(&spec)
            .await
            .map_err(|e| HarnessError::OutputUnavailable {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;
        parse_output_value(name, &output.stdout)
    }

    async fn destroy(&self, options: &ProvisionOptions) -> Result<(), HarnessError> {
        // apply 이전에 실패한 실행에서도 destroy가 가능하도록 변수 파일을 다시 씀
        Self::write_var_file(options)
            .await
            .map_err(|e| provision_error("destroy", &options.terraform_dir, e))?;

        let var_file = Self::var_file_arg(options);
        self.run_step(
            "destroy",
            options,
            &["destroy", "-auto-approve", "-input=false", &var_file],
        )
        .await?;

        info!(dir = %options.terraform_dir.display(), "infrastructure destroyed");
        Ok(())
    }
}

fn provision_error(operation: &str, dir: &Path, err: HarnessError) -> HarnessError {
    HarnessError::Provision {
        operation: operation.to_owned(),
        dir: dir.display().to_string(),
        reason: err.to_string(),
    }
}

/// `terraform output -json <name>` 결과를 문자열로 변환합니다.
///
/// 문자열 출력은 그대로, 그 밖의 값은 JSON 텍스트로 반환합니다.
fn parse_output_value(name: &str, stdout: &str) -> Result<String, HarnessError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|e| HarnessError::OutputUnavailable {
            name: name.to_owned(),
            reason: format!("unparseable output: {e}"),
        })?;
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::String(_) | serde_json::Value::Null => {
            Err(HarnessError::OutputUnavailable {
                name: name.to_owned(),
                reason: "output is empty".to_owned(),
            })
        }
        other => Ok(other.to_string()),
    }
}
