//! 설정 관리 — tagprobe.toml 파싱 및 런타임 설정
//!
//! [`TagprobeConfig`]는 하네스 실행에 필요한 모든 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TAGPROBE_HARNESS_REGION=us-east-1` 형식)
//! 3. 설정 파일 (`tagprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tagprobe_core::error::TagprobeError> {
//! use tagprobe_core::config::TagprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TagprobeConfig::load("tagprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TagprobeConfig::parse("[harness]\nregion = \"us-east-1\"")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TagprobeError};
use crate::retry::RetryPolicy;

/// tagprobe 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagprobeConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 하네스 실행 설정
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Terraform 프로비저닝 설정
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// 기준 이미지 푸시 설정
    #[serde(default)]
    pub image: ImageConfig,
    /// 레지스트리 폴링 설정
    #[serde(default)]
    pub poller: PollerConfig,
    /// AWS CLI 설정
    #[serde(default)]
    pub aws: AwsConfig,
}

impl TagprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TagprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TagprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TagprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TagprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TagprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            TagprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TAGPROBE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TAGPROBE_GENERAL_LOG_LEVEL");
        override_parsed(&mut self.general.log_format, "TAGPROBE_GENERAL_LOG_FORMAT");

        // Harness
        override_string(&mut self.harness.test_name, "TAGPROBE_HARNESS_TEST_NAME");
        override_string(
            &mut self.harness.working_dir,
            "TAGPROBE_HARNESS_WORKING_DIR",
        );
        override_string(
            &mut self.harness.name_prefix,
            "TAGPROBE_HARNESS_NAME_PREFIX",
        );
        override_string(&mut self.harness.region, "TAGPROBE_HARNESS_REGION");

        // Terraform
        override_string(&mut self.terraform.binary, "TAGPROBE_TERRAFORM_BINARY");
        override_string(&mut self.terraform.dir, "TAGPROBE_TERRAFORM_DIR");
        override_string(
            &mut self.terraform.topic_output,
            "TAGPROBE_TERRAFORM_TOPIC_OUTPUT",
        );

        // Image
        override_string(&mut self.image.push_script, "TAGPROBE_IMAGE_PUSH_SCRIPT");
        override_string(&mut self.image.baseline_tag, "TAGPROBE_IMAGE_BASELINE_TAG");

        // Poller
        override_parsed(
            &mut self.poller.max_attempts,
            "TAGPROBE_POLLER_MAX_ATTEMPTS",
        );
        override_parsed(
            &mut self.poller.interval_secs,
            "TAGPROBE_POLLER_INTERVAL_SECS",
        );
        override_parsed(
            &mut self.poller.initial_attempts,
            "TAGPROBE_POLLER_INITIAL_ATTEMPTS",
        );

        // AWS
        override_string(&mut self.aws.cli, "TAGPROBE_AWS_CLI");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TagprobeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        require_non_empty(&self.harness.test_name, "harness.test_name")?;
        require_non_empty(&self.harness.working_dir, "harness.working_dir")?;
        require_non_empty(&self.harness.region, "harness.region")?;

        // 테스트 이름은 작업 디렉토리 경로 요소로 사용됨
        if self.harness.test_name.contains(['/', '\\']) || self.harness.test_name == ".." {
            return Err(invalid(
                "harness.test_name",
                "must not contain path separators".to_owned(),
            ));
        }

        // ECR 저장소 이름 규칙: 소문자, 숫자, '-', '_', '.', '/'
        if !self
            .harness
            .name_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid(
                "harness.name_prefix",
                "must contain only lowercase letters, digits, '-', '_' or '.'".to_owned(),
            ));
        }

        require_non_empty(&self.terraform.binary, "terraform.binary")?;
        require_non_empty(&self.terraform.dir, "terraform.dir")?;
        require_non_empty(&self.terraform.topic_output, "terraform.topic_output")?;
        require_non_empty(&self.image.push_script, "image.push_script")?;
        require_non_empty(&self.image.baseline_tag, "image.baseline_tag")?;
        require_non_empty(&self.aws.cli, "aws.cli")?;

        if self.poller.max_attempts == 0 {
            return Err(invalid(
                "poller.max_attempts",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.poller.interval_secs == 0 || self.poller.interval_secs > 300 {
            return Err(invalid(
                "poller.interval_secs",
                "must be between 1 and 300".to_owned(),
            ));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

/// 로그 출력 형식
///
/// `clap` 기능이 켜져 있으면 CLI의 `--log-format` 값으로도 사용됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON 라인 (기계 파싱용)
    #[default]
    Json,
    /// 사람이 읽기 쉬운 여러 줄 출력
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}', expected json or pretty")),
        }
    }
}

/// 하네스 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// 테스트 이름 (작업 디렉토리 하위 경로)
    pub test_name: String,
    /// 작업 디렉토리 루트
    pub working_dir: String,
    /// 고유 실행 이름 접두사
    pub name_prefix: String,
    /// AWS 리전
    pub region: String,
}

impl HarnessConfig {
    /// 이 테스트의 실행 디렉토리 (`<working_dir>/<test_name>`)
    pub fn run_dir(&self) -> PathBuf {
        Path::new(&self.working_dir).join(&self.test_name)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_name: "TestSNSToECR".to_owned(),
            working_dir: ".tagprobe-working-dir".to_owned(),
            name_prefix: "ecs-test".to_owned(),
            region: "eu-west-1".to_owned(),
        }
    }
}

/// Terraform 프로비저닝 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// terraform 실행 파일
    pub binary: String,
    /// Terraform 모듈 디렉토리
    pub dir: String,
    /// 메시지 토픽 ARN을 담은 output 이름
    pub topic_output: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_owned(),
            dir: "../examples/simple/".to_owned(),
            topic_output: "sns_topic_arn".to_owned(),
        }
    }
}

/// 기준 이미지 푸시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 이미지 푸시 스크립트 경로
    pub push_script: String,
    /// 기준 이미지 태그
    pub baseline_tag: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            push_script: "../examples/shared/push-image.sh".to_owned(),
            baseline_tag: "latest".to_owned(),
        }
    }
}

/// 레지스트리 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// 알림 발행 후 태그 조회 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 간 대기 시간 (초)
    pub interval_secs: u64,
    /// 기준 태그 조회 시도 횟수 (0 = 재시도 없음)
    pub initial_attempts: u32,
}

impl PollerConfig {
    /// 알림 발행 후 적용할 재시도 정책
    pub fn settle_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_secs(self.interval_secs))
    }

    /// 기준 태그 조회에 적용할 재시도 정책
    pub fn initial_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.initial_attempts,
            Duration::from_secs(self.interval_secs),
        )
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            interval_secs: 5,
            initial_attempts: 0,
        }
    }
}

/// AWS CLI 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// aws 실행 파일
    pub cli: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            cli: "aws".to_owned(),
        }
    }
}

fn invalid(field: &str, reason: String) -> TagprobeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn require_non_empty(value: &str, field: &str) -> Result<(), TagprobeError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty".to_owned()));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = TagprobeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.harness.region, "eu-west-1");
        assert_eq!(config.harness.name_prefix, "ecs-test");
        assert_eq!(config.terraform.topic_output, "sns_topic_arn");
        assert_eq!(config.image.baseline_tag, "latest");
        assert_eq!(config.poller.max_attempts, 12);
        assert_eq!(config.poller.interval_secs, 5);
        assert_eq!(config.poller.initial_attempts, 0);
    }

    #[test]
    fn default_config_passes_validation() {
        TagprobeConfig::default().validate().unwrap();
    }

    #[test]
    fn run_dir_joins_test_name() {
        let config = TagprobeConfig::default();
        assert_eq!(
            config.harness.run_dir(),
            PathBuf::from(".tagprobe-working-dir/TestSNSToECR")
        );
    }

    #[test]
    fn settle_policy_allows_sixty_seconds() {
        let policy = PollerConfig::default().settle_policy();
        assert_eq!(policy.attempts(), 12);
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_total_wait(), Duration::from_secs(55));
    }

    #[test]
    fn initial_policy_never_sleeps() {
        let policy = PollerConfig::default().initial_policy();
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.max_total_wait(), Duration::ZERO);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[harness]
region = "us-east-1"

[poller]
max_attempts = 3
"#;
        let config = TagprobeConfig::parse(toml).unwrap();
        assert_eq!(config.harness.region, "us-east-1");
        // 나머지 필드는 기본값 유지
        assert_eq!(config.harness.test_name, "TestSNSToECR");
        assert_eq!(config.poller.max_attempts, 3);
        assert_eq!(config.poller.interval_secs, 5);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = TagprobeConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            TagprobeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_log_format() {
        let err = TagprobeConfig::parse("[general]\nlog_format = \"xml\"\n").unwrap_err();
        assert!(matches!(err, TagprobeError::Config(ConfigError::ParseFailed { .. })));
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn log_format_parses_from_lowercase_names() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_attempts() {
        let mut config = TagprobeConfig::default();
        config.poller.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poller.max_attempts"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = TagprobeConfig::default();
        config.poller.interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poller.interval_secs"));
    }

    #[test]
    fn validate_rejects_uppercase_prefix() {
        let mut config = TagprobeConfig::default();
        config.harness.name_prefix = "ECS-Test".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("harness.name_prefix"));
    }

    #[test]
    fn validate_rejects_test_name_with_separator() {
        let mut config = TagprobeConfig::default();
        config.harness.test_name = "a/b".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("harness.test_name"));
    }

    #[test]
    fn validate_rejects_empty_region() {
        let mut config = TagprobeConfig::default();
        config.harness.region = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("harness.region"));
    }

    #[test]
    #[serial]
    fn env_override_region() {
        let mut config = TagprobeConfig::default();
        // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TAGPROBE_HARNESS_REGION", "ap-northeast-2") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("TAGPROBE_HARNESS_REGION") };
        assert_eq!(config.harness.region, "ap-northeast-2");
    }

    #[test]
    #[serial]
    fn env_override_invalid_number_keeps_original() {
        let mut config = TagprobeConfig::default();
        // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TAGPROBE_POLLER_MAX_ATTEMPTS", "many") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("TAGPROBE_POLLER_MAX_ATTEMPTS") };
        assert_eq!(config.poller.max_attempts, 12);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = TagprobeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = TagprobeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.harness.region, parsed.harness.region);
        assert_eq!(config.poller.max_attempts, parsed.poller.max_attempts);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = TagprobeConfig::from_file("/nonexistent/path/tagprobe.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TagprobeError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
