//! tagprobe.toml 통합 설정 테스트
//!
//! - tagprobe.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use std::io::Write;

use serial_test::serial;
use tagprobe_core::config::{LogFormat, TagprobeConfig};
use tagprobe_core::error::{ConfigError, TagprobeError};

const EXAMPLE: &str = include_str!("../../../tagprobe.toml.example");

// =============================================================================
// tagprobe.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = TagprobeConfig::parse(EXAMPLE).expect("example config should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, LogFormat::Json);
}

#[test]
fn example_config_passes_validation() {
    let config = TagprobeConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_defaults() {
    let config = TagprobeConfig::parse(EXAMPLE).expect("should parse");
    let defaults = TagprobeConfig::default();

    assert_eq!(config.harness.test_name, defaults.harness.test_name);
    assert_eq!(config.harness.working_dir, defaults.harness.working_dir);
    assert_eq!(config.harness.name_prefix, defaults.harness.name_prefix);
    assert_eq!(config.harness.region, defaults.harness.region);
    assert_eq!(config.terraform.binary, defaults.terraform.binary);
    assert_eq!(config.terraform.dir, defaults.terraform.dir);
    assert_eq!(config.terraform.topic_output, defaults.terraform.topic_output);
    assert_eq!(config.image.push_script, defaults.image.push_script);
    assert_eq!(config.image.baseline_tag, defaults.image.baseline_tag);
    assert_eq!(config.poller.max_attempts, defaults.poller.max_attempts);
    assert_eq!(config.poller.interval_secs, defaults.poller.interval_secs);
    assert_eq!(
        config.poller.initial_attempts,
        defaults.poller.initial_attempts
    );
    assert_eq!(config.aws.cli, defaults.aws.cli);
}

// =============================================================================
// 부분 설정 / 에러 테스트
// =============================================================================

#[test]
fn empty_config_uses_defaults() {
    let config = TagprobeConfig::parse("").expect("empty config should parse");
    assert_eq!(config.harness.region, "eu-west-1");
    config.validate().expect("defaults should validate");
}

#[test]
fn only_poller_section() {
    let config = TagprobeConfig::parse(
        r#"
[poller]
max_attempts = 24
interval_secs = 10
"#,
    )
    .expect("should parse");
    assert_eq!(config.poller.max_attempts, 24);
    assert_eq!(config.poller.interval_secs, 10);
    assert_eq!(config.image.baseline_tag, "latest");
}

#[test]
fn wrong_type_is_parse_error() {
    let err = TagprobeConfig::parse("[poller]\nmax_attempts = \"twelve\"\n").unwrap_err();
    assert!(matches!(
        err,
        TagprobeError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 파일 로딩 + 환경변수 우선순위
// =============================================================================

#[tokio::test]
#[serial]
async fn load_applies_env_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    writeln!(file, "[harness]\nregion = \"us-west-2\"").expect("should write config");

    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var("TAGPROBE_HARNESS_REGION", "eu-central-1") };
    let result = TagprobeConfig::load(file.path()).await;
    unsafe { std::env::remove_var("TAGPROBE_HARNESS_REGION") };

    let config = result.expect("should load");
    assert_eq!(config.harness.region, "eu-central-1");
}

#[tokio::test]
#[serial]
async fn load_ignores_unparsable_log_format_override() {
    let file = tempfile::NamedTempFile::new().expect("should create temp file");

    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var("TAGPROBE_GENERAL_LOG_FORMAT", "xml") };
    let result = TagprobeConfig::load(file.path()).await;
    unsafe { std::env::remove_var("TAGPROBE_GENERAL_LOG_FORMAT") };

    let config = result.expect("unparsable override should be ignored");
    assert_eq!(config.general.log_format, LogFormat::Json);
}
