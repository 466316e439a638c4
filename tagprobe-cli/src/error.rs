//! CLI-specific error types and exit code mapping

use tagprobe_core::error::TagprobeError;
use tagprobe_core::types::Stage;
use tagprobe_harness::{ErrorClass, HarnessError};

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes so that CI
/// pipelines can tell a broken environment apart from a failed validation.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A lifecycle stage failed.
    #[error("stage '{stage}' failed ({class}): {message}")]
    Stage {
        stage: Stage,
        class: ErrorClass,
        message: String,
    },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from tagprobe-core.
    #[error("{0}")]
    Core(#[from] TagprobeError),

    /// Wrapped harness error outside of a stage (status, clean).
    #[error("{0}")]
    Harness(#[from] HarnessError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | General / command error                   |
    /// | 2    | Configuration error                       |
    /// | 3    | Validation failed                         |
    /// | 4    | Environment error (provisioning, AWS CLI) |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Stage { class, .. } => class_exit_code(*class),
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                TagprobeError::Config(_) => 2,
                TagprobeError::Verification(_) => 3,
                TagprobeError::Environment(_) => 4,
                TagprobeError::Io(_) => 10,
                TagprobeError::Store(_) => 1,
            },
            Self::Harness(HarnessError::Io(_)) => 10,
            Self::Harness(e) => class_exit_code(e.class()),
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

fn class_exit_code(class: ErrorClass) -> i32 {
    match class {
        ErrorClass::Assertion | ErrorClass::Transient => 3,
        ErrorClass::Environment => 4,
        ErrorClass::Serialization | ErrorClass::Cancelled => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagprobe_core::error::{ConfigError, StoreError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::from(TagprobeError::Config(ConfigError::FileNotFound {
            path: "tagprobe.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_validation_stage_failure() {
        let err = CliError::Stage {
            stage: Stage::Validate,
            class: ErrorClass::Assertion,
            message: "1 of 1 validator(s) failed".to_owned(),
        };
        assert_eq!(err.exit_code(), 3, "failed validation should return exit code 3");
    }

    #[test]
    fn test_exit_code_environment_stage_failure() {
        let err = CliError::Stage {
            stage: Stage::InitApply,
            class: ErrorClass::Environment,
            message: "terraform apply failed".to_owned(),
        };
        assert_eq!(err.exit_code(), 4, "environment failure should return exit code 4");
    }

    #[test]
    fn test_exit_code_cancelled_stage() {
        let err = CliError::Stage {
            stage: Stage::Validate,
            class: ErrorClass::Cancelled,
            message: "cancelled".to_owned(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_harness_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CliError::from(HarnessError::Io(io_err));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_exit_code_harness_store_error() {
        let err = CliError::from(HarnessError::Store(StoreError::Corrupt {
            key: "TerraformOptions".to_owned(),
            reason: "expected object".to_owned(),
        }));
        assert_eq!(err.exit_code(), 1, "corrupt context is a command failure");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_error_display_stage() {
        let err = CliError::Stage {
            stage: Stage::InitApply,
            class: ErrorClass::Environment,
            message: "push script exited with 1".to_owned(),
        };
        let display_str = err.to_string();
        assert!(display_str.contains("init_apply"));
        assert!(display_str.contains("push script exited with 1"));
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
