//! Harness error types.
//!
//! [`HarnessError`] covers every failure the lifecycle can surface. Each variant
//! carries the operation's key parameters (tag, repository, region, topic) so a
//! failing run can be diagnosed from its message alone. [`ErrorClass`] groups
//! variants by how the harness reacts to them.

use serde::{Deserialize, Serialize};

use tagprobe_core::error::{StoreError, TagprobeError};
use tagprobe_core::types::Stage;

/// How the harness treats a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// External tooling failed (provisioning, push script, publish). Fatal, never retried.
    Environment,
    /// Registry state not yet visible. Retried up to the poller budget.
    Transient,
    /// Persisted context missing or unreadable. Fatal.
    Serialization,
    /// The system under test produced the wrong result.
    Assertion,
    /// The run was interrupted before the operation finished.
    Cancelled,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Environment => "environment",
            Self::Transient => "transient",
            Self::Serialization => "serialization",
            Self::Assertion => "assertion",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl ErrorClass {
    /// Failures that say more about the environment rank higher.
    ///
    /// A stage that aggregates several failures reports the highest-ranked class.
    pub fn severity(self) -> u8 {
        match self {
            Self::Environment => 4,
            Self::Serialization => 3,
            Self::Cancelled => 2,
            Self::Assertion => 1,
            Self::Transient => 0,
        }
    }
}

/// Harness domain error
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// An external command could not be started or exited non-zero
    #[error("command '{command}' failed: {reason}")]
    CommandFailed {
        /// Command line as displayed in logs
        command: String,
        /// Exit status and captured stderr
        reason: String,
    },

    /// An infrastructure provisioning step failed
    #[error("provisioning {operation} in '{dir}' failed: {reason}")]
    Provision {
        /// Terraform step: `init`, `apply` or `destroy`
        operation: String,
        /// Provisioning module directory
        dir: String,
        /// Underlying failure
        reason: String,
    },

    /// A named provisioning output could not be read
    #[error("provisioning output '{name}' unavailable: {reason}")]
    OutputUnavailable {
        /// Output name
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// The account id for the registry could not be resolved
    #[error("account id lookup in {region} failed: {reason}")]
    Identity {
        /// AWS region
        region: String,
        /// Underlying failure
        reason: String,
    },

    /// The baseline image push script failed
    #[error("image push of {repository}:{tag} in {region} failed: {reason}")]
    ImagePush {
        /// Registry repository
        repository: String,
        /// Pushed tag
        tag: String,
        /// AWS region
        region: String,
        /// Underlying failure
        reason: String,
    },

    /// Publishing the notification failed
    #[error("publish to topic '{topic}' failed: {reason}")]
    Publish {
        /// Topic identifier
        topic: String,
        /// Underlying failure
        reason: String,
    },

    /// Listing the registry repository failed
    #[error("listing images of repository '{repository}' in {region} failed: {reason}")]
    Registry {
        /// Registry repository
        repository: String,
        /// AWS region
        region: String,
        /// Underlying failure
        reason: String,
    },

    /// The tag never appeared in the repository listing
    #[error("image tag '{tag}' not found in repository '{repository}' after {attempts} attempt(s)")]
    TagNotFound {
        /// Tag being resolved
        tag: String,
        /// Registry repository
        repository: String,
        /// Listing calls performed
        attempts: u32,
    },

    /// The added tag points at different image content than the baseline tag
    #[error(
        "digest of tag '{tag}' is {actual}, which does not match the image expected to be tagged ({expected})"
    )]
    DigestMismatch {
        /// Tag added by the system under test
        tag: String,
        /// Digest of the baseline tag
        expected: String,
        /// Digest resolved for the added tag
        actual: String,
    },

    /// Persisted context error
    #[error("context store error: {0}")]
    Store(#[from] StoreError),

    /// Payload or context encoding failed
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A validator task ended without producing a result
    #[error("validator '{name}' aborted: {reason}")]
    ValidatorAborted {
        /// Validator name
        name: String,
        /// Panic or join failure
        reason: String,
    },

    /// One or more validators failed
    #[error("{failed} of {total} validator(s) failed ({class})")]
    ValidationFailed {
        /// Failed validators
        failed: usize,
        /// Validators run
        total: usize,
        /// Highest-ranked class among the validator failures
        class: ErrorClass,
    },

    /// The stage was interrupted
    #[error("stage '{stage}' cancelled")]
    Cancelled {
        /// Interrupted stage
        stage: Stage,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Classifies the error according to the harness error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CommandFailed { .. }
            | Self::Provision { .. }
            | Self::OutputUnavailable { .. }
            | Self::Identity { .. }
            | Self::ImagePush { .. }
            | Self::Publish { .. }
            | Self::Registry { .. }
            | Self::ValidatorAborted { .. }
            | Self::Io(_) => ErrorClass::Environment,
            Self::TagNotFound { .. } => ErrorClass::Transient,
            Self::DigestMismatch { .. } => ErrorClass::Assertion,
            Self::ValidationFailed { class, .. } => *class,
            Self::Store(_) | Self::Encode(_) => ErrorClass::Serialization,
            Self::Cancelled { .. } => ErrorClass::Cancelled,
        }
    }

    /// Whether the registry poller may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TagNotFound { .. })
    }
}

impl From<HarnessError> for TagprobeError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Store(e) => TagprobeError::Store(e),
            HarnessError::Io(e) => TagprobeError::Io(e),
            other => match other.class() {
                ErrorClass::Transient | ErrorClass::Assertion => {
                    TagprobeError::Verification(other.to_string())
                }
                _ => TagprobeError::Environment(other.to_string()),
            },
        }
    }
}
