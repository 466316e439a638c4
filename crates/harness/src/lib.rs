#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Harness error types (`HarnessError`, `ErrorClass`)
//! - [`process`]: External command execution (`CommandSpec`, `run`)
//! - [`store`]: Run-directory key/value store and stage markers (`ContextStore`)
//! - [`context`]: Persisted run context (`RunContext`, `ProvisionOptions`)
//! - [`stage`]: Idempotent stage execution (`StageRunner`)
//! - [`provisioner`]: Infrastructure apply/destroy (`Provisioner` trait, `TerraformCli`)
//! - [`image`]: Baseline image push (`ImagePublisher` trait, `ScriptImagePublisher`)
//! - [`notification`]: Re-tag request publishing (`TopicClient` trait, `NotificationPublisher`)
//! - [`registry`]: Eventually consistent tag lookup (`RegistryClient` trait, `RegistryPoller`)
//! - [`aws`]: `aws` CLI client (`AwsCli`)
//! - [`validator`]: Validators and concurrent runner (`Validator`, `TaggingValidator`)
//! - [`harness`]: Lifecycle orchestrator (`Harness`, `RunReport`)
//!
//! # Architecture
//!
//! ```text
//! Harness ─▶ StageRunner ─▶ init_apply: RunContext::setup ─▶ save ─▶ Provisioner.apply ─▶ ImagePublisher.push
//!                       ├─▶ validate:   RunContext::load ─▶ run_validators (one task each)
//!                       │                    TaggingValidator: RegistryPoller ─▶ NotificationPublisher ─▶ RegistryPoller
//!                       └─▶ destroy:    RunContext::load ─▶ Provisioner.destroy
//! ```

pub mod aws;
pub mod context;
pub mod error;
pub mod harness;
pub mod image;
pub mod notification;
pub mod process;
pub mod provisioner;
pub mod registry;
pub mod stage;
pub mod store;
pub mod validator;

// --- Public API Re-exports ---

// Orchestrator
pub use harness::{Harness, RunReport, StageReport, StageStatus};

// Error
pub use error::{ErrorClass, HarnessError};

// Context
pub use context::{ProvisionOptions, RunContext};
pub use store::ContextStore;

// Stages
pub use stage::{SkipReason, StageOutcome, StageRunner, StageState};

// Adapters
pub use aws::{AccountResolver, AwsCli};
pub use image::{ImagePublisher, ScriptImagePublisher};
pub use notification::{NotificationPublisher, TopicClient};
pub use provisioner::{Provisioner, TerraformCli};
pub use registry::{RegistryClient, RegistryPoller};

// Validators
pub use validator::{DynValidator, TaggingValidator, Validator, ValidatorReport, run_validators};
