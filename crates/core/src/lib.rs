#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, StoreError, TagprobeError};

// 설정
pub use config::{LogFormat, TagprobeConfig};

// 재시도
pub use retry::{RetryPolicy, retry_with_fixed_delay};

// 도메인 타입
pub use types::{ImageRef, NotificationPayload, Stage, unique_id, unique_name};
