//! 에러 타입 — 도메인별 에러 정의

/// tagprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TagprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 실행 컨텍스트 저장소 에러
    #[error("context store error: {0}")]
    Store(#[from] StoreError),

    /// 외부 환경 에러 (프로비저닝, 스크립트, 메시지 발행)
    #[error("environment error: {0}")]
    Environment(String),

    /// 검증 실패 (태그 미발견, 다이제스트 불일치)
    #[error("verification failed: {0}")]
    Verification(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 실행 컨텍스트 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 저장된 항목이 없음
    #[error("missing context entry '{key}' in {path}")]
    Missing { key: String, path: String },

    /// 저장된 항목을 해석할 수 없음
    #[error("corrupt context entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// 파일 이름으로 사용할 수 없는 키
    #[error("invalid context key '{key}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidKey { key: String },
}
