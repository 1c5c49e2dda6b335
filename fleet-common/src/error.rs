use thiserror::Error as ThisError;

/// Coarse classification of an [`Error`], independent of which upstream
/// produced it. Retry loops and worker failure handling match on this
/// rather than on SDK-specific error shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AssumeRole,
    Throttled,
    Transient,
    NotFound,
    AlreadyExists,
    Validation,
    ConflictIgnored,
    Fatal,
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to assume role: {0}")]
    AssumeRole(String),

    #[error("throttled by upstream")]
    Throttled(String),

    #[error("transient upstream error: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict ignored: {0}")]
    ConflictIgnored(String),

    #[error("{0}")]
    Fatal(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AssumeRole(_) => ErrorKind::AssumeRole,
            Error::Throttled(_) => ErrorKind::Throttled,
            Error::Transient(_) => ErrorKind::Transient,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Validation(_) => ErrorKind::Validation,
            Error::ConflictIgnored(_) => ErrorKind::ConflictIgnored,
            Error::Fatal(_) | Error::Json(_) => ErrorKind::Fatal,
        }
    }

    /// Whether a caller should retry this error with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Throttled | ErrorKind::Transient)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Error::Fatal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for `fleetctl`, matching the classification above in lieu of
/// the excluded HTTP layer's status-code mapping.
pub fn exit_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Validation => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_and_transient_are_retryable() {
        assert!(Error::Throttled("slow down".into()).is_retryable());
        assert!(Error::Transient("blip".into()).is_retryable());
        assert!(!Error::NotFound("x".into()).is_retryable());
        assert!(!Error::Fatal("boom".into()).is_retryable());
    }

    #[test]
    fn validation_maps_to_exit_code_two() {
        assert_eq!(exit_code(&Error::Validation("bad cron".into())), 2);
        assert_eq!(exit_code(&Error::AssumeRole("nope".into())), 1);
    }
}
