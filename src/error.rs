use thiserror::Error;

/// Errors that abort an invocation. The queue message is left in place so it gets redelivered.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed notification body: {0}")]
    Envelope(String),

    #[error("notification for bucket {bucket} does not reference any object key")]
    MissingObjectKey { bucket: String },

    #[error("failed to retrieve s3://{bucket}/{key}: {reason}")]
    Retrieval {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("failed to decompress log file: {0}")]
    Decode(#[source] std::io::Error),

    #[error("failed to parse audit records: {0}")]
    Parse(String),

    #[error("matched record #{index} has no {parameter} request parameter")]
    MissingActor { index: usize, parameter: String },

    #[error("reading the log file took longer than {seconds}s")]
    Timeout { seconds: u64 },
}

/// Failure to delete a single identity. Always reported, never retried.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("user no longer exists: {0}")]
    AlreadyDeleted(String),

    #[error("user still has attached resources: {0}")]
    Conflict(String),

    #[error("{0}")]
    Service(String),

    #[error("{0}")]
    Unexpected(String),

    #[error("no response within {0}s")]
    TimedOut(u64),
}

impl RemediationError {
    /// Whether the identity service itself rejected the request, as opposed to the call never
    /// completing.
    pub fn is_service_error(&self) -> bool {
        !matches!(self, RemediationError::Unexpected(_) | RemediationError::TimedOut(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}
