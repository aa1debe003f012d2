use thiserror::Error;

/// Errors that can occur while building, restoring or revalidating a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy misuse: {0}")]
    Misuse(#[from] PolicyMisuseError),

    #[error("codec error: {0}")]
    Codec(String),
}

/// Caller bugs, as opposed to anomalies in the headers themselves.
///
/// Malformed header values never produce an error; they read as absent.
/// These variants are reserved for inputs that cannot describe a valid
/// policy at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyMisuseError {
    #[error("revalidation request {actual} does not match stored request {expected}")]
    RequestMismatch { expected: String, actual: String },

    #[error("unsupported policy record version {0}")]
    UnsupportedVersion(u8),

    #[error("policy record is missing `{0}`")]
    MissingField(&'static str),

    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("cache heuristic {0} is outside [0, 1]")]
    InvalidHeuristic(String),

    #[error("invalid header `{0}` in policy record")]
    InvalidHeader(String),
}
