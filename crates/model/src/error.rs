use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The credential was rejected by the provider.
    Unauthorized,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The provider answered, but the payload could not be understood.
    InvalidResponse,
    /// The provider did not answer in time.
    Timeout,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::RateLimitExceeded => write!(f, "rate limit exceeded"),
            ErrorKind::InvalidResponse => write!(f, "invalid response"),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::Other => write!(f, "provider error"),
        }
    }
}

impl ErrorKind {
    /// Classifies an HTTP status code returned by a provider.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::Unauthorized,
            429 => ErrorKind::RateLimitExceeded,
            _ => ErrorKind::Other,
        }
    }
}
