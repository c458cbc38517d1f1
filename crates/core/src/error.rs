use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};

use palaver_model::{ErrorKind, ModelProviderError};

/// Errors reported by transcript, persistence and completion operations.
///
/// Every error is terminal to the operation that raised it only. The
/// session and its transcript remain usable afterwards.
#[derive(Debug)]
pub enum Error {
    /// A role name other than `assistant` or `user` was supplied.
    InvalidRole(String),
    /// A completion was requested without an API key.
    MissingCredential,
    /// The completion service failed or could not be reached.
    Upstream {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Status code reported by the service, if any.
        status: Option<u16>,
        /// Message reported by the service.
        message: String,
    },
    /// Reading or writing a chat log failed.
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying cause.
        source: io::Error,
    },
    /// A chat log could not be parsed back into a transcript.
    MalformedLog {
        /// Index of the first offending record, or `None` when the document
        /// as a whole is unusable.
        index: Option<usize>,
        /// What was wrong with it.
        reason: String,
    },
    /// The session worker has stopped.
    SessionClosed,
}

impl Error {
    #[inline]
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    #[inline]
    pub(crate) fn upstream<S: Into<String>>(
        kind: ErrorKind,
        status: Option<u16>,
        message: S,
    ) -> Self {
        Error::Upstream {
            kind,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn from_provider<E: ModelProviderError + ?Sized>(err: &E) -> Self {
        Error::upstream(err.kind(), err.status(), err.to_string())
    }

    #[inline]
    pub(crate) fn malformed<S: Into<String>>(index: Option<usize>, reason: S) -> Self {
        Error::MalformedLog {
            index,
            reason: reason.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRole(role) => write!(f, "invalid role: {role:?}"),
            Error::MissingCredential => {
                write!(f, "no API key has been provided")
            }
            Error::Upstream {
                kind,
                status: Some(status),
                message,
            } => write!(f, "completion failed ({kind}, status {status}): {message}"),
            Error::Upstream {
                kind,
                status: None,
                message,
            } => write!(f, "completion failed ({kind}): {message}"),
            Error::Io { path, source } => {
                write!(f, "cannot access {}: {source}", path.display())
            }
            Error::MalformedLog {
                index: Some(index),
                reason,
            } => write!(f, "malformed chat log entry #{index}: {reason}"),
            Error::MalformedLog {
                index: None,
                reason,
            } => write!(f, "malformed chat log: {reason}"),
            Error::SessionClosed => write!(f, "the session has been closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
