use palaver_model::{ErrorKind, ModelResponse};
use serde::{Deserialize, Serialize};

/// How a preset request should fail.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetFailure {
    /// Status code to report, if any.
    pub status: Option<u16>,
    /// Error message to report.
    pub message: String,
}

/// The preset outcome for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetResponse {
    /// Answer with this response.
    #[serde(rename = "reply")]
    Reply(ModelResponse),
    /// Fail the request.
    #[serde(rename = "failure")]
    Failure(PresetFailure),
}

impl PresetResponse {
    /// Creates a successful preset with a single reply text.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::Reply(ModelResponse::with_text(text))
    }

    /// Creates a failing preset.
    #[inline]
    pub fn with_failure<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self::Failure(PresetFailure {
            status,
            message: message.into(),
        })
    }
}

impl PresetFailure {
    #[inline]
    pub(crate) fn kind(&self) -> ErrorKind {
        self.status.map(ErrorKind::from_status).unwrap_or(ErrorKind::Other)
    }
}
