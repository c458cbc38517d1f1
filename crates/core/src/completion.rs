//! Turning a transcript into a completion request and back.

use std::time::Duration;

use palaver_model::{
    Credential, ErrorKind, ModelMessage, ModelProvider, ModelRequest,
};

use crate::error::Error;
use crate::model_client::ModelClient;
use crate::timestamp;
use crate::transcript::Transcript;

/// Reply length limit used unless configured otherwise.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Maps the transcript onto the request shape of the completion service.
///
/// Timestamps are sent at second precision. That drops the fractional part
/// the transcript keeps, which is what the service expects.
pub fn build_request(transcript: &Transcript, max_tokens: u32) -> ModelRequest {
    ModelRequest {
        messages: transcript
            .messages()
            .iter()
            .map(|msg| ModelMessage {
                role: msg.role().to_model_role(),
                content: msg.content().to_owned(),
                timestamp: timestamp::to_display(&msg.timestamp()),
            })
            .collect(),
        max_tokens,
    }
}

/// Asks the completion service for the next assistant reply.
#[derive(Clone)]
pub struct CompletionBridge {
    client: ModelClient,
    max_tokens: u32,
}

impl CompletionBridge {
    /// Creates a bridge to `provider` with the default reply limit and no
    /// timeout.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            client: ModelClient::new(provider),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Sets the reply length limit sent with every request.
    #[inline]
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = max_tokens;
    }

    /// Bounds how long a single request may take.
    #[inline]
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.client.set_timeout(timeout);
    }

    /// Requests a reply to `transcript` and returns its trimmed text.
    ///
    /// A missing or blank credential fails with
    /// [`Error::MissingCredential`] before anything is sent. Failures of the
    /// service, and responses without any choice, are reported as
    /// [`Error::Upstream`].
    pub async fn complete(
        &self,
        transcript: &Transcript,
        credential: Option<&Credential>,
    ) -> Result<String, Error> {
        let credential = match credential {
            Some(credential) if !credential.is_blank() => credential,
            _ => return Err(Error::MissingCredential),
        };

        let request = build_request(transcript, self.max_tokens);
        debug!(messages = request.messages.len(), "requesting completion");
        let response = self.client.send_request(credential, request).await?;
        match response.top_text() {
            Some(text) => Ok(text.trim().to_owned()),
            None => Err(Error::upstream(
                ErrorKind::InvalidResponse,
                None,
                "the response contains no choices",
            )),
        }
    }
}
