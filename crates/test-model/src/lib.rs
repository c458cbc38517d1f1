//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use palaver_model::{
    Credential, ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    fn status(&self) -> Option<u16> {
        self.status
    }
}

/// A request the provider has received, as seen by tests.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub credential: Credential,
    pub request: ModelRequest,
}

#[derive(Default)]
struct ScriptState {
    presets: VecDeque<PresetResponse>,
    requests: Vec<RecordedRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond. Each request consumes the next preset in order. If
/// the script runs out, the request fails with a rate limit error.
///
/// Clones share the same script and request log, so a test can keep one
/// clone around to inspect what the session sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    state: Arc<Mutex<ScriptState>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock().presets.push_back(preset);
    }

    #[inline]
    pub fn add_text_response<S: Into<String>>(&mut self, text: S) {
        self.add_response(PresetResponse::with_text(text));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        // A panicking test thread may poison the lock; the script itself is
        // still consistent.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        credential: &Credential,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let preset = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                credential: credential.clone(),
                request: req.clone(),
            });
            state.presets.pop_front()
        };
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            match preset {
                Some(PresetResponse::Reply(resp)) => Ok(resp),
                Some(PresetResponse::Failure(failure)) => Err(Error {
                    kind: failure.kind(),
                    status: failure.status,
                    message: failure.message,
                }),
                None => Err(Error {
                    message: "no enough presets".to_owned(),
                    kind: ErrorKind::RateLimitExceeded,
                    status: None,
                }),
            }
        }
    }
}
