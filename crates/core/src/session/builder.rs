use std::sync::Arc;
use std::time::Duration;

use palaver_model::{Credential, ModelProvider};
use tokio::sync::mpsc;
use tracing::Instrument;

use super::worker::{OnTranscriptChanged, SessionState, run_session};
use super::{Session, TranscriptEvent};
use crate::clock::{Clock, SystemClock};
use crate::completion::CompletionBridge;
use crate::transcript::{DEFAULT_GREETING, TranscriptStore};

/// How long a completion may take unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`Session`] builder.
pub struct SessionBuilder {
    bridge: CompletionBridge,
    credential: Option<Credential>,
    greeting: String,
    clock: Arc<dyn Clock>,
    on_transcript_changed: Option<OnTranscriptChanged>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified model provider.
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        let mut bridge = CompletionBridge::new(provider);
        bridge.set_timeout(Some(DEFAULT_TIMEOUT));
        Self {
            bridge,
            credential: None,
            greeting: DEFAULT_GREETING.to_owned(),
            clock: Arc::new(SystemClock),
            on_transcript_changed: None,
        }
    }

    /// Sets the API key sent with every completion request.
    #[inline]
    pub fn with_credential<C: Into<Credential>>(mut self, credential: C) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Sets the assistant message every transcript starts with.
    #[inline]
    pub fn with_greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets the clock new messages are stamped with.
    #[inline]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the reply length limit, see
    /// [`DEFAULT_MAX_TOKENS`](crate::DEFAULT_MAX_TOKENS).
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.bridge.set_max_tokens(max_tokens);
        self
    }

    /// Bounds how long a completion may take. `None` waits forever.
    #[inline]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.bridge.set_timeout(timeout);
        self
    }

    /// Attaches a callback to be invoked whenever the transcript changes.
    ///
    /// The callback runs on the session worker, so it should hand the event
    /// off rather than block.
    #[inline]
    pub fn on_transcript_changed(
        mut self,
        on_transcript_changed: impl Fn(&TranscriptEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript_changed = Some(Box::new(on_transcript_changed));
        self
    }

    /// Builds the session and starts its worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Session {
        let Self {
            bridge,
            credential,
            greeting,
            clock,
            on_transcript_changed,
        } = self;

        let state = SessionState {
            store: TranscriptStore::new(Arc::clone(&clock), greeting),
            bridge,
            credential,
            clock,
            on_transcript_changed,
        };
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(
            run_session(state, cmd_rx).instrument(trace_span!("session")),
        );
        Session { cmd_tx }
    }
}
