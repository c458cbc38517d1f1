//! Core logic of a single chat session: the transcript, chat logs, and the
//! round trip to the completion service.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod chat_log;
mod clock;
mod completion;
mod error;
mod model_client;
mod session;
pub mod timestamp;
mod transcript;

pub use chat_log::LogExport;
pub use clock::{Clock, SystemClock};
pub use completion::{CompletionBridge, DEFAULT_MAX_TOKENS, build_request};
pub use error::Error;
pub use palaver_model::{Credential, ErrorKind};
pub use session::{DEFAULT_TIMEOUT, Session, SessionBuilder, TranscriptEvent};
pub use transcript::{
    DEFAULT_GREETING, DEFAULT_TOPIC, Message, Role, TOPIC_MAX_CHARS,
    Transcript, TranscriptStore, extract_topic,
};
