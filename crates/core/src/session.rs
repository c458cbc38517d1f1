mod builder;
#[cfg(test)]
mod tests;
mod worker;

use std::path::PathBuf;

use palaver_model::Credential;
use tokio::sync::{mpsc, oneshot};

use crate::chat_log::LogExport;
use crate::error::Error;
use crate::transcript::{Message, Transcript};
pub use builder::{DEFAULT_TIMEOUT, SessionBuilder};
use worker::Command;

/// A change to the transcript, reported to the
/// [`SessionBuilder::on_transcript_changed`] callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// A message was added at the end of the transcript.
    Appended(Message),
    /// The transcript was replaced by a fresh one holding only this greeting.
    Reset(Message),
    /// The transcript was replaced by one read from a chat log.
    Restored {
        /// Number of messages in the restored transcript.
        len: usize,
    },
}

/// A chat session, owning exactly one transcript.
///
/// The transcript lives in a worker task that handles one request at a
/// time. A turn keeps the worker busy until the reply has arrived, so turns
/// sent from several clones of the handle are answered strictly in order.
///
/// Dropping every handle, or calling [`Session::shutdown`], stops the worker.
/// Later requests fail with [`Error::SessionClosed`].
#[derive(Clone)]
pub struct Session {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl Session {
    /// Runs one turn: records `content` as a user message, then asks the
    /// completion service for a reply and records that too.
    ///
    /// The user message stays in the transcript even when the turn fails,
    /// for example with [`Error::MissingCredential`] or
    /// [`Error::Upstream`]. Returns the assistant message.
    pub async fn send_message<S: Into<String>>(
        &self,
        content: S,
    ) -> Result<Message, Error> {
        let content = content.into();
        self.request(|reply| Command::SendMessage { content, reply })
            .await?
    }

    /// Starts over with a fresh greeting and returns it.
    pub async fn reset(&self) -> Result<Message, Error> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Saves the transcript as a chat log in `directory`.
    ///
    /// Returns the path of the written file.
    pub async fn save<P: Into<PathBuf>>(
        &self,
        directory: P,
    ) -> Result<PathBuf, Error> {
        let directory = directory.into();
        self.request(|reply| Command::Save { directory, reply })
            .await?
    }

    /// Renders the transcript as a chat log without touching the disk.
    pub async fn export(&self) -> Result<LogExport, Error> {
        self.request(|reply| Command::Export { reply }).await
    }

    /// Replaces the transcript with the one saved at `path`.
    ///
    /// On failure the current transcript is kept. Returns the number of
    /// messages loaded.
    pub async fn load<P: Into<PathBuf>>(&self, path: P) -> Result<usize, Error> {
        let path = path.into();
        self.request(|reply| Command::Load { path, reply }).await?
    }

    /// Returns a copy of the current transcript.
    pub async fn snapshot(&self) -> Result<Transcript, Error> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Returns the topic label of the current transcript.
    pub async fn topic(&self) -> Result<String, Error> {
        self.request(|reply| Command::Topic { reply }).await
    }

    /// Replaces the API key used for the following turns.
    ///
    /// `None` clears it, and so does a blank key.
    pub fn set_credential(&self, credential: Option<Credential>) -> Result<(), Error> {
        self.send(Command::SetCredential(credential))
    }

    /// Asks the worker to stop after the requests already queued.
    #[inline]
    pub fn shutdown(&self) {
        self.send(Command::Shutdown).ok();
    }

    #[inline]
    fn send(&self, cmd: Command) -> Result<(), Error> {
        self.cmd_tx.send(cmd).map_err(|_| Error::SessionClosed)
    }

    async fn request<T>(
        &self,
        make_cmd: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make_cmd(reply_tx))?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }
}
