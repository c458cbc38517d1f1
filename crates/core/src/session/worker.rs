use std::fmt::{self, Debug};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use palaver_model::Credential;
use tokio::sync::{mpsc, oneshot};

use super::TranscriptEvent;
use crate::chat_log::{self, LogExport};
use crate::clock::Clock;
use crate::completion::CompletionBridge;
use crate::error::Error;
use crate::transcript::{Message, Role, Transcript, TranscriptStore};

pub(super) type OnTranscriptChanged =
    Box<dyn Fn(&TranscriptEvent) + Send + Sync>;

pub(super) enum Command {
    SendMessage {
        content: String,
        reply: oneshot::Sender<Result<Message, Error>>,
    },
    Reset {
        reply: oneshot::Sender<Message>,
    },
    Save {
        directory: PathBuf,
        reply: oneshot::Sender<Result<PathBuf, Error>>,
    },
    Export {
        reply: oneshot::Sender<LogExport>,
    },
    Load {
        path: PathBuf,
        reply: oneshot::Sender<Result<usize, Error>>,
    },
    Snapshot {
        reply: oneshot::Sender<Transcript>,
    },
    Topic {
        reply: oneshot::Sender<String>,
    },
    SetCredential(Option<Credential>),
    Shutdown,
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SendMessage { content, .. } => f
                .debug_struct("SendMessage")
                .field("len", &content.len())
                .finish(),
            Command::Reset { .. } => write!(f, "Reset"),
            Command::Save { directory, .. } => f
                .debug_struct("Save")
                .field("directory", directory)
                .finish(),
            Command::Export { .. } => write!(f, "Export"),
            Command::Load { path, .. } => {
                f.debug_struct("Load").field("path", path).finish()
            }
            Command::Snapshot { .. } => write!(f, "Snapshot"),
            Command::Topic { .. } => write!(f, "Topic"),
            Command::SetCredential(credential) => f
                .debug_tuple("SetCredential")
                .field(credential)
                .finish(),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Everything the worker owns.
pub(super) struct SessionState {
    pub(super) store: TranscriptStore,
    pub(super) bridge: CompletionBridge,
    pub(super) credential: Option<Credential>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) on_transcript_changed: Option<OnTranscriptChanged>,
}

pub(super) async fn run_session(
    mut state: SessionState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    debug!("started");
    let greeting = state.store.initialize().messages()[0].clone();
    state.notify(TranscriptEvent::Appended(greeting));

    while let Some(cmd) = cmd_rx.recv().await {
        trace!("received command: {cmd:?}");
        if state.handle(cmd).await.is_break() {
            break;
        }
    }
    debug!("will terminate");
}

impl SessionState {
    async fn handle(&mut self, cmd: Command) -> ControlFlow<()> {
        // A requester that went away only loses the reply, hence `ok()`.
        match cmd {
            Command::SendMessage { content, reply } => {
                let result = self.send_message(content).await;
                reply.send(result).ok();
            }
            Command::Reset { reply } => {
                let greeting = self.store.reset().clone();
                self.notify(TranscriptEvent::Reset(greeting.clone()));
                reply.send(greeting).ok();
            }
            Command::Save { directory, reply } => {
                let date = self.clock.now().date();
                let result =
                    chat_log::save(self.store.initialize(), &directory, date);
                reply.send(result).ok();
            }
            Command::Export { reply } => {
                let date = self.clock.now().date();
                let export =
                    chat_log::export_bytes(self.store.initialize(), date);
                reply.send(export).ok();
            }
            Command::Load { path, reply } => {
                let result = match chat_log::load(&path) {
                    Ok(transcript) => {
                        let len = transcript.len();
                        self.store.restore(transcript);
                        self.notify(TranscriptEvent::Restored { len });
                        Ok(len)
                    }
                    Err(err) => {
                        warn!("cannot load {}: {err}", path.display());
                        Err(err)
                    }
                };
                reply.send(result).ok();
            }
            Command::Snapshot { reply } => {
                reply.send(self.store.initialize().clone()).ok();
            }
            Command::Topic { reply } => {
                reply.send(self.store.extract_topic()).ok();
            }
            Command::SetCredential(credential) => {
                debug!(present = credential.is_some(), "credential replaced");
                self.credential = credential;
            }
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    async fn send_message(&mut self, content: String) -> Result<Message, Error> {
        let user_msg = self.store.append(Role::User, content).clone();
        self.notify(TranscriptEvent::Appended(user_msg));

        let reply = self
            .bridge
            .complete(self.store.initialize(), self.credential.as_ref())
            .await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                warn!("turn failed: {err}");
                return Err(err);
            }
        };

        let assistant_msg = self.store.append(Role::Assistant, reply).clone();
        self.notify(TranscriptEvent::Appended(assistant_msg.clone()));
        Ok(assistant_msg)
    }

    #[inline]
    fn notify(&self, event: TranscriptEvent) {
        if let Some(on_transcript_changed) = &self.on_transcript_changed {
            on_transcript_changed(&event);
        }
    }
}
