//! The in-memory transcript of a session.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDateTime, SubsecRound};
use palaver_model::ModelRole;

use crate::clock::{Clock, SystemClock};
use crate::error::Error;

/// Greeting that opens every fresh transcript unless configured otherwise.
///
/// An English rendering of "안녕하세요! 무엇을 도와드릴까요?".
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Topic used when no user message provides one.
pub const DEFAULT_TOPIC: &str = "general";

/// Maximum number of characters in a derived topic.
pub const TOPIC_MAX_CHARS: usize = 20;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The model.
    Assistant,
    /// The person chatting.
    User,
}

impl Role {
    /// Returns the name used in chat logs and requests.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::User => "user",
        }
    }

    #[inline]
    pub(crate) fn to_model_role(self) -> ModelRole {
        match self {
            Role::Assistant => ModelRole::Assistant,
            Role::User => ModelRole::User,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assistant" => Ok(Role::Assistant),
            "user" => Ok(Role::User),
            _ => Err(Error::InvalidRole(s.to_owned())),
        }
    }
}

/// One entry of the transcript.
///
/// Messages are immutable once created. Their timestamp is assigned by the
/// [`TranscriptStore`] that appended them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: NaiveDateTime,
}

impl Message {
    #[inline]
    pub(crate) fn new(role: Role, content: String, timestamp: NaiveDateTime) -> Self {
        Self {
            role,
            content,
            timestamp,
        }
    }

    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when this message was created.
    #[inline]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// An ordered, never empty list of messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    #[inline]
    fn with_greeting(greeting: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            messages: vec![Message::new(
                Role::Assistant,
                greeting.to_owned(),
                timestamp,
            )],
        }
    }

    /// Wraps messages that have already been checked to be non-empty and in
    /// order.
    #[inline]
    pub(crate) fn from_validated(messages: Vec<Message>) -> Self {
        debug_assert!(!messages.is_empty());
        Self { messages }
    }

    /// Returns the messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`; present for API symmetry with [`Transcript::len`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Derives the topic label of this transcript.
    ///
    /// See [`extract_topic`].
    #[inline]
    pub fn topic(&self) -> String {
        extract_topic(&self.messages)
    }
}

/// Derives a short topic label from the first user message.
///
/// The label is the first word of that message, cut to [`TOPIC_MAX_CHARS`]
/// characters. Words are separated by Unicode whitespace and by the
/// information separators U+001C to U+001F. Later user messages are never
/// consulted: if the first one has no word at all, the topic is
/// [`DEFAULT_TOPIC`], as it is when nobody has written anything yet.
pub fn extract_topic(messages: &[Message]) -> String {
    let Some(first_user) = messages.iter().find(|msg| msg.role == Role::User)
    else {
        return DEFAULT_TOPIC.to_owned();
    };
    let word = first_user
        .content
        .split(is_word_separator)
        .find(|word| !word.is_empty());
    match word {
        Some(word) => word.chars().take(TOPIC_MAX_CHARS).collect(),
        None => DEFAULT_TOPIC.to_owned(),
    }
}

#[inline]
fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Owns the transcript of one session.
///
/// The store is the only place where messages are created, so it is also
/// the only place that reads the clock. Timestamps are kept at microsecond
/// precision (what a chat log can hold) and never go backwards, even if the
/// wall clock does.
pub struct TranscriptStore {
    transcript: Option<Transcript>,
    greeting: String,
    clock: Arc<dyn Clock>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_GREETING)
    }
}

impl TranscriptStore {
    /// Creates a store that has not been initialized yet.
    pub fn new<S: Into<String>>(clock: Arc<dyn Clock>, greeting: S) -> Self {
        Self {
            transcript: None,
            greeting: greeting.into(),
            clock,
        }
    }

    /// Creates the default transcript if there is none yet.
    ///
    /// Calling this again is a no-op that just returns the transcript.
    pub fn initialize(&mut self) -> &Transcript {
        if self.transcript.is_none() {
            let timestamp = self.next_timestamp();
            trace!("initializing transcript");
            self.transcript =
                Some(Transcript::with_greeting(&self.greeting, timestamp));
        }
        self.transcript_mut()
    }

    /// Returns the transcript, if the store has been initialized.
    #[inline]
    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Appends a new message stamped with the current time.
    pub fn append<S: Into<String>>(&mut self, role: Role, content: S) -> &Message {
        self.initialize();
        let timestamp = self.next_timestamp();
        let messages = &mut self.transcript_mut().messages;
        messages.push(Message::new(role, content.into(), timestamp));
        trace!(%role, len = messages.len(), "appended message");
        &messages[messages.len() - 1]
    }

    /// Like [`TranscriptStore::append`], with the role given by name.
    ///
    /// Fails with [`Error::InvalidRole`] unless the name is `assistant` or
    /// `user`, in which case the transcript is left untouched.
    pub fn append_named<S: Into<String>>(
        &mut self,
        role: &str,
        content: S,
    ) -> Result<&Message, Error> {
        let role = role.parse()?;
        Ok(self.append(role, content))
    }

    /// Replaces the whole transcript with a fresh greeting.
    ///
    /// Returns the new greeting message.
    pub fn reset(&mut self) -> &Message {
        let timestamp = self.next_timestamp();
        debug!("resetting transcript");
        let transcript = Transcript::with_greeting(&self.greeting, timestamp);
        &self.transcript.insert(transcript).messages[0]
    }

    /// Replaces the whole transcript with one read back from a chat log.
    pub fn restore(&mut self, transcript: Transcript) {
        debug!(len = transcript.len(), "restoring transcript");
        self.transcript = Some(transcript);
    }

    /// Derives the topic label of the current transcript.
    ///
    /// An uninitialized store has no user messages, so its topic is
    /// [`DEFAULT_TOPIC`].
    pub fn extract_topic(&self) -> String {
        match &self.transcript {
            Some(transcript) => transcript.topic(),
            None => DEFAULT_TOPIC.to_owned(),
        }
    }

    fn next_timestamp(&self) -> NaiveDateTime {
        let now = self.clock.now().trunc_subsecs(6);
        match self.transcript.as_ref().and_then(Transcript::last) {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    #[inline]
    fn transcript_mut(&mut self) -> &mut Transcript {
        self.transcript
            .as_mut()
            .expect("transcript must be initialized first")
    }
}
