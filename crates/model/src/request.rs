use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The conversation so far, oldest message first.
    pub messages: Vec<ModelMessage>,
    /// Upper bound on the number of tokens the reply may contain.
    pub max_tokens: u32,
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// The person chatting.
    User,
    /// The model.
    Assistant,
}

impl ModelRole {
    /// Returns the wire name of the role.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::User => "user",
            ModelRole::Assistant => "assistant",
        }
    }
}

impl Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as transmitted to the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelMessage {
    /// The author of the message.
    pub role: ModelRole,
    /// The message text.
    pub content: String,
    /// When the message was written, already formatted for display.
    pub timestamp: String,
}
