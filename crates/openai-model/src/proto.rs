use palaver_model::{
    ModelChoice, ModelFinishReason, ModelMessage, ModelRequest, ModelResponse,
    ModelRole,
};
use serde::{Deserialize, Serialize};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    role: ModelRole,
    content: String,
    timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        max_tokens: req.max_tokens,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    Message {
        role: msg.role,
        content: msg.content.clone(),
        timestamp: msg.timestamp.clone(),
    }
}

pub fn create_response(completion: ChatCompletion) -> ModelResponse {
    let choices = completion
        .choices
        .into_iter()
        .map(|choice| ModelChoice {
            content: choice.message.content,
            finish_reason: choice.finish_reason.as_deref().map(
                |reason| match reason {
                    "stop" => ModelFinishReason::Stop,
                    "length" => ModelFinishReason::Length,
                    _ => ModelFinishReason::Other,
                },
            ),
        })
        .collect();
    ModelResponse { choices }
}

/// Extracts the human readable message from an error payload.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.error.message)
}
