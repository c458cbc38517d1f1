use serde::{Deserialize, Serialize};

/// The reason why the model stopped generating a choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model has finished generating text.
    Stop,
    /// The reply hit the `max_tokens` limit.
    Length,
    /// Anything the provider reports that isn't covered above.
    Other,
}

/// One candidate reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelChoice {
    /// Text of the reply. Some providers omit it for filtered replies.
    pub content: Option<String>,
    /// Why generation ended, if reported.
    pub finish_reason: Option<ModelFinishReason>,
}

/// A complete response from the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Candidate replies, best first.
    pub choices: Vec<ModelChoice>,
}

impl ModelResponse {
    /// Creates a response with a single finished choice.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            choices: vec![ModelChoice {
                content: Some(text.into()),
                finish_reason: Some(ModelFinishReason::Stop),
            }],
        }
    }

    /// Returns the text of the top choice.
    ///
    /// A choice without content counts as an empty reply, while a response
    /// with no choices at all yields `None`.
    pub fn top_text(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.content.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_text() {
        let resp = ModelResponse::with_text("Hi there");
        assert_eq!(resp.top_text(), Some("Hi there"));

        let filtered = ModelResponse {
            choices: vec![ModelChoice {
                content: None,
                finish_reason: Some(ModelFinishReason::Other),
            }],
        };
        assert_eq!(filtered.top_text(), Some(""));

        assert_eq!(ModelResponse::default().top_text(), None);
    }
}
