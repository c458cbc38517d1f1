use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;

use palaver_model::{
    Credential, ErrorKind, ModelMessage, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelRole,
};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }

    fn status(&self) -> Option<u16> {
        match self.0 {
            ErrorKind::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Echoes the latest user message back, if the key is the expected one.
struct FakeModelProvider {
    expected_key: &'static str,
}

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;

    fn send_request(
        &self,
        credential: &Credential,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        if credential.expose() != self.expected_key {
            return ready(Err(FakeModelProviderError(ErrorKind::Unauthorized)));
        }

        let last_user = req
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == ModelRole::User)
            .map(|msg| msg.content.clone())
            .unwrap_or_default();
        let words: Vec<_> = last_user.split(' ').take(req.max_tokens as usize).collect();
        ready(Ok(ModelResponse::with_text(format!(
            "You said {}",
            words.join(" ")
        ))))
    }
}

fn request(content: &str, max_tokens: u32) -> ModelRequest {
    ModelRequest {
        messages: vec![
            ModelMessage {
                role: ModelRole::Assistant,
                content: "How can I help?".to_owned(),
                timestamp: "2024-05-01 09:00:00".to_owned(),
            },
            ModelMessage {
                role: ModelRole::User,
                content: content.to_owned(),
                timestamp: "2024-05-01 09:00:03".to_owned(),
            },
        ],
        max_tokens,
    }
}

#[tokio::test]
async fn test_simple_request() {
    let provider = FakeModelProvider {
        expected_key: "sk-test",
    };
    let resp = provider
        .send_request(&Credential::new("sk-test"), &request("hello there", 16))
        .await
        .unwrap();
    assert_eq!(resp.top_text(), Some("You said hello there"));
}

#[tokio::test]
async fn test_max_tokens_is_visible_to_provider() {
    let provider = FakeModelProvider {
        expected_key: "sk-test",
    };
    let resp = provider
        .send_request(&Credential::new("sk-test"), &request("one two three", 1))
        .await
        .unwrap();
    assert_eq!(resp.top_text(), Some("You said one"));
}

#[tokio::test]
async fn test_rejected_credential() {
    let provider = FakeModelProvider {
        expected_key: "sk-test",
    };
    let err = provider
        .send_request(&Credential::new("sk-wrong"), &request("hi", 16))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.status(), Some(401));
}

#[test]
fn test_message_wire_shape() {
    let msg = ModelMessage {
        role: ModelRole::User,
        content: "안녕".to_owned(),
        timestamp: "2024-05-01 09:00:03".to_owned(),
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "role": "user",
            "content": "안녕",
            "timestamp": "2024-05-01 09:00:03",
        })
    );
}
