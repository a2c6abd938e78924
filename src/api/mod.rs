use serde::{Deserialize, Serialize};

/// Inbound payload for `POST /api/chat`.
///
/// The mode arrives as a free-form token; resolution (including the silent
/// default for unknown tokens) happens in [`crate::core::modes`].
#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub mode: String,
    #[serde(default)]
    pub prompt: String,
}

/// The only outbound contract: a reply is always present, even when every
/// upstream failed.
#[derive(Debug, Serialize)]
pub struct RelayReply {
    pub reply: String,
}

#[derive(Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
pub struct ChatCompletionChoice {
    #[serde(default)]
    pub message: Option<AssistantMessage>,
}

#[derive(Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Body sent to the configured basic endpoint.
#[derive(Serialize)]
pub struct BasicPromptRequest {
    pub prompt: String,
}

/// Responses from basic endpoints are loosely shaped: some deployments
/// answer with `reply`, others with `text`.
#[derive(Deserialize)]
pub struct BasicPromptReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl BasicPromptReply {
    /// Extract the reply text, preferring `reply` over `text`.
    pub fn into_reply(self) -> Option<String> {
        self.reply.or(self.text)
    }
}
