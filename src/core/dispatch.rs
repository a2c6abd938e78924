//! The dispatch core: one outbound request per call, a reply in every case.
//!
//! `basic` prompts go to the configured basic endpoint; `pro` and `light`
//! (and anything unrecognized, which resolves to `pro`) go to the shared
//! chat-completion endpoint. Upstream failures never escape this module:
//! transport failures on the model path hop to the basic endpoint when one
//! is configured, and every remaining failure normalizes to a fixed,
//! human-readable placeholder reply.

use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{
    BasicPromptReply, BasicPromptRequest, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage,
};
use crate::core::config::Config;
use crate::core::metrics;
use crate::core::modes::{resolve_mode, Mode, ModelTable, ResolvedMode};
use crate::utils::url::construct_api_url;

const DEFAULT_CHAT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_PERSONA: &str = "You are GENISI: premium, concise, helpful, multilingual.";

/// Placeholder when a basic endpoint answered but carried no reply text.
pub const BASIC_SIMPLE_REPLY: &str = "رد بسيط من Basic.";
/// Placeholder when the basic endpoint is unreachable or unconfigured.
pub const BASIC_UNAVAILABLE_REPLY: &str = "Basic غير متاح حالياً.";
/// Placeholder when the model answered with an unexpected shape.
pub const MODEL_NO_REPLY: &str = "ماكانش رد.";
/// Placeholder when the model endpoint is unreachable and the basic hop
/// could not take over.
pub const MODEL_UNREACHABLE_REPLY: &str = "تعذر الوصول لـ OpenRouter. نحاول Basic كـ احتياط.";

/// Which path produced a reply, and whether it is a placeholder. Feeds
/// logs and metrics only; the wire payload stays `{ reply }` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The chat-completion endpoint answered with content
    ModelReply,
    /// The basic endpoint answered with content
    BasicReply,
    /// The model path failed in transport and the basic hop answered
    BasicFallback,
    /// An upstream answered, but without the expected fields
    EmptyShape,
    /// Transport failure with no way to recover a real reply
    Unavailable,
}

impl DispatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchStatus::ModelReply => "model_reply",
            DispatchStatus::BasicReply => "basic_reply",
            DispatchStatus::BasicFallback => "basic_fallback",
            DispatchStatus::EmptyShape => "empty_shape",
            DispatchStatus::Unavailable => "unavailable",
        }
    }

    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            DispatchStatus::EmptyShape | DispatchStatus::Unavailable
        )
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub reply: String,
    pub status: DispatchStatus,
    pub mode: ResolvedMode,
}

/// The dispatch core. Constructed once at startup from the resolved
/// configuration; holds the HTTP client and never reads the environment.
pub struct Dispatcher {
    client: reqwest::Client,
    api_key: Option<String>,
    chat_completions_url: String,
    basic_endpoint: Option<String>,
    persona: String,
    models: ModelTable,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let timeout = config
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        let chat_api_base = config
            .chat_api_base
            .as_deref()
            .unwrap_or(DEFAULT_CHAT_API_BASE);

        Ok(Dispatcher {
            client,
            api_key: config.api_key.clone(),
            chat_completions_url: construct_api_url(chat_api_base, "chat/completions"),
            basic_endpoint: config.basic_endpoint.clone(),
            persona: config
                .persona
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            models: ModelTable::with_overrides(&config.models),
        })
    }

    /// Dispatch a prompt to the upstream selected by `mode_token`.
    ///
    /// Never fails and never returns an empty reply: all transport and
    /// shape failures are absorbed into placeholder text.
    pub async fn dispatch(&self, mode_token: &str, prompt: &str) -> DispatchOutcome {
        let resolved = resolve_mode(mode_token);
        metrics::record_request();
        if resolved.defaulted {
            metrics::record_defaulted_mode();
            debug!(token = mode_token, "unknown mode token, defaulting to pro");
        }

        let (reply, status) = match resolved.mode {
            Mode::Basic => self.basic_reply(prompt).await,
            mode => self.model_reply(mode, prompt).await,
        };

        match status {
            DispatchStatus::ModelReply => metrics::record_model_reply(),
            DispatchStatus::BasicReply => metrics::record_basic_reply(),
            DispatchStatus::BasicFallback => metrics::record_fallback_hop(),
            DispatchStatus::EmptyShape => metrics::record_empty_shape(),
            DispatchStatus::Unavailable => metrics::record_unavailable(),
        }

        DispatchOutcome {
            reply,
            status,
            mode: resolved,
        }
    }

    async fn basic_reply(&self, prompt: &str) -> (String, DispatchStatus) {
        let Some(endpoint) = self.basic_endpoint.as_deref() else {
            warn!("basic endpoint not configured");
            return (
                BASIC_UNAVAILABLE_REPLY.to_string(),
                DispatchStatus::Unavailable,
            );
        };

        match self.request_basic(endpoint, prompt).await {
            Ok(Some(text)) => (text, DispatchStatus::BasicReply),
            Ok(None) => (BASIC_SIMPLE_REPLY.to_string(), DispatchStatus::EmptyShape),
            Err(err) => {
                warn!(error = %err, "basic endpoint request failed");
                (
                    BASIC_UNAVAILABLE_REPLY.to_string(),
                    DispatchStatus::Unavailable,
                )
            }
        }
    }

    async fn model_reply(&self, mode: Mode, prompt: &str) -> (String, DispatchStatus) {
        match self.request_chat_completion(mode, prompt).await {
            Ok(Some(content)) => (content, DispatchStatus::ModelReply),
            // Shape problems do not trigger the fallback hop; only
            // transport failures do.
            Ok(None) => (MODEL_NO_REPLY.to_string(), DispatchStatus::EmptyShape),
            Err(err) => {
                warn!(mode = mode.as_str(), error = %err, "chat completion request failed");
                if let Some(endpoint) = self.basic_endpoint.as_deref() {
                    match self.request_basic(endpoint, prompt).await {
                        Ok(Some(text)) => return (text, DispatchStatus::BasicFallback),
                        Ok(None) => {
                            return (
                                BASIC_SIMPLE_REPLY.to_string(),
                                DispatchStatus::BasicFallback,
                            )
                        }
                        Err(basic_err) => {
                            warn!(error = %basic_err, "basic fallback hop failed");
                        }
                    }
                }
                (
                    MODEL_UNREACHABLE_REPLY.to_string(),
                    DispatchStatus::Unavailable,
                )
            }
        }
    }

    /// POST the prompt to a basic endpoint. `Ok(None)` means the endpoint
    /// answered valid JSON without a usable reply field.
    async fn request_basic(
        &self,
        endpoint: &str,
        prompt: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .post(endpoint)
            .json(&BasicPromptRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("basic endpoint returned status {}", response.status()).into());
        }

        let parsed = response.json::<BasicPromptReply>().await?;
        Ok(parsed.into_reply())
    }

    /// POST the prompt to the chat-completion endpoint. `Ok(None)` means
    /// the response parsed but carried no choice content.
    async fn request_chat_completion(
        &self,
        mode: Mode,
        prompt: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let model = self
            .models
            .model_for(mode)
            .ok_or("no model mapped for mode")?;

        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.persona.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let mut request = self.client.post(&self.chat_completions_url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(format!(
                "chat completion endpoint returned status {}",
                response.status()
            )
            .into());
        }

        let parsed = response.json::<ChatCompletionResponse>().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{refused_endpoint, spawn_upstream};

    fn test_config(chat_api_base: Option<String>, basic_endpoint: Option<String>) -> Config {
        Config {
            api_key: Some("sk-test".to_string()),
            chat_api_base,
            basic_endpoint,
            request_timeout_secs: Some(5),
            ..Config::default()
        }
    }

    fn dispatcher(config: &Config) -> Dispatcher {
        Dispatcher::new(config).expect("dispatcher should build")
    }

    #[tokio::test]
    async fn basic_mode_uses_reply_field() {
        let (endpoint, _) = spawn_upstream(200, r#"{"reply": "hi"}"#, 1).await;
        let relay = dispatcher(&test_config(None, Some(endpoint)));

        let outcome = relay.dispatch("basic", "مرحبا").await;
        assert_eq!(outcome.reply, "hi");
        assert_eq!(outcome.status, DispatchStatus::BasicReply);
        assert!(!outcome.mode.defaulted);
    }

    #[tokio::test]
    async fn basic_mode_falls_back_to_text_field() {
        let (endpoint, _) = spawn_upstream(200, r#"{"text": "hi"}"#, 1).await;
        let relay = dispatcher(&test_config(None, Some(endpoint)));

        let outcome = relay.dispatch("basic", "hello").await;
        assert_eq!(outcome.reply, "hi");
        assert_eq!(outcome.status, DispatchStatus::BasicReply);
    }

    #[tokio::test]
    async fn basic_mode_without_reply_fields_substitutes_placeholder() {
        let (endpoint, _) = spawn_upstream(200, r#"{"status": "fine"}"#, 1).await;
        let relay = dispatcher(&test_config(None, Some(endpoint)));

        let outcome = relay.dispatch("basic", "hello").await;
        assert_eq!(outcome.reply, BASIC_SIMPLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::EmptyShape);
    }

    #[tokio::test]
    async fn unreachable_basic_endpoint_substitutes_placeholder() {
        let endpoint = refused_endpoint().await;
        let relay = dispatcher(&test_config(None, Some(endpoint)));

        let outcome = relay.dispatch("basic", "hello").await;
        assert_eq!(outcome.reply, BASIC_UNAVAILABLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::Unavailable);
    }

    #[tokio::test]
    async fn unconfigured_basic_endpoint_substitutes_placeholder() {
        let relay = dispatcher(&test_config(None, None));

        let outcome = relay.dispatch("basic", "hello").await;
        assert_eq!(outcome.reply, BASIC_UNAVAILABLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::Unavailable);
    }

    #[tokio::test]
    async fn basic_endpoint_error_status_substitutes_placeholder() {
        let (endpoint, _) = spawn_upstream(500, r#"{"reply": "ignored"}"#, 1).await;
        let relay = dispatcher(&test_config(None, Some(endpoint)));

        let outcome = relay.dispatch("basic", "hello").await;
        assert_eq!(outcome.reply, BASIC_UNAVAILABLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::Unavailable);
    }

    #[tokio::test]
    async fn pro_mode_extracts_first_choice_content() {
        let (base, captured) = spawn_upstream(
            200,
            r#"{"choices": [{"message": {"content": "hello"}}]}"#,
            1,
        )
        .await;
        let relay = dispatcher(&test_config(Some(base), None));

        let outcome = relay.dispatch("pro", "مرحبا").await;
        assert_eq!(outcome.reply, "hello");
        assert_eq!(outcome.status, DispatchStatus::ModelReply);

        let requests = captured.lock().await;
        let (head, body) = &requests[0];
        assert!(
            head.to_lowercase().contains("authorization: bearer sk-test"),
            "missing bearer credential in: {head}"
        );
        assert_eq!(
            body["model"],
            ModelTable::builtin().model_for(Mode::Pro).unwrap()
        );
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], DEFAULT_PERSONA);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "مرحبا");
    }

    #[tokio::test]
    async fn light_mode_uses_light_model() {
        let (base, captured) = spawn_upstream(
            200,
            r#"{"choices": [{"message": {"content": "ok"}}]}"#,
            1,
        )
        .await;
        let relay = dispatcher(&test_config(Some(base), None));

        let outcome = relay.dispatch("light", "hello").await;
        assert_eq!(outcome.reply, "ok");

        let requests = captured.lock().await;
        assert_eq!(
            requests[0].1["model"],
            ModelTable::builtin().model_for(Mode::Light).unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_mode_dispatches_to_pro_model() {
        let (base, captured) = spawn_upstream(
            200,
            r#"{"choices": [{"message": {"content": "ok"}}]}"#,
            1,
        )
        .await;
        let relay = dispatcher(&test_config(Some(base), None));

        let outcome = relay.dispatch("turbo", "hello").await;
        assert_eq!(outcome.reply, "ok");
        assert!(outcome.mode.defaulted);
        assert_eq!(outcome.mode.mode, Mode::Pro);

        let requests = captured.lock().await;
        assert_eq!(
            requests[0].1["model"],
            ModelTable::builtin().model_for(Mode::Pro).unwrap()
        );
    }

    #[tokio::test]
    async fn malformed_completion_body_substitutes_placeholder_without_fallback() {
        let (base, _) = spawn_upstream(200, r#"{"error": "backend down"}"#, 1).await;
        // A healthy basic endpoint that must NOT be contacted
        let (basic, basic_captured) = spawn_upstream(200, r#"{"reply": "from basic"}"#, 1).await;
        let relay = dispatcher(&test_config(Some(base), Some(basic)));

        let outcome = relay.dispatch("pro", "hello").await;
        assert_eq!(outcome.reply, MODEL_NO_REPLY);
        assert_eq!(outcome.status, DispatchStatus::EmptyShape);
        assert!(basic_captured.lock().await.is_empty());
    }

    #[tokio::test]
    async fn model_transport_failure_hops_to_basic() {
        let base = refused_endpoint().await;
        let (basic, _) = spawn_upstream(200, r#"{"reply": "from basic"}"#, 1).await;
        let relay = dispatcher(&test_config(Some(base), Some(basic)));

        let outcome = relay.dispatch("pro", "hello").await;
        assert_eq!(outcome.reply, "from basic");
        assert_eq!(outcome.status, DispatchStatus::BasicFallback);
    }

    #[tokio::test]
    async fn model_transport_failure_without_basic_substitutes_placeholder() {
        let base = refused_endpoint().await;
        let relay = dispatcher(&test_config(Some(base), None));

        let outcome = relay.dispatch("pro", "hello").await;
        assert_eq!(outcome.reply, MODEL_UNREACHABLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::Unavailable);
    }

    #[tokio::test]
    async fn model_transport_failure_with_dead_basic_substitutes_placeholder() {
        let base = refused_endpoint().await;
        let basic = refused_endpoint().await;
        let relay = dispatcher(&test_config(Some(base), Some(basic)));

        let outcome = relay.dispatch("light", "hello").await;
        assert_eq!(outcome.reply, MODEL_UNREACHABLE_REPLY);
        assert_eq!(outcome.status, DispatchStatus::Unavailable);
    }

    #[tokio::test]
    async fn non_json_completion_body_hops_to_basic() {
        let (base, _) = spawn_upstream(200, "<html>challenge page</html>", 1).await;
        let (basic, _) = spawn_upstream(200, r#"{"reply": "from basic"}"#, 1).await;
        let relay = dispatcher(&test_config(Some(base), Some(basic)));

        let outcome = relay.dispatch("pro", "hello").await;
        assert_eq!(outcome.reply, "from basic");
        assert_eq!(outcome.status, DispatchStatus::BasicFallback);
    }

    #[tokio::test]
    async fn identical_dispatches_yield_identical_replies() {
        let (base, _) = spawn_upstream(
            200,
            r#"{"choices": [{"message": {"content": "deterministic"}}]}"#,
            2,
        )
        .await;
        let relay = dispatcher(&test_config(Some(base), None));

        let first = relay.dispatch("pro", "same prompt").await;
        let second = relay.dispatch("pro", "same prompt").await;
        assert_eq!(first.reply, second.reply);
        assert_eq!(first.status, second.status);
    }

    #[tokio::test]
    async fn every_mode_answers_with_everything_down() {
        let base = refused_endpoint().await;
        let relay = dispatcher(&test_config(Some(base), None));

        for token in ["pro", "light", "basic", "nonsense", ""] {
            let outcome = relay.dispatch(token, "hello").await;
            assert!(
                !outcome.reply.is_empty(),
                "mode {token:?} produced an empty reply"
            );
            assert!(outcome.status.is_placeholder());
        }
    }
}
