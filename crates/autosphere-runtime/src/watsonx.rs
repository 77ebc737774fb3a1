//! watsonx.ai Chat Provider
//!
//! Implementation of `LlmProvider` over the watsonx.ai text chat API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autosphere_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http::{build_client, ensure_success, transport_error};
use crate::iam::TokenSource;

/// API version date sent with every request
pub const API_VERSION: &str = "2024-10-08";

/// watsonx.ai provider configuration
#[derive(Clone, Debug)]
pub struct WatsonxConfig {
    /// Regional endpoint, e.g. `https://us-south.ml.cloud.ibm.com`
    pub url: String,

    /// Project the inference is billed to
    pub project_id: String,

    /// API version date
    pub api_version: String,

    /// Request timeout
    pub timeout: Duration,
}

impl WatsonxConfig {
    pub fn new(url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            project_id: project_id.into(),
            api_version: API_VERSION.into(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// watsonx.ai LLM provider
pub struct WatsonxProvider {
    http: Client,
    config: WatsonxConfig,
    tokens: Arc<TokenSource>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// Usually a JSON-encoded string, occasionally an object
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ModelSpecs {
    #[serde(default)]
    resources: Vec<ModelSpec>,
}

#[derive(Debug, Deserialize)]
struct ModelSpec {
    model_id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    model_limits: Option<ModelLimits>,
}

#[derive(Debug, Deserialize)]
struct ModelLimits {
    #[serde(default)]
    max_sequence_length: Option<u32>,
}

impl WatsonxProvider {
    pub fn new(config: WatsonxConfig, tokens: Arc<TokenSource>) -> Result<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.url.trim_end_matches('/'))
    }

    /// Convert agent messages to the chat wire format
    fn convert_messages(messages: &[Message], system_prompt: Option<&str>) -> Vec<Value> {
        let system = system_prompt.map(|s| json!({"role": "system", "content": s}));

        system
            .into_iter()
            .chain(messages.iter().map(|m| match m.role {
                Role::Assistant if !m.tool_calls().is_empty() => json!({
                    "role": "assistant",
                    "content": m.content,
                    "tool_calls": m.tool_calls().iter().map(|call| json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments_value().to_string(),
                        }
                    })).collect::<Vec<_>>(),
                }),
                Role::Tool => json!({
                    "role": "tool",
                    "content": m.content,
                    "tool_call_id": m.tool_call_id(),
                }),
                role => json!({"role": role.as_str(), "content": m.content}),
            }))
            .collect()
    }

    /// Convert tool schemas to function definitions
    fn convert_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect()
    }

    fn build_payload(&self, messages: &[Message], tools: &[ToolSchema], opts: &GenerationOptions) -> Value {
        let mut payload = json!({
            "model_id": opts.model,
            "project_id": self.config.project_id,
            "messages": Self::convert_messages(messages, opts.system_prompt.as_deref()),
            "max_tokens": opts.max_tokens,
            "temperature": opts.temperature,
            "top_p": opts.top_p,
            "frequency_penalty": opts.frequency_penalty,
            "presence_penalty": opts.presence_penalty,
        });

        if !tools.is_empty() {
            payload["tools"] = Value::Array(Self::convert_tools(tools));
            payload["tool_choice_option"] = json!("auto");
        }

        payload
    }

    fn convert_tool_call(call: WireToolCall) -> Result<ToolCall> {
        let arguments: HashMap<String, Value> = match call.function.arguments {
            Value::Null => HashMap::new(),
            Value::String(s) if s.trim().is_empty() => HashMap::new(),
            Value::String(s) => serde_json::from_str(&s).map_err(|e| {
                AgentError::MalformedResponse(format!(
                    "arguments for '{}' are not a JSON object: {e}",
                    call.function.name
                ))
            })?,
            Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(AgentError::MalformedResponse(format!(
                    "arguments for '{}' have unexpected shape: {other}",
                    call.function.name
                )));
            }
        };

        Ok(ToolCall {
            name: call.function.name,
            arguments,
            id: call.id,
        })
    }

    /// Convert a chat response to an agent completion
    fn convert_completion(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::MalformedResponse("chat response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(Self::convert_tool_call)
            .collect::<Result<Vec<_>>>()?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model_id.unwrap_or_else(|| model.to_string()),
            usage: response.usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn specs_url(&self, limit: u32) -> String {
        format!(
            "{}?version={}&limit={limit}",
            self.endpoint("/ml/v1/foundation_model_specs"),
            self.config.api_version
        )
    }
}

#[async_trait]
impl LlmProvider for WatsonxProvider {
    async fn health_check(&self) -> Result<bool> {
        match self.http.get(self.specs_url(1)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("watsonx health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let token = self.tokens.bearer().await?;
        let url = format!(
            "{}?version={}",
            self.endpoint("/ml/v1/text/chat"),
            self.config.api_version
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&self.build_payload(messages, tools, options))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let body: ChatResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("chat response: {e}")))?;

        let completion = Self::convert_completion(body, &options.model)?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                tool_calls = completion.tool_calls.len(),
                "watsonx completion"
            );
        }

        Ok(completion)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .http
            .get(self.specs_url(200))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let specs: ModelSpecs = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("model specs: {e}")))?;

        Ok(specs
            .resources
            .into_iter()
            .map(|m| ModelInfo {
                name: m.label.unwrap_or_else(|| m.model_id.clone()),
                id: m.model_id,
                context_length: m.model_limits.and_then(|l| l.max_sequence_length),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::IamClient;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer) -> WatsonxProvider {
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "expiration": chrono::Utc::now().timestamp() + 3600
            })))
            .mount(server)
            .await;

        let iam = IamClient::new(format!("{}/identity/token", server.uri()), Duration::from_secs(5)).unwrap();
        let tokens = Arc::new(TokenSource::new(iam, "test-key"));
        WatsonxProvider::new(WatsonxConfig::new(server.uri(), "proj-123"), tokens).unwrap()
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            system_prompt: Some("Be helpful.".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_basic() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/chat"))
            .and(query_param("version", API_VERSION))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "model_id": "ibm/granite-3-3-8b-instruct",
                "project_id": "proj-123",
                "max_tokens": 2000,
                "messages": [
                    {"role": "system", "content": "Be helpful."},
                    {"role": "user", "content": "Hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chat-1",
                "model_id": "ibm/granite-3-3-8b-instruct",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi, I am AutoSphere AI. How can I help you?"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 11, "total_tokens": 23}
            })))
            .mount(&server)
            .await;

        let completion = provider
            .complete(&[Message::user("Hello")], &[], &options())
            .await
            .unwrap();

        assert_eq!(completion.content, "Hi, I am AutoSphere AI. How can I help you?");
        assert!(completion.tool_calls.is_empty());
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage.unwrap().total_tokens, 23);
    }

    #[tokio::test]
    async fn test_complete_tool_request() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/chat"))
            .and(body_partial_json(json!({
                "tools": [{"type": "function", "function": {"name": "Weather"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "tool_calls": [{
                            "id": "chatcmpl-tool-1",
                            "type": "function",
                            "function": {"name": "Weather", "arguments": "{\"input\": \"Chennai\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let tools = vec![ToolSchema {
            name: "Weather".into(),
            description: "Weather lookup".into(),
            input_schema: json!({"type": "object", "properties": {"input": {"type": "string"}}}),
        }];

        let completion = provider
            .complete(&[Message::user("Weather in Chennai?")], &tools, &options())
            .await
            .unwrap();

        assert_eq!(completion.content, "");
        assert_eq!(completion.tool_calls.len(), 1);
        let call = &completion.tool_calls[0];
        assert_eq!(call.name, "Weather");
        assert_eq!(call.id.as_deref(), Some("chatcmpl-tool-1"));
        assert_eq!(call.arguments.get("input"), Some(&json!("Chennai")));
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolCalls));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = provider
            .complete(&[Message::user("Hello")], &[], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/chat"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = provider
            .complete(&[Message::user("Hello")], &[], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Auth(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider
            .complete(&[Message::user("Hello")], &[], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        let provider = setup(&server).await;

        Mock::given(method("GET"))
            .and(path("/ml/v1/foundation_model_specs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [{
                    "model_id": "ibm/granite-3-3-8b-instruct",
                    "label": "granite-3-3-8b-instruct",
                    "model_limits": {"max_sequence_length": 131072}
                }]
            })))
            .mount(&server)
            .await;

        let models = provider.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "ibm/granite-3-3-8b-instruct");
        assert_eq!(models[0].context_length, Some(131_072));
        assert!(provider.health_check().await.unwrap());
    }

    #[test]
    fn test_message_conversion() {
        let mut call = ToolCall::new("Wikipedia", HashMap::from([("input".into(), json!("Kerala"))]));
        call.id = Some("c1".into());
        let messages = vec![
            Message::user("Tell me about Kerala"),
            Message::assistant_tool_calls("", vec![call]),
            Message::tool("Kerala is a state in India.", Some("c1".into())),
        ];

        let converted = WatsonxProvider::convert_messages(&messages, Some("sys"));
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0]["role"], "system");
        assert_eq!(converted[2]["tool_calls"][0]["function"]["name"], "Wikipedia");
        assert_eq!(
            converted[2]["tool_calls"][0]["function"]["arguments"],
            "{\"input\":\"Kerala\"}"
        );
        assert_eq!(converted[3]["tool_call_id"], "c1");
    }
}
