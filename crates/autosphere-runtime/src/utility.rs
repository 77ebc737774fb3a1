//! Utility Agent Tools
//!
//! Adapters for the remote tools watsonx.ai hosts (search, crawl,
//! encyclopedia, weather). Each adapter is built once from the remote
//! definition; every invocation is one uncached remote run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autosphere_core::{AgentError, Result, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::http::{build_client, ensure_success, transport_error};
use crate::iam::TokenSource;

/// Definition of a remote tool as published by the toolkit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteToolDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Longer description written for agents, preferred when present
    #[serde(default)]
    pub agent_description: Option<String>,

    /// JSON Schema of the structured input, if the tool takes one
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Remote toolkit access (Strategy pattern)
#[async_trait]
pub trait UtilityToolClient: Send + Sync {
    /// Fetch a tool's published definition
    async fn get_tool(&self, name: &str) -> Result<RemoteToolDefinition>;

    /// Run a tool and return its `output` field
    async fn run(&self, name: &str, input: Value, config: Option<&Value>) -> Result<Value>;
}

/// HTTP client for the watsonx.ai utility agent tools API
pub struct WatsonxToolkit {
    http: Client,
    base_url: String,
    tokens: Arc<TokenSource>,
}

impl WatsonxToolkit {
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenSource>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }
}

#[async_trait]
impl UtilityToolClient for WatsonxToolkit {
    async fn get_tool(&self, name: &str) -> Result<RemoteToolDefinition> {
        let token = self.tokens.bearer().await?;
        let response = self
            .http
            .get(format!("{}/v1-beta/utility_agent_tools/{name}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("tool definition for '{name}': {e}")))
    }

    async fn run(&self, name: &str, input: Value, config: Option<&Value>) -> Result<Value> {
        let token = self.tokens.bearer().await?;

        let mut payload = json!({"tool_name": name, "input": input});
        if let Some(config) = config {
            payload["config"] = config.clone();
        }

        let response = self
            .http
            .post(format!("{}/v1-beta/utility_agent_tools/run", self.base_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let mut body: Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("tool run for '{name}': {e}")))?;

        body.get_mut("output")
            .map(Value::take)
            .ok_or_else(|| AgentError::MalformedResponse(format!("tool run for '{name}' has no output")))
    }
}

/// How a tool's arguments are forwarded, fixed when the tool is built
#[derive(Clone, Debug, PartialEq)]
pub enum ToolInput {
    /// Forward the whole argument object, validated against this schema
    Structured(Value),
    /// Forward only the free-text `input` argument as the query
    FreeText,
}

impl ToolInput {
    fn from_definition(schema: Option<Value>) -> Self {
        schema.map_or(Self::FreeText, Self::Structured)
    }

    /// Schema advertised to the model
    pub fn schema(&self) -> Value {
        match self {
            Self::Structured(schema) => schema.clone(),
            Self::FreeText => json!({
                "type": "object",
                "additionalProperties": false,
                "$schema": "http://json-schema.org/draft-07/schema#",
                "properties": {
                    "input": {
                        "description": "input for the tool",
                        "type": "string"
                    }
                }
            }),
        }
    }

    fn query(&self, call: &ToolCall) -> Result<Value> {
        match self {
            Self::Structured(_) => Ok(call.arguments_value()),
            Self::FreeText => call
                .arguments
                .get("input")
                .cloned()
                .ok_or_else(|| AgentError::ToolValidation(format!("{} needs an 'input' argument", call.name))),
        }
    }
}

/// Local overrides applied when building a tool
#[derive(Clone, Debug, Default)]
pub struct ToolOverrides {
    pub description: Option<String>,
}

/// A remote utility tool exposed to the agent
pub struct UtilityAgentTool {
    name: String,
    description: String,
    input: ToolInput,
    config: Option<Value>,
    client: Arc<dyn UtilityToolClient>,
}

impl UtilityAgentTool {
    pub const fn input(&self) -> &ToolInput {
        &self.input
    }
}

#[async_trait]
impl Tool for UtilityAgentTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input.schema(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let query = self.input.query(call)?;
        let output = self.client.run(&self.name, query, self.config.as_ref()).await?;

        let text = match output {
            Value::String(s) => s,
            other => other.to_string(),
        };

        Ok(ToolResult::success(self.name.clone(), text))
    }
}

/// Build one tool adapter from its remote definition.
///
/// Description precedence: override, then `agent_description`, then
/// `description`.
pub async fn build_tool(
    name: &str,
    params: Option<Value>,
    client: Arc<dyn UtilityToolClient>,
    overrides: ToolOverrides,
) -> Result<UtilityAgentTool> {
    let definition = client.get_tool(name).await?;

    let description = overrides
        .description
        .or(definition.agent_description)
        .unwrap_or(definition.description);

    Ok(UtilityAgentTool {
        name: name.to_string(),
        description,
        input: ToolInput::from_definition(definition.input_schema),
        config: params,
        client,
    })
}

/// A tool to register and the config sent with each of its runs
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub config: Option<Value>,
}

/// The fixed tool set
pub fn default_tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec { name: "GoogleSearch", config: None },
        ToolSpec { name: "WebCrawler", config: Some(json!({})) },
        ToolSpec { name: "Wikipedia", config: Some(json!({"maxResults": 5})) },
        ToolSpec { name: "DuckDuckGo", config: Some(json!({})) },
        ToolSpec { name: "Weather", config: Some(json!({})) },
    ]
}

/// Build and register every tool of the fixed set
pub async fn build_toolkit(client: Arc<dyn UtilityToolClient>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    for spec in default_tool_specs() {
        let tool = build_tool(spec.name, spec.config, client.clone(), ToolOverrides::default()).await?;
        tracing::debug!(tool = spec.name, input = ?tool.input(), "Registered utility tool");
        registry.register(tool);
    }

    Ok(registry)
}
