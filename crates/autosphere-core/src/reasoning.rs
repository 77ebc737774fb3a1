//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! The agent asks the model, runs whatever tools it requests, feeds the
//! results back, and stops once the model answers in plain text.

use futures::future::join_all;
use std::sync::Arc;

use crate::adapter::{self, AgentOutput, ChatTurn};
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore, ThreadId};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Instructions sent as the system prompt
    pub system_prompt: String,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that uses tools to answer questions in detail.";

/// The composed agent: model, tools, instructions and checkpoint memory
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            checkpoints,
            config,
        }
    }

    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            system_prompt: Some(self.config.system_prompt.clone()),
            ..self.config.generation.clone()
        }
    }

    /// Run the agent over an explicit message history.
    ///
    /// The returned output holds the history followed by every message the
    /// run produced. When `thread` is given the transcript is checkpointed
    /// under it. Checkpoints are a transcript record only: later runs never
    /// read them, so `history` alone decides what the model sees.
    pub async fn invoke(
        &self,
        history: Vec<Message>,
        thread: Option<&ThreadId>,
    ) -> Result<AgentOutput> {
        let mut conversation = Conversation::from_messages(history);
        let options = self.generation_options();
        let schemas = self.tools.schemas();

        for iteration in 1..=self.config.max_iterations {
            let completion = self
                .provider
                .complete(conversation.messages(), &schemas, &options)
                .await?;

            let mut calls = completion.tool_calls;
            if calls.is_empty() {
                calls.extend(parse_tool_call(&completion.content));
            }

            if calls.is_empty() {
                conversation.push(Message::assistant(completion.content).with_model(completion.model));
                let output = AgentOutput {
                    messages: conversation.into_messages(),
                };

                if let Some(thread) = thread {
                    self.checkpoints.put(thread, output.messages.clone())?;
                }

                return Ok(output);
            }

            for call in &mut calls {
                if call.id.is_none() {
                    call.id = Some(uuid::Uuid::new_v4().to_string());
                }
            }

            tracing::debug!(
                iteration,
                tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Executing tool calls"
            );

            conversation.push(Message::assistant_tool_calls(completion.content, calls.clone()));

            let results = join_all(calls.iter().map(|call| self.execute_tool(call))).await;
            for result in results {
                let content = format_tool_result(&result);
                conversation.push(Message::tool(content, result.id));
            }
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// Answer `message` given the caller's turns so far
    pub async fn respond(
        &self,
        message: &str,
        history: &[ChatTurn],
        thread: Option<&ThreadId>,
    ) -> Result<String> {
        let messages = adapter::compose(message, history);
        let output = self.invoke(messages, thread).await?;
        adapter::extract_reply(&output)
    }

    /// Execute a tool call, folding failures into the result
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        let result = match self.tools.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::failure(call.name.clone(), format!("Error: {e}"))
            }
        };

        match &call.id {
            Some(id) => result.with_id(id.clone()),
            None => result,
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the checkpoint store
    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("tools", &self.tools.names())
            .field("model", &self.config.generation.model)
            .field("max_iterations", &self.config.max_iterations)
            .finish_non_exhaustive()
    }
}

/// Parse a fenced ```` ```tool ```` JSON block from a plain-text answer
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    const TOOL_START: &str = "```tool";
    const TOOL_END: &str = "```";

    let start_idx = content.find(TOOL_START)?;
    let after_marker = &content[start_idx + TOOL_START.len()..];
    let end_idx = after_marker.find(TOOL_END)?;

    serde_json::from_str::<ToolCall>(after_marker[..end_idx].trim()).ok()
}

fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        result.output.clone()
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            checkpoints: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let checkpoints = self
            .checkpoints
            .unwrap_or_else(|| Arc::new(MemoryCheckpointStore::new()));

        Ok(Agent::new(provider, Arc::new(self.tools), checkpoints, self.config))
    }
}
