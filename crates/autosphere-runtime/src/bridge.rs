//! Agent Bridge
//!
//! Wires the watsonx.ai chat model, the utility tool set and the AutoSphere
//! instructions into one shared [`Agent`].

use std::sync::Arc;
use std::time::Duration;

use autosphere_core::{Agent, AgentBuilder, AgentError, GenerationOptions, LlmProvider, Result};

use crate::iam::{IAM_TOKEN_URL, IamClient, KeyStatus, TokenSource};
use crate::settings::WatsonxSettings;
use crate::utility::{UtilityToolClient, WatsonxToolkit, build_toolkit};
use crate::watsonx::{WatsonxConfig, WatsonxProvider};

/// Greeting the assistant opens with
pub const GREETING: &str = "Hi, I am AutoSphere AI. How can I help you?";

/// System instructions given to the model
pub const AUTOSPHERE_INSTRUCTIONS: &str = r#"You are a helpful assistant that uses tools to answer questions in detail.
When greeted, say "Hi, I am AutoSphere AI. How can I help you?"
Always leverage IBM Granite models for reasoning, summarization, and translation.
Preprocess and clean input using IBM preprocessing toolkits before generating responses.
Use Retrieval-Augmented Generation (RAG) to provide grounded, factual answers.
Orchestrate workflows with the IBM Agent Development Kit (ADK) for full automation.
Ensure solutions are end-to-end (automate, assist, and optimize tasks fully).
Focus on India-centric and socially impactful applications (agriculture, healthcare, education, etc.).
Always explain the value proposition (how it helps save time, improve efficiency, or reduce costs).
Demonstrate answers in a clear, structured, and actionable way.
If unsure of an answer: say "I don't have that exact information, but I can suggest alternatives or direct you to reliable sources."
If a query is incomplete: say "Can you provide more details so I can give you the most accurate response?"
Never provide misleading or fabricated data.
Always highlight social good and economic growth impact.
Whenever possible, recommend automation workflows rather than manual steps.
Suggest interdisciplinary collaboration if relevant (e.g., healthcare + AI, agriculture + IoT)."#;

/// Endpoint and API key
#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub api_key: String,
    pub iam_url: String,
}

impl Credentials {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            iam_url: IAM_TOKEN_URL.into(),
        }
    }

    #[must_use]
    pub fn with_iam_url(mut self, iam_url: impl Into<String>) -> Self {
        self.iam_url = iam_url.into();
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("iam_url", &self.iam_url)
            .finish()
    }
}

/// Authenticated access to one watsonx.ai project
pub struct ApiClient {
    credentials: Credentials,
    project_id: String,
    tokens: Arc<TokenSource>,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(credentials: Credentials, project_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let iam = IamClient::new(credentials.iam_url.clone(), timeout)?;
        let tokens = Arc::new(TokenSource::new(iam, credentials.api_key.clone()));

        Ok(Self {
            credentials,
            project_id: project_id.into(),
            tokens,
            timeout,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Chat model bound to this project
    pub fn provider(&self) -> Result<WatsonxProvider> {
        let config = WatsonxConfig {
            timeout: self.timeout,
            ..WatsonxConfig::new(self.credentials.url.clone(), self.project_id.clone())
        };
        WatsonxProvider::new(config, self.tokens.clone())
    }

    /// Utility tool client sharing this client's token
    pub fn toolkit(&self) -> Result<WatsonxToolkit> {
        WatsonxToolkit::new(self.credentials.url.clone(), self.tokens.clone(), self.timeout)
    }
}

/// Build the AutoSphere agent for an authenticated project
pub async fn create_agent(client: &ApiClient, options: GenerationOptions) -> Result<Agent> {
    tracing::info!(project_id = %client.project_id(), model = %options.model, "Creating AutoSphere agent");

    let provider: Arc<dyn LlmProvider> = Arc::new(client.provider()?);
    let toolkit: Arc<dyn UtilityToolClient> = Arc::new(client.toolkit()?);

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to watsonx.ai"),
        Ok(false) | Err(_) => tracing::warn!("⚠ watsonx.ai not reachable, chat requests may fail"),
    }

    create_agent_with(provider, toolkit, options).await
}

/// Build the agent from an explicit model and tool client
pub async fn create_agent_with(
    provider: Arc<dyn LlmProvider>,
    toolkit: Arc<dyn UtilityToolClient>,
    options: GenerationOptions,
) -> Result<Agent> {
    let tools = build_toolkit(toolkit).await?;
    tracing::info!(tools = ?tools.names(), "Tool set ready");

    AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .system_prompt(AUTOSPHERE_INSTRUCTIONS)
        .generation(options)
        .build()
}

/// Check the configured API key against IAM and return it.
///
/// A rejected key is `InvalidApiKey`; an unreachable identity service is
/// `Network`.
pub async fn validate_api_key(settings: &WatsonxSettings) -> Result<String> {
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| AgentError::Config("IBM API key is required.".into()))?;

    let iam = IamClient::new(settings.iam_url.clone(), settings.request_timeout)?;
    if let KeyStatus::Invalid = iam.validate(&api_key).await? {
        return Err(AgentError::InvalidApiKey);
    }

    tracing::info!("API key is valid");
    Ok(api_key)
}

/// The configured project id, which must not be blank
pub fn require_project_id(settings: &WatsonxSettings) -> Result<String> {
    settings
        .project_id
        .clone()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AgentError::Config("Project ID is required.".into()))
}

/// Build the agent for an already validated key and project
pub async fn connect(settings: &WatsonxSettings, api_key: String, project_id: String) -> Result<Agent> {
    let credentials = Credentials::new(settings.url.clone(), api_key).with_iam_url(settings.iam_url.clone());
    let client = ApiClient::new(credentials, project_id, settings.request_timeout)?;

    let agent = create_agent(&client, settings.generation_options()).await?;
    tracing::info!("AutoSphere agent created");
    Ok(agent)
}

/// Validate credentials and build the agent.
///
/// The API key is checked before the project id.
pub async fn initialize(settings: &WatsonxSettings) -> Result<Agent> {
    let api_key = validate_api_key(settings).await?;
    let project_id = require_project_id(settings)?;
    connect(settings, api_key, project_id).await
}
