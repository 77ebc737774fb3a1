//! # autosphere-runtime
//!
//! IBM Cloud integrations for the AutoSphere agent.
//!
//! ## Components
//!
//! - **IAM**: API key validation and cached bearer tokens
//! - **watsonx.ai chat**: `LlmProvider` over the text chat API
//! - **Utility tools**: remote search, crawl, encyclopedia and weather tools
//! - **Bridge**: builds the shared [`Agent`] from settings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autosphere_runtime::{WatsonxSettings, initialize};
//!
//! let agent = initialize(&WatsonxSettings::from_env()).await?;
//! let reply = agent.respond("Hello", &[], None).await?;
//! ```

pub mod bridge;
mod http;
pub mod iam;
pub mod settings;
pub mod utility;
pub mod watsonx;

pub use bridge::{
    AUTOSPHERE_INSTRUCTIONS, ApiClient, Credentials, GREETING, connect, create_agent, create_agent_with, initialize,
    require_project_id, validate_api_key,
};
pub use iam::{IamClient, KeyStatus, TokenSource};
pub use settings::{WatsonxSettings, is_placeholder};
pub use utility::{ToolInput, UtilityAgentTool, UtilityToolClient, WatsonxToolkit, build_tool, build_toolkit};
pub use watsonx::{WatsonxConfig, WatsonxProvider};

// Re-export core types for convenience
pub use autosphere_core::{Agent, AgentError, ChatTurn, LlmProvider, Result, ThreadId};
