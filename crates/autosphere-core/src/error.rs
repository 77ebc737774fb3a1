//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// The identity endpoint rejected the API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Transport failure (connect, timeout, TLS) talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Remote service refused our credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Remote service answered with a body we could not understand
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Agent produced no messages to take a reply from
    #[error("Agent output contained no messages")]
    EmptyOutput,

    /// Agent was never constructed
    #[error("AI service not initialized")]
    NotInitialized,

    /// Checkpoint store error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidApiKey => "Invalid API Key. Please check and try again.".into(),
            Self::Network(_) | Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::Auth(_) => "The AI service rejected our credentials. Please check your configuration.".into(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::MaxIterations(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::NotInitialized => {
                "Sorry, the AI service is not initialized. Please check your configuration.".into()
            }
            Self::Config(msg) => msg.clone(),
            _ => "Sorry, I encountered an error while processing your message. Please try again."
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_services_share_a_message() {
        let network = AgentError::Network("reset".into()).user_message();
        assert_eq!(network, AgentError::ProviderUnavailable("503".into()).user_message());
        assert!(network.contains("currently unavailable"));
    }

    #[test]
    fn test_upstream_errors_get_generic_apology() {
        let err = AgentError::ToolExecution("boom".into());
        assert!(err.user_message().starts_with("Sorry, I encountered an error"));
        assert!(!err.user_message().contains("boom"));
    }

    #[test]
    fn test_config_message_passes_through() {
        let err = AgentError::Config("Project ID is required".into());
        assert_eq!(err.user_message(), "Project ID is required");
    }
}
