//! Application State

use std::sync::Arc;

use autosphere_core::Agent;
use tokio::sync::OnceCell;

/// Shared application state
#[derive(Clone, Default)]
pub struct AppState {
    /// The agent, set once by the background initializer
    agent: Arc<OnceCell<Arc<Agent>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with an already built agent
    #[cfg(test)]
    pub fn with_agent(agent: Agent) -> Self {
        let state = Self::new();
        state.install(agent);
        state
    }

    /// Publish the agent; later calls are ignored
    pub fn install(&self, agent: Agent) {
        if self.agent.set(Arc::new(agent)).is_err() {
            tracing::warn!("Agent already initialized, ignoring replacement");
        }
    }

    pub fn agent(&self) -> Option<Arc<Agent>> {
        self.agent.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.agent.initialized()
    }
}
