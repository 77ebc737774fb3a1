//! # autosphere-core
//!
//! Core agent logic: provider-agnostic chat model abstraction, tool registry,
//! message adapter and checkpoint memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                   │
//! │  ┌─────────────┐  ┌─────────────────────┐                   │
//! │  │   Message   │  │   CheckpointStore   │                   │
//! │  │   Adapter   │  │   (per thread)      │                   │
//! │  └─────────────┘  └─────────────────────┘                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod checkpoint;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use adapter::{AgentOutput, ChatTurn, extract_reply, to_internal};
pub use checkpoint::{CheckpointStore, MemoryCheckpointStore, ThreadId};
pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
