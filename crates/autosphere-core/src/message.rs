//! Typed chat messages exchanged with the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Who produced a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Output of a tool call, fed back to the model
    Tool,
}

impl Role {
    /// Wire name used by chat APIs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Tool-call bookkeeping and provenance
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Set on tool messages: the call being answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Set on assistant messages that asked for tools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn that requests tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.metadata = Some(MessageMetadata {
            tool_calls,
            ..MessageMetadata::default()
        });
        msg
    }

    /// Tool output, linked to its call when the id is known
    pub fn tool(content: impl Into<String>, tool_call_id: Option<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.metadata = tool_call_id.map(|id| MessageMetadata {
            tool_call_id: Some(id),
            ..MessageMetadata::default()
        });
        msg
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(MessageMetadata::default).model = Some(model.into());
        self
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.metadata.as_ref().map_or(&[], |m| m.tool_calls.as_slice())
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.tool_call_id.as_deref())
    }
}

/// Ordered transcript built up during one agent run
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub const fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_assistant_with_model() {
        let msg = Message::assistant("Namaste!").with_model("ibm/granite-3-3-8b-instruct");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.tool_calls().is_empty());
        assert_eq!(
            msg.metadata.as_ref().and_then(|m| m.model.as_deref()),
            Some("ibm/granite-3-3-8b-instruct")
        );
    }

    #[test]
    fn test_tool_call_bookkeeping() {
        let call = ToolCall::new("Weather", HashMap::new());
        let ask = Message::assistant_tool_calls("", vec![call]);
        assert_eq!(ask.tool_calls()[0].name, "Weather");

        let answer = Message::tool("sunny", Some("call-1".into()));
        assert_eq!(answer.role.as_str(), "tool");
        assert_eq!(answer.tool_call_id(), Some("call-1"));
        assert!(Message::tool("sunny", None).metadata.is_none());
    }

    #[test]
    fn test_conversation_keeps_order() {
        let mut conv = Conversation::from_messages(vec![Message::user("Hi")]);
        conv.push(Message::assistant("Hello!"));

        let roles: Vec<_> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(conv.into_messages().len(), 2);
    }
}
