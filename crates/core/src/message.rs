//! Conversation messages and the per-call context

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of a tool invocation, attributed to the tool by name
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Identity of the originating tool for tool-result messages.
    /// Messages from the human caller carry no name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    /// Create a tool-result message attributed to a tool
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(tool_name.into()),
        }
    }
}

/// Ordered message history for one call
///
/// Append-only for the lifetime of the session; messages are never reordered
/// or truncated. Owned exclusively by one completion orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append an interaction, attributing tool results to the tool's name
    pub fn push_attributed(&mut self, role: Role, name: Option<&str>, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
            name: name.map(str::to_string),
        });
    }

    /// View the full history
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages so far
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the context holds no messages yet
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Last message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let sys = Message::system("You are an agent");
        let user = Message::user("Hello");
        let tool = Message::tool_result("update_insurance_quote", "{\"premium\":374}");

        assert_eq!(sys.role, Role::System);
        assert_eq!(user.role, Role::User);
        assert!(user.name.is_none());
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.name.as_deref(), Some("update_insurance_quote"));
    }

    #[test]
    fn test_context_append_only() {
        let mut ctx = ConversationContext::with_system_prompt("prompt");
        ctx.push(Message::user("hi"));
        ctx.push_attributed(Role::Tool, Some("transfer_call"), "{\"status\":\"ok\"}");

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.messages()[0].role, Role::System);
        assert_eq!(ctx.last().unwrap().name.as_deref(), Some("transfer_call"));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
