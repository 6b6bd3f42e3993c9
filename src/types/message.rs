use serde::{Deserialize, Serialize};

use crate::Error;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in a chat conversation.
///
/// Messages read from callers always carry non-blank content; deserialization
/// goes through [`Message::new`] so the check cannot be skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    role: Role,
    content: String,
}

#[derive(Deserialize)]
struct RawMessage {
    role: Role,
    content: String,
}

impl TryFrom<RawMessage> for Message {
    type Error = Error;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Message::new(raw.role, raw.content)
    }
}

impl Message {
    /// Create a new message, rejecting empty or whitespace-only content.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, Error> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::invalid_input(format!(
                "{} message content must not be empty",
                role.as_str()
            )));
        }
        Ok(Message { role, content })
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Result<Self, Error> {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Result<Self, Error> {
        Self::new(Role::User, content)
    }

    /// Wrap generated text as the assistant reply.
    ///
    /// Backends may legitimately produce an empty completion, so this skips
    /// the content check applied to caller-supplied messages.
    pub(crate) fn assistant_reply(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Get the role of this message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the text content of this message.
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_content() {
        assert!(Message::user("").is_err());
        assert!(matches!(
            Message::user("  \n\t"),
            Err(Error::InvalidInput(_))
        ));
        assert!(Message::system("Be brief.").is_ok());
    }

    #[test]
    fn test_deserialize_validates_content() {
        let ok: Message = serde_json::from_str(r#"{"role":"user","content":"Hello"}"#).unwrap();
        assert_eq!(ok.role(), Role::User);
        assert_eq!(ok.content(), "Hello");

        let blank = serde_json::from_str::<Message>(r#"{"role":"user","content":"   "}"#);
        assert!(blank.is_err());

        let bad_role = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(bad_role.is_err());
    }

    #[test]
    fn test_serializes_lowercase_role() {
        let message = Message::assistant_reply("Hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hi"}));
    }
}
