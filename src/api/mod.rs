//! Wire payloads for the daemon's `/api/chat` and `/api/pull` endpoints.

use serde::{Deserialize, Deserializer, Serialize};

pub mod client;

pub use client::DaemonClient;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Daemons emit this for models with system prompts. It is never
    /// produced locally.
    System,
    /// Tool results in the daemon's chat protocol. Never produced locally.
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }

    pub fn from_wire(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

/// Stream lines only need their content, so a role this crate does not know
/// reads as `None` instead of failing the call.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let role = Option::<String>::deserialize(deserializer)?;
    Ok(role.as_deref().and_then(Role::from_wire))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// One line of the `/api/chat` stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    /// Set when the daemon fails after it already answered 200.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

impl ChatChunk {
    /// The incremental text carried by this line, if any.
    pub fn content_delta(&self) -> &str {
        self.message
            .as_ref()
            .map(|message| message.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub model: &'a str,
}

/// One line of the `/api/pull` stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullChunk {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub error: Option<String>,
}

pub const PULL_SUCCESS_STATUS: &str = "success";

impl PullChunk {
    pub fn is_success(&self) -> bool {
        self.status == PULL_SUCCESS_STATUS
    }
}
