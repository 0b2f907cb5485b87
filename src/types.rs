//! Discord REST payloads used by the poll lifecycle.
//!
//! Only the fields this crate reads or writes are modelled; everything else
//! in Discord's responses is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Body of `POST /channels/{channel.id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollCreateRequest>,
}

impl CreateMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            poll: None,
        }
    }

    /// Message carrying only a poll
    pub fn poll(poll: PollCreateRequest) -> Self {
        Self {
            content: String::new(),
            poll: Some(poll),
        }
    }
}

/// Poll create request object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollCreateRequest {
    pub question: PollMedia,
    pub answers: Vec<PollAnswer>,
    /// Hours the poll stays open
    pub duration: u32,
    pub allow_multiselect: bool,
    pub layout_type: u8,
}

/// The only layout Discord currently supports
pub const LAYOUT_DEFAULT: u8 = 1;

/// Text and optional emoji of a question or answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PartialEmoji>,
}

/// Custom emoji by `id` or unicode emoji by `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEmoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Poll answer; `answer_id` is assigned by Discord and absent on creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<u32>,
    pub poll_media: PollMedia,
}

/// Message object (subset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub poll: Option<Poll>,
}

/// Poll object as returned inside a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    #[serde(default)]
    pub question: PollMedia,
    #[serde(default)]
    pub answers: Vec<PollAnswer>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub allow_multiselect: bool,
    #[serde(default)]
    pub results: Option<PollResults>,
}

/// Vote counts; only answers with at least one vote are listed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResults {
    #[serde(default)]
    pub is_finalized: bool,
    #[serde(default)]
    pub answer_counts: Vec<AnswerCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCount {
    pub id: u32,
    pub count: u32,
    #[serde(default)]
    pub me_voted: bool,
}

/// Channel object (subset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Error body Discord attaches to failed requests
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

/// Body of a 429 response
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimited {
    /// Seconds to wait before retrying
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}
