//! Common types used throughout the coey bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message event read from the Slack feed.
///
/// Every field is optional on the wire; the output filter only considers
/// events carrying both `text` and `channel`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncomingEvent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

impl IncomingEvent {
    /// Parses the Slack `ts` (`"<seconds>.<micros>"`) into a UTC timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let ts = self.ts.as_deref()?;
        let (secs, micros) = ts.split_once('.').unwrap_or((ts, "0"));
        let secs: i64 = secs.parse().ok()?;
        let micros: u32 = micros.parse().ok()?;
        DateTime::from_timestamp(secs, micros.checked_mul(1000)?)
    }
}

/// Opaque session token threaded through intent-service turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext(String);

impl ConversationContext {
    /// Starts a new session with a random identifier.
    pub fn fresh() -> Self {
        ConversationContext(uuid::Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationContext {
    fn from(session_id: String) -> Self {
        ConversationContext(session_id)
    }
}

/// A single Slack message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub pretext: String,
    pub mrkdwn_in: Vec<&'static str>,
}

/// Payload for `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub channel: String,
    #[serde(skip)]
    pub pretext: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    /// Wraps `pretext` in the one markdown attachment every reply carries.
    pub fn with_pretext(channel: impl Into<String>, pretext: impl Into<String>) -> Self {
        let pretext = pretext.into();
        Self {
            channel: channel.into(),
            attachments: vec![Attachment {
                pretext: pretext.clone(),
                mrkdwn_in: vec!["pretext"],
            }],
            pretext,
        }
    }
}
