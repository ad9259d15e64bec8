//! Slack transport: Web API client and Socket Mode event feed.

mod api_client;
mod socket;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::IncomingEvent;

pub use api_client::SlackApiClient;
pub use socket::SocketFeed;

/// Conversation type as reported by `conversations.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    Public,
    Private,
    Direct,
    /// The lookup answered `ok: false`; carries Slack's error code.
    Unavailable(String),
}

/// Channel and user lookups needed to decide who a message is from and where it was said.
#[async_trait]
pub trait SlackDirectory {
    async fn channel_kind(&self, channel: &str) -> Result<ChannelKind>;

    /// Real name, falling back to the short user name.
    async fn display_name(&self, user: &str) -> Result<Option<String>>;
}

/// Source of message events for the poll loop.
#[async_trait]
pub trait EventFeed {
    /// Returns the events that arrived since the previous read, possibly none.
    async fn read_events(&mut self) -> Result<Vec<IncomingEvent>>;
}
