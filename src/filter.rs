//! Decides which incoming event, if any, is addressed to the bot.

use log::{debug, info};

use crate::error::Result;
use crate::slack::{ChannelKind, SlackDirectory};
use crate::types::IncomingEvent;

/// Who said it, as shown back to them in replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub user_id: String,
    pub display_name: String,
}

impl Speaker {
    pub fn first_name(&self) -> &str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.user_id)
    }
}

/// A message the bot should answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedCommand {
    pub text: String,
    pub channel: String,
    pub speaker: Speaker,
}

pub struct OutputFilter {
    bot_id: String,
    mention: String,
}

impl OutputFilter {
    pub fn new(bot_id: &str) -> Self {
        Self {
            bot_id: bot_id.to_string(),
            mention: format!("<@{bot_id}>"),
        }
    }

    pub fn mention_token(&self) -> &str {
        &self.mention
    }

    /// Returns the first event addressed to the bot.
    ///
    /// An event qualifies when it has text and a channel and either mentions the bot
    /// or arrived in a direct message the bot did not write itself.
    pub async fn select<D>(
        &self,
        events: &[IncomingEvent],
        directory: &D,
    ) -> Result<Option<AddressedCommand>>
    where
        D: SlackDirectory + Sync + ?Sized,
    {
        for event in events {
            let (Some(text), Some(channel)) = (event.text.as_deref(), event.channel.as_deref())
            else {
                continue;
            };
            let Some(user) = event.user.as_deref().filter(|user| !user.is_empty()) else {
                continue;
            };

            // The bot's own direct messages are never answered; mentions always are.
            let addressed = text.contains(&self.mention)
                || (user != self.bot_id && is_direct_message(channel, directory).await?);
            if !addressed {
                continue;
            }

            let display_name = match directory.display_name(user).await? {
                Some(name) => name,
                None => {
                    debug!("No display name for user {user}, using the user id");
                    user.to_string()
                }
            };
            info!(
                "Command from {} in channel {} at {}: {}",
                display_name,
                channel,
                event
                    .timestamp()
                    .map_or_else(|| "unknown time".to_string(), |ts| ts.to_rfc3339()),
                text
            );

            return Ok(Some(AddressedCommand {
                text: text.trim().to_string(),
                channel: channel.to_string(),
                speaker: Speaker {
                    user_id: user.to_string(),
                    display_name,
                },
            }));
        }
        Ok(None)
    }
}

async fn is_direct_message<D>(channel: &str, directory: &D) -> Result<bool>
where
    D: SlackDirectory + Sync + ?Sized,
{
    if channel.starts_with('D') {
        return Ok(true);
    }
    // Unavailable lookups count as not a DM.
    Ok(directory.channel_kind(channel).await? == ChannelKind::Direct)
}
