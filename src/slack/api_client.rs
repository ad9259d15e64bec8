//! Slack Web API calls used by the poll loop, the output filter and the reply dispatcher.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{BotError, Result};
use crate::types::OutgoingMessage;

use super::{ChannelKind, SlackDirectory};

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationInfoResponse {
    ok: bool,
    channel: Option<ConversationInfo>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConversationInfo {
    is_channel: bool,
    is_group: bool,
    is_private: bool,
    is_im: bool,
    is_mpim: bool,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    ok: bool,
    user: Option<UserInfo>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    app_token: String,
}

impl SlackApiClient {
    pub fn new(api_base: &str, bot_token: &str, app_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            app_token: app_token.trim().to_string(),
        }
    }

    /// Resolves the bot's own user id.
    pub async fn auth_test(&self) -> Result<String> {
        let response: AuthTestResponse = self
            .send(
                "auth.test",
                self.http.post(self.url("auth.test")).bearer_auth(&self.bot_token),
            )
            .await?;
        if !response.ok {
            return Err(BotError::slack("auth.test", response.error));
        }
        response
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| BotError::slack("auth.test", Some("missing user_id".to_string())))
    }

    /// Requests a Socket Mode websocket URL with the app-level token.
    pub async fn open_socket_connection(&self) -> Result<String> {
        let response: OpenSocketResponse = self
            .send(
                "apps.connections.open",
                self.http
                    .post(self.url("apps.connections.open"))
                    .bearer_auth(&self.app_token),
            )
            .await?;
        if !response.ok {
            return Err(BotError::slack("apps.connections.open", response.error));
        }
        response.url.filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            BotError::slack("apps.connections.open", Some("missing url".to_string()))
        })
    }

    pub async fn post_message(&self, message: &OutgoingMessage) -> Result<()> {
        let response: PostMessageResponse = self
            .send(
                "chat.postMessage",
                self.http
                    .post(self.url("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(message),
            )
            .await?;
        if !response.ok {
            return Err(BotError::slack("chat.postMessage", response.error));
        }
        Ok(())
    }

    /// Posts plain text, used for the startup greeting.
    pub async fn post_text(&self, channel: &str, text: &str) -> Result<()> {
        let response: PostMessageResponse = self
            .send(
                "chat.postMessage",
                self.http
                    .post(self.url("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(&serde_json::json!({ "channel": channel, "text": text })),
            )
            .await?;
        if !response.ok {
            return Err(BotError::slack("chat.postMessage", response.error));
        }
        Ok(())
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        debug!("Calling Slack API method {method}");
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SlackDirectory for SlackApiClient {
    async fn channel_kind(&self, channel: &str) -> Result<ChannelKind> {
        let response: ConversationInfoResponse = self
            .send(
                "conversations.info",
                self.http
                    .get(self.url("conversations.info"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel)]),
            )
            .await?;

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown error".to_string());
            warn!("conversations.info failed for channel {channel}: {error}");
            return Ok(ChannelKind::Unavailable(error));
        }

        let info = response.channel.unwrap_or_default();
        let kind = if info.is_im || info.is_mpim {
            ChannelKind::Direct
        } else if info.is_group || info.is_private {
            ChannelKind::Private
        } else if info.is_channel {
            ChannelKind::Public
        } else {
            ChannelKind::Unavailable("unrecognized conversation type".to_string())
        };
        Ok(kind)
    }

    async fn display_name(&self, user: &str) -> Result<Option<String>> {
        let response: UserInfoResponse = self
            .send(
                "users.info",
                self.http
                    .get(self.url("users.info"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user)]),
            )
            .await?;
        if !response.ok {
            return Err(BotError::slack("users.info", response.error));
        }

        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Ok(response
            .user
            .and_then(|info| non_empty(info.real_name).or_else(|| non_empty(info.name))))
    }
}
