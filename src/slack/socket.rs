//! Slack Socket Mode event feed.
//!
//! Each read drains the frames already buffered on the websocket, acknowledges
//! every envelope and hands back the message events it carried. Nothing blocks
//! waiting for new frames; the poll loop's sleep paces the reads.

use async_trait::async_trait;
use futures::{FutureExt, SinkExt, StreamExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

use crate::error::{BotError, Result};
use crate::types::IncomingEvent;

use super::{EventFeed, SlackApiClient};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SocketEnvelope {
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    #[serde(rename = "type")]
    callback_type: String,
    event: MessagePayload,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(flatten)]
    fields: IncomingEvent,
}

pub struct SocketFeed {
    client: SlackApiClient,
    socket: Socket,
}

impl SocketFeed {
    /// Opens a Socket Mode connection through `apps.connections.open`.
    pub async fn connect(client: SlackApiClient) -> Result<Self> {
        let socket = open_socket(&client).await?;
        Ok(Self { client, socket })
    }

    async fn ack(&mut self, envelope_id: &str) -> Result<()> {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        self.socket.send(WsMessage::Text(ack.into())).await?;
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        info!("Slack requested a socket refresh, reconnecting");
        let socket = open_socket(&self.client).await?;
        let mut previous = std::mem::replace(&mut self.socket, socket);
        if let Err(e) = previous.close(None).await {
            debug!("Failed to close previous socket cleanly: {e}");
        }
        Ok(())
    }
}

#[async_trait]
impl EventFeed for SocketFeed {
    async fn read_events(&mut self) -> Result<Vec<IncomingEvent>> {
        let mut events = Vec::new();
        loop {
            let frame = match self.socket.next().now_or_never() {
                None => break,
                Some(None) => return Err(BotError::SocketClosed),
                Some(Some(frame)) => frame?,
            };
            if matches!(frame, WsMessage::Close(_)) {
                return Err(BotError::SocketClosed);
            }
            let Some(envelope) = parse_envelope(frame)? else {
                continue;
            };
            if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                self.ack(envelope_id).await?;
            }

            match envelope.envelope_type.as_str() {
                "events_api" => events.extend(message_event(&envelope)),
                "disconnect" => {
                    self.reconnect().await?;
                    break;
                }
                "hello" => debug!("Slack socket handshake complete"),
                other => debug!("Ignoring Slack socket envelope of type {other}"),
            }
        }
        if !events.is_empty() {
            debug!("Read {} message events from Slack", events.len());
        }
        Ok(events)
    }
}

async fn open_socket(client: &SlackApiClient) -> Result<Socket> {
    let url = client.open_socket_connection().await?;
    let (socket, _response) = connect_async(url.as_str()).await?;
    debug!("Slack socket connected");
    Ok(socket)
}

pub(crate) fn parse_envelope(frame: WsMessage) -> Result<Option<SocketEnvelope>> {
    let text = match frame {
        WsMessage::Text(text) => text.as_str().to_owned(),
        WsMessage::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return Ok(None);
        }
    };
    Ok(Some(serde_json::from_str(&text)?))
}

/// Extracts a message event from an `events_api` envelope, if it carries one.
pub(crate) fn message_event(envelope: &SocketEnvelope) -> Option<IncomingEvent> {
    let callback = match serde_json::from_value::<EventCallback>(envelope.payload.clone()) {
        Ok(callback) => callback,
        Err(e) => {
            debug!("Skipping events_api payload without a usable event: {e}");
            return None;
        }
    };
    if callback.callback_type != "event_callback" || callback.event.event_type != "message" {
        return None;
    }
    Some(callback.event.fields)
}
