use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Slack API {method} failed: {error}")]
    SlackApi { method: String, error: String },

    #[error("Slack socket error: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Slack socket closed by peer")]
    SocketClosed,

    #[error("Dialogflow API error ({status}): {message}")]
    DialogflowApi { status: StatusCode, message: String },

    #[error("Comic API error ({status})")]
    ComicApi { status: StatusCode },

    #[error("OAuth token error: {0}")]
    OAuth(String),

    #[error("JWT signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Chart script error: {0}")]
    ChartScript(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for BotError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BotError::Socket(Box::new(err))
    }
}

impl BotError {
    /// Builds a [`BotError::SlackApi`] from an `ok: false` response.
    pub fn slack(method: &str, error: Option<String>) -> Self {
        BotError::SlackApi {
            method: method.to_string(),
            error: error.unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
