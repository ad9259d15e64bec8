use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info};
use serde::Deserialize;
use url::Url;

use crate::error::{BotError, Result};

const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_DIALOGFLOW_API_BASE: &str = "https://dialogflow.googleapis.com";
const DEFAULT_COMIC_API_BASE: &str = "https://xkcd.com";
const DEFAULT_LANGUAGE_CODE: &str = "en-us";
const DEFAULT_GREETING: &str = "Hello from Coey! :tada:";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub slack: SlackConfig,
    pub dialogflow: DialogflowConfig,
    #[serde(default)]
    pub comics: ComicConfig,
    #[serde(default)]
    pub charts: ChartConfig,
    #[serde(default)]
    pub bot: LoopConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub app_token: String,
    /// Resolved through `auth.test` at startup when left empty.
    #[serde(default)]
    pub bot_id: Option<String>,
    pub bot_channel: String,
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialogflowConfig {
    pub project_id: String,
    /// Path to a service-account JSON key.
    #[serde(default)]
    pub credentials: PathBuf,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_dialogflow_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComicConfig {
    #[serde(default = "default_comic_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_program")]
    pub program: String,
    #[serde(default = "default_chart_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for ComicConfig {
    fn default() -> Self {
        Self {
            api_base: default_comic_api_base(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            program: default_chart_program(),
            args: default_chart_args(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            greeting: default_greeting(),
        }
    }
}

fn default_slack_api_base() -> String {
    DEFAULT_SLACK_API_BASE.to_string()
}

fn default_dialogflow_api_base() -> String {
    DEFAULT_DIALOGFLOW_API_BASE.to_string()
}

fn default_comic_api_base() -> String {
    DEFAULT_COMIC_API_BASE.to_string()
}

fn default_language_code() -> String {
    DEFAULT_LANGUAGE_CODE.to_string()
}

fn default_chart_program() -> String {
    "python".to_string()
}

fn default_chart_args() -> Vec<String> {
    vec!["build_graphs.py".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

/// Default location of the configuration file, `~/.coey/coey.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".coey").join("coey.toml"))
        .ok_or_else(|| BotError::Config("could not determine home directory".to_string()))
}

impl Config {
    /// Reads the configuration file once, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        debug!("Loading configuration from {}", path.display());
        dotenvy::dotenv().ok();

        let contents = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read configuration file {}: {}", path.display(), e);
            e
        })?;

        let config = Self::from_toml_str(&contents, |key| env::var(key).ok()).map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?;

        info!("Configuration loaded successfully");
        debug!(
            "Slack bot token length: {} characters",
            config.slack.bot_token.len()
        );
        debug!(
            "Slack app token length: {} characters",
            config.slack.app_token.len()
        );
        debug!("Slack bot channel: {}", config.slack.bot_channel);
        debug!("Dialogflow project: {}", config.dialogflow.project_id);
        debug!("Chart program: {}", config.charts.program);

        Ok(config)
    }

    /// Parses `contents` and applies overrides looked up through `lookup_env`.
    pub fn from_toml_str<F>(contents: &str, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = toml::from_str(contents)?;

        let non_empty = |key: &str| lookup_env(key).filter(|value| !value.trim().is_empty());
        if let Some(token) = non_empty("SLACK_BOT_TOKEN") {
            config.slack.bot_token = token;
        }
        if let Some(token) = non_empty("SLACK_APP_TOKEN") {
            config.slack.app_token = token;
        }
        if let Some(bot_id) = non_empty("SLACK_BOT_ID") {
            config.slack.bot_id = Some(bot_id);
        }
        if let Some(credentials) = non_empty("GOOGLE_APPLICATION_CREDENTIALS") {
            config.dialogflow.credentials = PathBuf::from(credentials);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        require("slack.bot_token", &self.slack.bot_token)?;
        require("slack.app_token", &self.slack.app_token)?;
        require("slack.bot_channel", &self.slack.bot_channel)?;
        require("dialogflow.project_id", &self.dialogflow.project_id)?;
        require("charts.program", &self.charts.program)?;
        if self.dialogflow.credentials.as_os_str().is_empty() {
            return Err(BotError::Config(
                "dialogflow.credentials is required".to_string(),
            ));
        }
        if let Some(bot_id) = &self.slack.bot_id {
            require("slack.bot_id", bot_id)?;
        }

        for (key, value) in [
            ("slack.api_base", &self.slack.api_base),
            ("dialogflow.api_base", &self.dialogflow.api_base),
            ("comics.api_base", &self.comics.api_base),
        ] {
            Url::parse(value)
                .map_err(|e| BotError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if self.bot.poll_interval_ms == 0 {
            return Err(BotError::Config(
                "bot.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.bot.poll_interval_ms)
    }
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BotError::Config(format!("{key} is required")));
    }
    Ok(())
}
