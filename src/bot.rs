//! Bot startup and the fixed-interval poll loop.

use std::time::Duration;

use log::{debug, info};

use crate::charts::ChartRunner;
use crate::cli::Cli;
use crate::comics::ComicClient;
use crate::config::Config;
use crate::dialogflow::{IntentClient, TokenProvider};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::filter::OutputFilter;
use crate::slack::{EventFeed, SlackApiClient, SlackDirectory, SocketFeed};
use crate::types::ConversationContext;

/// Run the Slack bot until Ctrl-C or the first error.
pub async fn run(cli: Cli) -> Result<()> {
    info!("Initializing bot");
    let config = Config::load(cli.config.as_deref())?;

    let slack = SlackApiClient::new(
        &config.slack.api_base,
        &config.slack.bot_token,
        &config.slack.app_token,
    );
    let bot_id = match &config.slack.bot_id {
        Some(bot_id) => bot_id.clone(),
        None => {
            debug!("No bot id configured, resolving through auth.test");
            slack.auth_test().await?
        }
    };
    info!("Running as Slack user {bot_id}");

    debug!("Initializing Dialogflow client");
    let tokens = TokenProvider::from_credentials_file(&config.dialogflow.credentials)?;
    let dispatcher = Dispatcher::new(
        slack.clone(),
        ComicClient::new(&config.comics.api_base),
        IntentClient::new(&config.dialogflow, tokens),
        ChartRunner::new(&config.charts),
        cli.testing_mode(),
    );
    if cli.testing_mode() {
        info!("Testing mode enabled");
    }

    slack
        .post_text(&config.slack.bot_channel, &config.bot.greeting)
        .await?;

    debug!("Connecting to Slack socket mode");
    let feed = SocketFeed::connect(slack.clone()).await?;
    info!("Coey is listening to you.");

    let mut poll_loop = PollLoop::new(
        feed,
        slack,
        OutputFilter::new(&bot_id),
        dispatcher,
        config.poll_interval(),
    );

    tokio::select! {
        result = poll_loop.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
            Ok(())
        }
    }
}

/// Reads events, answers at most one command, then sleeps, forever.
pub struct PollLoop<F, D> {
    feed: F,
    directory: D,
    filter: OutputFilter,
    dispatcher: Dispatcher,
    interval: Duration,
    context: Option<ConversationContext>,
}

impl<F, D> PollLoop<F, D>
where
    F: EventFeed,
    D: SlackDirectory + Sync,
{
    pub fn new(
        feed: F,
        directory: D,
        filter: OutputFilter,
        dispatcher: Dispatcher,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            directory,
            filter,
            dispatcher,
            interval,
            context: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.tick().await?;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One iteration: returns whether a command was handled.
    pub async fn tick(&mut self) -> Result<bool> {
        let events = self.feed.read_events().await?;
        let Some(command) = self.filter.select(&events, &self.directory).await? else {
            return Ok(false);
        };
        self.context = self
            .dispatcher
            .handle(&command, self.context.take())
            .await?;
        Ok(true)
    }
}
