pub mod bot;
pub mod charts;
pub mod cli;
pub mod comics;
pub mod commands;
pub mod config;
pub mod dialogflow;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod slack;
pub mod types;

use cli::Cli;
use error::Result;

pub async fn run(cli: Cli) -> Result<()> {
    bot::run(cli).await
}
