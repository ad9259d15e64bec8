use clap::Parser;

use coey::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> coey::error::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("coey=info"))
        .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::debug!("TLS crypto provider already installed");
    }

    let cli = Cli::parse();
    log::info!("Starting coey Slack bot");

    match coey::run(cli).await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {}", e);
            Err(e)
        }
    }
}
