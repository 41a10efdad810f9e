//! Weekend fare watch
//!
//! One pass over the configured destinations and upcoming weekends; emails a
//! digest when anything is under the price threshold. Scheduling is left to
//! cron or a similar runner.

use anyhow::Context;
use tracing::info;
use weekend_fare_watch::{
    deliver, weekend_windows, AmadeusClient, AppConfig, LogSender, NotificationSender,
    RateLimiter, SearchOrchestrator, SmtpSender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Configuration error")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("weekend_fare_watch={}", config.log_level).into()
            }),
        )
        .init();

    // Bad mail settings stop the run before any query is made
    let sender: Box<dyn NotificationSender> = match &config.smtp {
        Some(smtp) if !config.dry_run => {
            Box::new(SmtpSender::new(smtp).context("Invalid mail settings")?)
        }
        _ => Box::new(LogSender),
    };

    let today = chrono::Local::now().date_naive();
    let windows = weekend_windows(today, config.run.weeks_horizon)?;
    info!(
        origin = %config.run.origin,
        destinations = config.run.destinations.len(),
        weeks = windows.len(),
        threshold = %config.run.price_threshold,
        currency = %config.run.currency,
        "Starting flight search"
    );

    let client = AmadeusClient::new(config.amadeus.clone())?;
    let mut orchestrator =
        SearchOrchestrator::new(client, RateLimiter::new(config.search_delay()));
    let deal_digest = orchestrator.run(&config.run, &windows).await;

    let found = deliver(&deal_digest, sender.as_ref()).await;
    println!("Total deals found: {}", found);
    Ok(())
}
