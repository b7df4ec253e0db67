use dotenv::dotenv;
use log::{error, info};
use std::fs;

use like_her::client::ApiClient;
use like_her::config::Config;
use like_her::scheduler::{Scheduler, SystemClock, TriggerRunner, POLL_INTERVAL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();
    info!("Starting scheduler service...");

    let config = Config::from_env()?;
    for dir in [config.news_dir(), config.papers_dir(), config.stocks_dir()] {
        fs::create_dir_all(&dir)?;
    }

    let clock = SystemClock::new(config.scheduler_tz);
    let client = ApiClient::new(&config.api_url);
    info!("Triggering API at {} (zone {})", client.base_url(), config.scheduler_tz);

    let runner = TriggerRunner::new(client, &config.data_dir, config.watchlist.clone(), clock);
    let mut scheduler = Scheduler::with_standard_jobs(clock);

    info!("Running initial tasks...");
    scheduler.run_all(&runner).await;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                scheduler.run_pending(&runner).await;
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Scheduler stopped");
                break;
            }
        }
    }
    Ok(())
}
