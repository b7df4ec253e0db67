use dotenv::dotenv;
use log::{error, info};
use std::env;

use like_her::services::calculations::{build_stock_series, summarize};
use like_her::services::market_data::{MarketDataProvider, YahooChartProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let mut args = env::args().skip(1);
    let symbol = args.next().unwrap_or_else(|| "7974.T".to_string());
    let period = args.next().unwrap_or_else(|| "1mo".to_string());
    info!("Testing Yahoo chart fetch for {} over {}...", symbol, period);

    let provider = YahooChartProvider::new()?;
    match provider.daily_history(&symbol, &period).await {
        Ok(history) => {
            info!(
                "SUCCESS: {} ({}) returned {} bars",
                history.symbol,
                history.name,
                history.bars.len()
            );
            let series = build_stock_series(&history);
            match summarize(&series) {
                Some(summary) => info!(
                    "Latest {} close {:.2} ({:+.2}%), range {:.2} - {:.2}",
                    summary.latest_date,
                    summary.latest_close,
                    summary.change_pct,
                    summary.range_low,
                    summary.range_high
                ),
                None => info!("No bars to summarize"),
            }
        }
        Err(e) => {
            error!("ERROR: Failed to fetch chart data: {:#}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
