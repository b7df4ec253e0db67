// src/scheduler/runner.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use super::clock::Clock;
use super::jobs::JobAction;
use super::JobRunner;
use crate::client::ApiClient;
use crate::models::FetchLogMarker;
use crate::services::tasks::BackgroundTask;

const STOCK_PERIOD: &str = "1mo";

/// Drives the API over HTTP and drops a marker file after each success.
pub struct TriggerRunner<C: Clock> {
    client: ApiClient,
    data_dir: PathBuf,
    watchlist: Vec<String>,
    clock: C,
}

impl<C: Clock> TriggerRunner<C> {
    pub fn new(
        client: ApiClient,
        data_dir: impl Into<PathBuf>,
        watchlist: Vec<String>,
        clock: C,
    ) -> Self {
        Self {
            client,
            data_dir: data_dir.into(),
            watchlist,
            clock,
        }
    }

    async fn call(&self, action: JobAction) -> Result<()> {
        match action {
            JobAction::FetchNews => {
                let ack = self.client.trigger(BackgroundTask::FetchNews).await?;
                info!("News fetch {} (task {})", ack.status, ack.task_id);
            }
            JobAction::FetchPapers => {
                let ack = self.client.trigger(BackgroundTask::FetchPapers).await?;
                info!("Paper fetch {} (task {})", ack.status, ack.task_id);
            }
            JobAction::FetchStocks => {
                for symbol in &self.watchlist {
                    let series = self.client.stocks(symbol, STOCK_PERIOD).await?;
                    info!(
                        "Fetched {} days of {} ({})",
                        series.dates.len(),
                        series.symbol,
                        series.name
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> JobRunner for TriggerRunner<C> {
    async fn run(&self, action: JobAction) -> Result<()> {
        self.call(action).await?;
        let dir = self.data_dir.join(action.marker_dir());
        let path = write_marker(&dir, self.clock.now())?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

fn marker_stamp(at: DateTime<Tz>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

pub fn marker_file_name(at: DateTime<Tz>) -> String {
    format!("fetch_log_{}.json", marker_stamp(at))
}

/// Records a completed fetch as `fetch_log_<timestamp>.json` in `dir`.
pub fn write_marker(dir: &Path, at: DateTime<Tz>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stamp = marker_stamp(at);
    let marker = FetchLogMarker {
        timestamp: stamp.clone(),
        status: "completed".to_string(),
    };
    let path = dir.join(format!("fetch_log_{}.json", stamp));
    let body = serde_json::to_string_pretty(&marker)?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
