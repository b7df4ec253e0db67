// src/state.rs
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::Config;
use crate::services::chat::{ChatResponder, MockResponder, VertexResponder};
use crate::services::health::HealthSource;
use crate::services::market_data::{MarketDataProvider, YahooChartProvider};
use crate::services::news::NewsStore;
use crate::services::tasks::{TaskQueue, TaskWorker};

/// Everything a request handler can reach.
pub struct AppState {
    pub config: Config,
    pub responder: Arc<dyn ChatResponder>,
    pub market: Arc<dyn MarketDataProvider>,
    pub news: NewsStore,
    pub health: HealthSource,
    pub tasks: TaskQueue,
}

impl AppState {
    pub fn new(
        config: Config,
        responder: Arc<dyn ChatResponder>,
        market: Arc<dyn MarketDataProvider>,
        tasks: TaskQueue,
    ) -> Self {
        Self {
            news: NewsStore::new(config.news_dir()),
            health: HealthSource::new(config.health_dir()),
            config,
            responder,
            market,
            tasks,
        }
    }

    /// Builds the production state: creates the data directories and picks
    /// the mock or hosted responder. The returned worker must be spawned.
    pub fn from_config(config: Config) -> Result<(Arc<Self>, TaskWorker)> {
        for dir in [config.news_dir(), config.health_dir(), config.stocks_dir()] {
            fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let responder: Arc<dyn ChatResponder> = if config.mock_mode {
            info!("Mock mode enabled, chat replies are canned");
            Arc::new(MockResponder)
        } else {
            Arc::new(VertexResponder::from_config(&config)?)
        };
        let market = Arc::new(YahooChartProvider::new()?);
        let (tasks, worker) = TaskQueue::channel();

        Ok((Arc::new(Self::new(config, responder, market, tasks)), worker))
    }
}
