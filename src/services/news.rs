// src/services/news.rs
use anyhow::{Context, Result};
use csv::Reader;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::models::NewsItem;

pub const NEWS_FILE: &str = "news.csv";

/// Serves news from `<news dir>/news.csv` (columns: title, summary, source,
/// url, date), or the built-in headlines when no file exists.
#[derive(Debug, Clone)]
pub struct NewsStore {
    dir: PathBuf,
}

impl NewsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Result<Vec<NewsItem>> {
        let path = self.dir.join(NEWS_FILE);
        if !path.exists() {
            debug!("{} not present, serving built-in headlines", path.display());
            return Ok(builtin_news());
        }
        let items = read_news_csv(&path)?;
        info!("Loaded {} news items from {}", items.len(), path.display());
        Ok(items)
    }
}

fn read_news_csv(path: &Path) -> Result<Vec<NewsItem>> {
    let mut rdr = Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut items = Vec::new();
    for (line, record) in rdr.deserialize::<NewsItem>().enumerate() {
        let mut item = record.with_context(|| format!("{} row {}", path.display(), line + 2))?;
        if item.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            item.url = None;
        }
        items.push(item);
    }
    Ok(items)
}

pub fn builtin_news() -> Vec<NewsItem> {
    let item = |title: &str, summary: &str, source: &str, url: &str, date: &str| NewsItem {
        title: title.to_string(),
        summary: summary.to_string(),
        source: source.to_string(),
        url: Some(url.to_string()),
        date: date.to_string(),
    };

    vec![
        item(
            "Google DeepMind Announces New AI Architecture",
            "A breakthrough in AI architecture that improves efficiency by 40%.",
            "TechCrunch",
            "https://techcrunch.com/example",
            "2025-04-20",
        ),
        item(
            "Sakana AI Releases Expanded Version of Swallow Model",
            "Japanese AI startup Sakana AI has released Swallow 2.0 with improved language capabilities.",
            "AI News Daily",
            "https://ainewsdaily.com/example",
            "2025-04-19",
        ),
        item(
            "AI Regulation Framework Proposed in EU",
            "New regulations aim to ensure ethical AI development across European markets.",
            "Reuters",
            "https://reuters.com/example",
            "2025-04-18",
        ),
        item(
            "OpenAI's New Model Shows Enhanced Reasoning",
            "Latest model demonstrates significant improvements in mathematical and logical reasoning tasks.",
            "MIT Technology Review",
            "https://technologyreview.mit.edu/example",
            "2025-04-17",
        ),
    ]
}
