// src/services/market_data.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// One trading day. Missing provider values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    pub symbol: String,
    pub name: String,
    pub bars: Vec<DailyBar>,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn daily_history(&self, symbol: &str, period: &str) -> Result<PriceHistory>;
}

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new() -> Result<Self> {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building market data client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartProvider {
    async fn daily_history(&self, symbol: &str, period: &str) -> Result<PriceHistory> {
        let url = format!("{}/{}", self.base_url, symbol);
        info!("Fetching {} daily history for {} from {}", period, symbol, url);

        let body = self
            .client
            .get(&url)
            .query(&[("range", period), ("interval", "1d"), ("includePrePost", "false")])
            .send()
            .await
            .with_context(|| format!("requesting chart for {}", symbol))?
            .text()
            .await
            .with_context(|| format!("reading chart body for {}", symbol))?;

        let history = parse_chart(&body)?;
        debug!("Parsed {} bars for {}", history.bars.len(), symbol);
        Ok(history)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    short_name: Option<String>,
    long_name: Option<String>,
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn value_at(values: &[Option<f64>], i: usize) -> f64 {
    values.get(i).copied().flatten().unwrap_or(f64::NAN)
}

/// Parses a Yahoo `v8/finance/chart` response body.
pub fn parse_chart(body: &str) -> Result<PriceHistory> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("chart response is not valid JSON")?;

    if let Some(err) = envelope.chart.error {
        bail!("market data provider error {}: {}", err.code, err.description);
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| anyhow!("chart response has no result"))?;

    let name = result
        .meta
        .short_name
        .or(result.meta.long_name)
        .unwrap_or_else(|| result.meta.symbol.clone());
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.gmt_offset;

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| anyhow!("timestamp {} out of range", ts))?;
            Ok(DailyBar {
                date,
                open: value_at(&quote.open, i),
                high: value_at(&quote.high, i),
                low: value_at(&quote.low, i),
                close: value_at(&quote.close, i),
                volume: value_at(&quote.volume, i),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PriceHistory {
        symbol: result.meta.symbol,
        name,
        bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "symbol": "7974.T",
                    "shortName": "NINTENDO CO LTD",
                    "gmtoffset": 32400
                },
                "timestamp": [1743638400, 1743724800, 1743984000],
                "indicators": {
                    "quote": [{
                        "open":   [9000.0, 9100.0, null],
                        "high":   [9200.0, 9300.0, 9050.0],
                        "low":    [8900.0, 9000.0, 8800.0],
                        "close":  [9150.0, 9050.0, 8900.0],
                        "volume": [1200000, null, 900000]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_bars_in_exchange_local_dates() {
        let history = parse_chart(SAMPLE).unwrap();
        assert_eq!(history.symbol, "7974.T");
        assert_eq!(history.name, "NINTENDO CO LTD");
        assert_eq!(history.bars.len(), 3);
        assert_eq!(
            history.bars[0].date,
            NaiveDate::from_ymd_opt(2025, 4, 3).unwrap()
        );
        assert_eq!(history.bars[0].close, 9150.0);
        assert_eq!(history.bars[0].volume, 1_200_000.0);
    }

    #[test]
    fn nulls_become_nan() {
        let history = parse_chart(SAMPLE).unwrap();
        assert!(history.bars[2].open.is_nan());
        assert!(history.bars[1].volume.is_nan());
    }

    #[test]
    fn provider_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(err.to_string().contains("symbol may be delisted"));
    }

    #[test]
    fn name_falls_back_to_symbol() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"XYZ"},"indicators":{"quote":[]}}],"error":null}}"#;
        let history = parse_chart(body).unwrap();
        assert_eq!(history.name, "XYZ");
        assert!(history.bars.is_empty());
    }
}
