// src/handlers/stocks.rs
use log::{error, info};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::calculations::build_stock_series;
use crate::state::AppState;

pub const DEFAULT_SYMBOL: &str = "7974.T";
pub const DEFAULT_PERIOD: &str = "1mo";
const PERIODS: [&str; 11] = [
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub symbol: Option<String>,
    pub period: Option<String>,
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.^=\-]{1,20}$").expect("symbol pattern compiles")
    })
}

pub fn validate(query: StockQuery) -> Result<(String, String), ApiError> {
    let symbol = query
        .symbol
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
    let period = query
        .period
        .map(|p| p.trim().to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_PERIOD.to_string());

    if !symbol_pattern().is_match(&symbol) {
        return Err(ApiError::validation(format!("Invalid stock symbol: {:?}", symbol)));
    }
    if !PERIODS.contains(&period.as_str()) {
        return Err(ApiError::validation(format!(
            "Invalid period {:?}; expected one of {}",
            period,
            PERIODS.join(", ")
        )));
    }
    Ok((symbol, period))
}

pub async fn get_stocks(query: StockQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    let (symbol, period) = validate(query).map_err(warp::reject::custom)?;
    info!("Handling request to get {} stock data for {}", period, symbol);

    let history = state
        .market
        .daily_history(&symbol, &period)
        .await
        .map_err(|e| {
            error!("Failed to fetch stock data for {}: {:#}", symbol, e);
            warp::reject::custom(ApiError::upstream(format!(
                "Failed to fetch stock data for {}: {:#}",
                symbol, e
            )))
        })?;

    if history.bars.is_empty() {
        error!("No data returned for symbol {}", symbol);
        return Err(warp::reject::custom(ApiError::upstream(format!(
            "No data returned for symbol {}",
            symbol
        ))));
    }

    Ok(warp::reply::json(&build_stock_series(&history)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(symbol: Option<&str>, period: Option<&str>) -> StockQuery {
        StockQuery {
            symbol: symbol.map(str::to_string),
            period: period.map(str::to_string),
        }
    }

    #[test]
    fn defaults_apply_when_missing() {
        let (symbol, period) = validate(query(None, None)).unwrap();
        assert_eq!(symbol, DEFAULT_SYMBOL);
        assert_eq!(period, DEFAULT_PERIOD);
    }

    #[test]
    fn accepts_exchange_and_index_symbols() {
        for s in ["AAPL", "7974.T", "^GSPC", "BRK-B", "EURUSD=X"] {
            assert!(validate(query(Some(s), Some("6MO"))).is_ok(), "{s}");
        }
    }

    #[test]
    fn rejects_bad_symbols_and_periods() {
        assert!(matches!(
            validate(query(Some("AAPL/../x"), None)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(validate(query(Some(""), None)), Err(ApiError::Validation(_))));
        assert!(matches!(
            validate(query(None, Some("3weeks"))),
            Err(ApiError::Validation(_))
        ));
    }
}
