// src/services/calculations.rs
use serde::Serialize;

use crate::models::StockSeries;
use crate::services::market_data::PriceHistory;

pub const SHORT_WINDOW: usize = 5;
pub const LONG_WINDOW: usize = 20;

/// Rolling mean over `window` values. A position is NaN until the window is
/// full, and whenever the window holds a NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

/// NaN and both infinities become 0.0; everything else passes through.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn cleaned(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values.into_iter().map(finite_or_zero).collect()
}

pub fn build_stock_series(history: &PriceHistory) -> StockSeries {
    let closes: Vec<f64> = history.bars.iter().map(|b| b.close).collect();
    let ma5 = rolling_mean(&closes, SHORT_WINDOW);
    let ma20 = rolling_mean(&closes, LONG_WINDOW);

    StockSeries {
        symbol: history.symbol.clone(),
        name: history.name.clone(),
        dates: history
            .bars
            .iter()
            .map(|b| b.date.format("%Y-%m-%d").to_string())
            .collect(),
        open: cleaned(history.bars.iter().map(|b| b.open)),
        high: cleaned(history.bars.iter().map(|b| b.high)),
        low: cleaned(history.bars.iter().map(|b| b.low)),
        close: cleaned(closes.iter().copied()),
        volume: history
            .bars
            .iter()
            .map(|b| finite_or_zero(b.volume).max(0.0).round() as u64)
            .collect(),
        moving_avg_5: cleaned(ma5),
        moving_avg_20: cleaned(ma20),
    }
}

/// The figures shown under a stock chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSummary {
    pub symbol: String,
    pub latest_date: String,
    pub latest_close: f64,
    pub change_pct: f64,
    pub range_low: f64,
    pub range_high: f64,
}

pub fn summarize(series: &StockSeries) -> Option<StockSummary> {
    let last = series.close.len().checked_sub(1)?;
    let open = *series.open.get(last)?;
    let close = series.close[last];

    let change_pct = if open == 0.0 {
        0.0
    } else {
        (close - open) / open * 100.0
    };

    let range_low = series.low.iter().copied().fold(f64::INFINITY, f64::min);
    let range_high = series.high.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(StockSummary {
        symbol: series.symbol.clone(),
        latest_date: series.dates.get(last).cloned().unwrap_or_default(),
        latest_close: close,
        change_pct,
        range_low: finite_or_zero(range_low),
        range_high: finite_or_zero(range_high),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::market_data::DailyBar;
    use chrono::NaiveDate;

    fn history(closes: &[f64]) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        PriceHistory {
            symbol: "7974.T".to_string(),
            name: "Nintendo Co., Ltd.".to_string(),
            bars: closes
                .iter()
                .enumerate()
                .map(|(i, &close)| DailyBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 1.0,
                    high: close + 2.0,
                    low: close - 2.0,
                    close,
                    volume: 1000.0 + i as f64,
                })
                .collect(),
        }
    }

    #[test]
    fn rolling_mean_pads_until_window_is_full() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5);
        assert!(out[..4].iter().all(|v| v.is_nan()));
        assert_eq!(out[4], 3.0);
        assert_eq!(out[5], 4.0);
    }

    #[test]
    fn rolling_mean_propagates_missing_values() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_eq!(out[3], 3.5);
    }

    #[test]
    fn non_finite_values_become_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
        assert_eq!(finite_or_zero(-12.5), -12.5);
    }

    #[test]
    fn series_arrays_align_and_stay_finite() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes[10] = f64::NAN;
        closes[11] = f64::INFINITY;
        let series = build_stock_series(&history(&closes));

        assert_eq!(series.dates.len(), 30);
        assert_eq!(series.moving_avg_5.len(), series.close.len());
        assert_eq!(series.moving_avg_20.len(), series.close.len());
        for array in [
            &series.open,
            &series.high,
            &series.low,
            &series.close,
            &series.moving_avg_5,
            &series.moving_avg_20,
        ] {
            assert!(array.iter().all(|v| v.is_finite()));
        }

        assert_eq!(series.moving_avg_5[..4], [0.0; 4]);
        assert_eq!(series.moving_avg_5[4], 102.0);
        assert_eq!(series.moving_avg_20[..19], [0.0; 19]);
        assert_eq!(series.close[10], 0.0);
        assert_eq!(series.close[11], 0.0);
        assert_eq!(series.dates[0], "2025-03-03");
    }

    #[test]
    fn short_history_still_has_matching_lengths() {
        let series = build_stock_series(&history(&[10.0, 11.0, 12.0]));
        assert_eq!(series.moving_avg_5, vec![0.0, 0.0, 0.0]);
        assert_eq!(series.moving_avg_20, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn summary_uses_latest_day_and_full_range() {
        let series = build_stock_series(&history(&[100.0, 120.0, 101.0]));
        let summary = summarize(&series).unwrap();
        assert_eq!(summary.latest_date, "2025-03-05");
        assert_eq!(summary.latest_close, 101.0);
        assert!((summary.change_pct - 1.0).abs() < 1e-9);
        assert_eq!(summary.range_low, 98.0);
        assert_eq!(summary.range_high, 122.0);
    }

    #[test]
    fn empty_series_has_no_summary() {
        let series = build_stock_series(&history(&[]));
        assert!(summarize(&series).is_none());
    }
}
