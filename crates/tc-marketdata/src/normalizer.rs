//! Canonical OHLCV normalization for market-data bars.
//!
//! Converts raw provider bars (`provider::RawBar`) into [`Bar`] values
//! with [`Decimal4`] prices, validated OHLC relationships, and
//! deterministic sort order.
//!
//! It does **not**:
//! - fetch data (no providers)
//! - write to the database
//! - perform data-quality reporting (see `quality.rs`)

use std::fmt;

use chrono::DateTime;
use tc_money::{Decimal4, MoneyError};

use crate::bar::{Bar, BarError};
use crate::provider::RawBar;

/// Errors produced during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizerError {
    Price { field: &'static str, source: MoneyError },
    Ohlc(BarError),
}

impl fmt::Display for NormalizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerError::Price { field, source } => {
                write!(f, "price field '{field}' invalid: {source}")
            }
            NormalizerError::Ohlc(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NormalizerError {}

fn parse_price(s: &str, field: &'static str) -> Result<Decimal4, NormalizerError> {
    Decimal4::parse_positive(s).map_err(|source| NormalizerError::Price { field, source })
}

/// Normalize a single [`RawBar`] into a [`Bar`].
///
/// Returns `Err` if any price cannot be parsed or if OHLC sanity checks
/// fail.
pub fn normalize(raw: &RawBar) -> Result<Bar, NormalizerError> {
    let open = parse_price(&raw.open, "open")?;
    let high = parse_price(&raw.high, "high")?;
    let low = parse_price(&raw.low, "low")?;
    let close = parse_price(&raw.close, "close")?;

    let timestamp = DateTime::from_timestamp(raw.end_ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| NormalizerError::Price {
            field: "end_ts",
            source: MoneyError::Parse {
                input: raw.end_ts.to_string(),
                reason: "out of range epoch seconds".to_string(),
            },
        })?;

    let bar = Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume: raw.volume,
        adjusted_close: None,
    };
    bar.validate_ohlc().map_err(NormalizerError::Ohlc)?;
    Ok(bar)
}

/// Normalize a batch of [`RawBar`]s, collecting all errors.
///
/// Returns `Ok(Vec<Bar>)` only if every bar normalizes successfully. On
/// the first error, returns `Err`. Use this when you need an
/// all-or-nothing result; iterate and call [`normalize`] individually
/// for partial success.
pub fn normalize_all(bars: &[RawBar]) -> Result<Vec<Bar>, NormalizerError> {
    bars.iter().map(normalize).collect()
}

/// Sort a slice of [`Bar`]s in-place by `timestamp`.
pub fn sort_normalized(bars: &mut [Bar]) {
    bars.sort_by_key(|b| b.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn raw(
        symbol: &str,
        timeframe: &str,
        end_ts: i64,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
        volume: i64,
    ) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            end_ts,
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            volume,
            is_complete: true,
        }
    }

    #[test]
    fn normalize_happy_path() {
        let bar = raw(
            "AAPL",
            "1D",
            1_700_000_000,
            "100.00",
            "105.00",
            "99.00",
            "103.00",
            1_000_000,
        );
        let nb = normalize(&bar).unwrap();
        assert_eq!(nb.open.to_string(), "100.0000");
        assert_eq!(nb.high.to_string(), "105.0000");
        assert_eq!(nb.low.to_string(), "99.0000");
        assert_eq!(nb.close.to_string(), "103.0000");
        assert_eq!(nb.volume, 1_000_000);
    }

    #[test]
    fn normalize_rejects_low_gt_high() {
        let bar = raw("SPY", "1D", 0, "100", "99", "101", "100", 0);
        let err = normalize(&bar).unwrap_err();
        assert!(matches!(err, NormalizerError::Ohlc(BarError::LowExceedsHigh { .. })));
    }

    #[test]
    fn normalize_rejects_negative_volume() {
        let mut bar = raw("SPY", "1D", 0, "100", "105", "99", "103", 0);
        bar.volume = -1;
        let err = normalize(&bar).unwrap_err();
        assert!(matches!(
            err,
            NormalizerError::Ohlc(BarError::NegativeVolume { volume: -1 })
        ));
    }

    #[test]
    fn normalize_rejects_non_positive_price() {
        let bar = raw("SPY", "1D", 0, "0", "105", "99", "103", 0);
        let err = normalize(&bar).unwrap_err();
        assert!(matches!(err, NormalizerError::Price { field: "open", .. }));
    }

    #[test]
    fn normalize_rejects_unparseable_price() {
        let bar = raw("SPY", "1D", 0, "NaN", "105", "99", "103", 0);
        let err = normalize(&bar).unwrap_err();
        assert!(matches!(err, NormalizerError::Price { field: "open", .. }));
    }

    #[test]
    fn normalize_all_fails_on_first_bad_bar() {
        let bars = vec![
            raw("AAPL", "1D", 1, "100", "105", "99", "103", 100),
            raw("BAD", "1D", 2, "NaN", "105", "99", "103", 0),
        ];
        assert!(normalize_all(&bars).is_err());
    }

    #[test]
    fn normalize_all_returns_all_on_success() {
        let bars = vec![
            raw("AAPL", "1D", 1, "100", "105", "99", "103", 100),
            raw("MSFT", "1D", 2, "200", "210", "198", "205", 200),
        ];
        let result = normalize_all(&bars).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn sort_normalized_orders_by_timestamp() {
        let bars = [
            raw("AAPL", "1D", 200, "100", "105", "99", "103", 0),
            raw("AAPL", "1D", 100, "100", "105", "99", "103", 0),
        ];
        let mut normalized: Vec<Bar> = bars.iter().map(|b| normalize(b).unwrap()).collect();
        sort_normalized(&mut normalized);
        assert!(normalized[0].timestamp < normalized[1].timestamp);
    }
}
