//! Canonical OHLCV bar and per-ticker series.
//!
//! This is the output of [`crate::normalizer::normalize`] — the provider
//! boundary (`provider::RawBar`) still carries prices as decimal strings;
//! a `Bar` carries [`Decimal4`] and has already passed the OHLC sanity
//! check.

use std::fmt;

use chrono::NaiveDate;
use tc_money::Decimal4;

/// A single OHLCV bar. Invariants (checked at construction by
/// [`crate::normalizer::normalize`], not re-checked here): all prices
/// strictly positive, `low <= open,close <= high`, `volume >= 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub timestamp: NaiveDate,
    pub open: Decimal4,
    pub high: Decimal4,
    pub low: Decimal4,
    pub close: Decimal4,
    pub volume: i64,
    pub adjusted_close: Option<Decimal4>,
}

/// Errors in the OHLC relationship between a bar's four prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarError {
    LowExceedsHigh { low: Decimal4, high: Decimal4 },
    LowExceedsOpen { low: Decimal4, open: Decimal4 },
    LowExceedsClose { low: Decimal4, close: Decimal4 },
    HighBelowOpen { high: Decimal4, open: Decimal4 },
    HighBelowClose { high: Decimal4, close: Decimal4 },
    NegativeVolume { volume: i64 },
}

impl fmt::Display for BarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarError::LowExceedsHigh { low, high } => write!(f, "low ({low}) > high ({high})"),
            BarError::LowExceedsOpen { low, open } => write!(f, "low ({low}) > open ({open})"),
            BarError::LowExceedsClose { low, close } => write!(f, "low ({low}) > close ({close})"),
            BarError::HighBelowOpen { high, open } => write!(f, "high ({high}) < open ({open})"),
            BarError::HighBelowClose { high, close } => {
                write!(f, "high ({high}) < close ({close})")
            }
            BarError::NegativeVolume { volume } => write!(f, "volume must be >= 0, got {volume}"),
        }
    }
}

impl std::error::Error for BarError {}

impl Bar {
    pub fn validate_ohlc(&self) -> Result<(), BarError> {
        if self.low > self.high {
            return Err(BarError::LowExceedsHigh {
                low: self.low,
                high: self.high,
            });
        }
        if self.low > self.open {
            return Err(BarError::LowExceedsOpen {
                low: self.low,
                open: self.open,
            });
        }
        if self.low > self.close {
            return Err(BarError::LowExceedsClose {
                low: self.low,
                close: self.close,
            });
        }
        if self.high < self.open {
            return Err(BarError::HighBelowOpen {
                high: self.high,
                open: self.open,
            });
        }
        if self.high < self.close {
            return Err(BarError::HighBelowClose {
                high: self.high,
                close: self.close,
            });
        }
        if self.volume < 0 {
            return Err(BarError::NegativeVolume {
                volume: self.volume,
            });
        }
        Ok(())
    }
}

/// An ordered sequence of bars for one ticker at one interval, sorted
/// ascending by `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OhlcvSeries {
    pub ticker: String,
    pub interval: String,
    pub bars: Vec<Bar>,
}

impl OhlcvSeries {
    pub fn new(ticker: impl Into<String>, interval: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            ticker: ticker.into(),
            interval: interval.into(),
            bars,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// The bar for the exact calendar date, if present.
    pub fn get_bar(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&date, |b| b.timestamp)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// The bar on `date`, or failing that the most recent bar strictly
    /// before it.
    pub fn last_bar_on_or_before(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars.iter().rev().find(|b| b.timestamp <= date)
    }

    /// Bars with `start <= timestamp <= end`, as a new series.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> OhlcvSeries {
        let filtered = self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .cloned()
            .collect();
        OhlcvSeries {
            ticker: self.ticker.clone(),
            interval: self.interval.clone(),
            bars: filtered,
        }
    }

    pub fn trading_days(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal4 {
        Decimal4::parse(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(day: u32, close: &str) -> Bar {
        Bar {
            timestamp: date(2024, 1, day),
            open: d("100.0000"),
            high: d("105.0000"),
            low: d("99.0000"),
            close: d(close),
            volume: 1_000,
            adjusted_close: None,
        }
    }

    #[test]
    fn get_bar_finds_exact_date() {
        let series = OhlcvSeries::new("AAPL", "1D", vec![bar(1, "100"), bar(2, "101")]);
        assert_eq!(series.get_bar(date(2024, 1, 2)).unwrap().close, d("101.0000"));
        assert!(series.get_bar(date(2024, 1, 3)).is_none());
    }

    #[test]
    fn last_bar_on_or_before_falls_back_to_earlier_bar() {
        let series = OhlcvSeries::new("AAPL", "1D", vec![bar(1, "100"), bar(5, "105")]);
        let found = series.last_bar_on_or_before(date(2024, 1, 3)).unwrap();
        assert_eq!(found.timestamp, date(2024, 1, 1));
    }

    #[test]
    fn slice_filters_inclusive_range() {
        let series = OhlcvSeries::new(
            "AAPL",
            "1D",
            vec![bar(1, "100"), bar(2, "101"), bar(3, "102")],
        );
        let sliced = series.slice(date(2024, 1, 2), date(2024, 1, 3));
        assert_eq!(sliced.bars.len(), 2);
    }

    #[test]
    fn constructor_sorts_unordered_input() {
        let series = OhlcvSeries::new("AAPL", "1D", vec![bar(3, "102"), bar(1, "100")]);
        assert_eq!(series.bars[0].timestamp, date(2024, 1, 1));
    }

    #[test]
    fn validate_ohlc_rejects_low_above_high() {
        let mut b = bar(1, "100");
        b.low = d("110.0000");
        assert!(matches!(
            b.validate_ohlc(),
            Err(BarError::LowExceedsHigh { .. })
        ));
    }
}
