//! Market data: OHLCV bars, technical indicators, and a cached loader on
//! top of a pluggable [`provider::Provider`].
//!
//! This crate owns bar normalization, data-quality reporting, and
//! indicator computation. It does **not** fetch data over the network —
//! live broker/vendor feeds are out of scope here; callers supply bars
//! via [`provider::InMemoryProvider`] (loaded from CSV via `ingest_csv`,
//! or constructed directly in tests).

pub mod bar;
pub mod indicators;
pub mod ingest_csv;
pub mod loader;
pub mod normalizer;
pub mod provider;
pub mod quality;

pub use bar::{Bar, BarError, OhlcvSeries};
pub use indicators::Indicators;
pub use loader::{LoaderError, MarketDataLoader};
pub use provider::{FetchRequest, InMemoryProvider, Provider, ProviderError, RawBar};

use anyhow::{anyhow, Result};

/// Supported timeframe identifiers for historical ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Timeframe {
    D1,
    M1,
    M5,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1D",
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Timeframe::D1),
            "1m" | "1min" | "1minute" => Ok(Timeframe::M1),
            "5m" | "5min" | "5minute" => Ok(Timeframe::M5),
            other => Err(anyhow!(
                "invalid timeframe '{}'. expected one of: 1D | 1m | 5m",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_parse() {
        assert_eq!(Timeframe::parse("1D").unwrap(), Timeframe::D1);
        assert_eq!(Timeframe::parse("1m").unwrap(), Timeframe::M1);
        assert_eq!(Timeframe::parse("5m").unwrap(), Timeframe::M5);
        assert!(Timeframe::parse("15m").is_err());
    }

    #[test]
    fn timeframe_as_str_round_trips() {
        for tf in [Timeframe::D1, Timeframe::M1, Timeframe::M5] {
            assert_eq!(Timeframe::parse(tf.as_str()).unwrap(), tf);
        }
    }
}
