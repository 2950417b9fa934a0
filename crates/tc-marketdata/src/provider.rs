//! Provider boundary for OHLCV market-data ingestion.
//!
//! This module defines the raw bar type and the provider trait. Live
//! network adapters are out of scope for this crate; [`InMemoryProvider`]
//! is the one concrete implementation, backing both tests and CSV-sourced
//! backtests. No DB logic, no CSV logic, no normalization, no
//! data-quality logic belong here.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Raw bar
// ---------------------------------------------------------------------------

/// A single OHLCV bar as returned verbatim by an upstream data source.
///
/// Prices are kept as decimal strings so downstream callers can normalise
/// deterministically (via [`crate::normalizer::normalize`]) without
/// floating-point rounding being introduced at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    pub symbol: String,
    pub timeframe: String,
    /// Bar end timestamp as UTC epoch seconds.
    pub end_ts: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: i64,
    pub is_complete: bool,
}

// ---------------------------------------------------------------------------
// Fetch request
// ---------------------------------------------------------------------------

/// Parameters for a historical fetch request passed to a [`Provider`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbols: Vec<String>,
    pub timeframe: String,
    /// Inclusive start date as `YYYY-MM-DD`.
    pub start_date: String,
    /// Inclusive end date as `YYYY-MM-DD`.
    pub end_date: String,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a [`Provider`] implementation may return.
#[derive(Debug)]
pub enum ProviderError {
    /// The requested symbol has no data loaded.
    NotFound { symbol: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value is missing or invalid.
    Config(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotFound { symbol } => write!(f, "no data loaded for '{symbol}'"),
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Market-data provider contract. Implementations must be object-safe so
/// callers can hold a `Box<dyn Provider>` without knowing the concrete
/// type.
pub trait Provider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"in-memory"`, `"csv"`).
    fn name(&self) -> &'static str;

    /// Fetch historical OHLCV bars for the symbols and date range in `req`.
    ///
    /// Returns bars in the order supplied by the source; callers are
    /// responsible for sorting or deduplication.
    fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError>;

    /// Fetch the most-recent (potentially incomplete) bar for each symbol.
    ///
    /// Implementations may return an empty `Vec` if that concept doesn't
    /// apply; the default does exactly that.
    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<RawBar>, ProviderError> {
        let _ = symbols;
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// In-memory provider
// ---------------------------------------------------------------------------

/// A provider backed by bars already held in memory (e.g. loaded from CSV
/// via [`crate::ingest_csv::parse_csv_file`] ahead of time). This is the
/// only concrete provider this crate ships: no network adapter is in
/// scope here.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bars: BTreeMap<String, Vec<RawBar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load bars for a symbol, replacing anything previously loaded for it.
    pub fn load(&mut self, symbol: impl Into<String>, bars: Vec<RawBar>) {
        self.bars.insert(symbol.into(), bars);
    }
}

impl Provider for InMemoryProvider {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError> {
        let mut out = Vec::new();
        for symbol in &req.symbols {
            let bars = self
                .bars
                .get(symbol)
                .ok_or_else(|| ProviderError::NotFound {
                    symbol: symbol.clone(),
                })?;
            out.extend(
                bars.iter()
                    .filter(|b| b.timeframe.eq_ignore_ascii_case(&req.timeframe))
                    .cloned(),
            );
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar(symbol: &str) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timeframe: "1D".to_string(),
            end_ts: 1_700_000_000,
            open: "100.00".to_string(),
            high: "105.00".to_string(),
            low: "99.00".to_string(),
            close: "103.00".to_string(),
            volume: 1_000_000,
            is_complete: true,
        }
    }

    #[test]
    fn in_memory_provider_returns_loaded_bars() {
        let mut provider = InMemoryProvider::new();
        provider.load("AAPL", vec![sample_bar("AAPL")]);

        let req = FetchRequest {
            symbols: vec!["AAPL".to_string()],
            timeframe: "1D".to_string(),
            start_date: "2023-11-01".to_string(),
            end_date: "2023-11-14".to_string(),
        };

        let result = provider.fetch_historical(&req).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "AAPL");
    }

    #[test]
    fn in_memory_provider_errors_on_unknown_symbol() {
        let provider = InMemoryProvider::new();
        let req = FetchRequest {
            symbols: vec!["ZZZZ".to_string()],
            timeframe: "1D".to_string(),
            start_date: "2023-11-01".to_string(),
            end_date: "2023-11-14".to_string(),
        };
        let err = provider.fetch_historical(&req).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn fetch_latest_default_returns_empty() {
        let provider = InMemoryProvider::new();
        let result = provider.fetch_latest(&["AAPL".to_string()]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn provider_is_object_safe_via_box() {
        let _p: Box<dyn Provider> = Box::new(InMemoryProvider::new());
    }
}
