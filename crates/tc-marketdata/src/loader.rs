//! Cached OHLCV + indicator loading on top of a [`Provider`].
//!
//! [`MarketDataLoader`] is the one entry point strategy and backtest code
//! should use: it fetches raw bars from a [`Provider`], normalizes and
//! sorts them, and caches the resulting [`OhlcvSeries`] by
//! `(ticker, start, end, interval)` so repeated lookups over the same
//! range (common across a backtest day loop) don't re-fetch or
//! re-normalize. The cache is bounded — oldest entry evicted first — since
//! an unbounded cache over a long backtest sweep would grow without limit.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::NaiveDate;

use crate::bar::{Bar, OhlcvSeries};
use crate::indicators::{compute_indicators, Indicators};
use crate::normalizer::{self, NormalizerError};
use crate::provider::{FetchRequest, Provider, ProviderError};

/// Bars are computed with at least this many calendar days of lookback
/// before the requested start date, so that warmup-heavy indicators (the
/// 200-day SMA in particular) have a value at the requested start.
pub const INDICATOR_LOOKBACK_DAYS: i64 = 250;

const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    ticker: String,
    start: NaiveDate,
    end: NaiveDate,
    interval: String,
}

#[derive(Debug)]
pub enum LoaderError {
    Provider(ProviderError),
    Normalize(NormalizerError),
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Provider(e) => write!(f, "provider error: {e}"),
            LoaderError::Normalize(e) => write!(f, "normalization error: {e}"),
            LoaderError::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} is after end {end}")
            }
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<ProviderError> for LoaderError {
    fn from(e: ProviderError) -> Self {
        LoaderError::Provider(e)
    }
}

impl From<NormalizerError> for LoaderError {
    fn from(e: NormalizerError) -> Self {
        LoaderError::Normalize(e)
    }
}

pub struct MarketDataLoader {
    provider: Box<dyn Provider>,
    cache: HashMap<CacheKey, OhlcvSeries>,
    cache_order: VecDeque<CacheKey>,
    cache_capacity: usize,
}

impl MarketDataLoader {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_cache_capacity(provider: Box<dyn Provider>, capacity: usize) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
            cache_capacity: capacity.max(1),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn fetch_and_normalize(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<OhlcvSeries, LoaderError> {
        let req = FetchRequest {
            symbols: vec![ticker.to_string()],
            timeframe: interval.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        };
        let raw = self.provider.fetch_historical(&req)?;
        let bars: Vec<Bar> = normalizer::normalize_all(&raw)?;
        let series = OhlcvSeries::new(ticker, interval, bars).slice(start, end);
        Ok(series)
    }

    fn insert_cache(&mut self, key: CacheKey, series: OhlcvSeries) {
        if !self.cache.contains_key(&key) && self.cache.len() >= self.cache_capacity {
            if let Some(oldest) = self.cache_order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.cache_order.push_back(key.clone());
        self.cache.insert(key, series);
    }

    /// Load an OHLCV series for `ticker` over `[start, end]`, using the
    /// cache when the exact `(ticker, start, end, interval)` key has
    /// already been fetched.
    pub fn load_ohlcv(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<OhlcvSeries, LoaderError> {
        if start > end {
            return Err(LoaderError::InvalidRange { start, end });
        }
        let key = CacheKey {
            ticker: ticker.to_string(),
            start,
            end,
            interval: interval.to_string(),
        };
        if let Some(series) = self.cache.get(&key) {
            return Ok(series.clone());
        }
        let series = self.fetch_and_normalize(ticker, start, end, interval)?;
        self.insert_cache(key, series.clone());
        Ok(series)
    }

    /// The close price on `date`, or the most recent prior trading day's
    /// close if `date` itself has no bar. `None` if neither exists in the
    /// loaded range or the provider has nothing on or before `date`.
    pub fn get_price_on_date(
        &mut self,
        ticker: &str,
        date: NaiveDate,
        interval: &str,
    ) -> Result<Option<tc_money::Decimal4>, LoaderError> {
        let lookback_start = date - chrono::Duration::days(INDICATOR_LOOKBACK_DAYS);
        let series = self.load_ohlcv(ticker, lookback_start, date, interval)?;
        Ok(series.last_bar_on_or_before(date).map(|b| b.close))
    }

    /// All trading days with a bar for `ticker` in `[start, end]`.
    pub fn get_trading_days(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<NaiveDate>, LoaderError> {
        let series = self.load_ohlcv(ticker, start, end, interval)?;
        Ok(series.trading_days())
    }

    /// Indicators for every bar in `[start, end]`, computed with an
    /// internal lookback window of [`INDICATOR_LOOKBACK_DAYS`] so
    /// long-window indicators (the 200-day SMA) are populated from the
    /// first requested date rather than needing their own warmup period
    /// visible to the caller.
    pub fn load_indicators(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<Indicators>, LoaderError> {
        if start > end {
            return Err(LoaderError::InvalidRange { start, end });
        }
        let lookback_start = start - chrono::Duration::days(INDICATOR_LOOKBACK_DAYS);
        let series = self.load_ohlcv(ticker, lookback_start, end, interval)?;
        let all = compute_indicators(&series.bars);
        Ok(all.into_iter().filter(|i| i.timestamp >= start).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryProvider, RawBar};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw_bar(day: u32, close: &str) -> RawBar {
        let ts = date(2024, 1, day).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        RawBar {
            symbol: "AAPL".to_string(),
            timeframe: "1D".to_string(),
            end_ts: ts,
            open: close.to_string(),
            high: close.to_string(),
            low: close.to_string(),
            close: close.to_string(),
            volume: 1_000,
            is_complete: true,
        }
    }

    fn loader_with_days(n: u32) -> MarketDataLoader {
        let mut provider = InMemoryProvider::new();
        let bars: Vec<RawBar> = (1..=n).map(|d| raw_bar(d, "100.00")).collect();
        provider.load("AAPL", bars);
        MarketDataLoader::new(Box::new(provider))
    }

    #[test]
    fn load_ohlcv_returns_sorted_series_in_range() {
        let mut loader = loader_with_days(10);
        let series = loader
            .load_ohlcv("AAPL", date(2024, 1, 1), date(2024, 1, 10), "1D")
            .unwrap();
        assert_eq!(series.bars.len(), 10);
    }

    #[test]
    fn load_ohlcv_caches_identical_requests() {
        let mut loader = loader_with_days(5);
        loader
            .load_ohlcv("AAPL", date(2024, 1, 1), date(2024, 1, 5), "1D")
            .unwrap();
        assert_eq!(loader.cache_len(), 1);
        loader
            .load_ohlcv("AAPL", date(2024, 1, 1), date(2024, 1, 5), "1D")
            .unwrap();
        assert_eq!(loader.cache_len(), 1);
    }

    #[test]
    fn get_price_on_date_falls_back_to_prior_bar() {
        let mut provider = InMemoryProvider::new();
        provider.load("AAPL", vec![raw_bar(1, "100.00"), raw_bar(5, "105.00")]);
        let mut loader = MarketDataLoader::new(Box::new(provider));
        let price = loader
            .get_price_on_date("AAPL", date(2024, 1, 3), "1D")
            .unwrap();
        assert_eq!(price.unwrap().to_string(), "100.0000");
    }

    #[test]
    fn invalid_range_is_rejected() {
        let mut loader = loader_with_days(3);
        let err = loader
            .load_ohlcv("AAPL", date(2024, 1, 5), date(2024, 1, 1), "1D")
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidRange { .. }));
    }

    #[test]
    fn cache_evicts_oldest_entry_beyond_capacity() {
        let mut provider = InMemoryProvider::new();
        provider.load("AAPL", vec![raw_bar(1, "100.00")]);
        provider.load("MSFT", vec![raw_bar(1, "200.00")]);
        let mut loader = MarketDataLoader::with_cache_capacity(Box::new(provider), 1);
        loader.load_ohlcv("AAPL", date(2024, 1, 1), date(2024, 1, 1), "1D").unwrap();
        loader.load_ohlcv("MSFT", date(2024, 1, 1), date(2024, 1, 1), "1D").unwrap();
        assert_eq!(loader.cache_len(), 1);
    }

    #[test]
    fn load_indicators_applies_lookback_and_filters_to_requested_range() {
        let mut loader = loader_with_days(260);
        let result = loader
            .load_indicators("AAPL", date(2024, 9, 1), date(2024, 9, 5), "1D")
            .unwrap();
        assert!(!result.is_empty());
        for ind in &result {
            assert!(ind.timestamp >= date(2024, 9, 1));
        }
    }
}
