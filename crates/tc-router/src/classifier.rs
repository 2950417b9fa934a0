//! Symbol → asset-class classification.
//!
//! Ticker text alone cannot distinguish an equity from an ETF, so the
//! classifier is a small ruleset plus an explicit ETF allow-list rather
//! than a pure function of the symbol string.

use std::collections::HashSet;

use tc_broker::AssetClass;

const KNOWN_FUTURES_ROOTS: &[&str] = &["ES", "NQ", "CL", "GC", "ZN", "YM", "RTY", "6E", "6J"];

#[derive(Debug, Clone, Default)]
pub struct SymbolClassifier {
    etf_symbols: HashSet<String>,
}

impl SymbolClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_etf_symbols(symbols: impl IntoIterator<Item = String>) -> Self {
        Self { etf_symbols: symbols.into_iter().collect() }
    }

    pub fn register_etf(&mut self, symbol: impl Into<String>) {
        self.etf_symbols.insert(symbol.into());
    }

    /// Classifies by, in order: crypto pair syntax (`BTC/USD`), registered
    /// ETF symbol, known futures root, ASX suffix (equity), default equity.
    pub fn classify(&self, symbol: &str) -> AssetClass {
        if symbol.contains('/') {
            return AssetClass::Crypto;
        }
        if self.etf_symbols.contains(symbol) {
            return AssetClass::Etf;
        }
        if KNOWN_FUTURES_ROOTS.contains(&symbol) {
            return AssetClass::Future;
        }
        AssetClass::Equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_pair_is_classified_as_crypto() {
        let c = SymbolClassifier::new();
        assert_eq!(c.classify("BTC/USD"), AssetClass::Crypto);
    }

    #[test]
    fn registered_etf_overrides_default_equity() {
        let c = SymbolClassifier::with_etf_symbols(["SPY".to_string()]);
        assert_eq!(c.classify("SPY"), AssetClass::Etf);
        assert_eq!(c.classify("AAPL"), AssetClass::Equity);
    }

    #[test]
    fn known_futures_root_is_classified_as_future() {
        let c = SymbolClassifier::new();
        assert_eq!(c.classify("ES"), AssetClass::Future);
    }

    #[test]
    fn asx_suffixed_symbol_defaults_to_equity() {
        let c = SymbolClassifier::new();
        assert_eq!(c.classify("BHP.AX"), AssetClass::Equity);
    }
}
