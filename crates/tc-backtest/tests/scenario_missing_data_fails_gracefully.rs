use chrono::NaiveDate;
use tc_backtest::{BacktestConfig, BacktestEngine, BacktestStatus, PortfolioConfig};
use tc_marketdata::{InMemoryProvider, MarketDataLoader};
use tc_money::Decimal4;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A data-load error (no bars loaded for the ticker at all) is captured
/// into a failed result rather than propagated as a panic or an error
/// the caller has to unwrap.
#[test]
fn a_ticker_with_no_loaded_bars_produces_a_failed_result_with_a_message() {
    let provider = InMemoryProvider::new();
    let mut loader = MarketDataLoader::new(Box::new(provider));

    let config = BacktestConfig {
        name: "no-data".to_string(),
        tickers: vec!["ZZZZ".to_string()],
        primary_ticker: "ZZZZ".to_string(),
        start: date(2024, 1, 1),
        end: date(2024, 3, 1),
        warmup_period: 5,
        interval: "1D".to_string(),
        portfolio: PortfolioConfig::default(),
        benchmark_ticker: None,
        risk_free_rate: Decimal4::ZERO,
    };

    let engine = BacktestEngine::new(config);
    let mut strategy = |_ctx: &tc_backtest::DecisionContext| tc_backtest::TradingDecision::hold();
    let result = engine.run(&mut loader, &mut strategy);

    assert_eq!(result.status, BacktestStatus::Failed);
    assert!(result.error_message.is_some());
    assert!(result.equity_curve.is_empty());
    assert!(result.metrics.is_none());
}
