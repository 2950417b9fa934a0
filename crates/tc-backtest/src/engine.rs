//! Day-loop replay: BAR -> STRATEGY -> FILL -> MARK, against cached
//! OHLCV and a FIFO CGT ledger, exactly as the live pipeline would
//! record trades, but driven by a replayed calendar instead of a clock.

use std::collections::HashMap;
use std::fmt;

use chrono::{Duration, NaiveDate};

use tc_ledger::CgtLedger;
use tc_marketdata::{Indicators, LoaderError, MarketDataLoader, OhlcvSeries};
use tc_money::{Decimal4, FxRate, Rounding};
use tc_portfolio::{apply_entry, AssetClass, Fill, LedgerEntry, Portfolio, Side as PortfolioSide};

use crate::commission::{apply_slippage, commission};
use crate::config::{BacktestConfig, PortfolioConfig};
use crate::curve::EquityCurvePoint;
use crate::decision::{DecisionContext, DecisionSignal, Strategy, TradingDecision};

use crate::metrics::{self, MetricsError};
use crate::result::{BacktestResult, BacktestStatus};

/// Calendar days fetched before `start` so indicators relying on longer
/// windows (SMA-200) are populated from the first requested date.
const PRELOAD_BUFFER_DAYS: i64 = 260;

#[derive(Debug)]
pub enum EngineError {
    Loader(LoaderError),
    Cgt(tc_ledger::CgtError),
    Metrics(MetricsError),
    NoTradingDays,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Loader(e) => write!(f, "{e}"),
            EngineError::Cgt(e) => write!(f, "{e}"),
            EngineError::Metrics(e) => write!(f, "{e}"),
            EngineError::NoTradingDays => write!(f, "primary ticker has no trading days in the requested range"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<LoaderError> for EngineError {
    fn from(e: LoaderError) -> Self {
        EngineError::Loader(e)
    }
}

impl From<tc_ledger::CgtError> for EngineError {
    fn from(e: tc_ledger::CgtError) -> Self {
        EngineError::Cgt(e)
    }
}

impl From<MetricsError> for EngineError {
    fn from(e: MetricsError) -> Self {
        EngineError::Metrics(e)
    }
}

fn to_f64(d: Decimal4) -> f64 {
    d.raw().to_string().parse().unwrap_or(0.0)
}

/// Reduce `requested` until `qty * exec_price + commission(qty) <= cash`.
fn affordable_qty(requested: i64, exec_price: Decimal4, cash: Decimal4, cfg: &PortfolioConfig) -> i64 {
    let mut qty = requested.max(0);
    while qty > 0 {
        let notional = exec_price.checked_mul_qty(qty, Rounding::Down).expect("notional overflow");
        let fee = commission(qty, notional, cfg);
        let total = notional.checked_add(fee).expect("total cost overflow");
        if total.raw() <= cash.raw() {
            return qty;
        }
        qty -= 1;
    }
    0
}

fn percent_of_equity_qty(cash: Decimal4, exec_price: Decimal4, percent: Decimal4) -> i64 {
    if exec_price.is_zero() || exec_price.is_negative() {
        return 0;
    }
    let hundred = Decimal4::from_scaled_i128(100 * 10_000);
    let budget = cash
        .checked_mul(percent, Rounding::Down)
        .and_then(|v| v.checked_div(hundred, Rounding::Down))
        .expect("sizing budget overflow");
    let shares = budget.checked_div(exec_price, Rounding::Down).expect("sizing quantity overflow");
    (shares.raw().floor().to_string().parse::<i64>()).unwrap_or(0).max(0)
}

pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Runs the configured replay. Never panics on data or internal
    /// errors — a failed run is reported as `BacktestResult::failed`
    /// rather than propagated, per the contract every other run-mode in
    /// this workspace keeps: a result is always produced.
    pub fn run(&self, loader: &mut MarketDataLoader, strategy: &mut Strategy) -> BacktestResult {
        match self.run_inner(loader, strategy) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "backtest run failed");
                BacktestResult::failed(
                    self.config.name.clone(),
                    self.config.tickers.clone(),
                    self.config.start,
                    self.config.end,
                    self.config.portfolio.initial_cash,
                    e.to_string(),
                )
            }
        }
    }

    fn run_inner(&self, loader: &mut MarketDataLoader, strategy: &mut Strategy) -> Result<BacktestResult, EngineError> {
        let cfg = &self.config;
        let fetch_start = cfg.start - Duration::days(PRELOAD_BUFFER_DAYS);

        let mut series_by_ticker: HashMap<String, OhlcvSeries> = HashMap::new();
        let mut indicators_by_ticker: HashMap<String, Vec<Indicators>> = HashMap::new();
        for ticker in &cfg.tickers {
            let series = loader.load_ohlcv(ticker, fetch_start, cfg.end, &cfg.interval)?;
            let indicators = loader.load_indicators(ticker, cfg.start, cfg.end, &cfg.interval)?;
            series_by_ticker.insert(ticker.clone(), series);
            indicators_by_ticker.insert(ticker.clone(), indicators);
        }

        let benchmark_series = match &cfg.benchmark_ticker {
            Some(b) => Some(loader.load_ohlcv(b, fetch_start, cfg.end, &cfg.interval)?),
            None => None,
        };

        let primary = series_by_ticker
            .get(&cfg.primary_ticker)
            .expect("primary_ticker must be present in tickers");
        let trading_days: Vec<NaiveDate> =
            primary.trading_days().into_iter().filter(|d| *d >= cfg.start && *d <= cfg.end).collect();
        if trading_days.is_empty() {
            return Err(EngineError::NoTradingDays);
        }

        let mut portfolio = Portfolio::new(cfg.portfolio.initial_cash);
        let mut ledger = CgtLedger::new();
        let mut curve: Vec<EquityCurvePoint> = Vec::new();
        let mut running_peak = cfg.portfolio.initial_cash;
        let mut prior_equity: Option<Decimal4> = None;
        let mut order_seq: u64 = 0;

        for (day_idx, date) in trading_days.iter().enumerate() {
            let in_warmup = (day_idx as i64) < cfg.warmup_period;
            let is_last_day = day_idx == trading_days.len() - 1;

            for ticker in &cfg.tickers {
                let series = &series_by_ticker[ticker];
                let Some(bar) = series.get_bar(*date) else { continue };
                let indicators = indicators_by_ticker
                    .get(ticker)
                    .and_then(|v| v.iter().find(|i| i.timestamp == *date));
                let holding = portfolio.positions.get(ticker).map(|p| !p.is_flat()).unwrap_or(false);

                let decision = if is_last_day {
                    if holding { TradingDecision::sell() } else { TradingDecision::hold() }
                } else if in_warmup {
                    TradingDecision::hold()
                } else {
                    let ctx = DecisionContext { ticker, date: *date, bar, indicators, holding };
                    strategy(&ctx)
                };

                match decision.signal {
                    DecisionSignal::Hold => {}
                    DecisionSignal::Buy if !holding => {
                        let exec_price = apply_slippage(bar.close, PortfolioSide::Buy, cfg.portfolio.slippage_percent);
                        let requested = decision
                            .recommended_quantity
                            .unwrap_or_else(|| percent_of_equity_qty(portfolio.cash, exec_price, cfg.portfolio.max_position_size_percent));
                        let qty = affordable_qty(requested, exec_price, portfolio.cash, &cfg.portfolio);
                        if qty <= 0 {
                            continue;
                        }
                        let notional = exec_price.checked_mul_qty(qty, Rounding::Down).expect("notional overflow");
                        let fee = commission(qty, notional, &cfg.portfolio);
                        order_seq += 1;
                        let fill = Fill::new(ticker.clone(), PortfolioSide::Buy, qty, exec_price, fee, AssetClass::Equity);
                        apply_entry(&mut portfolio, LedgerEntry::Fill(fill));
                        ledger.record_buy(
                            format!("bt-{order_seq}"),
                            ticker.clone(),
                            qty,
                            exec_price,
                            fee,
                            *date,
                            "AUD",
                            FxRate::one_to_one(),
                            100,
                        )?;
                    }
                    DecisionSignal::Buy => {
                        // already holding: no pyramiding in the replay model.
                    }
                    DecisionSignal::Sell if holding => {
                        let qty = portfolio.positions[ticker].quantity;
                        let exec_price = apply_slippage(bar.close, PortfolioSide::Sell, cfg.portfolio.slippage_percent);
                        let notional = exec_price.checked_mul_qty(qty, Rounding::Down).expect("notional overflow");
                        let fee = commission(qty, notional, &cfg.portfolio);
                        order_seq += 1;
                        let fill = Fill::new(ticker.clone(), PortfolioSide::Sell, qty, exec_price, fee, AssetClass::Equity);
                        apply_entry(&mut portfolio, LedgerEntry::Fill(fill));
                        ledger.record_sell(
                            format!("bt-{order_seq}"),
                            ticker.clone(),
                            qty,
                            exec_price,
                            fee,
                            *date,
                            "AUD",
                            FxRate::one_to_one(),
                            100,
                        )?;
                    }
                    DecisionSignal::Sell => {
                        // no position to close: no-op.
                    }
                }
            }

            let mut positions_value = Decimal4::ZERO;
            for (ticker, position) in portfolio.positions.iter_mut() {
                if position.is_flat() {
                    continue;
                }
                if let Some(series) = series_by_ticker.get(ticker) {
                    if let Some(bar) = series.last_bar_on_or_before(*date) {
                        position.mark(bar.close);
                    }
                }
                positions_value = positions_value.checked_add(position.market_value()).expect("positions value overflow");
            }
            portfolio.positions.retain(|_, p| !p.is_flat());

            let (point, new_peak) = EquityCurvePoint::new(*date, portfolio.cash, positions_value, running_peak, prior_equity);
            running_peak = new_peak;
            prior_equity = Some(point.equity);
            curve.push(point);
        }

        let benchmark_returns: Option<Vec<f64>> = benchmark_series.as_ref().map(|series| {
            let mut rets = Vec::new();
            let mut prev: Option<Decimal4> = None;
            for date in &trading_days {
                let close = series.last_bar_on_or_before(*date).map(|b| b.close);
                if let (Some(c), Some(p)) = (close, prev) {
                    let r = if p.is_zero() { 0.0 } else { (to_f64(c) - to_f64(p)) / to_f64(p) };
                    rets.push(r);
                }
                if close.is_some() {
                    prev = close;
                }
            }
            rets
        });

        let metrics = metrics::calculate(&curve, ledger.trades(), to_f64(cfg.risk_free_rate), benchmark_returns.as_deref())?;

        let end_equity = curve.last().expect("non-empty curve checked above").equity;
        Ok(BacktestResult {
            status: BacktestStatus::Completed,
            name: cfg.name.clone(),
            tickers: cfg.tickers.clone(),
            start: cfg.start,
            end: cfg.end,
            initial_cash: cfg.portfolio.initial_cash,
            trading_days: curve.len(),
            total_trades: ledger.trades().len(),
            trades: ledger.trades().to_vec(),
            equity_curve: curve,
            end_equity,
            metrics: Some(metrics),
            error_message: None,
        })
    }
}
