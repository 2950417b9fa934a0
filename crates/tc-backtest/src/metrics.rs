//! Performance metrics computed from a finished equity curve.
//!
//! These are statistical (mean, stdev, OLS) rather than exact-decimal
//! quantities, so they're carried as `f64` once derived from the
//! [`Decimal4`]-denominated curve.

use std::fmt;

use serde::{Deserialize, Serialize};
use tc_ledger::{Side as LedgerSide, TradeRecord};

use crate::curve::EquityCurvePoint;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub total_return_percent: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub annualized_volatility: f64,
    pub downside_volatility: f64,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub calmar: Option<f64>,
    pub max_drawdown: f64,
    pub avg_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_holding_period: f64,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub information_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    EmptyCurve,
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::EmptyCurve => write!(f, "cannot compute metrics from an empty equity curve"),
        }
    }
}

impl std::error::Error for MetricsError {}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Sample standard deviation (ddof=1); 0.0 when fewer than two points.
fn stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() as f64 - 1.0);
    var.sqrt()
}

pub fn calculate(
    curve: &[EquityCurvePoint],
    trades: &[TradeRecord],
    risk_free_rate: f64,
    benchmark_daily_returns: Option<&[f64]>,
) -> Result<PerformanceMetrics, MetricsError> {
    if curve.is_empty() {
        return Err(MetricsError::EmptyCurve);
    }

    let start_equity = curve[0].equity.raw().to_string().parse::<f64>().unwrap_or(0.0);
    let end_equity = curve.last().unwrap().equity.raw().to_string().parse::<f64>().unwrap_or(0.0);
    let trading_days = curve.len() as f64;

    let total_return = end_equity - start_equity;
    let total_return_percent = if start_equity != 0.0 { total_return / start_equity * 100.0 } else { 0.0 };
    let annualized_return = if start_equity > 0.0 && end_equity > 0.0 {
        (end_equity / start_equity).powf(TRADING_DAYS_PER_YEAR / trading_days) - 1.0
    } else {
        0.0
    };

    let daily_returns: Vec<f64> = curve.iter().filter_map(|p| p.daily_return).collect();
    let volatility = stdev(&daily_returns);
    let annualized_volatility = volatility * TRADING_DAYS_PER_YEAR.sqrt();

    let downside_returns: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_volatility = stdev(&downside_returns);
    let annualized_downside_volatility = downside_volatility * TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe = if annualized_volatility > 0.0 {
        Some((annualized_return - risk_free_rate) / annualized_volatility)
    } else {
        None
    };
    let sortino = if annualized_downside_volatility > 0.0 {
        Some((annualized_return - risk_free_rate) / annualized_downside_volatility)
    } else {
        None
    };

    let mut max_drawdown = 0.0f64;
    let mut drawdown_days: Vec<f64> = Vec::new();
    let mut max_drawdown_duration = 0i64;
    let mut current_run = 0i64;
    for point in curve {
        let peak = point.peak_equity.raw().to_string().parse::<f64>().unwrap_or(0.0);
        let dd = point.drawdown.raw().to_string().parse::<f64>().unwrap_or(0.0);
        let dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        if dd_pct > max_drawdown {
            max_drawdown = dd_pct;
        }
        if dd_pct > 0.0 {
            drawdown_days.push(dd_pct);
            current_run += 1;
            max_drawdown_duration = max_drawdown_duration.max(current_run);
        } else {
            current_run = 0;
        }
    }
    let avg_drawdown = mean(&drawdown_days);
    let calmar = if max_drawdown > 0.0 { Some(annualized_return / max_drawdown) } else { None };

    let sells: Vec<&TradeRecord> = trades.iter().filter(|t| t.side == LedgerSide::Sell).collect();
    let gains: Vec<f64> = sells
        .iter()
        .map(|t| t.cgt_net_gain.map(|g| g.raw().to_string().parse::<f64>().unwrap_or(0.0)).unwrap_or(0.0))
        .collect();
    let wins: Vec<f64> = gains.iter().copied().filter(|g| *g > 0.0).collect();
    let losses: Vec<f64> = gains.iter().copied().filter(|g| *g < 0.0).collect();
    let win_rate = if sells.is_empty() { 0.0 } else { wins.len() as f64 / sells.len() as f64 };
    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();
    let profit_factor = if gross_loss > 0.0 { gross_profit / gross_loss } else { 0.0 };
    let avg_win = mean(&wins);
    let avg_loss = mean(&losses);
    let avg_holding_period = mean(
        &sells
            .iter()
            .filter_map(|t| t.holding_period_days)
            .map(|d| d as f64)
            .collect::<Vec<_>>(),
    );

    let (alpha, beta, information_ratio) = match benchmark_daily_returns {
        Some(bench) if bench.len() == daily_returns.len() && bench.len() >= 2 => {
            let mean_r = mean(&daily_returns);
            let mean_b = mean(bench);
            let cov: f64 = daily_returns.iter().zip(bench).map(|(r, b)| (r - mean_r) * (b - mean_b)).sum::<f64>()
                / (daily_returns.len() as f64 - 1.0);
            let var_b = stdev(bench).powi(2);
            if var_b > 0.0 {
                let beta = cov / var_b;
                let alpha_daily = mean_r - beta * mean_b;
                let alpha = alpha_daily * TRADING_DAYS_PER_YEAR;
                let excess: Vec<f64> = daily_returns.iter().zip(bench).map(|(r, b)| r - b).collect();
                let tracking_error = stdev(&excess) * TRADING_DAYS_PER_YEAR.sqrt();
                let information_ratio =
                    if tracking_error > 0.0 { Some(mean(&excess) * TRADING_DAYS_PER_YEAR / tracking_error) } else { None };
                (Some(alpha), Some(beta), information_ratio)
            } else {
                (None, None, None)
            }
        }
        _ => (None, None, None),
    };

    Ok(PerformanceMetrics {
        total_return,
        total_return_percent,
        annualized_return,
        volatility,
        annualized_volatility,
        downside_volatility,
        sharpe,
        sortino,
        calmar,
        max_drawdown,
        avg_drawdown,
        max_drawdown_duration,
        win_rate,
        profit_factor,
        avg_win,
        avg_loss,
        avg_holding_period,
        alpha,
        beta,
        information_ratio,
    })
}
