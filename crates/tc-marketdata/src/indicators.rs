//! Technical indicator computation over a [`Bar`] series.
//!
//! Indicators are computed on `f64` internally — they are derived
//! analytics, not settlement-path monetary values, so the strict
//! string-parsed [`Decimal4`] discipline used by `tc-money` would only add
//! friction without protecting anything real. Results are rounded into
//! [`Decimal4`] at the boundary via [`Indicators`] so downstream signal
//! code still works with the same fixed-precision type as the rest of the
//! workspace.
//!
//! All moving-window indicators require warmup: an indicator needing an
//! `N`-bar window produces no value for the first `N-1` bars of the input
//! slice. Callers that need indicators starting from a given date should
//! supply a series that already includes a lookback window before that
//! date (see `loader::MarketDataLoader::load_indicators`).

use chrono::NaiveDate;
use tc_money::Decimal4;

use crate::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicators {
    pub timestamp: NaiveDate,
    pub sma_20: Option<Decimal4>,
    pub sma_50: Option<Decimal4>,
    pub sma_200: Option<Decimal4>,
    pub ema_10: Option<Decimal4>,
    pub ema_20: Option<Decimal4>,
    pub rsi_14: Option<Decimal4>,
    pub macd: Option<Decimal4>,
    pub macd_signal: Option<Decimal4>,
    pub macd_histogram: Option<Decimal4>,
    pub bollinger_upper: Option<Decimal4>,
    pub bollinger_middle: Option<Decimal4>,
    pub bollinger_lower: Option<Decimal4>,
    pub atr_14: Option<Decimal4>,
    pub mfi_14: Option<Decimal4>,
}

fn to_decimal(v: f64) -> Option<Decimal4> {
    Decimal4::parse(&format!("{v:.4}")).ok()
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close.raw().to_string().parse::<f64>().unwrap_or(0.0)).collect()
}

fn sma_series(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in 0..values.len() {
        if i + 1 >= window {
            let sum: f64 = values[i + 1 - window..=i].iter().sum();
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

fn ema_series(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let seed_idx = window - 1;
    if values.len() <= seed_idx {
        return out;
    }
    let seed: f64 = values[0..window].iter().sum::<f64>() / window as f64;
    out[seed_idx] = Some(seed);
    let mut prev = seed;
    for (i, value) in values.iter().enumerate().skip(window) {
        let next = alpha * value + (1.0 - alpha) * prev;
        out[i] = Some(next);
        prev = next;
    }
    out
}

fn rsi_series(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if values.len() <= window {
        return out;
    }
    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=window {
        let delta = values[i] - values[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let mut avg_gain = gains / window as f64;
    let mut avg_loss = losses / window as f64;
    out[window] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (window + 1)..values.len() {
        let delta = values[i] - values[i - 1];
        let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (window as f64 - 1.0) + gain) / window as f64;
        avg_loss = (avg_loss * (window as f64 - 1.0) + loss) / window as f64;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

fn stdev(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    let high: f64 = bar.high.raw().to_string().parse().unwrap_or(0.0);
    let low: f64 = bar.low.raw().to_string().parse().unwrap_or(0.0);
    (high - low).max((high - prev_close).abs()).max((low - prev_close).abs())
}

fn atr_series(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if bars.len() <= window {
        return out;
    }
    let closes = closes(bars);
    let mut trs = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        trs.push(if i == 0 { f64::NAN } else { true_range(&bars[i], closes[i - 1]) });
    }
    let seed: f64 = trs[1..=window].iter().sum::<f64>() / window as f64;
    out[window] = Some(seed);
    let mut prev = seed;
    for i in (window + 1)..bars.len() {
        let next = (prev * (window as f64 - 1.0) + trs[i]) / window as f64;
        out[i] = Some(next);
        prev = next;
    }
    out
}

fn typical_price(bar: &Bar) -> f64 {
    let high: f64 = bar.high.raw().to_string().parse().unwrap_or(0.0);
    let low: f64 = bar.low.raw().to_string().parse().unwrap_or(0.0);
    let close: f64 = bar.close.raw().to_string().parse().unwrap_or(0.0);
    (high + low + close) / 3.0
}

fn mfi_series(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if bars.len() <= window {
        return out;
    }
    let tp: Vec<f64> = bars.iter().map(typical_price).collect();
    let raw_mf: Vec<f64> = bars.iter().zip(tp.iter()).map(|(b, t)| t * b.volume as f64).collect();

    for i in window..bars.len() {
        let mut positive = 0.0;
        let mut negative = 0.0;
        for j in (i - window + 1)..=i {
            if tp[j] > tp[j - 1] {
                positive += raw_mf[j];
            } else if tp[j] < tp[j - 1] {
                negative += raw_mf[j];
            }
        }
        let mfi = if negative == 0.0 {
            100.0
        } else {
            let ratio = positive / negative;
            100.0 - 100.0 / (1.0 + ratio)
        };
        out[i] = Some(mfi);
    }
    out
}

/// Compute the full indicator set for every bar in `bars`. Each field is
/// `None` until its warmup window has been satisfied.
pub fn compute_indicators(bars: &[Bar]) -> Vec<Indicators> {
    let values = closes(bars);

    let sma_20 = sma_series(&values, 20);
    let sma_50 = sma_series(&values, 50);
    let sma_200 = sma_series(&values, 200);
    let ema_10 = ema_series(&values, 10);
    let ema_20 = ema_series(&values, 20);
    let ema_12 = ema_series(&values, 12);
    let ema_26 = ema_series(&values, 26);
    let rsi_14 = rsi_series(&values, 14);
    let atr_14 = atr_series(bars, 14);
    let mfi_14 = mfi_series(bars, 14);

    let macd_line: Vec<Option<f64>> = ema_12
        .iter()
        .zip(ema_26.iter())
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        })
        .collect();

    let macd_values: Vec<f64> = macd_line.iter().filter_map(|v| *v).collect();
    let macd_signal_compact = ema_series(&macd_values, 9);
    let mut macd_signal = vec![None; bars.len()];
    let mut compact_idx = 0;
    for (i, m) in macd_line.iter().enumerate() {
        if m.is_some() {
            macd_signal[i] = macd_signal_compact[compact_idx];
            compact_idx += 1;
        }
    }

    let mut out = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        let bollinger = sma_20[i].map(|mid| {
            let window = &values[i + 1 - 20..=i];
            let sd = stdev(window);
            (mid + 2.0 * sd, mid, mid - 2.0 * sd)
        });

        let macd = macd_line[i];
        let signal = macd_signal[i];
        let histogram = match (macd, signal) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        };

        out.push(Indicators {
            timestamp: bars[i].timestamp,
            sma_20: sma_20[i].and_then(to_decimal),
            sma_50: sma_50[i].and_then(to_decimal),
            sma_200: sma_200[i].and_then(to_decimal),
            ema_10: ema_10[i].and_then(to_decimal),
            ema_20: ema_20[i].and_then(to_decimal),
            rsi_14: rsi_14[i].and_then(to_decimal),
            macd: macd.and_then(to_decimal),
            macd_signal: signal.and_then(to_decimal),
            macd_histogram: histogram.and_then(to_decimal),
            bollinger_upper: bollinger.and_then(|(u, _, _)| to_decimal(u)),
            bollinger_middle: bollinger.and_then(|(_, m, _)| to_decimal(m)),
            bollinger_lower: bollinger.and_then(|(_, _, l)| to_decimal(l)),
            atr_14: atr_14[i].and_then(to_decimal),
            mfi_14: mfi_14[i].and_then(to_decimal),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(day: u32, close: f64, volume: i64) -> Bar {
        let c = format!("{close:.4}");
        Bar {
            timestamp: date(2024, 1, day),
            open: Decimal4::parse(&c).unwrap(),
            high: Decimal4::parse(&format!("{:.4}", close + 1.0)).unwrap(),
            low: Decimal4::parse(&format!("{:.4}", close - 1.0)).unwrap(),
            close: Decimal4::parse(&c).unwrap(),
            volume,
            adjusted_close: None,
        }
    }

    fn flat_series(n: u32, close: f64) -> Vec<Bar> {
        (1..=n).map(|d| bar(d, close, 1_000)).collect()
    }

    #[test]
    fn sma_20_is_none_before_warmup() {
        let bars = flat_series(19, 100.0);
        let result = compute_indicators(&bars);
        assert!(result[18].sma_20.is_none());
    }

    #[test]
    fn sma_20_present_at_warmup_boundary() {
        let bars = flat_series(20, 100.0);
        let result = compute_indicators(&bars);
        assert_eq!(result[19].sma_20, Some(Decimal4::parse("100.0000").unwrap()));
    }

    #[test]
    fn rsi_14_is_100_for_strictly_rising_series() {
        let bars: Vec<Bar> = (1..=20).map(|d| bar(d, 100.0 + d as f64, 1_000)).collect();
        let result = compute_indicators(&bars);
        let rsi = result[19].rsi_14.unwrap();
        assert_eq!(rsi, Decimal4::parse("100.0000").unwrap());
    }

    #[test]
    fn bollinger_bands_collapse_to_sma_for_flat_series() {
        let bars = flat_series(25, 50.0);
        let result = compute_indicators(&bars);
        let last = &result[24];
        assert_eq!(last.bollinger_upper, last.bollinger_middle);
        assert_eq!(last.bollinger_lower, last.bollinger_middle);
    }

    #[test]
    fn atr_14_is_zero_for_series_with_no_range() {
        // high == low == close means true range is driven only by close deltas,
        // but in a flat series closes never move either.
        let bars: Vec<Bar> = (1..=20)
            .map(|d| Bar {
                timestamp: date(2024, 1, d),
                open: Decimal4::parse("100.0000").unwrap(),
                high: Decimal4::parse("100.0000").unwrap(),
                low: Decimal4::parse("100.0000").unwrap(),
                close: Decimal4::parse("100.0000").unwrap(),
                volume: 1_000,
                adjusted_close: None,
            })
            .collect();
        let result = compute_indicators(&bars);
        assert_eq!(result[14].atr_14, Some(Decimal4::parse("0.0000").unwrap()));
    }

    #[test]
    fn macd_warmup_requires_slow_ema_and_signal() {
        let bars = flat_series(33, 100.0);
        let result = compute_indicators(&bars);
        assert!(result[20].macd.is_some());
        assert!(result[20].macd_signal.is_none() || result[32].macd_signal.is_some());
    }
}
