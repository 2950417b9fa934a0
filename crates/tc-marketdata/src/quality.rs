//! Data-quality gate for normalized OHLCV bars.
//!
//! Accepts a slice of [`Bar`] for a single ticker/timeframe and produces a
//! [`QualityReport`] covering:
//! - total bar count
//! - duplicate dates
//! - monotonicity violations
//! - gap events (daily timeframe only — a `Bar` carries no time-of-day
//!   component, so intraday timeframes are reported as unknown and
//!   skipped rather than gap-checked against a fabricated step)
//!
//! This module does **not** fetch data, write to a database, or perform
//! normalization (see `normalizer.rs`).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::bar::Bar;

/// Returns the expected bar-to-bar step in days for a canonical timeframe
/// string, or `None` if gap detection doesn't apply (intraday timeframes,
/// or an unrecognised string).
fn expected_step_days(timeframe: &str) -> Option<i64> {
    match timeframe {
        "1D" => Some(1),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BarKey {
    pub symbol: String,
    pub timeframe: String,
    pub date: NaiveDate,
}

impl fmt::Display for BarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.symbol, self.timeframe, self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: String,
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.symbol, self.timeframe)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIssue {
    pub key: BarKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonotonicityIssue {
    pub series: SeriesKey,
    pub date: NaiveDate,
    pub prev_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapIssue {
    pub series: SeriesKey,
    pub prev_date: NaiveDate,
    pub next_date: NaiveDate,
    pub delta_days: i64,
    pub expected_step_days: i64,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total_bars: usize,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub unknown_timeframe_series_count: usize,
    pub duplicates: Vec<DuplicateIssue>,
    pub monotonicity_violations: Vec<MonotonicityIssue>,
    pub gaps: Vec<GapIssue>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.monotonicity_violations.is_empty() && self.gaps.is_empty()
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QualityReport {{")?;
        writeln!(f, "  total_bars: {}", self.total_bars)?;
        writeln!(
            f,
            "  earliest_date: {}",
            self.earliest_date.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
        )?;
        writeln!(
            f,
            "  latest_date: {}",
            self.latest_date.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
        )?;
        writeln!(f, "  unknown_timeframe_series: {}", self.unknown_timeframe_series_count)?;
        writeln!(f, "  duplicates: {}", self.duplicates.len())?;
        for d in &self.duplicates {
            writeln!(f, "    key={} count={}", d.key, d.count)?;
        }
        writeln!(f, "  monotonicity_violations: {}", self.monotonicity_violations.len())?;
        for m in &self.monotonicity_violations {
            writeln!(f, "    series={} date={} prev_date={}", m.series, m.date, m.prev_date)?;
        }
        writeln!(f, "  gaps: {}", self.gaps.len())?;
        for g in &self.gaps {
            writeln!(
                f,
                "    series={} prev={} next={} delta={}d expected={}d",
                g.series, g.prev_date, g.next_date, g.delta_days, g.expected_step_days
            )?;
        }
        write!(f, "}}")
    }
}

/// Build a [`QualityReport`] from `(symbol, timeframe, bars)`. Deterministic:
/// bars are sorted internally so the result does not depend on input order.
pub fn build_quality_report(symbol: &str, timeframe: &str, bars: &[Bar]) -> QualityReport {
    let total_bars = bars.len();
    let earliest_date = bars.iter().map(|b| b.timestamp).min();
    let latest_date = bars.iter().map(|b| b.timestamp).max();

    let mut key_counts: BTreeMap<BarKey, usize> = BTreeMap::new();
    for bar in bars {
        let key = BarKey {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            date: bar.timestamp,
        };
        *key_counts.entry(key).or_insert(0) += 1;
    }
    let duplicates: Vec<DuplicateIssue> = key_counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(key, count)| DuplicateIssue { key, count })
        .collect();

    let series = SeriesKey {
        symbol: symbol.to_string(),
        timeframe: timeframe.to_string(),
    };
    let mut dates: Vec<NaiveDate> = bars.iter().map(|b| b.timestamp).collect();
    dates.sort_unstable();

    let step = expected_step_days(timeframe);
    let unknown_timeframe_series_count = if step.is_none() && !dates.is_empty() { 1 } else { 0 };

    let mut monotonicity_violations = Vec::new();
    let mut gaps = Vec::new();

    for window in dates.windows(2) {
        let prev = window[0];
        let next = window[1];
        if next <= prev {
            monotonicity_violations.push(MonotonicityIssue {
                series: series.clone(),
                date: next,
                prev_date: prev,
            });
        }
        if let Some(expected) = step {
            if next > prev {
                let delta = (next - prev).num_days();
                if delta > expected {
                    gaps.push(GapIssue {
                        series: series.clone(),
                        prev_date: prev,
                        next_date: next,
                        delta_days: delta,
                        expected_step_days: expected,
                    });
                }
            }
        }
    }

    QualityReport {
        total_bars,
        earliest_date,
        latest_date,
        unknown_timeframe_series_count,
        duplicates,
        monotonicity_violations,
        gaps,
    }
}
