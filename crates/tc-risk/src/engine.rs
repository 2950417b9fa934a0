//! Stateful wrapper around the rule evaluators: tracks daily P&L, the
//! running equity peak, a consecutive-loss streak, and the cooling-off
//! latch, then runs every enabled rule against a proposed order.

use chrono::{DateTime, Utc};

use tc_money::Decimal4;

use crate::rules;
use crate::types::{RiskLimits, RiskCheckResponse, RuleType, Severity, ValidationContext, Violation};

type CustomRule = Box<dyn Fn(&ValidationContext) -> Option<Violation> + Send + Sync>;

/// Pre-trade risk gate. One instance per trading session; call
/// [`RiskManager::validate_order`] before every order submission and feed
/// realized P&L back through [`RiskManager::record_trade_result`] as fills
/// land.
pub struct RiskManager {
    limits: RiskLimits,
    daily_pnl: Decimal4,
    peak_equity: Decimal4,
    consecutive_losses: u32,
    cooling_off_until: Option<DateTime<Utc>>,
    custom_rules: Vec<CustomRule>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            daily_pnl: Decimal4::ZERO,
            peak_equity: Decimal4::ZERO,
            consecutive_losses: 0,
            cooling_off_until: None,
            custom_rules: Vec::new(),
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn daily_pnl(&self) -> Decimal4 {
        self.daily_pnl
    }

    pub fn cooling_off_until(&self) -> Option<DateTime<Utc>> {
        self.cooling_off_until
    }

    pub fn is_cooling_off(&self, now: DateTime<Utc>) -> bool {
        self.cooling_off_until.is_some_and(|deadline| now < deadline)
    }

    /// Registers an additional rule evaluated after the built-ins. A
    /// panicking rule is caught and turned into a `Custom` violation rather
    /// than poisoning the whole check.
    pub fn add_custom_rule<F>(&mut self, rule: F)
    where
        F: Fn(&ValidationContext) -> Option<Violation> + Send + Sync + 'static,
    {
        self.custom_rules.push(Box::new(rule));
    }

    /// Updates the running equity peak. Drawdown rules compare against this,
    /// never against the raw current equity.
    pub fn update_peak_equity(&mut self, equity: Decimal4) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }

    pub fn peak_equity(&self) -> Decimal4 {
        self.peak_equity
    }

    /// Rolls in a closed trade's realized P&L: accumulates the daily total
    /// and extends or resets the consecutive-loss streak.
    pub fn record_trade_result(&mut self, realized_pnl: Decimal4) {
        self.daily_pnl = self.daily_pnl.checked_add(realized_pnl).unwrap_or(self.daily_pnl);
        if realized_pnl.is_negative() {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Clears daily P&L and the cooling-off latch. Call once per trading
    /// day; does not touch the equity peak or loss streak.
    pub fn reset_daily_limits(&mut self) {
        self.daily_pnl = Decimal4::ZERO;
        self.cooling_off_until = None;
    }

    pub fn reset_all(&mut self) {
        self.daily_pnl = Decimal4::ZERO;
        self.peak_equity = Decimal4::ZERO;
        self.consecutive_losses = 0;
        self.cooling_off_until = None;
    }

    fn engage_cooling_off(&mut self, now: DateTime<Utc>) {
        if self.limits.cooling_off_period_minutes <= 0 {
            return;
        }
        let deadline = now + chrono::Duration::minutes(self.limits.cooling_off_period_minutes);
        self.cooling_off_until = Some(self.cooling_off_until.map_or(deadline, |d| d.max(deadline)));
    }

    /// Runs every enabled rule against `ctx`. While cooling off, every other
    /// rule is skipped — the response carries only the cooling-off
    /// violation so the caller does not act on stale limit checks.
    pub fn validate_order(&mut self, ctx: &ValidationContext, equity: Decimal4, now: DateTime<Utc>) -> RiskCheckResponse {
        if let Some(deadline) = self.cooling_off_until {
            if now < deadline {
                let remaining = deadline - now;
                return RiskCheckResponse {
                    passed: false,
                    violations: vec![Violation::new(
                        RuleType::CoolingOffPeriod,
                        "cooling_off_period",
                        format!(
                            "trading is paused for cooling off, {} minute(s) remaining",
                            remaining.num_minutes().max(0) + 1
                        ),
                        Decimal4::ZERO,
                        Decimal4::ZERO,
                        Severity::Error,
                    )],
                };
            }
            self.cooling_off_until = None;
        }

        self.update_peak_equity(equity);

        let mut violations = Vec::new();
        let mut triggers_cooling_off = false;

        macro_rules! push {
            ($opt:expr) => {
                if let Some(v) = $opt {
                    violations.push(v);
                }
            };
        }

        push!(rules::position_size(ctx, &self.limits));
        push!(rules::position_value(ctx, &self.limits));
        push!(rules::concentration(ctx, &self.limits));
        push!(rules::total_positions(ctx, &self.limits));

        if let Some(v) = rules::daily_loss_absolute(self.daily_pnl, &self.limits) {
            triggers_cooling_off = true;
            violations.push(v);
        }
        if let Some(v) = rules::daily_loss_percent(self.daily_pnl, equity, &self.limits) {
            triggers_cooling_off = true;
            violations.push(v);
        }
        push!(rules::drawdown_absolute(self.peak_equity, equity, &self.limits));
        push!(rules::drawdown_percent(self.peak_equity, equity, &self.limits));
        push!(rules::single_trade_loss(ctx, &self.limits));

        if let Some(v) = rules::consecutive_losses(self.consecutive_losses, &self.limits) {
            triggers_cooling_off = true;
            violations.push(v);
        }

        for rule in &self.custom_rules {
            let ctx_owned = ctx.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rule(&ctx_owned)));
            match result {
                Ok(Some(v)) => violations.push(v),
                Ok(None) => {}
                Err(_) => violations.push(Violation::new(
                    RuleType::Custom,
                    "custom_rule_panicked",
                    "a custom risk rule panicked and was treated as a rejection",
                    Decimal4::ZERO,
                    Decimal4::ZERO,
                    Severity::Error,
                )),
            }
        }

        if triggers_cooling_off {
            self.engage_cooling_off(now);
        }

        let passed = !violations.iter().any(|v| v.severity == Severity::Error);
        RiskCheckResponse { passed, violations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn d(s: &str) -> Decimal4 {
        Decimal4::parse(s).unwrap()
    }

    fn ctx() -> ValidationContext {
        ValidationContext {
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            order_qty: 500,
            current_qty: 600,
            estimated_price: d("10.0000"),
            equity: d("100000.0000"),
            open_position_count: 1,
            opens_new_symbol: false,
        }
    }

    #[test]
    fn oversized_position_is_rejected() {
        let mut limits = RiskLimits::default();
        limits.max_position_size = Some(1000);
        let mut mgr = RiskManager::new(limits);
        let resp = mgr.validate_order(&ctx(), d("100000.0000"), Utc::now());
        assert!(!resp.passed);
        assert_eq!(resp.violations[0].rule_name, "max_position_size");
        assert_eq!(resp.violations[0].current_value, d("1100.0000"));
        assert_eq!(resp.violations[0].limit_value, d("1000.0000"));
    }

    #[test]
    fn cooling_off_latches_and_expires() {
        let mut limits = RiskLimits::default();
        limits.max_daily_loss = Some(d("1000.0000"));
        limits.cooling_off_period_minutes = 30;
        let mut mgr = RiskManager::new(limits);
        mgr.record_trade_result(d("-1500.0000"));

        let t0 = Utc::now();
        let first = mgr.validate_order(&ctx(), d("100000.0000"), t0);
        assert!(!first.passed);
        assert_eq!(first.violations[0].rule_name, "max_daily_loss");
        assert!(mgr.is_cooling_off(t0));

        let mid = t0 + chrono::Duration::minutes(10);
        let second = mgr.validate_order(&ctx(), d("100000.0000"), mid);
        assert!(!second.passed);
        assert_eq!(second.violations[0].rule_name, "cooling_off_period");

        let after = t0 + chrono::Duration::minutes(31);
        let third = mgr.validate_order(&ctx(), d("100000.0000"), after);
        assert!(third.passed || third.violations.iter().all(|v| v.rule_name != "cooling_off_period"));
    }

    #[test]
    fn consecutive_losses_trip_cooling_off() {
        let mut limits = RiskLimits::default();
        limits.max_consecutive_losses = Some(3);
        limits.cooling_off_period_minutes = 15;
        let mut mgr = RiskManager::new(limits);
        mgr.record_trade_result(d("-10.0000"));
        mgr.record_trade_result(d("-10.0000"));
        mgr.record_trade_result(d("-10.0000"));
        let resp = mgr.validate_order(&ctx(), d("100000.0000"), Utc::now());
        assert!(!resp.passed);
        assert_eq!(resp.violations[0].rule_name, "max_consecutive_losses");
    }

    #[test]
    fn a_winning_trade_resets_the_streak() {
        let mut mgr = RiskManager::new(RiskLimits::default());
        mgr.record_trade_result(d("-10.0000"));
        mgr.record_trade_result(d("-10.0000"));
        mgr.record_trade_result(d("5.0000"));
        assert_eq!(mgr.consecutive_losses, 0);
    }

    #[test]
    fn custom_rule_panic_becomes_a_rejection_not_a_crash() {
        let mut mgr = RiskManager::new(RiskLimits::default());
        mgr.add_custom_rule(|_ctx| panic!("boom"));
        let resp = mgr.validate_order(&ctx(), d("100000.0000"), Utc::now());
        assert!(!resp.passed);
        assert_eq!(resp.violations[0].rule_name, "custom_rule_panicked");
    }
}
