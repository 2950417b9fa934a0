use chrono::Utc;
use tc_money::Decimal4;
use tc_risk::{RiskLimits, RiskManager, Side, ValidationContext};

fn d(s: &str) -> Decimal4 {
    Decimal4::parse(s).unwrap()
}

/// portfolio holds 600 AAPL; a BUY of 500 more would push it to 1100,
/// past a 1000-share cap.
#[test]
fn buy_past_max_position_size_is_rejected() {
    let mut limits = RiskLimits::default();
    limits.max_position_size = Some(1000);
    let mut manager = RiskManager::new(limits);

    let ctx = ValidationContext {
        symbol: "AAPL".to_string(),
        side: Side::Buy,
        order_qty: 500,
        current_qty: 600,
        estimated_price: d("190.0000"),
        equity: d("500000.0000"),
        open_position_count: 1,
        opens_new_symbol: false,
    };

    let response = manager.validate_order(&ctx, d("500000.0000"), Utc::now());

    assert!(!response.passed);
    assert_eq!(response.violations.len(), 1);
    let violation = &response.violations[0];
    assert_eq!(violation.rule_name, "max_position_size");
    assert_eq!(violation.current_value, d("1100.0000"));
    assert_eq!(violation.limit_value, d("1000.0000"));
}
