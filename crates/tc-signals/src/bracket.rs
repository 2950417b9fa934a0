//! Stop-loss and take-profit price computation, sign-aware by entry side.

use tc_money::{Decimal4, Rounding};

use tc_broker::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLossConfig {
    None,
    FixedPrice { price: Decimal4 },
    Percent { percent: Decimal4 },
    AtrMultiple { atr: Decimal4, multiplier: Decimal4 },
    TrailingPercent { percent: Decimal4 },
    TrailingAmount { amount: Decimal4 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeProfitConfig {
    None,
    FixedPrice { price: Decimal4 },
    Percent { percent: Decimal4 },
    RiskRewardRatio { ratio: Decimal4 },
}

/// A computed stop leg: either a concrete stop price, or a trailing
/// amount/percent to carry on the child order's trailing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLeg {
    Price(Decimal4),
    TrailingPercent(Decimal4),
    TrailingAmount(Decimal4),
}

fn percent_fraction(value: Decimal4, percent: Decimal4) -> Option<Decimal4> {
    let hundred = Decimal4::from_scaled_i128(100 * 10_000);
    value
        .checked_mul(percent, Rounding::HalfEven)
        .and_then(|v| v.checked_div(hundred, Rounding::HalfEven))
}

/// `entry_side` is the side of the entry order the stop protects (Buy for
/// a long entry, Sell for a short entry); the stop leg itself always sits
/// on the opposite side.
pub fn compute_stop_loss(
    config: StopLossConfig,
    entry_side: Side,
    entry_price: Decimal4,
) -> Option<StopLeg> {
    match config {
        StopLossConfig::None => None,
        StopLossConfig::FixedPrice { price } => Some(StopLeg::Price(price)),
        StopLossConfig::Percent { percent } => {
            let delta = percent_fraction(entry_price, percent)?;
            let price = match entry_side {
                Side::Buy => entry_price.checked_sub(delta)?,
                Side::Sell => entry_price.checked_add(delta)?,
            };
            Some(StopLeg::Price(price))
        }
        StopLossConfig::AtrMultiple { atr, multiplier } => {
            let delta = atr.checked_mul(multiplier, Rounding::HalfEven)?;
            let price = match entry_side {
                Side::Buy => entry_price.checked_sub(delta)?,
                Side::Sell => entry_price.checked_add(delta)?,
            };
            Some(StopLeg::Price(price))
        }
        StopLossConfig::TrailingPercent { percent } => Some(StopLeg::TrailingPercent(percent)),
        StopLossConfig::TrailingAmount { amount } => Some(StopLeg::TrailingAmount(amount)),
    }
}

/// Take-profit price. `RiskRewardRatio` needs the stop distance, so it
/// requires a concrete (non-trailing) stop leg to measure against; `None`
/// is returned (caller treats as an error) if none is available.
pub fn compute_take_profit(
    config: TakeProfitConfig,
    entry_side: Side,
    entry_price: Decimal4,
    stop_leg: Option<StopLeg>,
) -> Option<Decimal4> {
    match config {
        TakeProfitConfig::None => None,
        TakeProfitConfig::FixedPrice { price } => Some(price),
        TakeProfitConfig::Percent { percent } => {
            let delta = percent_fraction(entry_price, percent)?;
            match entry_side {
                Side::Buy => entry_price.checked_add(delta),
                Side::Sell => entry_price.checked_sub(delta),
            }
        }
        TakeProfitConfig::RiskRewardRatio { ratio } => {
            let stop_price = match stop_leg? {
                StopLeg::Price(p) => p,
                _ => return None,
            };
            let stop_distance = if entry_price > stop_price {
                entry_price.checked_sub(stop_price)?
            } else {
                stop_price.checked_sub(entry_price)?
            };
            let reward = stop_distance.checked_mul(ratio, Rounding::HalfEven)?;
            match entry_side {
                Side::Buy => entry_price.checked_add(reward),
                Side::Sell => entry_price.checked_sub(reward),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal4 {
        Decimal4::parse(s).unwrap()
    }

    #[test]
    fn percent_stop_below_entry_for_long() {
        let leg = compute_stop_loss(
            StopLossConfig::Percent { percent: d("2.0000") },
            Side::Buy,
            d("100.0000"),
        )
        .unwrap();
        assert_eq!(leg, StopLeg::Price(d("98.0000")));
    }

    #[test]
    fn percent_stop_above_entry_for_short() {
        let leg = compute_stop_loss(
            StopLossConfig::Percent { percent: d("2.0000") },
            Side::Sell,
            d("100.0000"),
        )
        .unwrap();
        assert_eq!(leg, StopLeg::Price(d("102.0000")));
    }

    #[test]
    fn atr_multiple_stop_long() {
        let leg = compute_stop_loss(
            StopLossConfig::AtrMultiple { atr: d("1.5000"), multiplier: d("2.0000") },
            Side::Buy,
            d("100.0000"),
        )
        .unwrap();
        assert_eq!(leg, StopLeg::Price(d("97.0000")));
    }

    #[test]
    fn risk_reward_ratio_needs_a_concrete_stop() {
        let tp = compute_take_profit(
            TakeProfitConfig::RiskRewardRatio { ratio: d("2.0000") },
            Side::Buy,
            d("100.0000"),
            None,
        );
        assert!(tp.is_none());
    }

    #[test]
    fn risk_reward_ratio_scales_stop_distance() {
        let stop = StopLeg::Price(d("98.0000"));
        let tp = compute_take_profit(
            TakeProfitConfig::RiskRewardRatio { ratio: d("2.0000") },
            Side::Buy,
            d("100.0000"),
            Some(stop),
        )
        .unwrap();
        // stop distance 2, reward = 2*2 = 4 -> tp = 104
        assert_eq!(tp, d("104.0000"));
    }

    #[test]
    fn percent_take_profit_short_goes_down() {
        let tp = compute_take_profit(
            TakeProfitConfig::Percent { percent: d("5.0000") },
            Side::Sell,
            d("100.0000"),
            None,
        )
        .unwrap();
        assert_eq!(tp, d("95.0000"));
    }
}
