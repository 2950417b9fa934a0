//! Position-sizing methods. Every method produces a whole-share quantity,
//! always rounded DOWN — an order is never sized into more buying power
//! than the method actually licenses.

use tc_money::{Decimal4, Rounding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMethod {
    FixedDollar {
        amount: Decimal4,
    },
    FixedQuantity {
        qty: i64,
    },
    /// `percent` in `(0, 100]`.
    PercentOfPortfolio {
        percent: Decimal4,
    },
    Kelly {
        win_prob: Decimal4,
        win_loss_ratio: Decimal4,
        /// Hard cap on the Kelly fraction, in `(0, 100]` percent-of-portfolio terms.
        max_percent: Decimal4,
    },
    Volatility {
        atr: Decimal4,
        risk_per_trade: Decimal4,
        multiplier: Decimal4,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    NonPositivePrice,
    NonPositiveAtr,
    Overflow(&'static str),
}

impl std::fmt::Display for SizingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizingError::NonPositivePrice => write!(f, "price must be > 0 to size a position"),
            SizingError::NonPositiveAtr => write!(f, "ATR must be > 0 for volatility sizing"),
            SizingError::Overflow(step) => write!(f, "overflow computing position size at '{step}'"),
        }
    }
}

impl std::error::Error for SizingError {}

fn floor_to_shares(qty: Decimal4) -> i64 {
    // qty was already produced with Rounding::Down at Decimal4's own scale;
    // truncating the integer part yields a whole-share count.
    qty.raw().trunc().to_string().parse::<i64>().unwrap_or(0)
}

const HUNDRED: i64 = 100;

fn percent_of(value: Decimal4, percent: Decimal4) -> Result<Decimal4, SizingError> {
    let hundred = Decimal4::from_scaled_i128(HUNDRED as i128 * 10_000);
    value
        .checked_mul(percent, Rounding::Down)
        .and_then(|v| v.checked_div(hundred, Rounding::Down))
        .ok_or(SizingError::Overflow("percent_of"))
}

/// Computes a whole-share quantity for `method` given the current `price`
/// and the portfolio value the percentage-based methods size against.
pub fn compute_quantity(
    method: SizingMethod,
    price: Decimal4,
    portfolio_value: Decimal4,
) -> Result<i64, SizingError> {
    if price.is_negative() || price.is_zero() {
        return Err(SizingError::NonPositivePrice);
    }

    let qty_decimal = match method {
        SizingMethod::FixedDollar { amount } => amount
            .checked_div(price, Rounding::Down)
            .ok_or(SizingError::Overflow("fixed_dollar"))?,
        SizingMethod::FixedQuantity { qty } => {
            return Ok(qty.max(0));
        }
        SizingMethod::PercentOfPortfolio { percent } => {
            let dollars = percent_of(portfolio_value, percent)?;
            dollars
                .checked_div(price, Rounding::Down)
                .ok_or(SizingError::Overflow("percent_of_portfolio"))?
        }
        SizingMethod::Kelly { win_prob, win_loss_ratio, max_percent } => {
            let one = Decimal4::from_scaled_i128(10_000);
            let lose_prob = one.checked_sub(win_prob).ok_or(SizingError::Overflow("kelly"))?;
            let lose_over_ratio = lose_prob
                .checked_div(win_loss_ratio, Rounding::Down)
                .ok_or(SizingError::Overflow("kelly"))?;
            let raw_fraction = win_prob
                .checked_sub(lose_over_ratio)
                .ok_or(SizingError::Overflow("kelly"))?;
            let clamped_low = if raw_fraction.is_negative() { Decimal4::ZERO } else { raw_fraction };
            let cap_fraction = percent_of(Decimal4::from_scaled_i128(10_000), max_percent)?;
            let fraction = clamped_low.min(cap_fraction);
            let dollars = portfolio_value
                .checked_mul(fraction, Rounding::Down)
                .ok_or(SizingError::Overflow("kelly"))?;
            dollars
                .checked_div(price, Rounding::Down)
                .ok_or(SizingError::Overflow("kelly"))?
        }
        SizingMethod::Volatility { atr, risk_per_trade, multiplier } => {
            if atr.is_negative() || atr.is_zero() {
                return Err(SizingError::NonPositiveAtr);
            }
            let risk_distance = atr
                .checked_mul(multiplier, Rounding::Down)
                .ok_or(SizingError::Overflow("volatility"))?;
            risk_per_trade
                .checked_div(risk_distance, Rounding::Down)
                .ok_or(SizingError::Overflow("volatility"))?
        }
    };

    Ok(floor_to_shares(qty_decimal).max(0))
}
