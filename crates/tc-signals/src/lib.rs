//! Signal → order conversion: position sizing, stop-loss / take-profit
//! bracket construction, and `OrderRequest` assembly from a
//! [`TradingSignal`]. Consumed by the strategy executor, which resolves a
//! concrete price and a portfolio snapshot before calling [`convert`].

mod bracket;
mod converter;
mod signal;
mod sizing;

pub use bracket::{compute_stop_loss, compute_take_profit, StopLeg, StopLossConfig, TakeProfitConfig};
pub use converter::{convert, Bracket, ConversionConfig, ConversionResult};
pub use signal::{SignalType, TradingSignal};
pub use sizing::{compute_quantity, SizingError, SizingMethod};
