//! FIFO parcel matching and CGT annotation.
//!
//! On a sell, open acquisition parcels for the symbol are consumed in
//! ascending acquisition-date order: the earliest parcel is exhausted
//! first, then the next, until the sell quantity is covered. The last
//! parcel touched may be only partially consumed and stays open for the
//! remainder. No IO, no time source — the caller supplies every date.

use std::collections::{BTreeMap, VecDeque};

use tc_money::{Decimal4, FxRate, Rounding};

use crate::tax_year::{derive_tax_year, discount_eligible, holding_period_days};
use crate::types::{CgtError, MatchedParcel, Parcel, Side, TradeRecord};

/// FIFO cost-basis ledger, one open-parcel queue per symbol, plus the
/// append-only trade log.
#[derive(Clone, Debug, Default)]
pub struct CgtLedger {
    parcels: BTreeMap<String, VecDeque<Parcel>>,
    trades: Vec<TradeRecord>,
}

impl CgtLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Open parcels currently held for `symbol`, oldest first.
    pub fn open_parcels(&self, symbol: &str) -> &[Parcel] {
        self.parcels
            .get(symbol)
            .map(|q| q.as_slices().0)
            .unwrap_or(&[])
    }

    /// Total quantity still held across open parcels for `symbol`.
    pub fn open_quantity(&self, symbol: &str) -> i64 {
        self.parcels
            .get(symbol)
            .map(|q| q.iter().map(|p| p.remaining_qty).sum())
            .unwrap_or(0)
    }

    fn validate_common(
        symbol: &str,
        qty: i64,
        price: Decimal4,
        signal_confidence: u8,
    ) -> Result<(), CgtError> {
        if symbol.trim().is_empty() {
            return Err(CgtError::EmptySymbol);
        }
        if qty <= 0 {
            return Err(CgtError::NonPositiveQty { qty });
        }
        if price.is_zero() || price.is_negative() {
            return Err(CgtError::NonPositivePrice { price });
        }
        if signal_confidence > 100 {
            return Err(CgtError::InvalidSignalConfidence {
                value: signal_confidence,
            });
        }
        Ok(())
    }

    /// Record a buy fill: opens a new acquisition parcel and appends a
    /// trade record with no CGT annotation (a buy realizes nothing).
    #[allow(clippy::too_many_arguments)]
    pub fn record_buy(
        &mut self,
        order_id: impl Into<String>,
        symbol: impl Into<String>,
        qty: i64,
        price: Decimal4,
        commission: Decimal4,
        date: chrono::NaiveDate,
        currency: impl Into<String>,
        fx_rate_to_aud: FxRate,
        signal_confidence: u8,
    ) -> Result<TradeRecord, CgtError> {
        let symbol = symbol.into();
        Self::validate_common(&symbol, qty, price, signal_confidence)?;
        let currency = currency.into();

        self.parcels
            .entry(symbol.clone())
            .or_default()
            .push_back(Parcel {
                acquisition_date: date,
                remaining_qty: qty,
                cost_basis_per_unit: price,
                currency: currency.clone(),
                fx_rate_to_aud,
            });

        let total_value = price.checked_mul_qty(qty, Rounding::Down).expect("total value overflow");
        let record = TradeRecord {
            order_id: order_id.into(),
            symbol,
            side: Side::Buy,
            quantity: qty,
            price,
            commission,
            timestamp: date,
            currency,
            fx_rate_to_aud,
            total_value,
            total_value_aud: fx_rate_to_aud.convert(total_value),
            signal_confidence,
            acquisition_date: None,
            cost_basis_per_unit: None,
            cost_basis_total: None,
            matched_parcels: Vec::new(),
            holding_period_days: None,
            cgt_discount_eligible: None,
            cgt_gross_gain: None,
            cgt_gross_loss: None,
            cgt_net_gain: None,
            tax_year: None,
        };
        self.trades.push(record.clone());
        Ok(record)
    }

    /// Record a sell fill: consumes open parcels FIFO and annotates the
    /// resulting trade record with CGT gain/loss.
    #[allow(clippy::too_many_arguments)]
    pub fn record_sell(
        &mut self,
        order_id: impl Into<String>,
        symbol: impl Into<String>,
        qty: i64,
        price: Decimal4,
        commission: Decimal4,
        date: chrono::NaiveDate,
        currency: impl Into<String>,
        fx_rate_to_aud: FxRate,
        signal_confidence: u8,
    ) -> Result<TradeRecord, CgtError> {
        let symbol = symbol.into();
        Self::validate_common(&symbol, qty, price, signal_confidence)?;

        let available = self.open_quantity(&symbol);
        if available < qty {
            return Err(CgtError::InsufficientParcels {
                symbol,
                requested: qty,
                available,
            });
        }

        let queue = self.parcels.get_mut(&symbol).expect("parcels checked above");
        let mut remaining = qty;
        let mut matched = Vec::new();
        let mut weighted_cost_total_native = Decimal4::ZERO;
        let mut earliest_acquisition = None;

        while remaining > 0 {
            let parcel = queue.front_mut().expect("availability checked above");
            let take = parcel.remaining_qty.min(remaining);

            if earliest_acquisition.is_none() {
                earliest_acquisition = Some(parcel.acquisition_date);
            }

            matched.push(MatchedParcel {
                acquisition_date: parcel.acquisition_date,
                quantity: take,
                cost_basis_per_unit: parcel.cost_basis_per_unit,
            });
            let leg = parcel
                .cost_basis_per_unit
                .checked_mul_qty(take, Rounding::HalfEven)
                .expect("cost basis leg overflow");
            weighted_cost_total_native = weighted_cost_total_native
                .checked_add(leg)
                .expect("cost basis total overflow");

            parcel.remaining_qty -= take;
            remaining -= take;
            if parcel.remaining_qty == 0 {
                queue.pop_front();
            }
        }

        let earliest_acquisition = earliest_acquisition.expect("at least one parcel matched");
        let holding_days = holding_period_days(earliest_acquisition, date);
        let eligible = discount_eligible(holding_days);

        // Cost basis, proceeds, and gain/loss are computed in AUD.
        let currency = currency.into();
        let cost_basis_total_aud = fx_rate_to_aud.convert(weighted_cost_total_native);
        let proceeds_native = price.checked_mul_qty(qty, Rounding::Down).expect("proceeds overflow");
        let proceeds_aud = fx_rate_to_aud.convert(proceeds_native);

        let diff = proceeds_aud
            .checked_sub(cost_basis_total_aud)
            .expect("gain/loss overflow");
        let (gross_gain, gross_loss) = if diff.is_negative() {
            (Decimal4::ZERO, diff.abs())
        } else {
            (diff, Decimal4::ZERO)
        };
        let net_gain = if eligible && !gross_gain.is_zero() {
            gross_gain
                .checked_mul(Decimal4::from_scaled_i128(5_000), Rounding::HalfEven)
                .expect("discount overflow")
        } else {
            gross_gain.checked_sub(gross_loss).expect("net gain overflow")
        };

        let cost_basis_per_unit_native = weighted_cost_total_native
            .checked_div(
                Decimal4::from_scaled_i128(qty as i128 * 10_000),
                Rounding::HalfEven,
            )
            .expect("cost basis per unit overflow");

        let record = TradeRecord {
            order_id: order_id.into(),
            symbol,
            side: Side::Sell,
            quantity: qty,
            price,
            commission,
            timestamp: date,
            currency,
            fx_rate_to_aud,
            total_value: proceeds_native,
            total_value_aud: proceeds_aud,
            signal_confidence,
            acquisition_date: Some(earliest_acquisition),
            cost_basis_per_unit: Some(cost_basis_per_unit_native),
            cost_basis_total: Some(cost_basis_total_aud),
            matched_parcels: matched,
            holding_period_days: Some(holding_days),
            cgt_discount_eligible: Some(eligible),
            cgt_gross_gain: Some(gross_gain),
            cgt_gross_loss: Some(gross_loss),
            cgt_net_gain: Some(net_gain),
            tax_year: Some(derive_tax_year(date)),
        };
        self.trades.push(record.clone());
        Ok(record)
    }
}
