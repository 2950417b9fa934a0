use chrono::NaiveDate;
use tc_ledger::CgtLedger;
use tc_money::{Decimal4, FxRate};

fn d(s: &str) -> Decimal4 {
    Decimal4::parse(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A sell spanning two acquisition parcels consumes them oldest-first,
/// leaving the second parcel partially open. Exercises invariant: the sum
/// of matched-parcel quantities equals the sell quantity, and the open
/// remainder's acquisition date is the later of the two.
#[test]
fn sell_spanning_two_parcels_consumes_oldest_first() {
    let mut ledger = CgtLedger::new();
    let aud = FxRate::one_to_one();

    ledger
        .record_buy("o1", "BHP", 10, d("100.0000"), Decimal4::ZERO, date(2023, 1, 1), "AUD", aud, 80)
        .unwrap();
    ledger
        .record_buy("o2", "BHP", 10, d("120.0000"), Decimal4::ZERO, date(2023, 6, 1), "AUD", aud, 80)
        .unwrap();

    let sell = ledger
        .record_sell("o3", "BHP", 15, d("150.0000"), Decimal4::ZERO, date(2024, 2, 1), "AUD", aud, 80)
        .unwrap();

    assert_eq!(sell.matched_parcels.len(), 2);
    assert_eq!(sell.matched_parcels[0].quantity, 10);
    assert_eq!(sell.matched_parcels[0].cost_basis_per_unit, d("100.0000"));
    assert_eq!(sell.matched_parcels[1].quantity, 5);
    assert_eq!(sell.matched_parcels[1].cost_basis_per_unit, d("120.0000"));
    let matched_sum: i64 = sell.matched_parcels.iter().map(|m| m.quantity).sum();
    assert_eq!(matched_sum, 15);

    assert_eq!(sell.acquisition_date, Some(date(2023, 1, 1)));
    assert_eq!(sell.cost_basis_total, Some(d("1600.0000")));
    assert_eq!(sell.cost_basis_per_unit, Some(d("106.6667")));
    assert_eq!(sell.holding_period_days, Some(396));
    assert_eq!(sell.cgt_discount_eligible, Some(true));
    assert_eq!(sell.cgt_gross_gain, Some(d("650.0000")));
    assert_eq!(sell.cgt_gross_loss, Some(Decimal4::ZERO));
    assert_eq!(sell.cgt_net_gain, Some(d("325.0000")));
    assert_eq!(sell.tax_year, Some("FY2024".to_string()));

    assert_eq!(ledger.open_quantity("BHP"), 5);
    assert_eq!(ledger.open_parcels("BHP")[0].acquisition_date, date(2023, 6, 1));
    assert_eq!(ledger.open_parcels("BHP")[0].remaining_qty, 5);
}

#[test]
fn sell_exceeding_open_quantity_is_rejected() {
    let mut ledger = CgtLedger::new();
    let aud = FxRate::one_to_one();
    ledger
        .record_buy("o1", "CBA", 5, d("100.0000"), Decimal4::ZERO, date(2023, 1, 1), "AUD", aud, 80)
        .unwrap();

    let err = ledger
        .record_sell("o2", "CBA", 10, d("110.0000"), Decimal4::ZERO, date(2023, 6, 1), "AUD", aud, 80)
        .unwrap_err();

    match err {
        tc_ledger::CgtError::InsufficientParcels {
            symbol,
            requested,
            available,
        } => {
            assert_eq!(symbol, "CBA");
            assert_eq!(requested, 10);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientParcels, got {other:?}"),
    }
}
