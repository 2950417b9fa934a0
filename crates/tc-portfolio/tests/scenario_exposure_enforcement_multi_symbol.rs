use tc_money::Decimal4;
use tc_portfolio::{apply_entry, enforce_max_gross_exposure, marks, AssetClass, Fill, LedgerEntry, Portfolio, Side};

fn d(s: &str) -> Decimal4 {
    Decimal4::parse(s).unwrap()
}

#[test]
fn scenario_multi_symbol_exposure_enforcement() {
    let mut pf = Portfolio::new(d("100000"));

    apply_entry(
        &mut pf,
        LedgerEntry::Fill(Fill::new("AAPL", Side::Buy, 10, d("200"), Decimal4::ZERO, AssetClass::Equity)),
    );
    apply_entry(
        &mut pf,
        LedgerEntry::Fill(Fill::new("MSFT", Side::Buy, 10, d("300"), Decimal4::ZERO, AssetClass::Equity)),
    );

    let mk = marks([("AAPL", d("200")), ("MSFT", d("300"))]);

    // Gross exposure = 10*200 + 10*300 = 5000
    let max_ok = d("6000");
    let max_bad = d("4000");

    assert!(enforce_max_gross_exposure(&pf.positions, &mk, max_ok).is_ok());

    let err = enforce_max_gross_exposure(&pf.positions, &mk, max_bad).unwrap_err();
    assert_eq!(err.gross_exposure, d("5000"));
    assert_eq!(err.max_gross_exposure, d("4000"));
}
