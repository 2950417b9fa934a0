//! Registry of which config pointers each run mode actually reads.
//!
//! This is hand-maintained, not derived: it must track what the rest of
//! the workspace reads today, nothing more. A key absent from the
//! relevant mode's list is "unused" even if some other mode would read
//! it — see [`crate::report_unused_keys`].

/// Execution mode a loaded config is being validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Backtest,
    Paper,
    Live,
}

/// JSON pointers consumed in `mode`. A pointer also covers everything
/// beneath it (`"/broker"` covers `"/broker/keys_env/api_key"`), but two
/// sibling leaves are distinct unless one is a literal prefix of the
/// other followed by `/`.
pub fn consumed_pointers(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Backtest => BACKTEST,
        ConfigMode::Paper => PAPER,
        ConfigMode::Live => LIVE,
    }
}

static BACKTEST: &[&str] =
    &["/engine/engine_id", "/data/timeframe", "/backtest", "/execution/slippage"];

static PAPER: &[&str] = &["/engine/engine_id", "/broker", "/risk/max_gross_exposure", "/execution"];

static LIVE: &[&str] = &["/engine/engine_id", "/broker", "/risk/max_gross_exposure", "/execution"];
