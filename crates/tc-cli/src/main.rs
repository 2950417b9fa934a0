use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use tc_backtest::{BacktestConfig, BacktestEngine, BacktestStatus, DecisionContext, TradingDecision};
use tc_broker::TimeInForce;
use tc_broker_paper::PaperBroker;
use tc_config::load_layered_yaml;
use tc_executor::{ExecutionOutcome, ExecutorConfig, RetryConfig, StrategyExecutor};
use tc_marketdata::{ingest_csv, InMemoryProvider, MarketDataLoader};
use tc_money::Decimal4;
use tc_portfolio::{marks, Portfolio};
use tc_risk::{RiskLimits, RiskManager};
use tc_signals::{ConversionConfig, SignalType, SizingMethod, StopLossConfig, TakeProfitConfig, TradingSignal};

#[derive(Parser)]
#[command(name = "tc")]
#[command(about = "trading engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a layered config hash and print the canonical JSON.
    ConfigHash {
        /// Paths in merge order (base -> env -> risk -> ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Replay a CSV bar file through a backtest and print the result.
    Backtest {
        /// Backtest config YAML, deserialized as `BacktestConfig`.
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file covering every ticker in the config.
        #[arg(long)]
        data: PathBuf,
    },

    /// Push one hand-built trading signal through the live pipeline
    /// against a paper broker and print the execution outcome.
    Paper {
        #[arg(long)]
        symbol: String,

        #[arg(long, value_enum)]
        side: PaperSide,

        #[arg(long)]
        qty: i64,

        /// Fill price the paper broker quotes for this symbol.
        #[arg(long)]
        price: String,

        /// Starting cash for the paper portfolio.
        #[arg(long, default_value = "100000.0000")]
        cash: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PaperSide {
    Buy,
    Sell,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let outcome = match cli.cmd {
        Commands::ConfigHash { paths } => run_config_hash(&paths),
        Commands::Backtest { config, data } => run_backtest(&config, &data),
        Commands::Paper { symbol, side, qty, price, cash } => {
            run_paper(symbol, side, qty, &price, &cash).await
        }
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Exit codes are the same contract across every subcommand:
/// 0 success, 1 invalid input, 2 execution failure, 3 risk rejection.
fn run_config_hash(paths: &[String]) -> Result<i32> {
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs).context("load layered config")?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(0)
}

fn run_backtest(config_path: &PathBuf, data_path: &PathBuf) -> Result<i32> {
    let config_str = std::fs::read_to_string(config_path)
        .with_context(|| format!("read backtest config: {}", config_path.display()))?;
    let config: BacktestConfig =
        serde_yaml::from_str(&config_str).context("backtest config does not match expected shape")?;

    let bars = ingest_csv::parse_csv_file(data_path, &config.interval)
        .map_err(|e| anyhow!("ingest csv '{}': {e}", data_path.display()))?;

    let mut bars_by_ticker: HashMap<String, Vec<_>> = HashMap::new();
    for bar in bars {
        bars_by_ticker.entry(bar.symbol.clone()).or_default().push(bar);
    }
    if bars_by_ticker.is_empty() {
        bail!("csv file '{}' produced no bars for timeframe '{}'", data_path.display(), config.interval);
    }

    let mut provider = InMemoryProvider::new();
    for (symbol, symbol_bars) in bars_by_ticker {
        provider.load(symbol, symbol_bars);
    }

    let mut loader = MarketDataLoader::new(Box::new(provider));
    let mut strategy = sma_crossover_decision;
    let engine = BacktestEngine::new(config);
    let result = engine.run(&mut loader, &mut strategy);

    println!("{}", serde_json::to_string_pretty(&result).context("serialize backtest result")?);

    match result.status {
        BacktestStatus::Completed => Ok(0),
        BacktestStatus::Failed => Ok(2),
    }
}

/// Buys when price is above the 20-day SMA and there is no open position,
/// sells the whole position when it falls back below. A placeholder for
/// exercising the day loop from the command line; real strategies call
/// `BacktestEngine::run` directly with their own callback.
fn sma_crossover_decision(ctx: &DecisionContext) -> TradingDecision {
    let Some(sma20) = ctx.indicators.and_then(|i| i.sma_20) else {
        return TradingDecision::hold();
    };
    let above = ctx.bar.close > sma20;
    if !ctx.holding && above {
        TradingDecision::buy(None)
    } else if ctx.holding && !above {
        TradingDecision::sell()
    } else {
        TradingDecision::hold()
    }
}

async fn run_paper(symbol: String, side: PaperSide, qty: i64, price: &str, cash: &str) -> Result<i32> {
    if qty <= 0 {
        bail!("qty must be positive, got {qty}");
    }
    let price = Decimal4::parse_positive(price).map_err(|e| anyhow!("invalid --price: {e}"))?;
    let cash = Decimal4::parse_positive(cash).map_err(|e| anyhow!("invalid --cash: {e}"))?;

    let quote_price = price;
    let broker = PaperBroker::new(cash, Box::new(move |_symbol: &str| Some(quote_price)));

    let executor_config = ExecutorConfig {
        conversion: ConversionConfig {
            sizing: SizingMethod::FixedQuantity { qty },
            stop_loss: StopLossConfig::None,
            take_profit: TakeProfitConfig::None,
            default_time_in_force: TimeInForce::Day,
            extended_hours: false,
        },
        retry: RetryConfig::default(),
        fill_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(25),
        event_history_capacity: 64,
    };

    let executor = StrategyExecutor::new(broker, RiskManager::new(RiskLimits::default()), executor_config);

    let signal_type = match side {
        PaperSide::Buy => SignalType::Buy,
        PaperSide::Sell => SignalType::Sell,
    };
    let signal = TradingSignal {
        symbol: symbol.clone(),
        signal_type,
        strength: Decimal4::parse("1.0000").expect("literal is valid"),
        confidence: Decimal4::parse("1.0000").expect("literal is valid"),
        price_at_signal: Some(price),
        target_price: None,
        stop_loss_price: None,
        timestamp: Utc::now(),
        source: "cli".to_string(),
        metadata: Default::default(),
    };

    let portfolio = Portfolio::new(cash);
    let price_marks = marks([(symbol.as_str(), price)]);

    let result = executor.execute_signal(&signal, &portfolio, &price_marks).await;

    println!("outcome={:?}", result.outcome);
    if let Some(order) = &result.order {
        println!("order={order:?}");
    }
    for leg in &result.bracket_orders {
        println!("bracket_order={leg:?}");
    }
    for violation in &result.risk_violations {
        println!("risk_violation={violation:?}");
    }
    if let Some(err) = &result.error {
        println!("error={err}");
    }

    let code = match result.outcome {
        ExecutionOutcome::Filled | ExecutionOutcome::PartiallyFilled => 0,
        ExecutionOutcome::Rejected if !result.risk_violations.is_empty() => 3,
        ExecutionOutcome::Rejected
        | ExecutionOutcome::Cancelled
        | ExecutionOutcome::TimedOut
        | ExecutionOutcome::Failed => 2,
    };
    Ok(code)
}
