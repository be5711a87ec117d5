use anyhow::Context;
use clap::Parser;
use spottrader::exchange::{ExchangeClient, PaperExchange, PriceFeed, SyntheticFeed};
use spottrader::persistence::{JsonFileStore, LedgerSummary, TradeLedger};
use spottrader::reconcile::{startup_position, ReconcileOptions};
use spottrader::{AppConfig, TradingEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

/// Single-asset RSI/MA trading bot running against a paper exchange
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the .env file
    #[arg(long, default_value = ".env")]
    env: PathBuf,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks (runs until Ctrl+C when omitted)
    #[arg(long)]
    ticks: Option<usize>,

    /// Seed for the synthetic price feed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Milliseconds between synthetic ticks
    #[arg(long, default_value_t = 1000)]
    tick_millis: u64,

    /// First synthetic price
    #[arg(long, default_value_t = 42_000.0)]
    start_price: f64,

    /// Max relative price move per synthetic tick (0.002 = ±0.2%)
    #[arg(long, default_value_t = 0.002)]
    volatility: f64,

    /// Base asset the paper account starts with
    #[arg(long, default_value_t = 0.001)]
    paper_base: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = dotenvy::from_path(&args.env) {
        eprintln!("No .env loaded from {} ({}), using environment only", args.env.display(), e);
    }

    let config = AppConfig::load(args.config.as_deref()).context("Invalid configuration")?;
    anyhow::ensure!(
        (0.0..1.0).contains(&args.volatility),
        "--volatility must be in [0, 1), got {}",
        args.volatility
    );
    setup_logging(&config.log_filter);

    tracing::info!("🚀 Trading bot starting");
    tracing::info!("  Symbol: {} ({})", config.symbol, if config.testnet { "testnet" } else { "mainnet" });
    tracing::info!("  Funds: ${:.2}", config.initial_funds);
    tracing::info!("  History: {}", config.history_file.display());
    tracing::info!(
        "  Stop loss: {}% | Risk per trade: {}%",
        config.risk.stop_loss_fraction * 100.0,
        config.risk.risk_fraction * 100.0
    );
    if config.api_key.is_none() || config.api_secret.is_none() {
        tracing::info!("  No exchange credentials configured, trading on the paper exchange");
    } else if !config.testnet {
        tracing::warn!("⚠️  Mainnet requested but only the paper exchange is available");
    }

    let ledger = Arc::new(TradeLedger::open(Arc::new(JsonFileStore::new(
        &config.history_file,
    ))));

    let paper = Arc::new(PaperExchange::new(
        args.paper_base,
        config.initial_funds,
        config.risk.taker_fee,
    ));
    paper.set_mark_price(args.start_price);
    let exchange: Arc<dyn ExchangeClient> = paper.clone();

    let options = ReconcileOptions {
        symbol: config.symbol.clone(),
        recent_trades_limit: config.recent_trades_limit,
        timeout: config.reconcile_timeout(),
    };
    let initial = startup_position(config.startup_position, exchange.as_ref(), &ledger, &options).await;

    let mut engine = TradingEngine::new(&config, initial, exchange, ledger.clone());
    engine.refresh_balances().await;

    // Feed ticks through the paper exchange so orders fill at the last price
    let mut feed = SyntheticFeed::new(args.seed, args.start_price, Duration::from_millis(args.tick_millis))
        .with_volatility(args.volatility);
    if let Some(ticks) = args.ticks {
        feed = feed.with_max_ticks(ticks);
    }
    let mut feed_rx = feed.subscribe(&config.symbol);
    let (tick_tx, tick_rx) = mpsc::channel(256);
    let forward = {
        let paper = paper.clone();
        tokio::spawn(async move {
            while let Some(price) = feed_rx.recv().await {
                paper.set_mark_price(price);
                if tick_tx.send(price).await.is_err() {
                    break;
                }
            }
        })
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⚠️  Received Ctrl+C, finishing current tick...");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!("Press Ctrl+C to stop...");
    engine.run(tick_rx, shutdown_rx).await;

    feed.cancel();
    forward.abort();

    ledger.flush().await.context("Failed to flush trade history")?;

    let summary = LedgerSummary::from_records(&ledger.snapshot());
    let snapshot = engine.current_snapshot();
    tracing::info!("📊 Session summary:");
    tracing::info!("  Position: {:?}", snapshot.position);
    tracing::info!(
        "  Balances: {:.5} base | {:.2} quote",
        snapshot.balances.base,
        snapshot.balances.quote
    );
    tracing::info!("  Trades: {} buys, {} sells", summary.buys, summary.sells);
    tracing::info!(
        "  Win rate: {:.1}% | Cumulative P&L: {:.2}%",
        summary.win_rate * 100.0,
        summary.cumulative_pnl_percent
    );

    tracing::info!("👋 Trading bot stopped");
    Ok(())
}

fn setup_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
