use analytics::{PerformanceMonitor, PerformanceReport};
use anyhow::Context;
use clap::Parser;
use comfy_table::Table;
use configuration::Config;
use engine::ExecutionEngine;
use indicatif::{ProgressBar, ProgressStyle};
use market_data::QuoteGenerator;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use strategies::{create_strategy, StrategyId};
use tracing_subscriber::EnvFilter;

/// A quote-driven trading simulator: synthetic market data, pluggable
/// strategies, and a cash/position accounting engine.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Trading strategy to run (momentum, mean_reversion, bollinger_bands).
    #[arg(long)]
    strategy: String,

    /// Comma-separated list of symbols to trade (e.g. "AAPL,MSFT").
    #[arg(long)]
    symbols: String,

    /// Number of quote ticks to simulate.
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the configured initial cash.
    #[arg(long)]
    initial_cash: Option<Decimal>,

    /// Override the configured delay between ticks (0 = run flat out).
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Override the configured random seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

/// The main entry point for the meridian simulator.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config =
        configuration::load_config(&cli.config).context("failed to load configuration")?;

    // CLI flags take precedence over the file.
    if let Some(cash) = cli.initial_cash {
        config.simulation.initial_cash = cash;
    }
    if let Some(interval) = cli.tick_interval_ms {
        config.market_data.tick_interval_ms = interval;
    }
    if let Some(seed) = cli.seed {
        config.market_data.seed = Some(seed);
    }

    let symbols: Vec<String> = cli
        .symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(
        !symbols.is_empty(),
        "no symbols provided; use --symbols to specify symbols to trade"
    );

    let strategy_id = StrategyId::from_str(&cli.strategy).with_context(|| {
        format!(
            "unknown strategy '{}' (available: {})",
            cli.strategy,
            StrategyId::all_names().join(", ")
        )
    })?;

    run_simulation(strategy_id, symbols, config, cli.ticks).await
}

/// Drives one complete simulation: tick generation, strategy evaluation,
/// order execution and metric collection.
async fn run_simulation(
    strategy_id: StrategyId,
    symbols: Vec<String>,
    config: Config,
    ticks: u64,
) -> anyhow::Result<()> {
    let mut generator = QuoteGenerator::new(symbols.clone(), config.market_data.clone())?;
    let mut engine = ExecutionEngine::new(config.simulation.clone());
    let mut strategy = create_strategy(strategy_id, &config, symbols.clone())?;
    let mut monitor = PerformanceMonitor::new();

    tracing::info!(
        strategy = strategy.name(),
        ?symbols,
        ticks,
        "starting simulation"
    );

    let progress_bar = ProgressBar::new(ticks);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("=>-"),
    );

    let tick_interval = config.market_data.tick_interval_ms;

    for _ in 0..ticks {
        // 1. A fresh snapshot from the market-data collaborator.
        let snapshot = generator.next_snapshot();

        // 2. The strategy reacts to prices and current positions.
        let requests = {
            let positions = engine.open_positions();
            strategy.evaluate(&snapshot, &positions)?
        };
        for request in requests {
            if let Err(e) = engine.place_order(request) {
                tracing::warn!("order request rejected: {e}");
            }
        }

        // 3. The engine matches working orders against the same snapshot.
        let trades = engine.process_quotes(&snapshot)?;

        // 4. Trades flow back to the strategy and into the metrics.
        for trade in &trades {
            strategy.on_trade(trade);
            monitor.record_trade(trade);
        }
        monitor.record_equity(snapshot.timestamp, engine.portfolio().equity());

        progress_bar.inc(1);
        if tick_interval > 0 {
            tokio::time::sleep(Duration::from_millis(tick_interval)).await;
        }
    }

    progress_bar.finish_with_message("Simulation complete.");

    let report = monitor.report(config.simulation.initial_cash)?;
    print_summary(&engine, &report, strategy.name());

    Ok(())
}

/// Renders the end-of-run performance summary and final portfolio state.
fn print_summary(engine: &ExecutionEngine, report: &PerformanceReport, strategy_name: &str) {
    let summary = engine.portfolio_summary();

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Strategy".to_string(), strategy_name.to_string()]);
    table.add_row(vec![
        "Initial cash".to_string(),
        format!("{:.2}", summary.initial_cash),
    ]);
    table.add_row(vec![
        "Final cash".to_string(),
        format!("{:.2}", summary.cash),
    ]);
    table.add_row(vec![
        "Final equity".to_string(),
        format!("{:.2}", summary.equity),
    ]);
    table.add_row(vec![
        "Total return".to_string(),
        format!("{:.2}%", report.total_return_pct),
    ]);
    table.add_row(vec![
        "Annualized return".to_string(),
        report
            .annualized_return_pct
            .map(|v| format!("{:.2}%", v))
            .unwrap_or_else(|| "n/a".to_string()),
    ]);
    table.add_row(vec![
        "Sharpe ratio".to_string(),
        report
            .sharpe_ratio
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".to_string()),
    ]);
    table.add_row(vec![
        "Max drawdown".to_string(),
        format!("{:.2} ({:.2}%)", report.max_drawdown, report.max_drawdown_pct),
    ]);
    table.add_row(vec![
        "Trades executed".to_string(),
        summary.total_trades.to_string(),
    ]);
    table.add_row(vec![
        "Win rate".to_string(),
        report
            .win_rate_pct
            .map(|v| format!("{:.2}%", v))
            .unwrap_or_else(|| "n/a".to_string()),
    ]);
    table.add_row(vec![
        "Profit factor".to_string(),
        report
            .profit_factor
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "n/a".to_string()),
    ]);
    table.add_row(vec![
        "Commission paid".to_string(),
        format!("{:.2}", report.total_commission),
    ]);

    println!("\n{table}");

    let open_positions = engine.open_positions();
    if !open_positions.is_empty() {
        let mut positions_table = Table::new();
        positions_table.set_header(vec![
            "Symbol",
            "Quantity",
            "Avg price",
            "Mark",
            "Unrealized P&L",
            "Realized P&L",
        ]);
        for position in open_positions {
            let mark = engine
                .portfolio()
                .mark(&position.symbol)
                .unwrap_or(position.average_price);
            let unrealized = (mark - position.average_price) * position.quantity;
            positions_table.add_row(vec![
                position.symbol.clone(),
                format!("{}", position.quantity),
                format!("{:.2}", position.average_price),
                format!("{:.2}", mark),
                format!("{:.2}", unrealized),
                format!("{:.2}", position.realized_pnl),
            ]);
        }
        println!("\nOpen positions:\n{positions_table}");
    }
}
