//! CLI definition and dispatch.

use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_log::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest_with_progress};
use crate::domain::condition::IndicatorRef;
use crate::domain::config_validation::{
    parse_date, parse_symbol_list, validate_backtest_config, validate_data_config,
    validate_strategy_config,
};
use crate::domain::error::StratbenchError;
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::strategy::Strategy;
use crate::domain::symbol_data::SymbolData;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Declarative strategy backtester")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy JSON, overriding [strategy] in the config
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Report path (.json or .csv), overriding [report] output
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Print recent values of one indicator for a symbol
    Indicators {
        #[arg(short = 'd', long)]
        data_dir: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Indicator JSON, e.g. '{"type":"MACD","field":"signal"}'
        #[arg(long)]
        indicator: String,
        #[arg(long, default_value_t = 1)]
        last: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_deref())
            } else {
                run_backtest(&config, strategy.as_deref(), output.as_deref())
            }
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Indicators {
            data_dir,
            symbol,
            indicator,
            last,
        } => run_indicators(&data_dir, &symbol, &indicator, last),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratbenchError> {
    FileConfigAdapter::from_file(path).map_err(|e| StratbenchError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    output_path: Option<&Path>,
) -> Result<(), StratbenchError> {
    // Stage 1: Load and validate config
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    validate_config(&config, strategy_path.is_some())?;

    // Stage 2: Build run parameters and strategy
    let backtest_config = build_backtest_config(&config)?;
    let strategy = build_strategy(&config, strategy_path)?;
    strategy.validate()?;
    tracing::info!(strategy = %strategy.name, symbols = strategy.symbols.len(), "strategy loaded");

    // Stage 3: Data, simulation, report
    let data_dir = config
        .get_string("data", "directory")
        .map(PathBuf::from)
        .ok_or_else(|| StratbenchError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })?;
    let lead_in_days = config.get_int("data", "lead_in_days", 0).max(0) as u64;
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from));

    let adapter = CsvAdapter::new(data_dir);
    let result = run_backtest_pipeline(
        &adapter,
        &strategy,
        &backtest_config,
        lead_in_days,
        output.as_deref(),
    )?;

    print!("{}", format_summary(&result));
    if let Some(path) = output {
        println!("\nReport written to: {}", path.display());
    }
    Ok(())
}

fn validate_config(config: &dyn ConfigPort, has_strategy_override: bool) -> Result<(), StratbenchError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config, has_strategy_override)?;
    validate_data_config(config)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, StratbenchError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        commission_pct: adapter.get_double("backtest", "commission_pct", 0.0),
        slippage_pct: adapter.get_double("backtest", "slippage_pct", 0.0),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE),
    })
}

/// The strategy named by `strategy_override`, else `[strategy] file`, else
/// the `[strategy] preset`.
pub fn build_strategy(
    adapter: &dyn ConfigPort,
    strategy_override: Option<&Path>,
) -> Result<Strategy, StratbenchError> {
    if let Some(path) = strategy_override {
        return Strategy::from_file(path);
    }
    if let Some(file) = adapter.get_string("strategy", "file") {
        return Strategy::from_file(Path::new(&file));
    }

    let symbols = adapter
        .get_string("strategy", "symbols")
        .map(|s| parse_symbol_list(&s))
        .unwrap_or_default();
    let period = |key: &str, default: i64| {
        usize::try_from(adapter.get_int("strategy", key, default)).map_err(|_| {
            StratbenchError::config_invalid("strategy", key, "period must be positive")
        })
    };
    Ok(Strategy::sma_crossover(
        symbols,
        period("fast", 5)?,
        period("slow", 20)?,
    ))
}

/// Fetch every strategy symbol from `start - lead_in_days` to `end`. A
/// symbol the source has no data for comes back empty and is skipped by the
/// engine; any other fetch error aborts.
pub fn load_symbol_data(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    lead_in_days: u64,
) -> Result<Vec<SymbolData>, StratbenchError> {
    let fetch_start = start_date
        .checked_sub_days(Days::new(lead_in_days))
        .unwrap_or(NaiveDate::MIN);

    let mut data = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let bars = match data_port.fetch_bars(symbol, fetch_start, end_date) {
            Ok(bars) => bars,
            Err(StratbenchError::NoData { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        data.push(SymbolData::new(symbol.clone(), bars));
    }
    Ok(data)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
    lead_in_days: u64,
    output_path: Option<&Path>,
) -> Result<BacktestResult, StratbenchError> {
    let data = load_symbol_data(
        data_port,
        &strategy.symbols,
        config.start_date,
        config.end_date,
        lead_in_days,
    )?;

    let mut last_decile = 0;
    let result = run_backtest_with_progress(&data, strategy, config, |progress| {
        let decile = (progress.percent() / 10.0).floor() as usize;
        if decile > last_decile {
            last_decile = decile;
            tracing::debug!(
                date = %progress.date,
                completed = progress.completed,
                total = progress.total,
                "progress {:.0}%",
                progress.percent()
            );
        }
    })?;

    if let Some(path) = output_path {
        write_report(&result, path)?;
    }
    Ok(result)
}

/// Writes a full JSON result for `.json` and a trade log for `.csv`.
pub fn write_report(result: &BacktestResult, path: &Path) -> Result<(), StratbenchError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let adapter: &dyn ReportPort = match extension.as_deref() {
        Some("json") => &JsonReportAdapter,
        Some("csv") => &CsvTradeLogAdapter,
        _ => {
            return Err(StratbenchError::Report {
                reason: format!(
                    "unsupported report format for {}, expected .json or .csv",
                    path.display()
                ),
            });
        }
    };
    adapter.write(result, path)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

pub fn format_summary(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let mut out = String::new();
    let _ = writeln!(out, "=== Backtest Results ===");
    let _ = writeln!(
        out,
        "Strategy:          {} ({})",
        result.strategy_name, result.strategy_id
    );
    let _ = writeln!(
        out,
        "Period:            {} to {}",
        result.start_date, result.end_date
    );
    let _ = writeln!(out, "Initial Capital:   {:.2}", result.initial_capital);
    let _ = writeln!(out, "Final Value:       {:.2}", result.final_value);
    let _ = writeln!(out, "Total Return:      {:.2}%", m.total_return);
    let _ = writeln!(out, "Annualized Return: {:.2}%", m.annualized_return);
    let _ = writeln!(out, "Volatility:        {:.2}%", m.volatility);
    let _ = writeln!(out, "Sharpe Ratio:      {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Sortino Ratio:     {:.2}", m.sortino_ratio);
    let _ = writeln!(out, "Calmar Ratio:      {:.2}", m.calmar_ratio);
    let _ = writeln!(out, "Max Drawdown:      -{:.2}%", m.max_drawdown);
    let _ = writeln!(
        out,
        "Total Trades:      {} ({} won, {} lost)",
        m.total_trades, m.winning_trades, m.losing_trades
    );
    let _ = writeln!(out, "Win Rate:          {:.1}%", m.win_rate);
    let _ = writeln!(out, "Avg Profit:        {:.2}%", m.avg_profit);
    let _ = writeln!(out, "Avg Loss:          {:.2}%", m.avg_loss);
    out
}

fn describe_strategy(strategy: &Strategy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Strategy: {} ({})", strategy.name, strategy.id);
    if !strategy.description.is_empty() {
        let _ = writeln!(out, "  {}", strategy.description);
    }
    let _ = writeln!(out, "Symbols: {}", strategy.symbols.join(", "));

    for (label, groups) in [
        ("Buy", &strategy.buy_conditions),
        ("Sell", &strategy.sell_conditions),
    ] {
        let _ = writeln!(out, "\n{label} conditions (any group):");
        if groups.is_empty() {
            let _ = writeln!(out, "  (none, never fires)");
        }
        for (i, group) in groups.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {}", i + 1, group);
        }
    }

    let _ = writeln!(out, "\nIndicators to compute:");
    for spec in strategy.required_indicators() {
        let _ = writeln!(out, "  {spec}");
    }
    let _ = writeln!(out, "Warm-up: {} bars", strategy.warmup());

    let risk = &strategy.risk_management;
    let pct = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |p| format!("{p}%"));
    let _ = writeln!(
        out,
        "Risk: stop-loss {}, take-profit {}, max position {}, max daily trades {}",
        pct(risk.stop_loss),
        pct(risk.take_profit),
        pct(risk.max_position),
        risk.max_daily_trades
            .map_or_else(|| "-".to_string(), |n| n.to_string())
    );
    out
}

pub fn run_dry_run(config_path: &Path, strategy_path: Option<&Path>) -> Result<(), StratbenchError> {
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    validate_config(&config, strategy_path.is_some())?;

    let backtest_config = build_backtest_config(&config)?;
    backtest_config.validate()?;
    let strategy = build_strategy(&config, strategy_path)?;
    strategy.validate()?;

    println!(
        "Period: {} to {}, initial capital {:.2}",
        backtest_config.start_date, backtest_config.end_date, backtest_config.initial_capital
    );
    print!("{}", describe_strategy(&strategy));
    println!("\nDry run complete: configuration is valid");
    Ok(())
}

pub fn run_validate(strategy_path: &Path) -> Result<(), StratbenchError> {
    tracing::info!(path = %strategy_path.display(), "validating strategy");
    let strategy = Strategy::from_file(strategy_path)?;
    strategy.validate()?;

    print!("{}", describe_strategy(&strategy));
    println!("\nStrategy is valid.");
    Ok(())
}

pub fn run_indicators(
    data_dir: &Path,
    symbol: &str,
    indicator_json: &str,
    last: usize,
) -> Result<(), StratbenchError> {
    let reference: IndicatorRef = serde_json::from_str(indicator_json)?;
    reference.spec.validate()?;
    if !reference.spec.supports(reference.field) {
        return Err(StratbenchError::strategy(format!(
            "{} has no {:?} output",
            reference.spec, reference.field
        )));
    }

    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let bars = adapter.fetch_bars(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
    let series = reference.spec.calculate(&bars);

    println!("{symbol} {reference} ({} bars)", bars.len());
    let skip = series.values.len().saturating_sub(last.max(1));
    for (index, point) in series.values.iter().enumerate().skip(skip) {
        match series.value_at(index, reference.field) {
            Some(value) => println!("  {}  {value:.4}", point.date),
            None => println!("  {}  undefined", point.date),
        }
    }
    if series.latest(reference.field).is_none() {
        println!(
            "needs {} bars of history before the first value",
            reference.spec.lookback() + 1
        );
    }
    Ok(())
}
