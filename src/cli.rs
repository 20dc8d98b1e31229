//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::console_report_adapter::ConsoleReportAdapter;
use crate::adapters::csv_adapter::{CsvTradeAdapter, load_fx_rates};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::PnlError;
use crate::domain::fx::FxConverter;
use crate::domain::grouping::{AggregationRequest, TradeFilter, parse_group_fields};
use crate::domain::pnl;
use crate::domain::reconcile::{MergePolicy, ReconcileReport, TradeReconciler};
use crate::domain::store::CanonicalStore;
use crate::domain::trade::{Action, Currency};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::trade_port::TradePort;

/// Used when `[output] max_files` is not set.
pub const DEFAULT_MAX_FILES: i64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "tradepnl", about = "Trade lifecycle reconciler and cash P&L aggregator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the input trades and report cumulative cash P&L per group
    Aggregate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Comma-separated group fields, e.g. BBG_CODE,PORTFOLIO
        #[arg(short, long)]
        group: Option<String>,
        /// Target currency for conversion
        #[arg(long)]
        currency: Option<String>,
        /// Trade filter as key=value;key=value, repeatable (OR-combined)
        #[arg(short, long)]
        filter: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_csv: bool,
        #[arg(long)]
        no_console: bool,
        /// Print a per-group summary after the series
        #[arg(long)]
        summary: bool,
    },
    /// Reconcile the input trades and print the store summary
    Reconcile {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Extra trade file folded in after the input directory, repeatable
        #[arg(long)]
        file: Vec<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Aggregate {
            config,
            input,
            group,
            currency,
            filter,
            output,
            no_csv,
            no_console,
            summary,
        } => run_aggregate(
            &config,
            &AggregateOverrides {
                input,
                group,
                currency,
                filters: filter,
                output,
                no_csv,
                no_console,
                summary,
            },
        ),
        Command::Reconcile {
            config,
            input,
            file,
        } => run_reconcile(&config, input.as_deref(), &file),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct AggregateOverrides {
    pub input: Option<PathBuf>,
    pub group: Option<String>,
    pub currency: Option<String>,
    pub filters: Vec<String>,
    pub output: Option<PathBuf>,
    pub no_csv: bool,
    pub no_console: bool,
    pub summary: bool,
}

fn fail(err: PnlError) -> ExitCode {
    error!("{err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(fail)?;
    validate_config(&adapter).map_err(fail)?;
    info!("loaded config from {}", path.display());
    Ok(adapter)
}

/// Build the aggregation request from `[aggregation]`, with overrides applied.
/// Filters only come from the command line.
pub fn build_request(
    config: &dyn ConfigPort,
    group: Option<&str>,
    currency: Option<&str>,
    filters: &[String],
) -> Result<AggregationRequest, PnlError> {
    let mut request = AggregationRequest::default();

    let group = group
        .map(str::to_string)
        .or_else(|| config.get_string("aggregation", "group_fields"));
    if let Some(group) = group {
        let fields = parse_group_fields(&group)?;
        if !fields.is_empty() {
            request = request.grouped_by(fields);
        }
    }

    let currency = currency
        .map(str::to_string)
        .or_else(|| config.get_string("aggregation", "currency"));
    if let Some(currency) = currency.filter(|c| !c.trim().is_empty()) {
        request = request.converted_to(currency.parse::<Currency>()?);
    }

    for filter in filters.iter().filter(|s| !s.trim().is_empty()) {
        request = request.filtered_by(filter.parse::<TradeFilter>()?);
    }

    Ok(request)
}

pub fn build_reconciler(config: &dyn ConfigPort) -> Result<TradeReconciler, PnlError> {
    let policy = match config.get_string("reconcile", "policy") {
        Some(p) => p.parse::<MergePolicy>().map_err(|reason| PnlError::ConfigInvalid {
            section: "reconcile".to_string(),
            key: "policy".to_string(),
            reason,
        })?,
        None => MergePolicy::default(),
    };
    Ok(TradeReconciler::new(policy))
}

/// `[fx] rates_file` when set, the built-in table otherwise.
pub fn build_fx(config: &dyn ConfigPort) -> Result<FxConverter, PnlError> {
    match config.get_string("fx", "rates_file") {
        Some(path) => load_fx_rates(Path::new(path.trim())),
        None => Ok(FxConverter::default()),
    }
}

pub fn resolve_input(config: &dyn ConfigPort, input: Option<&Path>) -> Result<PathBuf, PnlError> {
    match input {
        Some(dir) => Ok(dir.to_path_buf()),
        None => config
            .get_string("input", "directory")
            .map(PathBuf::from)
            .ok_or_else(|| PnlError::ConfigMissing {
                section: "input".to_string(),
                key: "directory".to_string(),
            }),
    }
}

/// Fold one trade file into `store`. Rows that failed to parse are counted
/// as skipped alongside records the reconciler rejects.
pub fn reconcile_file(
    source: &dyn TradePort,
    reconciler: &TradeReconciler,
    store: &mut CanonicalStore,
    path: &Path,
) -> Result<ReconcileReport, PnlError> {
    let Some(file) = source.read_trades(path)? else {
        return Ok(ReconcileReport::default());
    };
    info!("reconciling {} trades from {}", file.trades.len(), path.display());
    let mut report = reconciler.reconcile(store, file.trades);
    report.skipped.extend(file.skipped);
    Ok(report)
}

/// Build a fresh store from every trade file in `dir`, in file-name order.
///
/// An unreadable file is logged and recorded in `failed_files`; the rest of
/// the directory still loads. A directory that cannot be listed is fatal.
pub fn load_directory(
    source: &dyn TradePort,
    reconciler: &TradeReconciler,
    dir: &Path,
) -> Result<(CanonicalStore, ReconcileReport), PnlError> {
    let mut store = CanonicalStore::new();
    let mut report = ReconcileReport::default();
    for path in source.list_files(dir)? {
        match reconcile_file(source, reconciler, &mut store, &path) {
            Ok(file_report) => report.absorb(file_report),
            Err(e @ PnlError::Ingest { .. }) => {
                error!("{e}, continuing with remaining files");
                report.failed_files.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        "loaded {} trades from {} ({} records skipped, {} files failed)",
        store.len(),
        dir.display(),
        report.skipped.len(),
        report.failed_files.len()
    );
    Ok((store, report))
}

fn run_aggregate(config_path: &Path, overrides: &AggregateOverrides) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match aggregate_pipeline(&config, &CsvTradeAdapter::new(), overrides) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Load, reconcile, aggregate and report.
pub fn aggregate_pipeline(
    config: &dyn ConfigPort,
    source: &dyn TradePort,
    overrides: &AggregateOverrides,
) -> Result<(), PnlError> {
    let request = build_request(
        config,
        overrides.group.as_deref(),
        overrides.currency.as_deref(),
        &overrides.filters,
    )?;
    let reconciler = build_reconciler(config)?;
    let fx = build_fx(config)?;
    let input = resolve_input(config, overrides.input.as_deref())?;

    let (store, _) = load_directory(source, &reconciler, &input)?;
    let series = pnl::aggregate(&store, &request, &fx)?;
    if series.is_empty() {
        warn!("no trades matched the aggregation request");
    }

    if config.get_bool("output", "console", true) && !overrides.no_console {
        ConsoleReportAdapter::new()
            .with_summary(overrides.summary)
            .write(&series, &request)?;
    }

    if config.get_bool("output", "csv", true) && !overrides.no_csv {
        let output = match &overrides.output {
            Some(dir) => dir.clone(),
            None => config
                .get_string("output", "directory")
                .map(PathBuf::from)
                .ok_or_else(|| PnlError::ConfigMissing {
                    section: "output".to_string(),
                    key: "directory".to_string(),
                })?,
        };
        let max_files = config.get_int("output", "max_files", DEFAULT_MAX_FILES);
        let max_files = usize::try_from(max_files).map_err(|_| PnlError::ConfigInvalid {
            section: "output".to_string(),
            key: "max_files".to_string(),
            reason: "max_files must be non-negative".to_string(),
        })?;
        CsvReportAdapter::new(output, max_files).write(&series, &request)?;
    }

    Ok(())
}

fn run_reconcile(config_path: &Path, input: Option<&Path>, files: &[PathBuf]) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let result = reconcile_pipeline(&config, &CsvTradeAdapter::new(), input, files);
    match result {
        Ok((store, report)) => {
            print!("{}", format_store_summary(&store, &report));
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Load the input directory, then fold each extra file in the order given.
pub fn reconcile_pipeline(
    config: &dyn ConfigPort,
    source: &dyn TradePort,
    input: Option<&Path>,
    files: &[PathBuf],
) -> Result<(CanonicalStore, ReconcileReport), PnlError> {
    let reconciler = build_reconciler(config)?;
    let input = resolve_input(config, input)?;
    let (mut store, mut report) = load_directory(source, &reconciler, &input)?;
    for path in files {
        report.absorb(reconcile_file(source, &reconciler, &mut store, path)?);
    }
    Ok((store, report))
}

pub fn format_store_summary(store: &CanonicalStore, report: &ReconcileReport) -> String {
    let counts = store.action_counts();
    let mut out = format!("Trades: {}\n", store.len());
    for (action, n) in [
        (Action::New, counts.new),
        (Action::Amend, counts.amend),
        (Action::Cancel, counts.cancel),
    ] {
        out.push_str(&format!("  {:<8}{n}\n", action.to_string()));
    }
    out.push_str(&format!("Records processed: {}\n", report.processed()));
    out.push_str(&format!("Records skipped: {}\n", report.skipped.len()));
    if !report.anomalies.is_empty() {
        out.push_str(&format!("Anomalies: {}\n", report.anomalies.len()));
    }
    if !report.failed_files.is_empty() {
        out.push_str(&format!("Files failed: {}\n", report.failed_files.len()));
    }
    out
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let checks = build_request(&config, None, None, &[])
        .and_then(|_| build_reconciler(&config))
        .and_then(|_| build_fx(&config));
    match checks {
        Ok(fx) => {
            println!(
                "Config {} is valid ({} FX rates)",
                config_path.display(),
                fx.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
