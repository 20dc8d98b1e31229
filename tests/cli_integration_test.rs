//! CLI integration tests against real INI and CSV files on disk.
//!
//! Tests cover:
//! - Config validation through `tradepnl validate`
//! - `reconcile` over an input directory plus extra files
//! - `aggregate` writing per-group CSV reports
//! - Exit codes for each error family

mod common;

use clap::Parser;
use common::*;
use rust_decimal_macros::dec;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;
use tradepnl::adapters::csv_adapter::CsvTradeAdapter;
use tradepnl::adapters::file_config_adapter::FileConfigAdapter;
use tradepnl::cli::{self, Cli};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("input")).unwrap();
        Self { dir }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn write_config(&self, extra: &str) -> PathBuf {
        let content = format!(
            "[input]\ndirectory = {}\n\n[output]\ndirectory = {}\nmax_files = 100\nconsole = false\n\n{extra}",
            self.input().display(),
            self.output().display()
        );
        let path = self.dir.path().join("tradepnl.ini");
        fs::write(&path, content).unwrap();
        path
    }

    fn seed_trades(&self) {
        let mut vod = make_trade("V1", Action::New, Side::Sell, Currency::Gbp, dec!(2), 100, "2010-01-01T07:00:00.000000");
        vod.instrument = "VOD LN Equity".to_string();
        write_trade_file(
            &self.input(),
            "1_initial.csv",
            &[
                make_trade("A1", Action::New, Side::Sell, Currency::Usd, dec!(1000), 2, "2010-01-01T09:00:00.000000"),
                make_trade("A2", Action::New, Side::Buy, Currency::Eur, dec!(500), 3, "2010-01-01T09:05:00.000000"),
                make_trade("A3", Action::New, Side::Buy, Currency::Usd, dec!(1), 1, "2010-01-01T09:10:00.000000"),
                vod,
            ],
        );
        write_trade_file(
            &self.input(),
            "2_updates.csv",
            &[make_trade("A3", Action::Cancel, Side::Buy, Currency::Usd, dec!(1), 1, "2010-01-01T09:00:00.000000")],
        );
        fs::write(self.input().join("README.txt"), "not a trade file").unwrap();
    }

    fn run_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(self.output())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        dirs.sort();
        dirs
    }
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["tradepnl"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

mod validate {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let ws = Workspace::new();
        let config = ws.write_config("[aggregation]\ngroup_fields = BBG_CODE\ncurrency = USD\n");
        assert_eq!(run(&["validate", "-c", &path_arg(&config)]), ExitCode::SUCCESS);
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        assert_eq!(
            run(&["validate", "-c", "/nonexistent/tradepnl.ini"]),
            ExitCode::from(2)
        );
    }

    #[test]
    fn bad_group_field_is_a_request_error() {
        let ws = Workspace::new();
        let config = ws.write_config("[aggregation]\ngroup_fields = BBG_CODE,DESK\n");
        assert_eq!(run(&["validate", "-c", &path_arg(&config)]), ExitCode::from(4));
    }

    #[test]
    fn non_numeric_max_files_is_a_config_error() {
        let ws = Workspace::new();
        let config = ws.write_config("");
        let content = fs::read_to_string(&config)
            .unwrap()
            .replace("max_files = 100", "max_files = abc");
        fs::write(&config, content).unwrap();
        assert_eq!(run(&["validate", "-c", &path_arg(&config)]), ExitCode::from(2));
    }

    #[test]
    fn bad_policy_is_a_config_error() {
        let ws = Workspace::new();
        let config = ws.write_config("[reconcile]\npolicy = newest\n");
        assert_eq!(run(&["validate", "-c", &path_arg(&config)]), ExitCode::from(2));
    }

    #[test]
    fn rates_file_is_loaded() {
        let ws = Workspace::new();
        let rates = ws.dir.path().join("rates.csv");
        fs::write(&rates, "From,To,Rate\nEUR,USD,1.1\n").unwrap();
        let config = ws.write_config(&format!("[fx]\nrates_file = {}\n", rates.display()));
        assert_eq!(run(&["validate", "-c", &path_arg(&config)]), ExitCode::SUCCESS);
    }
}

mod reconcile {
    use super::*;

    #[test]
    fn directory_and_extra_files_fold_into_one_store() {
        let ws = Workspace::new();
        ws.seed_trades();
        let late = write_trade_file(
            ws.dir.path(),
            "late.csv",
            &[make_trade("A1", Action::Amend, Side::Sell, Currency::Usd, dec!(1100), 2, "2010-01-01T10:00:00.000000")],
        );
        let config = FileConfigAdapter::from_file(ws.write_config("")).unwrap();

        let (store, report) =
            cli::reconcile_pipeline(&config, &CsvTradeAdapter::new(), None, &[late]).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.get("A1").unwrap().price, dec!(1100));
        assert_eq!(store.get("A3").unwrap().action, Action::Cancel);
        assert_eq!(report.processed(), 6);
        assert_eq!(
            cli::format_store_summary(&store, &report),
            "Trades: 4\n  NEW     2\n  AMEND   1\n  CANCEL  1\nRecords processed: 6\nRecords skipped: 0\n"
        );
    }

    #[test]
    fn command_succeeds() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("");
        assert_eq!(run(&["reconcile", "-c", &path_arg(&config)]), ExitCode::SUCCESS);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let ws = Workspace::new();
        ws.seed_trades();
        fs::write(
            ws.input().join("3_broken.csv"),
            format!("{TRADE_HEADER}\nB1,AAPL US Equity,CHF,B,1,1,p,NEW,a,s,u,2010-01-01T09:00:00.000000,20100105\n"),
        )
        .unwrap();
        let config = FileConfigAdapter::from_file(ws.write_config("")).unwrap();

        let (store, report) =
            cli::reconcile_pipeline(&config, &CsvTradeAdapter::new(), None, &[]).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn missing_input_directory_is_an_ingest_error() {
        let ws = Workspace::new();
        let config = ws.write_config("");
        let missing = ws.dir.path().join("nope");
        assert_eq!(
            run(&["reconcile", "-c", &path_arg(&config), "-i", &path_arg(&missing)]),
            ExitCode::from(3)
        );
    }
}

mod aggregate {
    use super::*;

    #[test]
    fn writes_one_csv_per_group() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("[aggregation]\ngroup_fields = BBG_CODE\ncurrency = USD\n");

        let code = run(&["aggregate", "-c", &path_arg(&config)]);
        assert_eq!(code, ExitCode::SUCCESS);

        let run_dirs = ws.run_dirs();
        assert_eq!(run_dirs.len(), 1);
        let name = run_dirs[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("aggregation_"));

        let aapl = fs::read_to_string(run_dirs[0].join("AAPL US Equity converted to USD.csv")).unwrap();
        assert_eq!(
            aapl,
            "TradeTimeUTC,PnLPosition\n\
             2010-01-01T09:00:00.000000,2000\n\
             2010-01-01T09:05:00.000000,385.742\n"
        );
        let vod = fs::read_to_string(run_dirs[0].join("VOD LN Equity converted to USD.csv")).unwrap();
        assert_eq!(vod, "TradeTimeUTC,PnLPosition\n2010-01-01T07:00:00.000000,242.8098\n");
    }

    #[test]
    fn command_line_overrides_apply() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("[aggregation]\ngroup_fields = BBG_CODE\ncurrency = USD\n");
        let elsewhere = ws.dir.path().join("elsewhere");

        let code = run(&[
            "aggregate",
            "-c",
            &path_arg(&config),
            "--group",
            "PORTFOLIO",
            "--currency",
            "GBP",
            "--filter",
            "currency=USD",
            "-o",
            &path_arg(&elsewhere),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!ws.output().exists());

        let run_dir = fs::read_dir(&elsewhere).unwrap().next().unwrap().unwrap().path();
        let file = run_dir.join("portfolio1 converted to GBP TradeFilter{currency=USD}.csv");
        let content = fs::read_to_string(file).unwrap();
        assert_eq!(
            content,
            "TradeTimeUTC,PnLPosition\n2010-01-01T09:00:00.000000,2428.098\n"
        );
    }

    #[test]
    fn no_csv_writes_nothing() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("");
        assert_eq!(
            run(&["aggregate", "-c", &path_arg(&config), "--no-csv"]),
            ExitCode::SUCCESS
        );
        assert!(!ws.output().exists());
    }

    #[test]
    fn too_many_groups_skips_csv_output() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("");
        let content = fs::read_to_string(&config)
            .unwrap()
            .replace("max_files = 100", "max_files = 1");
        fs::write(&config, content).unwrap();

        assert_eq!(run(&["aggregate", "-c", &path_arg(&config)]), ExitCode::SUCCESS);
        assert!(!ws.output().exists());
    }

    #[test]
    fn missing_fx_rate_exits_with_fx_code() {
        let ws = Workspace::new();
        ws.seed_trades();
        let rates = ws.dir.path().join("rates.csv");
        fs::write(&rates, "From,To,Rate\nEUR,USD,1.1\n").unwrap();
        let config = ws.write_config(&format!(
            "[aggregation]\ncurrency = USD\n\n[fx]\nrates_file = {}\n",
            rates.display()
        ));

        assert_eq!(run(&["aggregate", "-c", &path_arg(&config)]), ExitCode::from(5));
        assert!(!ws.output().exists());
    }

    #[test]
    fn bad_filter_exits_with_request_code() {
        let ws = Workspace::new();
        ws.seed_trades();
        let config = ws.write_config("");
        assert_eq!(
            run(&["aggregate", "-c", &path_arg(&config), "--filter", "desk=1"]),
            ExitCode::from(4)
        );
    }
}
