//! CSV P&L report adapter: one file per group.

use chrono::{NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::error::PnlError;
use crate::domain::grouping::AggregationRequest;
use crate::domain::pnl::{PnlPosition, PnlSeries};
use crate::domain::trade::TRADE_TIME_FORMAT;
use crate::ports::report_port::ReportPort;

const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

pub struct CsvReportAdapter {
    output_dir: PathBuf,
    max_files: usize,
    run_stamp: NaiveDateTime,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf, max_files: usize) -> Self {
        Self {
            output_dir,
            max_files,
            run_stamp: Utc::now().naive_utc(),
        }
    }

    pub fn with_run_stamp(mut self, run_stamp: NaiveDateTime) -> Self {
        self.run_stamp = run_stamp;
        self
    }

    /// Directory this run's files go into.
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(format!(
            "aggregation_{}",
            self.run_stamp.format(RUN_DIR_FORMAT)
        ))
    }

    fn file_name(key: &str, title: &str) -> String {
        format!("{key}{title}.csv").replace(['/', '\\'], "_")
    }

    fn write_group(path: &Path, positions: &[PnlPosition]) -> Result<(), PnlError> {
        let report_err = |e: csv::Error| PnlError::Report {
            reason: format!("failed to write {}: {e}", path.display()),
        };
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record(["TradeTimeUTC", "PnLPosition"])
            .map_err(report_err)?;
        for p in positions {
            let time = p.trade_time.format(TRADE_TIME_FORMAT).to_string();
            let position = p.position.normalize().to_string();
            wtr.write_record([time.as_str(), position.as_str()])
                .map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, series: &PnlSeries, request: &AggregationRequest) -> Result<(), PnlError> {
        if series.len() > self.max_files {
            warn!(
                "{} groups exceed max_files = {}, skipping csv output",
                series.len(),
                self.max_files
            );
            return Ok(());
        }

        let dir = self.run_dir();
        fs::create_dir_all(&dir).map_err(|e| PnlError::Report {
            reason: format!("failed to create {}: {e}", dir.display()),
        })?;

        let title = request.title_suffix();
        for (key, positions) in series {
            Self::write_group(&dir.join(Self::file_name(key, &title)), positions)?;
        }
        info!("wrote {} csv files to {}", series.len(), dir.display());
        Ok(())
    }
}
