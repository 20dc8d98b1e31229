//! Console P&L report adapter.

use std::fmt::Write as _;
use std::io::Write;

use crate::domain::error::PnlError;
use crate::domain::grouping::AggregationRequest;
use crate::domain::pnl::{PnlSeries, PnlSummary};
use crate::ports::report_port::ReportPort;

const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReportAdapter {
    summary: bool,
}

impl ConsoleReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a per-group summary block after the series.
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    /// Each group heading is preceded by a blank line. Positions print
    /// truncated toward zero.
    pub fn render(&self, series: &PnlSeries, request: &AggregationRequest) -> String {
        let title = request.title_suffix();
        let mut out = String::new();

        for (key, positions) in series {
            let _ = writeln!(out);
            let _ = writeln!(out, "----- {key} intraday cash positions{title} -----");
            for p in positions {
                let _ = writeln!(
                    out,
                    "{}: {}",
                    p.trade_time.format(LINE_TIME_FORMAT),
                    p.position.trunc().normalize()
                );
            }
        }

        if self.summary {
            let _ = writeln!(out);
            let _ = writeln!(out, "----- summary{title} -----");
            for s in PnlSummary::compute_per_group(series) {
                let _ = writeln!(
                    out,
                    "{}: {} trades {} .. {}, final {}",
                    s.group,
                    s.trades,
                    s.first.format(LINE_TIME_FORMAT),
                    s.last.format(LINE_TIME_FORMAT),
                    s.final_position.round_dp(2).normalize()
                );
            }
        }
        out
    }
}

impl ReportPort for ConsoleReportAdapter {
    fn write(&self, series: &PnlSeries, request: &AggregationRequest) -> Result<(), PnlError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(self.render(series, request).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
