//! P&L report output port trait.

use crate::domain::error::PnlError;
use crate::domain::grouping::AggregationRequest;
use crate::domain::pnl::PnlSeries;

/// Port for writing aggregated P&L series.
pub trait ReportPort {
    fn write(&self, series: &PnlSeries, request: &AggregationRequest) -> Result<(), PnlError>;
}
