//! Cumulative cash P&L series per aggregation bucket.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

use super::error::PnlError;
use super::fx::FxConverter;
use super::grouping::{AggregationRequest, group_trades};
use super::store::CanonicalStore;
use super::trade::{Currency, Trade};

/// Running cash position straight after the trade at `trade_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnlPosition {
    pub trade_time: NaiveDateTime,
    pub position: Decimal,
}

/// Group key → cumulative P&L series.
pub type PnlSeries = BTreeMap<String, Vec<PnlPosition>>;

/// Walk one time-ordered bucket, emitting the running total after each trade.
///
/// Buys subtract notional and sells add it. With a target currency, each
/// contribution in a different currency is converted first.
pub fn aggregate_bucket(
    trades: &[&Trade],
    target_currency: Option<Currency>,
    fx: &FxConverter,
) -> Result<Vec<PnlPosition>, PnlError> {
    let mut running = Decimal::ZERO;
    let mut positions = Vec::with_capacity(trades.len());

    for trade in trades {
        let mut contribution = trade.signed_cash()?;
        if let Some(target) = target_currency.filter(|&c| c != trade.currency) {
            contribution = fx.convert(contribution, trade.currency, target)?;
        }
        running = running
            .checked_add(contribution)
            .ok_or_else(|| PnlError::Overflow {
                context: format!("in running total at trade {}", trade.trade_id),
            })?;
        positions.push(PnlPosition {
            trade_time: trade.trade_time,
            position: running,
        });
    }
    Ok(positions)
}

/// Group the store per `request` and build every bucket's P&L series.
///
/// Fails as a whole on the first bucket (in key order) that needs a missing
/// FX rate. The store is only read.
pub fn aggregate(
    store: &CanonicalStore,
    request: &AggregationRequest,
    fx: &FxConverter,
) -> Result<PnlSeries, PnlError> {
    let buckets = group_trades(store, request);
    let mut series = PnlSeries::new();
    for (key, trades) in buckets {
        let positions = aggregate_bucket(&trades, request.target_currency, fx)?;
        series.insert(key, positions);
    }
    info!(
        "aggregated {} groups{}",
        series.len(),
        request.title_suffix()
    );
    Ok(series)
}

/// Headline figures for one group's series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlSummary {
    pub group: String,
    pub trades: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub final_position: Decimal,
}

impl PnlSummary {
    pub fn compute_per_group(series: &PnlSeries) -> Vec<PnlSummary> {
        series
            .iter()
            .filter_map(|(group, positions)| {
                let first = positions.first()?;
                let last = positions.last()?;
                Some(PnlSummary {
                    group: group.clone(),
                    trades: positions.len(),
                    first: first.trade_time,
                    last: last.trade_time,
                    final_position: last.position,
                })
            })
            .collect()
    }
}
