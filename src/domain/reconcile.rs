//! Trade lifecycle reconciliation.
//!
//! Folds raw trade records into a [`CanonicalStore`], one record at a time in
//! the order they arrive. Priority runs New < Amend < Cancel: a New is always
//! replaced, a Cancel is terminal, and between two Amends the later
//! `trade_time` wins with ties going to the record applied last.
//!
//! Batches are not sorted before folding. When one batch carries several
//! conflicting records for an id out of time order, the result depends on
//! their order in the batch.

use std::collections::btree_map::Entry;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::error::PnlError;
use super::store::CanonicalStore;
use super::trade::{Action, Trade};

/// Which of the two records sharing an id survives a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Current,
    Incoming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Plain priority rule.
    #[default]
    Priority,
    /// Priority rule plus anomaly detection; duplicate News and Cancels are
    /// settled by `trade_time` instead of arrival.
    Strict,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "priority" => Ok(MergePolicy::Priority),
            "strict" => Ok(MergePolicy::Strict),
            other => Err(format!("unknown merge policy {other:?}, expected priority or strict")),
        }
    }
}

/// Lifecycle irregularities flagged under [`MergePolicy::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAnomaly {
    /// A second New arrived for an id already holding a New.
    DuplicateNew,
    /// A New stamped at or after the Amend it tried to replace.
    NewAfterAmend,
    /// A New or Amend stamped at or after the Cancel it tried to replace.
    ReopenAfterCancel(Action),
    /// Two records with the same action and the same `trade_time`.
    IndistinguishableTimes(Action),
}

impl std::fmt::Display for MergeAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeAnomaly::DuplicateNew => write!(f, "multiple NEW records"),
            MergeAnomaly::NewAfterAmend => {
                write!(f, "NEW record clocked at or after an AMEND, ignored")
            }
            MergeAnomaly::ReopenAfterCancel(action) => {
                write!(f, "{action} record clocked at or after a CANCEL, ignored")
            }
            MergeAnomaly::IndistinguishableTimes(action) => write!(
                f,
                "{action} records indistinguishable by time, using most recently processed"
            ),
        }
    }
}

/// Priority merge for two records sharing an id.
pub fn merge(current: &Trade, incoming: &Trade) -> Winner {
    if current.action == Action::New || incoming.action == Action::Cancel {
        return Winner::Incoming;
    }
    if current.action == Action::Cancel {
        return Winner::Current;
    }
    if incoming.action == Action::New || incoming.trade_time < current.trade_time {
        Winner::Current
    } else {
        Winner::Incoming
    }
}

/// Strict merge: same priorities, plus the anomalies found along the way.
pub fn merge_strict(current: &Trade, incoming: &Trade) -> (Winner, Vec<MergeAnomaly>) {
    let mut anomalies = Vec::new();
    let not_earlier = incoming.trade_time >= current.trade_time;

    let winner = match (current.action, incoming.action) {
        (Action::New, Action::New) => {
            anomalies.push(MergeAnomaly::DuplicateNew);
            latest_of_same_action(current, incoming, &mut anomalies)
        }
        (Action::New, _) => Winner::Incoming,
        (Action::Amend, Action::New) => {
            if not_earlier {
                anomalies.push(MergeAnomaly::NewAfterAmend);
            }
            Winner::Current
        }
        (Action::Amend, Action::Cancel) => Winner::Incoming,
        (Action::Cancel, reopen @ (Action::New | Action::Amend)) => {
            if not_earlier {
                anomalies.push(MergeAnomaly::ReopenAfterCancel(reopen));
            }
            Winner::Current
        }
        (Action::Amend, Action::Amend) | (Action::Cancel, Action::Cancel) => {
            latest_of_same_action(current, incoming, &mut anomalies)
        }
    };
    (winner, anomalies)
}

fn latest_of_same_action(
    current: &Trade,
    incoming: &Trade,
    anomalies: &mut Vec<MergeAnomaly>,
) -> Winner {
    if incoming.trade_time == current.trade_time {
        anomalies.push(MergeAnomaly::IndistinguishableTimes(incoming.action));
        Winner::Incoming
    } else if incoming.trade_time < current.trade_time {
        Winner::Current
    } else {
        Winner::Incoming
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyRecord {
    pub trade_id: String,
    pub anomaly: MergeAnomaly,
}

/// Outcome of folding one batch into the store.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Records whose id was not yet in the store.
    pub inserted: usize,
    /// Records that replaced the stored entry.
    pub replaced: usize,
    /// Records that lost to the stored entry.
    pub retained: usize,
    /// Records that failed validation, each a [`PnlError::MalformedRecord`].
    pub skipped: Vec<PnlError>,
    pub anomalies: Vec<AnomalyRecord>,
    /// Trade files that could not be read, each a [`PnlError::Ingest`].
    pub failed_files: Vec<PnlError>,
}

impl ReconcileReport {
    pub fn processed(&self) -> usize {
        self.inserted + self.replaced + self.retained + self.skipped.len()
    }

    pub fn absorb(&mut self, other: ReconcileReport) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.retained += other.retained;
        self.skipped.extend(other.skipped);
        self.anomalies.extend(other.anomalies);
        self.failed_files.extend(other.failed_files);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeReconciler {
    policy: MergePolicy,
}

impl TradeReconciler {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Fold `batch` into `store` in iteration order.
    pub fn reconcile<I>(&self, store: &mut CanonicalStore, batch: I) -> ReconcileReport
    where
        I: IntoIterator<Item = Trade>,
    {
        let mut report = ReconcileReport::default();

        for incoming in batch {
            if let Err(e) = incoming.validate() {
                warn!("skipping trade record: {e}");
                report.skipped.push(e);
                continue;
            }

            match store.entry(incoming.trade_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                    report.inserted += 1;
                }
                Entry::Occupied(mut slot) => {
                    let winner = match self.policy {
                        MergePolicy::Priority => merge(slot.get(), &incoming),
                        MergePolicy::Strict => {
                            let (winner, anomalies) = merge_strict(slot.get(), &incoming);
                            for anomaly in anomalies {
                                warn!("trade {} has {anomaly}", incoming.trade_id);
                                report.anomalies.push(AnomalyRecord {
                                    trade_id: incoming.trade_id.clone(),
                                    anomaly,
                                });
                            }
                            winner
                        }
                    };
                    debug!(
                        "trade {}: {} vs incoming {} -> {:?}",
                        incoming.trade_id,
                        slot.get().action,
                        incoming.action,
                        winner
                    );
                    match winner {
                        Winner::Incoming => {
                            slot.insert(incoming);
                            report.replaced += 1;
                        }
                        Winner::Current => report.retained += 1,
                    }
                }
            }
        }

        info!(
            "reconciled {} records ({} new ids, {} replaced, {} retained, {} skipped), store now holds {} trades",
            report.processed(),
            report.inserted,
            report.replaced,
            report.retained,
            report.skipped.len(),
            store.len()
        );
        report
    }
}

/// Fold `batch` into `store` under [`MergePolicy::Priority`].
pub fn reconcile<I>(store: &mut CanonicalStore, batch: I) -> ReconcileReport
where
    I: IntoIterator<Item = Trade>,
{
    TradeReconciler::default().reconcile(store, batch)
}
