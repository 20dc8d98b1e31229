//! Cross-thread access to a [`CanonicalStore`].
//!
//! Reconciliation takes the write lock for a whole batch; aggregation takes
//! the read lock, or works off a cloned [`SharedStore::snapshot`].

use std::sync::RwLock;

use super::error::PnlError;
use super::fx::FxConverter;
use super::grouping::AggregationRequest;
use super::pnl::{self, PnlSeries};
use super::reconcile::{ReconcileReport, TradeReconciler};
use super::store::CanonicalStore;
use super::trade::Trade;

#[derive(Debug, Default)]
pub struct SharedStore {
    inner: RwLock<CanonicalStore>,
}

impl SharedStore {
    pub fn new(store: CanonicalStore) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    pub fn reconcile<I>(
        &self,
        reconciler: &TradeReconciler,
        batch: I,
    ) -> Result<ReconcileReport, PnlError>
    where
        I: IntoIterator<Item = Trade>,
    {
        let mut store = self.inner.write()?;
        Ok(reconciler.reconcile(&mut store, batch))
    }

    pub fn aggregate(
        &self,
        request: &AggregationRequest,
        fx: &FxConverter,
    ) -> Result<PnlSeries, PnlError> {
        let store = self.inner.read()?;
        pnl::aggregate(&store, request, fx)
    }

    pub fn snapshot(&self) -> Result<CanonicalStore, PnlError> {
        Ok(self.inner.read()?.clone())
    }

    pub fn len(&self) -> Result<usize, PnlError> {
        Ok(self.inner.read()?.len())
    }

    pub fn into_inner(self) -> Result<CanonicalStore, PnlError> {
        Ok(self.inner.into_inner()?)
    }
}
