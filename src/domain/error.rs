//! Domain error types.

use crate::domain::trade::Currency;

/// Top-level error type for tradepnl.
#[derive(Debug, thiserror::Error)]
pub enum PnlError {
    #[error("malformed trade record {trade_id:?}: {reason}")]
    MalformedRecord { trade_id: String, reason: String },

    #[error("no FX rate from {from} to {to}")]
    MissingFxRate { from: Currency, to: Currency },

    #[error("unknown group field: {tag}")]
    UnknownGroupField { tag: String },

    #[error("unknown currency: {tag}")]
    UnknownCurrency { tag: String },

    #[error("invalid trade filter {input:?}: {reason}")]
    InvalidFilter { input: String, reason: String },

    #[error("failed to ingest {file}: {reason}")]
    Ingest { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("arithmetic overflow {context}")]
    Overflow { context: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("trade store lock poisoned")]
    StorePoisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl<T> From<std::sync::PoisonError<T>> for PnlError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        PnlError::StorePoisoned
    }
}

impl From<&PnlError> for std::process::ExitCode {
    fn from(err: &PnlError) -> Self {
        let code: u8 = match err {
            PnlError::Io(_) | PnlError::Report { .. } | PnlError::StorePoisoned => 1,
            PnlError::ConfigParse { .. }
            | PnlError::ConfigMissing { .. }
            | PnlError::ConfigInvalid { .. } => 2,
            PnlError::Ingest { .. }
            | PnlError::MalformedRecord { .. }
            | PnlError::Overflow { .. } => 3,
            PnlError::UnknownGroupField { .. }
            | PnlError::UnknownCurrency { .. }
            | PnlError::InvalidFilter { .. } => 4,
            PnlError::MissingFxRate { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
