//! Core domain types and logic.

pub mod trade;
pub mod fx;
pub mod store;
pub mod reconcile;
pub mod grouping;
pub mod pnl;
pub mod shared;
pub mod config_validation;
pub mod error;
