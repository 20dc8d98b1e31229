//! Port traits the domain is driven through.

pub mod config_port;
pub mod report_port;
pub mod trade_port;
