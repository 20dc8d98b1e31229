//! Configuration validation.
//!
//! Checks every section before a run so a bad value fails fast instead of
//! half-way through an aggregation.

use std::path::Path;

use crate::domain::error::PnlError;
use crate::domain::grouping::parse_group_fields;
use crate::domain::reconcile::MergePolicy;
use crate::domain::trade::Currency;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PnlError> {
    validate_input(config)?;
    validate_output(config)?;
    validate_aggregation(config)?;
    validate_reconcile(config)?;
    validate_fx(config)?;
    Ok(())
}

fn validate_input(config: &dyn ConfigPort) -> Result<(), PnlError> {
    match config.get_string("input", "directory") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(PnlError::ConfigMissing {
            section: "input".to_string(),
            key: "directory".to_string(),
        }),
    }
}

fn validate_output(config: &dyn ConfigPort) -> Result<(), PnlError> {
    if let Some(raw) = config.get_string("output", "max_files") {
        if raw.trim().parse::<usize>().is_err() {
            return Err(PnlError::ConfigInvalid {
                section: "output".to_string(),
                key: "max_files".to_string(),
                reason: format!("{raw:?} is not a non-negative integer"),
            });
        }
    }
    if config.get_bool("output", "csv", true) {
        match config.get_string("output", "directory") {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(PnlError::ConfigMissing {
                    section: "output".to_string(),
                    key: "directory".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_aggregation(config: &dyn ConfigPort) -> Result<(), PnlError> {
    if let Some(fields) = config.get_string("aggregation", "group_fields") {
        parse_group_fields(&fields)?;
    }
    if let Some(currency) = config.get_string("aggregation", "currency") {
        if !currency.trim().is_empty() {
            currency.parse::<Currency>()?;
        }
    }
    Ok(())
}

fn validate_reconcile(config: &dyn ConfigPort) -> Result<(), PnlError> {
    if let Some(policy) = config.get_string("reconcile", "policy") {
        policy
            .parse::<MergePolicy>()
            .map_err(|reason| PnlError::ConfigInvalid {
                section: "reconcile".to_string(),
                key: "policy".to_string(),
                reason,
            })?;
    }
    Ok(())
}

fn validate_fx(config: &dyn ConfigPort) -> Result<(), PnlError> {
    match config.get_string("fx", "rates_file") {
        Some(path) if !Path::new(path.trim()).is_file() => Err(PnlError::ConfigInvalid {
            section: "fx".to_string(),
            key: "rates_file".to_string(),
            reason: format!("rates file {} does not exist", path.trim()),
        }),
        _ => Ok(()),
    }
}
