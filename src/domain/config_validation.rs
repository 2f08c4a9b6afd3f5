//! Configuration validation.
//!
//! Checks every `[data]` and `[analysis]` value before any table is loaded.

use crate::domain::error::FolioError;
use crate::domain::stress::QuantileMethod;
use crate::domain::universe::{parse_asset_list, parse_weight_list};
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_data_dir(config)?;
    validate_asset_lists(config)?;
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_shrinkage(config)?;
    validate_risk_aversion(config)?;
    validate_alpha(config)?;
    validate_notional(config)?;
    validate_quantile(config)?;
    validate_market_weights(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> FolioError {
    FolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), FolioError> {
    match config.get_string("data", "dir") {
        Some(dir) if !dir.trim().is_empty() => Ok(()),
        _ => Err(FolioError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

fn validate_asset_lists(config: &dyn ConfigPort) -> Result<(), FolioError> {
    for key in ["assets", "exclude"] {
        if let Some(list) = config.get_string("data", key) {
            parse_asset_list(&list).map_err(|e| invalid("data", key, &e.to_string()))?;
        }
    }
    Ok(())
}

/// A present but unparseable number is an error, not a silent default.
fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, FolioError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, "not a number")),
    }
}

fn validate_shrinkage(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = parse_number(config, "analysis", "shrinkage")? {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid("analysis", "shrinkage", "shrinkage must be between 0 and 1"));
        }
    }
    Ok(())
}

fn validate_risk_aversion(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = parse_number(config, "analysis", "risk_aversion")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid("analysis", "risk_aversion", "risk_aversion must be positive"));
        }
    }
    Ok(())
}

fn validate_alpha(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = parse_number(config, "analysis", "alpha")? {
        if !(value > 0.0 && value < 1.0) {
            return Err(invalid(
                "analysis",
                "alpha",
                "alpha must be strictly between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn validate_notional(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = parse_number(config, "analysis", "notional")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid("analysis", "notional", "notional must be positive"));
        }
    }
    Ok(())
}

fn validate_quantile(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = config.get_string("analysis", "quantile") {
        if QuantileMethod::parse(&value).is_none() {
            return Err(invalid(
                "analysis",
                "quantile",
                "expected nearest-rank or higher",
            ));
        }
    }
    Ok(())
}

fn validate_market_weights(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(value) = config.get_string("black_litterman", "market_weights") {
        parse_weight_list(&value)
            .map_err(|e| invalid("black_litterman", "market_weights", &e.to_string()))?;
    }
    Ok(())
}
