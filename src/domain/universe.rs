//! Asset universe: which columns of a returns table are tradeable assets.
//!
//! Factor files usually carry non-asset columns next to the assets (market
//! excess return, risk-free rate). Callers either name the asset columns
//! explicitly or list the columns to drop.

use crate::domain::error::FolioError;
use crate::domain::returns::ReturnsTable;
use nalgebra::DVector;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),

    #[error("invalid weight {token:?}: not a number")]
    InvalidWeight { token: String },
}

/// Comma-separated asset names, trimmed. Names are case-sensitive.
pub fn parse_asset_list(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(UniverseError::DuplicateAsset(trimmed.to_string()));
        }
        assets.push(trimmed.to_string());
    }

    Ok(assets)
}

/// Comma-separated weights, e.g. `0.4, 0.6`.
pub fn parse_weight_list(input: &str) -> Result<DVector<f64>, UniverseError> {
    let mut weights = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let value: f64 = trimmed.parse().map_err(|_| UniverseError::InvalidWeight {
            token: trimmed.to_string(),
        })?;
        if !value.is_finite() {
            return Err(UniverseError::InvalidWeight {
                token: trimmed.to_string(),
            });
        }
        weights.push(value);
    }
    Ok(DVector::from_vec(weights))
}

/// Restrict `table` to its asset columns.
///
/// With `assets`, exactly those columns are kept in that order. Otherwise
/// every column except `exclude` is kept.
pub fn resolve_universe(
    table: &ReturnsTable,
    assets: Option<&[String]>,
    exclude: &[String],
) -> Result<ReturnsTable, FolioError> {
    let resolved = match assets {
        Some(names) => table.select(names)?,
        None => {
            for name in exclude {
                if table.column_index(name).is_err() {
                    warn!("excluded column {} not present in returns table", name);
                }
            }
            table.exclude(exclude)
        }
    };

    if resolved.n_assets() == 0 {
        return Err(FolioError::degenerate("no asset columns left after selection"));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor_table() -> ReturnsTable {
        ReturnsTable::from_rows(
            &["Mkt-RF", "Food", "Beer", "RF"],
            vec![vec![1.0, 0.5, 0.7, 0.01], vec![-1.0, 0.2, -0.3, 0.01]],
        )
        .unwrap()
    }

    #[test]
    fn parse_asset_list_trims_and_keeps_case() {
        let assets = parse_asset_list(" Food, Beer ,Smoke").unwrap();
        assert_eq!(assets, vec!["Food", "Beer", "Smoke"]);
    }

    #[test]
    fn parse_asset_list_rejects_empty_token() {
        assert_eq!(parse_asset_list("Food,,Beer"), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn parse_asset_list_rejects_duplicates() {
        assert_eq!(
            parse_asset_list("Food,Beer,Food"),
            Err(UniverseError::DuplicateAsset("Food".into()))
        );
    }

    #[test]
    fn parse_weight_list_values() {
        let w = parse_weight_list("0.4, 0.6").unwrap();
        assert_eq!(w.as_slice(), &[0.4, 0.6]);
        assert!(matches!(
            parse_weight_list("0.4,abc"),
            Err(UniverseError::InvalidWeight { .. })
        ));
        assert!(parse_weight_list("0.4,inf").is_err());
    }

    #[test]
    fn resolve_with_explicit_assets() {
        let table = factor_table();
        let assets = vec!["Beer".to_string(), "Food".to_string()];
        let resolved = resolve_universe(&table, Some(&assets), &[]).unwrap();
        assert_eq!(resolved.assets(), assets.as_slice());
    }

    #[test]
    fn resolve_with_exclusions() {
        let table = factor_table();
        let exclude = vec!["Mkt-RF".to_string(), "RF".to_string(), "SMB".to_string()];
        let resolved = resolve_universe(&table, None, &exclude).unwrap();
        assert_eq!(resolved.assets(), &["Food".to_string(), "Beer".to_string()]);
    }

    #[test]
    fn resolve_fails_when_nothing_left() {
        let table = factor_table();
        let exclude: Vec<String> = table.assets().to_vec();
        assert!(matches!(
            resolve_universe(&table, None, &exclude),
            Err(FolioError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn resolve_unknown_asset() {
        let table = factor_table();
        let assets = vec!["Coal".to_string()];
        assert!(matches!(
            resolve_universe(&table, Some(&assets), &[]),
            Err(FolioError::UnknownAsset { .. })
        ));
    }
}
