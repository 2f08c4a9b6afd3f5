//! Moment estimators over a returns table.
//!
//! Covariance is the maximum-likelihood estimate (divides by `n`, not `n - 1`).

use super::error::FolioError;
use super::returns::ReturnsTable;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

pub const MIN_OBSERVATIONS: usize = 2;

/// Per-asset sample mean.
pub fn estimate_mean(data: &ReturnsTable) -> Result<DVector<f64>, FolioError> {
    let n = data.n_periods();
    if n == 0 {
        return Err(FolioError::degenerate("returns table has no periods"));
    }
    if data.n_assets() == 0 {
        return Err(FolioError::degenerate("returns table has no asset columns"));
    }

    let values = data.values();
    Ok(DVector::from_iterator(
        values.ncols(),
        values.column_iter().map(|c| c.sum() / n as f64),
    ))
}

/// Empirical covariance of the asset columns.
pub fn estimate_covariance(data: &ReturnsTable) -> Result<DMatrix<f64>, FolioError> {
    let n = data.n_periods();
    if n < MIN_OBSERVATIONS {
        return Err(FolioError::degenerate(format!(
            "covariance needs at least {MIN_OBSERVATIONS} periods, have {n}"
        )));
    }

    let mu = estimate_mean(data)?;
    let mut centered = data.values().clone();
    for (j, mut col) in centered.column_iter_mut().enumerate() {
        col.add_scalar_mut(-mu[j]);
    }

    let cov = centered.transpose() * &centered / n as f64;
    debug!(
        periods = n,
        assets = data.n_assets(),
        "estimated sample covariance"
    );
    Ok((&cov + cov.transpose()) * 0.5)
}

/// Pearson correlation matrix with a unit diagonal.
pub fn estimate_correlation(data: &ReturnsTable) -> Result<DMatrix<f64>, FolioError> {
    reject_constant_columns(data)?;
    let cov = estimate_covariance(data)?;
    correlation_from_covariance(&cov, data.assets())
}

/// Fails on the first column holding one repeated value.
///
/// Checked on the raw returns: the covariance of such a column rounds to a
/// tiny positive number for most levels, not to zero.
pub(crate) fn reject_constant_columns(data: &ReturnsTable) -> Result<(), FolioError> {
    if data.n_periods() == 0 {
        return Ok(());
    }
    for (j, col) in data.values().column_iter().enumerate() {
        let first = col[0];
        if col.iter().all(|&v| v == first) {
            return Err(FolioError::degenerate(format!(
                "asset {} is constant at {first}, its variance is zero",
                data.assets()[j]
            )));
        }
    }
    Ok(())
}

pub(crate) fn correlation_from_covariance(
    cov: &DMatrix<f64>,
    assets: &[String],
) -> Result<DMatrix<f64>, FolioError> {
    let n = cov.nrows();
    let sd: Vec<f64> = (0..n).map(|i| cov[(i, i)].sqrt()).collect();

    if let Some(i) = sd.iter().position(|&s| s <= 0.0) {
        let name = assets.get(i).map(String::as_str).unwrap_or("?");
        return Err(FolioError::degenerate(format!(
            "asset {name} has zero variance, correlation is undefined"
        )));
    }

    Ok(DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            (cov[(i, j)] / (sd[i] * sd[j])).clamp(-1.0, 1.0)
        }
    }))
}
