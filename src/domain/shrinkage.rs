//! Constant-correlation covariance shrinkage.
//!
//! The shrunk estimate blends the sample covariance `V` with a target `V_CC`
//! that keeps every sample variance but replaces each pairwise correlation by
//! the grand average off-diagonal correlation `rho_bar`:
//!
//! ```text
//! V_CC[i][j] = rho_bar * sqrt(V[i][i] * V[j][j])   (i != j)
//! V_CC[i][i] = V[i][i]
//! result     = shrinkage * V_CC + (1 - shrinkage) * V
//! ```
//!
//! The standard-deviation product is taken from the variances directly rather
//! than recovered as `V / C`, so asset pairs with zero sample correlation stay
//! finite.

use super::error::FolioError;
use super::estimators::{
    correlation_from_covariance, estimate_covariance, reject_constant_columns,
};
use super::returns::ReturnsTable;
use nalgebra::DMatrix;
use tracing::debug;

/// Mean of the strictly upper-triangular entries of a correlation matrix.
/// A single asset has no pairs and yields 0.
pub fn average_correlation(correlation: &DMatrix<f64>) -> f64 {
    let n = correlation.nrows();
    if n < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += correlation[(i, j)];
        }
    }
    total / ((n * (n - 1)) as f64 / 2.0)
}

pub fn constant_correlation_target(covariance: &DMatrix<f64>, rho_bar: f64) -> DMatrix<f64> {
    let n = covariance.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            covariance[(i, i)]
        } else {
            rho_bar * (covariance[(i, i)] * covariance[(j, j)]).sqrt()
        }
    })
}

pub fn shrink_covariance(data: &ReturnsTable, shrinkage: f64) -> Result<DMatrix<f64>, FolioError> {
    if !(0.0..=1.0).contains(&shrinkage) {
        return Err(FolioError::invalid(
            "shrinkage",
            shrinkage,
            "must be within [0, 1]",
        ));
    }

    reject_constant_columns(data)?;
    let covariance = estimate_covariance(data)?;
    let correlation = correlation_from_covariance(&covariance, data.assets())?;
    let rho_bar = average_correlation(&correlation);
    debug!(rho_bar, shrinkage, "constant-correlation shrinkage");

    let target = constant_correlation_target(&covariance, rho_bar);
    Ok(target * shrinkage + covariance * (1.0 - shrinkage))
}
