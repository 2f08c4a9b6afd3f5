//! Black-Litterman equilibrium (implied) excess returns.

use super::error::FolioError;
use nalgebra::{DMatrix, DVector};

/// `risk_aversion * (sigma · weights)`: the excess returns under which the
/// given market weights would be mean-variance optimal.
pub fn implied_returns(
    risk_aversion: f64,
    sigma: &DMatrix<f64>,
    weights: &DVector<f64>,
) -> Result<DVector<f64>, FolioError> {
    if !risk_aversion.is_finite() || risk_aversion <= 0.0 {
        return Err(FolioError::invalid(
            "risk_aversion",
            risk_aversion,
            "must be a positive number",
        ));
    }
    if !sigma.is_square() {
        return Err(FolioError::shape(
            "implied_returns covariance",
            sigma.nrows(),
            sigma.ncols(),
        ));
    }
    if weights.len() != sigma.ncols() {
        return Err(FolioError::shape(
            "implied_returns weights",
            sigma.ncols(),
            weights.len(),
        ));
    }

    Ok(sigma * weights * risk_aversion)
}
