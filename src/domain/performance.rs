//! Portfolio performance on a returns sample.

use super::error::FolioError;
use super::estimators::{estimate_covariance, estimate_mean};
use super::returns::ReturnsTable;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPerformance {
    pub expected_return: f64,
    pub std_dev: f64,
    pub variance: f64,
    /// Excess return over standard deviation; the risk-free rate is zero.
    pub sharpe: f64,
}

impl PortfolioPerformance {
    pub fn from_moments(
        weights: &DVector<f64>,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<Self, FolioError> {
        if mean.len() != weights.len() {
            return Err(FolioError::shape("mean vector", weights.len(), mean.len()));
        }
        if covariance.nrows() != weights.len() || covariance.ncols() != weights.len() {
            return Err(FolioError::shape(
                "covariance matrix",
                weights.len(),
                covariance.nrows().max(covariance.ncols()),
            ));
        }

        let expected_return = mean.dot(weights);
        let variance = weights.dot(&(covariance * weights));
        if variance <= 0.0 {
            return Err(FolioError::degenerate(
                "portfolio variance is zero, Sharpe ratio is undefined",
            ));
        }
        let std_dev = variance.sqrt();

        Ok(PortfolioPerformance {
            expected_return,
            std_dev,
            variance,
            sharpe: expected_return / std_dev,
        })
    }
}

/// Expected return, risk and Sharpe ratio of `weights` held over `data`.
pub fn evaluate_performance(
    weights: &DVector<f64>,
    data: &ReturnsTable,
) -> Result<PortfolioPerformance, FolioError> {
    if weights.len() != data.n_assets() {
        return Err(FolioError::shape(
            "evaluate_performance weights",
            data.n_assets(),
            weights.len(),
        ));
    }

    let mean = estimate_mean(data)?;
    let covariance = estimate_covariance(data)?;
    PortfolioPerformance::from_moments(weights, &mean, &covariance)
}
