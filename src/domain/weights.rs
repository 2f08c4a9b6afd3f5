//! Mean-variance optimal weight constructors.

use super::error::FolioError;
use super::estimators::{estimate_covariance, estimate_mean, reject_constant_columns};
use super::returns::ReturnsTable;
use super::shrinkage::shrink_covariance;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use tracing::debug;

const SUM_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMethod {
    Tangency,
    Gmv,
    EqualWeight,
}

impl fmt::Display for WeightMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightMethod::Tangency => write!(f, "tangency"),
            WeightMethod::Gmv => write!(f, "gmv"),
            WeightMethod::EqualWeight => write!(f, "equal-weight"),
        }
    }
}

fn invert(covariance: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>, FolioError> {
    if !covariance.is_square() {
        return Err(FolioError::shape(
            context,
            covariance.nrows(),
            covariance.ncols(),
        ));
    }
    if covariance.nrows() == 0 {
        return Err(FolioError::degenerate("covariance matrix is empty"));
    }

    // Variances at rounding level relative to the largest count as zero.
    let n = covariance.nrows();
    let diagonal = covariance.diagonal();
    let floor = diagonal.amax() * n as f64 * f64::EPSILON;
    if diagonal.iter().any(|&v| v <= floor) {
        return Err(FolioError::SingularMatrix {
            context: context.to_string(),
        });
    }

    let inverse = covariance
        .clone()
        .try_inverse()
        .ok_or_else(|| FolioError::SingularMatrix {
            context: context.to_string(),
        })?;

    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(FolioError::SingularMatrix {
            context: context.to_string(),
        });
    }
    Ok(inverse)
}

fn normalize(raw: DVector<f64>, context: &str) -> Result<DVector<f64>, FolioError> {
    let total = raw.sum();
    if total.abs() < SUM_TOLERANCE || !total.is_finite() {
        return Err(FolioError::degenerate(format!(
            "{context} raw weights sum to {total}, cannot normalise"
        )));
    }
    Ok(raw / total)
}

/// Tangency (maximum Sharpe) weights `V⁻¹μ`, scaled to sum to 1.
pub fn tangency(
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<DVector<f64>, FolioError> {
    let inverse = invert(covariance, "tangency")?;
    if mean.len() != inverse.nrows() {
        return Err(FolioError::shape("tangency mean", inverse.nrows(), mean.len()));
    }
    normalize(inverse * mean, "tangency")
}

/// Global minimum-variance weights `V⁻¹1`, scaled to sum to 1.
pub fn gmv(covariance: &DMatrix<f64>) -> Result<DVector<f64>, FolioError> {
    let inverse = invert(covariance, "gmv")?;
    let ones = DVector::from_element(inverse.nrows(), 1.0);
    normalize(inverse * ones, "gmv")
}

pub fn equal_weight(n: usize) -> Result<DVector<f64>, FolioError> {
    if n == 0 {
        return Err(FolioError::invalid(
            "n",
            0.0,
            "equal weighting needs at least one asset",
        ));
    }
    Ok(DVector::from_element(n, 1.0 / n as f64))
}

/// Fit weights for `method` on `data`. With `shrinkage`, covariance is the
/// constant-correlation shrunk estimate instead of the sample covariance.
pub fn construct_weights(
    method: WeightMethod,
    data: &ReturnsTable,
    shrinkage: Option<f64>,
) -> Result<DVector<f64>, FolioError> {
    if method == WeightMethod::EqualWeight {
        return equal_weight(data.n_assets());
    }

    reject_constant_columns(data)?;
    let covariance = match shrinkage {
        Some(s) => shrink_covariance(data, s)?,
        None => estimate_covariance(data)?,
    };
    debug!(%method, ?shrinkage, assets = data.n_assets(), "constructing weights");

    match method {
        WeightMethod::Tangency => tangency(&estimate_mean(data)?, &covariance),
        WeightMethod::Gmv => gmv(&covariance),
        WeightMethod::EqualWeight => equal_weight(data.n_assets()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn diag(values: &[f64]) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_row_slice(values))
    }

    #[test]
    fn tangency_diagonal_covariance() {
        let mu = DVector::from_vec(vec![0.1, 0.2]);
        let w = tangency(&mu, &diag(&[0.04, 0.09])).unwrap();

        // raw weights 2.5 and 2.2222
        let raw = [0.1 / 0.04, 0.2 / 0.09];
        let total: f64 = raw.iter().sum();
        assert_relative_eq!(w[0], raw[0] / total, epsilon = 1e-12);
        assert_relative_eq!(w[1], raw[1] / total, epsilon = 1e-12);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gmv_weights_inverse_to_variance() {
        let w = gmv(&diag(&[0.04, 0.09])).unwrap();
        let total = 1.0 / 0.04 + 1.0 / 0.09;
        assert_relative_eq!(w[0], (1.0 / 0.04) / total, epsilon = 1e-12);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gmv_with_correlation_sums_to_one() {
        let v = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.01, 0.002, 0.01, 0.09, 0.015, 0.002, 0.015, 0.0625],
        );
        let w = gmv(&v).unwrap();
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);

        // gradient of w'Vw is proportional to 1 at the optimum
        let grad = &v * &w;
        assert_relative_eq!(grad[0], grad[1], epsilon = 1e-12);
        assert_relative_eq!(grad[1], grad[2], epsilon = 1e-12);
    }

    #[test]
    fn singular_covariance_is_rejected() {
        let v = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(gmv(&v), Err(FolioError::SingularMatrix { .. })));

        let mu = DVector::from_vec(vec![0.1, 0.1]);
        assert!(matches!(
            tangency(&mu, &v),
            Err(FolioError::SingularMatrix { .. })
        ));
    }

    fn with_flat_column(level: f64) -> ReturnsTable {
        ReturnsTable::from_rows(
            &["A", "B", "Flat"],
            vec![
                vec![0.3, 0.5, level],
                vec![0.3, -0.1, level],
                vec![-0.1, 0.5, level],
                vec![-0.1, -0.1, level],
            ],
        )
        .unwrap()
    }

    #[test]
    fn construct_weights_rejects_constant_column() {
        for level in [0.0, 0.1, 0.7] {
            let data = with_flat_column(level);
            for method in [WeightMethod::Gmv, WeightMethod::Tangency] {
                match construct_weights(method, &data, None) {
                    Err(FolioError::DegenerateInput { reason }) => {
                        assert!(reason.contains("Flat"))
                    }
                    other => panic!("{method} at {level}: unexpected result: {other:?}"),
                }
            }
            assert!(construct_weights(WeightMethod::EqualWeight, &data, None).is_ok());
        }
    }

    #[test]
    fn rounding_level_variance_is_singular() {
        let cov = estimate_covariance(&with_flat_column(0.1)).unwrap();
        assert!(matches!(gmv(&cov), Err(FolioError::SingularMatrix { .. })));

        let mu = DVector::from_vec(vec![0.1, 0.2, 0.1]);
        assert!(matches!(
            tangency(&mu, &cov),
            Err(FolioError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn tangency_rejects_mismatched_mean() {
        let mu = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        assert!(matches!(
            tangency(&mu, &diag(&[0.04, 0.09])),
            Err(FolioError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn tangency_with_offsetting_means_cannot_normalise() {
        let mu = DVector::from_vec(vec![0.1, -0.1]);
        assert!(matches!(
            tangency(&mu, &diag(&[0.04, 0.04])),
            Err(FolioError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn non_square_covariance_is_shape_error() {
        let v = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(matches!(gmv(&v), Err(FolioError::ShapeMismatch { .. })));
    }

    #[test]
    fn equal_weight_entries() {
        let w = equal_weight(4).unwrap();
        assert_eq!(w.len(), 4);
        assert!(w.iter().all(|&x| x == 0.25));
        assert_relative_eq!(w.sum(), 1.0);
        assert!(equal_weight(0).is_err());
    }

    #[test]
    fn construct_weights_dispatches_by_method() {
        let data = ReturnsTable::from_rows(
            &["A", "B"],
            vec![
                vec![0.3, 0.5],
                vec![0.3, -0.1],
                vec![-0.1, 0.5],
                vec![-0.1, -0.1],
            ],
        )
        .unwrap();

        let ew = construct_weights(WeightMethod::EqualWeight, &data, None).unwrap();
        assert_eq!(ew.as_slice(), &[0.5, 0.5]);

        let g = construct_weights(WeightMethod::Gmv, &data, None).unwrap();
        let expected = gmv(&diag(&[0.04, 0.09])).unwrap();
        assert_relative_eq!(g[0], expected[0], epsilon = 1e-10);

        // uncorrelated sample: shrinking toward zero average correlation is a no-op
        let shrunk = construct_weights(WeightMethod::Tangency, &data, Some(0.5)).unwrap();
        let sample = construct_weights(WeightMethod::Tangency, &data, None).unwrap();
        assert_relative_eq!(shrunk[0], sample[0], epsilon = 1e-10);
    }
}
