//! Historical-simulation stress tests: Value-at-Risk and Expected Shortfall.
//!
//! Scenario tables hold percentage returns. Each cell `p` is turned into a
//! gross factor `p / 100 + 1` on a private copy, positions are revalued under
//! every scenario and the loss distribution is summarised by its upper
//! `alpha`-quantile (VaR) and the mean of the tail at or above it (ES).

use super::error::FolioError;
use super::returns::ReturnsTable;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use tracing::debug;

pub const DEFAULT_NOTIONAL: f64 = 10_000_000.0;
pub const DEFAULT_ALPHA: f64 = 0.9;

// Absorbs representation error in `alpha * n` (0.9 * 10 must rank 9, not 10).
const RANK_TOLERANCE: f64 = 1e-9;

/// Rule for picking the VaR observation from sorted losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantileMethod {
    /// Smallest observed loss with at least `alpha` of scenarios at or below it.
    #[default]
    NearestRank,
    /// `sorted[ceil(alpha * (n - 1))]`, the linear-index "higher" rule.
    Higher,
}

impl QuantileMethod {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "nearest-rank" | "nearest_rank" | "nearest" => Some(Self::NearestRank),
            "higher" => Some(Self::Higher),
            _ => None,
        }
    }
}

impl fmt::Display for QuantileMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantileMethod::NearestRank => write!(f, "nearest-rank"),
            QuantileMethod::Higher => write!(f, "higher"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressConfig {
    pub alpha: f64,
    pub notional: f64,
    pub quantile: QuantileMethod,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            notional: DEFAULT_NOTIONAL,
            quantile: QuantileMethod::default(),
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> Result<(), FolioError> {
        validate_alpha(self.alpha)?;
        if !self.notional.is_finite() || self.notional <= 0.0 {
            return Err(FolioError::invalid(
                "notional",
                self.notional,
                "must be a positive amount",
            ));
        }
        Ok(())
    }
}

fn validate_alpha(alpha: f64) -> Result<(), FolioError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(FolioError::invalid("alpha", alpha, "must be in (0, 1)"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioLoss {
    /// Scenario number, counting from 1 in table order.
    pub scenario: usize,
    pub loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressReport {
    pub var: f64,
    pub es: f64,
    pub scenarios: usize,
    /// Every scenario, largest loss first.
    pub ranked_losses: Vec<ScenarioLoss>,
}

impl StressReport {
    pub fn from_losses(losses: &[f64], config: &StressConfig) -> Result<Self, FolioError> {
        let var = value_at_risk(losses, config.alpha, config.quantile)?;
        let es = expected_shortfall(losses, var)?;

        let mut ranked_losses: Vec<ScenarioLoss> = losses
            .iter()
            .enumerate()
            .map(|(i, &loss)| ScenarioLoss {
                scenario: i + 1,
                loss,
            })
            .collect();
        ranked_losses.sort_by(|a, b| b.loss.total_cmp(&a.loss));

        debug!(var, es, scenarios = losses.len(), "stress report");
        Ok(StressReport {
            var,
            es,
            scenarios: losses.len(),
            ranked_losses,
        })
    }
}

/// Owned copy of `table` with percentage returns turned into gross factors.
pub fn percent_to_gross(table: &ReturnsTable) -> ReturnsTable {
    table.map_values(|p| p / 100.0 + 1.0)
}

/// Loss per scenario: initial position total minus revalued position total.
pub fn scenario_losses(
    factors: &DMatrix<f64>,
    positions: &DVector<f64>,
) -> Result<Vec<f64>, FolioError> {
    if factors.ncols() != positions.len() {
        return Err(FolioError::shape(
            "scenario positions",
            factors.ncols(),
            positions.len(),
        ));
    }

    let initial = positions.sum();
    let values = factors * positions;
    Ok(values.iter().map(|v| initial - v).collect())
}

pub fn value_at_risk(
    losses: &[f64],
    alpha: f64,
    method: QuantileMethod,
) -> Result<f64, FolioError> {
    validate_alpha(alpha)?;
    if losses.is_empty() {
        return Err(FolioError::degenerate("no scenarios to take a quantile of"));
    }
    if losses.iter().any(|l| !l.is_finite()) {
        return Err(FolioError::degenerate("loss sequence contains non-finite values"));
    }

    let mut sorted = losses.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let index = match method {
        QuantileMethod::NearestRank => {
            let rank = (alpha * n as f64 - RANK_TOLERANCE).ceil() as usize;
            rank.clamp(1, n) - 1
        }
        QuantileMethod::Higher => ((alpha * (n - 1) as f64).ceil() as usize).min(n - 1),
    };
    Ok(sorted[index])
}

/// Mean of all losses at or above `var`.
pub fn expected_shortfall(losses: &[f64], var: f64) -> Result<f64, FolioError> {
    let tail: Vec<f64> = losses.iter().copied().filter(|&l| l >= var).collect();
    if tail.is_empty() {
        return Err(FolioError::degenerate(format!(
            "no losses at or above VaR {var}"
        )));
    }
    Ok(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// VaR/ES of the whole notional held in the single column `series`.
pub fn stress_test_market(
    scenarios: &ReturnsTable,
    series: &str,
    config: &StressConfig,
) -> Result<StressReport, FolioError> {
    config.validate()?;
    let gross = scenarios.column(series)?.map(|p| p / 100.0 + 1.0);
    let factors = DMatrix::from_column_slice(gross.len(), 1, gross.as_slice());
    let positions = DVector::from_element(1, config.notional);
    let losses = scenario_losses(&factors, &positions)?;
    StressReport::from_losses(&losses, config)
}

/// VaR/ES of `weights * notional` held across the named `assets` columns.
pub fn stress_test<S: AsRef<str>>(
    scenarios: &ReturnsTable,
    assets: &[S],
    weights: &DVector<f64>,
    config: &StressConfig,
) -> Result<StressReport, FolioError> {
    if weights.len() != assets.len() {
        return Err(FolioError::shape(
            "stress_test weights",
            assets.len(),
            weights.len(),
        ));
    }
    config.validate()?;

    let factors = percent_to_gross(&scenarios.select(assets)?);
    let positions = weights * config.notional;
    let losses = scenario_losses(factors.values(), &positions)?;
    StressReport::from_losses(&losses, config)
}
