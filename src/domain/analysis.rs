//! Parameters shared by the analytics commands.

use super::stress::StressConfig;

pub const DEFAULT_RISK_AVERSION: f64 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Blend toward the constant-correlation target; `None` uses the sample covariance.
    pub shrinkage: Option<f64>,
    pub risk_aversion: f64,
    pub stress: StressConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            shrinkage: None,
            risk_aversion: DEFAULT_RISK_AVERSION,
            stress: StressConfig::default(),
        }
    }
}
