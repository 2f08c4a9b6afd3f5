//! Pure numeric core: returns tables, estimators and portfolio analytics.

pub mod returns;
pub mod estimators;
pub mod performance;
pub mod weights;
pub mod shrinkage;
pub mod black_litterman;
pub mod stress;
pub mod universe;
pub mod analysis;
pub mod config_validation;
pub mod error;
