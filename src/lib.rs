//! Portfolio analytics helpers.
//!
//! Moment estimation, mean-variance weights, covariance shrinkage,
//! Black-Litterman implied returns and historical-simulation stress tests.
//!
//! Hexagonal architecture: numeric core in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
