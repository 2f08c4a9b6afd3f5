//! Returns table: time periods (rows) by named asset columns.

use super::error::FolioError;
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

/// Immutable table of per-period asset returns.
///
/// Rows are time periods in the order supplied, columns are assets. Every
/// cell is finite; missing values are rejected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsTable {
    assets: Vec<String>,
    periods: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnsTable {
    pub fn new(
        assets: Vec<String>,
        periods: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, FolioError> {
        if periods.len() != rows.len() {
            return Err(FolioError::shape("period labels", rows.len(), periods.len()));
        }

        let n_assets = assets.len();
        let mut flat = Vec::with_capacity(rows.len() * n_assets);
        for row in &rows {
            if row.len() != n_assets {
                return Err(FolioError::shape("returns row", n_assets, row.len()));
            }
            flat.extend_from_slice(row);
        }

        let values = DMatrix::from_row_slice(rows.len(), n_assets, &flat);
        Self::from_matrix(assets, periods, values)
    }

    /// Build a table with periods labelled `1..=n`.
    pub fn from_rows(assets: &[&str], rows: Vec<Vec<f64>>) -> Result<Self, FolioError> {
        let periods = (1..=rows.len()).map(|i| i.to_string()).collect();
        Self::new(
            assets.iter().map(|a| a.to_string()).collect(),
            periods,
            rows,
        )
    }

    pub fn from_matrix(
        assets: Vec<String>,
        periods: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, FolioError> {
        if values.ncols() != assets.len() {
            return Err(FolioError::shape("asset columns", assets.len(), values.ncols()));
        }
        if values.nrows() != periods.len() {
            return Err(FolioError::shape("period labels", values.nrows(), periods.len()));
        }

        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(FolioError::degenerate(format!(
                    "duplicate asset column {asset}"
                )));
            }
        }

        for (r, row) in values.row_iter().enumerate() {
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(FolioError::degenerate(format!(
                    "missing or non-finite value at period {}, asset {}",
                    periods[r], assets[c]
                )));
            }
        }

        Ok(Self {
            assets,
            periods,
            values,
        })
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, FolioError> {
        self.assets
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| FolioError::UnknownAsset {
                name: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<DVector<f64>, FolioError> {
        let idx = self.column_index(name)?;
        Ok(self.values.column(idx).into_owned())
    }

    /// New table holding exactly `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, FolioError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(FolioError::degenerate(format!(
                    "asset {name} selected more than once"
                )));
            }
            indices.push(self.column_index(name)?);
        }

        Ok(Self {
            assets: indices.iter().map(|&i| self.assets[i].clone()).collect(),
            periods: self.periods.clone(),
            values: self.values.select_columns(indices.iter()),
        })
    }

    /// New table without the named columns. Names not present are ignored.
    pub fn exclude<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let drop: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        let indices: Vec<usize> = (0..self.assets.len())
            .filter(|&i| !drop.contains(self.assets[i].as_str()))
            .collect();

        Self {
            assets: indices.iter().map(|&i| self.assets[i].clone()).collect(),
            periods: self.periods.clone(),
            values: self.values.select_columns(indices.iter()),
        }
    }

    /// Owned copy with `f` applied to every cell.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            assets: self.assets.clone(),
            periods: self.periods.clone(),
            values: self.values.map(f),
        }
    }
}
