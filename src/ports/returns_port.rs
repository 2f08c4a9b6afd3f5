//! Returns data access port trait.

use crate::domain::error::FolioError;
use crate::domain::returns::ReturnsTable;

pub trait ReturnsPort {
    /// Load the full returns table stored under `dataset`.
    fn fetch_returns(&self, dataset: &str) -> Result<ReturnsTable, FolioError>;

    fn list_datasets(&self) -> Result<Vec<String>, FolioError>;
}
