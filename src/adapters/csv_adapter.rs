//! CSV returns data adapter.
//!
//! Each dataset is a file `<base_path>/<dataset>.csv` with a header row. The
//! first column holds period labels; every other column is one return series.

use crate::domain::error::FolioError;
use crate::domain::returns::ReturnsTable;
use crate::ports::returns_port::ReturnsPort;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, dataset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", dataset))
    }
}

fn data_error(path: &PathBuf, reason: String) -> FolioError {
    FolioError::DataParse {
        source_name: path.display().to_string(),
        reason,
    }
}

impl ReturnsPort for CsvAdapter {
    fn fetch_returns(&self, dataset: &str) -> Result<ReturnsTable, FolioError> {
        let path = self.csv_path(dataset);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(&path, format!("failed to read: {}", e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| data_error(&path, format!("CSV header error: {}", e)))?
            .clone();
        if headers.len() < 2 {
            return Err(data_error(
                &path,
                "expected a period column followed by at least one return column".into(),
            ));
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = assets.iter().find(|a| !seen.insert(a.as_str())) {
            return Err(data_error(&path, format!("duplicate column {}", dup)));
        }

        let mut periods = Vec::new();
        let mut rows = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| data_error(&path, format!("CSV parse error: {}", e)))?;
            let row_number = line + 2;

            let period = record
                .get(0)
                .ok_or_else(|| data_error(&path, format!("row {}: missing period", row_number)))?;

            let mut row = Vec::with_capacity(assets.len());
            for (col, asset) in assets.iter().enumerate() {
                let cell = record.get(col + 1).unwrap_or("");
                if cell.is_empty() {
                    return Err(data_error(
                        &path,
                        format!("row {}: missing value for {}", row_number, asset),
                    ));
                }
                let value: f64 = cell.parse().map_err(|e| {
                    data_error(
                        &path,
                        format!("row {}: invalid {} value {:?}: {}", row_number, asset, cell, e),
                    )
                })?;
                row.push(value);
            }

            periods.push(period.to_string());
            rows.push(row);
        }

        debug!(dataset, periods = rows.len(), assets = assets.len(), "loaded returns");
        ReturnsTable::new(assets, periods, rows)
    }

    fn list_datasets(&self) -> Result<Vec<String>, FolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(&self.base_path, format!("failed to read directory: {}", e))
        })?;

        let mut datasets = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| data_error(&self.base_path, format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    datasets.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        datasets.sort();
        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "Month,Mkt-RF,Food,Beer,RF\n\
            201001,-3.36,0.52,-1.20,0.00\n\
            201002,3.40,1.76,2.95,0.00\n\
            201003,6.31,2.20,4.01,0.01\n";

        fs::write(path.join("industries.csv"), csv_content).unwrap();
        fs::write(path.join("gaps.csv"), "Month,Food,Beer\n201001,0.5,\n").unwrap();
        fs::write(path.join("bad.csv"), "Month,Food\n201001,n/a\n").unwrap();
        fs::write(path.join("twice.csv"), "Month,Food,Food\n201001,0.5,0.6\n").unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_returns_reads_table() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let table = adapter.fetch_returns("industries").unwrap();
        assert_eq!(table.n_periods(), 3);
        assert_eq!(
            table.assets(),
            &["Mkt-RF", "Food", "Beer", "RF"].map(String::from)
        );
        assert_eq!(table.periods()[1], "201002");
        assert_eq!(table.values()[(0, 0)], -3.36);
        assert_eq!(table.values()[(2, 2)], 4.01);
    }

    #[test]
    fn fetch_returns_rejects_missing_cell() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        match adapter.fetch_returns("gaps") {
            Err(FolioError::DataParse { reason, .. }) => {
                assert!(reason.contains("missing value for Beer"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn fetch_returns_rejects_non_numeric_cell() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_returns("bad"),
            Err(FolioError::DataParse { .. })
        ));
    }

    #[test]
    fn fetch_returns_rejects_duplicate_header() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_returns("twice").unwrap_err();
        match &err {
            FolioError::DataParse { reason, .. } => {
                assert!(reason.contains("duplicate column Food"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn fetch_returns_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_returns("absent").is_err());
    }

    #[test]
    fn list_datasets_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(
            adapter.list_datasets().unwrap(),
            vec!["bad", "gaps", "industries", "twice"]
        );
    }
}
