#![allow(dead_code)]

use folioscope::cli::DataConfig;
use folioscope::domain::error::FolioError;
use folioscope::domain::returns::ReturnsTable;
use folioscope::ports::returns_port::ReturnsPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct MockReturnsPort {
    pub tables: HashMap<String, ReturnsTable>,
    pub errors: HashMap<String, String>,
}

impl MockReturnsPort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_table(mut self, dataset: &str, table: ReturnsTable) -> Self {
        self.tables.insert(dataset.to_string(), table);
        self
    }

    pub fn with_error(mut self, dataset: &str, reason: &str) -> Self {
        self.errors.insert(dataset.to_string(), reason.to_string());
        self
    }
}

impl ReturnsPort for MockReturnsPort {
    fn fetch_returns(&self, dataset: &str) -> Result<ReturnsTable, FolioError> {
        if let Some(reason) = self.errors.get(dataset) {
            return Err(FolioError::DataParse {
                source_name: dataset.to_string(),
                reason: reason.clone(),
            });
        }
        self.tables
            .get(dataset)
            .cloned()
            .ok_or_else(|| FolioError::DataParse {
                source_name: dataset.to_string(),
                reason: "no such dataset".into(),
            })
    }

    fn list_datasets(&self) -> Result<Vec<String>, FolioError> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub const INDUSTRY_HEADER: [&str; 5] = ["Mkt-RF", "Food", "Beer", "Smoke", "RF"];

/// Monthly excess returns (percent) for three industries plus the market
/// and risk-free columns found in factor files.
pub const INDUSTRY_ROWS: [[f64; 5]; 12] = [
    [1.2, 0.8, 1.5, 0.3, 0.01],
    [-0.5, 0.2, -0.9, 1.1, 0.01],
    [2.1, 1.4, 2.6, 0.4, 0.01],
    [0.7, 0.9, 0.2, 1.8, 0.02],
    [-1.8, -0.6, -2.2, 0.5, 0.02],
    [1.5, 1.1, 1.9, -0.2, 0.02],
    [0.3, 0.5, 0.8, 0.9, 0.02],
    [-0.9, -0.1, -1.4, 1.3, 0.03],
    [2.4, 1.6, 2.9, 0.1, 0.03],
    [0.6, 0.7, 0.4, 1.5, 0.03],
    [-1.1, -0.3, -1.7, 0.6, 0.03],
    [1.9, 1.2, 2.3, 0.2, 0.03],
];

pub fn industry_table() -> ReturnsTable {
    let periods = (1..=INDUSTRY_ROWS.len())
        .map(|m| format!("2019{:02}", m))
        .collect();
    ReturnsTable::new(
        INDUSTRY_HEADER.iter().map(|s| s.to_string()).collect(),
        periods,
        INDUSTRY_ROWS.iter().map(|r| r.to_vec()).collect(),
    )
    .unwrap()
}

/// Percentage returns under historical crisis months.
pub fn scenario_table() -> ReturnsTable {
    ReturnsTable::new(
        INDUSTRY_HEADER.iter().map(|s| s.to_string()).collect(),
        ["200809", "200810", "200811", "200812", "200901"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        vec![
            vec![-9.2, -4.0, -6.0, -2.0, 0.1],
            vec![-17.2, -8.0, -12.0, -6.0, 0.1],
            vec![-7.8, -2.0, -5.0, 1.0, 0.0],
            vec![1.7, 3.0, 1.0, 2.0, 0.0],
            vec![-8.1, -5.0, -7.0, -3.0, 0.0],
        ],
    )
    .unwrap()
}

pub fn data_config() -> DataConfig {
    DataConfig {
        dir: PathBuf::from("unused"),
        train: Some("train".into()),
        test: Some("test".into()),
        scenarios: Some("crisis".into()),
        assets: None,
        exclude: vec!["Mkt-RF".into(), "RF".into()],
    }
}

pub fn standard_port() -> MockReturnsPort {
    MockReturnsPort::new()
        .with_table("train", industry_table())
        .with_table("test", industry_table())
        .with_table("crisis", scenario_table())
}

pub fn write_csv(dir: &Path, dataset: &str, table: &ReturnsTable) {
    let mut file = std::fs::File::create(dir.join(format!("{dataset}.csv"))).unwrap();
    writeln!(file, "Month,{}", table.assets().join(",")).unwrap();
    for (r, period) in table.periods().iter().enumerate() {
        let cells: Vec<String> = table
            .values()
            .row(r)
            .iter()
            .map(|v| v.to_string())
            .collect();
        writeln!(file, "{},{}", period, cells.join(",")).unwrap();
    }
}

pub fn output_string(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}
