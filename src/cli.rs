//! CLI definition and dispatch.
//!
//! Every analytics command loads an INI config, resolves datasets through a
//! [`ReturnsPort`] and writes its result table to stdout. Progress and errors
//! go through `tracing` on stderr.

use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::{DMatrix, DVector};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{AnalysisConfig, DEFAULT_RISK_AVERSION};
use crate::domain::black_litterman::implied_returns;
use crate::domain::config_validation::{validate_analysis_config, validate_data_config};
use crate::domain::error::FolioError;
use crate::domain::estimators::estimate_covariance;
use crate::domain::performance::evaluate_performance;
use crate::domain::returns::ReturnsTable;
use crate::domain::shrinkage::shrink_covariance;
use crate::domain::stress::{
    stress_test, stress_test_market, QuantileMethod, StressConfig, StressReport, DEFAULT_ALPHA,
    DEFAULT_NOTIONAL,
};
use crate::domain::universe::{parse_asset_list, parse_weight_list, resolve_universe};
use crate::domain::weights::{construct_weights, WeightMethod};
use crate::ports::config_port::ConfigPort;
use crate::ports::returns_port::ReturnsPort;

const WORST_SCENARIOS_SHOWN: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "folioscope",
    about = "Portfolio weights, covariance shrinkage, implied returns and stress tests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Maximum Sharpe ratio
    Tangency,
    /// Global minimum variance
    Gmv,
    /// Equal weights
    Ewp,
}

impl From<MethodArg> for WeightMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Tangency => WeightMethod::Tangency,
            MethodArg::Gmv => WeightMethod::Gmv,
            MethodArg::Ewp => WeightMethod::EqualWeight,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fit portfolio weights on the training dataset
    Weights {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = MethodArg::Tangency)]
        method: MethodArg,
        #[arg(long)]
        shrinkage: Option<f64>,
    },
    /// Fit weights on the training dataset and evaluate them on the test dataset
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = MethodArg::Tangency)]
        method: MethodArg,
        #[arg(long)]
        shrinkage: Option<f64>,
    },
    /// Print the shrunk covariance matrix of the training dataset
    Shrink {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        shrinkage: Option<f64>,
    },
    /// Black-Litterman implied excess returns for the configured market weights
    ImpliedReturns {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        risk_aversion: Option<f64>,
    },
    /// Historical-simulation VaR and Expected Shortfall over the scenario dataset
    Stress {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = MethodArg::Ewp)]
        method: MethodArg,
        /// Stress a single series instead of a fitted portfolio
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        alpha: Option<f64>,
        #[arg(long)]
        shrinkage: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List datasets available in the data directory
    ListDatasets {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// `[data]` section: where tables live and which columns are assets.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub train: Option<String>,
    pub test: Option<String>,
    pub scenarios: Option<String>,
    pub assets: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl DataConfig {
    pub fn dataset(&self, key: &str) -> Result<&str, FolioError> {
        let value = match key {
            "train" => self.train.as_deref(),
            "test" => self.test.as_deref(),
            "scenarios" => self.scenarios.as_deref(),
            _ => None,
        };
        value.ok_or_else(|| FolioError::ConfigMissing {
            section: "data".into(),
            key: key.into(),
        })
    }
}

/// What a stress test holds: one series, or weights fitted on the training data.
#[derive(Debug, Clone, PartialEq)]
pub enum StressTarget {
    Market(String),
    Portfolio(WeightMethod),
}

pub fn run(cli: Cli) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match execute(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

/// Run one command, writing its result to `out`.
pub fn execute(command: Command, out: &mut dyn Write) -> Result<(), FolioError> {
    match command {
        Command::Weights {
            config,
            method,
            shrinkage,
        } => {
            let session = Session::load(&config)?.with_shrinkage(shrinkage);
            run_weights(&session.port, &session.data, &session.analysis, method.into(), out)
        }
        Command::Evaluate {
            config,
            method,
            shrinkage,
        } => {
            let session = Session::load(&config)?.with_shrinkage(shrinkage);
            run_evaluate(&session.port, &session.data, &session.analysis, method.into(), out)
        }
        Command::Shrink { config, shrinkage } => {
            let session = Session::load(&config)?.with_shrinkage(shrinkage);
            run_shrink(&session.port, &session.data, &session.analysis, out)
        }
        Command::ImpliedReturns {
            config,
            risk_aversion,
        } => {
            let mut session = Session::load(&config)?;
            if let Some(ra) = risk_aversion {
                session.analysis.risk_aversion = ra;
            }
            let weights = market_weights(&session.config)?;
            run_implied_returns(
                &session.port,
                &session.data,
                &session.analysis,
                &weights,
                out,
            )
        }
        Command::Stress {
            config,
            method,
            market,
            alpha,
            shrinkage,
        } => {
            let mut session = Session::load(&config)?.with_shrinkage(shrinkage);
            if let Some(a) = alpha {
                session.analysis.stress.alpha = a;
            }
            let target = match market {
                Some(series) => StressTarget::Market(series),
                None => StressTarget::Portfolio(method.into()),
            };
            run_stress(&session.port, &session.data, &session.analysis, &target, out)
        }
        Command::Validate { config } => run_validate(&config, out),
        Command::ListDatasets { config } => {
            let session = Session::load(&config)?;
            run_list_datasets(&session.port, out)
        }
    }
}

struct Session {
    config: FileConfigAdapter,
    data: DataConfig,
    analysis: AnalysisConfig,
    port: CsvAdapter,
}

impl Session {
    fn load(path: &Path) -> Result<Self, FolioError> {
        info!("Loading config from {}", path.display());
        let config = load_config(path)?;
        let data = build_data_config(&config)?;
        let analysis = build_analysis_config(&config)?;
        let port = CsvAdapter::new(data.dir.clone());
        Ok(Self {
            config,
            data,
            analysis,
            port,
        })
    }

    fn with_shrinkage(mut self, shrinkage: Option<f64>) -> Self {
        if shrinkage.is_some() {
            self.analysis.shrinkage = shrinkage;
        }
        self
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FolioError> {
    FileConfigAdapter::from_file(path).map_err(|e| FolioError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_data_config(adapter: &dyn ConfigPort) -> Result<DataConfig, FolioError> {
    validate_data_config(adapter)?;

    let dir = adapter
        .get_string("data", "dir")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;

    let assets = match adapter.get_string("data", "assets") {
        Some(list) => Some(parse_asset_list(&list)?),
        None => None,
    };
    let exclude = match adapter.get_string("data", "exclude") {
        Some(list) => parse_asset_list(&list)?,
        None => Vec::new(),
    };

    Ok(DataConfig {
        dir: PathBuf::from(dir),
        train: adapter.get_string("data", "train"),
        test: adapter.get_string("data", "test"),
        scenarios: adapter.get_string("data", "scenarios"),
        assets,
        exclude,
    })
}

pub fn build_analysis_config(adapter: &dyn ConfigPort) -> Result<AnalysisConfig, FolioError> {
    validate_analysis_config(adapter)?;

    let shrinkage = adapter
        .get_string("analysis", "shrinkage")
        .map(|_| adapter.get_double("analysis", "shrinkage", 0.0));
    let quantile = adapter
        .get_string("analysis", "quantile")
        .and_then(|q| QuantileMethod::parse(&q))
        .unwrap_or_default();

    Ok(AnalysisConfig {
        shrinkage,
        risk_aversion: adapter.get_double("analysis", "risk_aversion", DEFAULT_RISK_AVERSION),
        stress: StressConfig {
            alpha: adapter.get_double("analysis", "alpha", DEFAULT_ALPHA),
            notional: adapter.get_double("analysis", "notional", DEFAULT_NOTIONAL),
            quantile,
        },
    })
}

pub fn market_weights(adapter: &dyn ConfigPort) -> Result<DVector<f64>, FolioError> {
    let raw = adapter
        .get_string("black_litterman", "market_weights")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: "black_litterman".into(),
            key: "market_weights".into(),
        })?;
    Ok(parse_weight_list(&raw)?)
}

/// Fetch the dataset named by `[data] <key>` and keep only its asset columns.
pub fn load_universe(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    key: &str,
) -> Result<ReturnsTable, FolioError> {
    let dataset = data.dataset(key)?;
    info!("Loading {} dataset {}", key, dataset);
    let table = port.fetch_returns(dataset)?;
    resolve_universe(&table, data.assets.as_deref(), &data.exclude)
}

pub fn fit_weights(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    method: WeightMethod,
) -> Result<(ReturnsTable, DVector<f64>), FolioError> {
    let train = load_universe(port, data, "train")?;
    info!(
        "Fitting {} weights: {} assets, {} periods",
        method,
        train.n_assets(),
        train.n_periods()
    );
    let weights = construct_weights(method, &train, analysis.shrinkage)?;
    Ok((train, weights))
}

fn covariance_for(
    data: &ReturnsTable,
    analysis: &AnalysisConfig,
) -> Result<DMatrix<f64>, FolioError> {
    match analysis.shrinkage {
        Some(s) => shrink_covariance(data, s),
        None => estimate_covariance(data),
    }
}

pub fn run_weights(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    method: WeightMethod,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let (train, weights) = fit_weights(port, data, analysis, method)?;
    writeln!(out, "{:<16} {:>12}", "asset", method.to_string())?;
    write_vector(out, train.assets(), &weights)?;
    writeln!(out, "{:<16} {:>12.6}", "total", weights.sum())?;
    Ok(())
}

pub fn run_evaluate(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    method: WeightMethod,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let (train, weights) = fit_weights(port, data, analysis, method)?;

    let test_name = data.dataset("test")?;
    info!("Evaluating on {}", test_name);
    let test = port.fetch_returns(test_name)?.select(train.assets())?;

    let perf = evaluate_performance(&weights, &test)?;
    writeln!(out, "method           {}", method)?;
    writeln!(out, "expected_return  {:.6}", perf.expected_return)?;
    writeln!(out, "std_dev          {:.6}", perf.std_dev)?;
    writeln!(out, "variance         {:.6}", perf.variance)?;
    writeln!(out, "sharpe           {:.4}", perf.sharpe)?;
    Ok(())
}

pub fn run_shrink(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let shrinkage = analysis.shrinkage.ok_or_else(|| FolioError::ConfigMissing {
        section: "analysis".into(),
        key: "shrinkage".into(),
    })?;
    let train = load_universe(port, data, "train")?;
    let shrunk = shrink_covariance(&train, shrinkage)?;
    write_matrix(out, train.assets(), &shrunk)?;
    Ok(())
}

pub fn run_implied_returns(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    market_weights: &DVector<f64>,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let train = load_universe(port, data, "train")?;
    let sigma = covariance_for(&train, analysis)?;
    let pi = implied_returns(analysis.risk_aversion, &sigma, market_weights)?;
    writeln!(out, "{:<16} {:>12}", "asset", "implied")?;
    write_vector(out, train.assets(), &pi)?;
    Ok(())
}

pub fn run_stress(
    port: &dyn ReturnsPort,
    data: &DataConfig,
    analysis: &AnalysisConfig,
    target: &StressTarget,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    analysis.stress.validate()?;
    let scenarios_name = data.dataset("scenarios")?;

    let (label, report, scenarios) = match target {
        StressTarget::Market(series) => {
            let scenarios = port.fetch_returns(scenarios_name)?;
            let report = stress_test_market(&scenarios, series, &analysis.stress)?;
            (series.clone(), report, scenarios)
        }
        StressTarget::Portfolio(method) => {
            let (train, weights) = fit_weights(port, data, analysis, *method)?;
            let scenarios = port.fetch_returns(scenarios_name)?;
            let report = stress_test(&scenarios, train.assets(), &weights, &analysis.stress)?;
            (method.to_string(), report, scenarios)
        }
    };

    info!(
        "Stressed {} over {} scenarios from {}",
        label, report.scenarios, scenarios_name
    );
    write_stress_report(out, &label, &report, &scenarios, &analysis.stress)
}

fn write_stress_report(
    out: &mut dyn Write,
    label: &str,
    report: &StressReport,
    scenarios: &ReturnsTable,
    config: &StressConfig,
) -> Result<(), FolioError> {
    writeln!(out, "portfolio  {}", label)?;
    writeln!(out, "notional   {:.2}", config.notional)?;
    writeln!(out, "alpha      {} ({})", config.alpha, config.quantile)?;
    writeln!(out, "VaR        {:.2}", report.var)?;
    writeln!(out, "ES         {:.2}", report.es)?;
    writeln!(out, "worst scenarios:")?;
    for ranked in report.ranked_losses.iter().take(WORST_SCENARIOS_SHOWN) {
        let period = scenarios
            .periods()
            .get(ranked.scenario - 1)
            .map(String::as_str)
            .unwrap_or("?");
        writeln!(out, "  {:>4}  {:<12} {:>16.2}", ranked.scenario, period, ranked.loss)?;
    }
    Ok(())
}

fn run_validate(config_path: &Path, out: &mut dyn Write) -> Result<(), FolioError> {
    info!("Validating config {}", config_path.display());
    let adapter = load_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let analysis = build_analysis_config(&adapter)?;

    writeln!(out, "data dir:      {}", data.dir.display())?;
    for (key, value) in [
        ("train", &data.train),
        ("test", &data.test),
        ("scenarios", &data.scenarios),
    ] {
        writeln!(out, "{:<14} {}", format!("{key}:"), value.as_deref().unwrap_or("-"))?;
    }
    match &data.assets {
        Some(assets) => writeln!(out, "assets:        {}", assets.join(", "))?,
        None if data.exclude.is_empty() => writeln!(out, "assets:        all columns")?,
        None => writeln!(out, "assets:        all except {}", data.exclude.join(", "))?,
    }
    match analysis.shrinkage {
        Some(s) => writeln!(out, "shrinkage:     {}", s)?,
        None => writeln!(out, "shrinkage:     none (sample covariance)")?,
    }
    writeln!(out, "risk_aversion: {}", analysis.risk_aversion)?;
    writeln!(
        out,
        "stress:        alpha {} ({}), notional {}",
        analysis.stress.alpha, analysis.stress.quantile, analysis.stress.notional
    )?;
    writeln!(out, "\nConfiguration is valid.")?;
    Ok(())
}

fn run_list_datasets(port: &dyn ReturnsPort, out: &mut dyn Write) -> Result<(), FolioError> {
    let datasets = port.list_datasets()?;
    if datasets.is_empty() {
        info!("No datasets found");
    }
    for name in &datasets {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

fn write_vector(
    out: &mut dyn Write,
    assets: &[String],
    values: &DVector<f64>,
) -> Result<(), FolioError> {
    for (asset, value) in assets.iter().zip(values.iter()) {
        writeln!(out, "{:<16} {:>12.6}", asset, value)?;
    }
    Ok(())
}

fn write_matrix(
    out: &mut dyn Write,
    assets: &[String],
    matrix: &DMatrix<f64>,
) -> Result<(), FolioError> {
    write!(out, "{:<16}", "")?;
    for asset in assets {
        write!(out, " {:>14}", asset)?;
    }
    writeln!(out)?;
    for (i, asset) in assets.iter().enumerate() {
        write!(out, "{:<16}", asset)?;
        for j in 0..matrix.ncols() {
            write!(out, " {:>14.8}", matrix[(i, j)])?;
        }
        writeln!(out)?;
    }
    Ok(())
}
