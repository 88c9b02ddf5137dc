//! CSV Data Loader Module
//! Loads the startup records and the market-closure table using Polars.

use crate::config::DashboardConfig;
use crate::data::DataProcessor;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns every startup record file must carry.
pub const REQUIRED_STARTUP_COLUMNS: [&str; 11] = [
    "name",
    "market",
    "status",
    "country",
    "funding_total_usd",
    "founded_year",
    "quater",
    "seed",
    "venture",
    "angel",
    "grant",
];

/// Extra column the debt scatter reads.
pub const DEBT_COLUMN: &str = "debt_financing";

/// Closure-share column of the market table.
pub const SHARE_COLUMN: &str = "share";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Column '{column}' missing from {}", .file.display())]
    MissingColumn { file: PathBuf, column: String },
    #[error("No rows in {}", .0.display())]
    Empty(PathBuf),
    #[error("Failed to read column: {0}")]
    Processor(#[from] crate::data::ProcessorError),
}

/// One row of the market-closure table.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketShare {
    pub market: String,
    pub share: f64,
}

/// Markets ordered as in the file (descending closure share).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketTable {
    pub rows: Vec<MarketShare>,
}

/// Both datasets, read-only after load.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub startups: DataFrame,
    pub markets: MarketTable,
}

/// Handles CSV file loading with Polars for high performance.
pub struct DataLoader;

impl DataLoader {
    /// Read a CSV file eagerly through the lazy reader.
    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::Empty(path.to_path_buf()));
        }
        Ok(df)
    }

    /// Whether a header is the unnamed index pandas writes first.
    fn is_index_header(name: &str) -> bool {
        name.is_empty() || name == "column_1" || name.starts_with("Unnamed")
    }

    fn require_columns(df: &DataFrame, path: &Path, columns: &[&str]) -> Result<(), LoaderError> {
        let present = Self::get_columns(df);
        for column in columns {
            if !present.iter().any(|c| c == column) {
                return Err(LoaderError::MissingColumn {
                    file: path.to_path_buf(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Load startup records, dropping the leading index column.
    pub fn load_startups(path: &Path) -> Result<DataFrame, LoaderError> {
        let mut df = Self::read_csv(path)?;

        let first = df
            .get_column_names()
            .first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        if Self::is_index_header(&first) {
            df = df.drop(&first)?;
        }

        Self::require_columns(&df, path, &REQUIRED_STARTUP_COLUMNS)?;
        Self::require_columns(&df, path, &[DEBT_COLUMN])?;

        tracing::info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded startup records"
        );
        Ok(df)
    }

    /// Load the market-closure table. The first column holds the market label.
    pub fn load_markets(path: &Path) -> Result<MarketTable, LoaderError> {
        let df = Self::read_csv(path)?;
        Self::require_columns(&df, path, &[SHARE_COLUMN])?;

        let label_col = df
            .get_column_names()
            .first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        let labels = DataProcessor::string_values(&df, &label_col)?;
        let shares = DataProcessor::f64_values(&df, SHARE_COLUMN)?;

        // rows are kept by position; missing cells become "" and NaN
        let rows: Vec<MarketShare> = labels
            .into_iter()
            .zip(shares)
            .map(|(market, share)| MarketShare {
                market: market.unwrap_or_default(),
                share: share.unwrap_or(f64::NAN),
            })
            .collect();

        tracing::info!(path = %path.display(), markets = rows.len(), "loaded market table");
        Ok(MarketTable { rows })
    }

    /// Load both files named by the configuration.
    pub fn load_all(config: &DashboardConfig) -> Result<Datasets, LoaderError> {
        let startups = Self::load_startups(&config.startups_csv)?;
        let markets = Self::load_markets(&config.markets_csv)?;
        Ok(Datasets { startups, markets })
    }

    /// Get list of column names from a DataFrame.
    pub fn get_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Get list of numeric column names in file order.
    pub fn get_numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    /// Small startup file in the layout pandas writes (unnamed index first).
    pub(crate) const STARTUPS_CSV: &str = "\
,name,market,status,country,funding_total_usd,founded_year,quater,seed,venture,angel,grant,debt_financing,round_A,round_B
0,Alpha,Software,operating,USA,1000000000,2007,Q1,100000,500000000,0,0,400000000,100000000,200000000
1,Beta,Software,closed,USA,50000000,2007,Q2,0,40000000,1000000,0,0,10000000,0
2,Gamma,Biotech,operating,GBR,300000000,2010,Q1,200000,200000000,0,5000000,100000000,0,100000000
3,Delta,Games,acquired,DEU,20000000,2010,Q3,0,0,2000000,0,0,0,0
4,Epsilon,Software,operating,USA,40000000000,2012,Q1,50000,0,0,0,35000000000,0,0
";

    pub(crate) const MARKETS_CSV: &str = "\
,share
Software,12.5
Biotech,8.0
Games,4.25
";

    pub(crate) fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let startups = dir.join("cleaned_data.csv");
        let markets = dir.join("markets.csv");
        fs::write(&startups, STARTUPS_CSV).unwrap();
        fs::write(&markets, MARKETS_CSV).unwrap();
        (startups, markets)
    }

    #[test]
    fn startups_drop_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let (startups, _) = write_fixtures(dir.path());

        let df = DataLoader::load_startups(&startups).unwrap();
        let columns = DataLoader::get_columns(&df);
        assert_eq!(df.height(), 5);
        assert_eq!(columns.first().map(String::as_str), Some("name"));
        assert!(!columns.iter().any(|c| DataLoader::is_index_header(c)));
    }

    #[test]
    fn numeric_columns_exclude_labels() {
        let dir = tempfile::tempdir().unwrap();
        let (startups, _) = write_fixtures(dir.path());

        let df = DataLoader::load_startups(&startups).unwrap();
        let numeric = DataLoader::get_numeric_columns(&df);
        assert!(numeric.contains(&"funding_total_usd".to_string()));
        assert!(numeric.contains(&"round_B".to_string()));
        assert!(!numeric.contains(&"market".to_string()));
        assert!(!numeric.contains(&"quater".to_string()));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(&path, "name,market\nAlpha,Software\n").unwrap();

        match DataLoader::load_startups(&path) {
            Err(LoaderError::MissingColumn { column, .. }) => assert_eq!(column, "status"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DataLoader::load_startups(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn markets_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let (_, markets) = write_fixtures(dir.path());

        let table = DataLoader::load_markets(&markets).unwrap();
        let names: Vec<&str> = table.rows.iter().map(|r| r.market.as_str()).collect();
        assert_eq!(names, ["Software", "Biotech", "Games"]);
        assert_eq!(table.rows[2].share, 4.25);
    }

    #[test]
    fn markets_keep_rows_with_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.csv");
        fs::write(&path, ",share\nSoftware,12.5\nBiotech,\n,3.0\nGames,4.25\n").unwrap();

        let table = DataLoader::load_markets(&path).unwrap();
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[1].market, "Biotech");
        assert!(table.rows[1].share.is_nan());
        assert_eq!(table.rows[2].market, "");
        assert_eq!(table.rows[2].share, 3.0);
        assert_eq!(table.rows[3].market, "Games");
    }

    #[test]
    fn markets_require_share() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.csv");
        fs::write(&path, ",count\nSoftware,3\n").unwrap();

        assert!(matches!(
            DataLoader::load_markets(&path),
            Err(LoaderError::MissingColumn { .. })
        ));
    }
}
