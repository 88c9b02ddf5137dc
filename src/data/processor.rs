//! Data Processor Module
//! Column extraction and group aggregates over the startup records.

use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Filters, groups and reduces columns of a loaded DataFrame.
pub struct DataProcessor;

impl DataProcessor {
    /// Column values as floats; unparsable or missing cells are `None`.
    pub fn f64_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        let values = df.column(column)?.cast(&DataType::Float64)?;
        let ca = values.as_materialized_series().f64()?;
        Ok(ca.into_iter().collect())
    }

    /// Column values as strings.
    pub fn string_values(
        df: &DataFrame,
        column: &str,
    ) -> Result<Vec<Option<String>>, ProcessorError> {
        let values = df.column(column)?.cast(&DataType::String)?;
        let ca = values.as_materialized_series().str()?;
        Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    fn u64_values(df: &DataFrame, column: &str) -> Result<Vec<u64>, ProcessorError> {
        let values = df.column(column)?.cast(&DataType::UInt64)?;
        let ca = values.as_materialized_series().u64()?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
    }

    fn labelled<T>(
        labels: Vec<Option<String>>,
        values: impl IntoIterator<Item = T>,
    ) -> Vec<(String, T)> {
        labels
            .into_iter()
            .zip(values)
            .filter_map(|(label, value)| Some((label?, value)))
            .collect()
    }

    /// Number of rows per label, most frequent first (ties by label).
    pub fn value_counts(
        df: &DataFrame,
        column: &str,
        limit: usize,
    ) -> Result<Vec<(String, u64)>, ProcessorError> {
        let counts = df
            .clone()
            .lazy()
            .filter(col(column).is_not_null())
            .group_by([col(column)])
            .agg([len().alias("count")])
            .sort(
                ["count", column],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .limit(limit as IdxSize)
            .collect()?;

        let labels = Self::string_values(&counts, column)?;
        let values = Self::u64_values(&counts, "count")?;
        Ok(Self::labelled(labels, values))
    }

    /// Occurrences of each non-null value, in order of first appearance.
    pub fn counts_in_order(df: &DataFrame, column: &str) -> Result<Vec<(String, u64)>, ProcessorError> {
        let mut counts: Vec<(String, u64)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for value in Self::string_values(df, column)?.into_iter().flatten() {
            match index.get(&value) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(value.clone(), counts.len());
                    counts.push((value, 1));
                }
            }
        }
        Ok(counts)
    }

    /// Sum of `value_col` per group divided by `divisor`, largest first.
    pub fn sum_by(
        df: &DataFrame,
        group_col: &str,
        value_col: &str,
        divisor: f64,
    ) -> Result<Vec<(String, f64)>, ProcessorError> {
        let sums = df
            .clone()
            .lazy()
            .filter(col(group_col).is_not_null())
            .group_by([col(group_col)])
            .agg([col(value_col).cast(DataType::Float64).sum().alias("total")])
            .sort(
                ["total", group_col],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .collect()?;

        let labels = Self::string_values(&sums, group_col)?;
        let totals = Self::f64_values(&sums, "total")?
            .into_iter()
            .map(|v| v.unwrap_or(0.0) / divisor);
        Ok(Self::labelled(labels, totals))
    }

    /// Total funding per founding year divided by `divisor`, oldest first.
    pub fn sum_by_year(df: &DataFrame, divisor: f64) -> Result<Vec<(i64, f64)>, ProcessorError> {
        let sums = df
            .clone()
            .lazy()
            .with_column(col("founded_year").cast(DataType::Int64))
            .filter(col("founded_year").is_not_null())
            .group_by([col("founded_year")])
            .agg([col("funding_total_usd")
                .cast(DataType::Float64)
                .sum()
                .alias("total")])
            .sort(["founded_year"], SortMultipleOptions::default())
            .collect()?;

        let years = Self::f64_values(&sums, "founded_year")?;
        let totals = Self::f64_values(&sums, "total")?;
        Ok(years
            .into_iter()
            .zip(totals)
            .filter_map(|(year, total)| Some((year? as i64, total.unwrap_or(0.0) / divisor)))
            .collect())
    }

    /// Mean of each column divided by `divisor`; nulls are skipped.
    pub fn column_means(
        df: &DataFrame,
        columns: &[String],
        divisor: f64,
    ) -> Result<Vec<(String, f64)>, ProcessorError> {
        let means = df
            .clone()
            .lazy()
            .select(
                columns
                    .iter()
                    .map(|c| col(c.as_str()).cast(DataType::Float64).mean())
                    .collect::<Vec<_>>(),
            )
            .collect()?;

        columns
            .iter()
            .map(|c| {
                let mean = Self::f64_values(&means, c)?
                    .first()
                    .copied()
                    .flatten()
                    .unwrap_or(f64::NAN);
                Ok((c.clone(), mean / divisor))
            })
            .collect()
    }

    /// Number of rows whose value is not zero in each column. Missing values
    /// compare unequal to zero and are counted.
    pub fn nonzero_counts(
        df: &DataFrame,
        columns: &[&str],
    ) -> Result<Vec<(String, usize)>, ProcessorError> {
        columns
            .iter()
            .map(|c| {
                let count = Self::f64_values(df, c)?
                    .into_iter()
                    .filter(|v| *v != Some(0.0))
                    .count();
                Ok((c.to_string(), count))
            })
            .collect()
    }

    /// First `n` rows ordered by `sort_col` descending, nulls last.
    pub fn top_rows_by(df: &DataFrame, sort_col: &str, n: usize) -> Result<DataFrame, ProcessorError> {
        let top = df
            .clone()
            .lazy()
            .sort(
                [sort_col],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true),
            )
            .limit(n as IdxSize)
            .collect()?;
        Ok(top)
    }

    /// Rows with positive debt financing and total funding below a bound (in billions).
    pub fn debt_funding_pairs(
        df: &DataFrame,
        max_funding_billions: f64,
    ) -> Result<Vec<[f64; 2]>, ProcessorError> {
        let filtered = df
            .clone()
            .lazy()
            .select([
                col("funding_total_usd").cast(DataType::Float64),
                col("debt_financing").cast(DataType::Float64),
            ])
            .filter(
                col("debt_financing").gt(lit(0.0)).and(
                    (col("funding_total_usd") / lit(1e9)).lt(lit(max_funding_billions)),
                ),
            )
            .collect()?;

        let funding = Self::f64_values(&filtered, "funding_total_usd")?;
        let debt = Self::f64_values(&filtered, "debt_financing")?;
        Ok(funding
            .into_iter()
            .zip(debt)
            .filter_map(|(x, y)| Some([x?, y?]))
            .collect())
    }

    /// Seed amount per row with its founding quarter, ordered by quarter.
    pub fn seed_by_quarter(df: &DataFrame) -> Result<Vec<(String, f64)>, ProcessorError> {
        let sorted = df
            .clone()
            .lazy()
            .select([
                col("quater").cast(DataType::String),
                col("seed").cast(DataType::Float64),
            ])
            .filter(col("quater").is_not_null().and(col("seed").is_not_null()))
            .sort(["quater"], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;

        let quarters = Self::string_values(&sorted, "quater")?;
        let seeds = Self::f64_values(&sorted, "seed")?.into_iter().flatten();
        Ok(Self::labelled(quarters, seeds))
    }

    /// Number of rows with a positive seed per founding quarter, quarters ascending.
    pub fn seed_counts_by_quarter(df: &DataFrame) -> Result<Vec<(String, u64)>, ProcessorError> {
        let counts = df
            .clone()
            .lazy()
            .filter(col("quater").is_not_null())
            .group_by([col("quater").cast(DataType::String)])
            .agg([col("seed")
                .cast(DataType::Float64)
                .gt(lit(0.0))
                .cast(DataType::UInt32)
                .sum()
                .alias("seeds")])
            .sort(["quater"], SortMultipleOptions::default())
            .collect()?;

        let quarters = Self::string_values(&counts, "quater")?;
        let seeds = Self::u64_values(&counts, "seeds")?;
        Ok(Self::labelled(quarters, seeds))
    }

    /// Every column whose name marks it as a funding round, in file order.
    pub fn round_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .filter(|name| name.contains("round_"))
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::write_fixtures;
    use crate::data::DataLoader;

    fn startups() -> DataFrame {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_fixtures(dir.path());
        DataLoader::load_startups(&path).unwrap()
    }

    #[test]
    fn value_counts_most_frequent_first() {
        let df = startups();
        let counts = DataProcessor::value_counts(&df, "market", 10).unwrap();
        assert_eq!(
            counts,
            vec![
                ("Software".to_string(), 3),
                ("Biotech".to_string(), 1),
                ("Games".to_string(), 1),
            ]
        );

        let top = DataProcessor::value_counts(&df, "country", 1).unwrap();
        assert_eq!(top, vec![("USA".to_string(), 3)]);
    }

    #[test]
    fn sum_by_country_in_billions() {
        let df = startups();
        let sums = DataProcessor::sum_by(&df, "country", "funding_total_usd", 1e9).unwrap();
        assert_eq!(sums[0].0, "USA");
        assert!((sums[0].1 - 41.05).abs() < 1e-9);
        assert_eq!(sums[1].0, "GBR");
        assert!((sums[1].1 - 0.3).abs() < 1e-9);
        assert_eq!(sums.len(), 3);
    }

    #[test]
    fn sum_by_year_ascending() {
        let df = startups();
        let years = DataProcessor::sum_by_year(&df, 1e9).unwrap();
        let labels: Vec<i64> = years.iter().map(|(y, _)| *y).collect();
        assert_eq!(labels, [2007, 2010, 2012]);
        assert!((years[0].1 - 1.05).abs() < 1e-9);
        assert!((years[1].1 - 0.32).abs() < 1e-9);
    }

    #[test]
    fn round_means_in_millions() {
        let df = startups();
        let rounds = DataProcessor::round_columns(&df);
        assert_eq!(rounds, ["round_A", "round_B"]);

        let means = DataProcessor::column_means(&df, &rounds, 1e6).unwrap();
        assert!((means[0].1 - 22.0).abs() < 1e-9);
        assert!((means[1].1 - 60.0).abs() < 1e-9);
    }

    #[test]
    fn nonzero_source_counts() {
        let df = startups();
        let counts = DataProcessor::nonzero_counts(&df, &["angel", "grant", "venture"]).unwrap();
        assert_eq!(
            counts,
            vec![
                ("angel".to_string(), 2),
                ("grant".to_string(), 1),
                ("venture".to_string(), 3),
            ]
        );
    }

    #[test]
    fn nonzero_counts_include_missing_values() {
        let df = df!(
            "angel" => [Some(0.0), None, Some(5.0), Some(0.0)],
            "grant" => [Some(f64::NAN), Some(0.0), None, None],
        )
        .unwrap();
        let counts = DataProcessor::nonzero_counts(&df, &["angel", "grant"]).unwrap();
        assert_eq!(counts, vec![("angel".to_string(), 2), ("grant".to_string(), 3)]);
    }

    #[test]
    fn counts_follow_first_appearance() {
        let df = startups();
        let counts = DataProcessor::counts_in_order(&df, "status").unwrap();
        assert_eq!(
            counts,
            vec![
                ("operating".to_string(), 3),
                ("closed".to_string(), 1),
                ("acquired".to_string(), 1),
            ]
        );

        let with_nulls = df!("status" => [None, Some("b"), Some("a"), Some("b")]).unwrap();
        let counts = DataProcessor::counts_in_order(&with_nulls, "status").unwrap();
        assert_eq!(counts, vec![("b".to_string(), 2), ("a".to_string(), 1)]);
    }

    #[test]
    fn top_rows_sorted_descending() {
        let df = startups();
        let top = DataProcessor::top_rows_by(&df, "funding_total_usd", 2).unwrap();
        let names = DataProcessor::string_values(&top, "name").unwrap();
        assert_eq!(
            names,
            vec![Some("Epsilon".to_string()), Some("Alpha".to_string())]
        );
    }

    #[test]
    fn debt_pairs_respect_filters() {
        let df = startups();
        let pairs = DataProcessor::debt_funding_pairs(&df, 30.0).unwrap();
        assert_eq!(pairs, vec![[1e9, 4e8], [3e8, 1e8]]);
    }

    #[test]
    fn seed_counts_per_quarter() {
        let df = startups();
        let counts = DataProcessor::seed_counts_by_quarter(&df).unwrap();
        assert_eq!(
            counts,
            vec![
                ("Q1".to_string(), 3),
                ("Q2".to_string(), 0),
                ("Q3".to_string(), 0),
            ]
        );

        let seeds = DataProcessor::seed_by_quarter(&df).unwrap();
        let quarters: Vec<&str> = seeds.iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(quarters, ["Q1", "Q1", "Q1", "Q2", "Q3"]);
    }
}
