//! Statistics Calculator Module
//! Descriptive statistics, Pearson correlation and least-squares fits.

use crate::data::{DataLoader, DataProcessor, ProcessorError};
use polars::prelude::*;
use rayon::prelude::*;
use statrs::statistics::Statistics;

/// Summary of one numeric column, as shown in the "describe" table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn empty(column: &str) -> Self {
        Self {
            column: column.to_string(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            p50: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Pairwise Pearson correlations between numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `values[i][j]` correlates `columns[i]` with `columns[j]`
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarize a column of values; NaN entries are ignored.
    pub fn summarize(column: &str, values: &[f64]) -> ColumnSummary {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return ColumnSummary::empty(column);
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        ColumnSummary {
            column: column.to_string(),
            count: sorted.len(),
            mean: sorted.iter().mean(),
            std: sorted.iter().std_dev(),
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            p50: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[sorted.len() - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Describe every numeric column of a DataFrame, in file order.
    pub fn describe(df: &DataFrame) -> Result<Vec<ColumnSummary>, ProcessorError> {
        DataLoader::get_numeric_columns(df)
            .par_iter()
            .map(|column| {
                let values: Vec<f64> = DataProcessor::f64_values(df, column)?
                    .into_iter()
                    .flatten()
                    .collect();
                Ok(Self::summarize(column, &values))
            })
            .collect()
    }

    /// Pearson correlation over pairs where both values are present.
    pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
        let (x, y): (Vec<f64>, Vec<f64>) = xs
            .iter()
            .zip(ys)
            .filter_map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => Some((*x, *y)),
                _ => None,
            })
            .unzip();

        if x.len() < 2 {
            return f64::NAN;
        }

        let sx = x.iter().std_dev();
        let sy = y.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }

        let r = x.iter().covariance(y.iter()) / (sx * sy);
        r.clamp(-1.0, 1.0)
    }

    /// Correlation matrix over the numeric columns, one row per thread.
    pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix, ProcessorError> {
        let columns = DataLoader::get_numeric_columns(df);
        let series = columns
            .iter()
            .map(|c| DataProcessor::f64_values(df, c))
            .collect::<Result<Vec<_>, _>>()?;

        let values = (0..columns.len())
            .into_par_iter()
            .map(|i| {
                (0..columns.len())
                    .map(|j| Self::pearson(&series[i], &series[j]))
                    .collect()
            })
            .collect();

        Ok(CorrelationMatrix { columns, values })
    }

    /// Least-squares line through the points.
    pub fn linear_fit(points: &[[f64; 2]]) -> Option<LinearFit> {
        if points.len() < 2 {
            return None;
        }

        let xs: Vec<f64> = points.iter().map(|p| p[0]).collect();
        let ys: Vec<f64> = points.iter().map(|p| p[1]).collect();

        let var_x = xs.iter().variance();
        if var_x == 0.0 || var_x.is_nan() {
            return None;
        }

        let slope = xs.iter().covariance(ys.iter()) / var_x;
        let intercept = ys.iter().mean() - slope * xs.iter().mean();

        let xs_opt: Vec<Option<f64>> = xs.iter().copied().map(Some).collect();
        let ys_opt: Vec<Option<f64>> = ys.iter().copied().map(Some).collect();
        let r = Self::pearson(&xs_opt, &ys_opt);
        let r_squared = if r.is_nan() { 1.0 } else { r * r };

        Some(LinearFit {
            slope,
            intercept,
            r_squared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarize_matches_hand_computation() {
        let s = StatsCalculator::summarize("x", &[4.0, 1.0, 3.0, 2.0, f64::NAN]);
        assert_eq!(s.count, 4);
        assert!(close(s.mean, 2.5));
        assert!(close(s.std, (5.0f64 / 3.0).sqrt()));
        assert!(close(s.min, 1.0));
        assert!(close(s.p25, 1.75));
        assert!(close(s.p50, 2.5));
        assert!(close(s.p75, 3.25));
        assert!(close(s.max, 4.0));
    }

    #[test]
    fn summarize_empty_column() {
        let s = StatsCalculator::summarize("x", &[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan());
        assert!(s.max.is_nan());
    }

    #[test]
    fn single_value_has_undefined_std() {
        let s = StatsCalculator::summarize("x", &[7.0]);
        assert_eq!(s.count, 1);
        assert!(close(s.p75, 7.0));
        assert!(s.std.is_nan());
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let x: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0].into_iter().map(Some).collect();
        let up: Vec<Option<f64>> = [2.0, 4.0, 6.0, 8.0].into_iter().map(Some).collect();
        let down: Vec<Option<f64>> = [8.0, 6.0, 4.0, 2.0].into_iter().map(Some).collect();

        assert!(close(StatsCalculator::pearson(&x, &up), 1.0));
        assert!(close(StatsCalculator::pearson(&x, &down), -1.0));
    }

    #[test]
    fn pearson_skips_incomplete_pairs() {
        let x = vec![Some(1.0), Some(2.0), None, Some(3.0)];
        let y = vec![Some(10.0), Some(20.0), Some(-500.0), Some(30.0)];
        assert!(close(StatsCalculator::pearson(&x, &y), 1.0));
    }

    #[test]
    fn pearson_constant_is_nan() {
        let x = vec![Some(1.0), Some(2.0), Some(3.0)];
        let y = vec![Some(5.0), Some(5.0), Some(5.0)];
        assert!(StatsCalculator::pearson(&x, &y).is_nan());
        assert!(StatsCalculator::pearson(&x[..1], &y[..1]).is_nan());
    }

    #[test]
    fn linear_fit_recovers_line() {
        let points: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 3.0 * i as f64 - 2.0]).collect();
        let fit = StatsCalculator::linear_fit(&points).unwrap();
        assert!(close(fit.slope, 3.0));
        assert!(close(fit.intercept, -2.0));
        assert!(close(fit.r_squared, 1.0));
        assert!(close(fit.predict(20.0), 58.0));
    }

    #[test]
    fn linear_fit_degenerate() {
        assert!(StatsCalculator::linear_fit(&[[1.0, 2.0]]).is_none());
        assert!(StatsCalculator::linear_fit(&[[1.0, 2.0], [1.0, 3.0]]).is_none());
    }

    #[test]
    fn correlation_matrix_is_symmetric() {
        let df = df!(
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [2.0, 1.0, 4.0, 3.0],
            "label" => ["w", "x", "y", "z"],
        )
        .unwrap();

        let matrix = StatsCalculator::correlation_matrix(&df).unwrap();
        assert_eq!(matrix.columns, ["a", "b"]);
        assert!(close(matrix.get("a", "a").unwrap(), 1.0));
        assert!(close(matrix.get("a", "b").unwrap(), 0.6));
        assert!(close(matrix.get("a", "b").unwrap(), matrix.get("b", "a").unwrap()));
        assert!(matrix.get("a", "label").is_none());
    }

    #[test]
    fn describe_covers_numeric_columns() {
        let df = df!(
            "a" => [1.0, 2.0, 3.0],
            "label" => ["x", "y", "z"],
            "b" => [10i64, 20, 30],
        )
        .unwrap();

        let summary = StatsCalculator::describe(&df).unwrap();
        let names: Vec<&str> = summary.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(close(summary[1].mean, 20.0));
        assert!(close(summary[1].std, 10.0));
    }
}
