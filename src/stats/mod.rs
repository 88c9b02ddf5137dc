//! Stats module - descriptive statistics and correlation

mod calculator;

pub use calculator::{ColumnSummary, LinearFit, StatsCalculator};
