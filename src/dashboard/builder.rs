//! Dashboard Builder
//! Computes each display block from the loaded datasets.

use super::narrative;
use super::section::{
    BarDatum, Chart, ChartKind, ColorScale, Dashboard, Orientation, Section, SectionId,
};
use crate::config::DashboardConfig;
use crate::data::{DataProcessor, Datasets, ProcessorError};
use crate::stats::StatsCalculator;
use rayon::prelude::*;
use std::time::Instant;
use thiserror::Error;

const MILLION: f64 = 1e6;
const BILLION: f64 = 1e9;

/// Funding sources compared in the sources block.
const SOURCE_COLUMNS: [&str; 3] = ["angel", "grant", "venture"];

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to compute '{section}': {source}")]
    Section {
        section: &'static str,
        source: ProcessorError,
    },
}

/// Builds the ordered list of sections; blocks are computed in parallel.
pub struct DashboardBuilder<'a> {
    data: &'a Datasets,
    config: &'a DashboardConfig,
}

impl<'a> DashboardBuilder<'a> {
    pub fn new(data: &'a Datasets, config: &'a DashboardConfig) -> Self {
        Self { data, config }
    }

    pub fn build(&self) -> Result<Dashboard, DashboardError> {
        let started = Instant::now();
        let sections = SectionId::ALL
            .par_iter()
            .map(|&id| {
                self.build_section(id)
                    .map_err(|source| DashboardError::Section {
                        section: id.key(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            sections = sections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dashboard built"
        );
        Ok(Dashboard { sections })
    }

    /// Compute a single block with its headings and prose.
    pub fn build_section(&self, id: SectionId) -> Result<Section, ProcessorError> {
        let started = Instant::now();
        let chart = self.chart(id)?;
        tracing::debug!(
            section = id.key(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "section computed"
        );

        Ok(Section {
            id,
            headings: narrative::headings(id),
            lead: narrative::lead(id),
            chart,
            commentary: narrative::commentary(id),
        })
    }

    fn chart(&self, id: SectionId) -> Result<Option<Chart>, ProcessorError> {
        let chart = match id {
            SectionId::Intro => return Ok(None),
            SectionId::Describe => self.describe()?,
            SectionId::TopMarkets => self.top_markets()?,
            SectionId::Status => self.status()?,
            SectionId::Rounds => self.rounds()?,
            SectionId::Sources => self.sources()?,
            SectionId::TopCountries => self.top_countries()?,
            SectionId::CountryFunding => self.country_funding()?,
            SectionId::TopCompanies => self.top_companies()?,
            SectionId::Correlation => self.correlation()?,
            SectionId::DebtScatter => self.debt_scatter()?,
            SectionId::FundingByYear => self.funding_by_year()?,
            SectionId::ClosureMarkets => self.closure_markets(),
            SectionId::SeedQuarterScatter => self.seed_quarter_scatter()?,
            SectionId::SeedQuarterCounts => self.seed_quarter_counts()?,
        };
        Ok(Some(chart))
    }

    fn describe(&self) -> Result<Chart, ProcessorError> {
        let rows = StatsCalculator::describe(&self.data.startups)?;
        Ok(Chart::new("View table", ChartKind::SummaryTable { rows }))
    }

    fn pie_of_counts(&self, column: &str, limit: usize, title: String) -> Result<Chart, ProcessorError> {
        let slices = DataProcessor::value_counts(&self.data.startups, column, limit)?
            .into_iter()
            .map(|(label, count)| (label, count as f64))
            .collect();
        Ok(Chart::new(title, ChartKind::Pie { slices }))
    }

    fn top_markets(&self) -> Result<Chart, ProcessorError> {
        let n = self.config.top_markets;
        self.pie_of_counts("market", n, format!("Top {n} most popular markets"))
    }

    fn top_countries(&self) -> Result<Chart, ProcessorError> {
        let n = self.config.top_countries;
        self.pie_of_counts(
            "country",
            n,
            format!("Top {n} most popular regions for a startup"),
        )
    }

    fn status(&self) -> Result<Chart, ProcessorError> {
        let bars = DataProcessor::counts_in_order(&self.data.startups, "status")?
            .into_iter()
            .map(|(label, count)| BarDatum {
                label,
                value: count as f64,
                key: None,
            })
            .collect();
        Ok(Chart::new(
            "Startups status",
            ChartKind::Bar {
                bars,
                orientation: Orientation::Vertical,
            },
        )
        .labels("status", "count"))
    }

    fn rounds(&self) -> Result<Chart, ProcessorError> {
        let columns = DataProcessor::round_columns(&self.data.startups);
        let bars = DataProcessor::column_means(&self.data.startups, &columns, MILLION)?
            .into_iter()
            .map(|(label, value)| BarDatum {
                label,
                value,
                key: None,
            })
            .collect();
        Ok(Chart::new(
            "Investment per round",
            ChartKind::Bar {
                bars,
                orientation: Orientation::Vertical,
            },
        )
        .labels("Rounds", "Investment ($ million)"))
    }

    fn sources(&self) -> Result<Chart, ProcessorError> {
        let bars = DataProcessor::nonzero_counts(&self.data.startups, &SOURCE_COLUMNS)?
            .into_iter()
            .map(|(label, count)| BarDatum {
                label,
                value: count as f64,
                key: None,
            })
            .collect();
        Ok(Chart::new(
            "Startups investment sources",
            ChartKind::Bar {
                bars,
                orientation: Orientation::Vertical,
            },
        )
        .labels("Source", "Startups"))
    }

    fn country_funding(&self) -> Result<Chart, ProcessorError> {
        let n = self.config.top_countries;
        let bars = DataProcessor::sum_by(&self.data.startups, "country", "funding_total_usd", BILLION)?
            .into_iter()
            .take(n)
            .map(|(label, value)| BarDatum {
                label,
                value,
                key: None,
            })
            .collect();
        Ok(Chart::new(
            format!("Top {n} countries by total funding"),
            ChartKind::Bar {
                bars,
                orientation: Orientation::Horizontal,
            },
        )
        .labels("Funding ($ billions)", "Country"))
    }

    fn top_companies(&self) -> Result<Chart, ProcessorError> {
        let n = self.config.top_companies;
        let top = DataProcessor::top_rows_by(&self.data.startups, "funding_total_usd", n)?;
        let names = DataProcessor::string_values(&top, "name")?;
        let funding = DataProcessor::f64_values(&top, "funding_total_usd")?;
        let years = DataProcessor::f64_values(&top, "founded_year")?;

        let bars = names
            .into_iter()
            .zip(funding)
            .zip(years)
            .filter_map(|((name, value), year)| {
                Some(BarDatum {
                    label: name?,
                    value: value?,
                    key: year.map(|y| format!("{}", y as i64)),
                })
            })
            .collect();
        Ok(Chart::new(
            format!("Top {n} most successful companies by year"),
            ChartKind::Bar {
                bars,
                orientation: Orientation::Horizontal,
            },
        )
        .labels("Total funding", "Company"))
    }

    fn correlation(&self) -> Result<Chart, ProcessorError> {
        let matrix = StatsCalculator::correlation_matrix(&self.data.startups)?;
        tracing::debug!(
            columns = matrix.columns.len(),
            debt_vs_funding = ?matrix.get("debt_financing", "funding_total_usd"),
            "correlation matrix"
        );
        Ok(Chart::new(
            "Correlation heatmap",
            ChartKind::Heatmap {
                x_labels: matrix.columns.clone(),
                y_labels: matrix.columns,
                values: matrix.values,
                scale: ColorScale::Diverging,
            },
        ))
    }

    fn debt_scatter(&self) -> Result<Chart, ProcessorError> {
        let points = DataProcessor::debt_funding_pairs(
            &self.data.startups,
            self.config.scatter_max_funding_billions,
        )?;
        let trendline = StatsCalculator::linear_fit(&points);
        Ok(Chart::new(
            "Correlation between debt financing and startup funding",
            ChartKind::Scatter {
                points,
                categories: Vec::new(),
                trendline,
            },
        )
        .labels("funding_total_usd", "debt_financing"))
    }

    fn funding_by_year(&self) -> Result<Chart, ProcessorError> {
        let points = DataProcessor::sum_by_year(&self.data.startups, BILLION)?
            .into_iter()
            .map(|(year, total)| [year as f64, total])
            .collect();
        Ok(Chart::new("Total funding by founding year", ChartKind::Line { points })
            .labels("Year", "Funding in $ billions"))
    }

    fn closure_markets(&self) -> Chart {
        let rows: Vec<_> = self
            .data
            .markets
            .rows
            .iter()
            .take(self.config.top_closure_markets)
            .collect();
        Chart::new(
            format!("Top {} markets where startups close", rows.len()),
            ChartKind::Heatmap {
                x_labels: vec!["share".to_string()],
                y_labels: rows.iter().map(|r| r.market.clone()).collect(),
                values: rows.iter().map(|r| vec![r.share]).collect(),
                scale: ColorScale::Sequential,
            },
        )
        .labels("Market share", "")
    }

    fn seed_quarter_scatter(&self) -> Result<Chart, ProcessorError> {
        let seeds = DataProcessor::seed_by_quarter(&self.data.startups)?;

        let mut categories: Vec<String> = Vec::new();
        let points = seeds
            .into_iter()
            .map(|(quarter, seed)| {
                // rows arrive sorted by quarter
                if categories.last() != Some(&quarter) {
                    categories.push(quarter);
                }
                [(categories.len() - 1) as f64, seed]
            })
            .collect();

        Ok(Chart::new(
            "Seed values for various quarters",
            ChartKind::Scatter {
                points,
                categories,
                trendline: None,
            },
        )
        .labels("Quarter the startup was founded at", "Seed capital"))
    }

    fn seed_quarter_counts(&self) -> Result<Chart, ProcessorError> {
        let bars = DataProcessor::seed_counts_by_quarter(&self.data.startups)?
            .into_iter()
            .map(|(label, count)| BarDatum {
                label,
                value: count as f64,
                key: None,
            })
            .collect();
        Ok(Chart::new(
            "Quarter x Seed Number plot",
            ChartKind::Bar {
                bars,
                orientation: Orientation::Vertical,
            },
        )
        .labels("Quarter the startup was founded at", "Seeds raised"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::write_fixtures;
    use crate::data::DataLoader;

    fn dashboard() -> Dashboard {
        let dir = tempfile::tempdir().unwrap();
        let (startups, markets) = write_fixtures(dir.path());
        let config = DashboardConfig::default().with_data_paths(Some(startups), Some(markets));
        let data = DataLoader::load_all(&config).unwrap();
        DashboardBuilder::new(&data, &config).build().unwrap()
    }

    fn chart(dashboard: &Dashboard, id: SectionId) -> ChartKind {
        dashboard
            .section(id)
            .and_then(|s| s.chart.clone())
            .map(|c| c.kind)
            .unwrap()
    }

    #[test]
    fn sections_follow_page_order() {
        let dashboard = dashboard();
        let ids: Vec<SectionId> = dashboard.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, SectionId::ALL);
        assert!(dashboard.section(SectionId::Intro).unwrap().chart.is_none());
    }

    #[test]
    fn status_counts() {
        let ChartKind::Bar { bars, .. } = chart(&dashboard(), SectionId::Status) else {
            panic!("status is a bar chart");
        };
        let pairs: Vec<(&str, f64)> = bars.iter().map(|b| (b.label.as_str(), b.value)).collect();
        assert_eq!(pairs, [("operating", 3.0), ("closed", 1.0), ("acquired", 1.0)]);
    }

    #[test]
    fn country_funding_largest_first() {
        let ChartKind::Bar { bars, orientation } = chart(&dashboard(), SectionId::CountryFunding)
        else {
            panic!("country funding is a bar chart");
        };
        assert_eq!(orientation, Orientation::Horizontal);
        assert_eq!(bars[0].label, "USA");
        assert!((bars[0].value - 41.05).abs() < 1e-9);
    }

    #[test]
    fn top_companies_keyed_by_year() {
        let ChartKind::Bar { bars, .. } = chart(&dashboard(), SectionId::TopCompanies) else {
            panic!("top companies is a bar chart");
        };
        assert_eq!(bars.len(), 5);
        assert_eq!(bars[0].label, "Epsilon");
        assert_eq!(bars[0].key.as_deref(), Some("2012"));
    }

    #[test]
    fn debt_scatter_has_trendline() {
        let ChartKind::Scatter {
            points, trendline, ..
        } = chart(&dashboard(), SectionId::DebtScatter)
        else {
            panic!("debt is a scatter");
        };
        assert_eq!(points.len(), 2);
        let fit = trendline.unwrap();
        assert!((fit.predict(1e9) - 4e8).abs() < 1.0);
    }

    #[test]
    fn seed_scatter_uses_quarter_positions() {
        let ChartKind::Scatter {
            points, categories, ..
        } = chart(&dashboard(), SectionId::SeedQuarterScatter)
        else {
            panic!("seed is a scatter");
        };
        assert_eq!(categories, ["Q1", "Q2", "Q3"]);
        let xs: Vec<f64> = points.iter().map(|p| p[0]).collect();
        assert_eq!(xs, [0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn closure_heatmap_is_single_column() {
        let ChartKind::Heatmap {
            x_labels,
            y_labels,
            values,
            scale,
        } = chart(&dashboard(), SectionId::ClosureMarkets)
        else {
            panic!("closure is a heatmap");
        };
        assert_eq!(x_labels, ["share"]);
        assert_eq!(y_labels, ["Software", "Biotech", "Games"]);
        assert_eq!(values[0], [12.5]);
        assert_eq!(scale, ColorScale::Sequential);

        let closure = dashboard()
            .section(SectionId::ClosureMarkets)
            .and_then(|s| s.chart.clone())
            .unwrap();
        assert_eq!(closure.x_label, "Market share");
        assert_eq!(closure.y_label, "");
    }

    #[test]
    fn correlation_covers_numeric_columns() {
        let ChartKind::Heatmap {
            x_labels, values, ..
        } = chart(&dashboard(), SectionId::Correlation)
        else {
            panic!("correlation is a heatmap");
        };
        assert!(x_labels.contains(&"debt_financing".to_string()));
        assert_eq!(values.len(), x_labels.len());
    }

    #[test]
    fn describe_table_present() {
        let ChartKind::SummaryTable { rows } = chart(&dashboard(), SectionId::Describe) else {
            panic!("describe is a table");
        };
        let funding = rows
            .iter()
            .find(|r| r.column == "funding_total_usd")
            .unwrap();
        assert_eq!(funding.count, 5);
    }
}
