//! Section Model
//! Chart descriptions and narrative shared by the window and the exporter.

use crate::stats::{ColumnSummary, LinearFit};

/// Identifies one display block. `ALL` is the page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Intro,
    Describe,
    TopMarkets,
    Status,
    Rounds,
    Sources,
    TopCountries,
    CountryFunding,
    TopCompanies,
    Correlation,
    DebtScatter,
    FundingByYear,
    ClosureMarkets,
    SeedQuarterScatter,
    SeedQuarterCounts,
}

impl SectionId {
    pub const ALL: [SectionId; 15] = [
        SectionId::Intro,
        SectionId::Describe,
        SectionId::TopMarkets,
        SectionId::Status,
        SectionId::Rounds,
        SectionId::Sources,
        SectionId::TopCountries,
        SectionId::CountryFunding,
        SectionId::TopCompanies,
        SectionId::Correlation,
        SectionId::DebtScatter,
        SectionId::FundingByYear,
        SectionId::ClosureMarkets,
        SectionId::SeedQuarterScatter,
        SectionId::SeedQuarterCounts,
    ];

    /// Stable key used for widget ids and exported file names.
    pub fn key(self) -> &'static str {
        match self {
            SectionId::Intro => "intro",
            SectionId::Describe => "describe",
            SectionId::TopMarkets => "top_markets",
            SectionId::Status => "status",
            SectionId::Rounds => "rounds",
            SectionId::Sources => "sources",
            SectionId::TopCountries => "top_countries",
            SectionId::CountryFunding => "country_funding",
            SectionId::TopCompanies => "top_companies",
            SectionId::Correlation => "correlation",
            SectionId::DebtScatter => "debt_scatter",
            SectionId::FundingByYear => "funding_by_year",
            SectionId::ClosureMarkets => "closure_markets",
            SectionId::SeedQuarterScatter => "seed_quarter_scatter",
            SectionId::SeedQuarterCounts => "seed_quarter_counts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    PageTitle,
    Title,
    Subheader,
    Question,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
    Link { label: String, url: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph(pub Vec<Inline>);

impl Paragraph {
    pub fn text(mut self, text: &str) -> Self {
        self.0.push(Inline::Text(text.to_string()));
        self
    }

    pub fn strong(mut self, text: &str) -> Self {
        self.0.push(Inline::Strong(text.to_string()));
        self
    }

    pub fn emphasis(mut self, text: &str) -> Self {
        self.0.push(Inline::Emphasis(text.to_string()));
        self
    }

    pub fn link(mut self, label: &str, url: &str) -> Self {
        self.0.push(Inline::Link {
            label: label.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(|inline| match inline {
                Inline::Text(t) | Inline::Strong(t) | Inline::Emphasis(t) => t.as_str(),
                Inline::Link { label, .. } => label.as_str(),
            })
            .collect()
    }
}

/// Prose shown around a chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Narrative {
    pub paragraphs: Vec<Paragraph>,
}

impl Narrative {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    /// -1..1, blue through white to red
    Diverging,
    /// min..max of the data, dark to yellow
    Sequential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub label: String,
    pub value: f64,
    /// Bars sharing a key share a color and a legend entry
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    Pie {
        slices: Vec<(String, f64)>,
    },
    Bar {
        bars: Vec<BarDatum>,
        orientation: Orientation,
    },
    Line {
        points: Vec<[f64; 2]>,
    },
    Scatter {
        points: Vec<[f64; 2]>,
        /// Names for integer x positions; empty for a numeric x axis
        categories: Vec<String>,
        trendline: Option<LinearFit>,
    },
    Heatmap {
        x_labels: Vec<String>,
        y_labels: Vec<String>,
        /// One row per y label
        values: Vec<Vec<f64>>,
        scale: ColorScale,
    },
    SummaryTable {
        rows: Vec<ColumnSummary>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
}

impl Chart {
    pub fn new(title: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            kind,
        }
    }

    pub fn labels(mut self, x: &str, y: &str) -> Self {
        self.x_label = x.to_string();
        self.y_label = y.to_string();
        self
    }

    /// Whether the chart has a static image rendition.
    pub fn is_renderable(&self) -> bool {
        !matches!(self.kind, ChartKind::SummaryTable { .. })
    }
}

/// One self-contained display block.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: SectionId,
    pub headings: Vec<Heading>,
    /// Shown before the chart
    pub lead: Narrative,
    pub chart: Option<Chart>,
    /// Shown after the chart
    pub commentary: Narrative,
}

impl Section {
    /// Title used for exported slides.
    pub fn display_title(&self) -> String {
        self.chart
            .as_ref()
            .filter(|c| c.is_renderable())
            .map(|c| c.title.clone())
            .or_else(|| self.headings.first().map(|h| h.text.clone()))
            .unwrap_or_else(|| self.id.key().to_string())
    }
}

/// Every section, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub sections: Vec<Section>,
}

impl Dashboard {
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_flattens_inlines() {
        let para = Paragraph::default()
            .text("Go to the ")
            .strong("US")
            .text(", see ")
            .link("this", "https://example.com");
        assert_eq!(para.plain_text(), "Go to the US, see this");
    }

    #[test]
    fn section_keys_are_unique() {
        let mut keys: Vec<&str> = SectionId::ALL.iter().map(|id| id.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SectionId::ALL.len());
    }

    #[test]
    fn table_sections_are_titled_by_heading() {
        let mut section = Section {
            id: SectionId::Describe,
            headings: vec![Heading {
                level: HeadingLevel::Title,
                text: "Some statistics per feature".to_string(),
            }],
            lead: Narrative::default(),
            chart: Some(Chart::new(
                "View table",
                ChartKind::SummaryTable { rows: Vec::new() },
            )),
            commentary: Narrative::default(),
        };
        assert_eq!(section.display_title(), "Some statistics per feature");

        section.chart = Some(Chart::new("Status", ChartKind::Line { points: Vec::new() }));
        assert_eq!(section.display_title(), "Status");

        section.chart = None;
        section.headings.clear();
        assert_eq!(section.display_title(), "describe");
    }
}
