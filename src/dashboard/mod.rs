//! Dashboard module - display blocks and their prose

mod builder;
mod narrative;
mod section;

pub use builder::DashboardBuilder;
pub use section::{
    BarDatum, Chart, ChartKind, ColorScale, Dashboard, HeadingLevel, Inline, Narrative,
    Orientation, Section, SectionId,
};
#[cfg(test)]
pub use section::{Heading, Paragraph};
