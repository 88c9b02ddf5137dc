//! Section Viewer Widget
//! Central scrollable page drawing every dashboard section in order.

use crate::charts::ChartPlotter;
use crate::dashboard::{ChartKind, Dashboard, HeadingLevel, Inline, Narrative, Section};
use egui::{RichText, ScrollArea};

const SECTION_SPACING: f32 = 18.0;
const MAX_CONTENT_WIDTH: f32 = 1000.0;

fn heading_size(level: HeadingLevel) -> f32 {
    match level {
        HeadingLevel::PageTitle => 28.0,
        HeadingLevel::Title => 22.0,
        HeadingLevel::Subheader => 18.0,
        HeadingLevel::Question => 15.0,
    }
}

/// Scrollable page of dashboard sections.
#[derive(Default)]
pub struct SectionViewer {
    pub dashboard: Option<Dashboard>,
}

impl SectionViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dashboard(&mut self, dashboard: Dashboard) {
        self.dashboard = Some(dashboard);
    }

    pub fn clear(&mut self) {
        self.dashboard = None;
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(dashboard) = &self.dashboard else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let width = ui.available_width().min(MAX_CONTENT_WIDTH);
                for section in &dashboard.sections {
                    ui.vertical(|ui| {
                        ui.set_max_width(width);
                        Self::draw_section(ui, section);
                    });
                    ui.add_space(SECTION_SPACING);
                }
            });
    }

    fn draw_section(ui: &mut egui::Ui, section: &Section) {
        for heading in &section.headings {
            let text = RichText::new(&heading.text).size(heading_size(heading.level));
            let text = if heading.level == HeadingLevel::Question {
                text.italics()
            } else {
                text.strong()
            };
            ui.label(text);
            ui.add_space(4.0);
        }

        Self::draw_narrative(ui, &section.lead);

        if let Some(chart) = &section.chart {
            let id = section.id.key();
            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(8.0)
                .inner_margin(12.0)
                .show(ui, |ui| match &chart.kind {
                    ChartKind::SummaryTable { rows } => {
                        egui::CollapsingHeader::new(chart.title.as_str())
                            .default_open(false)
                            .show(ui, |ui| ChartPlotter::draw_summary_table(ui, rows, id));
                    }
                    _ => ChartPlotter::draw_chart(ui, chart, id),
                });
            ui.add_space(6.0);
        }

        Self::draw_narrative(ui, &section.commentary);
    }

    /// Paragraphs of mixed plain, bold, italic and linked text.
    fn draw_narrative(ui: &mut egui::Ui, narrative: &Narrative) {
        for paragraph in &narrative.paragraphs {
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing.x = 0.0;
                for inline in &paragraph.0 {
                    match inline {
                        Inline::Text(t) => {
                            ui.label(t.as_str());
                        }
                        Inline::Strong(t) => {
                            ui.label(RichText::new(t).strong());
                        }
                        Inline::Emphasis(t) => {
                            ui.label(RichText::new(t).italics());
                        }
                        Inline::Link { label, url } => {
                            ui.hyperlink_to(label.as_str(), url);
                        }
                    }
                }
            });
            ui.add_space(4.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_shrink_by_level() {
        assert!(heading_size(HeadingLevel::PageTitle) > heading_size(HeadingLevel::Title));
        assert!(heading_size(HeadingLevel::Title) > heading_size(HeadingLevel::Subheader));
        assert!(heading_size(HeadingLevel::Subheader) > heading_size(HeadingLevel::Question));
    }

    #[test]
    fn clear_drops_dashboard() {
        let mut viewer = SectionViewer::new();
        viewer.set_dashboard(Dashboard::default());
        assert!(viewer.dashboard.is_some());
        viewer.clear();
        assert!(viewer.dashboard.is_none());
    }
}
