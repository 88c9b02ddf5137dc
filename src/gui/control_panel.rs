//! Control Panel Widget
//! Left side panel with dataset selection, reload and export controls.

use crate::config::DashboardConfig;
use egui::{Color32, RichText};
use std::path::{Path, PathBuf};

/// Left side control panel with data source and report controls.
pub struct ControlPanel {
    pub startups_path: PathBuf,
    pub markets_path: PathBuf,
    pub progress: f32,
    pub status: String,
    /// Set once a dashboard is on screen
    pub export_enabled: bool,
    pub busy: bool,
}

impl ControlPanel {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            startups_path: config.startups_csv.clone(),
            markets_path: config.markets_csv.clone(),
            progress: 0.0,
            status: "Ready".to_string(),
            export_enabled: false,
            busy: false,
        }
    }

    fn file_label(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "No file selected".to_string())
    }

    fn file_row(ui: &mut egui::Ui, caption: &str, path: &Path) -> bool {
        let mut clicked = false;
        ui.label(RichText::new(caption).size(12.0));
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let color = if path.exists() {
                        ui.visuals().text_color()
                    } else {
                        Color32::GRAY
                    };
                    ui.label(RichText::new(Self::file_label(path)).size(12.0).color(color))
                        .on_hover_text(path.display().to_string());

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            clicked = true;
                        }
                    });
                });
            });
        clicked
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🚀 Startup Explorer")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Crunchbase funding records")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        ui.label(RichText::new("📁 Data Sources").size(14.0).strong());
        ui.add_space(5.0);

        if Self::file_row(ui, "Startups", &self.startups_path) {
            action = ControlPanelAction::BrowseStartups;
        }
        ui.add_space(5.0);
        if Self::file_row(ui, "Market shares", &self.markets_path) {
            action = ControlPanelAction::BrowseMarkets;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(!self.busy, |ui| {
                let button = egui::Button::new(RichText::new("🔄 Reload").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Reload;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(self.export_enabled && !self.busy, |ui| {
                let button = egui::Button::new(RichText::new("📄 Export PPT").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportPpt;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.busy),
        );

        ui.add_space(5.0);

        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.progress >= 100.0 {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseStartups,
    BrowseMarkets,
    Reload,
    ExportPpt,
}
