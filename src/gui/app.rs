//! Startup Explorer Main Application
//! Main window with control panel and the dashboard page.

use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, DashboardBuilder};
use crate::data::DataLoader;
use crate::gui::{ControlPanel, ControlPanelAction, SectionViewer};
use crate::ppt::PptGenerator;
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

/// Loading result from background thread
enum LoadResult {
    Progress(f32, String),
    Complete(Dashboard),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    control_panel: ControlPanel,
    section_viewer: SectionViewer,

    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
    /// Paths changed while a load was running
    reload_pending: bool,
}

impl DashboardApp {
    /// Create the window state and start loading the configured datasets.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut app = Self::with_config(config);
        app.start_loading();
        app
    }

    fn with_config(config: DashboardConfig) -> Self {
        Self {
            control_panel: ControlPanel::new(&config),
            config,
            section_viewer: SectionViewer::new(),
            load_rx: None,
            is_loading: false,
            reload_pending: false,
        }
    }

    fn pick_csv(current: &std::path::Path) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().add_filter("CSV Files", &["csv"]);
        if let Some(dir) = current.parent().filter(|d| d.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }

    fn handle_browse_startups(&mut self) {
        if let Some(path) = Self::pick_csv(&self.control_panel.startups_path) {
            self.control_panel.startups_path = path;
            self.start_loading();
        }
    }

    fn handle_browse_markets(&mut self) {
        if let Some(path) = Self::pick_csv(&self.control_panel.markets_path) {
            self.control_panel.markets_path = path;
            self.start_loading();
        }
    }

    /// Load both files and build the dashboard in a background thread
    fn start_loading(&mut self) {
        if self.is_loading {
            // picked up when the running load finishes
            self.reload_pending = true;
            return;
        }
        self.reload_pending = false;

        self.config.startups_csv = self.control_panel.startups_path.clone();
        self.config.markets_csv = self.control_panel.markets_path.clone();

        self.section_viewer.clear();
        self.control_panel.export_enabled = false;
        self.control_panel.busy = true;
        self.control_panel.set_progress(0.0, "Loading CSV files...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        let config = self.config.clone();

        thread::spawn(move || Self::run_loading(tx, config));
    }

    /// Runs on the background thread
    fn run_loading(tx: Sender<LoadResult>, config: DashboardConfig) {
        let _ = tx.send(LoadResult::Progress(10.0, "Reading CSV files...".to_string()));

        let data = match DataLoader::load_all(&config) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "loading failed");
                let _ = tx.send(LoadResult::Error(e.to_string()));
                return;
            }
        };

        let _ = tx.send(LoadResult::Progress(
            50.0,
            format!("Loaded {} startups, building sections...", data.startups.height()),
        ));

        match DashboardBuilder::new(&data, &config).build() {
            Ok(dashboard) => {
                let _ = tx.send(LoadResult::Complete(dashboard));
            }
            Err(e) => {
                tracing::error!(error = %e, "dashboard build failed");
                let _ = tx.send(LoadResult::Error(e.to_string()));
            }
        }
    }

    /// Check for loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };
        let mut should_keep_receiver = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                LoadResult::Progress(progress, status) => {
                    self.control_panel.set_progress(progress, &status);
                }
                LoadResult::Complete(dashboard) => {
                    let count = dashboard.sections.len();
                    self.section_viewer.set_dashboard(dashboard);
                    self.control_panel
                        .set_progress(100.0, &format!("Complete! {} sections ready", count));
                    self.control_panel.export_enabled = true;
                    should_keep_receiver = false;
                }
                LoadResult::Error(error) => {
                    self.control_panel
                        .set_progress(0.0, &format!("Error: {}", error));
                    should_keep_receiver = false;
                }
            }
        }

        if should_keep_receiver {
            self.load_rx = Some(rx);
        } else {
            self.is_loading = false;
            self.control_panel.busy = false;
            if self.reload_pending {
                tracing::debug!("data paths changed during load, reloading");
                self.start_loading();
            }
        }
    }

    /// Render every section to PNG and write the deck
    fn handle_export_ppt(&mut self) {
        let Some(dashboard) = &self.section_viewer.dashboard else {
            self.control_panel.set_progress(0.0, "No dashboard to export");
            return;
        };

        let Some(output_path) = rfd::FileDialog::new()
            .add_filter("PowerPoint", &["pptx"])
            .set_file_name("startup_report.pptx")
            .save_file()
        else {
            return;
        };

        self.control_panel.set_progress(10.0, "Rendering charts...");

        match PptGenerator::export_dashboard(
            dashboard,
            &output_path,
            self.config.export_width,
            self.config.export_height,
        ) {
            Ok(slides) => {
                self.control_panel
                    .set_progress(100.0, &format!("PPT exported: {} slides", slides));
                if let Err(e) = open::that(&output_path) {
                    tracing::warn!(error = %e, path = %output_path.display(), "could not open report");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading {
            ctx.request_repaint();
        }

        SidePanel::left("control_panel")
            .min_width(260.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseStartups => self.handle_browse_startups(),
                        ControlPanelAction::BrowseMarkets => self.handle_browse_markets(),
                        ControlPanelAction::Reload => self.start_loading(),
                        ControlPanelAction::ExportPpt => self.handle_export_ppt(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.section_viewer.show(ui);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_change_during_load_reloads_afterwards() {
        let mut app = DashboardApp::with_config(DashboardConfig::default());
        let (tx, rx) = channel();
        app.load_rx = Some(rx);
        app.is_loading = true;

        let new_path = PathBuf::from("/new/startups.csv");
        app.control_panel.startups_path = new_path.clone();
        app.start_loading();
        assert!(app.reload_pending);
        assert_eq!(app.config.startups_csv, PathBuf::from("cleaned_data.csv"));

        tx.send(LoadResult::Error("stale load failed".to_string()))
            .unwrap();
        app.check_load_results();

        assert_eq!(app.config.startups_csv, new_path);
        assert!(app.is_loading);
        assert!(!app.reload_pending);
        assert!(app.control_panel.busy);
    }

    #[test]
    fn idle_reload_starts_immediately() {
        let mut app = DashboardApp::with_config(DashboardConfig::default());
        app.control_panel.markets_path = PathBuf::from("/new/markets.csv");
        app.start_loading();

        assert!(app.is_loading);
        assert!(!app.reload_pending);
        assert_eq!(app.config.markets_csv, PathBuf::from("/new/markets.csv"));
    }
}
