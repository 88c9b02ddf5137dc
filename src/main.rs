//! Startup Explorer - Crunchbase funding dashboard
//!
//! Loads startup and market-share CSV files, computes the dashboard sections
//! and shows them in a window, or writes them to a PowerPoint report.

mod charts;
mod config;
mod dashboard;
mod data;
mod gui;
mod ppt;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use config::DashboardConfig;
use dashboard::DashboardBuilder;
use data::DataLoader;
use eframe::egui;
use gui::DashboardApp;
use ppt::PptGenerator;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "startup-explorer", version, about = "Crunchbase startup funding dashboard")]
struct Args {
    /// Startups CSV (defaults to cleaned_data.csv)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Market share CSV (defaults to markets.csv)
    #[arg(long, value_name = "PATH")]
    markets: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the report to this .pptx file instead of opening the window
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Write the effective settings as JSON and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(format!("startup_explorer={level}").parse()?))
        .init();
    Ok(())
}

fn export(config: &DashboardConfig, path: &Path) -> Result<()> {
    let data = DataLoader::load_all(config).context("failed to load datasets")?;
    let dashboard = DashboardBuilder::new(&data, config)
        .build()
        .context("failed to build dashboard")?;
    let slides =
        PptGenerator::export_dashboard(&dashboard, path, config.export_width, config.export_height)
            .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(slides, path = %path.display(), "export complete");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = DashboardConfig::load(args.config.as_deref())?
        .with_data_paths(args.data, args.markets);
    tracing::debug!(?config, "settings");

    if let Some(path) = &args.write_config {
        config.save(path)?;
        tracing::info!(path = %path.display(), "settings written");
        return Ok(());
    }

    if let Some(path) = &args.export {
        return export(&config, path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Startup Explorer"),
        ..Default::default()
    };

    eframe::run_native(
        "Startup Explorer",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
