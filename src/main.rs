//! DSA Dashboard - CSV matching, commission reports & export
//!
//! Opens the dashboard window by default; `report` runs the same pipeline
//! headless.

mod charts;
mod cli;
mod config;
mod data;
mod export;
mod gui;
mod pipeline;
mod report;
mod stats;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use config::{DashboardConfig, CONFIG_ENV};
use eframe::egui;
use gui::DashboardApp;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dsa-dashboard")]
#[command(about = "DSA performance dashboard")]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = CONFIG_ENV, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the reports without opening a window
    Report(cli::ReportArgs),
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Cli::parse();
    let config = DashboardConfig::load(args.config.as_deref()).context("Failed to load config")?;

    match args.command {
        Some(Command::Report(report)) => cli::run_report(report, config),
        None => {
            info!("starting dashboard window");
            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1400.0, 850.0])
                    .with_min_inner_size([1100.0, 650.0])
                    .with_title("DSA Dashboard"),
                ..Default::default()
            };

            eframe::run_native(
                "DSA Dashboard",
                options,
                Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
            )
            .map_err(|e| anyhow!("Dashboard window failed: {e}"))
        }
    }
}
