//! DSA Dashboard Main Application
//! Main window with control panel and report viewer.
//!
//! Every action runs to completion on the UI thread: loading a file,
//! processing, changing a filter and exporting all rebuild state directly.

use crate::charts::StaticChartRenderer;
use crate::config::DashboardConfig;
use crate::data::Category;
use crate::export::{write_csv_path, ExportError, WorkbookWriter};
use crate::gui::{ControlPanel, ControlPanelAction, ReportViewer};
use crate::pipeline::Session;
use egui::SidePanel;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const CHART_SIZE: (u32, u32) = (1200, 700);

/// Main application window.
pub struct DashboardApp {
    session: Session,
    control_panel: ControlPanel,
    report_viewer: ReportViewer,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        Self {
            control_panel: ControlPanel::new(config.bucket),
            report_viewer: ReportViewer::new(),
            session: Session::new(config),
        }
    }

    fn handle_browse(&mut self, category: Category) {
        let Some(path) = rfd::FileDialog::new()
            .set_title(format!("Select {} CSV", category.name()))
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        else {
            return;
        };

        match self.session.load_path(&path, category) {
            Ok(dataset) => {
                let status = dataset.describe();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string());
                self.control_panel.set_file(category, name);
                self.control_panel.set_status(status);
                self.report_viewer.clear();
            }
            Err(e) => {
                error!(%category, error = %e, "file rejected");
                self.control_panel.set_status(format!("Error: {}", e));
            }
        }
    }

    fn handle_process(&mut self) {
        let report = self.session.process(self.control_panel.bucket);
        let dsas = report.outcome.results.len();
        self.control_panel.has_report = true;

        let missing = self.session.missing_categories();
        if self.refresh_view() {
            let status = if missing.is_empty() {
                format!("Processed {} DSAs", dsas)
            } else {
                let names: Vec<&str> = missing.iter().map(|c| c.name()).collect();
                format!("Processed {} DSAs (no {} file)", dsas, names.join(", "))
            };
            self.control_panel.set_status(status);
        }
    }

    /// Rebuild the filtered view. Returns false when the filter is invalid,
    /// leaving the previous view on screen.
    fn refresh_view(&mut self) -> bool {
        let mobile_length = self.session.config().mobile_length;
        let filter = match self.control_panel.filters.to_filter(mobile_length) {
            Ok(filter) => filter,
            Err(e) => {
                self.control_panel.set_status(format!("Error: {}", e));
                return false;
            }
        };

        if let Some(view) = self.session.view(&filter) {
            self.report_viewer.set_view(view);
        }
        true
    }

    fn handle_filters_changed(&mut self) {
        if self.session.report().is_some() && self.refresh_view() {
            self.control_panel.set_status("Filters applied");
        }
    }

    fn handle_bucket_changed(&mut self) {
        if self.session.report().is_some() {
            self.handle_process();
        }
    }

    fn save_dialog(filter_name: &str, extension: &str, file_name: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter(filter_name, &[extension])
            .set_file_name(file_name)
            .save_file()
    }

    /// Run an export to a user-picked path, then open the result.
    fn export_with(
        &mut self,
        filter_name: &str,
        extension: &str,
        file_name: &str,
        write: impl FnOnce(&Path) -> Result<(), ExportError>,
    ) {
        let Some(path) = Self::save_dialog(filter_name, extension, file_name) else {
            return;
        };

        match write(&path) {
            Ok(()) => {
                info!(path = %path.display(), "export finished");
                self.control_panel
                    .set_status(format!("Exported {}", path.display()));
                if let Err(e) = open::that(&path) {
                    warn!(error = %e, "could not open export");
                }
            }
            Err(e) => {
                error!(error = %e, "export failed");
                self.control_panel.set_status(format!("Error: {}", e));
            }
        }
    }

    fn handle_export(&mut self, action: ControlPanelAction) {
        let Some(view) = self.report_viewer.view().cloned() else {
            self.control_panel.set_status("Nothing to export");
            return;
        };
        let precision = view.precision;

        match action {
            ControlPanelAction::ExportWorkbook => {
                let tables = view.tables();
                self.export_with("Excel Workbook", "xlsx", "dsa_report.xlsx", |path| {
                    WorkbookWriter::write(&tables, precision, path)
                });
            }
            ControlPanelAction::ExportCsv => {
                let table = view.table(self.control_panel.csv_kind);
                let file_name = format!("{}.csv", table.name);
                self.export_with("CSV Files", "csv", &file_name, |path| {
                    write_csv_path(&table, precision, path)
                });
            }
            ControlPanelAction::ExportChart => {
                let distribution = view.status_distribution.clone();
                self.export_with("PNG Image", "png", "status_distribution.png", |path| {
                    StaticChartRenderer::write_status_distribution(
                        &distribution,
                        CHART_SIZE.0,
                        CHART_SIZE.1,
                        path,
                    )
                });
            }
            _ => {}
        }
    }

    fn handle_clear(&mut self) {
        self.session.clear();
        self.control_panel.reset();
        self.report_viewer.clear();
        info!("session cleared");
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::Browse(category) => self.handle_browse(category),
                        ControlPanelAction::FiltersChanged => self.handle_filters_changed(),
                        ControlPanelAction::BucketChanged => self.handle_bucket_changed(),
                        ControlPanelAction::Process => self.handle_process(),
                        ControlPanelAction::ExportWorkbook
                        | ControlPanelAction::ExportCsv
                        | ControlPanelAction::ExportChart => self.handle_export(action),
                        ControlPanelAction::ClearAll => self.handle_clear(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Report Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.report_viewer.show(ui);
        });
    }
}
