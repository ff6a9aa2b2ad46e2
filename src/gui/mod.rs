//! GUI module - Dashboard window components

mod app;
mod control_panel;
mod report_viewer;

pub use app::DashboardApp;
pub use control_panel::{ControlPanel, ControlPanelAction};
pub use report_viewer::ReportViewer;
