//! Report Viewer
//! Metric cards, report tables and charts for the current filtered view.

use crate::charts::ChartPlotter;
use crate::report::{ReportKind, ReportView, Table};
use egui::{Color32, RichText, ScrollArea};

/// Rows drawn per table; exports always carry every row.
const MAX_VISIBLE_ROWS: usize = 500;
const CARD_WIDTH: f32 = 170.0;
const CHART_HEIGHT: f32 = 260.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerTab {
    Report(ReportKind),
    Charts,
}

impl Default for ViewerTab {
    fn default() -> Self {
        ViewerTab::Report(ReportKind::default())
    }
}

/// Central panel showing one `ReportView`.
#[derive(Default)]
pub struct ReportViewer {
    pub tab: ViewerTab,
    view: Option<ReportView>,
    /// Tables built once per view
    tables: Vec<Table>,
}

impl ReportViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view(&mut self, view: ReportView) {
        self.tables = view.tables();
        self.view = Some(view);
    }

    pub fn view(&self) -> Option<&ReportView> {
        self.view.as_ref()
    }

    pub fn clear(&mut self) {
        self.view = None;
        self.tables.clear();
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(view) = &self.view else {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new("Load the CSV files and press Process Data")
                        .size(20.0)
                        .color(Color32::GRAY),
                );
            });
            return;
        };

        Self::metric_cards(ui, view);
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            for kind in ReportKind::ALL {
                ui.selectable_value(&mut self.tab, ViewerTab::Report(kind), kind.title());
            }
            ui.selectable_value(&mut self.tab, ViewerTab::Charts, "Charts");
        });
        ui.separator();

        if view.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No data matches the current filters").size(18.0));
            });
            return;
        }

        match self.tab {
            ViewerTab::Report(kind) => {
                let index = ReportKind::ALL
                    .iter()
                    .position(|&k| k == kind)
                    .unwrap_or_default();
                if let Some(table) = self.tables.get(index) {
                    Self::table_grid(ui, table, view.precision);
                }
            }
            ViewerTab::Charts => Self::charts(ui, view),
        }
    }

    /// Title and formatted value of every metric card.
    fn metric_values(view: &ReportView) -> Vec<(&'static str, String)> {
        let o = &view.overview;
        let p = view.precision;
        vec![
            ("Total DSAs", o.total_dsas.to_string()),
            ("Full matches", o.full_match.to_string()),
            ("Match rate", format!("{:.1}%", o.match_rate * 100.0)),
            ("Mean deposit / DSA", format!("{:.*}", p, o.mean_deposit_per_dsa)),
            ("Median deposit / DSA", format!("{:.*}", p, o.median_deposit_per_dsa)),
            ("Deposit std dev", format!("{:.*}", p, o.deposit_std_dev)),
            ("Qualified customers", view.qualified.customers.len().to_string()),
            ("Not onboarded", view.qualified.not_onboarded.len().to_string()),
            ("Commission due", format!("{:.*}", p, view.commission_due())),
        ]
    }

    fn metric_cards(ui: &mut egui::Ui, view: &ReportView) {
        let cards = Self::metric_values(view);

        ui.horizontal_wrapped(|ui| {
            for (title, value) in cards {
                egui::Frame::none()
                    .rounding(8.0)
                    .stroke(egui::Stroke::new(1.0, Color32::from_rgb(100, 149, 237)))
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.set_width(CARD_WIDTH);
                        ui.vertical(|ui| {
                            ui.label(RichText::new(title).size(12.0).color(Color32::GRAY));
                            ui.label(RichText::new(value).size(22.0).strong());
                        });
                    });
            }
        });
    }

    fn table_grid(ui: &mut egui::Ui, table: &Table, precision: usize) {
        if table.is_empty() {
            ui.label(RichText::new("No rows").italics().color(Color32::GRAY));
            return;
        }
        if table.len() > MAX_VISIBLE_ROWS {
            ui.label(
                RichText::new(format!(
                    "Showing first {} of {} rows. Export for the full table.",
                    MAX_VISIBLE_ROWS,
                    table.len()
                ))
                .size(11.0)
                .color(Color32::GRAY),
            );
        }

        ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
            egui::Grid::new(("report_table", table.name.as_str()))
                .striped(true)
                .spacing([16.0, 4.0])
                .show(ui, |ui| {
                    for header in &table.headers {
                        ui.label(RichText::new(header).strong());
                    }
                    ui.end_row();

                    for row in table.rows.iter().take(MAX_VISIBLE_ROWS) {
                        for cell in row {
                            let text = cell.display(precision);
                            if cell.is_numeric() {
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| ui.monospace(text),
                                );
                            } else {
                                ui.label(text);
                            }
                        }
                        ui.end_row();
                    }
                });
        });
    }

    fn charts(ui: &mut egui::Ui, view: &ReportView) {
        ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            ui.label(RichText::new("Match Status Distribution").size(14.0).strong());
            ChartPlotter::draw_status_chart(ui, &view.status_distribution, CHART_HEIGHT);

            ui.add_space(12.0);
            ui.label(RichText::new("Category Records Over Time").size(14.0).strong());
            ChartPlotter::draw_timeline_chart(ui, &view.timeline, CHART_HEIGHT);

            ui.add_space(12.0);
            ui.label(RichText::new("Qualified Customers per DSA").size(14.0).strong());
            ChartPlotter::draw_customers_chart(ui, &view.customers_per_dsa(), CHART_HEIGHT);
        });
    }
}
