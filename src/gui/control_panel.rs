//! Control Panel Widget
//! Left side panel with file pickers, filters and export actions.

use crate::data::{Category, MatchStatus, PerCategory};
use crate::report::{FilterError, FilterSpec, ReportKind};
use crate::stats::PeriodBucket;
use egui::{Color32, ComboBox, RichText};

/// Raw filter values as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterInputs {
    pub dsa_text: String,
    pub date_from: String,
    pub date_to: String,
    /// Checked state per status, in `MatchStatus::ALL` order
    pub statuses: [bool; 3],
}

impl Default for FilterInputs {
    fn default() -> Self {
        Self {
            dsa_text: String::new(),
            date_from: String::new(),
            date_to: String::new(),
            statuses: [true; 3],
        }
    }
}

impl FilterInputs {
    pub fn selected_statuses(&self) -> Vec<MatchStatus> {
        MatchStatus::ALL
            .into_iter()
            .zip(self.statuses)
            .filter(|(_, checked)| *checked)
            .map(|(status, _)| status)
            .collect()
    }

    /// The only checked status cannot be unchecked; an empty status set
    /// would read as "every status".
    pub fn status_locked(&self, index: usize) -> bool {
        self.statuses[index] && self.statuses.iter().filter(|&&c| c).count() == 1
    }

    pub fn to_filter(&self, mobile_length: usize) -> Result<FilterSpec, FilterError> {
        FilterSpec::from_inputs(
            &self.dsa_text,
            &self.date_from,
            &self.date_to,
            self.selected_statuses(),
            mobile_length,
        )
    }
}

/// Left side control panel.
pub struct ControlPanel {
    /// Loaded file name per category
    pub files: PerCategory<Option<String>>,
    pub filters: FilterInputs,
    pub bucket: PeriodBucket,
    /// Table written by "Export CSV"
    pub csv_kind: ReportKind,
    pub has_data: bool,
    pub has_report: bool,
    pub status: String,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            files: PerCategory::default(),
            filters: FilterInputs::default(),
            bucket: PeriodBucket::None,
            csv_kind: ReportKind::MatchResults,
            has_data: false,
            has_report: false,
            status: "Ready".to_string(),
        }
    }
}

impl ControlPanel {
    pub fn new(bucket: PeriodBucket) -> Self {
        Self {
            bucket,
            ..Self::default()
        }
    }

    pub fn set_file(&mut self, category: Category, name: Option<String>) {
        self.files[category] = name;
        self.has_data = self.files.iter().any(|(_, f)| f.is_some());
        self.has_report = false;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.bucket);
    }

    fn section(ui: &mut egui::Ui, title: &str) {
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);
        ui.label(RichText::new(title).size(14.0).strong());
        ui.add_space(5.0);
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 DSA Dashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Matching & commission reports")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });

        // ===== Data Sources =====
        Self::section(ui, "📁 Data Sources");
        for category in Category::ALL {
            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(5.0)
                .inner_margin(6.0)
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.vertical(|ui| {
                            ui.label(RichText::new(category.name()).size(12.0).strong());
                            let (text, color) = match &self.files[category] {
                                Some(name) => (name.as_str(), Color32::WHITE),
                                None => ("No file selected", Color32::GRAY),
                            };
                            ui.label(RichText::new(text).size(11.0).color(color));
                        });
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("📂 Browse").clicked() {
                                action = ControlPanelAction::Browse(category);
                            }
                        });
                    });
                });
            ui.add_space(3.0);
        }

        // ===== Filters =====
        Self::section(ui, "🔍 Filters");
        let label_width = 80.0;

        ui.label("DSA IDs (comma separated):");
        if ui
            .add(
                egui::TextEdit::multiline(&mut self.filters.dsa_text)
                    .desired_rows(2)
                    .hint_text("e.g. 7001234, 7005678"),
            )
            .changed()
        {
            action = ControlPanelAction::FiltersChanged;
        }

        ui.add_space(5.0);
        for (label, value) in [
            ("From:", &mut self.filters.date_from),
            ("To:", &mut self.filters.date_to),
        ] {
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new(label));
                let response = ui.add(egui::TextEdit::singleline(value).hint_text("YYYY-MM-DD"));
                if response.changed() {
                    action = ControlPanelAction::FiltersChanged;
                }
            });
        }

        ui.add_space(5.0);
        ui.label("Status:");
        ui.horizontal_wrapped(|ui| {
            for (index, status) in MatchStatus::ALL.iter().enumerate() {
                let enabled = !self.filters.status_locked(index);
                let checkbox = egui::Checkbox::new(&mut self.filters.statuses[index], status.label());
                if ui.add_enabled(enabled, checkbox).changed() {
                    action = ControlPanelAction::FiltersChanged;
                }
            }
        });

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Group by:"));
            ComboBox::from_id_salt("bucket")
                .width(140.0)
                .selected_text(self.bucket.label())
                .show_ui(ui, |ui| {
                    for bucket in PeriodBucket::ALL {
                        if ui
                            .selectable_value(&mut self.bucket, bucket, bucket.label())
                            .clicked()
                        {
                            action = ControlPanelAction::BucketChanged;
                        }
                    }
                });
        });

        if ui.small_button("Reset filters").clicked() {
            self.filters = FilterInputs::default();
            action = ControlPanelAction::FiltersChanged;
        }

        // ===== Actions =====
        Self::section(ui, "⚙️ Actions");
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.has_data, |ui| {
                let button = egui::Button::new(RichText::new("▶ Process Data").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Process;
                }
            });

            ui.add_space(8.0);
            ui.add_enabled_ui(self.has_report, |ui| {
                let export_size = egui::vec2(200.0, 28.0);
                if ui
                    .add(egui::Button::new("📄 Export Workbook").min_size(export_size))
                    .clicked()
                {
                    action = ControlPanelAction::ExportWorkbook;
                }

                ui.horizontal(|ui| {
                    ComboBox::from_id_salt("csv_kind")
                        .width(130.0)
                        .selected_text(self.csv_kind.title())
                        .show_ui(ui, |ui| {
                            for kind in ReportKind::ALL {
                                ui.selectable_value(&mut self.csv_kind, kind, kind.title());
                            }
                        });
                    if ui.button("Export CSV").clicked() {
                        action = ControlPanelAction::ExportCsv;
                    }
                });

                if ui
                    .add(egui::Button::new("🖼 Export Chart").min_size(export_size))
                    .clicked()
                {
                    action = ControlPanelAction::ExportChart;
                }
            });

            ui.add_space(8.0);
            if ui.button("🗑 Clear All").clicked() {
                action = ControlPanelAction::ClearAll;
            }
        });

        // ===== Status =====
        Self::section(ui, "ℹ Status");
        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.starts_with("Processed") || self.status.starts_with("Exported") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlPanelAction {
    None,
    Browse(Category),
    FiltersChanged,
    BucketChanged,
    Process,
    ExportWorkbook,
    ExportCsv,
    ExportChart,
    ClearAll,
}
