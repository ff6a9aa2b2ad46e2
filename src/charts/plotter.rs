//! Chart Plotter Module
//! Interactive report charts using egui_plot.

use crate::data::{Category, MatchStatus, PerCategory};
use crate::stats::PeriodCounts;
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points};
use std::ops::RangeInclusive;

/// One color per category, in category order
pub const CATEGORY_COLORS: [Color32; 4] = [
    Color32::from_rgb(52, 152, 219), // Blue
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(155, 89, 182), // Purple
];

pub fn status_color(status: MatchStatus) -> Color32 {
    match status {
        MatchStatus::FullMatch => Color32::from_rgb(46, 204, 113),
        MatchStatus::PartialMatch => Color32::from_rgb(243, 156, 18),
        MatchStatus::Unmatched => Color32::from_rgb(231, 76, 60),
    }
}

/// Per-category line points for the trend chart. X is the period index.
pub fn timeline_series(timeline: &[PeriodCounts]) -> PerCategory<Vec<[f64; 2]>> {
    PerCategory::from_fn(|category| {
        timeline
            .iter()
            .enumerate()
            .map(|(i, p)| [i as f64, p.counts[category] as f64])
            .collect()
    })
}

/// Axis labels for integer positions; fractional marks stay blank.
fn index_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let rounded = mark.value.round();
        if (mark.value - rounded).abs() > f64::EPSILON || rounded < 0.0 {
            return String::new();
        }
        labels.get(rounded as usize).cloned().unwrap_or_default()
    }
}

/// Draws the report charts.
pub struct ChartPlotter;

impl ChartPlotter {
    fn empty_chart(ui: &mut egui::Ui, message: &str) {
        ui.label(RichText::new(message).italics().color(Color32::GRAY));
    }

    /// Bar chart of results per match status.
    pub fn draw_status_chart(ui: &mut egui::Ui, distribution: &[(MatchStatus, usize)], height: f32) {
        if distribution.iter().all(|(_, n)| *n == 0) {
            Self::empty_chart(ui, "No match results to chart");
            return;
        }

        let labels: Vec<String> = distribution.iter().map(|(s, _)| s.label().to_string()).collect();
        let bars: Vec<Bar> = distribution
            .iter()
            .enumerate()
            .map(|(i, &(status, count))| {
                Bar::new(i as f64, count as f64)
                    .width(0.6)
                    .name(status.label())
                    .fill(status_color(status))
            })
            .collect();

        Plot::new("status_distribution")
            .height(height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .y_axis_label("DSAs")
            .x_axis_formatter(index_formatter(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Line per category of retained records over time.
    pub fn draw_timeline_chart(ui: &mut egui::Ui, timeline: &[PeriodCounts], height: f32) {
        if timeline.is_empty() {
            Self::empty_chart(ui, "No dated records to chart");
            return;
        }

        let labels: Vec<String> = timeline.iter().map(|p| p.period.to_string()).collect();
        let series = timeline_series(timeline);

        Plot::new("category_timeline")
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false)
            .y_axis_label("Records")
            .x_axis_formatter(index_formatter(labels))
            .show(ui, |plot_ui| {
                for (category, points) in series.iter() {
                    let color = CATEGORY_COLORS[category.index()];
                    plot_ui.line(
                        Line::new(PlotPoints::from(points.clone()))
                            .color(color)
                            .width(2.0)
                            .name(category.name()),
                    );
                    // Single periods would otherwise be invisible
                    plot_ui.points(
                        Points::new(PlotPoints::from(points.clone()))
                            .color(color)
                            .radius(3.0),
                    );
                }
            });
    }

    /// Qualified customers per DSA.
    pub fn draw_customers_chart(ui: &mut egui::Ui, per_dsa: &[(String, usize)], height: f32) {
        if per_dsa.is_empty() {
            Self::empty_chart(ui, "No qualified customers to chart");
            return;
        }

        let labels: Vec<String> = per_dsa.iter().map(|(id, _)| id.clone()).collect();
        let bars: Vec<Bar> = per_dsa
            .iter()
            .enumerate()
            .map(|(i, (dsa, count))| {
                Bar::new(i as f64, *count as f64)
                    .width(0.6)
                    .name(dsa)
                    .fill(CATEGORY_COLORS[Category::Onboarding.index()])
            })
            .collect();

        Plot::new("customers_per_dsa")
            .height(height)
            .allow_scroll(false)
            .y_axis_label("Customers")
            .x_axis_formatter(index_formatter(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timeline_points_follow_period_order() {
        let mut first: PerCategory<usize> = PerCategory::default();
        first[Category::Deposit] = 3;
        let mut second: PerCategory<usize> = PerCategory::default();
        second[Category::Deposit] = 1;
        second[Category::Scan] = 2;
        let timeline = vec![
            PeriodCounts {
                period: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                counts: first,
            },
            PeriodCounts {
                period: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                counts: second,
            },
        ];

        let series = timeline_series(&timeline);
        assert_eq!(series[Category::Deposit], vec![[0.0, 3.0], [1.0, 1.0]]);
        assert_eq!(series[Category::Scan], vec![[0.0, 0.0], [1.0, 2.0]]);
        assert_eq!(series[Category::Onboarding].len(), 2);
    }

    #[test]
    fn statuses_have_distinct_colors() {
        let colors: Vec<Color32> = MatchStatus::ALL.iter().map(|&s| status_color(s)).collect();
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
    }
}
