//! Static Chart Renderer
//! Renders the match-status distribution to a PNG using plotters.
//!
//! Drawing happens in an in-memory RGB buffer which is then encoded with the
//! `image` crate, so no temp files are needed.

use crate::charts::plotter::status_color;
use crate::data::MatchStatus;
use crate::export::ExportError;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{info, warn};

type DrawResult = Result<(), Box<dyn std::error::Error>>;

/// Renders report charts to image bytes.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// PNG bytes of the status distribution bar chart.
    pub fn status_distribution_png(
        distribution: &[(MatchStatus, usize)],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ExportError> {
        if width == 0 || height == 0 {
            return Err(ExportError::Chart("image size must be non-zero".to_string()));
        }

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        // Labels need a system font; without one the bars are drawn unlabeled.
        if let Err(e) = Self::draw_labeled(&mut buffer, (width, height), distribution) {
            warn!(error = %e, "labeled chart failed, drawing without text");
            buffer.fill(0);
            Self::draw_plain(&mut buffer, (width, height), distribution)
                .map_err(|e| ExportError::Chart(e.to_string()))?;
        }

        Self::encode_png(buffer, width, height)
    }

    /// Render and write the PNG to `output_path`.
    pub fn write_status_distribution(
        distribution: &[(MatchStatus, usize)],
        width: u32,
        height: u32,
        output_path: &Path,
    ) -> Result<(), ExportError> {
        let png = Self::status_distribution_png(distribution, width, height)?;
        fs::write(output_path, png)?;
        info!(path = %output_path.display(), "wrote chart image");
        Ok(())
    }

    fn y_max(distribution: &[(MatchStatus, usize)]) -> usize {
        distribution.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1) + 1
    }

    fn draw_labeled(
        buffer: &mut [u8],
        size: (u32, u32),
        distribution: &[(MatchStatus, usize)],
    ) -> DrawResult {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Match Status Distribution", ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                (0..distribution.len()).into_segmented(),
                0..Self::y_max(distribution),
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc("DSAs")
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) => distribution
                    .get(*i)
                    .map(|(status, _)| status.label().to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;

        chart.draw_series(Self::bars(distribution))?;
        root.present()?;
        Ok(())
    }

    fn draw_plain(
        buffer: &mut [u8],
        size: (u32, u32),
        distribution: &[(MatchStatus, usize)],
    ) -> DrawResult {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(16)
            .build_cartesian_2d(
                (0..distribution.len()).into_segmented(),
                0..Self::y_max(distribution),
            )?;

        chart.draw_series(Self::bars(distribution))?;
        root.present()?;
        Ok(())
    }

    fn bars(
        distribution: &[(MatchStatus, usize)],
    ) -> impl Iterator<Item = Rectangle<(SegmentValue<usize>, usize)>> + '_ {
        distribution.iter().enumerate().map(|(i, &(status, count))| {
            let color = status_color(status);
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), count)],
                RGBColor(color.r(), color.g(), color.b()).filled(),
            );
            bar.set_margin(0, 0, 12, 12);
            bar
        })
    }

    fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
        let img = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ExportError::Chart("pixel buffer size mismatch".to_string()))?;

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ExportError::Chart(e.to_string()))?;
        Ok(png)
    }
}
