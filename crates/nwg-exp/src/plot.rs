use std::error::Error;
use std::path::Path;

use nwg_core::errors::{ErrorInfo, NwgError};
use plotters::prelude::*;

use crate::export::SummaryRow;

const CHART_SIZE: (u32, u32) = (1024, 640);
/// Horizontal units per training condition; bars occupy units 1..7.
const GROUP_WIDTH: i32 = 8;
const BAR_WIDTH: i32 = 2;

/// Renders the grouped subordinate/basic/superordinate bar chart as SVG.
pub fn render_bar_chart(path: &Path, rows: &[SummaryRow]) -> Result<(), NwgError> {
    draw(path, rows).map_err(|err| {
        NwgError::Io(
            ErrorInfo::new("plot-render", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn draw(path: &Path, rows: &[SummaryRow]) -> Result<(), Box<dyn Error>> {
    let groups = (rows.len() as i32).max(1);
    let y_max = rows
        .iter()
        .flat_map(|row| row.means.iter().zip(&row.errors).map(|(m, e)| m + e))
        .filter(|value| value.is_finite())
        .fold(1.0f64, f64::max)
        * 1.05;
    let ticks: Vec<i32> = (0..groups).map(|i| i * GROUP_WIDTH + GROUP_WIDTH / 2).collect();
    let label_for = |x: &i32| -> String {
        let index = (x / GROUP_WIDTH) as usize;
        rows.get(index).map(|row| row.label.to_string()).unwrap_or_default()
    };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Generalization scores", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..groups * GROUP_WIDTH).with_key_points(ticks),
            0.0f64..y_max,
        )?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("training condition")
        .y_desc("generalization probability")
        .x_label_formatter(&label_for)
        .draw()?;

    let palette = [("subord.", RED), ("basic", GREEN), ("super.", BLUE)];
    for (slot, (name, color)) in palette.iter().enumerate() {
        let offset = 1 + slot as i32 * BAR_WIDTH;
        let bars = rows.iter().enumerate().map(|(i, row)| {
            let x0 = i as i32 * GROUP_WIDTH + offset;
            Rectangle::new([(x0, 0.0), (x0 + BAR_WIDTH, row.means[slot])], color.filled())
        });
        let color = *color;
        chart
            .draw_series(bars)?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        chart.draw_series(rows.iter().enumerate().map(|(i, row)| {
            let x = i as i32 * GROUP_WIDTH + offset + BAR_WIDTH / 2;
            let mean = row.means[slot];
            let err = row.errors[slot];
            ErrorBar::new_vertical(x, mean - err, mean, mean + err, BLACK.filled(), 6)
        }))?;
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
