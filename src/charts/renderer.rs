//! Static Chart Renderer
//! Renders section charts to PNG images with plotters for report export.
//!
//! Layout follows the interactive view: caption on top, axis descriptions,
//! category labels under (or beside) bars, legend on the right for pies.

use crate::charts::plotter::{
    bar_color, category_label, heatmap_color, key_colors, palette_color, pie_wedges,
    value_range, ACCENT_COLOR, LABELLED_CELLS,
};
use crate::dashboard::{BarDatum, Chart, ChartKind, ColorScale, Orientation};
use crate::stats::LinearFit;
use egui::Color32;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;
use thiserror::Error;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Chart '{0}' has no static rendition")]
    NoImage(String),
    #[error("Image buffer does not match {0}x{1}")]
    Buffer(u32, u32),
}

fn draw_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

fn rgb(color: Color32) -> RGBColor {
    RGBColor(color.r(), color.g(), color.b())
}

/// Axis range with some headroom; degenerate ranges are widened.
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a chart into PNG bytes.
    pub fn render_png(chart: &Chart, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        if !chart.is_renderable() {
            return Err(RenderError::NoImage(chart.title.clone()));
        }

        let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            Self::draw(&root, chart)?;
            root.present().map_err(draw_err)?;
        }

        let image = image::RgbImage::from_raw(width, height, buffer)
            .ok_or(RenderError::Buffer(width, height))?;
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, image::ImageFormat::Png)?;
        Ok(png.into_inner())
    }

    fn draw(root: &Area, chart: &Chart) -> Result<(), RenderError> {
        match &chart.kind {
            ChartKind::Pie { slices } => Self::draw_pie(root, chart, slices),
            ChartKind::Bar { bars, orientation } => match orientation {
                Orientation::Vertical => Self::draw_vertical_bars(root, chart, bars),
                Orientation::Horizontal => Self::draw_horizontal_bars(root, chart, bars),
            },
            ChartKind::Line { points } => Self::draw_line(root, chart, points),
            ChartKind::Scatter {
                points,
                categories,
                trendline,
            } => Self::draw_scatter(root, chart, points, categories, trendline.as_ref()),
            ChartKind::Heatmap {
                x_labels,
                y_labels,
                values,
                scale,
            } => Self::draw_heatmap(root, chart, x_labels, y_labels, values, *scale),
            ChartKind::SummaryTable { .. } => Err(RenderError::NoImage(chart.title.clone())),
        }
    }

    fn draw_pie(root: &Area, chart: &Chart, slices: &[(String, f64)]) -> Result<(), RenderError> {
        let area = root
            .titled(&chart.title, ("sans-serif", 28).into_font())
            .map_err(draw_err)?;
        let (w, h) = area.dim_in_pixel();
        let (pie_area, legend_area) = area.split_horizontally((w as f64 * 0.6) as u32);

        let radius = (w as f64 * 0.6).min(h as f64) * 0.42;
        let cx = w as f64 * 0.3;
        let cy = h as f64 * 0.5;

        for (index, points) in pie_wedges(slices) {
            let pixels: Vec<(i32, i32)> = points
                .iter()
                .map(|p| ((cx + p[0] * radius) as i32, (cy - p[1] * radius) as i32))
                .collect();
            pie_area
                .draw(&Polygon::new(pixels, rgb(palette_color(index)).filled()))
                .map_err(draw_err)?;
        }

        let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
        for (index, (label, value)) in slices.iter().enumerate() {
            let y = 20 + index as i32 * 28;
            legend_area
                .draw(&Rectangle::new(
                    [(10, y), (28, y + 18)],
                    rgb(palette_color(index)).filled(),
                ))
                .map_err(draw_err)?;
            let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            legend_area
                .draw(&Text::new(
                    format!("{label} ({share:.1}%)"),
                    (36, y + 2),
                    ("sans-serif", 18).into_font(),
                ))
                .map_err(draw_err)?;
        }
        Ok(())
    }

    fn bar_max(bars: &[BarDatum]) -> f64 {
        let max = bars
            .iter()
            .map(|b| b.value)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }

    fn draw_vertical_bars(root: &Area, chart: &Chart, bars: &[BarDatum]) -> Result<(), RenderError> {
        let count = bars.len().max(1);
        let labels: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();
        let keys = key_colors(bars);

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28).into_font())
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5f64..(count as f64 - 0.5), 0f64..Self::bar_max(bars))
            .map_err(draw_err)?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(count)
            .x_label_formatter(&|x| category_label(&labels, *x))
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(draw_err)?;

        ctx.draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let x = i as f64;
            Rectangle::new(
                [(x - 0.35, 0.0), (x + 0.35, bar.value)],
                rgb(bar_color(bar, &keys)).filled(),
            )
        }))
        .map_err(draw_err)?;
        Ok(())
    }

    fn draw_horizontal_bars(
        root: &Area,
        chart: &Chart,
        bars: &[BarDatum],
    ) -> Result<(), RenderError> {
        let count = bars.len().max(1);
        // First bar at the top.
        let labels: Vec<String> = bars.iter().rev().map(|b| b.label.clone()).collect();
        let keys = key_colors(bars);

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28).into_font())
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(180)
            .build_cartesian_2d(0f64..Self::bar_max(bars), -0.5f64..(count as f64 - 0.5))
            .map_err(draw_err)?;

        ctx.configure_mesh()
            .disable_y_mesh()
            .y_labels(count)
            .y_label_formatter(&|y| category_label(&labels, *y))
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(draw_err)?;

        ctx.draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let y = (count - 1 - i) as f64;
            Rectangle::new(
                [(0.0, y - 0.35), (bar.value, y + 0.35)],
                rgb(bar_color(bar, &keys)).filled(),
            )
        }))
        .map_err(draw_err)?;

        for (key, color) in &keys {
            let color = rgb(*color);
            ctx.draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())
                .map_err(draw_err)?
                .label(key.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        if !keys.is_empty() {
            ctx.configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
        }
        Ok(())
    }

    fn draw_line(root: &Area, chart: &Chart, points: &[[f64; 2]]) -> Result<(), RenderError> {
        let (x_lo, x_hi) = Self::extent(points, 0);
        let (y_lo, y_hi) = Self::extent(points, 1);
        let (x_lo, x_hi) = padded(x_lo, x_hi);
        let (y_lo, y_hi) = padded(y_lo.min(0.0), y_hi);
        let color = rgb(ACCENT_COLOR);

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28).into_font())
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(draw_err)?;

        ctx.configure_mesh()
            .x_label_formatter(&|x| format!("{:.0}", x))
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(draw_err)?;

        ctx.draw_series(LineSeries::new(
            points.iter().map(|p| (p[0], p[1])),
            color.stroke_width(2),
        ))
        .map_err(draw_err)?;
        ctx.draw_series(
            points
                .iter()
                .map(|p| Circle::new((p[0], p[1]), 3, color.filled())),
        )
        .map_err(draw_err)?;
        Ok(())
    }

    fn draw_scatter(
        root: &Area,
        chart: &Chart,
        points: &[[f64; 2]],
        categories: &[String],
        trendline: Option<&LinearFit>,
    ) -> Result<(), RenderError> {
        let (x_lo, x_hi) = if categories.is_empty() {
            let (lo, hi) = Self::extent(points, 0);
            padded(lo, hi)
        } else {
            (-0.5, categories.len() as f64 - 0.5)
        };
        let (y_lo, y_hi) = Self::extent(points, 1);
        let (y_lo, y_hi) = padded(y_lo, y_hi);

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28).into_font())
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(draw_err)?;

        let numeric = |x: &f64| format!("{:.2e}", x);
        let category = |x: &f64| category_label(categories, *x);
        let mut mesh = ctx.configure_mesh();
        mesh.x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .y_label_formatter(&numeric);
        if categories.is_empty() {
            mesh.x_label_formatter(&numeric);
        } else {
            mesh.x_labels(categories.len()).x_label_formatter(&category);
        }
        mesh.draw().map_err(draw_err)?;

        let color = rgb(ACCENT_COLOR).mix(0.6);
        ctx.draw_series(
            points
                .iter()
                .map(|p| Circle::new((p[0], p[1]), 3, color.filled())),
        )
        .map_err(draw_err)?;

        if let Some(fit) = trendline {
            let (lo, hi) = Self::extent(points, 0);
            if lo.is_finite() && hi.is_finite() {
                ctx.draw_series(LineSeries::new(
                    [(lo, fit.predict(lo)), (hi, fit.predict(hi))],
                    RED.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label(format!("OLS trend (R² = {:.3})", fit.r_squared))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

                ctx.configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(draw_err)?;
            }
        }
        Ok(())
    }

    fn draw_heatmap(
        root: &Area,
        chart: &Chart,
        x_labels: &[String],
        y_labels: &[String],
        values: &[Vec<f64>],
        scale: ColorScale,
    ) -> Result<(), RenderError> {
        let cols = x_labels.len().max(1);
        let rows = y_labels.len().max(1);
        let (min, max) = value_range(values);
        let y_axis: Vec<String> = y_labels.iter().rev().cloned().collect();

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28).into_font())
            .margin(20)
            .x_label_area_size(110)
            .y_label_area_size(180)
            .build_cartesian_2d(-0.5f64..(cols as f64 - 0.5), -0.5f64..(rows as f64 - 0.5))
            .map_err(draw_err)?;

        ctx.configure_mesh()
            .disable_mesh()
            .x_labels(cols)
            .y_labels(rows)
            .x_label_formatter(&|x| category_label(x_labels, *x))
            .y_label_formatter(&|y| category_label(&y_axis, *y))
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .draw()
            .map_err(draw_err)?;

        ctx.draw_series(values.iter().enumerate().flat_map(|(r, row)| {
            let y = (rows - 1 - r) as f64;
            row.iter().enumerate().map(move |(c, &value)| {
                let x = c as f64;
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    rgb(heatmap_color(value, min, max, scale)).filled(),
                )
            })
        }))
        .map_err(draw_err)?;

        if cols * rows <= LABELLED_CELLS {
            ctx.draw_series(values.iter().enumerate().flat_map(|(r, row)| {
                let y = (rows - 1 - r) as f64;
                row.iter().enumerate().map(move |(c, &value)| {
                    Text::new(
                        format!("{value:.2}"),
                        (c as f64, y),
                        ("sans-serif", 14).into_font(),
                    )
                })
            }))
            .map_err(draw_err)?;
        }
        Ok(())
    }

    /// Finite min and max of one coordinate.
    fn extent(points: &[[f64; 2]], axis: usize) -> (f64, f64) {
        points
            .iter()
            .map(|p| p[axis])
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ColumnSummary;

    #[test]
    fn padded_widens_degenerate_ranges() {
        assert_eq!(padded(2.0, 2.0), (1.0, 3.0));
        assert_eq!(padded(f64::INFINITY, f64::NEG_INFINITY), (0.0, 1.0));
        let (lo, hi) = padded(0.0, 100.0);
        assert!(lo < 0.0 && hi > 100.0);
    }

    #[test]
    fn extent_skips_nan() {
        let points = [[1.0, f64::NAN], [3.0, 2.0], [-1.0, 5.0]];
        assert_eq!(StaticChartRenderer::extent(&points, 0), (-1.0, 3.0));
        assert_eq!(StaticChartRenderer::extent(&points, 1), (2.0, 5.0));
    }

    fn assert_png(chart: &Chart) {
        let bytes = StaticChartRenderer::render_png(chart, 640, 360).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']), "{}", chart.title);
    }

    fn bars(values: &[(&str, f64, Option<&str>)]) -> Vec<BarDatum> {
        values
            .iter()
            .map(|(label, value, key)| BarDatum {
                label: label.to_string(),
                value: *value,
                key: key.map(str::to_string),
            })
            .collect()
    }

    #[test]
    fn pies_render() {
        let slices = vec![("Software".to_string(), 3.0), ("Games".to_string(), 1.0)];
        assert_png(&Chart::new("Markets", ChartKind::Pie { slices }));

        let zero = vec![("A".to_string(), 0.0), ("B".to_string(), 0.0)];
        assert_png(&Chart::new("Zero pie", ChartKind::Pie { slices: zero }));
        assert_png(&Chart::new("Empty pie", ChartKind::Pie { slices: Vec::new() }));
    }

    #[test]
    fn bars_render_in_both_orientations() {
        let vertical = Chart::new(
            "Status",
            ChartKind::Bar {
                bars: bars(&[("operating", 3.0, None), ("closed", 1.0, None)]),
                orientation: Orientation::Vertical,
            },
        )
        .labels("status", "count");
        assert_png(&vertical);

        let keyed = Chart::new(
            "Top companies",
            ChartKind::Bar {
                bars: bars(&[
                    ("Epsilon", 40.0, Some("2012")),
                    ("Alpha", 1.0, Some("2007")),
                    ("Beta", 0.05, Some("2007")),
                ]),
                orientation: Orientation::Horizontal,
            },
        );
        assert_png(&keyed);

        let zeros = Chart::new(
            "Zero bars",
            ChartKind::Bar {
                bars: bars(&[("a", 0.0, None), ("b", 0.0, None)]),
                orientation: Orientation::Vertical,
            },
        );
        assert_png(&zeros);

        let empty = Chart::new(
            "No bars",
            ChartKind::Bar {
                bars: Vec::new(),
                orientation: Orientation::Horizontal,
            },
        );
        assert_png(&empty);
    }

    #[test]
    fn lines_render_with_and_without_points() {
        let points = vec![[2007.0, 1.05], [2010.0, 0.32], [2012.0, 40.04]];
        assert_png(&Chart::new("Funding by year", ChartKind::Line { points }).labels("year", "bn"));
        assert_png(&Chart::new("Empty line", ChartKind::Line { points: Vec::new() }));
        assert_png(&Chart::new("Single point", ChartKind::Line { points: vec![[2000.0, 5.0]] }));
    }

    #[test]
    fn scatters_render() {
        let numeric = Chart::new(
            "Debt vs funding",
            ChartKind::Scatter {
                points: vec![[0.4, 1.0], [0.0, 0.05], [0.1, 0.3], [35.0, 40.0]],
                categories: Vec::new(),
                trendline: Some(LinearFit {
                    slope: 1.1,
                    intercept: 0.2,
                    r_squared: 0.99,
                }),
            },
        );
        assert_png(&numeric);

        let categorical = Chart::new(
            "Seed by quarter",
            ChartKind::Scatter {
                points: vec![[0.0, 100000.0], [0.0, 200000.0], [2.0, 0.0]],
                categories: vec!["Q1".to_string(), "Q2".to_string(), "Q3".to_string()],
                trendline: None,
            },
        );
        assert_png(&categorical);

        let empty = Chart::new(
            "Empty scatter",
            ChartKind::Scatter {
                points: Vec::new(),
                categories: Vec::new(),
                trendline: Some(LinearFit {
                    slope: f64::NAN,
                    intercept: f64::NAN,
                    r_squared: f64::NAN,
                }),
            },
        );
        assert_png(&empty);
    }

    #[test]
    fn heatmaps_render() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let diverging = Chart::new(
            "Correlation heatmap",
            ChartKind::Heatmap {
                x_labels: labels.clone(),
                y_labels: labels,
                values: vec![vec![1.0, -0.3], vec![-0.3, f64::NAN]],
                scale: ColorScale::Diverging,
            },
        );
        assert_png(&diverging);

        let sequential = Chart::new(
            "Closure markets",
            ChartKind::Heatmap {
                x_labels: vec!["share".to_string()],
                y_labels: vec!["Software".to_string(), "Biotech".to_string()],
                values: vec![vec![12.5], vec![f64::NAN]],
                scale: ColorScale::Sequential,
            },
        )
        .labels("Market share", "");
        assert_png(&sequential);

        let flat = Chart::new(
            "Flat",
            ChartKind::Heatmap {
                x_labels: vec!["share".to_string()],
                y_labels: vec!["only".to_string()],
                values: vec![vec![4.0]],
                scale: ColorScale::Sequential,
            },
        );
        assert_png(&flat);
    }

    #[test]
    fn summary_table_has_no_image() {
        let chart = Chart::new(
            "View table",
            ChartKind::SummaryTable {
                rows: Vec::<ColumnSummary>::new(),
            },
        );
        assert!(matches!(
            StaticChartRenderer::render_png(&chart, 320, 200),
            Err(RenderError::NoImage(_))
        ));
    }
}
