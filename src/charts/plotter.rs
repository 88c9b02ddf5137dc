//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use crate::dashboard::{BarDatum, Chart, ChartKind, ColorScale, Orientation};
use crate::stats::{ColumnSummary, LinearFit};
use egui::{Color32, RichText, Stroke};
use egui_plot::{
    Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text,
};
use std::f64::consts::TAU;

/// Single-series color
pub const ACCENT_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219), // Blue
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

const PLOT_HEIGHT: f32 = 320.0;
const TREND_COLOR: Color32 = Color32::from_rgb(231, 76, 60);

/// Heatmaps with at most this many cells get value labels
pub const LABELLED_CELLS: usize = 60;

/// Largest wedge drawn as one polygon (keeps each polygon convex)
const MAX_WEDGE: f64 = TAU / 4.0;

pub fn palette_color(index: usize) -> Color32 {
    PALETTE[index % PALETTE.len()]
}

/// Distinct bar keys in sorted order with their colors.
pub fn key_colors(bars: &[BarDatum]) -> Vec<(String, Color32)> {
    let mut keys: Vec<String> = bars.iter().filter_map(|b| b.key.clone()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| (key, palette_color(i)))
        .collect()
}

pub fn bar_color(bar: &BarDatum, keys: &[(String, Color32)]) -> Color32 {
    bar.key
        .as_ref()
        .and_then(|k| keys.iter().find(|(key, _)| key == k))
        .map(|(_, color)| *color)
        .unwrap_or(ACCENT_COLOR)
}

fn lerp_color(a: Color32, b: Color32, t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

/// Cell color for a heatmap value. Diverging maps -1..1, sequential maps min..max.
pub fn heatmap_color(value: f64, min: f64, max: f64, scale: ColorScale) -> Color32 {
    if value.is_nan() {
        return Color32::from_gray(200);
    }
    match scale {
        ColorScale::Diverging => {
            let blue = Color32::from_rgb(49, 54, 149);
            let red = Color32::from_rgb(165, 0, 38);
            if value < 0.0 {
                lerp_color(Color32::WHITE, blue, -value)
            } else {
                lerp_color(Color32::WHITE, red, value)
            }
        }
        ColorScale::Sequential => {
            let t = if max > min { (value - min) / (max - min) } else { 1.0 };
            let low = Color32::from_rgb(68, 1, 84);
            let mid = Color32::from_rgb(33, 145, 140);
            let high = Color32::from_rgb(253, 231, 37);
            if t < 0.5 {
                lerp_color(low, mid, t * 2.0)
            } else {
                lerp_color(mid, high, (t - 0.5) * 2.0)
            }
        }
    }
}

/// Finite min and max over all heatmap values.
pub fn value_range(values: &[Vec<f64>]) -> (f64, f64) {
    values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Unit-circle polygons for each slice, starting at 12 o'clock, clockwise.
/// Slices wider than a quarter turn are split into several polygons.
pub fn pie_wedges(slices: &[(String, f64)]) -> Vec<(usize, Vec<[f64; 2]>)> {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut wedges = Vec::new();
    let mut start = 0.0;
    for (index, (_, value)) in slices.iter().enumerate() {
        let sweep = value.max(0.0) / total * TAU;
        let pieces = (sweep / MAX_WEDGE - 1e-9).ceil().max(1.0) as usize;
        for piece in 0..pieces {
            let from = start + sweep * piece as f64 / pieces as f64;
            let to = start + sweep * (piece + 1) as f64 / pieces as f64;
            let steps = 16;
            let mut points = vec![[0.0, 0.0]];
            for s in 0..=steps {
                let angle = from + (to - from) * s as f64 / steps as f64;
                points.push([angle.sin(), angle.cos()]);
            }
            wedges.push((index, points));
        }
        start += sweep;
    }
    wedges
}

/// Label for a category axis position, empty between categories.
pub fn category_label(labels: &[String], value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Compact numeric formatting for tables and labels.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else if value.abs() >= 1e6 {
        format!("{:.3e}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn category_marks(count: usize) -> Vec<GridMark> {
    (0..count)
        .map(|i| GridMark {
            value: i as f64,
            step_size: 1.0,
        })
        .collect()
}

/// Creates interactive charts for dashboard sections using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Draw any chart kind with its title.
    pub fn draw_chart(ui: &mut egui::Ui, chart: &Chart, id: &str) {
        ui.label(RichText::new(&chart.title).size(15.0).strong());
        ui.add_space(4.0);

        match &chart.kind {
            ChartKind::Pie { slices } => Self::draw_pie(ui, slices, id),
            ChartKind::Bar { bars, orientation } => {
                Self::draw_bars(ui, chart, bars, *orientation, id)
            }
            ChartKind::Line { points } => Self::draw_line(ui, chart, points, id),
            ChartKind::Scatter {
                points,
                categories,
                trendline,
            } => Self::draw_scatter(ui, chart, points, categories, trendline.as_ref(), id),
            ChartKind::Heatmap {
                x_labels,
                y_labels,
                values,
                scale,
            } => Self::draw_heatmap(ui, x_labels, y_labels, values, *scale, id),
            ChartKind::SummaryTable { rows } => Self::draw_summary_table(ui, rows, id),
        }
    }

    fn draw_pie(ui: &mut egui::Ui, slices: &[(String, f64)], id: &str) {
        let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
        let wedges = Self::labelled_wedges(slices, total);

        Plot::new(format!("pie_{id}"))
            .height(PLOT_HEIGHT)
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for (name, color, points) in wedges {
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(points))
                            .fill_color(color)
                            .stroke(Stroke::new(1.0, Color32::WHITE))
                            .name(name),
                    );
                }
            });
    }

    fn labelled_wedges(
        slices: &[(String, f64)],
        total: f64,
    ) -> Vec<(String, Color32, Vec<[f64; 2]>)> {
        pie_wedges(slices)
            .into_iter()
            .map(|(index, points)| {
                let (label, value) = &slices[index];
                let share = value / total * 100.0;
                (
                    format!("{label} ({share:.1}%)"),
                    palette_color(index),
                    points,
                )
            })
            .collect()
    }

    fn draw_bars(
        ui: &mut egui::Ui,
        chart: &Chart,
        bars: &[BarDatum],
        orientation: Orientation,
        id: &str,
    ) {
        let keys = key_colors(bars);
        let labels: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();
        let count = bars.len();
        let horizontal = orientation == Orientation::Horizontal;

        // Horizontal charts list the first bar at the top.
        let position = move |i: usize| {
            if horizontal {
                (count - 1 - i) as f64
            } else {
                i as f64
            }
        };
        let axis_labels: Vec<String> = if horizontal {
            labels.iter().rev().cloned().collect()
        } else {
            labels
        };

        let mut plot = Plot::new(format!("bars_{id}"))
            .height(PLOT_HEIGHT.max(count as f32 * 18.0))
            .allow_scroll(false)
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone());
        if !keys.is_empty() {
            plot = plot.legend(Legend::default());
        }
        plot = if horizontal {
            plot.y_grid_spacer(move |_input| category_marks(count))
                .y_axis_formatter(move |mark, _range| category_label(&axis_labels, mark.value))
        } else {
            plot.x_grid_spacer(move |_input| category_marks(count))
                .x_axis_formatter(move |mark, _range| category_label(&axis_labels, mark.value))
        };

        plot.show(ui, |plot_ui| {
            let make_bar = |i: usize, bar: &BarDatum| {
                Bar::new(position(i), bar.value)
                    .name(&bar.label)
                    .fill(bar_color(bar, &keys))
                    .width(0.7)
            };

            if keys.is_empty() {
                let chart_bars: Vec<Bar> =
                    bars.iter().enumerate().map(|(i, b)| make_bar(i, b)).collect();
                let mut bar_chart = BarChart::new(chart_bars).color(ACCENT_COLOR);
                if horizontal {
                    bar_chart = bar_chart.horizontal();
                }
                plot_ui.bar_chart(bar_chart);
                return;
            }

            for (key, color) in &keys {
                let chart_bars: Vec<Bar> = bars
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.key.as_ref() == Some(key))
                    .map(|(i, b)| make_bar(i, b))
                    .collect();
                let mut bar_chart = BarChart::new(chart_bars).color(*color).name(key);
                if horizontal {
                    bar_chart = bar_chart.horizontal();
                }
                plot_ui.bar_chart(bar_chart);
            }
        });
    }

    fn draw_line(ui: &mut egui::Ui, chart: &Chart, points: &[[f64; 2]], id: &str) {
        Plot::new(format!("line_{id}"))
            .height(PLOT_HEIGHT)
            .allow_scroll(false)
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points.iter().copied()))
                        .color(ACCENT_COLOR)
                        .width(2.0),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(2.5)
                        .color(ACCENT_COLOR),
                );
            });
    }

    fn draw_scatter(
        ui: &mut egui::Ui,
        chart: &Chart,
        points: &[[f64; 2]],
        categories: &[String],
        trendline: Option<&LinearFit>,
        id: &str,
    ) {
        let mut plot = Plot::new(format!("scatter_{id}"))
            .height(PLOT_HEIGHT)
            .allow_scroll(false)
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone());

        if !categories.is_empty() {
            let count = categories.len();
            let labels = categories.to_vec();
            plot = plot
                .x_grid_spacer(move |_input| category_marks(count))
                .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value));
        }
        if trendline.is_some() {
            plot = plot.legend(Legend::default());
        }

        plot.show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(PlotPoints::from_iter(points.iter().copied()))
                    .radius(3.0)
                    .color(ACCENT_COLOR.gamma_multiply(0.7))
                    .name("rows"),
            );

            if let Some(fit) = trendline {
                let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, p| {
                    (acc.0.min(p[0]), acc.1.max(p[0]))
                });
                if lo.is_finite() && hi.is_finite() {
                    plot_ui.line(
                        Line::new(PlotPoints::from(vec![
                            [lo, fit.predict(lo)],
                            [hi, fit.predict(hi)],
                        ]))
                        .color(TREND_COLOR)
                        .width(2.0)
                        .name(format!("OLS trend (R² = {:.3})", fit.r_squared)),
                    );
                }
            }
        });
    }

    fn draw_heatmap(
        ui: &mut egui::Ui,
        x_labels: &[String],
        y_labels: &[String],
        values: &[Vec<f64>],
        scale: ColorScale,
        id: &str,
    ) {
        let (min, max) = value_range(values);
        let cols = x_labels.len();
        let rows = y_labels.len();
        let labelled = cols * rows <= LABELLED_CELLS;

        // Row 0 is drawn at the top.
        let y_axis: Vec<String> = y_labels.iter().rev().cloned().collect();
        let x_axis = x_labels.to_vec();

        Plot::new(format!("heatmap_{id}"))
            .height(PLOT_HEIGHT.max(rows as f32 * 16.0))
            .allow_scroll(false)
            .show_grid(false)
            .x_grid_spacer(move |_input| category_marks(cols))
            .y_grid_spacer(move |_input| category_marks(rows))
            .x_axis_formatter(move |mark, _range| category_label(&x_axis, mark.value))
            .y_axis_formatter(move |mark, _range| category_label(&y_axis, mark.value))
            .show(ui, |plot_ui| {
                for (r, row) in values.iter().enumerate() {
                    let y = (rows - 1 - r) as f64;
                    for (c, &value) in row.iter().enumerate() {
                        let x = c as f64;
                        let cell = vec![
                            [x - 0.5, y - 0.5],
                            [x + 0.5, y - 0.5],
                            [x + 0.5, y + 0.5],
                            [x - 0.5, y + 0.5],
                        ];
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(cell))
                                .fill_color(heatmap_color(value, min, max, scale))
                                .stroke(Stroke::new(0.5, Color32::from_gray(230))),
                        );
                        if labelled {
                            plot_ui.text(
                                Text::new(PlotPoint::new(x, y), format!("{value:.2}"))
                                    .color(Color32::BLACK),
                            );
                        }
                    }
                }
            });
    }

    /// Draw the per-column summary table
    pub fn draw_summary_table(ui: &mut egui::Ui, rows: &[ColumnSummary], id: &str) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::ScrollArea::horizontal().show(ui, |ui| {
                    egui::Grid::new(ui.make_persistent_id(format!("summary_{id}")))
                        .striped(true)
                        .min_col_width(70.0)
                        .spacing([10.0, 4.0])
                        .show(ui, |ui| {
                            for header in
                                ["Column", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"]
                            {
                                ui.label(RichText::new(header).strong().size(11.0));
                            }
                            ui.end_row();

                            for row in rows {
                                ui.label(RichText::new(&row.column).size(11.0));
                                ui.label(RichText::new(row.count.to_string()).size(11.0));
                                for value in [
                                    row.mean, row.std, row.min, row.p25, row.p50, row.p75, row.max,
                                ] {
                                    ui.label(RichText::new(format_number(value)).size(11.0));
                                }
                                ui.end_row();
                            }
                        });
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wedges_cover_every_slice() {
        let slices = vec![("a".to_string(), 3.0), ("b".to_string(), 1.0)];
        let wedges = pie_wedges(&slices);
        // "a" spans 270 degrees and is split into three quarter turns
        assert_eq!(wedges.iter().filter(|(i, _)| *i == 0).count(), 3);
        assert_eq!(wedges.iter().filter(|(i, _)| *i == 1).count(), 1);

        let first = &wedges[0].1;
        assert_eq!(first[0], [0.0, 0.0]);
        assert!((first[1][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_pie_has_no_wedges() {
        assert!(pie_wedges(&[("a".to_string(), 0.0)]).is_empty());
    }

    #[test]
    fn category_labels_only_on_integers() {
        let labels = vec!["Q1".to_string(), "Q2".to_string()];
        assert_eq!(category_label(&labels, 1.0), "Q2");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 2.0), "");
    }

    #[test]
    fn diverging_scale_endpoints() {
        assert_eq!(
            heatmap_color(0.0, -1.0, 1.0, ColorScale::Diverging),
            Color32::WHITE
        );
        assert_eq!(
            heatmap_color(1.0, -1.0, 1.0, ColorScale::Diverging),
            Color32::from_rgb(165, 0, 38)
        );
        assert_eq!(
            heatmap_color(f64::NAN, -1.0, 1.0, ColorScale::Diverging),
            Color32::from_gray(200)
        );
    }

    #[test]
    fn sequential_scale_top_is_yellow() {
        assert_eq!(
            heatmap_color(12.5, 4.25, 12.5, ColorScale::Sequential),
            Color32::from_rgb(253, 231, 37)
        );
    }

    #[test]
    fn keyed_bars_share_colors() {
        let bar = |label: &str, key: &str| BarDatum {
            label: label.to_string(),
            value: 1.0,
            key: Some(key.to_string()),
        };
        let bars = vec![bar("a", "2012"), bar("b", "2007"), bar("c", "2012")];
        let keys = key_colors(&bars);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].0, "2007");
        assert_eq!(bar_color(&bars[0], &keys), bar_color(&bars[2], &keys));
        assert_ne!(bar_color(&bars[0], &keys), bar_color(&bars[1], &keys));
    }

    #[test]
    fn value_range_ignores_nan() {
        let values = vec![vec![f64::NAN, 0.5], vec![-0.25, 1.0]];
        assert_eq!(value_range(&values), (-0.25, 1.0));
    }

    #[test]
    fn numbers_switch_to_scientific() {
        assert_eq!(format_number(f64::NAN), "-");
        assert_eq!(format_number(1.5), "1.500");
        assert_eq!(format_number(2.5e9), "2.500e9");
    }
}
