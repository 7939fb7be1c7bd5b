use std::{fs, path::Path};

use crate::{AnalysisError, PriceSeries, Result};

const WIDTH: i32 = 960;
const HEIGHT: i32 = 480;
const PADDING: f64 = 56.0;
const LINE_COLOR: &str = "#348dc1";
const AXIS_COLOR: &str = "#8c8c8c";
const TICK_EVERY: usize = 12;

fn svg_header(width: i32, height: i32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style>"#,
        w = width,
        h = height
    )
}

fn escape(label: &str) -> String {
    label
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Line chart of the `High` column with every 12th date on the x axis.
pub fn render_history_svg(series: &PriceSeries) -> Result<String> {
    if series.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "nothing to plot".to_string(),
        ));
    }
    let highs = series.highs();
    let (min_v, max_v) = highs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if max_v > min_v { max_v - min_v } else { 1. };

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let plot_w = width - 2. * PADDING;
    let plot_h = height - 2. * PADDING;
    let step = if highs.len() > 1 {
        plot_w / (highs.len() - 1) as f64
    } else {
        0.
    };
    let x_at = |i: usize| PADDING + i as f64 * step;
    let y_at = |v: f64| PADDING + plot_h - (v - min_v) / span * plot_h;

    let mut svg = svg_header(WIDTH, HEIGHT);
    let baseline = PADDING + plot_h;
    svg.push_str(&format!(
        r#"<line x1="{x0:.2}" y1="{y:.2}" x2="{x1:.2}" y2="{y:.2}" stroke="{AXIS_COLOR}"/>"#,
        x0 = PADDING,
        x1 = PADDING + plot_w,
        y = baseline
    ));
    svg.push_str(&format!(
        r#"<line x1="{x:.2}" y1="{y0:.2}" x2="{x:.2}" y2="{y1:.2}" stroke="{AXIS_COLOR}"/>"#,
        x = PADDING,
        y0 = PADDING,
        y1 = baseline
    ));
    for value in [min_v, max_v] {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{value:.2}</text>"#,
            x = PADDING - 6.,
            y = y_at(value) + 3.
        ));
    }

    for (i, point) in series.points().iter().enumerate().step_by(TICK_EVERY) {
        let x = x_at(i);
        let y = baseline + 14.;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end" transform="rotate(-45 {x:.2} {y:.2})">{label}</text>"#,
            label = escape(&point.label)
        ));
    }

    let points = highs
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.2},{:.2}", x_at(i), y_at(v)))
        .collect::<Vec<_>>()
        .join(" ");
    svg.push_str(&format!(
        r#"<polyline fill="none" stroke="{LINE_COLOR}" stroke-width="1.5" points="{points}"/>"#
    ));
    svg.push_str("</svg>");
    Ok(svg)
}

pub fn write_history_chart<P: AsRef<Path>>(series: &PriceSeries, file_path: P) -> Result<()> {
    let path = file_path.as_ref();
    let svg = render_history_svg(series)?;
    fs::write(path, svg).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), points = series.len(), "price history chart written");
    Ok(())
}
