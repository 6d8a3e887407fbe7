use crate::dataset::{Cell, Dataset};
use crate::errors::AppError;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write as _;

/// Quality indicators charted in the report, laid out row by row.
pub const REPORT_COLUMNS: [&str; 12] = [
    "inputGranularity",
    "validationGranularity",
    "geocodeGranularity",
    "addressComplete",
    "hasInferredComponents",
    "street_number_inferred",
    "route_inferred",
    "locality_inferred",
    "administrative_area_level_1_inferred",
    "postal_code_inferred",
    "country_inferred",
    "postal_code_suffix_inferred",
];

pub const GRID_ROWS: usize = 3;
pub const GRID_COLS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub total_rows: usize,
    pub charts: Vec<Chart>,
}

/// Frequency of each distinct non-empty value, most frequent first.
/// Ties keep the order in which values were first seen.
pub fn value_counts(dataset: &Dataset, column: &str) -> Result<Vec<ValueCount>, AppError> {
    if !dataset.has_column(column) {
        return Err(AppError::MissingColumn(column.to_string()));
    }

    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for row in dataset.rows() {
        let cell = Dataset::cell(row, column);
        if let Cell::Empty = cell {
            continue;
        }
        *counts.entry(cell.to_string()).or_insert(0) += 1;
    }

    let mut counts: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}

/// Counts every report column; fails on the first one the dataset lacks.
pub fn build_report(dataset: &Dataset) -> Result<Report, AppError> {
    let charts = REPORT_COLUMNS
        .iter()
        .map(|column| {
            Ok(Chart {
                column: column.to_string(),
                counts: value_counts(dataset, column)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Report {
        generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        total_rows: dataset.len(),
        charts,
    })
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const CHART_WIDTH: f64 = 320.0;
const CHART_HEIGHT: f64 = 260.0;
const MARGIN_LEFT: f64 = 44.0;
const MARGIN_TOP: f64 = 12.0;
// Room for the rotated category labels
const MARGIN_BOTTOM: f64 = 90.0;

/// One bar chart as an inline SVG element.
pub fn render_chart_svg(chart: &Chart) -> String {
    let plot_w = CHART_WIDTH - MARGIN_LEFT - 8.0;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_h;
    let max = chart.counts.iter().map(|c| c.count).max().unwrap_or(0);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 {w} {h}" width="{w}" height="{h}" role="img" aria-label="{title}">"#,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        title = escape(&chart.column)
    );
    let _ = write!(
        svg,
        r#"<line class="axis" x1="{x}" y1="{top}" x2="{x}" y2="{base}"/><line class="axis" x1="{x}" y1="{base}" x2="{right}" y2="{base}"/>"#,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        base = baseline,
        right = MARGIN_LEFT + plot_w
    );
    let _ = write!(
        svg,
        r#"<text class="tick" x="{x}" y="{y}" text-anchor="end">{max}</text><text class="tick" x="{x}" y="{base}" text-anchor="end">0</text>"#,
        x = MARGIN_LEFT - 4.0,
        y = MARGIN_TOP + 4.0,
        base = baseline,
        max = max
    );

    if chart.counts.is_empty() || max == 0 {
        let _ = write!(
            svg,
            r#"<text class="muted" x="{x}" y="{y}" text-anchor="middle">no data</text></svg>"#,
            x = MARGIN_LEFT + plot_w / 2.0,
            y = MARGIN_TOP + plot_h / 2.0
        );
        return svg;
    }

    let slot = plot_w / chart.counts.len() as f64;
    let bar_w = slot * 0.5;
    for (i, vc) in chart.counts.iter().enumerate() {
        let bar_h = plot_h * vc.count as f64 / max as f64;
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
        let label_x = x + bar_w / 2.0;
        let label_y = baseline + 8.0;
        let _ = write!(
            svg,
            r#"<rect class="bar" x="{x:.1}" y="{y:.1}" width="{bw:.1}" height="{bh:.1}"><title>{label}: {count}</title></rect>"#,
            x = x,
            y = baseline - bar_h,
            bw = bar_w,
            bh = bar_h,
            label = escape(&vc.value),
            count = vc.count
        );
        let _ = write!(
            svg,
            r#"<text class="tick" x="{lx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-90 {lx:.1} {ly:.1})">{label}</text>"#,
            lx = label_x,
            ly = label_y,
            label = escape(&vc.value)
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Render a self-contained HTML page with the 3x4 chart grid.
///
/// The template is filled with `replace` rather than `format!` so the CSS
/// braces need no escaping.
pub fn render_html(report: &Report) -> Result<String, AppError> {
    if report.charts.len() > GRID_ROWS * GRID_COLS {
        return Err(AppError::InternalError(format!(
            "{} charts do not fit a {}x{} grid",
            report.charts.len(),
            GRID_ROWS,
            GRID_COLS
        )));
    }

    let mut panels = String::new();
    for chart in &report.charts {
        let _ = write!(
            panels,
            r#"<figure class="panel"><figcaption>{}</figcaption>{}</figure>"#,
            escape(&chart.column),
            render_chart_svg(chart)
        );
    }

    let json = serde_json::to_string(report)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize report: {}", e)))?;

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Address Validation Report</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 16px; }
  header { padding-bottom: 8px; border-bottom: 1px solid #ddd; margin-bottom: 16px; }
  .muted { color: #777; font-size: 12px; }
  .grid { display: grid; grid-template-columns: repeat(__GRID_COLS__, 1fr); gap: 24px 16px; }
  .panel { margin: 0; }
  figcaption { font-weight: 600; font-size: 14px; text-align: center; margin-bottom: 4px; }
  .bar { fill: #1f77b4; }
  .axis { stroke: #333; stroke-width: 1; }
  .tick { font-size: 10px; fill: #333; }
</style>
</head>
<body>
<header>
  <h2>Address Validation Report</h2>
  <div class="muted">__ROWS__ rows &middot; generated __GENERATED__</div>
</header>
<div class="grid">__PANELS__</div>
<script id="report-data" type="application/json">__DATA__</script>
</body>
</html>
"#;

    Ok(TEMPLATE
        .replace("__GRID_COLS__", &GRID_COLS.to_string())
        .replace("__ROWS__", &report.total_rows.to_string())
        .replace("__GENERATED__", &escape(&report.generated_at))
        .replace("__PANELS__", &panels)
        .replace("__DATA__", &json.replace("</", "<\\/")))
}
