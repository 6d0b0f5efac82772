use sleeplog_core::{format_value, ChartSeries, MetricKind};

const BAR_WIDTH: usize = 24;

/// Renders one line per bar: label, scaled bar, display value.
pub fn render_series(series: &ChartSeries) -> String {
    let mut out = String::new();
    for bar in &series.bars {
        let filled = (bar.scaled_height_ratio * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        out.push_str(&format!(
            "{:<4}{}{} {}\n",
            bar.label,
            "█".repeat(filled),
            "·".repeat(BAR_WIDTH - filled),
            bar.display_value
        ));
    }
    out
}

pub fn format_hours(duration_secs: u64) -> String {
    format_value(duration_secs as f64, &MetricKind::Duration)
}
