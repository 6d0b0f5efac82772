//! Bar-series normalization.

/// One labelled raw value for a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayValue {
    pub label: String,
    pub raw_value: f64,
}

impl DayValue {
    pub fn new(label: impl Into<String>, raw_value: f64) -> Self {
        Self {
            label: label.into(),
            raw_value,
        }
    }
}

/// Which metric a series shows. Controls display formatting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKind {
    /// Raw values are seconds, displayed as `Hh Mm`.
    Duration,
    /// Raw values are scores, displayed as a rounded integer plus `unit`.
    Score { unit: String },
}

/// One renderable bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBar {
    pub label: String,
    pub raw_value: f64,
    /// Bar height relative to the tallest allowed bar, within `[0, 1]`.
    pub scaled_height_ratio: f64,
    pub display_value: String,
}

/// Normalized series for one week.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub bars: Vec<ChartBar>,
    /// Denominator used for every ratio in `bars`.
    pub max_value: f64,
}

/// Builds a normalized bar series.
///
/// `max_value` is the largest raw value, floored at `minimum_scale`, so an
/// all-zero week renders flat instead of dividing by zero.
///
/// Callers pass the seven days of one week in display order; the length is
/// not checked here.
pub fn build_series(values: &[DayValue], minimum_scale: f64, kind: &MetricKind) -> ChartSeries {
    let max_value = values
        .iter()
        .map(|value| value.raw_value)
        .filter(|value| value.is_finite())
        .fold(minimum_scale, f64::max);

    let bars = values
        .iter()
        .map(|value| ChartBar {
            label: value.label.clone(),
            raw_value: value.raw_value,
            scaled_height_ratio: scaled_ratio(value.raw_value, max_value),
            display_value: format_value(value.raw_value, kind),
        })
        .collect();

    ChartSeries { bars, max_value }
}

/// Formats one raw value the way its metric is displayed.
pub fn format_value(raw_value: f64, kind: &MetricKind) -> String {
    match kind {
        MetricKind::Duration => format_duration(raw_value),
        MetricKind::Score { unit } => {
            let score = if raw_value.is_finite() {
                raw_value.round() as i64
            } else {
                0
            };
            format!("{score}{unit}")
        }
    }
}

fn format_duration(raw_secs: f64) -> String {
    let total_secs = if raw_secs.is_finite() && raw_secs > 0.0 {
        raw_secs.round() as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    format!("{hours}h {minutes}m")
}

fn scaled_ratio(raw_value: f64, max_value: f64) -> f64 {
    if !(max_value.is_finite() && max_value > 0.0) || !raw_value.is_finite() {
        return 0.0;
    }
    (raw_value / max_value).clamp(0.0, 1.0)
}
