//! Text formatting for the result screen

use crate::inference::Observation;

/// Headline shown while a still image is being classified
pub const ANALYZING_TEXT: &str = "Analyzing Image…";

/// Shortest float rendering that always keeps a decimal point
///
/// `25.0` stays `25.0`, `87.34` stays `87.34`.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Same as [`format_float`] for single precision values
pub fn format_float32(value: f32) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Whole-percent headline for the top observation: `87% it's  tabby`
pub fn headline_text(top: &Observation) -> String {
    let percent = (top.confidence * 100.0).floor() as i64;
    format!("{}% it's  {}", percent, top.label)
}

/// Table row: `87.34%: tabby`
pub fn row_text(observation: &Observation) -> String {
    format!(
        "{}%: {}",
        format_float32(observation.confidence * 100.0),
        observation.label
    )
}

/// FPS label: `25.0 fps`
pub fn fps_text(fps: f64) -> String {
    format!("{} fps", format_float(fps))
}
