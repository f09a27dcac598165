//! Result presentation: headline, ranked rows and the FPS label

pub mod format;
pub mod results;

pub use format::{fps_text, headline_text, row_text, ANALYZING_TEXT};
pub use results::{ResultsView, RowPolicy, ScreenVariant};
