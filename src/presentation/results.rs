//! The result screen's state
//!
//! [`ResultsView`] holds the latest ranked result and renders the headline,
//! the table rows and the FPS label. It is only mutated by its owner; results
//! reach it as whole values and replace the previous set wholesale.

use serde::{Deserialize, Serialize};

use super::format::{fps_text, headline_text, row_text, ANALYZING_TEXT};
use crate::acquisition::ImageSource;
use crate::inference::{ClassificationResult, Observation, TOP_K};
use crate::utils::error::{Result, VisionError};

/// How many table rows a result set produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// At most this many rows
    Capped(usize),
    /// One row per observation
    Uncapped,
}

impl Default for RowPolicy {
    fn default() -> Self {
        RowPolicy::Capped(TOP_K)
    }
}

impl RowPolicy {
    pub fn row_count(&self, observations: usize) -> usize {
        match self {
            RowPolicy::Capped(cap) => observations.min(*cap),
            RowPolicy::Uncapped => observations,
        }
    }
}

/// Screen layouts the app ships with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenVariant {
    /// Still images only, top five listed
    Basic,
    /// Live camera, every observation listed
    LiveCamera,
    /// Live camera, top five listed, FPS shown
    #[default]
    Optimized,
}

impl ScreenVariant {
    pub fn row_policy(&self) -> RowPolicy {
        match self {
            ScreenVariant::LiveCamera => RowPolicy::Uncapped,
            ScreenVariant::Basic | ScreenVariant::Optimized => RowPolicy::Capped(TOP_K),
        }
    }

    pub fn shows_fps(&self) -> bool {
        matches!(self, ScreenVariant::Optimized)
    }

    pub fn supports_live(&self) -> bool {
        !matches!(self, ScreenVariant::Basic)
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "basic" => Ok(ScreenVariant::Basic),
            "live-camera" | "live" | "camera" => Ok(ScreenVariant::LiveCamera),
            "optimized" | "optimised" => Ok(ScreenVariant::Optimized),
            other => Err(VisionError::Config(format!("unknown screen variant '{}'", other))),
        }
    }
}

impl std::fmt::Display for ScreenVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScreenVariant::Basic => "basic",
            ScreenVariant::LiveCamera => "live-camera",
            ScreenVariant::Optimized => "optimized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Empty,
    Analyzing,
    Ready,
}

/// Latest result set plus what the screen shows for it
#[derive(Debug, Clone)]
pub struct ResultsView {
    variant: ScreenVariant,
    policy: RowPolicy,
    status: Status,
    result: Option<ClassificationResult>,
    source: Option<ImageSource>,
    fps: Option<f64>,
    updates: u64,
}

impl ResultsView {
    pub fn new(variant: ScreenVariant) -> Self {
        Self {
            variant,
            policy: variant.row_policy(),
            status: Status::Empty,
            result: None,
            source: None,
            fps: None,
            updates: 0,
        }
    }

    /// Override the variant's row policy
    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn variant(&self) -> ScreenVariant {
        self.variant
    }

    pub fn row_policy(&self) -> RowPolicy {
        self.policy
    }

    /// Show the analyzing message until the next result arrives
    pub fn begin_analysis(&mut self) {
        self.status = Status::Analyzing;
    }

    pub fn is_analyzing(&self) -> bool {
        self.status == Status::Analyzing
    }

    /// Replace the shown result set
    pub fn apply(&mut self, result: ClassificationResult, source: ImageSource, fps: Option<f64>) {
        self.result = Some(result);
        self.source = Some(source);
        self.fps = fps;
        self.status = Status::Ready;
        self.updates += 1;
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Number of results applied so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn observations(&self) -> &[Observation] {
        self.result
            .as_ref()
            .map(|r| r.observations.as_slice())
            .unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.policy.row_count(self.observations().len())
    }

    /// Text of table row `index`, `None` past the last row
    pub fn row_text(&self, index: usize) -> Option<String> {
        if index >= self.row_count() {
            return None;
        }
        self.observations().get(index).map(row_text)
    }

    pub fn rows(&self) -> Vec<String> {
        match &self.result {
            Some(result) => result.top_k(self.row_count()).iter().map(row_text).collect(),
            None => Vec::new(),
        }
    }

    pub fn headline(&self) -> String {
        match self.status {
            Status::Empty => String::new(),
            Status::Analyzing => ANALYZING_TEXT.to_string(),
            Status::Ready => self
                .observations()
                .first()
                .map(headline_text)
                .unwrap_or_default(),
        }
    }

    /// FPS label, for variants that show one and once a figure exists
    pub fn fps_text(&self) -> Option<String> {
        if !self.variant.shows_fps() {
            return None;
        }
        self.fps.map(fps_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(n: usize) -> ClassificationResult {
        let observations = (0..n)
            .map(|i| Observation::new(format!("label{}", i), 1.0 / (i as f32 + 2.0)))
            .collect();
        ClassificationResult::from_ranked(observations, Duration::from_millis(3)).unwrap()
    }

    #[test]
    fn test_row_count_policies() {
        for n in [1usize, 3, 5, 6, 1000] {
            let mut capped = ResultsView::new(ScreenVariant::Optimized);
            capped.apply(result(n), ImageSource::Shutter, None);
            assert_eq!(capped.row_count(), n.min(5));

            let mut basic = ResultsView::new(ScreenVariant::Basic);
            basic.apply(result(n), ImageSource::Shutter, None);
            assert_eq!(basic.row_count(), n.min(5));

            let mut uncapped = ResultsView::new(ScreenVariant::LiveCamera);
            uncapped.apply(result(n), ImageSource::LiveFeed(1), None);
            assert_eq!(uncapped.row_count(), n);
        }
    }

    #[test]
    fn test_live_camera_lists_every_observation() {
        let mut view = ResultsView::new(ScreenVariant::LiveCamera);
        assert_eq!(view.row_policy(), RowPolicy::Uncapped);
        view.apply(result(8), ImageSource::LiveFeed(3), None);

        assert_eq!(view.row_count(), 8);
        assert_eq!(view.rows().len(), 8);
        assert!(view.row_text(7).is_some());
        assert_eq!(view.row_text(8), None);
    }

    #[test]
    fn test_rows_follow_ranking() {
        let mut view = ResultsView::new(ScreenVariant::Basic);
        view.apply(result(8), ImageSource::Shutter, Some(12.5));

        let rows = view.rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "50.0%: label0");
        assert_eq!(rows[2], "25.0%: label2");
        assert_eq!(view.row_text(5), None);
        assert_eq!(view.fps_text(), None);
    }

    #[test]
    fn test_headline_lifecycle() {
        let mut view = ResultsView::new(ScreenVariant::Optimized);
        assert_eq!(view.headline(), "");

        view.begin_analysis();
        assert_eq!(view.headline(), "Analyzing Image…");

        let ranked = ClassificationResult::from_ranked(
            vec![Observation::new("tabby", 0.8734), Observation::new("lynx", 0.1)],
            Duration::from_millis(40),
        )
        .unwrap();
        view.apply(ranked, ImageSource::Shutter, Some(25.0));

        assert!(!view.is_analyzing());
        assert_eq!(view.headline(), "87% it's  tabby");
        assert_eq!(view.fps_text().as_deref(), Some("25.0 fps"));
        assert_eq!(view.updates(), 1);
    }

    #[test]
    fn test_new_result_replaces_old() {
        let mut view = ResultsView::new(ScreenVariant::Optimized);
        view.apply(result(6), ImageSource::LiveFeed(1), Some(10.0));
        view.apply(result(2), ImageSource::LiveFeed(2), None);

        assert_eq!(view.row_count(), 2);
        assert_eq!(view.source(), Some(&ImageSource::LiveFeed(2)));
        assert_eq!(view.fps_text(), None);
    }

    #[test]
    fn test_row_policy_override() {
        let mut view =
            ResultsView::new(ScreenVariant::LiveCamera).with_row_policy(RowPolicy::Capped(3));
        view.apply(result(10), ImageSource::Shutter, None);
        assert_eq!(view.row_count(), 3);
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!(ScreenVariant::parse("live_camera").unwrap(), ScreenVariant::LiveCamera);
        assert!(ScreenVariant::parse("fancy").is_err());
    }
}
