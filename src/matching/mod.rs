//! Similarity decision between two processed images.
//!
//! Exactly one strategy runs per comparison. The template strategy reduces
//! the pair to a single whole-image metric score; the keypoint strategy
//! counts filtered descriptor correspondences. Degenerate inputs yield a
//! sentinel result rather than an error.

pub mod keypoint;
pub mod template;

use crate::pipeline::ProcessedImage;
use crate::trace::{trace_event, trace_span};
use crate::util::RetMatchResult;
use keypoint::KeypointParams;
use template::TemplateParams;

/// Strategy selector for the similarity engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Whole-image template metric.
    Template,
    /// Sparse keypoint correspondence counting.
    Keypoint,
}

impl MatchStrategy {
    /// Short lowercase label.
    pub fn name(self) -> &'static str {
        match self {
            MatchStrategy::Template => "template",
            MatchStrategy::Keypoint => "keypoint",
        }
    }
}

impl Default for MatchStrategy {
    fn default() -> Self {
        MatchStrategy::Template
    }
}

/// Final decision record for one comparison.
#[derive(Clone, Copy, Debug)]
pub struct MatchResult {
    /// Raw similarity evidence on the active strategy's scale.
    pub score: f32,
    /// Verdict after applying the strategy's threshold to `score`.
    pub is_match: bool,
    /// Strategy that produced this result.
    pub strategy: MatchStrategy,
}

impl MatchResult {
    /// Sentinel for degenerate inputs (flat images, no detectable
    /// keypoints): a NaN score that is never a match.
    pub fn degenerate(strategy: MatchStrategy) -> Self {
        Self {
            score: f32::NAN,
            is_match: false,
            strategy,
        }
    }

    /// True when this result is the degenerate-input sentinel.
    pub fn is_degenerate(&self) -> bool {
        self.score.is_nan()
    }
}

/// Configuration for the similarity engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineConfig {
    pub strategy: MatchStrategy,
    pub template: TemplateParams,
    pub keypoint: KeypointParams,
}

/// Reduces two processed images to a match verdict.
pub struct SimilarityEngine {
    config: EngineConfig,
}

impl SimilarityEngine {
    /// Engine with the default template strategy.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scores a processed pair with the configured strategy.
    pub fn compare(
        &self,
        a: &ProcessedImage,
        b: &ProcessedImage,
    ) -> RetMatchResult<MatchResult> {
        let _span = trace_span!("compare", strategy = self.config.strategy.name()).entered();
        let result = match self.config.strategy {
            MatchStrategy::Template => {
                template::compare_template(a.view(), b.view(), &self.config.template)?
            }
            MatchStrategy::Keypoint => {
                keypoint::compare_keypoint(a.view(), b.view(), &self.config.keypoint)
            }
        };
        trace_event!(
            "decision",
            score = f64::from(result.score),
            is_match = result.is_match
        );
        Ok(result)
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}
