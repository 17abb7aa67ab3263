//! End-to-end comparison of two raw photographs.

use crate::image::RawImage;
use crate::matching::{EngineConfig, MatchResult, SimilarityEngine};
use crate::pipeline::{Pipeline, PipelineConfig, ProcessedImage};
use crate::trace::trace_span;
use crate::util::RetMatchResult;

/// Configuration for a full comparison run.
#[derive(Clone, Copy, Debug)]
pub struct CompareConfig {
    pub pipeline: PipelineConfig,
    pub engine: EngineConfig,
    /// Preprocess the two images on separate threads. Requires the `rayon`
    /// feature; without it the flag is ignored.
    pub parallel: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            engine: EngineConfig::default(),
            parallel: true,
        }
    }
}

/// Pushes both images through the preprocessing pipeline and scores the
/// processed pair with the configured strategy.
///
/// The two pipeline runs are independent of each other; with the `rayon`
/// feature and `parallel` set they execute concurrently via `rayon::join`.
pub fn compare_images(
    a: &RawImage,
    b: &RawImage,
    config: &CompareConfig,
) -> RetMatchResult<MatchResult> {
    let _span = trace_span!("compare_images", parallel = config.parallel).entered();
    let pipeline = Pipeline::new(config.pipeline)?;
    let (processed_a, processed_b) = preprocess_pair(&pipeline, a, b, config.parallel)?;
    SimilarityEngine::new()
        .with_config(config.engine)
        .compare(&processed_a, &processed_b)
}

#[cfg(feature = "rayon")]
fn preprocess_pair(
    pipeline: &Pipeline,
    a: &RawImage,
    b: &RawImage,
    parallel: bool,
) -> RetMatchResult<(ProcessedImage, ProcessedImage)> {
    if parallel {
        let (left, right) = rayon::join(|| pipeline.process(a), || pipeline.process(b));
        Ok((left?, right?))
    } else {
        Ok((pipeline.process(a)?, pipeline.process(b)?))
    }
}

#[cfg(not(feature = "rayon"))]
fn preprocess_pair(
    pipeline: &Pipeline,
    a: &RawImage,
    b: &RawImage,
    _parallel: bool,
) -> RetMatchResult<(ProcessedImage, ProcessedImage)> {
    Ok((pipeline.process(a)?, pipeline.process(b)?))
}
