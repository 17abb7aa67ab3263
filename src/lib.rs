//! RetMatch decides whether two retinal fundus photographs show the same eye.
//!
//! Every input runs through a fixed preprocessing pipeline (contrast
//! enhancement, an ascending median sweep, adaptive thresholding and a
//! morphological cleanup) that isolates the vessel structure, and the
//! similarity engine scores the processed pair either by whole-image
//! correlation or by sparse keypoint correspondences. The two pipeline runs
//! can execute concurrently with the `rayon` feature; file loading and
//! saving live behind `image-io`.

mod compare;
pub mod image;
pub mod matching;
pub mod pipeline;
pub(crate) mod trace;
pub mod util;

pub use crate::compare::{compare_images, CompareConfig};
pub use crate::image::pyramid::Pyramid;
pub use crate::image::{GrayBuffer, ImageView, RawImage};
pub use crate::matching::keypoint::{
    detect_and_describe, filter_by_index_distance, keypoint_correspondences, match_descriptors,
    render_correspondences, Correspondence, Descriptor, Keypoint, KeypointMatches, KeypointParams,
    DESCRIPTOR_LEN,
};
pub use crate::matching::template::{TemplateMetric, TemplateParams};
pub use crate::matching::{EngineConfig, MatchResult, MatchStrategy, SimilarityEngine};
pub use crate::pipeline::{
    ColorMode, Enhancement, KernelShape, Pipeline, PipelineConfig, ProcessedImage, Stage,
    StageSnapshot, StructuringElement, TerminalStage,
};
pub use crate::util::{RetMatchError, RetMatchResult};

#[cfg(feature = "image-io")]
pub use crate::image::io;
