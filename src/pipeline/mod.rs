//! The fixed preprocessing pipeline.
//!
//! Every raw input runs through the same ordered stages before any
//! comparison: intensity extraction with contrast enhancement, an ascending
//! median-filter sweep, adaptive mean thresholding, and a terminal cleanup
//! stage (morphology by default, a Sobel edge map as the alternative). The
//! order is part of the contract; thresholding a raw image or smoothing a
//! binary one produces very different masks.

mod colorspace;
mod contrast;
mod edges;
mod median;
mod morphology;
mod threshold;

pub use colorspace::rgb_to_hsv;
pub use contrast::{
    enhance, equalize_histogram, stretch_contrast, to_intensity, ColorMode, Enhancement,
};
pub use edges::sobel_magnitude;
pub use median::{median_filter, median_sweep};
pub use morphology::{close, dilate, erode, open, KernelShape, StructuringElement};
pub use threshold::adaptive_threshold;

use crate::image::{GrayBuffer, ImageView, RawImage};
use crate::trace::trace_span;
use crate::util::{RetMatchError, RetMatchResult};

/// Terminal cleanup stage selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalStage {
    /// Erode with one structuring element, then dilate with another.
    Morphology,
    /// Replace the mask with its Sobel gradient magnitude.
    EdgeMap,
}

/// Parameters of the preprocessing pipeline.
///
/// The defaults reproduce the tuning used for retinal vessel masks: double
/// gain contrast, a median sweep up to 31, a 23-pixel threshold block with
/// offset 12 writing 125 as foreground, and a 5/1 erode/dilate pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    pub color_mode: ColorMode,
    pub enhancement: Enhancement,
    /// Upper bound of the odd median kernel sweep.
    pub median_max_kernel: usize,
    pub threshold_block_size: usize,
    pub threshold_offset: i32,
    /// Foreground value written by the threshold stage.
    pub threshold_value: u8,
    pub morph_kernel_shape: KernelShape,
    pub morph_erode_size: usize,
    pub morph_dilate_size: usize,
    pub terminal: TerminalStage,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Luma,
            enhancement: Enhancement::default(),
            median_max_kernel: 31,
            threshold_block_size: 23,
            threshold_offset: 12,
            threshold_value: 125,
            morph_kernel_shape: KernelShape::Rect,
            morph_erode_size: 5,
            morph_dilate_size: 1,
            terminal: TerminalStage::Morphology,
        }
    }
}

/// Identifies a pipeline stage in diagnostic snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Contrast,
    Median,
    Threshold,
    Morphology,
    EdgeMap,
}

impl Stage {
    /// Short lowercase label, suitable for file names.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Contrast => "contrast",
            Stage::Median => "median",
            Stage::Threshold => "threshold",
            Stage::Morphology => "morphology",
            Stage::EdgeMap => "edges",
        }
    }
}

/// One intermediate output captured by [`Pipeline::process_stages`].
pub struct StageSnapshot {
    pub stage: Stage,
    pub image: GrayBuffer,
}

/// Output of the full pipeline.
///
/// Wrapping the buffer in a distinct type keeps half-processed images out of
/// the similarity engine. Dimensions always equal the raw input's.
pub struct ProcessedImage {
    image: GrayBuffer,
}

impl ProcessedImage {
    /// Wraps an already-processed buffer, bypassing the pipeline.
    pub fn from_gray(image: GrayBuffer) -> Self {
        Self { image }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.image.width()
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Returns a borrowed view of the processed pixels.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    /// Consumes the wrapper and returns the underlying buffer.
    pub fn into_gray(self) -> GrayBuffer {
        self.image
    }
}

/// Validated, ready-to-run preprocessing pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    erode_element: StructuringElement,
    dilate_element: StructuringElement,
}

impl Pipeline {
    /// Validates the configuration and prepares the structuring elements.
    pub fn new(config: PipelineConfig) -> RetMatchResult<Self> {
        if config.median_max_kernel == 0 || config.median_max_kernel % 2 == 0 {
            return Err(RetMatchError::InvalidKernelSize {
                size: config.median_max_kernel,
                reason: "sweep bound must be odd and at least 1",
            });
        }
        if config.threshold_block_size < 3 || config.threshold_block_size % 2 == 0 {
            return Err(RetMatchError::InvalidKernelSize {
                size: config.threshold_block_size,
                reason: "threshold block must be odd and at least 3",
            });
        }
        let erode_element =
            StructuringElement::new(config.morph_kernel_shape, config.morph_erode_size)?;
        let dilate_element =
            StructuringElement::new(config.morph_kernel_shape, config.morph_dilate_size)?;
        Ok(Self {
            config,
            erode_element,
            dilate_element,
        })
    }

    /// Returns the configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full stage chain on one raw image.
    pub fn process(&self, src: &RawImage) -> RetMatchResult<ProcessedImage> {
        let (processed, _) = self.run(src, false)?;
        Ok(processed)
    }

    /// Like [`Pipeline::process`], additionally capturing every intermediate
    /// stage output for inspection.
    pub fn process_stages(
        &self,
        src: &RawImage,
    ) -> RetMatchResult<(ProcessedImage, Vec<StageSnapshot>)> {
        self.run(src, true)
    }

    fn run(
        &self,
        src: &RawImage,
        capture: bool,
    ) -> RetMatchResult<(ProcessedImage, Vec<StageSnapshot>)> {
        let _span = trace_span!("pipeline", width = src.width(), height = src.height()).entered();
        let mut snapshots = Vec::new();

        let intensity = to_intensity(src, self.config.color_mode)?;
        let enhanced = enhance(intensity.view(), self.config.enhancement);
        if capture {
            snapshots.push(StageSnapshot {
                stage: Stage::Contrast,
                image: enhanced.clone(),
            });
        }

        let smoothed = median_sweep(enhanced.view(), self.config.median_max_kernel)?;
        if capture {
            snapshots.push(StageSnapshot {
                stage: Stage::Median,
                image: smoothed.clone(),
            });
        }

        let binary = adaptive_threshold(
            smoothed.view(),
            self.config.threshold_block_size,
            self.config.threshold_offset,
            self.config.threshold_value,
        )?;
        if capture {
            snapshots.push(StageSnapshot {
                stage: Stage::Threshold,
                image: binary.clone(),
            });
        }

        let (stage, cleaned) = match self.config.terminal {
            TerminalStage::Morphology => {
                let eroded = erode(binary.view(), &self.erode_element);
                let dilated = dilate(eroded.view(), &self.dilate_element);
                (Stage::Morphology, dilated)
            }
            TerminalStage::EdgeMap => (Stage::EdgeMap, sobel_magnitude(binary.view())),
        };
        if capture {
            snapshots.push(StageSnapshot {
                stage,
                image: cleaned.clone(),
            });
        }

        debug_assert_eq!(cleaned.width(), src.width());
        debug_assert_eq!(cleaned.height(), src.height());
        Ok((ProcessedImage { image: cleaned }, snapshots))
    }
}
