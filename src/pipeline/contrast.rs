//! Intensity extraction and contrast enhancement, the first pipeline stage.

use crate::image::{GrayBuffer, ImageView, RawImage};
use crate::pipeline::colorspace::rgb_to_hsv;
use crate::util::{RetMatchError, RetMatchResult};

/// How the working intensity channel is derived from the raw input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// Weighted RGB luma; single-channel inputs pass through unchanged.
    Luma,
    /// Convert to HSV and keep the value channel. Requires a color input.
    HsvValue,
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Luma
    }
}

/// Contrast enhancement applied to the intensity image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Enhancement {
    /// Per-pixel `v * gain + bias`, saturating at the byte range.
    LinearGain { gain: f32, bias: f32 },
    /// Classic histogram equalization over 256 bins.
    HistogramEqualization,
}

impl Default for Enhancement {
    fn default() -> Self {
        Enhancement::LinearGain {
            gain: 2.0,
            bias: 0.0,
        }
    }
}

/// Reduces a raw image to its working intensity channel.
pub fn to_intensity(src: &RawImage, mode: ColorMode) -> RetMatchResult<GrayBuffer> {
    match mode {
        ColorMode::Luma => {
            if src.channels() == 1 {
                return GrayBuffer::new(src.data().to_vec(), src.width(), src.height());
            }
            let mut out = Vec::with_capacity(src.width() * src.height());
            for px in src.data().chunks_exact(3) {
                let luma = 0.299 * f32::from(px[0])
                    + 0.587 * f32::from(px[1])
                    + 0.114 * f32::from(px[2]);
                out.push(luma.round() as u8);
            }
            Ok(GrayBuffer::from_raw(out, src.width(), src.height()))
        }
        ColorMode::HsvValue => {
            if src.channels() != 3 {
                return Err(RetMatchError::UnsupportedChannelCount {
                    operation: "hsv value extraction",
                    got: src.channels(),
                });
            }
            let hsv = rgb_to_hsv(src)?;
            let out = hsv.data().chunks_exact(3).map(|px| px[2]).collect();
            Ok(GrayBuffer::from_raw(out, src.width(), src.height()))
        }
    }
}

/// Applies the selected enhancement to an intensity image.
pub fn enhance(src: ImageView<'_, u8>, enhancement: Enhancement) -> GrayBuffer {
    match enhancement {
        Enhancement::LinearGain { gain, bias } => stretch_contrast(src, gain, bias),
        Enhancement::HistogramEqualization => equalize_histogram(src),
    }
}

/// Scales every pixel by `gain` and shifts by `bias`, saturating at `[0, 255]`.
pub fn stretch_contrast(src: ImageView<'_, u8>, gain: f32, bias: f32) -> GrayBuffer {
    let mut lut = [0u8; 256];
    for (bin, value) in lut.iter_mut().enumerate() {
        *value = (bin as f32 * gain + bias).round().clamp(0.0, 255.0) as u8;
    }
    map_lut(src, &lut)
}

/// Spreads the intensity histogram across the full byte range.
pub fn equalize_histogram(src: ImageView<'_, u8>) -> GrayBuffer {
    let total = src.width() * src.height();
    let mut histogram = [0usize; 256];
    for y in 0..src.height() {
        let row = src.row(y).expect("row within bounds for histogram");
        for &px in row {
            histogram[px as usize] += 1;
        }
    }

    let mut cdf = [0usize; 256];
    let mut run = 0usize;
    for (bin, count) in histogram.iter().enumerate() {
        run += count;
        cdf[bin] = run;
    }
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        // Single-valued image: equalization has nothing to spread.
        return GrayBuffer::from_view(src);
    }

    let scale = 255.0 / (total - cdf_min) as f32;
    let mut lut = [0u8; 256];
    for (bin, value) in lut.iter_mut().enumerate() {
        let shifted = cdf[bin].saturating_sub(cdf_min);
        *value = (shifted as f32 * scale).round() as u8;
    }
    map_lut(src, &lut)
}

fn map_lut(src: ImageView<'_, u8>, lut: &[u8; 256]) -> GrayBuffer {
    let mut data = Vec::with_capacity(src.width() * src.height());
    for y in 0..src.height() {
        let row = src.row(y).expect("row within bounds for lookup");
        data.extend(row.iter().map(|&px| lut[px as usize]));
    }
    GrayBuffer::from_raw(data, src.width(), src.height())
}
