//! Adaptive mean thresholding, the binarization stage.
//!
//! Each pixel is compared against the mean of its surrounding block minus a
//! constant offset; pixels above that local bar become the configured
//! foreground value, everything else becomes 0. Blocks are clamped at the
//! borders, so edge pixels use a smaller neighborhood mean.

use crate::image::{GrayBuffer, ImageView};
use crate::util::math::{box_sum, integral_image};
use crate::util::{RetMatchError, RetMatchResult};

/// Binarizes `src` against local block means.
///
/// `block_size` must be odd and at least 3. A positive `offset` lowers the
/// local bar and admits more foreground.
pub fn adaptive_threshold(
    src: ImageView<'_, u8>,
    block_size: usize,
    offset: i32,
    value: u8,
) -> RetMatchResult<GrayBuffer> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(RetMatchError::InvalidKernelSize {
            size: block_size,
            reason: "threshold block must be odd and at least 3",
        });
    }

    let width = src.width();
    let height = src.height();
    let radius = block_size / 2;
    let table = integral_image(src);

    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        let row = src.row(y).expect("row within bounds for threshold");
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
            let mean = box_sum(&table, width, x0, y0, x1, y1) as f64 / area;
            let bar = mean - f64::from(offset);
            data.push(if f64::from(row[x]) > bar { value } else { 0 });
        }
    }
    Ok(GrayBuffer::from_raw(data, width, height))
}
