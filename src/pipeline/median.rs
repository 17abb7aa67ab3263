//! Median filtering, the smoothing stage of the pipeline.
//!
//! The filter runs a per-row sliding histogram so the cost per pixel stays
//! proportional to the kernel height rather than its area. Borders replicate
//! the nearest edge pixel, so the window always holds `kernel * kernel`
//! samples.

use crate::image::{GrayBuffer, ImageView};
use crate::util::{RetMatchError, RetMatchResult};

/// Applies one square median filter of the given odd size.
pub fn median_filter(src: ImageView<'_, u8>, kernel: usize) -> RetMatchResult<GrayBuffer> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(RetMatchError::InvalidKernelSize {
            size: kernel,
            reason: "median kernel must be odd and at least 1",
        });
    }
    if kernel == 1 {
        return Ok(GrayBuffer::from_view(src));
    }

    let width = src.width();
    let height = src.height();
    let radius = (kernel / 2) as i32;
    let window = (kernel * kernel) as u32;
    let rank = window / 2 + 1;

    let clamp_x = |x: i32| x.clamp(0, width as i32 - 1) as usize;
    let clamp_y = |y: i32| y.clamp(0, height as i32 - 1) as usize;

    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let rows: Vec<&[u8]> = (-radius..=radius)
            .map(|dy| {
                src.row(clamp_y(y as i32 + dy))
                    .expect("clamped row within bounds")
            })
            .collect();

        let mut histogram = [0u32; 256];
        for row in &rows {
            for dx in -radius..=radius {
                histogram[row[clamp_x(dx)] as usize] += 1;
            }
        }
        data.push(histogram_select(&histogram, rank));

        for x in 1..width {
            let x = x as i32;
            for row in &rows {
                histogram[row[clamp_x(x - 1 - radius)] as usize] -= 1;
                histogram[row[clamp_x(x + radius)] as usize] += 1;
            }
            data.push(histogram_select(&histogram, rank));
        }
    }

    Ok(GrayBuffer::from_raw(data, width, height))
}

/// Runs [`median_filter`] repeatedly with kernel sizes 1, 3, 5, ... up to
/// `max_kernel` inclusive, feeding each pass the previous output.
pub fn median_sweep(src: ImageView<'_, u8>, max_kernel: usize) -> RetMatchResult<GrayBuffer> {
    if max_kernel == 0 || max_kernel % 2 == 0 {
        return Err(RetMatchError::InvalidKernelSize {
            size: max_kernel,
            reason: "sweep bound must be odd and at least 1",
        });
    }

    let mut current = GrayBuffer::from_view(src);
    let mut kernel = 1;
    while kernel <= max_kernel {
        current = median_filter(current.view(), kernel)?;
        kernel += 2;
    }
    Ok(current)
}

/// Returns the bin holding the sample with the given 1-based rank.
fn histogram_select(histogram: &[u32; 256], rank: u32) -> u8 {
    let mut seen = 0u32;
    for (bin, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= rank {
            return bin as u8;
        }
    }
    255
}
