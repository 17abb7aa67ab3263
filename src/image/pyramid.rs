//! Scale-space pyramid for multi-scale keypoint detection.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`.

use crate::image::{GrayBuffer, ImageView};

/// Owned image pyramid built by repeated 2x halving of a base level.
pub struct Pyramid {
    levels: Vec<GrayBuffer>,
}

impl Pyramid {
    /// Builds a pyramid from a base grayscale view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present; halving stops once a dimension would drop below one pixel.
    pub fn build(base: ImageView<'_, u8>, max_levels: usize) -> Self {
        let max_levels = max_levels.max(1);
        let mut levels = Vec::with_capacity(max_levels);
        levels.push(GrayBuffer::from_view(base));

        while levels.len() < max_levels {
            let src = levels.last().expect("levels is not empty").view();
            if src.width() < 2 || src.height() < 2 {
                break;
            }

            let dst_width = src.width() / 2;
            let dst_height = src.height() / 2;
            let mut dst = vec![0u8; dst_width * dst_height];

            for y in 0..dst_height {
                let row0 = src.row(y * 2).expect("source row within bounds");
                let row1 = src.row(y * 2 + 1).expect("source row within bounds");
                for x in 0..dst_width {
                    let sum = u16::from(row0[2 * x])
                        + u16::from(row0[2 * x + 1])
                        + u16::from(row1[2 * x])
                        + u16::from(row1[2 * x + 1]);
                    dst[y * dst_width + x] = ((sum + 2) / 4) as u8;
                }
            }

            levels.push(GrayBuffer::from_raw(dst, dst_width, dst_height));
        }

        Self { levels }
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[GrayBuffer] {
        &self.levels
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(|level| level.view())
    }
}
