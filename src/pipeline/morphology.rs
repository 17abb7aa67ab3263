//! Morphological erosion and dilation, the terminal cleanup stage.
//!
//! Structuring elements live on a square grid with the anchor at
//! `size / 2`. Neighbors outside the image take the operation's neutral
//! element (255 for erosion, 0 for dilation), so border pixels are judged
//! only by the neighbors that exist.

use crate::image::{GrayBuffer, ImageView};
use crate::util::{RetMatchError, RetMatchResult};

/// Footprint shape of a structuring element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelShape {
    /// Every cell of the square grid is active.
    Rect,
    /// Cells inside the inscribed ellipse are active.
    Ellipse,
}

/// Neighborhood mask for erosion and dilation.
#[derive(Clone, Debug)]
pub struct StructuringElement {
    shape: KernelShape,
    size: usize,
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Builds a `size x size` element of the given shape.
    pub fn new(shape: KernelShape, size: usize) -> RetMatchResult<Self> {
        if size == 0 {
            return Err(RetMatchError::InvalidKernelSize {
                size,
                reason: "structuring element must span at least one pixel",
            });
        }

        let anchor = (size / 2) as i32;
        let mut offsets = Vec::new();
        match shape {
            KernelShape::Rect => {
                for j in 0..size as i32 {
                    for i in 0..size as i32 {
                        offsets.push((i - anchor, j - anchor));
                    }
                }
            }
            KernelShape::Ellipse => {
                // Row-span rasterization of the inscribed ellipse, matching
                // the usual half-size radius convention.
                let r = (size / 2) as i32;
                for j in 0..size as i32 {
                    let dy = j - r;
                    if dy.abs() > r {
                        continue;
                    }
                    let dx = if r > 0 {
                        let span = f64::from(r * r - dy * dy).sqrt();
                        span.round() as i32
                    } else {
                        0
                    };
                    let start = (r - dx).max(0);
                    let end = (r + dx + 1).min(size as i32);
                    for i in start..end {
                        offsets.push((i - anchor, j - anchor));
                    }
                }
            }
        }

        Ok(Self {
            shape,
            size,
            offsets,
        })
    }

    /// Returns the footprint shape.
    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    /// Returns the side length of the element grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of active cells.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns true if the element has no active cells.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub(crate) fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

/// Replaces each pixel with the minimum over the element's neighborhood.
pub fn erode(src: ImageView<'_, u8>, element: &StructuringElement) -> GrayBuffer {
    apply(src, element, u8::MAX, |acc, v| acc.min(v))
}

/// Replaces each pixel with the maximum over the element's neighborhood.
pub fn dilate(src: ImageView<'_, u8>, element: &StructuringElement) -> GrayBuffer {
    apply(src, element, 0, |acc, v| acc.max(v))
}

/// Erosion followed by dilation with the same element.
pub fn open(src: ImageView<'_, u8>, element: &StructuringElement) -> GrayBuffer {
    let eroded = erode(src, element);
    dilate(eroded.view(), element)
}

/// Dilation followed by erosion with the same element.
pub fn close(src: ImageView<'_, u8>, element: &StructuringElement) -> GrayBuffer {
    let dilated = dilate(src, element);
    erode(dilated.view(), element)
}

fn apply(
    src: ImageView<'_, u8>,
    element: &StructuringElement,
    neutral: u8,
    fold: impl Fn(u8, u8) -> u8,
) -> GrayBuffer {
    let width = src.width() as i32;
    let height = src.height() as i32;

    let mut data = Vec::with_capacity(src.width() * src.height());
    for y in 0..height {
        for x in 0..width {
            let mut acc = neutral;
            for &(dx, dy) in element.offsets() {
                let sx = x + dx;
                let sy = y + dy;
                if sx < 0 || sy < 0 || sx >= width || sy >= height {
                    continue;
                }
                let row = src.row(sy as usize).expect("neighbor row within bounds");
                acc = fold(acc, row[sx as usize]);
            }
            data.push(acc);
        }
    }
    GrayBuffer::from_raw(data, src.width(), src.height())
}

#[cfg(test)]
mod tests {
    use super::{close, dilate, erode, open, KernelShape, StructuringElement};
    use crate::image::ImageView;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn rect_element_fills_the_grid() {
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();
        assert_eq!(element.len(), 9);
        assert_eq!(element.size(), 3);
    }

    #[test]
    fn ellipse_three_is_a_cross() {
        let element = StructuringElement::new(KernelShape::Ellipse, 3).unwrap();
        let mut offsets: Vec<_> = element.offsets().to_vec();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn ellipse_one_is_a_single_pixel() {
        let element = StructuringElement::new(KernelShape::Ellipse, 1).unwrap();
        assert_eq!(element.offsets(), &[(0, 0)]);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(StructuringElement::new(KernelShape::Rect, 0).is_err());
    }

    #[test]
    fn erosion_removes_lone_pixels() {
        let mut data = vec![0u8; 25];
        data[12] = 255;
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();
        let out = erode(view, &element);
        assert!(out.data().iter().all(|&px| px == 0));
    }

    #[test]
    fn dilation_grows_lone_pixels_to_the_footprint() {
        let mut data = vec![0u8; 25];
        data[12] = 255;
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();
        let out = dilate(view, &element);

        for y in 0..5usize {
            for x in 0..5usize {
                let inside = (1..=3).contains(&x) && (1..=3).contains(&y);
                let expected = if inside { 255 } else { 0 };
                assert_eq!(out.data()[y * 5 + x], expected, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn even_elements_grow_toward_the_anchor_side() {
        let mut data = vec![0u8; 36];
        data[2 * 6 + 2] = 255;
        let view = ImageView::from_slice(&data, 6, 6).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 2).unwrap();
        let out = dilate(view, &element);

        let mut lit: Vec<_> = (0..36).filter(|&i| out.data()[i] == 255).collect();
        lit.sort_unstable();
        assert_eq!(lit, vec![2 * 6 + 2, 2 * 6 + 3, 3 * 6 + 2, 3 * 6 + 3]);
    }

    #[test]
    fn constant_images_are_fixed_points() {
        let data = vec![100u8; 49];
        let view = ImageView::from_slice(&data, 7, 7).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();
        assert_eq!(erode(view, &element).data(), &data[..]);
        assert_eq!(dilate(view, &element).data(), &data[..]);
    }

    #[test]
    fn erosion_shrinks_and_dilation_grows_foreground() {
        let mut rng = StdRng::seed_from_u64(11);
        let width = 16;
        let height = 12;
        let mut data = vec![0u8; width * height];
        for value in data.iter_mut() {
            if rng.random_range(0..4) == 0 {
                *value = 255;
            }
        }
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();

        let foreground = |pixels: &[u8]| pixels.iter().filter(|&&px| px == 255).count();
        let original = foreground(&data);
        assert!(foreground(erode(view, &element).data()) <= original);
        assert!(foreground(dilate(view, &element).data()) >= original);
    }

    #[test]
    fn opening_never_exceeds_plain_dilation() {
        let mut rng = StdRng::seed_from_u64(17);
        let width = 16;
        let height = 12;
        let mut data = vec![0u8; width * height];
        for value in data.iter_mut() {
            if rng.random_range(0..3) == 0 {
                *value = 255;
            }
        }
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();

        let foreground = |pixels: &[u8]| pixels.iter().filter(|&&px| px == 255).count();
        let opened = foreground(open(view, &element).data());
        let dilated = foreground(dilate(view, &element).data());
        assert!(opened <= dilated);
    }

    #[test]
    fn closing_fills_single_pixel_holes() {
        let mut data = vec![255u8; 25];
        data[12] = 0;
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        let element = StructuringElement::new(KernelShape::Rect, 3).unwrap();
        let out = close(view, &element);
        assert!(out.data().iter().all(|&px| px == 255));
    }
}
