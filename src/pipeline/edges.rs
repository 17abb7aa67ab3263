//! Sobel edge magnitude, the alternative terminal stage.

use crate::image::{GrayBuffer, ImageView};

/// Computes the 3x3 Sobel gradient magnitude, saturated to the byte range.
/// Borders replicate the nearest edge pixel.
pub fn sobel_magnitude(src: ImageView<'_, u8>) -> GrayBuffer {
    let width = src.width();
    let height = src.height();
    let sample = |x: i32, y: i32| -> i32 {
        let sx = x.clamp(0, width as i32 - 1) as usize;
        let sy = y.clamp(0, height as i32 - 1) as usize;
        i32::from(src.row(sy).expect("clamped row within bounds")[sx])
    };

    let mut data = Vec::with_capacity(width * height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let tl = sample(x - 1, y - 1);
            let tc = sample(x, y - 1);
            let tr = sample(x + 1, y - 1);
            let ml = sample(x - 1, y);
            let mr = sample(x + 1, y);
            let bl = sample(x - 1, y + 1);
            let bc = sample(x, y + 1);
            let br = sample(x + 1, y + 1);

            let gx = (tr + 2 * mr + br) - (tl + 2 * ml + bl);
            let gy = (bl + 2 * bc + br) - (tl + 2 * tc + tr);
            let magnitude = f64::from(gx * gx + gy * gy).sqrt().round() as i64;
            data.push(magnitude.min(255) as u8);
        }
    }
    GrayBuffer::from_raw(data, width, height)
}

#[cfg(test)]
mod tests {
    use super::sobel_magnitude;
    use crate::image::ImageView;

    #[test]
    fn flat_images_have_no_edges() {
        let data = vec![140u8; 36];
        let view = ImageView::from_slice(&data, 6, 6).unwrap();
        let out = sobel_magnitude(view);
        assert!(out.data().iter().all(|&px| px == 0));
    }

    #[test]
    fn vertical_step_fires_on_adjacent_columns() {
        let width = 8;
        let height = 5;
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 4..width {
                data[y * width + x] = 200;
            }
        }
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let out = sobel_magnitude(view);

        for y in 0..height {
            assert_eq!(out.data()[y * width + 3], 255);
            assert_eq!(out.data()[y * width + 4], 255);
            assert_eq!(out.data()[y * width + 1], 0);
            assert_eq!(out.data()[y * width + 6], 0);
        }
    }

    #[test]
    fn horizontal_step_mirrors_the_vertical_case() {
        let width = 5;
        let height = 8;
        let mut data = vec![0u8; width * height];
        for y in 4..height {
            for x in 0..width {
                data[y * width + x] = 200;
            }
        }
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let out = sobel_magnitude(view);

        for x in 0..width {
            assert_eq!(out.data()[3 * width + x], 255);
            assert_eq!(out.data()[4 * width + x], 255);
            assert_eq!(out.data()[width + x], 0);
            assert_eq!(out.data()[6 * width + x], 0);
        }
    }
}
