//! Numeric helpers shared by the pipeline and the keypoint detector.

use crate::image::ImageView;

/// Samples `view` at a fractional position with bilinear interpolation.
/// Coordinates outside the image are clamped to the border.
pub(crate) fn bilinear_sample(view: ImageView<'_, u8>, x: f32, y: f32) -> f32 {
    let max_x = (view.width() - 1) as f32;
    let max_y = (view.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(view.width() - 1);
    let y1 = (y0 + 1).min(view.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = view.row(y0).expect("row within bounds for sampling");
    let bottom = view.row(y1).expect("row within bounds for sampling");
    let v00 = top[x0] as f32;
    let v10 = top[x1] as f32;
    let v01 = bottom[x0] as f32;
    let v11 = bottom[x1] as f32;

    let upper = v00 + (v10 - v00) * fx;
    let lower = v01 + (v11 - v01) * fx;
    upper + (lower - upper) * fy
}

/// Builds a summed-area table with one extra zero row and column, so the
/// entry at `(x + 1, y + 1)` holds the sum of all pixels in `[0..=x, 0..=y]`.
pub(crate) fn integral_image(view: ImageView<'_, u8>) -> Vec<u64> {
    let width = view.width();
    let height = view.height();
    let pitch = width + 1;
    let mut table = vec![0u64; pitch * (height + 1)];
    for y in 0..height {
        let row = view.row(y).expect("row within bounds for integral");
        let mut run = 0u64;
        for x in 0..width {
            run += u64::from(row[x]);
            table[(y + 1) * pitch + (x + 1)] = table[y * pitch + (x + 1)] + run;
        }
    }
    table
}

/// Sum over the inclusive pixel rectangle `[x0..=x1] x [y0..=y1]` of a table
/// produced by [`integral_image`] for an image of the given `width`.
pub(crate) fn box_sum(
    table: &[u64],
    width: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
) -> u64 {
    let pitch = width + 1;
    let a = table[y0 * pitch + x0];
    let b = table[y0 * pitch + (x1 + 1)];
    let c = table[(y1 + 1) * pitch + x0];
    let d = table[(y1 + 1) * pitch + (x1 + 1)];
    d + a - b - c
}

/// Rasterizes the line from `(x0, y0)` to `(x1, y1)` with Bresenham's
/// algorithm, invoking `plot` once per pixel including both endpoints.
pub(crate) fn plot_line(x0: i32, y0: i32, x1: i32, y1: i32, plot: &mut impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut x = x0;
    let mut y = y0;
    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{bilinear_sample, box_sum, integral_image, plot_line};
    use crate::image::ImageView;

    #[test]
    fn bilinear_is_exact_on_integer_coordinates() {
        let data = [10u8, 20, 30, 40];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert!((bilinear_sample(view, 0.0, 0.0) - 10.0).abs() < 1e-6);
        assert!((bilinear_sample(view, 1.0, 0.0) - 20.0).abs() < 1e-6);
        assert!((bilinear_sample(view, 0.0, 1.0) - 30.0).abs() < 1e-6);
        assert!((bilinear_sample(view, 1.0, 1.0) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn bilinear_interpolates_midpoints() {
        let data = [0u8, 100, 200, 100];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert!((bilinear_sample(view, 0.5, 0.0) - 50.0).abs() < 1e-4);
        assert!((bilinear_sample(view, 0.5, 0.5) - 100.0).abs() < 1e-4);
    }

    #[test]
    fn bilinear_clamps_outside_coordinates() {
        let data = [5u8, 9, 13, 17];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert!((bilinear_sample(view, -3.0, -3.0) - 5.0).abs() < 1e-6);
        assert!((bilinear_sample(view, 10.0, 10.0) - 17.0).abs() < 1e-6);
    }

    #[test]
    fn box_sum_matches_naive_sums() {
        let width = 5;
        let height = 4;
        let mut data = vec![0u8; width * height];
        for (index, value) in data.iter_mut().enumerate() {
            *value = (index * 3 % 251) as u8;
        }
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let table = integral_image(view);

        for y0 in 0..height {
            for x0 in 0..width {
                for y1 in y0..height {
                    for x1 in x0..width {
                        let mut naive = 0u64;
                        for y in y0..=y1 {
                            for x in x0..=x1 {
                                naive += u64::from(data[y * width + x]);
                            }
                        }
                        assert_eq!(box_sum(&table, width, x0, y0, x1, y1), naive);
                    }
                }
            }
        }
    }

    #[test]
    fn plot_line_covers_both_endpoints() {
        let mut points = Vec::new();
        plot_line(1, 1, 4, 3, &mut |x, y| points.push((x, y)));
        assert_eq!(points.first(), Some(&(1, 1)));
        assert_eq!(points.last(), Some(&(4, 3)));
        assert!(points.len() >= 4);
    }

    #[test]
    fn plot_line_draws_straight_horizontals() {
        let mut points = Vec::new();
        plot_line(2, 5, 6, 5, &mut |x, y| points.push((x, y)));
        assert_eq!(points, vec![(2, 5), (3, 5), (4, 5), (5, 5), (6, 5)]);
    }
}
