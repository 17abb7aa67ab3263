//! Sparse keypoint comparison.
//!
//! Detection runs a FAST-9 segment test on every pyramid level, suppresses
//! clustered responses, and assigns each surviving corner an
//! intensity-centroid orientation. Descriptors are steered 8x8 patches,
//! mean-removed and scaled to unit norm. Matching is brute-force nearest
//! neighbor over descriptors, followed by an index-distance filter: both
//! keypoint lists are emitted in scan order, so correspondences whose list
//! positions differ wildly are discarded as structurally implausible.

use crate::image::pyramid::Pyramid;
use crate::image::{GrayBuffer, ImageView};
use crate::matching::{MatchResult, MatchStrategy};
use crate::trace::trace_event;
use crate::util::math::{bilinear_sample, plot_line};

/// Number of components in a descriptor.
pub const DESCRIPTOR_LEN: usize = 64;

const DESCRIPTOR_GRID: usize = 8;
const DESCRIPTOR_SPACING: f32 = 1.5;
const CENTROID_RADIUS: i32 = 5;
const FAST_BORDER: usize = 3;
const FAST_ARC: usize = 9;
const NORM_EPSILON: f32 = 1e-6;

/// Bresenham circle of radius 3, starting at the top and running clockwise.
const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Parameters for the keypoint strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeypointParams {
    /// Global cap on detections per image, strongest first.
    pub max_keypoints: usize,
    /// Pyramid depth; level `n` is downscaled by `2^n`.
    pub levels: usize,
    /// Minimum contrast between the center and the ring segment.
    pub corner_threshold: u8,
    /// Chebyshev radius for non-maximum suppression within a level.
    pub nms_radius: usize,
    /// Correspondences whose scan-order indices differ by at least this
    /// amount are discarded.
    pub position_tolerance: usize,
    /// Minimum surviving correspondences for a match verdict.
    pub min_correspondences: usize,
}

impl Default for KeypointParams {
    fn default() -> Self {
        Self {
            max_keypoints: 500,
            levels: 4,
            corner_threshold: 20,
            nms_radius: 3,
            position_tolerance: 10,
            min_correspondences: 10,
        }
    }
}

/// A detected scale-space feature.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    /// Column in base-image coordinates.
    pub x: f32,
    /// Row in base-image coordinates.
    pub y: f32,
    /// Pyramid level the detection came from.
    pub level: usize,
    /// Factor mapping level coordinates back to the base image.
    pub scale: f32,
    /// Dominant orientation in radians.
    pub orientation: f32,
    /// Corner strength from the segment test.
    pub response: f32,
}

/// Unit-norm local appearance vector sampled around a keypoint.
#[derive(Clone, Debug)]
pub struct Descriptor {
    values: [f32; DESCRIPTOR_LEN],
}

impl Descriptor {
    /// Wraps raw descriptor components.
    pub fn new(values: [f32; DESCRIPTOR_LEN]) -> Self {
        Self { values }
    }

    /// Returns the descriptor components.
    pub fn values(&self) -> &[f32; DESCRIPTOR_LEN] {
        &self.values
    }

    /// Squared Euclidean distance to another descriptor.
    pub fn distance_sq(&self, other: &Descriptor) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Pairing between keypoint list indices of two images.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Index into the first image's keypoint list.
    pub query_idx: usize,
    /// Index into the second image's keypoint list.
    pub train_idx: usize,
    /// Euclidean distance between the paired descriptors.
    pub distance: f32,
}

/// Keypoint-strategy evidence for one image pair.
pub struct KeypointMatches {
    pub keypoints_a: Vec<Keypoint>,
    pub keypoints_b: Vec<Keypoint>,
    /// Correspondences surviving the index-distance filter.
    pub correspondences: Vec<Correspondence>,
}

struct Corner {
    x: usize,
    y: usize,
    response: f32,
}

/// Detects keypoints across the pyramid and computes their descriptors.
///
/// Both lists come back in scan order: by level, then row, then column.
/// Entry `i` of each list describes the same feature.
pub fn detect_and_describe(
    img: ImageView<'_, u8>,
    params: &KeypointParams,
) -> (Vec<Keypoint>, Vec<Descriptor>) {
    let pyramid = Pyramid::build(img, params.levels);
    let mut features: Vec<(Keypoint, Descriptor)> = Vec::new();

    for (level, buffer) in pyramid.levels().iter().enumerate() {
        let view = buffer.view();
        let mut corners = detect_corners(view, params.corner_threshold);

        // Keep a few times the final budget so suppression still has
        // candidates to choose from.
        let cap = params.max_keypoints.saturating_mul(4);
        if corners.len() > cap {
            corners.sort_by(corner_cmp_desc);
            corners.truncate(cap);
        }
        let kept = suppress(corners, params.nms_radius);

        let scale = (1usize << level) as f32;
        for corner in kept {
            let orientation = intensity_centroid(view, corner.x, corner.y);
            let Some(descriptor) =
                sample_descriptor(view, corner.x as f32, corner.y as f32, orientation)
            else {
                continue;
            };
            let keypoint = Keypoint {
                x: corner.x as f32 * scale,
                y: corner.y as f32 * scale,
                level,
                scale,
                orientation,
                response: corner.response,
            };
            features.push((keypoint, descriptor));
        }
    }

    if features.len() > params.max_keypoints {
        features.sort_by(|a, b| {
            b.0.response
                .total_cmp(&a.0.response)
                .then_with(|| a.0.level.cmp(&b.0.level))
                .then_with(|| a.0.y.total_cmp(&b.0.y))
                .then_with(|| a.0.x.total_cmp(&b.0.x))
        });
        features.truncate(params.max_keypoints);
    }

    // Scan order makes list indices comparable across images.
    features.sort_by(|a, b| {
        a.0.level
            .cmp(&b.0.level)
            .then_with(|| a.0.y.total_cmp(&b.0.y))
            .then_with(|| a.0.x.total_cmp(&b.0.x))
    });

    features.into_iter().unzip()
}

/// Brute-force nearest-neighbor matching from `query` into `train`.
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor]) -> Vec<Correspondence> {
    let mut matches = Vec::with_capacity(query.len());
    if train.is_empty() {
        return matches;
    }
    for (query_idx, descriptor) in query.iter().enumerate() {
        let mut best_idx = 0usize;
        let mut best_dist = f32::INFINITY;
        for (train_idx, candidate) in train.iter().enumerate() {
            let dist = descriptor.distance_sq(candidate);
            if dist < best_dist {
                best_dist = dist;
                best_idx = train_idx;
            }
        }
        matches.push(Correspondence {
            query_idx,
            train_idx: best_idx,
            distance: best_dist.sqrt(),
        });
    }
    matches
}

/// Keeps correspondences whose list indices differ by less than `tolerance`.
pub fn filter_by_index_distance(
    matches: Vec<Correspondence>,
    tolerance: usize,
) -> Vec<Correspondence> {
    matches
        .into_iter()
        .filter(|m| m.query_idx.abs_diff(m.train_idx) < tolerance)
        .collect()
}

/// Runs the full keypoint strategy and returns all intermediate evidence.
pub fn keypoint_correspondences(
    a: ImageView<'_, u8>,
    b: ImageView<'_, u8>,
    params: &KeypointParams,
) -> KeypointMatches {
    let (keypoints_a, descriptors_a) = detect_and_describe(a, params);
    let (keypoints_b, descriptors_b) = detect_and_describe(b, params);
    let nearest = match_descriptors(&descriptors_a, &descriptors_b);
    let correspondences = filter_by_index_distance(nearest, params.position_tolerance);
    trace_event!(
        "keypoint_matches",
        left = keypoints_a.len(),
        right = keypoints_b.len(),
        kept = correspondences.len()
    );
    KeypointMatches {
        keypoints_a,
        keypoints_b,
        correspondences,
    }
}

pub(crate) fn compare_keypoint(
    a: ImageView<'_, u8>,
    b: ImageView<'_, u8>,
    params: &KeypointParams,
) -> MatchResult {
    let matches = keypoint_correspondences(a, b, params);
    if matches.keypoints_a.is_empty() || matches.keypoints_b.is_empty() {
        return MatchResult::degenerate(MatchStrategy::Keypoint);
    }
    let count = matches.correspondences.len();
    MatchResult {
        score: count as f32,
        is_match: count >= params.min_correspondences,
        strategy: MatchStrategy::Keypoint,
    }
}

/// Renders the pair side by side with lines joining matched keypoints.
pub fn render_correspondences(
    a: ImageView<'_, u8>,
    b: ImageView<'_, u8>,
    matches: &KeypointMatches,
) -> GrayBuffer {
    let width = a.width() + b.width();
    let height = a.height().max(b.height());
    let mut canvas = vec![0u8; width * height];

    for y in 0..a.height() {
        let row = a.row(y).expect("row within bounds for blit");
        canvas[y * width..y * width + a.width()].copy_from_slice(row);
    }
    for y in 0..b.height() {
        let row = b.row(y).expect("row within bounds for blit");
        let start = y * width + a.width();
        canvas[start..start + b.width()].copy_from_slice(row);
    }

    let offset = a.width() as i32;
    for m in &matches.correspondences {
        let Some(ka) = matches.keypoints_a.get(m.query_idx) else {
            continue;
        };
        let Some(kb) = matches.keypoints_b.get(m.train_idx) else {
            continue;
        };
        plot_line(
            ka.x.round() as i32,
            ka.y.round() as i32,
            kb.x.round() as i32 + offset,
            kb.y.round() as i32,
            &mut |x, y| {
                if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                    canvas[y as usize * width + x as usize] = 255;
                }
            },
        );
    }

    GrayBuffer::from_raw(canvas, width, height)
}

fn detect_corners(view: ImageView<'_, u8>, threshold: u8) -> Vec<Corner> {
    let width = view.width();
    let height = view.height();
    if width <= 2 * FAST_BORDER || height <= 2 * FAST_BORDER {
        return Vec::new();
    }

    let t = i16::from(threshold);
    let mut corners = Vec::new();
    for y in FAST_BORDER..height - FAST_BORDER {
        let rows: [&[u8]; 7] =
            std::array::from_fn(|i| view.row(y + i - 3).expect("ring row within bounds"));
        let center_row = rows[3];

        for x in FAST_BORDER..width - FAST_BORDER {
            let center = i16::from(center_row[x]);

            // Pre-test on the extreme ring points: a nine-long arc cannot
            // miss both points of an antipodal pair, so a corner has a
            // qualifying pixel in each of {top, bottom} and {left, right}.
            let top = i16::from(rows[0][x]);
            let right = i16::from(center_row[x + 3]);
            let bottom = i16::from(rows[6][x]);
            let left = i16::from(center_row[x - 3]);
            let high = center + t;
            let low = center - t;
            let may_be_bright = (top > high || bottom > high) && (left > high || right > high);
            let may_be_dark = (top < low || bottom < low) && (left < low || right < low);
            if !may_be_bright && !may_be_dark {
                continue;
            }

            let mut ring = [0i16; 16];
            for (i, &(dx, dy)) in CIRCLE_OFFSETS.iter().enumerate() {
                let row = rows[(dy + 3) as usize];
                ring[i] = i16::from(row[(x as i32 + dx) as usize]);
            }
            if let Some(response) = segment_response(center, &ring, t) {
                corners.push(Corner { x, y, response });
            }
        }
    }
    corners
}

/// FAST-9 segment test. Returns the corner strength when at least nine
/// contiguous ring pixels all sit above or all below the center band.
fn segment_response(center: i16, ring: &[i16; 16], t: i16) -> Option<f32> {
    let mut max_bright_run = 0usize;
    let mut max_dark_run = 0usize;
    let mut bright_run = 0usize;
    let mut dark_run = 0usize;

    // Double pass over the ring handles arcs that wrap past index 15.
    for i in 0..32 {
        let value = ring[i % 16];
        if value > center + t {
            bright_run += 1;
            max_bright_run = max_bright_run.max(bright_run);
        } else {
            bright_run = 0;
        }
        if value < center - t {
            dark_run += 1;
            max_dark_run = max_dark_run.max(dark_run);
        } else {
            dark_run = 0;
        }
    }

    if max_bright_run < FAST_ARC && max_dark_run < FAST_ARC {
        return None;
    }

    let mut sum_bright = 0i32;
    let mut sum_dark = 0i32;
    for &value in ring {
        sum_bright += i32::from((value - center - t).max(0));
        sum_dark += i32::from((center - value - t).max(0));
    }
    Some(sum_bright.max(sum_dark) as f32)
}

fn corner_cmp_desc(a: &Corner, b: &Corner) -> std::cmp::Ordering {
    b.response
        .total_cmp(&a.response)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Greedy non-maximum suppression over Chebyshev distance.
fn suppress(mut corners: Vec<Corner>, radius: usize) -> Vec<Corner> {
    corners.sort_by(corner_cmp_desc);
    if radius == 0 {
        return corners;
    }

    let mut kept: Vec<Corner> = Vec::new();
    'candidates: for corner in corners {
        for winner in &kept {
            if corner.x.abs_diff(winner.x) <= radius && corner.y.abs_diff(winner.y) <= radius {
                continue 'candidates;
            }
        }
        kept.push(corner);
    }
    kept
}

/// Orientation from first-order patch moments, after the intensity-centroid
/// method. Returns 0 for perfectly balanced patches.
fn intensity_centroid(view: ImageView<'_, u8>, cx: usize, cy: usize) -> f32 {
    let width = view.width() as i32;
    let height = view.height() as i32;
    let mut m10 = 0.0f32;
    let mut m01 = 0.0f32;

    for dy in -CENTROID_RADIUS..=CENTROID_RADIUS {
        let y = cy as i32 + dy;
        if y < 0 || y >= height {
            continue;
        }
        let row = view.row(y as usize).expect("patch row within bounds");
        for dx in -CENTROID_RADIUS..=CENTROID_RADIUS {
            let x = cx as i32 + dx;
            if x < 0 || x >= width {
                continue;
            }
            let value = f32::from(row[x as usize]);
            m10 += dx as f32 * value;
            m01 += dy as f32 * value;
        }
    }

    if m10 == 0.0 && m01 == 0.0 {
        0.0
    } else {
        m01.atan2(m10)
    }
}

/// Samples an 8x8 grid rotated by `orientation` around the keypoint, then
/// removes the mean and scales to unit norm. Returns `None` for patches with
/// no contrast. Samples beyond the border clamp to the nearest pixel.
fn sample_descriptor(
    view: ImageView<'_, u8>,
    x: f32,
    y: f32,
    orientation: f32,
) -> Option<Descriptor> {
    let (sin, cos) = orientation.sin_cos();
    let half = (DESCRIPTOR_GRID as f32 - 1.0) / 2.0;

    let mut values = [0.0f32; DESCRIPTOR_LEN];
    for (index, value) in values.iter_mut().enumerate() {
        let gx = (index % DESCRIPTOR_GRID) as f32 - half;
        let gy = (index / DESCRIPTOR_GRID) as f32 - half;
        let dx = gx * DESCRIPTOR_SPACING;
        let dy = gy * DESCRIPTOR_SPACING;
        let rx = cos * dx - sin * dy;
        let ry = sin * dx + cos * dy;
        *value = bilinear_sample(view, x + rx, y + ry);
    }

    let mean = values.iter().sum::<f32>() / DESCRIPTOR_LEN as f32;
    for value in values.iter_mut() {
        *value -= mean;
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm < NORM_EPSILON {
        return None;
    }
    for value in values.iter_mut() {
        *value /= norm;
    }
    Some(Descriptor { values })
}
