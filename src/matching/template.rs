//! Whole-image template comparison.
//!
//! When the two processed images share dimensions the metric reduces to a
//! single score. Otherwise the smaller image slides over the larger one and
//! the best window wins: the maximum for correlation, the minimum for
//! squared difference.

use crate::image::ImageView;
use crate::matching::{MatchResult, MatchStrategy};
use crate::util::{RetMatchError, RetMatchResult};

/// Template metric family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateMetric {
    /// Zero-mean normalized cross-correlation. Scores live in `[-1, 1]`,
    /// higher is more similar.
    NormedCorrelation,
    /// Raw sum of squared differences. Unbounded, lower is more similar.
    SquaredDifference,
}

/// Parameters for the template strategy.
///
/// The two metrics score on unrelated scales, so `threshold` is only
/// meaningful together with `metric`; the constructors keep the pairing
/// honest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateParams {
    pub metric: TemplateMetric,
    /// Decision bar on the metric's own scale. Correlation matches at
    /// `score >= threshold`, squared difference at `score <= threshold`.
    pub threshold: f32,
    /// Variance floor below which correlation inputs count as degenerate.
    /// The difference metric ignores it.
    pub min_variance: f32,
}

impl TemplateParams {
    /// Normalized correlation with the 0.5 decision bar.
    pub fn normed_correlation() -> Self {
        Self {
            metric: TemplateMetric::NormedCorrelation,
            threshold: 0.5,
            min_variance: 1e-6,
        }
    }

    /// Raw squared difference with the 5.0 decision bar. On this scale only
    /// near-identical masks pass.
    pub fn squared_difference() -> Self {
        Self {
            metric: TemplateMetric::SquaredDifference,
            threshold: 5.0,
            min_variance: 1e-6,
        }
    }
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self::normed_correlation()
    }
}

pub(crate) fn compare_template(
    a: ImageView<'_, u8>,
    b: ImageView<'_, u8>,
    params: &TemplateParams,
) -> RetMatchResult<MatchResult> {
    let floor = f64::from(params.min_variance);
    let score = if a.width() == b.width() && a.height() == b.height() {
        match params.metric {
            TemplateMetric::NormedCorrelation => zncc_pair(a, b, floor),
            TemplateMetric::SquaredDifference => Some(ssd_pair(a, b)),
        }
    } else if fits_inside(a, b) {
        slide(a, b, params.metric, floor)
    } else if fits_inside(b, a) {
        slide(b, a, params.metric, floor)
    } else {
        return Err(RetMatchError::DimensionMismatch {
            width_a: a.width(),
            height_a: a.height(),
            width_b: b.width(),
            height_b: b.height(),
        });
    };

    let result = match score {
        Some(value) => {
            let score = value as f32;
            let is_match = match params.metric {
                TemplateMetric::NormedCorrelation => score >= params.threshold,
                TemplateMetric::SquaredDifference => score <= params.threshold,
            };
            MatchResult {
                score,
                is_match,
                strategy: MatchStrategy::Template,
            }
        }
        None => MatchResult::degenerate(MatchStrategy::Template),
    };
    Ok(result)
}

fn fits_inside(inner: ImageView<'_, u8>, outer: ImageView<'_, u8>) -> bool {
    inner.width() <= outer.width() && inner.height() <= outer.height()
}

fn row_of(view: ImageView<'_, u8>, y: usize) -> &[u8] {
    view.row(y).expect("row within bounds for scan")
}

/// Correlation of two equally sized views; `None` when either side is flat.
fn zncc_pair(a: ImageView<'_, u8>, b: ImageView<'_, u8>, floor: f64) -> Option<f64> {
    let count = (a.width() * a.height()) as f64;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut sum_sq_a = 0.0f64;
    let mut sum_sq_b = 0.0f64;
    let mut dot = 0.0f64;

    for y in 0..a.height() {
        let row_a = row_of(a, y);
        let row_b = row_of(b, y);
        for (&pa, &pb) in row_a.iter().zip(row_b) {
            let va = f64::from(pa);
            let vb = f64::from(pb);
            sum_a += va;
            sum_b += vb;
            sum_sq_a += va * va;
            sum_sq_b += vb * vb;
            dot += va * vb;
        }
    }

    let var_a = sum_sq_a - sum_a * sum_a / count;
    let var_b = sum_sq_b - sum_b * sum_b / count;
    if var_a <= floor || var_b <= floor {
        return None;
    }
    let numerator = dot - sum_a * sum_b / count;
    Some(numerator / (var_a * var_b).sqrt())
}

/// Sum of squared differences of two equally sized views.
fn ssd_pair(a: ImageView<'_, u8>, b: ImageView<'_, u8>) -> f64 {
    let mut sum = 0.0f64;
    for y in 0..a.height() {
        let row_a = row_of(a, y);
        let row_b = row_of(b, y);
        for (&pa, &pb) in row_a.iter().zip(row_b) {
            let diff = f64::from(pa) - f64::from(pb);
            sum += diff * diff;
        }
    }
    sum
}

/// Slides `tpl` over every window of `img` and returns the best score.
fn slide(
    tpl: ImageView<'_, u8>,
    img: ImageView<'_, u8>,
    metric: TemplateMetric,
    floor: f64,
) -> Option<f64> {
    match metric {
        TemplateMetric::NormedCorrelation => zncc_slide(tpl, img, floor),
        TemplateMetric::SquaredDifference => Some(ssd_slide(tpl, img)),
    }
}

fn zncc_slide(tpl: ImageView<'_, u8>, img: ImageView<'_, u8>, floor: f64) -> Option<f64> {
    let tpl_w = tpl.width();
    let tpl_h = tpl.height();
    let count = (tpl_w * tpl_h) as f64;

    // Zero-mean template, precomputed once.
    let mut sum_t = 0.0f64;
    for y in 0..tpl_h {
        for &px in row_of(tpl, y) {
            sum_t += f64::from(px);
        }
    }
    let mean_t = sum_t / count;
    let mut t_prime = Vec::with_capacity(tpl_w * tpl_h);
    let mut var_t = 0.0f64;
    for y in 0..tpl_h {
        for &px in row_of(tpl, y) {
            let centered = f64::from(px) - mean_t;
            var_t += centered * centered;
            t_prime.push(centered);
        }
    }
    if var_t <= floor {
        return None;
    }

    let mut best: Option<f64> = None;
    for y in 0..=img.height() - tpl_h {
        for x in 0..=img.width() - tpl_w {
            let mut dot = 0.0f64;
            let mut sum_i = 0.0f64;
            let mut sum_sq_i = 0.0f64;
            for ty in 0..tpl_h {
                let row = &row_of(img, y + ty)[x..x + tpl_w];
                let base = ty * tpl_w;
                for (tx, &px) in row.iter().enumerate() {
                    let value = f64::from(px);
                    dot += t_prime[base + tx] * value;
                    sum_i += value;
                    sum_sq_i += value * value;
                }
            }
            let var_i = sum_sq_i - sum_i * sum_i / count;
            if var_i <= floor {
                continue;
            }
            let score = dot / (var_t * var_i).sqrt();
            if best.map_or(true, |current| score > current) {
                best = Some(score);
            }
        }
    }
    best
}

fn ssd_slide(tpl: ImageView<'_, u8>, img: ImageView<'_, u8>) -> f64 {
    let tpl_w = tpl.width();
    let tpl_h = tpl.height();

    let mut best = f64::INFINITY;
    for y in 0..=img.height() - tpl_h {
        for x in 0..=img.width() - tpl_w {
            let mut sum = 0.0f64;
            for ty in 0..tpl_h {
                let window = &row_of(img, y + ty)[x..x + tpl_w];
                let tpl_row = row_of(tpl, ty);
                for (&pt, &pi) in tpl_row.iter().zip(window) {
                    let diff = f64::from(pt) - f64::from(pi);
                    sum += diff * diff;
                }
            }
            if sum < best {
                best = sum;
            }
        }
    }
    best
}
