use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retmatch::{
    detect_and_describe, keypoint_correspondences, render_correspondences, EngineConfig,
    GrayBuffer, KeypointParams, MatchStrategy, ProcessedImage, SimilarityEngine,
};

/// Random binary mask, dense enough in corners to exercise every stage of
/// the keypoint strategy.
fn speckle_mask(width: usize, height: usize, seed: u64) -> GrayBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height)
        .map(|_| if rng.random_bool(0.5) { 125 } else { 0 })
        .collect();
    GrayBuffer::new(data, width, height).unwrap()
}

fn keypoint_engine(params: KeypointParams) -> SimilarityEngine {
    SimilarityEngine::new().with_config(EngineConfig {
        strategy: MatchStrategy::Keypoint,
        keypoint: params,
        ..EngineConfig::default()
    })
}

#[test]
fn identical_busy_masks_match() {
    let mask = speckle_mask(96, 72, 11);
    let a = ProcessedImage::from_gray(mask.clone());
    let b = ProcessedImage::from_gray(mask);

    let result = keypoint_engine(KeypointParams::default())
        .compare(&a, &b)
        .unwrap();
    assert_eq!(result.strategy, MatchStrategy::Keypoint);
    assert!(result.is_match);
    assert!(result.score >= 10.0);
}

#[test]
fn featureless_side_yields_the_sentinel() {
    let busy = ProcessedImage::from_gray(speckle_mask(96, 72, 12));
    let flat = ProcessedImage::from_gray(GrayBuffer::filled(96, 72, 125).unwrap());

    let result = keypoint_engine(KeypointParams::default())
        .compare(&busy, &flat)
        .unwrap();
    assert!(result.score.is_nan());
    assert!(!result.is_match);
    assert!(result.is_degenerate());
}

#[test]
fn decision_bar_is_configurable() {
    let mask = speckle_mask(96, 72, 13);
    let a = ProcessedImage::from_gray(mask.clone());
    let b = ProcessedImage::from_gray(mask);

    let strict = KeypointParams {
        min_correspondences: usize::MAX,
        ..KeypointParams::default()
    };
    let result = keypoint_engine(strict).compare(&a, &b).unwrap();
    assert!(result.score >= 10.0);
    assert!(!result.is_match);
}

#[test]
fn zero_tolerance_discards_all_correspondences() {
    let mask = speckle_mask(96, 72, 14);
    let a = ProcessedImage::from_gray(mask.clone());
    let b = ProcessedImage::from_gray(mask);

    let params = KeypointParams {
        position_tolerance: 0,
        ..KeypointParams::default()
    };
    let result = keypoint_engine(params).compare(&a, &b).unwrap();
    assert_eq!(result.score, 0.0);
    assert!(!result.is_match);
    assert!(!result.is_degenerate());
}

#[test]
fn keypoint_budget_caps_detection() {
    let mask = speckle_mask(96, 72, 15);
    let params = KeypointParams {
        max_keypoints: 5,
        ..KeypointParams::default()
    };

    let (keypoints, descriptors) = detect_and_describe(mask.view(), &params);
    assert!(!keypoints.is_empty());
    assert!(keypoints.len() <= 5);
    assert_eq!(keypoints.len(), descriptors.len());
}

#[test]
fn identical_pair_correspondences_are_exact() {
    let mask = speckle_mask(96, 72, 16);
    let matches = keypoint_correspondences(mask.view(), mask.view(), &KeypointParams::default());

    assert!(!matches.correspondences.is_empty());
    // Self-matches score a distance of exactly zero, so nearly every keypoint
    // survives the index filter.
    assert!(matches.correspondences.len() * 10 >= matches.keypoints_a.len() * 9);
    for m in &matches.correspondences {
        assert!(m.query_idx.abs_diff(m.train_idx) < 10);
        assert!(m.distance <= f32::EPSILON);
    }
}

#[test]
fn correspondence_evidence_is_renderable() {
    let left = speckle_mask(64, 48, 17);
    let right = speckle_mask(80, 56, 18);

    let matches = keypoint_correspondences(left.view(), right.view(), &KeypointParams::default());
    let canvas = render_correspondences(left.view(), right.view(), &matches);
    assert_eq!(canvas.width(), 64 + 80);
    assert_eq!(canvas.height(), 56);
}
