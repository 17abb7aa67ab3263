use retmatch::{
    ColorMode, Enhancement, Pipeline, PipelineConfig, RawImage, RetMatchError, Stage,
    TerminalStage,
};

/// Dark background crossed by one bright diagonal streak, in RGB.
fn fundus_like(width: usize, height: usize) -> RawImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let on_vessel = (y as i32 - (x / 2 + 8) as i32).abs() <= 1;
            let (r, g, b) = if on_vessel {
                (210u8, 140u8, 110u8)
            } else {
                (60u8, 25u8, 15u8)
            };
            data.extend_from_slice(&[r, g, b]);
        }
    }
    RawImage::new(data, width, height, 3).unwrap()
}

/// Small kernels keep the test runtime negligible.
fn small_config() -> PipelineConfig {
    PipelineConfig {
        median_max_kernel: 5,
        threshold_block_size: 11,
        morph_erode_size: 3,
        ..PipelineConfig::default()
    }
}

fn foreground_count(data: &[u8]) -> usize {
    data.iter().filter(|&&px| px != 0).count()
}

#[test]
fn pipeline_preserves_dimensions() {
    let raw = fundus_like(48, 36);
    let pipeline = Pipeline::new(small_config()).unwrap();

    let processed = pipeline.process(&raw).unwrap();
    assert_eq!(processed.width(), 48);
    assert_eq!(processed.height(), 36);
}

#[test]
fn snapshot_sequence_follows_stage_order() {
    let raw = fundus_like(48, 36);
    let pipeline = Pipeline::new(small_config()).unwrap();

    let (processed, snapshots) = pipeline.process_stages(&raw).unwrap();
    let stages: Vec<Stage> = snapshots.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Contrast,
            Stage::Median,
            Stage::Threshold,
            Stage::Morphology,
        ]
    );

    for snapshot in &snapshots {
        assert_eq!(snapshot.image.width(), raw.width());
        assert_eq!(snapshot.image.height(), raw.height());
    }
    assert_eq!(
        snapshots.last().unwrap().image.data(),
        processed.view().as_slice()
    );
}

#[test]
fn threshold_stage_emits_only_configured_values() {
    let raw = fundus_like(48, 36);
    let pipeline = Pipeline::new(small_config()).unwrap();

    let (_, snapshots) = pipeline.process_stages(&raw).unwrap();
    let binary = snapshots
        .iter()
        .find(|s| s.stage == Stage::Threshold)
        .unwrap();
    assert!(binary.image.data().iter().all(|&px| px == 0 || px == 125));
}

#[test]
fn morphology_with_identity_dilation_never_adds_foreground() {
    let raw = fundus_like(64, 48);
    // Dilation with a single-pixel element is the identity, so the terminal
    // stage reduces to erosion and can only shrink the mask.
    let pipeline = Pipeline::new(PipelineConfig {
        morph_dilate_size: 1,
        ..small_config()
    })
    .unwrap();

    let (processed, snapshots) = pipeline.process_stages(&raw).unwrap();
    let before = snapshots
        .iter()
        .find(|s| s.stage == Stage::Threshold)
        .unwrap();

    assert!(processed.view().as_slice().iter().all(|&px| px == 0 || px == 125));
    assert!(
        foreground_count(processed.view().as_slice()) <= foreground_count(before.image.data())
    );
}

#[test]
fn edge_terminal_replaces_morphology() {
    let raw = fundus_like(48, 36);
    let pipeline = Pipeline::new(PipelineConfig {
        terminal: TerminalStage::EdgeMap,
        ..small_config()
    })
    .unwrap();

    let (processed, snapshots) = pipeline.process_stages(&raw).unwrap();
    let stages: Vec<Stage> = snapshots.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Contrast,
            Stage::Median,
            Stage::Threshold,
            Stage::EdgeMap,
        ]
    );
    assert_eq!(processed.width(), 48);
    assert_eq!(processed.height(), 36);
}

#[test]
fn hsv_and_equalization_modes_run_end_to_end() {
    let raw = fundus_like(48, 36);
    let pipeline = Pipeline::new(PipelineConfig {
        color_mode: ColorMode::HsvValue,
        enhancement: Enhancement::HistogramEqualization,
        ..small_config()
    })
    .unwrap();

    let processed = pipeline.process(&raw).unwrap();
    assert_eq!(processed.width(), 48);
    assert_eq!(processed.height(), 36);
}

#[test]
fn hsv_mode_rejects_single_channel_input() {
    let raw = RawImage::new(vec![128u8; 48 * 36], 48, 36, 1).unwrap();
    let pipeline = Pipeline::new(PipelineConfig {
        color_mode: ColorMode::HsvValue,
        ..small_config()
    })
    .unwrap();

    let err = pipeline.process(&raw).err().unwrap();
    assert_eq!(
        err,
        RetMatchError::UnsupportedChannelCount {
            operation: "hsv value extraction",
            got: 1,
        }
    );
}

#[test]
fn pipeline_rejects_invalid_kernel_configs() {
    let err = Pipeline::new(PipelineConfig {
        median_max_kernel: 4,
        ..PipelineConfig::default()
    })
    .err()
    .unwrap();
    assert_eq!(
        err,
        RetMatchError::InvalidKernelSize {
            size: 4,
            reason: "sweep bound must be odd and at least 1",
        }
    );

    let err = Pipeline::new(PipelineConfig {
        threshold_block_size: 1,
        ..PipelineConfig::default()
    })
    .err()
    .unwrap();
    assert_eq!(
        err,
        RetMatchError::InvalidKernelSize {
            size: 1,
            reason: "threshold block must be odd and at least 3",
        }
    );

    let err = Pipeline::new(PipelineConfig {
        morph_erode_size: 0,
        ..PipelineConfig::default()
    })
    .err()
    .unwrap();
    assert_eq!(
        err,
        RetMatchError::InvalidKernelSize {
            size: 0,
            reason: "structuring element must span at least one pixel",
        }
    );
}

#[test]
fn pipeline_exposes_its_config() {
    let config = small_config();
    let pipeline = Pipeline::new(config).unwrap();
    assert_eq!(pipeline.config(), &config);
}
