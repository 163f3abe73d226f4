use approx::assert_abs_diff_eq;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::tensor::{Distribution, Tensor};
use core_burn::{BurnCoreError, MixerKind, StageInfo, StageTransformer, StageTransformerConfig};

type TestBackend = NdArray;
type TrainBackend = Autodiff<NdArray>;

fn tiny_config(mixer: MixerKind) -> StageTransformerConfig {
    StageTransformerConfig::new()
        .with_mixer(mixer)
        .with_img_size(32)
        .with_patch_size(4)
        .with_num_classes(10)
        .with_embed_dims(vec![16, 32])
        .with_depths(vec![1, 2])
        .with_num_heads(vec![2, 4])
}

fn random_images(batch: usize, channels: usize, size: usize) -> Tensor<TestBackend, 4> {
    Tensor::random(
        [batch, channels, size, size],
        Distribution::Normal(0.0, 1.0),
        &NdArrayDevice::default(),
    )
}

#[test]
fn test_stage_layout_fast() {
    let layout = tiny_config(MixerKind::Fast).stage_layout();
    assert_eq!(
        layout,
        vec![
            StageInfo {
                index: 0,
                resolution: 8,
                num_tokens: 64,
                kv_tokens: None,
                dim: 16,
                num_heads: 2,
                depth: 1,
            },
            StageInfo {
                index: 1,
                resolution: 4,
                num_tokens: 16,
                kv_tokens: None,
                dim: 32,
                num_heads: 4,
                depth: 2,
            },
        ]
    );
}

#[test]
fn test_stage_layout_linformer_kv_tokens() {
    let layout = tiny_config(MixerKind::Linformer)
        .with_kv_tokens_ratio(4)
        .stage_layout();
    let kv_tokens: Vec<_> = layout.iter().map(|info| info.kv_tokens).collect();
    assert_eq!(kv_tokens, vec![Some(16), Some(4)]);
}

#[test]
fn test_drop_path_schedule_is_linear() {
    let schedule = tiny_config(MixerKind::Fast)
        .with_drop_path_rate(0.3)
        .drop_path_schedule();
    assert_eq!(schedule.len(), 3);
    for (actual, expected) in schedule.iter().zip([0.0, 0.15, 0.3]) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
    }

    let single = tiny_config(MixerKind::Fast)
        .with_embed_dims(vec![16])
        .with_depths(vec![1])
        .with_num_heads(vec![2])
        .drop_path_schedule();
    assert_eq!(single, vec![0.0]);
}

#[test]
fn test_model_assigns_drop_path_per_block() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TestBackend> = tiny_config(MixerKind::Fast)
        .with_drop_path_rate(0.3)
        .init(&device)
        .unwrap();

    let probs: Vec<f64> = model
        .stages()
        .iter()
        .flat_map(|stage| stage.blocks().iter().map(|block| block.drop_path_prob()))
        .collect();
    assert_eq!(probs.len(), 3);
    assert_abs_diff_eq!(probs[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(probs[2], 0.3, epsilon = 1e-12);
}

#[test]
fn test_fast_model_forward_shape() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TestBackend> =
        tiny_config(MixerKind::Fast).init(&device).unwrap();
    assert_eq!(model.num_classes(), 10);

    let features = model.forward_features(random_images(2, 3, 32)).unwrap();
    assert_eq!(features.dims(), [2, 32]);

    let logits = model.forward(random_images(2, 3, 32)).unwrap();
    assert_eq!(logits.dims(), [2, 10]);
    let logits = logits.into_data().to_vec::<f32>().unwrap();
    assert!(logits.iter().all(|v| v.is_finite()));
}

#[test]
fn test_linformer_model_forward_shape() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TestBackend> = tiny_config(MixerKind::Linformer)
        .with_qkv_bias(true)
        .init(&device)
        .unwrap();

    let logits = model.forward(random_images(3, 3, 32)).unwrap();
    assert_eq!(logits.dims(), [3, 10]);
}

#[test]
fn test_model_rejects_wrong_image_size() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TestBackend> =
        tiny_config(MixerKind::Linformer).init(&device).unwrap();

    let result = model.forward(random_images(1, 3, 64));
    assert!(matches!(
        result,
        Err(BurnCoreError::ShapeMismatch {
            component: "PatchEmbed",
            axis: "height",
            expected: 32,
            actual: 64,
        })
    ));
}

#[test]
fn test_model_rejects_wrong_channels() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TestBackend> =
        tiny_config(MixerKind::Fast).init(&device).unwrap();

    let result = model.forward(random_images(1, 1, 32));
    assert!(matches!(
        result,
        Err(BurnCoreError::ShapeMismatch {
            axis: "channels",
            expected: 3,
            actual: 1,
            ..
        })
    ));
}

#[test]
fn test_validate_mismatched_stage_lengths() {
    let result = tiny_config(MixerKind::Fast)
        .with_depths(vec![1, 1, 1])
        .validate();
    match result {
        Err(BurnCoreError::InvalidConfig(msg)) => assert!(msg.contains("depths")),
        other => panic!("Ожидалась InvalidConfig, получено {other:?}"),
    }
}

#[test]
fn test_validate_img_not_divisible_by_patch() {
    let result = tiny_config(MixerKind::Fast).with_img_size(30).validate();
    assert!(matches!(result, Err(BurnCoreError::InvalidConfig(_))));
}

#[test]
fn test_validate_odd_resolution_before_merge() {
    // 24 / 4 = 6 -> 3, третья стадия не может слить сетку 3x3.
    let result = tiny_config(MixerKind::Fast)
        .with_img_size(24)
        .with_embed_dims(vec![16, 32, 64])
        .with_depths(vec![1, 1, 1])
        .with_num_heads(vec![2, 4, 8])
        .validate();
    match result {
        Err(BurnCoreError::InvalidConfig(msg)) => assert!(msg.contains("2x2")),
        other => panic!("Ожидалась InvalidConfig, получено {other:?}"),
    }
}

#[test]
fn test_validate_linformer_too_few_tokens() {
    // Последняя стадия: 4x4 = 16 токенов, 16 / 32 == 0.
    let result = tiny_config(MixerKind::Linformer)
        .with_kv_tokens_ratio(32)
        .validate();
    assert!(matches!(result, Err(BurnCoreError::InvalidConfig(_))));

    // Для Fastformer коэффициент не важен.
    assert!(tiny_config(MixerKind::Fast)
        .with_kv_tokens_ratio(32)
        .validate()
        .is_ok());
}

#[test]
fn test_validate_heads_per_stage() {
    let result = tiny_config(MixerKind::Fast)
        .with_num_heads(vec![2, 3])
        .validate();
    match result {
        Err(BurnCoreError::InvalidConfig(msg)) => assert!(msg.contains("стадия 1")),
        other => panic!("Ожидалась InvalidConfig, получено {other:?}"),
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = StageTransformerConfig::new();
    assert!(config.validate().is_ok());
    assert_eq!(config.embed_dims, vec![64, 128, 256, 512]);
    let resolutions: Vec<_> = config
        .stage_layout()
        .iter()
        .map(|info| info.resolution)
        .collect();
    assert_eq!(resolutions, vec![56, 28, 14, 7]);
}

#[test]
fn test_config_json_round_trip_keeps_mixer() {
    let config = tiny_config(MixerKind::Linformer).with_qk_scale(Some(0.125));
    let json = serde_json::to_string(&config).unwrap();
    let restored: StageTransformerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.mixer, MixerKind::Linformer);
    assert_eq!(restored.qk_scale, Some(0.125));
    assert_eq!(restored.depths, vec![1, 2]);
}

#[test]
fn test_valid_model_is_deterministic() {
    let device = NdArrayDevice::default();
    let model: StageTransformer<TrainBackend> = tiny_config(MixerKind::Fast)
        .with_drop_rate(0.1)
        .with_drop_path_rate(0.2)
        .init(&device)
        .unwrap();
    let model = model.valid();

    let images = random_images(2, 3, 32);
    let first = model.forward(images.clone()).unwrap();
    let second = model.forward(images).unwrap();
    assert_eq!(
        first.into_data().to_vec::<f32>().unwrap(),
        second.into_data().to_vec::<f32>().unwrap()
    );
}
