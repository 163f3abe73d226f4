use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use core_burn::{
    AttentionBlock, AttentionBlockConfig, BurnCoreError, DropPathConfig, MixerKind, MlpConfig,
    TokenMixer,
};

type TestBackend = NdArray;
type TrainBackend = Autodiff<NdArray>;

fn values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().to_vec::<f32>().unwrap()
}

fn random_tokens<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 3> {
    Tensor::random(shape, Distribution::Normal(0.0, 1.0), device)
}

#[test]
fn test_fast_block_preserves_shape() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TestBackend> = AttentionBlockConfig::new(64, 8)
        .init(&device)
        .unwrap();
    assert_eq!(block.mixer().kind(), MixerKind::Fast);

    let output = block.forward(random_tokens([2, 196, 64], &device)).unwrap();
    assert_eq!(output.dims(), [2, 196, 64]);
    assert!(values(output).iter().all(|v| v.is_finite()));
}

#[test]
fn test_linformer_block_preserves_shape() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .with_mixer(MixerKind::Linformer)
        .with_num_tokens(Some(49))
        .with_qkv_bias(true)
        .init(&device)
        .unwrap();

    match block.mixer() {
        TokenMixer::Linformer(attention) => assert_eq!(attention.kv_tokens(), 12),
        TokenMixer::Fast(_) => panic!("Ожидался Linformer"),
    }

    let output = block.forward(random_tokens([2, 49, 32], &device)).unwrap();
    assert_eq!(output.dims(), [2, 49, 32]);
}

#[test]
fn test_linformer_block_requires_num_tokens() {
    let device = NdArrayDevice::default();
    let result = AttentionBlockConfig::new(32, 4)
        .with_mixer(MixerKind::Linformer)
        .init::<TestBackend>(&device);
    match result {
        Err(BurnCoreError::InvalidConfig(msg)) => assert!(msg.contains("num_tokens")),
        other => panic!("Ожидалась InvalidConfig, получено {other:?}"),
    }
}

#[test]
fn test_linformer_block_token_mismatch() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .with_mixer(MixerKind::Linformer)
        .with_num_tokens(Some(49))
        .init(&device)
        .unwrap();

    let result = block.forward(random_tokens([1, 64, 32], &device));
    assert!(matches!(
        result,
        Err(BurnCoreError::ShapeMismatch {
            component: "LinAttention",
            axis: "tokens",
            expected: 49,
            actual: 64,
        })
    ));
}

#[test]
fn test_block_channel_mismatch() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .init(&device)
        .unwrap();

    let result = block.forward(random_tokens([1, 10, 16], &device));
    assert!(matches!(
        result,
        Err(BurnCoreError::ShapeMismatch {
            axis: "channels",
            expected: 32,
            actual: 16,
            ..
        })
    ));
}

#[test]
fn test_block_rejects_invalid_probabilities() {
    let device = NdArrayDevice::default();
    let negative_drop = AttentionBlockConfig::new(32, 4)
        .with_drop(-0.1)
        .init::<TestBackend>(&device);
    assert!(matches!(negative_drop, Err(BurnCoreError::InvalidConfig(_))));

    let drop_path_above_one = AttentionBlockConfig::new(32, 4)
        .with_drop_path(1.5)
        .init::<TestBackend>(&device);
    assert!(matches!(
        drop_path_above_one,
        Err(BurnCoreError::InvalidConfig(_))
    ));
}

#[test]
fn test_drop_path_config_bounds() {
    assert!(DropPathConfig::new().with_prob(1.0).init().is_ok());
    assert!(DropPathConfig::new().with_prob(0.0).init().is_ok());
    assert!(matches!(
        DropPathConfig::new().with_prob(-0.01).init(),
        Err(BurnCoreError::InvalidConfig(_))
    ));
}

#[test]
fn test_mlp_hidden_width_and_shape() {
    let device = NdArrayDevice::default();
    let config = AttentionBlockConfig::new(10, 2).with_mlp_ratio(2.5);
    assert_eq!(config.mlp_hidden(), 25);

    let mlp = MlpConfig::new(10, 25)
        .with_out_features(Some(6))
        .init::<TestBackend>(&device)
        .unwrap();
    let output = mlp.forward(random_tokens([2, 3, 10], &device));
    assert_eq!(output.dims(), [2, 3, 6]);
}

#[test]
fn test_block_inference_is_deterministic() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .with_drop(0.2)
        .with_attn_drop(0.2)
        .with_drop_path(0.5)
        .init(&device)
        .unwrap();
    let input = random_tokens([2, 16, 32], &device);

    let first = values(block.forward(input.clone()).unwrap());
    let second = values(block.forward(input).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_drop_path_ignored_in_inference() {
    let device = NdArrayDevice::default();
    let with_drop_path: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .with_drop_path(0.2)
        .init(&device)
        .unwrap();
    let without_drop_path: AttentionBlock<TestBackend> = AttentionBlockConfig::new(32, 4)
        .init::<TestBackend>(&device)
        .unwrap()
        .load_record(with_drop_path.clone().into_record());
    assert!((with_drop_path.drop_path_prob() - 0.2).abs() < f64::EPSILON);
    assert!(without_drop_path.drop_path_prob().abs() < f64::EPSILON);

    let input = random_tokens([2, 16, 32], &device);
    let expected = values(without_drop_path.forward(input.clone()).unwrap());
    let actual = values(with_drop_path.forward(input).unwrap());
    assert_eq!(expected, actual);
}

#[test]
fn test_full_drop_path_in_training_returns_input() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TrainBackend> = AttentionBlockConfig::new(16, 2)
        .with_drop_path(1.0)
        .init(&device)
        .unwrap();
    let input = random_tokens::<TrainBackend>([3, 8, 16], &device);

    let output = block.forward(input.clone()).unwrap();
    assert_eq!(values(output), values(input));
}

#[test]
fn test_valid_block_is_idempotent() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TrainBackend> = AttentionBlockConfig::new(16, 2)
        .with_drop(0.1)
        .with_drop_path(0.3)
        .init(&device)
        .unwrap();
    let inference_block = block.valid();

    let input = random_tokens::<TestBackend>([2, 8, 16], &device);
    let first = values(inference_block.forward(input.clone()).unwrap());
    let second = values(inference_block.forward(input).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_zero_probabilities_deterministic_in_training() {
    let device = NdArrayDevice::default();
    let block: AttentionBlock<TrainBackend> = AttentionBlockConfig::new(16, 2)
        .with_drop(0.0)
        .with_attn_drop(0.0)
        .with_drop_path(0.0)
        .init(&device)
        .unwrap();
    let input = random_tokens::<TrainBackend>([2, 8, 16], &device);

    let first = values(block.forward(input.clone()).unwrap());
    let second = values(block.forward(input.clone()).unwrap());
    assert_eq!(first, second);

    // С нулевыми вероятностями режим обучения совпадает с инференсом.
    let inference = values(block.valid().forward(input.inner()).unwrap());
    assert_eq!(first, inference);
}

#[test]
fn test_drop_path_per_sample_mask_in_training() {
    let device = NdArrayDevice::default();
    let drop_path = DropPathConfig::new().with_prob(0.25).init().unwrap();
    let samples = 4000;
    let output = drop_path.forward(Tensor::<TrainBackend, 3>::ones([samples, 2, 3], &device));
    let output = values(output);

    let kept = 1.0 / 0.75_f32;
    assert!(output
        .iter()
        .all(|&v| v == 0.0 || (v - kept).abs() < 1e-5));

    // Решение принимается один раз на пример: все элементы примера равны.
    for sample in output.chunks_exact(6) {
        assert!(sample.iter().all(|&v| v == sample[0]));
    }
    let dropped = output.chunks_exact(6).filter(|s| s[0] == 0.0).count();
    assert!(dropped > 0 && dropped < samples);

    #[allow(clippy::cast_precision_loss)]
    let mean = output.iter().sum::<f32>() / output.len() as f32;
    assert!((mean - 1.0).abs() < 0.05, "mean = {mean}");
}
