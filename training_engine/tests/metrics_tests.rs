use approx::assert_abs_diff_eq;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use burn::tensor::{Int, Tensor, TensorData};
use training_engine::{accuracy_topk, AverageMeter};

type TestBackend = NdArray;

#[test]
fn test_average_meter_weighted_mean() {
    let mut meter = AverageMeter::new();
    meter.update(1.0, 2);
    meter.update(4.0, 1);
    assert_abs_diff_eq!(meter.val, 4.0);
    assert_abs_diff_eq!(meter.sum, 6.0);
    assert_eq!(meter.count, 3);
    assert_abs_diff_eq!(meter.avg, 2.0);

    meter.reset();
    assert_eq!(meter, AverageMeter::default());
}

#[test]
fn test_average_meter_zero_weight_keeps_avg() {
    let mut meter = AverageMeter::new();
    meter.update(3.0, 0);
    assert_eq!(meter.count, 0);
    assert_abs_diff_eq!(meter.avg, 0.0);
}

#[test]
fn test_accuracy_topk_percentages() {
    let device = NdArrayDevice::default();
    let logits = Tensor::<TestBackend, 2>::from_data(
        TensorData::new(
            vec![0.1_f32, 0.9, 0.0, 0.8, 0.1, 0.1, 0.2, 0.3, 0.5],
            [3, 3],
        ),
        &device,
    );
    let targets =
        Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![1_i64, 2, 2], [3]), &device);

    let accuracy = accuracy_topk(logits, targets, &[1, 2, 5]).unwrap();
    assert_abs_diff_eq!(accuracy[0], 200.0 / 3.0, epsilon = 1e-9);
    // Во второй строке логит цели делит второе место с другим классом.
    assert_abs_diff_eq!(accuracy[1], 100.0, epsilon = 1e-9);
    // k ограничивается числом классов.
    assert_abs_diff_eq!(accuracy[2], 100.0, epsilon = 1e-9);
}

#[test]
fn test_accuracy_topk_all_wrong() {
    let device = NdArrayDevice::default();
    let logits = Tensor::<TestBackend, 2>::from_data(
        TensorData::new(vec![5.0_f32, 0.0, 0.0, 5.0], [2, 2]),
        &device,
    );
    let targets =
        Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![1_i64, 0], [2]), &device);

    let accuracy = accuracy_topk(logits, targets, &[1]).unwrap();
    assert_abs_diff_eq!(accuracy[0], 0.0);
}
