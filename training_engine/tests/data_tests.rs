use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use training_engine::{BatchSource, ImageBatch, SyntheticImageSource, TrainingError};

type TestBackend = NdArray;

fn collect(source: &SyntheticImageSource) -> Vec<ImageBatch<TestBackend>> {
    let device = NdArrayDevice::default();
    BatchSource::<TestBackend>::iter(source, &device).collect()
}

fn labels(batches: &[ImageBatch<TestBackend>]) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .targets
                .clone()
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .unwrap()
        })
        .collect()
}

#[test]
fn test_batches_cover_all_samples() {
    let source = SyntheticImageSource::new(10, 4, 3, 2, 8).unwrap();
    assert_eq!(BatchSource::<TestBackend>::num_batches(&source), 3);

    let batches = collect(&source);
    let sizes: Vec<_> = batches.iter().map(ImageBatch::len).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(batches[0].images.dims(), [4, 2, 8, 8]);
    assert!(labels(&batches).iter().all(|&label| (0..3).contains(&label)));
}

#[test]
fn test_epochs_repeat_same_samples() {
    let source = SyntheticImageSource::new(12, 5, 4, 1, 4)
        .unwrap()
        .with_seed(7);
    let first = collect(&source);
    let second = collect(&source);

    assert_eq!(labels(&first), labels(&second));
    assert_eq!(
        first[0].images.clone().into_data().to_vec::<f32>().unwrap(),
        second[0].images.clone().into_data().to_vec::<f32>().unwrap()
    );
}

#[test]
fn test_streams_differ() {
    let train = SyntheticImageSource::new(16, 16, 4, 1, 4)
        .unwrap()
        .with_seed(7)
        .with_stream(0);
    let eval = train.clone().with_stream(1);

    let train_images = collect(&train)[0].images.clone().into_data().to_vec::<f32>().unwrap();
    let eval_images = collect(&eval)[0].images.clone().into_data().to_vec::<f32>().unwrap();
    assert_ne!(train_images, eval_images);
}

#[test]
fn test_noiseless_samples_equal_class_prototype() {
    let source = SyntheticImageSource::new(32, 32, 2, 1, 2)
        .unwrap()
        .with_noise(0.0);
    let batches = collect(&source);
    let images = batches[0].images.clone().into_data().to_vec::<f32>().unwrap();
    let targets = labels(&batches);

    // Примеры одного класса без шума совпадают.
    let first_of_class = |class: i64| targets.iter().position(|&t| t == class);
    for class in 0..2 {
        if let Some(first) = first_of_class(class) {
            let prototype = &images[first * 4..(first + 1) * 4];
            for (index, _) in targets.iter().enumerate().filter(|&(_, &t)| t == class) {
                assert_eq!(&images[index * 4..(index + 1) * 4], prototype);
            }
        }
    }
}

#[test]
fn test_empty_source_has_no_batches() {
    let source = SyntheticImageSource::new(0, 4, 3, 1, 4).unwrap();
    assert_eq!(BatchSource::<TestBackend>::num_batches(&source), 0);
    assert!(collect(&source).is_empty());
}

#[test]
fn test_zero_sizes_rejected() {
    assert!(matches!(
        SyntheticImageSource::new(10, 0, 3, 1, 4),
        Err(TrainingError::InvalidConfig(_))
    ));
    assert!(matches!(
        SyntheticImageSource::new(10, 2, 0, 1, 4),
        Err(TrainingError::InvalidConfig(_))
    ));
}
