// training_engine/src/data.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Источники батчей изображений.
//!
//! Цикл обучения знает только трейт [`BatchSource`]; адаптеры реальных датасетов
//! реализуют его так же, как встроенный [`SyntheticImageSource`].

use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::TrainingError;

/// Батч изображений с метками классов.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Изображения, `[batch, channels, height, width]`.
    pub images: Tensor<B, 4>,
    /// Метки классов, `[batch]`.
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    /// Число примеров в батче.
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    /// Пуст ли батч.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Источник батчей для одной эпохи.
pub trait BatchSource<B: Backend> {
    /// Количество батчей за эпоху.
    fn num_batches(&self) -> usize;

    /// Итератор по батчам одной эпохи на устройстве `device`.
    fn iter<'a>(&'a self, device: &'a B::Device) -> Box<dyn Iterator<Item = ImageBatch<B>> + 'a>;
}

/// Синтетический классификационный набор: у каждого класса есть фиксированный
/// случайный прототип, пример равен прототипу своего класса плюс равномерный шум.
///
/// Прототипы зависят только от `seed`, а примеры еще и от `stream`, поэтому
/// обучающий и валидационный наборы с одним `seed` и разными `stream`
/// описывают одну задачу на разных выборках. Каждая эпоха выдает одни и те же примеры.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticImageSource {
    num_samples: usize,
    batch_size: usize,
    num_classes: usize,
    in_chans: usize,
    img_size: usize,
    seed: u64,
    stream: u64,
    noise: f32,
}

impl SyntheticImageSource {
    /// Создает источник.
    ///
    /// # Errors
    /// `TrainingError::InvalidConfig`, если размер батча, число классов,
    /// каналов или сторона изображения равны нулю.
    pub fn new(
        num_samples: usize,
        batch_size: usize,
        num_classes: usize,
        in_chans: usize,
        img_size: usize,
    ) -> Result<Self, TrainingError> {
        let sizes = [
            ("batch_size", batch_size),
            ("num_classes", num_classes),
            ("in_chans", in_chans),
            ("img_size", img_size),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(TrainingError::InvalidConfig(format!(
                "SyntheticImageSource: {name} не может быть равен нулю"
            )));
        }
        Ok(Self {
            num_samples,
            batch_size,
            num_classes,
            in_chans,
            img_size,
            seed: 0,
            stream: 0,
            noise: 0.5,
        })
    }

    /// Зерно прототипов и примеров.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Номер потока примеров (например, 0 для обучения, 1 для валидации).
    #[must_use]
    pub const fn with_stream(mut self, stream: u64) -> Self {
        self.stream = stream;
        self
    }

    /// Амплитуда равномерного шума; отрицательные значения берутся по модулю.
    #[must_use]
    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Число примеров.
    pub const fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn pixels_per_image(&self) -> usize {
        self.in_chans * self.img_size * self.img_size
    }

    fn prototypes(&self) -> Vec<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..self.num_classes * self.pixels_per_image())
            .map(|_| rng.random_range(-1.0_f32..1.0))
            .collect()
    }

    fn sample_rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        // Поток 0 генератора занят прототипами.
        rng.set_stream(self.stream.wrapping_add(1));
        rng
    }

    fn make_batch<B: Backend>(
        &self,
        batch: usize,
        prototypes: &[f32],
        rng: &mut ChaCha8Rng,
        device: &B::Device,
    ) -> ImageBatch<B> {
        let pixels = self.pixels_per_image();
        let mut images = Vec::with_capacity(batch * pixels);
        let mut targets = Vec::with_capacity(batch);

        for _ in 0..batch {
            let class = rng.random_range(0..self.num_classes);
            let prototype = &prototypes[class * pixels..(class + 1) * pixels];
            images.extend(prototype.iter().map(|&value| {
                if self.noise > 0.0 {
                    value + rng.random_range(-self.noise..self.noise)
                } else {
                    value
                }
            }));
            targets.push(i64::try_from(class).unwrap_or(i64::MAX));
        }

        ImageBatch {
            images: Tensor::from_data(
                TensorData::new(images, [batch, self.in_chans, self.img_size, self.img_size]),
                device,
            ),
            targets: Tensor::from_data(TensorData::new(targets, [batch]), device),
        }
    }
}

impl<B: Backend> BatchSource<B> for SyntheticImageSource {
    fn num_batches(&self) -> usize {
        self.num_samples.div_ceil(self.batch_size)
    }

    fn iter<'a>(&'a self, device: &'a B::Device) -> Box<dyn Iterator<Item = ImageBatch<B>> + 'a> {
        debug!(
            samples = self.num_samples,
            batch_size = self.batch_size,
            stream = self.stream,
            "Новая эпоха синтетического источника"
        );
        let prototypes = self.prototypes();
        let mut rng = self.sample_rng();
        let mut remaining = self.num_samples;

        Box::new(std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let batch = remaining.min(self.batch_size);
            remaining -= batch;
            Some(self.make_batch(batch, &prototypes, &mut rng, device))
        }))
    }
}
