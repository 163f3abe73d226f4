// training_engine/src/metrics.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Скользящие средние и top-k точность.

use burn::tensor::{backend::Backend, Int, Tensor};

use crate::TrainingError;

/// Хранит последнее значение и взвешенное среднее.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AverageMeter {
    /// Последнее значение.
    pub val: f64,
    /// Взвешенная сумма значений.
    pub sum: f64,
    /// Суммарный вес.
    pub count: usize,
    /// `sum / count`.
    pub avg: f64,
}

impl AverageMeter {
    /// Пустой счетчик.
    pub fn new() -> Self {
        Self::default()
    }

    /// Сбрасывает счетчик.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Добавляет значение `val` с весом `n` (обычно размер батча).
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, val: f64, n: usize) {
        self.val = val;
        self.sum += val * n as f64;
        self.count += n;
        if self.count > 0 {
            self.avg = self.sum / self.count as f64;
        }
    }
}

/// Top-k точность в процентах для каждого `k` из `ks`.
///
/// Пример считается верным, если логитов строго больше логита правильного класса
/// меньше `k`. `k` ограничивается числом классов, поэтому top-5 при трех классах равна 100.
///
/// # Errors
/// `TrainingError::TensorData`, если данные тензоров не читаются на хосте.
#[allow(clippy::cast_precision_loss)]
pub fn accuracy_topk<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    ks: &[usize],
) -> Result<Vec<f64>, TrainingError> {
    let [batch, num_classes] = logits.dims();
    if batch == 0 || num_classes == 0 {
        return Ok(vec![0.0; ks.len()]);
    }

    let scores = logits
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::TensorData(format!("{e:?}")))?;
    let targets = targets
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| TrainingError::TensorData(format!("{e:?}")))?;

    // Ранг правильного класса в строке; None для метки вне диапазона.
    let ranks: Vec<Option<usize>> = scores
        .chunks_exact(num_classes)
        .zip(&targets)
        .map(|(row, &target)| {
            let target = usize::try_from(target).ok().filter(|&t| t < num_classes)?;
            let target_score = row[target];
            Some(row.iter().filter(|&&score| score > target_score).count())
        })
        .collect();

    Ok(ks
        .iter()
        .map(|&k| {
            let k = k.min(num_classes);
            let correct = ranks
                .iter()
                .filter(|rank| matches!(rank, Some(rank) if *rank < k))
                .count();
            correct as f64 * 100.0 / batch as f64
        })
        .collect())
}
