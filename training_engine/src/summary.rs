// training_engine/src/summary.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Сводка по эпохам в `summary.csv`: одна строка `epoch, train_*, eval_*` на эпоху.

use std::fs::OpenOptions;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EvalMetrics, TrainMetrics, TrainingError};

/// Строка сводки.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Номер эпохи.
    pub epoch: usize,
    /// Средний обучающий лосс.
    pub train_loss: f64,
    /// Валидационный лосс.
    pub eval_loss: f64,
    /// Валидационная top-1 точность, %.
    pub eval_top1: f64,
    /// Валидационная top-5 точность, %.
    pub eval_top5: f64,
}

impl SummaryRow {
    /// Собирает строку из метрик эпохи.
    pub const fn new(epoch: usize, train: &TrainMetrics, eval: &EvalMetrics) -> Self {
        Self {
            epoch,
            train_loss: train.loss,
            eval_loss: eval.loss,
            eval_top1: eval.top1,
            eval_top5: eval.top5,
        }
    }
}

/// Дописывает строку эпохи в CSV; при `write_header` перед ней пишется заголовок.
///
/// # Errors
/// `TrainingError::Io` при открытии файла, `TrainingError::Summary` при записи.
pub fn update_summary(
    epoch: usize,
    train: &TrainMetrics,
    eval: &EvalMetrics,
    path: &Path,
    write_header: bool,
) -> Result<(), TrainingError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(SummaryRow::new(epoch, train, eval))?;
    writer.flush()?;
    debug!(epoch, path = %path.display(), "Строка сводки записана");
    Ok(())
}

/// Читает все строки сводки.
///
/// # Errors
/// `TrainingError::Summary`, если файл отсутствует или поврежден.
pub fn read_summary(path: &Path) -> Result<Vec<SummaryRow>, TrainingError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<SummaryRow>, _>>()?;
    Ok(rows)
}
