// training_engine/src/error.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Ошибки движка обучения.

use burn::record::RecorderError;
use core_burn::BurnCoreError;
use utils_crate::UtilsError;

/// Ошибки движка обучения.
#[derive(thiserror::Error, Debug)]
pub enum TrainingError {
    /// Ошибка построения или прямого прохода модели.
    #[error("Ошибка модели: {0}")]
    Model(#[from] BurnCoreError),

    /// Ошибка утилит (конфигурация, директории).
    #[error(transparent)]
    Utils(#[from] UtilsError),

    /// Ошибка сохранения или загрузки чекпоинта.
    #[error("Ошибка чекпоинта: {0}")]
    Checkpoint(#[from] RecorderError),

    /// Ошибка записи или чтения CSV-сводки.
    #[error("Ошибка CSV-сводки: {0}")]
    Summary(#[from] csv::Error),

    /// Ошибка ввода-вывода.
    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    /// Не удалось записать или прочитать номер эпохи для продолжения обучения.
    #[error("Ошибка состояния возобновления: {0}")]
    ResumeState(String),

    /// Некорректные параметры обучения.
    #[error("Некорректная конфигурация обучения: {0}")]
    InvalidConfig(String),

    /// Не удалось прочитать данные тензора на хосте.
    #[error("Ошибка чтения данных тензора: {0}")]
    TensorData(String),

    /// Источник батчей не выдал ни одного батча.
    #[error("Источник данных '{0}' пуст")]
    EmptyLoader(&'static str),

    /// Лосс стал NaN или бесконечностью; продолжать обучение бессмысленно.
    #[error("Обучение разошлось на эпохе {epoch}, батч {batch}: loss = {loss}")]
    Diverged {
        /// Номер эпохи.
        epoch: usize,
        /// Номер батча внутри эпохи.
        batch: usize,
        /// Значение лосса.
        loss: f64,
    },
}
