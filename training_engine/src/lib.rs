// training_engine/src/lib.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! # `training_engine`
//!
//! Движок обучения классификаторов из `core_burn` на Burn с autodiff-бэкендом.
//!
//! ## Структура
//!
//! - `config`: конфигурация запуска (`TrainingConfig`), загружаемая из TOML.
//! - `data`: трейт `BatchSource` и синтетический источник изображений.
//! - `metrics`: `AverageMeter` и top-k точность.
//! - `scheduler`: косинусное расписание learning rate с прогревом.
//! - `summary`: CSV-сводка по эпохам.
//! - `checkpoint`: сохранение последних и лучших весов.
//! - `trainer`: `train_one_epoch`, `validate` и `fit`.
//!
//! Распределенное обучение, смешанная точность, аугментации и EMA весов
//! в движок не входят.

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod summary;
pub mod trainer;

pub use checkpoint::{
    load_checkpoint, load_resume_state, CheckpointEntry, CheckpointRecorder, CheckpointSaver,
    ResumeState,
};
pub use config::{DataSection, OptimizerSection, SchedulerSection, TrainingConfig};
pub use data::{BatchSource, ImageBatch, SyntheticImageSource};
pub use error::TrainingError;
pub use metrics::{accuracy_topk, AverageMeter};
pub use scheduler::CosineLrScheduler;
pub use summary::{read_summary, update_summary, SummaryRow};
pub use trainer::{
    experiment_dir, fit, train_one_epoch, validate, Classifier, EvalMetrics, FitReport,
    TrainMetrics,
};
