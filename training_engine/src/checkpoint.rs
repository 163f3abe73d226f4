// training_engine/src/checkpoint.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Сохранение весов по эпохам.
//!
//! В директории эксперимента поддерживаются:
//! - `last.mpk`: веса после последней эпохи;
//! - `checkpoint-{epoch}.mpk`: до `max_history` лучших эпох по метрике (больше = лучше);
//! - `model_best.mpk`: лучшая эпоха;
//! - `last-optim.mpk` и `last-state.toml`: состояние оптимизатора и номер эпохи
//!   для продолжения обучения с `last.mpk`.

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    module::{AutodiffModule, Module},
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::TrainingError;

const EXTENSION: &str = "mpk";

/// Рекордер всех чекпоинтов движка.
pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Запись о сохраненном чекпоинте.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointEntry {
    /// Значение метрики.
    pub metric: f64,
    /// Номер эпохи.
    pub epoch: usize,
    /// Путь к файлу.
    pub path: PathBuf,
}

/// Номер и метрика последней завершенной эпохи; хранится рядом с `last.mpk`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    /// Последняя завершенная эпоха.
    pub epoch: usize,
    /// Валидационная метрика этой эпохи.
    pub metric: f64,
}

impl ResumeState {
    /// Эпоха, с которой продолжается обучение.
    pub const fn next_epoch(&self) -> usize {
        self.epoch + 1
    }
}

/// Хранитель чекпоинтов с ограниченной историей лучших эпох.
#[derive(Debug)]
pub struct CheckpointSaver {
    dir: PathBuf,
    max_history: usize,
    /// Отсортированы по убыванию метрики.
    history: Vec<CheckpointEntry>,
    recorder: CheckpointRecorder,
}

impl CheckpointSaver {
    /// Создает хранитель в существующей директории `dir`.
    pub fn new(dir: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            dir: dir.into(),
            max_history,
            history: Vec::new(),
            recorder: CheckpointRecorder::new(),
        }
    }

    /// Путь к `last.mpk`.
    pub fn last_path(&self) -> PathBuf {
        self.file_path("last")
    }

    /// Путь к `model_best.mpk`.
    pub fn best_path(&self) -> PathBuf {
        self.file_path("model_best")
    }

    /// Сохраненные лучшие чекпоинты, от лучшего к худшему.
    pub fn history(&self) -> &[CheckpointEntry] {
        &self.history
    }

    /// Лучшая метрика и эпоха на данный момент.
    pub fn best(&self) -> Option<(f64, usize)> {
        self.history.first().map(|entry| (entry.metric, entry.epoch))
    }

    /// Сохраняет состояние оптимизатора и номер эпохи рядом с `last.mpk`.
    ///
    /// # Errors
    /// `TrainingError::Checkpoint` при записи оптимизатора, `TrainingError::ResumeState`
    /// или `TrainingError::Io` при записи номера эпохи.
    pub fn save_resume_state<B, M, O>(
        &self,
        optimizer: &O,
        state: ResumeState,
    ) -> Result<(), TrainingError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let last = self.last_path();
        Recorder::<B>::record(&self.recorder, optimizer.to_record(), optimizer_path(&last))?;
        let text = toml::to_string_pretty(&state)
            .map_err(|e| TrainingError::ResumeState(e.to_string()))?;
        fs::write(state_path(&last), text)?;
        debug!(epoch = state.epoch, "Сохранено состояние для продолжения обучения");
        Ok(())
    }

    fn file_path(&self, stem: &str) -> PathBuf {
        self.dir.join(stem).with_extension(EXTENSION)
    }

    /// Сохраняет веса эпохи и обновляет историю лучших.
    ///
    /// Возвращает лучшую метрику и эпоху после обновления.
    ///
    /// # Errors
    /// `TrainingError::Checkpoint` при записи весов, `TrainingError::Io` при копировании файлов.
    pub fn save_checkpoint<B: Backend, M: Module<B>>(
        &mut self,
        model: &M,
        epoch: usize,
        metric: f64,
    ) -> Result<Option<(f64, usize)>, TrainingError> {
        let last = self.last_path();
        model
            .clone()
            .save_file(self.dir.join("last"), &self.recorder)?;
        debug!(epoch, path = %last.display(), "Сохранены последние веса");

        let worst_kept = self.history.last().map(|entry| entry.metric);
        let qualifies = self.max_history > 0
            && (self.history.len() < self.max_history
                || worst_kept.is_some_and(|worst| metric > worst));

        if qualifies {
            let path = self.file_path(&format!("checkpoint-{epoch}"));
            fs::copy(&last, &path)?;
            self.history.push(CheckpointEntry {
                metric,
                epoch,
                path,
            });
            self.history
                .sort_by(|a, b| b.metric.total_cmp(&a.metric).then(a.epoch.cmp(&b.epoch)));

            while self.history.len() > self.max_history {
                if let Some(removed) = self.history.pop() {
                    debug!(epoch = removed.epoch, "Удален вытесненный чекпоинт");
                    remove_if_exists(&removed.path)?;
                }
            }

            if self.history.first().is_some_and(|best| best.epoch == epoch) {
                fs::copy(&last, self.best_path())?;
                info!(epoch, metric, "Новая лучшая модель сохранена");
            }
        }

        Ok(self.best())
    }
}

fn companion_path(checkpoint: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = checkpoint
        .file_stem()
        .map_or_else(|| "last".to_string(), |stem| stem.to_string_lossy().into_owned());
    checkpoint
        .with_file_name(format!("{stem}-{suffix}"))
        .with_extension(extension)
}

fn optimizer_path(checkpoint: &Path) -> PathBuf {
    companion_path(checkpoint, "optim", EXTENSION)
}

fn state_path(checkpoint: &Path) -> PathBuf {
    companion_path(checkpoint, "state", "toml")
}

fn remove_if_exists(path: &Path) -> Result<(), TrainingError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Загружает веса из чекпоинта в свежеинициализированную модель той же архитектуры.
///
/// # Errors
/// `TrainingError::Checkpoint`, если файл отсутствует или не подходит к модели.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    model: M,
    path: &Path,
    device: &B::Device,
) -> Result<M, TrainingError> {
    info!(path = %path.display(), "Загрузка весов из чекпоинта");
    let model = model.load_file(path.to_path_buf(), &CheckpointRecorder::new(), device)?;
    Ok(model)
}

/// Восстанавливает оптимизатор и номер эпохи, сохраненные рядом с чекпоинтом `checkpoint`.
///
/// Если состояния нет (например, для `model_best.mpk`), оптимизатор возвращается
/// без изменений вместе с `None`.
///
/// # Errors
/// `TrainingError::Checkpoint`, если состояние оптимизатора не подходит к модели,
/// `TrainingError::ResumeState`, если номер эпохи не читается.
pub fn load_resume_state<B, M, O>(
    checkpoint: &Path,
    optimizer: O,
    device: &B::Device,
) -> Result<(O, Option<ResumeState>), TrainingError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let state_file = state_path(checkpoint);
    let optimizer_file = optimizer_path(checkpoint);
    if !state_file.exists() || !optimizer_file.exists() {
        warn!(
            path = %checkpoint.display(),
            "Состояние оптимизатора не найдено, продолжаем только с весами"
        );
        return Ok((optimizer, None));
    }

    let state: ResumeState = toml::from_str(&fs::read_to_string(&state_file)?)
        .map_err(|e| TrainingError::ResumeState(format!("{}: {e}", state_file.display())))?;
    let record: <O as Optimizer<M, B>>::Record =
        Recorder::<B>::load(&CheckpointRecorder::new(), optimizer_file, device)?;
    info!(epoch = state.epoch, "Состояние оптимизатора восстановлено");
    Ok((optimizer.load_record(record), Some(state)))
}
