// training_engine/src/config.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Конфигурация запуска обучения, загружаемая из TOML.
//!
//! Все секции необязательны: отсутствующие поля берутся из значений по умолчанию.
//!
//! ```toml
//! model = "stage_tiny_fast_p4"
//! num_classes = 10
//! img_size = 32
//! epochs = 5
//!
//! [optimizer]
//! lr = 5e-4
//! clip_grad = 1.0
//!
//! [data]
//! train_samples = 512
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::Path;

use core_burn::{ModelRegistry, StageTransformerConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utils_crate::{load_toml_or_default, LoggingConfigSub, UtilsError};

use crate::TrainingError;

/// Параметры оптимизатора AdamW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    /// Базовый learning rate после прогрева.
    pub lr: f64,
    /// Коэффициент weight decay.
    pub weight_decay: f64,
    /// Порог отсечения нормы градиента; `None` отключает отсечение.
    pub clip_grad: Option<f64>,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            lr: 5e-4,
            weight_decay: 0.05,
            clip_grad: None,
        }
    }
}

/// Расписание learning rate: линейный прогрев, затем косинусный спад.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Длительность прогрева в эпохах.
    pub warmup_epochs: usize,
    /// Learning rate в начале прогрева.
    pub warmup_lr: f64,
    /// Learning rate в конце косинусного спада.
    pub min_lr: f64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            warmup_epochs: 1,
            warmup_lr: 1e-6,
            min_lr: 1e-5,
        }
    }
}

/// Синтетический набор данных.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Число обучающих изображений.
    pub train_samples: usize,
    /// Число валидационных изображений.
    pub eval_samples: usize,
    /// Зерно генератора.
    pub seed: u64,
    /// Амплитуда шума поверх прототипа класса.
    pub noise: f32,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            train_samples: 256,
            eval_samples: 64,
            seed: 42,
            noise: 0.5,
        }
    }
}

/// Полная конфигурация запуска обучения.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Имя модели в реестре.
    pub model: String,
    /// Число классов головы.
    pub num_classes: usize,
    /// Переопределение размера изображения; `None` оставляет значение модели.
    pub img_size: Option<usize>,
    /// Размер батча.
    pub batch_size: usize,
    /// Число эпох.
    pub epochs: usize,
    /// Label smoothing для обучающего лосса; `0.0` отключает его.
    pub smoothing: f32,
    /// Частота логирования обучающих батчей.
    pub log_interval: usize,
    /// Сколько лучших чекпоинтов хранить.
    pub checkpoint_hist: usize,
    /// Корневая директория результатов.
    pub output: String,
    /// Имя эксперимента; результаты пишутся в `"{experiment}/{model}"`,
    /// без него в `"{timestamp}-{model}-{img_size}"`.
    pub experiment: Option<String>,
    /// Чекпоинт, с которого продолжается обучение: веса, а при наличии
    /// сохраненного рядом состояния также оптимизатор и номер эпохи.
    pub resume: Option<String>,
    /// Первая эпоха; перекрывает эпоху, восстановленную из `resume`.
    pub start_epoch: Option<usize>,
    /// Оптимизатор.
    pub optimizer: OptimizerSection,
    /// Расписание learning rate.
    pub scheduler: SchedulerSection,
    /// Данные.
    pub data: DataSection,
    /// Логирование.
    pub logging: LoggingConfigSub,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: "stage_tiny_fast_p4".to_string(),
            num_classes: 10,
            img_size: None,
            batch_size: 32,
            epochs: 10,
            smoothing: 0.1,
            log_interval: 50,
            checkpoint_hist: 10,
            output: "./output/train".to_string(),
            experiment: None,
            resume: None,
            start_epoch: None,
            optimizer: OptimizerSection::default(),
            scheduler: SchedulerSection::default(),
            data: DataSection::default(),
            logging: LoggingConfigSub::default(),
        }
    }
}

impl TrainingConfig {
    /// Загружает конфигурацию из TOML; отсутствующий файл дает значения по умолчанию.
    ///
    /// # Errors
    /// `UtilsError::Io` при ошибке чтения, `UtilsError::Config` при некорректном TOML.
    pub fn load_from_toml(path: &Path) -> Result<Self, UtilsError> {
        let config: Self = load_toml_or_default(path)?;
        debug!(?config, "Конфигурация обучения загружена");
        Ok(config)
    }

    /// Конфигурация модели из реестра с числом классов и размером изображения запуска.
    ///
    /// # Errors
    /// `TrainingError::Model`, если модель не зарегистрирована или ее геометрия
    /// несовместима с `img_size` (например, сторона не делится на патч).
    pub fn model_config(
        &self,
        registry: &ModelRegistry,
    ) -> Result<StageTransformerConfig, TrainingError> {
        let mut config = registry.config(&self.model)?.with_num_classes(self.num_classes);
        if let Some(img_size) = self.img_size {
            config = config.with_img_size(img_size);
        }
        config.validate()?;
        Ok(config)
    }

    /// Сериализует конфигурацию в TOML (снимок запуска в директории эксперимента).
    ///
    /// # Errors
    /// `TrainingError::InvalidConfig`, если сериализация не удалась.
    pub fn to_toml_string(&self) -> Result<String, TrainingError> {
        toml::to_string_pretty(self)
            .map_err(|e| TrainingError::InvalidConfig(format!("Не удалось сериализовать конфигурацию: {e}")))
    }

    /// Проверяет параметры, не связанные с архитектурой.
    ///
    /// # Errors
    /// `TrainingError::InvalidConfig` со списком всех нарушений.
    pub fn validate(&self) -> Result<(), TrainingError> {
        let mut errors = Vec::new();
        if self.batch_size == 0 {
            errors.push("batch_size не может быть равен нулю".to_string());
        }
        if self.epochs == 0 {
            errors.push("epochs не может быть равен нулю".to_string());
        }
        if self.num_classes == 0 {
            errors.push("num_classes не может быть равен нулю".to_string());
        }
        if self.log_interval == 0 {
            errors.push("log_interval не может быть равен нулю".to_string());
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            errors.push(format!("smoothing ({}) должен лежать в [0, 1)", self.smoothing));
        }
        if !(self.optimizer.lr.is_finite() && self.optimizer.lr > 0.0) {
            errors.push(format!("lr ({}) должен быть положительным", self.optimizer.lr));
        }
        if let Some(clip) = self.optimizer.clip_grad {
            if !(clip.is_finite() && clip > 0.0) {
                errors.push(format!("clip_grad ({clip}) должен быть положительным"));
            }
        }
        if self.scheduler.min_lr < 0.0 || self.scheduler.warmup_lr < 0.0 {
            errors.push("min_lr и warmup_lr не могут быть отрицательными".to_string());
        }
        if self.data.train_samples == 0 || self.data.eval_samples == 0 {
            errors.push("train_samples и eval_samples не могут быть равны нулю".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrainingError::InvalidConfig(errors.join("; ")))
        }
    }
}
