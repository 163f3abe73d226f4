#![warn(
    missing_docs, // Предупреждать, если публичные элементы не документированы.
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used, // Предупреждать об использовании .unwrap()
    clippy::expect_used  // Предупреждать об использовании .expect()
)]
#![deny(
    unsafe_code,        // Запретить использование unsafe блоков.
    unused_mut,         // Запретить неиспользуемые изменяемые переменные.
    unused_imports,     // Запретить неиспользуемые импорты.
    unused_attributes   // Запретить неиспользуемые атрибуты.
)]

//! `utils_crate` предоставляет общие типы ошибок и утилиты, которыми
//! пользуются движок обучения и CLI проекта stage-attention.
//!
//! # Основные модули:
//!
//! - [`error`]: Определяет общий тип ошибки `UtilsError` для всего крейта.
//! - [`config`]: (активируется фичей `config_toml`) Загрузка TOML-конфигураций
//!   и общая секция настроек логирования `LoggingConfigSub`.
//! - [`path`]: (активируется фичей `path_utils_feature`) Утилиты для работы
//!   с путями файловой системы.
//! - [`logger`]: (активируется фичей `logger_utils_feature`) Утилиты для
//!   инициализации системы логирования на базе `tracing`.
//!
//! Фича `default` включает все три утилитарных модуля.

// --- Модуль для общих ошибок ---
pub mod error;
pub use error::UtilsError; // Реэкспорт для удобства использования.

// --- Утилитарные модули (управляются фичами) ---

/// Модуль с утилитами для работы с путями файловой системы.
///
/// Активируется фичей `path_utils_feature`.
#[cfg(feature = "path_utils_feature")]
pub mod path;
#[cfg(feature = "path_utils_feature")]
pub use path::{ensure_dir_exists, sanitize_path_component};

/// Модуль с утилитами для инициализации логирования.
///
/// Активируется фичей `logger_utils_feature`.
#[cfg(feature = "logger_utils_feature")]
pub mod logger;
#[cfg(feature = "logger_utils_feature")]
pub use logger::{init_tracing_logger, parse_level};

/// Модуль для загрузки конфигураций из TOML.
///
/// Активируется фичей `config_toml`.
#[cfg(feature = "config_toml")]
pub mod config;
#[cfg(feature = "config_toml")]
pub use config::{load_toml_or_default, LoggingConfigSub};
