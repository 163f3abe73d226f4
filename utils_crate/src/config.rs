#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![deny(unsafe_code, unused_mut, unused_imports, unused_attributes)]

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::UtilsError;

/// Загружает структуру конфигурации из TOML файла.
/// Если файл не найден, возвращается конфигурация по умолчанию.
///
/// # Arguments
/// * `file_path` - Путь к TOML файлу конфигурации.
///
/// # Errors
/// Возвращает `UtilsError::Io` при ошибках чтения файла или `UtilsError::Config`
/// при ошибках парсинга TOML.
pub fn load_toml_or_default<T>(file_path: &Path) -> Result<T, UtilsError>
where
    T: DeserializeOwned + Default,
{
    if !file_path.exists() {
        warn!(
            "Файл конфигурации {} не найден, используется конфигурация по умолчанию.",
            file_path.display()
        );
        return Ok(T::default());
    }
    let config_str = std::fs::read_to_string(file_path)
        .map_err(|e| UtilsError::io_with_path(e, file_path.to_string_lossy().into_owned()))?;
    let parsed = toml::from_str(&config_str).map_err(|e| {
        UtilsError::Config(format!(
            "Failed to parse config from TOML at {}: {e}",
            file_path.display()
        ))
    })?;
    debug!("Конфигурация загружена из {}", file_path.display());
    Ok(parsed)
}

/// Специфичная конфигурация логирования (секция `[logging]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfigSub {
    /// Уровень логирования для консоли.
    pub level: String,
    /// Уровень логирования для файла.
    pub file_level: String,
    /// Директория для файлов логов. Если не задана, пишем в выходную директорию эксперимента.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfigSub {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_level: "debug".to_string(),
            log_dir: None,
        }
    }
}
