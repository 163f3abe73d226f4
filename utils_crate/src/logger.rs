#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![deny(unsafe_code, unused_mut, unused_imports, unused_attributes)]

//! Модуль для инициализации глобального логгера на основе `tracing`.
//!
//! Функциональность этого модуля активируется фичей `logger_utils_feature`.

use std::{fs, io, path::Path, str::FromStr};

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::error::UtilsError;

/// Разбирает строковое имя уровня логирования (`"info"`, `"DEBUG"`, ...).
///
/// # Errors
/// Возвращает `UtilsError::Config`, если строка не является именем уровня `tracing`.
pub fn parse_level(level: &str) -> Result<Level, UtilsError> {
    Level::from_str(level.trim())
        .map_err(|_| UtilsError::Config(format!("Неизвестный уровень логирования: '{level}'")))
}

/// Строит фильтр: базовый `RUST_LOG` (или `info`) плюс явный уровень для крейтов приложения.
fn build_filter(app_targets: &[&str], level: Level) -> Result<EnvFilter, UtilsError> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for target in app_targets {
        // Дефисы недопустимы в именах целей `tracing`, заменяем на подчеркивания.
        let directive = format!("{}={}", target.replace('-', "_"), level)
            .parse()
            .map_err(|e| {
                UtilsError::Config(format!("Неверная директива логирования для '{target}': {e}"))
            })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

/// Инициализирует глобальный подписчик `tracing`.
///
/// Настраивает вывод в консоль (stderr) и, опционально, в файл с ежедневной ротацией.
/// Фильтрует по `RUST_LOG` и явным уровням для `app_name` и крейтов workspace
/// (`core_burn`, `training_engine`).
///
/// # Аргументы
/// * `app_name` - Имя приложения (для фильтров и имени файла лога).
/// * `console_level` - Уровень для консоли.
/// * `file_level` - Уровень для файла.
/// * `log_dir` - Опциональная директория для файлов логов.
///
/// # Ошибки
/// Возвращает `UtilsError::Generic` при повторной инициализации `tracing`
/// и `UtilsError::Config` при невалидной директиве фильтра.
/// Проблемы с созданием директории лога выводятся как предупреждение
/// и не приводят к ошибке: приложение продолжает работать с логированием только в консоль.
#[allow(clippy::module_name_repetitions)]
pub fn init_tracing_logger(
    app_name: &str,
    console_level: Level,
    file_level: Level,
    log_dir: Option<&Path>,
) -> Result<(), UtilsError> {
    let targets = [app_name, "core_burn", "training_engine"];

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_filter(build_filter(&targets, console_level)?);

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync + 'static>> = Vec::new();
    layers.push(console_layer.boxed());

    let mut file_logging_dir = None;
    if let Some(dir) = log_dir {
        if let Err(e) = fs::create_dir_all(dir) {
            // tracing еще не инициализирован, поэтому eprintln!.
            eprintln!(
                "[ПРЕДУПРЕЖДЕНИЕ] Не удалось создать директорию логов {}: {e}. Логирование в файл будет отключено.",
                dir.display()
            );
        } else {
            let file_appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(build_filter(&targets, file_level)?);
            layers.push(file_layer.boxed());
            file_logging_dir = Some(dir);
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| UtilsError::Generic(format!("Не удалось инициализировать логгер: {e}")))?;

    match file_logging_dir {
        Some(dir) => tracing::info!(
            "Логгер инициализирован. Уровень консоли: {}. Логирование в файл: {} (уровень {}).",
            console_level,
            dir.display(),
            file_level
        ),
        None => tracing::info!(
            "Логгер инициализирован. Только вывод в консоль (уровень {}).",
            console_level
        ),
    }
    Ok(())
}
