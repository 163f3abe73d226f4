use std::fs;
use std::io::Read;
use std::path::Path;

use serial_test::serial;
use tempfile::tempdir;
use tracing::Level;
use utils_crate::error::UtilsError;
use utils_crate::logger::{init_tracing_logger, parse_level};

// Вспомогательная функция для проверки содержимого файла
fn log_file_contains(log_dir: &Path, app_name_for_file: &str, expected_message: &str) -> bool {
    // Даем немного времени на запись в файл
    std::thread::sleep(std::time::Duration::from_millis(100));

    let Ok(entries) = fs::read_dir(log_dir) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(app_name_for_file))
        })
        .any(|p| {
            let mut content = String::new();
            fs::File::open(&p)
                .and_then(|mut f| f.read_to_string(&mut content))
                .is_ok()
                && content.contains(expected_message)
        })
}

#[test]
fn test_parse_level_accepts_known_levels() {
    assert_eq!(parse_level("info").unwrap(), Level::INFO);
    assert_eq!(parse_level(" DEBUG ").unwrap(), Level::DEBUG);
    assert!(matches!(parse_level("loud"), Err(UtilsError::Config(_))));
}

// Глобальный подписчик может быть установлен только один раз на процесс,
// поэтому оба сценария проверяются в одном тесте.
#[test]
#[serial]
fn test_logger_init_with_file_then_reinit_fails() {
    let temp_dir = tempdir().unwrap();
    let log_file_dir = temp_dir.path();
    let app_name = "stage_logger_test";
    let log_message = "Сообщение для записи в файл из utils_crate (тест).";

    match init_tracing_logger(app_name, Level::INFO, Level::DEBUG, Some(log_file_dir)) {
        Ok(()) => {
            tracing::info!(target: "stage_logger_test", "{}", log_message);
            assert!(
                log_file_contains(log_file_dir, app_name, log_message),
                "Сообщение INFO не найдено в лог-файле."
            );
        }
        Err(UtilsError::Generic(msg)) => {
            println!("[ПРЕДУПРЕЖДЕНИЕ] Логгер уже инициализирован: {msg}");
        }
        Err(e) => panic!("Неожиданная ошибка при инициализации логгера: {e:?}"),
    }

    let second = init_tracing_logger(app_name, Level::INFO, Level::INFO, None);
    assert!(matches!(second, Err(UtilsError::Generic(_))));
}
