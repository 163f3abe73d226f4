#[cfg(feature = "config_toml")]
mod toml_config_feature_tests {
    use std::io::Write;
    use std::path::Path;

    use serde::Deserialize;
    use tempfile::NamedTempFile;
    use utils_crate::config::{load_toml_or_default, LoggingConfigSub};
    use utils_crate::error::UtilsError;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct SampleConfig {
        epochs: usize,
        logging: LoggingConfigSub,
    }

    #[test]
    fn test_logging_config_default_values_ct() {
        let config = LoggingConfigSub::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file_level, "debug");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_load_from_toml_exists_ct() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
            epochs = 12

            [logging]
            level = "debug"
            log_dir = "/var/log/stage"
        "#;
        writeln!(temp_file, "{toml_content}").unwrap();

        let config: SampleConfig = load_toml_or_default(temp_file.path()).unwrap();
        assert_eq!(config.epochs, 12);
        assert_eq!(config.logging.level, "debug");
        // Не указанное поле секции берется из значения по умолчанию.
        assert_eq!(config.logging.file_level, "debug");
        assert_eq!(config.logging.log_dir, Some("/var/log/stage".to_string()));
    }

    #[test]
    fn test_file_not_found_returns_default_ct() {
        let non_existent_path = Path::new("/totally/non/existent/path/config.toml");
        let config: SampleConfig = load_toml_or_default(non_existent_path).unwrap();
        assert_eq!(config, SampleConfig::default());
    }

    #[test]
    fn test_invalid_toml_ct() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "epochs = \"not_a_number\"").unwrap();

        let result: Result<SampleConfig, _> = load_toml_or_default(temp_file.path());
        match result {
            Err(UtilsError::Config(msg)) => {
                assert!(msg.contains("Failed to parse config from TOML"));
            }
            other => panic!("Expected a Config error for invalid TOML, got {other:?}"),
        }
    }
}
