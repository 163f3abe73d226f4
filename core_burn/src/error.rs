// core_burn/src/error.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Ошибки крейта: некорректная конфигурация, несовпадение форм и неизвестная модель.

/// Перечисление всех возможных ошибок, которые могут возникнуть в крейте `core_burn`.
///
/// Ошибки конфигурации обнаруживаются при построении модулей (`*Config::init`),
/// ошибки формы обнаруживаются в начале `forward`, до первого матричного умножения.
/// Локального восстановления нет: обе категории означают ошибку в модели или конфигурации.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BurnCoreError {
    /// Некорректная конфигурация модели или ее компонентов:
    /// `dim` не делится на `num_heads`, `num_tokens / kv_tokens_ratio == 0`,
    /// вероятность дропаута вне допустимого диапазона и т.д.
    #[error("Некорректная конфигурация: {0}")]
    InvalidConfig(String),

    /// Форма входного тензора не совпадает с формой, зафиксированной при построении модуля.
    #[error(
        "Несовместимая форма тензора в {component}: по оси '{axis}' ожидалось {expected}, получено {actual}"
    )]
    ShapeMismatch {
        /// Модуль, обнаруживший несовпадение (например, `LinAttention`).
        component: &'static str,
        /// Имя оси (`channels`, `tokens`, `height`, ...).
        axis: &'static str,
        /// Ожидаемый размер оси.
        expected: usize,
        /// Фактический размер оси.
        actual: usize,
    },

    /// Запрошенная архитектура не зарегистрирована в `ModelRegistry`.
    #[error("Неизвестная модель: '{0}'")]
    UnknownModel(String),
}

impl BurnCoreError {
    /// Проверяет размер оси и возвращает `ShapeMismatch`, если он не совпадает с ожидаемым.
    pub(crate) const fn check_axis(
        component: &'static str,
        axis: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                component,
                axis,
                expected,
                actual,
            })
        }
    }
}
