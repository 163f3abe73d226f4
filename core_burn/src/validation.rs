// core_burn/src/validation.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Проверка гиперпараметров модулей до выделения каких-либо тензоров.
//!
//! Валидатор собирает все нарушения, а не только первое, и возвращает их
//! одной ошибкой `BurnCoreError::InvalidConfig`, объединенной через `"; "`.

use tracing::{debug, warn};

use crate::BurnCoreError;

/// Накопитель ошибок конфигурации для одного компонента.
#[derive(Debug)]
pub(crate) struct ConfigValidator {
    component: &'static str,
    errors: Vec<String>,
}

impl ConfigValidator {
    pub(crate) const fn new(component: &'static str) -> Self {
        Self {
            component,
            errors: Vec::new(),
        }
    }

    /// Добавляет произвольное нарушение.
    pub(crate) fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// `value` должен быть строго положительным.
    pub(crate) fn positive(&mut self, name: &str, value: usize) {
        if value == 0 {
            self.push(format!("{name} не может быть равен нулю."));
        }
    }

    /// Каналы должны делиться на головы без остатка.
    pub(crate) fn heads(&mut self, dim: usize, num_heads: usize) {
        self.positive("dim", dim);
        self.positive("num_heads", num_heads);
        if num_heads != 0 && dim % num_heads != 0 {
            self.push(format!(
                "dim ({dim}) должен быть кратен num_heads ({num_heads})."
            ));
        }
    }

    /// Вероятность дропаута: `[0, 1)`.
    pub(crate) fn dropout(&mut self, name: &str, prob: f64) {
        if !(0.0..1.0).contains(&prob) {
            self.push(format!(
                "{name} ({prob}) должна лежать в диапазоне [0, 1)."
            ));
        }
    }

    /// Вероятность stochastic depth: `[0, 1]`; при 1 ветвь всегда отбрасывается в режиме обучения.
    pub(crate) fn drop_path(&mut self, name: &str, prob: f64) {
        if !(0.0..=1.0).contains(&prob) {
            self.push(format!(
                "{name} ({prob}) должна лежать в диапазоне [0, 1]."
            ));
        }
    }

    /// Масштаб скоров должен быть конечным положительным числом.
    pub(crate) fn scale(&mut self, qk_scale: Option<f64>) {
        if let Some(scale) = qk_scale {
            if !(scale.is_finite() && scale > 0.0) {
                self.push(format!(
                    "qk_scale ({scale}) должен быть конечным положительным числом."
                ));
            }
        }
    }

    /// Завершает проверку: `Ok(())` или одна ошибка со всеми нарушениями.
    pub(crate) fn finish(self) -> Result<(), BurnCoreError> {
        if self.errors.is_empty() {
            debug!("Конфигурация {} успешно валидирована.", self.component);
            return Ok(());
        }
        let message = format!("{}: {}", self.component, self.errors.join("; "));
        warn!("Валидация конфигурации не пройдена: {}", message);
        Err(BurnCoreError::InvalidConfig(message))
    }
}
