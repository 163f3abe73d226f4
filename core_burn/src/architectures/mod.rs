// core_burn/src/architectures/mod.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Корневой модуль архитектур моделей.
//!
//! Здесь же определены общие типы, описывающие модель без ее весов:
//! вид механизма внимания и геометрия стадий.

pub mod stage;

use burn::config::Config;
use serde::{Deserialize, Serialize};

/// Механизм смешивания токенов в блоках внимания.
#[derive(Config, Debug, PartialEq, Eq, Copy)]
pub enum MixerKind {
    /// Аддитивное внимание Fastformer; работает с любым числом токенов.
    Fast,
    /// Внимание Linformer; привязано к числу токенов стадии.
    Linformer,
}

/// Геометрия одной стадии модели.
///
/// Используется для логирования и вывода в CLI; сериализуется в JSON/TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageInfo {
    /// Номер стадии, начиная с нуля.
    pub index: usize,
    /// Сторона квадратной сетки токенов.
    pub resolution: usize,
    /// Число токенов, `resolution^2`.
    pub num_tokens: usize,
    /// Сокращенное число токенов K и V; только для Linformer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kv_tokens: Option<usize>,
    /// Ширина каналов.
    pub dim: usize,
    /// Количество голов.
    pub num_heads: usize,
    /// Количество блоков.
    pub depth: usize,
}
