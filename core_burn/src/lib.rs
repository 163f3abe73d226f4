// core_burn/src/lib.rs

// Включаем строгие правила линтинга для всего крейта.
#![warn(
    missing_docs, // Предупреждать об отсутствующей документации для публичных элементов.
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![deny(
    unsafe_code,
    clippy::unwrap_used, // Ошибки пробрасываются через `Result`.
    clippy::expect_used
)]

//! # `core_burn`
//!
//! Ядро моделей на фреймворке [Burn](https://burn.dev/): эффективные механизмы
//! внимания для vision-трансформеров и многостадийная модель на их основе.
//!
//! ## Структура
//!
//! - `architectures`: механизмы внимания (`FastAttention`, `LinAttention`), блок,
//!   модель `StageTransformer` и общие типы (`MixerKind`, `StageInfo`).
//! - `drop_path`: stochastic depth для остаточных ветвей.
//! - `registry`: реестр именованных конфигураций моделей.
//! - `error`: тип ошибок крейта.
//!
//! Все конструкторы проверяют гиперпараметры и возвращают `BurnCoreError::InvalidConfig`,
//! а прямые проходы возвращают `BurnCoreError::ShapeMismatch` вместо паники
//! при несовместимом входе.

pub mod architectures;
pub mod drop_path;
pub mod error;
pub mod registry;

mod validation;

// Ошибки
pub use error::BurnCoreError;

// Компоненты моделей
pub use drop_path::{DropPath, DropPathConfig};

// Архитектуры и их конфигурации
pub use architectures::stage::{
    AttentionBlock, AttentionBlockConfig, FastAttention, FastAttentionConfig, FastAttentionTrace,
    LinAttention, LinAttentionConfig, LinAttentionTrace, Mlp, MlpConfig, StageTransformer,
    StageTransformerConfig, StageTransformerRecord, TokenMixer,
};
pub use architectures::{MixerKind, StageInfo};

// Реестр моделей
pub use registry::{ModelFactory, ModelRegistry};
