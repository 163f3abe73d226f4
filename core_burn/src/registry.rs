// core_burn/src/registry.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Реестр именованных конфигураций моделей.
//!
//! Реестр является явным значением, а не глобальным состоянием: его создают,
//! наполняют и передают туда, где нужно построить модель по имени.

use std::collections::BTreeMap;

use burn::tensor::backend::Backend;
use tracing::{debug, warn};

use crate::{
    architectures::{
        stage::{StageTransformer, StageTransformerConfig},
        MixerKind,
    },
    BurnCoreError,
};

/// Фабрика конфигурации модели.
pub type ModelFactory = fn() -> StageTransformerConfig;

/// Таблица `имя -> фабрика конфигурации`. Имена упорядочены лексикографически.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    factories: BTreeMap<&'static str, ModelFactory>,
}

impl ModelRegistry {
    /// Пустой реестр.
    pub fn new() -> Self {
        Self::default()
    }

    /// Реестр со встроенными вариантами моделей.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("stage_tiny_fast_p4", stage_tiny_fast_p4);
        registry.register("stage_tiny_fast_p7", stage_tiny_fast_p7);
        registry.register("stage_tiny_lin_p4", stage_tiny_lin_p4);
        registry.register("stage_tiny_lin_p7", stage_tiny_lin_p7);
        registry
    }

    /// Регистрирует фабрику; возвращает прежнюю, если имя уже было занято.
    pub fn register(&mut self, name: &'static str, factory: ModelFactory) -> Option<ModelFactory> {
        let previous = self.factories.insert(name, factory);
        if previous.is_some() {
            warn!("Модель '{}' перерегистрирована.", name);
        } else {
            debug!("Модель '{}' зарегистрирована.", name);
        }
        previous
    }

    /// Есть ли модель с таким именем.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Имена зарегистрированных моделей.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Количество моделей.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Пуст ли реестр.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Конфигурация модели по имени.
    ///
    /// # Errors
    /// `BurnCoreError::UnknownModel`, если имя не зарегистрировано.
    pub fn config(&self, name: &str) -> Result<StageTransformerConfig, BurnCoreError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| BurnCoreError::UnknownModel(name.to_string()))
    }

    /// Строит модель по имени с заданным числом классов.
    ///
    /// # Errors
    /// `BurnCoreError::UnknownModel` для незарегистрированного имени,
    /// `BurnCoreError::InvalidConfig`, если конфигурация некорректна.
    pub fn create<B: Backend>(
        &self,
        name: &str,
        num_classes: usize,
        device: &B::Device,
    ) -> Result<StageTransformer<B>, BurnCoreError> {
        let config = self.config(name)?.with_num_classes(num_classes);
        debug!(model = name, num_classes, "Создание модели из реестра");
        config.init(device)
    }
}

/// Четыре стадии, Fastformer, патч 4.
pub fn stage_tiny_fast_p4() -> StageTransformerConfig {
    StageTransformerConfig::new()
        .with_mixer(MixerKind::Fast)
        .with_patch_size(4)
}

/// Четыре стадии, Fastformer, патч 7.
pub fn stage_tiny_fast_p7() -> StageTransformerConfig {
    StageTransformerConfig::new()
        .with_mixer(MixerKind::Fast)
        .with_patch_size(7)
}

/// Четыре стадии, Linformer, патч 4.
pub fn stage_tiny_lin_p4() -> StageTransformerConfig {
    StageTransformerConfig::new()
        .with_mixer(MixerKind::Linformer)
        .with_patch_size(4)
        .with_qkv_bias(true)
        .with_kv_tokens_ratio(8)
}

/// Четыре стадии, Linformer, патч 7.
pub fn stage_tiny_lin_p7() -> StageTransformerConfig {
    StageTransformerConfig::new()
        .with_mixer(MixerKind::Linformer)
        .with_patch_size(7)
        .with_qkv_bias(true)
        .with_kv_tokens_ratio(8)
}
