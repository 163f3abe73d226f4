// core_burn/src/drop_path.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Stochastic depth ("drop path") для остаточных ветвей.
//!
//! В режиме обучения ветвь целиком обнуляется для отдельных примеров батча
//! с вероятностью `prob`, а сохраненные примеры масштабируются на `1 / (1 - prob)`,
//! чтобы математическое ожидание не менялось. В режиме инференса модуль является тождеством.
//!
//! Режим определяется так же, как у `burn::nn::Dropout`: обучение соответствует бэкенду
//! с включенным autodiff (`B::ad_enabled()`), инференс соответствует внутреннему бэкенду после `valid()`.

use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Distribution, Tensor},
};

use crate::{validation::ConfigValidator, BurnCoreError};

/// Конфигурация для [`DropPath`].
#[derive(Config, Debug)]
pub struct DropPathConfig {
    /// Вероятность отбросить ветвь для отдельного примера, `[0, 1]`.
    #[config(default = 0.0)]
    pub prob: f64,
}

impl DropPathConfig {
    /// Создает [`DropPath`], проверив вероятность.
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig`, если `prob` вне `[0, 1]`.
    pub fn init(&self) -> Result<DropPath, BurnCoreError> {
        let mut validator = ConfigValidator::new("DropPath");
        validator.drop_path("prob", self.prob);
        validator.finish()?;
        Ok(DropPath { prob: self.prob })
    }
}

/// Stochastic depth. Параметров не имеет; `prob` хранится как константа модуля.
#[derive(Module, Clone, Debug)]
pub struct DropPath {
    prob: f64,
}

impl DropPath {
    /// Вероятность отбросить ветвь.
    pub const fn prob(&self) -> f64 {
        self.prob
    }

    /// Применяет stochastic depth к ветви формы `[batch, ...]`.
    ///
    /// Маска имеет форму `[batch, 1, ..., 1]`: решение принимается один раз на пример.
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if !B::ad_enabled() || self.prob == 0.0 {
            return input;
        }

        let keep_prob = 1.0 - self.prob;
        let mut mask_shape = [1usize; D];
        mask_shape[0] = input.dims()[0];

        let mask = Tensor::<B, D>::random(
            mask_shape,
            Distribution::Bernoulli(keep_prob),
            &input.device(),
        );
        // При prob == 1 маска нулевая и масштабировать нечего.
        let mask = if keep_prob > 0.0 {
            mask.div_scalar(keep_prob)
        } else {
            mask
        };

        input.mul(mask)
    }
}
