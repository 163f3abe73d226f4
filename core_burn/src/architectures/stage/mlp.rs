// core_burn/src/architectures/stage/mlp.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Полносвязная сеть (MLP) блока внимания: `fc1 -> GELU -> dropout -> fc2 -> dropout`.

use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Gelu, Linear, LinearConfig},
    tensor::{backend::Backend, Tensor},
};

use crate::{validation::ConfigValidator, BurnCoreError};

/// Конфигурация для слоя [`Mlp`].
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Входная размерность.
    pub in_features: usize,
    /// Размерность скрытого слоя (обычно `in_features * mlp_ratio`).
    pub hidden_features: usize,
    /// Выходная размерность; по умолчанию равна `in_features`.
    pub out_features: Option<usize>,
    /// Вероятность дропаута после активации и после `fc2`.
    #[config(default = 0.0)]
    pub drop: f64,
}

impl MlpConfig {
    /// Создает новый экземпляр [`Mlp`].
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig` при нулевых размерностях или `drop` вне `[0, 1)`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Mlp<B>, BurnCoreError> {
        let out_features = self.out_features.unwrap_or(self.in_features);

        let mut validator = ConfigValidator::new("Mlp");
        validator.positive("in_features", self.in_features);
        validator.positive("hidden_features", self.hidden_features);
        validator.positive("out_features", out_features);
        validator.dropout("drop", self.drop);
        validator.finish()?;

        Ok(Mlp {
            fc1: LinearConfig::new(self.in_features, self.hidden_features).init(device),
            activation: Gelu::new(),
            fc2: LinearConfig::new(self.hidden_features, out_features).init(device),
            dropout: DropoutConfig::new(self.drop).init(),
        })
    }
}

/// Двухслойный перцептрон с активацией GELU.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    fc1: Linear<B>,
    activation: Gelu,
    fc2: Linear<B>,
    /// Один и тот же дропаут применяется дважды.
    dropout: Dropout,
}

impl<B: Backend> Mlp<B> {
    /// Прямой проход; работает по последней оси тензора любого ранга.
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);
        let x = self.fc2.forward(x);
        self.dropout.forward(x)
    }
}
