// core_burn/src/architectures/stage/fast_attention.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Аддитивное внимание в стиле Fastformer с линейной сложностью по числу токенов.
//!
//! Вместо матрицы скоров `N x N` строятся два глобальных вектора на голову:
//! глобальный query (пулинг Q с весами α) и глобальный key (пулинг `p = global_q ⊙ K`
//! с весами β). Выход получается поэлементным гейтингом V глобальным key.

use burn::{
    config::Config,
    module::{Module, Param},
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    tensor::{activation::softmax, backend::Backend, Distribution, Tensor},
};
use tracing::debug;

use super::heads::{check_channels, merge_heads, score_scale, split_qkv};
use crate::{validation::ConfigValidator, BurnCoreError};

const COMPONENT: &str = "FastAttention";

/// Конфигурация для [`FastAttention`].
#[derive(Config, Debug)]
pub struct FastAttentionConfig {
    /// Общая ширина каналов; должна делиться на `num_heads`.
    pub dim: usize,
    /// Количество голов.
    #[config(default = 8)]
    pub num_heads: usize,
    /// Аддитивное смещение в проекции QKV.
    #[config(default = false)]
    pub qkv_bias: bool,
    /// Переопределение масштаба `head_dim^-0.5`.
    pub qk_scale: Option<f64>,
    /// Дропаут промежуточного тензора `p`.
    #[config(default = 0.0)]
    pub attn_drop: f64,
    /// Дропаут выхода.
    #[config(default = 0.0)]
    pub proj_drop: f64,
}

impl FastAttentionConfig {
    /// Создает новый экземпляр [`FastAttention`].
    ///
    /// Векторы скоринга `w_q`, `w_k` инициализируются из `N(0, 1)`.
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig`, если `dim` не делится на `num_heads`
    /// или вероятности дропаута вне `[0, 1)`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FastAttention<B>, BurnCoreError> {
        let mut validator = ConfigValidator::new(COMPONENT);
        validator.heads(self.dim, self.num_heads);
        validator.scale(self.qk_scale);
        validator.dropout("attn_drop", self.attn_drop);
        validator.dropout("proj_drop", self.proj_drop);
        validator.finish()?;

        let head_dim = self.dim / self.num_heads;
        debug!(
            dim = self.dim,
            num_heads = self.num_heads,
            head_dim,
            "Инициализация FastAttention"
        );

        let scoring_vector = || {
            Param::from_tensor(Tensor::random(
                [self.num_heads, head_dim],
                Distribution::Normal(0.0, 1.0),
                device,
            ))
        };

        Ok(FastAttention {
            qkv: LinearConfig::new(self.dim, self.dim * 3)
                .with_bias(self.qkv_bias)
                .init(device),
            proj: LinearConfig::new(self.dim, self.dim).init(device),
            w_q: scoring_vector(),
            w_k: scoring_vector(),
            attn_drop: DropoutConfig::new(self.attn_drop).init(),
            proj_drop: DropoutConfig::new(self.proj_drop).init(),
            dim: self.dim,
            num_heads: self.num_heads,
            head_dim,
            scale: score_scale(self.qk_scale, head_dim),
        })
    }
}

/// Аддитивное внимание Fastformer.
#[derive(Module, Debug)]
pub struct FastAttention<B: Backend> {
    /// Объединенная проекция Q, K, V.
    qkv: Linear<B>,
    /// Выходная проекция.
    proj: Linear<B>,
    /// Векторы скоринга query, `[num_heads, head_dim]`.
    w_q: Param<Tensor<B, 2>>,
    /// Векторы скоринга для `p`, `[num_heads, head_dim]`.
    w_k: Param<Tensor<B, 2>>,
    attn_drop: Dropout,
    proj_drop: Dropout,
    dim: usize,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

/// Результат [`FastAttention::forward_traced`]: выход и веса обоих пулингов.
#[derive(Debug, Clone)]
pub struct FastAttentionTrace<B: Backend> {
    /// Выход, `[batch, tokens, channels]`.
    pub output: Tensor<B, 3>,
    /// Веса пулинга query, `[batch, heads, tokens]`; сумма по токенам равна 1.
    pub alpha: Tensor<B, 3>,
    /// Веса пулинга key, `[batch, heads, tokens]`; сумма по токенам равна 1.
    pub beta: Tensor<B, 3>,
}

impl<B: Backend> FastAttention<B> {
    /// Количество голов.
    pub const fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Размерность одной головы.
    pub const fn head_dim(&self) -> usize {
        self.head_dim
    }

    /// Масштаб скоров перед softmax.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Прямой проход: `[batch, tokens, channels]` -> `[batch, tokens, channels]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если число каналов не равно `dim`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        self.forward_traced(input).map(|trace| trace.output)
    }

    /// Прямой проход, дополнительно возвращающий веса α и β.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если число каналов не равно `dim`.
    pub fn forward_traced(
        &self,
        input: Tensor<B, 3>,
    ) -> Result<FastAttentionTrace<B>, BurnCoreError> {
        let [batch, tokens, _] = check_channels(COMPONENT, &input, self.dim)?;

        // 1. Q, K, V: [batch, heads, tokens, head_dim].
        let (query, key, value) = split_qkv(self.qkv.forward(input), self.num_heads);

        // 2-3. α и глобальный query.
        let (alpha, global_query) = self.additive_pool(query.clone(), self.w_q.val());

        // 4. p = global_q ⊙ K (бродкаст по токенам).
        let mixed = self.attn_drop.forward(key.mul(global_query));

        // 5. β и глобальный key (пулинг по p).
        let (beta, global_key) = self.additive_pool(mixed, self.w_k.val());

        // 6. u = global_k ⊙ V.
        let gated = value.mul(global_key);

        // 7-8. Склейка голов; к проекции u прибавляется исходный per-token Q.
        let output = self
            .proj
            .forward(merge_heads(gated))
            .add(merge_heads(query));
        let output = self.proj_drop.forward(output);

        let weights_shape = [batch, self.num_heads, tokens];
        Ok(FastAttentionTrace {
            output,
            alpha: alpha.reshape(weights_shape),
            beta: beta.reshape(weights_shape),
        })
    }

    /// Аддитивный пулинг по токенам.
    ///
    /// `x`: `[batch, heads, tokens, head_dim]`, `scoring`: `[heads, head_dim]`.
    /// Возвращает веса `[batch, heads, tokens, 1]` и взвешенную сумму `[batch, heads, 1, head_dim]`.
    fn additive_pool(
        &self,
        x: Tensor<B, 4>,
        scoring: Tensor<B, 2>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let scoring = scoring.reshape([1, self.num_heads, 1, self.head_dim]);
        let scores = x.clone().mul(scoring).sum_dim(3).mul_scalar(self.scale);
        let weights = softmax(scores, 2);
        let pooled = x.mul(weights.clone()).sum_dim(2);
        (weights, pooled)
    }
}
