// core_burn/src/architectures/stage/lin_attention.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Внимание в стиле Linformer: ключи и значения проецируются по оси токенов
//! из `N` в `K = N / kv_tokens_ratio`, после чего выполняется обычное
//! scaled dot-product внимание `N x K`.
//!
//! Веса проекции имеют фиксированную форму `[N, K]`, поэтому модуль работает только
//! с тем числом токенов, с которым был построен.

use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    tensor::{activation::softmax, backend::Backend, Tensor},
};
use tracing::debug;

use super::heads::{check_channels, merge_heads, score_scale, split_qkv};
use crate::{validation::ConfigValidator, BurnCoreError};

const COMPONENT: &str = "LinAttention";

/// Конфигурация для [`LinAttention`].
#[derive(Config, Debug)]
pub struct LinAttentionConfig {
    /// Общая ширина каналов; должна делиться на `num_heads`.
    pub dim: usize,
    /// Число токенов стадии (произведение пространственного разрешения).
    pub num_tokens: usize,
    /// Во сколько раз сокращается число токенов для K и V.
    #[config(default = 4)]
    pub kv_tokens_ratio: usize,
    /// Количество голов.
    #[config(default = 8)]
    pub num_heads: usize,
    /// Аддитивное смещение в проекции QKV.
    #[config(default = false)]
    pub qkv_bias: bool,
    /// Переопределение масштаба `head_dim^-0.5`.
    pub qk_scale: Option<f64>,
    /// Дропаут матрицы внимания.
    #[config(default = 0.0)]
    pub attn_drop: f64,
    /// Дропаут выхода.
    #[config(default = 0.0)]
    pub proj_drop: f64,
}

impl LinAttentionConfig {
    /// Сокращенное число токенов `K = num_tokens / kv_tokens_ratio`.
    pub const fn kv_tokens(&self) -> usize {
        match self.num_tokens.checked_div(self.kv_tokens_ratio) {
            Some(kv_tokens) => kv_tokens,
            None => 0,
        }
    }

    /// Создает новый экземпляр [`LinAttention`].
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig`, если `dim` не делится на `num_heads`,
    /// `kv_tokens_ratio == 0`, `num_tokens / kv_tokens_ratio == 0`
    /// или вероятности дропаута вне `[0, 1)`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<LinAttention<B>, BurnCoreError> {
        let mut validator = ConfigValidator::new(COMPONENT);
        validator.heads(self.dim, self.num_heads);
        validator.positive("num_tokens", self.num_tokens);
        validator.positive("kv_tokens_ratio", self.kv_tokens_ratio);
        if self.num_tokens > 0 && self.kv_tokens_ratio > 0 && self.kv_tokens() == 0 {
            validator.push(format!(
                "num_tokens ({}) / kv_tokens_ratio ({}) == 0: для K и V не остается ни одного токена.",
                self.num_tokens, self.kv_tokens_ratio
            ));
        }
        validator.scale(self.qk_scale);
        validator.dropout("attn_drop", self.attn_drop);
        validator.dropout("proj_drop", self.proj_drop);
        validator.finish()?;

        let head_dim = self.dim / self.num_heads;
        let kv_tokens = self.kv_tokens();
        debug!(
            dim = self.dim,
            num_heads = self.num_heads,
            num_tokens = self.num_tokens,
            kv_tokens,
            "Инициализация LinAttention"
        );

        Ok(LinAttention {
            qkv: LinearConfig::new(self.dim, self.dim * 3)
                .with_bias(self.qkv_bias)
                .init(device),
            proj_k: LinearConfig::new(self.num_tokens, kv_tokens).init(device),
            proj_v: LinearConfig::new(self.num_tokens, kv_tokens).init(device),
            proj: LinearConfig::new(self.dim, self.dim).init(device),
            attn_drop: DropoutConfig::new(self.attn_drop).init(),
            proj_drop: DropoutConfig::new(self.proj_drop).init(),
            dim: self.dim,
            num_heads: self.num_heads,
            num_tokens: self.num_tokens,
            kv_tokens,
            scale: score_scale(self.qk_scale, head_dim),
        })
    }
}

/// Внимание Linformer с фиксированным числом токенов.
#[derive(Module, Debug)]
pub struct LinAttention<B: Backend> {
    /// Объединенная проекция Q, K, V.
    qkv: Linear<B>,
    /// Проекция оси токенов ключей `N -> K`.
    proj_k: Linear<B>,
    /// Проекция оси токенов значений `N -> K`.
    proj_v: Linear<B>,
    /// Выходная проекция.
    proj: Linear<B>,
    attn_drop: Dropout,
    proj_drop: Dropout,
    dim: usize,
    num_heads: usize,
    num_tokens: usize,
    kv_tokens: usize,
    scale: f64,
}

/// Результат [`LinAttention::forward_traced`].
#[derive(Debug, Clone)]
pub struct LinAttentionTrace<B: Backend> {
    /// Выход, `[batch, tokens, channels]`.
    pub output: Tensor<B, 3>,
    /// Матрица внимания до дропаута, `[batch, heads, tokens, kv_tokens]`; строки суммируются в 1.
    pub attention: Tensor<B, 4>,
}

impl<B: Backend> LinAttention<B> {
    /// Число токенов, зафиксированное при построении.
    pub const fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    /// Сокращенное число токенов K и V.
    pub const fn kv_tokens(&self) -> usize {
        self.kv_tokens
    }

    /// Прямой проход: `[batch, num_tokens, channels]` -> `[batch, num_tokens, channels]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если число каналов не равно `dim`
    /// или число токенов не равно `num_tokens`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        self.forward_traced(input).map(|trace| trace.output)
    }

    /// Прямой проход, дополнительно возвращающий матрицу внимания.
    ///
    /// # Errors
    /// См. [`LinAttention::forward`].
    pub fn forward_traced(
        &self,
        input: Tensor<B, 3>,
    ) -> Result<LinAttentionTrace<B>, BurnCoreError> {
        let [_, tokens, _] = check_channels(COMPONENT, &input, self.dim)?;
        // Без этой проверки несовпадение всплыло бы как ошибка матричного умножения в проекции.
        BurnCoreError::check_axis(COMPONENT, "tokens", self.num_tokens, tokens)?;

        let (query, key, value) = split_qkv(self.qkv.forward(input), self.num_heads);

        // K: [B, H, N, hd] -> [B, H, hd, N] -> [B, H, hd, K].
        let key = self.proj_k.forward(key.swap_dims(2, 3));
        // V: [B, H, hd, N] -> [B, H, hd, K] -> [B, H, K, hd].
        let value = self.proj_v.forward(value.swap_dims(2, 3)).swap_dims(2, 3);

        // [B, H, N, hd] @ [B, H, hd, K] -> [B, H, N, K].
        let scores = query.matmul(key).mul_scalar(self.scale);
        let attention = softmax(scores, 3);

        let context = self.attn_drop.forward(attention.clone()).matmul(value);
        let output = self.proj_drop.forward(self.proj.forward(merge_heads(context)));

        Ok(LinAttentionTrace { output, attention })
    }
}
