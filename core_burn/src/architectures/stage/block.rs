// core_burn/src/architectures/stage/block.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Pre-norm блок трансформера с заменяемым механизмом смешивания токенов.
//!
//! ```text
//! x = x + drop_path(mixer(norm1(x)))
//! x = x + drop_path(mlp(norm2(x)))
//! ```

use burn::{
    config::Config,
    module::Module,
    nn::{LayerNorm, LayerNormConfig},
    tensor::{backend::Backend, Tensor},
};
use tracing::debug;

use super::{
    heads::check_channels,
    fast_attention::{FastAttention, FastAttentionConfig},
    lin_attention::{LinAttention, LinAttentionConfig},
    mlp::{Mlp, MlpConfig},
};
use crate::{
    architectures::MixerKind,
    drop_path::{DropPath, DropPathConfig},
    validation::ConfigValidator,
    BurnCoreError,
};

/// Конфигурация для [`AttentionBlock`].
#[derive(Config, Debug)]
pub struct AttentionBlockConfig {
    /// Ширина каналов.
    pub dim: usize,
    /// Количество голов.
    pub num_heads: usize,
    /// Механизм смешивания токенов.
    #[config(default = "MixerKind::Fast")]
    pub mixer: MixerKind,
    /// Число токенов; обязательно для [`MixerKind::Linformer`].
    pub num_tokens: Option<usize>,
    /// Коэффициент сокращения токенов K и V для [`MixerKind::Linformer`].
    #[config(default = 4)]
    pub kv_tokens_ratio: usize,
    /// Отношение скрытой размерности MLP к `dim`.
    #[config(default = 4.0)]
    pub mlp_ratio: f64,
    /// Смещение в проекции QKV.
    #[config(default = false)]
    pub qkv_bias: bool,
    /// Переопределение масштаба скоров.
    pub qk_scale: Option<f64>,
    /// Дропаут выхода внимания и MLP.
    #[config(default = 0.0)]
    pub drop: f64,
    /// Дропаут внутри механизма внимания.
    #[config(default = 0.0)]
    pub attn_drop: f64,
    /// Вероятность stochastic depth для обеих остаточных ветвей.
    #[config(default = 0.0)]
    pub drop_path: f64,
    /// Эпсилон нормализаций.
    #[config(default = 1e-5)]
    pub norm_eps: f64,
}

impl AttentionBlockConfig {
    /// Скрытая размерность MLP: `floor(dim * mlp_ratio)`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn mlp_hidden(&self) -> usize {
        (self.dim as f64 * self.mlp_ratio) as usize
    }

    /// Создает новый экземпляр [`AttentionBlock`].
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig` при некорректных гиперпараметрах блока
    /// или выбранного механизма внимания.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<AttentionBlock<B>, BurnCoreError> {
        let mut validator = ConfigValidator::new("AttentionBlock");
        if !(self.mlp_ratio.is_finite() && self.mlp_ratio > 0.0) {
            validator.push(format!(
                "mlp_ratio ({}) должен быть конечным положительным числом.",
                self.mlp_ratio
            ));
        }
        if !(self.norm_eps.is_finite() && self.norm_eps > 0.0) {
            validator.push(format!(
                "norm_eps ({}) должен быть положительным.",
                self.norm_eps
            ));
        }
        if self.mixer == MixerKind::Linformer && self.num_tokens.is_none() {
            validator.push("num_tokens обязателен для механизма Linformer.");
        }
        validator.finish()?;

        let mixer = match (self.mixer, self.num_tokens) {
            (MixerKind::Linformer, Some(num_tokens)) => TokenMixer::Linformer(
                LinAttentionConfig::new(self.dim, num_tokens)
                    .with_kv_tokens_ratio(self.kv_tokens_ratio)
                    .with_num_heads(self.num_heads)
                    .with_qkv_bias(self.qkv_bias)
                    .with_qk_scale(self.qk_scale)
                    .with_attn_drop(self.attn_drop)
                    .with_proj_drop(self.drop)
                    .init(device)?,
            ),
            _ => TokenMixer::Fast(
                FastAttentionConfig::new(self.dim)
                    .with_num_heads(self.num_heads)
                    .with_qkv_bias(self.qkv_bias)
                    .with_qk_scale(self.qk_scale)
                    .with_attn_drop(self.attn_drop)
                    .with_proj_drop(self.drop)
                    .init(device)?,
            ),
        };

        let mlp = MlpConfig::new(self.dim, self.mlp_hidden())
            .with_drop(self.drop)
            .init(device)?;
        let drop_path = DropPathConfig::new().with_prob(self.drop_path).init()?;

        debug!(
            dim = self.dim,
            mixer = %self.mixer,
            drop_path = self.drop_path,
            "Блок внимания создан"
        );

        Ok(AttentionBlock {
            dim: self.dim,
            norm1: LayerNormConfig::new(self.dim)
                .with_epsilon(self.norm_eps)
                .init(device),
            mixer,
            drop_path,
            norm2: LayerNormConfig::new(self.dim)
                .with_epsilon(self.norm_eps)
                .init(device),
            mlp,
        })
    }
}

/// Механизм смешивания токенов внутри блока.
#[derive(Module, Debug)]
pub enum TokenMixer<B: Backend> {
    /// Аддитивное внимание Fastformer.
    Fast(FastAttention<B>),
    /// Внимание Linformer.
    Linformer(LinAttention<B>),
}

impl<B: Backend> TokenMixer<B> {
    /// Вид механизма.
    pub const fn kind(&self) -> MixerKind {
        match self {
            Self::Fast(_) => MixerKind::Fast,
            Self::Linformer(_) => MixerKind::Linformer,
        }
    }

    /// Прямой проход выбранного механизма.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch` от механизма внимания.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        match self {
            Self::Fast(attention) => attention.forward(x),
            Self::Linformer(attention) => attention.forward(x),
        }
    }
}

/// Pre-norm блок: внимание и MLP, каждое в остаточной ветви со stochastic depth.
#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    dim: usize,
    norm1: LayerNorm<B>,
    mixer: TokenMixer<B>,
    drop_path: DropPath,
    norm2: LayerNorm<B>,
    mlp: Mlp<B>,
}

impl<B: Backend> AttentionBlock<B> {
    /// Механизм смешивания токенов блока.
    pub const fn mixer(&self) -> &TokenMixer<B> {
        &self.mixer
    }

    /// Вероятность stochastic depth блока.
    pub const fn drop_path_prob(&self) -> f64 {
        self.drop_path.prob()
    }

    /// Прямой проход: `[batch, tokens, dim]` -> `[batch, tokens, dim]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если вход не совпадает с `dim`
    /// (или с `num_tokens` для Linformer).
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        check_channels("AttentionBlock", &x, self.dim)?;
        let attended = self.mixer.forward(self.norm1.forward(x.clone()))?;
        let x = x.add(self.drop_path.forward(attended));

        let transformed = self.mlp.forward(self.norm2.forward(x.clone()));
        Ok(x.add(self.drop_path.forward(transformed)))
    }
}
