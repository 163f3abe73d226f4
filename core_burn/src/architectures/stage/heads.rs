// core_burn/src/architectures/stage/heads.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Общие операции над головами внимания для обоих механизмов.

use burn::tensor::{backend::Backend, Tensor};

use crate::BurnCoreError;

/// Проверяет вход `[batch, tokens, channels]` и возвращает его размерности.
pub(crate) fn check_channels<B: Backend>(
    component: &'static str,
    input: &Tensor<B, 3>,
    dim: usize,
) -> Result<[usize; 3], BurnCoreError> {
    let dims = input.dims();
    BurnCoreError::check_axis(component, "channels", dim, dims[2])?;
    Ok(dims)
}

/// Делит объединенную проекцию `[batch, tokens, 3 * channels]` на Q, K, V
/// формы `[batch, heads, tokens, head_dim]`.
pub(crate) fn split_qkv<B: Backend>(
    qkv: Tensor<B, 3>,
    num_heads: usize,
) -> (Tensor<B, 4>, Tensor<B, 4>, Tensor<B, 4>) {
    let [batch, tokens, qkv_dim] = qkv.dims();
    let head_dim = qkv_dim / (3 * num_heads);

    // Порядок каналов: (qkv, head, head_dim).
    let qkv = qkv.reshape([batch, tokens, 3, num_heads, head_dim]);
    let part = |index: usize| {
        qkv.clone()
            .narrow(2, index, 1)
            .reshape([batch, tokens, num_heads, head_dim])
            .swap_dims(1, 2)
    };

    (part(0), part(1), part(2))
}

/// Склеивает головы обратно: `[batch, heads, tokens, head_dim]` -> `[batch, tokens, channels]`.
pub(crate) fn merge_heads<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, heads, tokens, head_dim] = x.dims();
    x.swap_dims(1, 2).reshape([batch, tokens, heads * head_dim])
}

/// Масштаб скоров: явный `qk_scale` или `head_dim^-0.5`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn score_scale(qk_scale: Option<f64>, head_dim: usize) -> f64 {
    qk_scale.unwrap_or_else(|| (head_dim as f64).powf(-0.5))
}
