// core_burn/src/architectures/stage/mod.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Многостадийный vision-трансформер с эффективными механизмами внимания.
//!
//! Подмодули:
//! - `fast_attention`: аддитивное внимание Fastformer, `O(N)` по числу токенов.
//! - `lin_attention`: внимание Linformer с проекцией K и V по оси токенов.
//! - `mlp`: полносвязная сеть блока.
//! - `block`: pre-norm блок со stochastic depth.
//! - `model`: нарезка патчей, стадии и голова классификатора.

mod heads;

pub mod block;
pub mod fast_attention;
pub mod lin_attention;
pub mod mlp;
pub mod model;

pub use block::{AttentionBlock, AttentionBlockConfig, AttentionBlockRecord, TokenMixer};
pub use fast_attention::{FastAttention, FastAttentionConfig, FastAttentionRecord, FastAttentionTrace};
pub use lin_attention::{LinAttention, LinAttentionConfig, LinAttentionRecord, LinAttentionTrace};
pub use mlp::{Mlp, MlpConfig};
pub use model::{
    PatchEmbed, PatchMerging, Stage, StageTransformer, StageTransformerConfig,
    StageTransformerRecord,
};
