// core_burn/src/architectures/stage/model.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Иерархический vision-трансформер из нескольких стадий.
//!
//! Изображение режется на патчи свёрткой `patch_size x patch_size`, затем каждая стадия
//! (кроме первой) сливает соседние `2 x 2` токена, удваивая шаг сетки, и прогоняет
//! последовательность через свои блоки внимания. Голова классификатора усредняет токены
//! последней стадии.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        LayerNorm, LayerNormConfig, Linear, LinearConfig,
    },
    tensor::{backend::Backend, Tensor},
};
use tracing::{debug, info};

use super::block::{AttentionBlock, AttentionBlockConfig};
use crate::{
    architectures::{MixerKind, StageInfo},
    validation::ConfigValidator,
    BurnCoreError,
};

const COMPONENT: &str = "StageTransformer";

/// Конфигурация для [`StageTransformer`].
#[derive(Config, Debug)]
pub struct StageTransformerConfig {
    /// Механизм внимания всех блоков.
    #[config(default = "MixerKind::Fast")]
    pub mixer: MixerKind,
    /// Размер стороны квадратного изображения.
    #[config(default = 224)]
    pub img_size: usize,
    /// Сторона патча первой стадии.
    #[config(default = 4)]
    pub patch_size: usize,
    /// Число входных каналов изображения.
    #[config(default = 3)]
    pub in_chans: usize,
    /// Число классов головы.
    #[config(default = 1000)]
    pub num_classes: usize,
    /// Ширина каналов каждой стадии.
    #[config(default = "vec![64, 128, 256, 512]")]
    pub embed_dims: Vec<usize>,
    /// Число блоков каждой стадии.
    #[config(default = "vec![2, 2, 2, 2]")]
    pub depths: Vec<usize>,
    /// Число голов каждой стадии.
    #[config(default = "vec![2, 4, 8, 16]")]
    pub num_heads: Vec<usize>,
    /// Отношение скрытой размерности MLP к ширине стадии.
    #[config(default = 4.0)]
    pub mlp_ratio: f64,
    /// Смещение в проекциях QKV.
    #[config(default = false)]
    pub qkv_bias: bool,
    /// Переопределение масштаба скоров.
    pub qk_scale: Option<f64>,
    /// Дропаут выходов внимания и MLP.
    #[config(default = 0.0)]
    pub drop_rate: f64,
    /// Дропаут внутри внимания.
    #[config(default = 0.0)]
    pub attn_drop_rate: f64,
    /// Stochastic depth последнего блока; по блокам растет линейно от нуля.
    #[config(default = 0.1)]
    pub drop_path_rate: f64,
    /// Эпсилон всех нормализаций.
    #[config(default = 1e-6)]
    pub norm_eps: f64,
    /// Сокращение токенов K и V для Linformer.
    #[config(default = 8)]
    pub kv_tokens_ratio: usize,
}

impl StageTransformerConfig {
    /// Проверяет согласованность гиперпараметров без выделения тензоров.
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig` со списком всех найденных нарушений.
    pub fn validate(&self) -> Result<(), BurnCoreError> {
        let mut validator = ConfigValidator::new(COMPONENT);
        validator.positive("img_size", self.img_size);
        validator.positive("patch_size", self.patch_size);
        validator.positive("in_chans", self.in_chans);
        validator.positive("num_classes", self.num_classes);
        validator.positive("kv_tokens_ratio", self.kv_tokens_ratio);
        validator.scale(self.qk_scale);
        validator.dropout("drop_rate", self.drop_rate);
        validator.dropout("attn_drop_rate", self.attn_drop_rate);
        validator.drop_path("drop_path_rate", self.drop_path_rate);

        let num_stages = self.embed_dims.len();
        if num_stages == 0 {
            validator.push("нужна хотя бы одна стадия.");
        }
        if self.depths.len() != num_stages || self.num_heads.len() != num_stages {
            validator.push(format!(
                "embed_dims ({}), depths ({}) и num_heads ({}) должны иметь одинаковую длину.",
                num_stages,
                self.depths.len(),
                self.num_heads.len()
            ));
        }
        for (index, (&dim, &heads)) in self.embed_dims.iter().zip(&self.num_heads).enumerate() {
            if heads == 0 || dim % heads != 0 {
                validator.push(format!(
                    "стадия {index}: dim ({dim}) должен быть кратен num_heads ({heads})."
                ));
            }
        }

        if self.patch_size > 0 && self.img_size % self.patch_size != 0 {
            validator.push(format!(
                "img_size ({}) должен делиться на patch_size ({}).",
                self.img_size, self.patch_size
            ));
        } else if self.patch_size > 0 {
            let mut resolution = self.img_size / self.patch_size;
            for index in 0..num_stages {
                if index > 0 {
                    if resolution % 2 != 0 || resolution < 2 {
                        validator.push(format!(
                            "стадия {index}: разрешение {resolution} нельзя слить окнами 2x2."
                        ));
                        break;
                    }
                    resolution /= 2;
                }
                let tokens = resolution * resolution;
                if self.mixer == MixerKind::Linformer
                    && self.kv_tokens_ratio > 0
                    && tokens / self.kv_tokens_ratio == 0
                {
                    validator.push(format!(
                        "стадия {index}: {tokens} токенов / kv_tokens_ratio ({}) == 0.",
                        self.kv_tokens_ratio
                    ));
                }
            }
        }

        validator.finish()
    }

    /// Геометрия стадий: разрешение, число токенов, ширина и глубина.
    ///
    /// Предполагает корректную конфигурацию (см. [`Self::validate`]).
    pub fn stage_layout(&self) -> Vec<StageInfo> {
        let mut resolution = self.img_size.checked_div(self.patch_size).unwrap_or(0);
        self.embed_dims
            .iter()
            .zip(&self.depths)
            .zip(&self.num_heads)
            .enumerate()
            .map(|(index, ((&dim, &depth), &num_heads))| {
                if index > 0 {
                    resolution /= 2;
                }
                let num_tokens = resolution * resolution;
                StageInfo {
                    index,
                    resolution,
                    num_tokens,
                    kv_tokens: (self.mixer == MixerKind::Linformer)
                        .then(|| num_tokens.checked_div(self.kv_tokens_ratio).unwrap_or(0)),
                    dim,
                    num_heads,
                    depth,
                }
            })
            .collect()
    }

    /// Вероятности stochastic depth по всем блокам: `linspace(0, drop_path_rate, total)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_path_schedule(&self) -> Vec<f64> {
        let total: usize = self.depths.iter().sum();
        match total {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => (0..total)
                .map(|index| self.drop_path_rate * index as f64 / (total - 1) as f64)
                .collect(),
        }
    }

    /// Создает модель.
    ///
    /// # Errors
    /// `BurnCoreError::InvalidConfig`, если [`Self::validate`] не проходит.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<StageTransformer<B>, BurnCoreError> {
        self.validate()?;

        let layout = self.stage_layout();
        let schedule = self.drop_path_schedule();
        let mut schedule = schedule.into_iter();
        let first_dim = self.embed_dims[0];

        let patch_embed = PatchEmbed {
            proj: Conv2dConfig::new([self.in_chans, first_dim], [self.patch_size; 2])
                .with_stride([self.patch_size; 2])
                .init(device),
            norm: LayerNormConfig::new(first_dim)
                .with_epsilon(self.norm_eps)
                .init(device),
            img_size: self.img_size,
            in_chans: self.in_chans,
        };

        let mut stages = Vec::with_capacity(layout.len());
        let mut previous_dim = first_dim;
        for info in &layout {
            debug!(
                stage = info.index,
                resolution = info.resolution,
                tokens = info.num_tokens,
                dim = info.dim,
                depth = info.depth,
                "Сборка стадии"
            );
            let downsample = (info.index > 0).then(|| PatchMerging {
                reduction: Conv2dConfig::new([previous_dim, info.dim], [2, 2])
                    .with_stride([2, 2])
                    .init(device),
                norm: LayerNormConfig::new(info.dim)
                    .with_epsilon(self.norm_eps)
                    .init(device),
                resolution: info.resolution * 2,
            });

            let blocks = (0..info.depth)
                .map(|_| {
                    AttentionBlockConfig::new(info.dim, info.num_heads)
                        .with_mixer(self.mixer)
                        .with_num_tokens(Some(info.num_tokens))
                        .with_kv_tokens_ratio(self.kv_tokens_ratio)
                        .with_mlp_ratio(self.mlp_ratio)
                        .with_qkv_bias(self.qkv_bias)
                        .with_qk_scale(self.qk_scale)
                        .with_drop(self.drop_rate)
                        .with_attn_drop(self.attn_drop_rate)
                        .with_drop_path(schedule.next().unwrap_or(0.0))
                        .with_norm_eps(self.norm_eps)
                        .init(device)
                })
                .collect::<Result<Vec<_>, _>>()?;

            stages.push(Stage { downsample, blocks });
            previous_dim = info.dim;
        }

        info!(
            mixer = %self.mixer,
            stages = stages.len(),
            num_classes = self.num_classes,
            "StageTransformer инициализирован"
        );

        Ok(StageTransformer {
            patch_embed,
            stages,
            norm: LayerNormConfig::new(previous_dim)
                .with_epsilon(self.norm_eps)
                .init(device),
            head: LinearConfig::new(previous_dim, self.num_classes).init(device),
            num_classes: self.num_classes,
        })
    }
}

/// Нарезка изображения на патчи: свёртка с шагом, равным ядру, и нормализация.
#[derive(Module, Debug)]
pub struct PatchEmbed<B: Backend> {
    proj: Conv2d<B>,
    norm: LayerNorm<B>,
    img_size: usize,
    in_chans: usize,
}

impl<B: Backend> PatchEmbed<B> {
    /// `[batch, in_chans, img, img]` -> `[batch, tokens, dim]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch` при неверных каналах или размере изображения.
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 3>, BurnCoreError> {
        let [_, channels, height, width] = images.dims();
        BurnCoreError::check_axis("PatchEmbed", "channels", self.in_chans, channels)?;
        BurnCoreError::check_axis("PatchEmbed", "height", self.img_size, height)?;
        BurnCoreError::check_axis("PatchEmbed", "width", self.img_size, width)?;

        let x = self.proj.forward(images);
        Ok(self.norm.forward(x.flatten::<3>(2, 3).swap_dims(1, 2)))
    }
}

/// Слияние окон `2 x 2` соседних токенов свёрткой с шагом 2.
#[derive(Module, Debug)]
pub struct PatchMerging<B: Backend> {
    reduction: Conv2d<B>,
    norm: LayerNorm<B>,
    /// Сторона входной сетки токенов.
    resolution: usize,
}

impl<B: Backend> PatchMerging<B> {
    /// `[batch, r * r, c_in]` -> `[batch, (r / 2)^2, c_out]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если число токенов не равно `r * r`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        let [batch, tokens, channels] = x.dims();
        BurnCoreError::check_axis(
            "PatchMerging",
            "tokens",
            self.resolution * self.resolution,
            tokens,
        )?;

        let grid = x
            .swap_dims(1, 2)
            .reshape([batch, channels, self.resolution, self.resolution]);
        let merged = self.reduction.forward(grid);
        Ok(self.norm.forward(merged.flatten::<3>(2, 3).swap_dims(1, 2)))
    }
}

/// Одна стадия: необязательное слияние патчей и последовательность блоков.
#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    downsample: Option<PatchMerging<B>>,
    blocks: Vec<AttentionBlock<B>>,
}

impl<B: Backend> Stage<B> {
    /// Блоки стадии.
    pub fn blocks(&self) -> &[AttentionBlock<B>] {
        &self.blocks
    }

    /// Прямой проход стадии.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch` от слияния или блоков.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, BurnCoreError> {
        let x = match &self.downsample {
            Some(merging) => merging.forward(x)?,
            None => x,
        };
        self.blocks
            .iter()
            .try_fold(x, |x, block| block.forward(x))
    }
}

/// Многостадийный vision-трансформер с головой классификатора.
#[derive(Module, Debug)]
pub struct StageTransformer<B: Backend> {
    patch_embed: PatchEmbed<B>,
    stages: Vec<Stage<B>>,
    norm: LayerNorm<B>,
    head: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> StageTransformer<B> {
    /// Число классов головы.
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Стадии модели.
    pub fn stages(&self) -> &[Stage<B>] {
        &self.stages
    }

    /// Признаки перед головой: `[batch, in_chans, img, img]` -> `[batch, last_dim]`.
    ///
    /// # Errors
    /// `BurnCoreError::ShapeMismatch`, если изображения не совпадают с конфигурацией.
    pub fn forward_features(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, BurnCoreError> {
        let x = self.patch_embed.forward(images)?;
        let x = self
            .stages
            .iter()
            .try_fold(x, |x, stage| stage.forward(x))?;
        let x = self.norm.forward(x);
        let [batch, _, channels] = x.dims();
        Ok(x.mean_dim(1).reshape([batch, channels]))
    }

    /// Логиты классов: `[batch, in_chans, img, img]` -> `[batch, num_classes]`.
    ///
    /// # Errors
    /// См. [`Self::forward_features`].
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, BurnCoreError> {
        Ok(self.head.forward(self.forward_features(images)?))
    }
}
