// cli_app/src/main.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! `stage-attn`: список моделей реестра и обучение на синтетических данных.
//!
//! ```bash
//! stage-attn list-models
//! stage-attn train --config train.toml --model stage_tiny_lin_p4 -b 16 --epochs 3
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::backend::Autodiff;
use burn::tensor::backend::Backend;
use clap::{Args, Parser, Subcommand};
use core_burn::ModelRegistry;
use tracing::info;
use training_engine::{fit, TrainingConfig};
use utils_crate::{init_tracing_logger, parse_level};

#[cfg(not(any(
    feature = "ndarray_backend_cli",
    feature = "tch_backend_cli",
    feature = "wgpu_backend_cli"
)))]
compile_error!("Нужно включить одну из фич бэкенда: ndarray_backend_cli, tch_backend_cli, wgpu_backend_cli");

#[cfg(feature = "tch_backend_cli")]
type InnerBackend = burn::backend::LibTorch;
#[cfg(all(feature = "wgpu_backend_cli", not(feature = "tch_backend_cli")))]
type InnerBackend = burn::backend::Wgpu;
#[cfg(all(
    feature = "ndarray_backend_cli",
    not(any(feature = "tch_backend_cli", feature = "wgpu_backend_cli"))
))]
type InnerBackend = burn::backend::NdArray;

type TrainBackend = Autodiff<InnerBackend>;

const APP_NAME: &str = "stage-attn";

#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version,
    about = "Fastformer/Linformer vision-трансформеры на Burn",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Показать зарегистрированные модели и геометрию их стадий.
    ListModels,
    /// Обучить модель на синтетическом наборе данных.
    Train(TrainArgs),
}

/// Параметры `train`; заданные флаги перекрывают значения из TOML.
#[derive(Args, Debug)]
struct TrainArgs {
    /// TOML-файл конфигурации; отсутствующий файл дает значения по умолчанию.
    #[arg(short, long, value_name = "FILE", default_value = "train.toml")]
    config: PathBuf,

    /// Имя модели в реестре.
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// Размер батча.
    #[arg(short = 'b', long = "batch-size", value_name = "N")]
    batch_size: Option<usize>,

    /// Число эпох.
    #[arg(long, value_name = "N")]
    epochs: Option<usize>,

    /// Базовый learning rate.
    #[arg(long, value_name = "F")]
    lr: Option<f64>,

    /// Корневая директория результатов.
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Имя эксперимента (поддиректория результатов).
    #[arg(long, value_name = "NAME")]
    experiment: Option<String>,

    /// Число классов.
    #[arg(long, value_name = "N")]
    num_classes: Option<usize>,

    /// Сторона входного изображения; по умолчанию берется из модели.
    #[arg(long, value_name = "N")]
    img_size: Option<usize>,

    /// Размер обучающей выборки; валидационная берется вчетверо меньше.
    #[arg(long, value_name = "N")]
    synthetic_samples: Option<usize>,

    /// Чекпоинт (`last.mpk`), с которого продолжается обучение.
    #[arg(long, value_name = "PATH")]
    resume: Option<String>,

    /// Первая эпоха; перекрывает эпоху из `--resume`.
    #[arg(long, value_name = "N")]
    start_epoch: Option<usize>,

    /// Уровень логирования консоли (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl TrainArgs {
    fn apply(self, config: &mut TrainingConfig) {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(lr) = self.lr {
            config.optimizer.lr = lr;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(experiment) = self.experiment {
            config.experiment = Some(experiment);
        }
        if let Some(num_classes) = self.num_classes {
            config.num_classes = num_classes;
        }
        if let Some(img_size) = self.img_size {
            config.img_size = Some(img_size);
        }
        if let Some(samples) = self.synthetic_samples {
            config.data.train_samples = samples;
            config.data.eval_samples = (samples / 4).max(1);
        }
        if let Some(resume) = self.resume {
            config.resume = Some(resume);
        }
        if let Some(start_epoch) = self.start_epoch {
            config.start_epoch = Some(start_epoch);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

fn list_models(registry: &ModelRegistry) -> Result<()> {
    for name in registry.names() {
        let config = registry.config(name)?;
        println!(
            "{name}: mixer={:?} img_size={} patch_size={}",
            config.mixer, config.img_size, config.patch_size
        );
        for stage in config.stage_layout() {
            let kv = stage
                .kv_tokens
                .map_or_else(String::new, |kv| format!(" kv_tokens={kv}"));
            println!(
                "  stage {}: {res}x{res} tokens={} dim={} heads={} depth={}{kv}",
                stage.index,
                stage.num_tokens,
                stage.dim,
                stage.num_heads,
                stage.depth,
                res = stage.resolution,
            );
        }
    }
    Ok(())
}

fn train(args: TrainArgs, registry: &ModelRegistry) -> Result<()> {
    let config_path = args.config.clone();
    let mut config = TrainingConfig::load_from_toml(&config_path)
        .with_context(|| format!("Не удалось загрузить {}", config_path.display()))?;
    args.apply(&mut config);

    let console_level = parse_level(&config.logging.level)?;
    let file_level = parse_level(&config.logging.file_level)?;
    let log_dir = config
        .logging
        .log_dir
        .as_deref()
        .map_or_else(|| Path::new(&config.output), Path::new);
    init_tracing_logger(APP_NAME, console_level, file_level, Some(log_dir))?;

    let device = <TrainBackend as Backend>::Device::default();
    info!(model = %config.model, ?device, "Старт обучения");
    let report = fit::<TrainBackend>(&config, registry, &device).context("Обучение прервано")?;

    match report.best {
        Some((metric, epoch)) => info!(
            "Готово: {} (лучшая top-1 {metric:.2}% на эпохе {epoch})",
            report.output_dir.display()
        ),
        None => info!("Готово: {}", report.output_dir.display()),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = ModelRegistry::with_defaults();

    match cli.command {
        Command::ListModels => list_models(&registry),
        Command::Train(args) => train(args, &registry),
    }
}
