// training_engine/src/trainer.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Цикл обучения: эпоха обучения, валидация и оркестрация всего запуска.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Tensor,
    },
};
use chrono::{DateTime, Local};
use core_burn::{BurnCoreError, ModelRegistry, StageTransformer};
use tracing::{debug, info};
use utils_crate::{ensure_dir_exists, sanitize_path_component};

use crate::{
    checkpoint::{load_checkpoint, load_resume_state, CheckpointSaver, ResumeState},
    config::TrainingConfig,
    data::{BatchSource, SyntheticImageSource},
    metrics::{accuracy_topk, AverageMeter},
    scheduler::CosineLrScheduler,
    summary::{update_summary, SummaryRow},
    TrainingError,
};

/// Модель, выдающая логиты классов по батчу изображений.
pub trait Classifier<B: Backend> {
    /// `[batch, channels, height, width]` -> `[batch, num_classes]`.
    ///
    /// # Errors
    /// `BurnCoreError`, если вход не совместим с моделью.
    fn logits(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, BurnCoreError>;
}

impl<B: Backend> Classifier<B> for StageTransformer<B> {
    fn logits(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, BurnCoreError> {
        self.forward(images)
    }
}

/// Метрики эпохи обучения.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainMetrics {
    /// Средний обучающий лосс.
    pub loss: f64,
}

/// Метрики валидации.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    /// Средний лосс без label smoothing.
    pub loss: f64,
    /// Top-1 точность, %.
    pub top1: f64,
    /// Top-5 точность, %.
    pub top5: f64,
}

/// Итог запуска [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Директория эксперимента.
    pub output_dir: PathBuf,
    /// Лучшая top-1 точность и ее эпоха.
    pub best: Option<(f64, usize)>,
    /// Сводка по эпохам.
    pub history: Vec<SummaryRow>,
}

/// Одна эпоха обучения.
///
/// Learning rate берется из `scheduler` на каждой итерации.
///
/// # Errors
/// - `TrainingError::EmptyLoader`, если источник не выдал батчей;
/// - `TrainingError::Diverged`, если лосс стал NaN или бесконечностью;
/// - `TrainingError::Model` при несовместимых входах.
#[allow(clippy::cast_precision_loss)]
pub fn train_one_epoch<B, M, S, O>(
    epoch: usize,
    mut model: M,
    source: &S,
    optimizer: &mut O,
    scheduler: &mut CosineLrScheduler,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(M, TrainMetrics), TrainingError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    S: BatchSource<B> + ?Sized,
    O: Optimizer<M, B>,
{
    let num_batches = source.num_batches();
    if num_batches == 0 {
        return Err(TrainingError::EmptyLoader("train"));
    }
    let last_idx = num_batches - 1;
    let log_interval = config.log_interval.max(1);

    let smoothing = (config.smoothing > 0.0).then_some(config.smoothing);
    let loss_fn = CrossEntropyLossConfig::new()
        .with_smoothing(smoothing)
        .init(device);

    let mut losses = AverageMeter::new();
    let mut batch_time = AverageMeter::new();
    let mut end = Instant::now();

    for (batch_idx, batch) in source.iter(device).enumerate() {
        let batch_size = batch.len();
        let lr = scheduler.step();

        let logits = model.logits(batch.images)?;
        let loss = loss_fn.forward(logits, batch.targets);
        let loss_value = loss.clone().into_scalar().elem::<f64>();
        if !loss_value.is_finite() {
            return Err(TrainingError::Diverged {
                epoch,
                batch: batch_idx,
                loss: loss_value,
            });
        }

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optimizer.step(lr, model, grads);

        losses.update(loss_value, batch_size);
        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if batch_idx == last_idx || batch_idx % log_interval == 0 {
            info!(
                "Train: {} [{:>4}/{} ({:>3.0}%)]  Loss: {:.4} ({:.3})  Time: {:.3}s, {:>7.2}/s  LR: {:.3e}",
                epoch,
                batch_idx,
                num_batches,
                100.0 * batch_idx as f64 / last_idx.max(1) as f64,
                losses.val,
                losses.avg,
                batch_time.val,
                batch_size as f64 / batch_time.val.max(f64::EPSILON),
                lr
            );
        }
    }

    if losses.count == 0 {
        return Err(TrainingError::EmptyLoader("train"));
    }
    Ok((model, TrainMetrics { loss: losses.avg }))
}

/// Валидация модели без autodiff: лосс, top-1 и top-5.
///
/// Модель для обучения передается сюда через `valid()`, поэтому дропаут
/// и stochastic depth отключены.
///
/// # Errors
/// `TrainingError::EmptyLoader` для пустого источника, `TrainingError::Model`
/// при несовместимых входах.
pub fn validate<B, M, S>(
    model: &M,
    source: &S,
    log_interval: usize,
    device: &B::Device,
) -> Result<EvalMetrics, TrainingError>
where
    B: Backend,
    M: Classifier<B>,
    S: BatchSource<B> + ?Sized,
{
    let last_idx = source.num_batches().saturating_sub(1);
    let log_interval = log_interval.max(1);
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut losses = AverageMeter::new();
    let mut top1 = AverageMeter::new();
    let mut top5 = AverageMeter::new();

    for (batch_idx, batch) in source.iter(device).enumerate() {
        let batch_size = batch.len();
        let logits = model.logits(batch.images)?;
        let loss = loss_fn
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        let accuracy = accuracy_topk(logits, batch.targets, &[1, 5])?;

        losses.update(loss, batch_size);
        top1.update(accuracy[0], batch_size);
        top5.update(accuracy[1], batch_size);

        if batch_idx == last_idx || batch_idx % log_interval == 0 {
            info!(
                "Test: [{:>4}/{}]  Loss: {:>7.4} ({:>6.4})  Acc@1: {:>7.4} ({:>7.4})  Acc@5: {:>7.4} ({:>7.4})",
                batch_idx,
                last_idx,
                losses.val,
                losses.avg,
                top1.val,
                top1.avg,
                top5.val,
                top5.avg
            );
        }
    }

    if losses.count == 0 {
        return Err(TrainingError::EmptyLoader("eval"));
    }
    Ok(EvalMetrics {
        loss: losses.avg,
        top1: top1.avg,
        top5: top5.avg,
    })
}

/// Директория эксперимента: `<output>/<experiment>/<model>` или
/// `<output>/<%Y%m%d-%H%M%S>-<model>-<img_size>`.
pub fn experiment_dir(
    output: &Path,
    experiment: Option<&str>,
    model: &str,
    img_size: usize,
    now: DateTime<Local>,
) -> PathBuf {
    match experiment {
        Some(experiment) => output
            .join(sanitize_path_component(experiment))
            .join(sanitize_path_component(model)),
        None => output.join(sanitize_path_component(&format!(
            "{}-{}-{}",
            now.format("%Y%m%d-%H%M%S"),
            model,
            img_size
        ))),
    }
}

/// Полный запуск обучения по конфигурации.
///
/// Строит модель из реестра, при необходимости продолжает обучение с `resume`
/// (веса, оптимизатор, эпоха и позиция расписания LR), затем для каждой эпохи
/// обучает, валидирует, дописывает `summary.csv` и сохраняет чекпоинты по top-1 точности.
///
/// # Errors
/// Любая ошибка конфигурации, модели, данных, записи сводки или чекпоинта.
#[allow(clippy::cast_possible_truncation)]
pub fn fit<B: AutodiffBackend>(
    config: &TrainingConfig,
    registry: &ModelRegistry,
    device: &B::Device,
) -> Result<FitReport, TrainingError> {
    config.validate()?;

    let model_config = config.model_config(registry)?;
    for stage in model_config.stage_layout() {
        debug!(?stage, "Геометрия стадии");
    }

    let mut model: StageTransformer<B> = model_config.init(device)?;
    if let Some(resume) = &config.resume {
        model = load_checkpoint(model, Path::new(resume), device)?;
    }

    let output_dir = experiment_dir(
        Path::new(&config.output),
        config.experiment.as_deref(),
        &config.model,
        model_config.img_size,
        Local::now(),
    );
    ensure_dir_exists(&output_dir)?;
    fs::write(output_dir.join("config.toml"), config.to_toml_string()?)?;
    info!(dir = %output_dir.display(), model = %config.model, "Запуск обучения");

    let data = &config.data;
    let train_source = SyntheticImageSource::new(
        data.train_samples,
        config.batch_size,
        config.num_classes,
        model_config.in_chans,
        model_config.img_size,
    )?
    .with_seed(data.seed)
    .with_noise(data.noise)
    .with_stream(0);
    let eval_source = SyntheticImageSource::new(
        data.eval_samples,
        config.batch_size,
        config.num_classes,
        model_config.in_chans,
        model_config.img_size,
    )?
    .with_seed(data.seed)
    .with_noise(data.noise)
    .with_stream(1);

    let steps_per_epoch = <SyntheticImageSource as BatchSource<B>>::num_batches(&train_source);
    let mut scheduler = CosineLrScheduler::new(
        config.optimizer.lr,
        config.scheduler.min_lr,
        config.scheduler.warmup_lr,
        config.scheduler.warmup_epochs * steps_per_epoch,
        config.epochs * steps_per_epoch,
    );

    let mut optimizer = AdamWConfig::new()
        .with_weight_decay(config.optimizer.weight_decay as f32)
        .with_grad_clipping(
            config
                .optimizer
                .clip_grad
                .map(|clip| GradientClippingConfig::Norm(clip as f32)),
        )
        .init::<B, StageTransformer<B>>();

    let mut resume_epoch = None;
    if let Some(resume) = &config.resume {
        let (restored, state) = load_resume_state::<B, StageTransformer<B>, _>(
            Path::new(resume),
            optimizer,
            device,
        )?;
        optimizer = restored;
        resume_epoch = state.map(|state| state.next_epoch());
    }
    let start_epoch = config.start_epoch.or(resume_epoch).unwrap_or(0);
    if start_epoch > 0 {
        scheduler.seek(start_epoch * steps_per_epoch);
        info!(start_epoch, "Обучение продолжается");
    }

    let summary_path = output_dir.join("summary.csv");
    let mut saver = CheckpointSaver::new(&output_dir, config.checkpoint_hist);
    let mut history = Vec::with_capacity(config.epochs.saturating_sub(start_epoch));

    for epoch in start_epoch..config.epochs {
        let (trained, train_metrics) = train_one_epoch(
            epoch,
            model,
            &train_source,
            &mut optimizer,
            &mut scheduler,
            config,
            device,
        )?;
        model = trained;

        let eval_metrics = validate(&model.valid(), &eval_source, config.log_interval, device)?;

        let write_header = !summary_path.exists();
        update_summary(epoch, &train_metrics, &eval_metrics, &summary_path, write_header)?;
        saver.save_checkpoint(&model, epoch, eval_metrics.top1)?;
        saver.save_resume_state::<B, StageTransformer<B>, _>(
            &optimizer,
            ResumeState {
                epoch,
                metric: eval_metrics.top1,
            },
        )?;
        history.push(SummaryRow::new(epoch, &train_metrics, &eval_metrics));

        info!(
            epoch,
            train_loss = train_metrics.loss,
            eval_loss = eval_metrics.loss,
            top1 = eval_metrics.top1,
            top5 = eval_metrics.top5,
            "Эпоха завершена"
        );
    }

    let best = saver.best();
    if let Some((metric, epoch)) = best {
        info!("*** Best metric: {metric:.4} (epoch {epoch})");
    }

    Ok(FitReport {
        output_dir,
        best,
        history,
    })
}
