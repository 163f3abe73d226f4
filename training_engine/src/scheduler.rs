// training_engine/src/scheduler.rs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used)]

//! Покадровое (на каждую итерацию) расписание learning rate:
//! линейный прогрев от `warmup_lr` до `base_lr`, затем косинусный спад до `min_lr`.

use std::f64::consts::PI;

/// Косинусное расписание с прогревом.
#[derive(Debug, Clone, PartialEq)]
pub struct CosineLrScheduler {
    base_lr: f64,
    min_lr: f64,
    warmup_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
    step: usize,
}

impl CosineLrScheduler {
    /// Создает расписание на `total_steps` итераций, из которых `warmup_steps` уходят на прогрев.
    pub fn new(
        base_lr: f64,
        min_lr: f64,
        warmup_lr: f64,
        warmup_steps: usize,
        total_steps: usize,
    ) -> Self {
        Self {
            base_lr,
            min_lr,
            warmup_lr,
            warmup_steps: warmup_steps.min(total_steps),
            total_steps,
            step: 0,
        }
    }

    /// Learning rate на итерации `step`; после `total_steps` остается `min_lr`.
    #[allow(clippy::cast_precision_loss)]
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            let progress = step as f64 / self.warmup_steps as f64;
            return self.warmup_lr + (self.base_lr - self.warmup_lr) * progress;
        }
        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps);
        if decay_steps == 0 {
            return self.base_lr;
        }
        let progress = ((step - self.warmup_steps) as f64 / decay_steps as f64).min(1.0);
        self.min_lr + 0.5 * (self.base_lr - self.min_lr) * (1.0 + (PI * progress).cos())
    }

    /// Текущая итерация.
    pub const fn current_step(&self) -> usize {
        self.step
    }

    /// Переходит к итерации `step` (например, при возобновлении с эпохи).
    pub fn seek(&mut self, step: usize) {
        self.step = step;
    }

    /// Возвращает learning rate текущей итерации и сдвигает счетчик.
    pub fn step(&mut self) -> f64 {
        let lr = self.lr_at(self.step);
        self.step += 1;
        lr
    }
}
