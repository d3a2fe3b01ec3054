//! Named noise schedules for training on a built corpus.
//!
//! A [`ScheduleTable`] maps case-insensitive names to beta schedules. The
//! default table carries `linear`, `cosine` and `logistic`; callers may
//! register their own before handing the table to a trainer.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use thiserror::Error;

use crate::dataset::LabelMap;

/// Upper bound applied to every beta derived from an `alpha_bar` curve.
pub const MAX_BETA: f64 = 0.999;
/// Schedule used when a run does not name one.
pub const DEFAULT_SCHEDULE: &str = "logistic";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown noise schedule: {0}")]
    Unknown(String),
    #[error("a noise schedule needs at least one diffusion step")]
    ZeroSteps,
}

/// How a schedule turns a step count into betas.
#[derive(Debug, Clone, Copy)]
pub enum ScheduleStrategy {
    /// Evenly spaced betas, scaled so that 1000 steps span `1e-4..=0.02`.
    Linear,
    /// Betas derived from a cumulative `alpha_bar(t)` curve over `t` in `[0, 1]`.
    AlphaBar(fn(f64) -> f64),
}

impl ScheduleStrategy {
    pub fn betas(&self, steps: usize) -> Vec<f64> {
        match self {
            Self::Linear => linear_betas(steps),
            Self::AlphaBar(alpha_bar) => betas_for_alpha_bar(steps, *alpha_bar, MAX_BETA),
        }
    }
}

/// Discretize `alpha_bar` into `steps` betas, each capped at `max_beta`.
pub fn betas_for_alpha_bar(steps: usize, alpha_bar: impl Fn(f64) -> f64, max_beta: f64) -> Vec<f64> {
    (0..steps)
        .map(|i| {
            let t1 = i as f64 / steps as f64;
            let t2 = (i + 1) as f64 / steps as f64;
            (1.0 - alpha_bar(t2) / alpha_bar(t1)).min(max_beta)
        })
        .collect()
}

fn linear_betas(steps: usize) -> Vec<f64> {
    let scale = 1000.0 / steps as f64;
    let start = scale * 1e-4;
    let end = scale * 0.02;
    if steps == 1 {
        return vec![start];
    }
    let stride = (end - start) / (steps - 1) as f64;
    (0..steps).map(|i| start + stride * i as f64).collect()
}

pub fn cosine_alpha_bar(t: f64) -> f64 {
    ((t + 0.008) / 1.008 * FRAC_PI_2).cos().powi(2)
}

/// Sigmoid centred on the middle of the trajectory.
pub fn logistic_alpha_bar(t: f64) -> f64 {
    1.0 / (1.0 + (10.0 * (t - 0.5)).exp())
}

#[derive(Debug, Clone)]
pub struct ScheduleTable {
    strategies: BTreeMap<String, ScheduleStrategy>,
}

impl Default for ScheduleTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register("linear", ScheduleStrategy::Linear);
        table.register("cosine", ScheduleStrategy::AlphaBar(cosine_alpha_bar));
        table.register("logistic", ScheduleStrategy::AlphaBar(logistic_alpha_bar));
        table
    }
}

impl ScheduleTable {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Add or replace a schedule. Names are stored lowercased.
    pub fn register(&mut self, name: &str, strategy: ScheduleStrategy) {
        self.strategies.insert(name.to_lowercase(), strategy);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn betas(&self, name: &str, steps: usize) -> Result<Vec<f64>, ScheduleError> {
        let strategy = self
            .strategies
            .get(&name.to_lowercase())
            .ok_or_else(|| ScheduleError::Unknown(name.to_string()))?;
        if steps == 0 {
            return Err(ScheduleError::ZeroSteps);
        }
        Ok(strategy.betas(steps))
    }
}

/// Settings a training run takes from the corpus it trains on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingOverrides {
    pub schedule: String,
    /// Class count for class-conditional training; `None` keeps the trainer's own.
    pub num_classes: Option<usize>,
}

impl Default for TrainingOverrides {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_string(),
            num_classes: None,
        }
    }
}

impl TrainingOverrides {
    pub fn from_label_map(labels: &LabelMap) -> Self {
        Self {
            num_classes: Some(labels.len()),
            ..Self::default()
        }
    }

    pub fn betas(&self, table: &ScheduleTable, steps: usize) -> Result<Vec<f64>, ScheduleError> {
        table.betas(&self.schedule, steps)
    }
}
