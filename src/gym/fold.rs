use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{EnvError, QfoldResult};

/// One walk-forward fold: a training window directly followed by its
/// validation window. Row indices are absolute dataset rows, and each range
/// names the rows the agent ACTS on; the reward of acting at row `r` settles
/// on row `r + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

impl Fold {
    /// Replays the identical train/validation pair once per epoch. Every
    /// epoch sees exactly the same rows; only the agent changes between them.
    pub fn epochs(&self, n: usize) -> impl Iterator<Item = WindowPair> + '_ {
        (0..n).map(move |epoch| WindowPair {
            epoch,
            train: self.train.clone(),
            validation: self.validation.clone(),
        })
    }
}

/// One epoch's pass over a fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPair {
    pub epoch: usize,
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Walk-forward split arithmetic over the dataset.
///
/// The rows before `warmup` seed the replay memory and are never trained or
/// validated on. The remainder is cut so that consecutive folds advance by
/// one validation length: fold `i` trains on rows the previous folds already
/// validated on, which is the point of walking forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldPlan {
    total_rows: usize,
    warmup: usize,
    n_folds: usize,
    fold_train_length: usize,
    fold_validation_length: usize,
}

impl FoldPlan {
    /// Derives the window lengths from the usable row count.
    ///
    /// With `ratio = (1 - v) / v`, the validation length is
    /// `floor(usable / (n_folds + ratio))` and the train length
    /// `floor(validation_length * ratio)`, so the last fold ends inside the
    /// dataset and the train window is `ratio` times the validation window.
    pub fn new(
        total_rows: usize,
        warmup: usize,
        n_folds: usize,
        validation_percent: f64,
    ) -> QfoldResult<Self> {
        if !(validation_percent > 0.0 && validation_percent < 1.0) {
            return Err(EnvError::InvalidConfig(format!(
                "validation percent must be in (0, 1), got {validation_percent}"
            ))
            .into());
        }
        if n_folds == 0 {
            return Err(EnvError::InvalidConfig("need at least one fold".to_string()).into());
        }
        if warmup >= total_rows {
            return Err(EnvError::InvalidConfig(format!(
                "warmup ({warmup}) consumes the whole dataset ({total_rows} rows)"
            ))
            .into());
        }

        let usable = total_rows - warmup;
        let ratio = (1.0 - validation_percent) / validation_percent;

        let mut fold_validation_length = (usable as f64 / (n_folds as f64 + ratio)) as usize;
        let mut fold_train_length = (fold_validation_length as f64 * ratio) as usize;

        // The last settle row is warmup + n_folds * fv + ft. When the split
        // divides exactly it would land one past the end; shrink by one
        // validation row to keep every step inside the dataset.
        if warmup + n_folds * fold_validation_length + fold_train_length >= total_rows {
            fold_validation_length = fold_validation_length.saturating_sub(1);
            fold_train_length = (fold_validation_length as f64 * ratio) as usize;
        }

        if fold_validation_length == 0 || fold_train_length == 0 {
            return Err(EnvError::InvalidConfig(format!(
                "dataset too small: {usable} usable rows cannot fill {n_folds} folds at \
                 {validation_percent} validation"
            ))
            .into());
        }

        Ok(Self {
            total_rows,
            warmup,
            n_folds,
            fold_train_length,
            fold_validation_length,
        })
    }

    pub fn folds(&self) -> impl Iterator<Item = Fold> + '_ {
        (0..self.n_folds).map(move |index| {
            let start = self.warmup + index * self.fold_validation_length;
            let split = start + self.fold_train_length;
            Fold {
                index,
                train: start..split,
                validation: split..split + self.fold_validation_length,
            }
        })
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn fold_train_length(&self) -> usize {
        self.fold_train_length
    }

    pub fn fold_validation_length(&self) -> usize {
        self.fold_validation_length
    }

    /// Total number of training steps a full run performs.
    pub fn total_train_steps(&self, epochs: usize) -> usize {
        self.n_folds * epochs * self.fold_train_length
    }
}
