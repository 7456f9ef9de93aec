use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::{EnvError, QfoldResult},
    gym::Fee,
};

/// Hyperparameters of an [`Environment`](crate::gym::env::Environment) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Transaction cost charged once per buy and once per sell.
    pub fee: Fee,

    /// Fraction of each fold reserved for validation.
    pub validation_percent: f64,

    /// Number of walk-forward folds.
    pub n_folds: usize,

    /// Rows consumed up front to seed the agent's replay memory.
    pub replay_memory_start_size: usize,

    /// Checkpoint the training layer resumes from. Opaque to the
    /// environment, carried so a run's configuration round-trips as one
    /// value.
    pub resume_model: Option<PathBuf>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            fee: Fee(0.002),
            validation_percent: 0.2,
            n_folds: 5,
            replay_memory_start_size: 10_000,
            resume_model: None,
        }
    }
}

impl EnvConfig {
    pub fn with_fee(self, fee: Fee) -> Self {
        Self { fee, ..self }
    }

    pub fn with_validation_percent(self, validation_percent: f64) -> Self {
        Self {
            validation_percent,
            ..self
        }
    }

    pub fn with_n_folds(self, n_folds: usize) -> Self {
        Self { n_folds, ..self }
    }

    pub fn with_replay_memory_start_size(self, replay_memory_start_size: usize) -> Self {
        Self {
            replay_memory_start_size,
            ..self
        }
    }

    pub fn with_resume_model(self, resume_model: PathBuf) -> Self {
        Self {
            resume_model: Some(resume_model),
            ..self
        }
    }

    pub fn validate(&self) -> QfoldResult<()> {
        if !(self.fee.0 >= 0.0 && self.fee.0 < 1.0) {
            return Err(EnvError::InvalidConfig(format!(
                "fee must be in [0, 1), got {}",
                self.fee.0
            ))
            .into());
        }
        if !(self.validation_percent > 0.0 && self.validation_percent < 1.0) {
            return Err(EnvError::InvalidConfig(format!(
                "validation percent must be in (0, 1), got {}",
                self.validation_percent
            ))
            .into());
        }
        if self.n_folds == 0 {
            return Err(EnvError::InvalidConfig("need at least one fold".to_string()).into());
        }
        if self.replay_memory_start_size == 0 {
            return Err(EnvError::InvalidConfig(
                "replay memory start size must be positive".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EnvConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(EnvConfig::default().with_fee(Fee(1.0)).validate().is_err());
        assert!(EnvConfig::default().with_fee(Fee(-0.1)).validate().is_err());
        assert!(
            EnvConfig::default()
                .with_validation_percent(1.0)
                .validate()
                .is_err()
        );
        assert!(EnvConfig::default().with_n_folds(0).validate().is_err());
        assert!(
            EnvConfig::default()
                .with_replay_memory_start_size(0)
                .validate()
                .is_err()
        );
    }
}
