use std::path::PathBuf;

use qfold::prelude::*;

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("ohlcv")
}

/// Builds the two-symbol fixture dataset at one-minute resolution.
pub fn fixture_dataset(cfg: &DatasetConfig) -> CompositeDataset {
    CompositeDataset::from_csv_dir(&fixture_dir(), cfg).unwrap()
}

/// Environment sized for the 48-row fixture: 6 warmup rows, 2 folds.
pub fn fixture_env() -> Environment {
    let dataset = fixture_dataset(&DatasetConfig::default());
    let cfg = EnvConfig::default()
        .with_fee(Fee(0.002))
        .with_n_folds(2)
        .with_replay_memory_start_size(6);
    Environment::new(dataset, cfg).unwrap()
}
