//! Walk-forward trading gym for reinforcement-learning agents.
//!
//! `qfold` turns raw intraday bar files into a deterministic gym-style
//! environment: resample to a uniform UTC series, merge symbols and technical
//! indicators into one composite dataset, split it into walk-forward folds and
//! let an agent step through them under a fee-aware reward model.
//!
//! ```no_run
//! use qfold::prelude::*;
//!
//! fn main() -> QfoldResult<()> {
//!     let dataset = CompositeDataset::from_csv_dir(
//!         std::path::Path::new("data"),
//!         &DatasetConfig::default().with_indicator_names(&["macd", "rsi", "mom", "stoch"])?,
//!     )?;
//!     let mut env = Environment::new(dataset, EnvConfig::default())?;
//!
//!     for memory in env.replay_memories().collect::<QfoldResult<Vec<_>>>()? {
//!         let _ = memory; // hand the state vectors to the agent
//!     }
//!     let reward = env.step(Action::Hold, false)?;
//!     println!("reward: {}", reward.0);
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod gym;
pub mod macros;
pub mod prelude;
pub mod sim;
