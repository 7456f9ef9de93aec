/// The agent-facing action space.
pub mod action;
/// Environment hyperparameters.
pub mod config;
/// The environment facade tying data, folds and the trading state together.
pub mod env;
/// Walk-forward fold arithmetic.
pub mod fold;
/// Round-trip order bookkeeping for evaluation.
pub mod ledger;
/// Replay-memory seeding iterator.
pub mod seeder;
/// The position state machine and reward model.
pub mod state;

use serde::{Deserialize, Serialize};

use crate::{impl_add_sub_mul_div_primitive, impl_from_primitive, impl_neg_primitive};

/// The fractional return credited to the agent for one step.
///
/// Rewards compose additively over a window, so the sum over an episode is the
/// (log-free) approximation of the strategy return net of fees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reward(pub f64);
impl_from_primitive!(Reward, f64);
impl_add_sub_mul_div_primitive!(Reward, f64);
impl_neg_primitive!(Reward, f64);

/// Fractional transaction cost charged once per fill.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fee(pub f64);
impl_from_primitive!(Fee, f64);
