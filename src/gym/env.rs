use polars::prelude::DataFrame;
use strum::EnumCount;
use tracing::info;

use crate::{
    data::{dataset::CompositeDataset, domain::Symbol, indicator::IndicatorDescriptor},
    error::QfoldResult,
    gym::{
        Reward,
        action::Action,
        config::EnvConfig,
        fold::{Fold, FoldPlan, WindowPair},
        ledger::OrderLedger,
        seeder::ReplayMemories,
        state::{Position, TradingState},
    },
    sim::data::SimulationData,
};

/// The gym facade an agent trains against.
///
/// Owns the dense simulation view, the walk-forward plan and the trading
/// state. Every mutation goes through `&mut self`; sharing an environment
/// across agents means sharing a cursor, which is never what a training loop
/// wants.
#[derive(Debug)]
pub struct Environment {
    data: SimulationData,
    frame: DataFrame,
    indicators: Vec<IndicatorDescriptor>,
    symbols: Vec<Symbol>,
    plan: FoldPlan,
    trading: TradingState,
    cfg: EnvConfig,
}

impl Environment {
    #[tracing::instrument(skip(dataset, cfg), fields(rows = dataset.n_rows()))]
    pub fn new(dataset: CompositeDataset, cfg: EnvConfig) -> QfoldResult<Self> {
        cfg.validate()?;

        let data = SimulationData::from_frame(dataset.frame())?;
        let plan = FoldPlan::new(
            data.n_rows(),
            cfg.replay_memory_start_size,
            cfg.n_folds,
            cfg.validation_percent,
        )?;

        info!(
            rows = data.n_rows(),
            state_factors = data.n_state_factors(),
            folds = plan.n_folds(),
            train_len = plan.fold_train_length(),
            validation_len = plan.fold_validation_length(),
            "environment ready"
        );

        Ok(Self {
            data,
            frame: dataset.frame().clone(),
            indicators: dataset.indicators().to_vec(),
            symbols: dataset.symbols().to_vec(),
            plan,
            trading: TradingState::new(0),
            cfg,
        })
    }

    // ============================================================================================
    // Observation
    // ============================================================================================

    /// The state vector under the cursor.
    pub fn state(&self) -> &[f64] {
        self.data.state(self.trading.cursor().row())
    }

    pub fn n_state_factors(&self) -> usize {
        self.data.n_state_factors()
    }

    pub fn n_actions(&self) -> usize {
        Action::COUNT
    }

    pub fn current_row(&self) -> usize {
        self.trading.cursor().row()
    }

    pub fn position(&self) -> Position {
        self.trading.position()
    }

    // ============================================================================================
    // Stepping
    // ============================================================================================

    /// Applies one action, advancing the cursor by one row.
    ///
    /// `track_orders` turns on ledger bookkeeping; training loops leave it off
    /// and evaluation passes turn it on.
    pub fn step(&mut self, action: Action, track_orders: bool) -> QfoldResult<Reward> {
        self.trading
            .step(&self.data, action, self.cfg.fee, track_orders)
    }

    /// [`step`](Self::step) addressed by the agent's output-layer index.
    pub fn step_index(&mut self, index: usize, track_orders: bool) -> QfoldResult<Reward> {
        self.step(Action::from_index(index)?, track_orders)
    }

    /// Rewinds to an earlier row for the next epoch or fold and flattens the
    /// position. The only sanctioned way to move the cursor backwards.
    pub fn rewind_to(&mut self, row: usize) -> QfoldResult<()> {
        self.trading.reset_to(row, self.data.n_rows())
    }

    /// Seeds the agent's replay memory with the warmup rows. Exhausting the
    /// iterator leaves the cursor on the first training row of fold zero.
    pub fn replay_memories(&mut self) -> ReplayMemories<'_> {
        let size = self.cfg.replay_memory_start_size;
        ReplayMemories::new(self, size)
    }

    pub(crate) fn observe_and_advance(&mut self) -> QfoldResult<Vec<f64>> {
        let state = self.data.state(self.trading.cursor().row()).to_vec();
        self.trading.cursor_mut().advance(self.data.n_rows())?;
        Ok(state)
    }

    // ============================================================================================
    // Schedule
    // ============================================================================================

    pub fn fold_plan(&self) -> &FoldPlan {
        &self.plan
    }

    /// The full run schedule: every fold paired with its per-epoch window
    /// replays. Purely descriptive; driving the cursor through the windows is
    /// the training loop's job.
    pub fn training_slices(
        &self,
        epochs: usize,
    ) -> impl Iterator<Item = (Fold, Vec<WindowPair>)> + '_ {
        self.plan
            .folds()
            .map(move |fold| (fold.clone(), fold.epochs(epochs).collect()))
    }

    pub fn total_train_steps(&self, epochs: usize) -> usize {
        self.plan.total_train_steps(epochs)
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    // ============================================================================================
    // Evaluation Output
    // ============================================================================================

    pub fn ledger(&self) -> &OrderLedger {
        self.trading.ledger()
    }

    /// Fractional returns of the completed round trips.
    pub fn order_returns(&self) -> Vec<f64> {
        self.trading.ledger().order_returns()
    }

    /// The composite frame, for rendering the series the agent traded on.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn indicators(&self) -> &[IndicatorDescriptor] {
        &self.indicators
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}
