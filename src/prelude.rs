// ================================================================================================
// 1. Errors
// ================================================================================================
pub use crate::error::{DataError, EnvError, IoError, QfoldError, QfoldResult};

// ================================================================================================
// 2. Market Data
// ================================================================================================
pub use crate::data::{
    dataset::{CompositeDataset, DatasetConfig},
    domain::{Period, Price, Symbol},
    indicator::{
        IndicatorDescriptor, MacdWindows, MomentumWindow, RsiWindow, StochWindows,
        TechnicalIndicator,
    },
    schema::CanonicalCol,
};

// ================================================================================================
// 3. Simulation
// ================================================================================================
pub use crate::sim::{cursor::Cursor, data::SimulationData};

// ================================================================================================
// 4. Gym
// ================================================================================================
pub use crate::gym::{
    Fee, Reward,
    action::Action,
    config::EnvConfig,
    env::Environment,
    fold::{Fold, FoldPlan, WindowPair},
    ledger::{OrderLedger, OrderRecord},
    seeder::ReplayMemories,
    state::{Fill, Position, TradingState, transition},
};
