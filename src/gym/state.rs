use strum::Display;

use crate::{
    error::QfoldResult,
    gym::{Fee, Reward, action::Action, ledger::OrderLedger},
    sim::{cursor::Cursor, data::SimulationData},
};

/// Market exposure of the agent. Only flat and one long unit exist; there is
/// no sizing and no short side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long,
}

/// Which side of a round trip a step filled, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Buy,
    Sell,
}

/// The reward table, as a pure function of the pre-step position.
///
/// `period_return` is the fractional close-to-close return of the interval the
/// step moved across.
///
/// | position | action | next position | reward              |
/// |----------|--------|---------------|---------------------|
/// | flat     | buy    | long          | period_return - fee |
/// | flat     | sell   | flat          | 0                   |
/// | flat     | hold   | flat          | 0                   |
/// | long     | buy    | long          | period_return       |
/// | long     | sell   | flat          | -fee                |
/// | long     | hold   | long          | period_return       |
pub fn transition(
    position: Position,
    action: Action,
    period_return: f64,
    fee: Fee,
) -> (Position, Reward, Option<Fill>) {
    match (position, action) {
        (Position::Flat, Action::Buy) => {
            (Position::Long, Reward(period_return - fee.0), Some(Fill::Buy))
        }
        (Position::Flat, Action::Sell | Action::Hold) => (Position::Flat, Reward(0.0), None),
        (Position::Long, Action::Sell) => (Position::Flat, Reward(-fee.0), Some(Fill::Sell)),
        (Position::Long, Action::Buy | Action::Hold) => {
            (Position::Long, Reward(period_return), None)
        }
    }
}

/// Mutable trading state of one simulation run: where the cursor stands, what
/// the agent holds and which orders it has filled.
#[derive(Debug, Clone)]
pub struct TradingState {
    cursor: Cursor,
    position: Position,
    ledger: OrderLedger,
}

impl TradingState {
    pub fn new(start_row: usize) -> Self {
        Self {
            cursor: Cursor::new(start_row),
            position: Position::default(),
            ledger: OrderLedger::new(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    /// Rewinds to `row` and flattens the position. Ledger records survive a
    /// reset; a replayed buy overwrites its record by timestamp.
    pub fn reset_to(&mut self, row: usize, n_rows: usize) -> QfoldResult<()> {
        self.cursor.seek(row, n_rows)?;
        self.position = Position::Flat;
        Ok(())
    }

    /// Applies one agent action: advances the cursor by one row, then settles
    /// the reward table against the return of the crossed interval.
    ///
    /// Fills are priced the way a market order would settle: a buy at the
    /// close the cursor lands on, a sell at the close it left behind.
    pub fn step(
        &mut self,
        data: &SimulationData,
        action: Action,
        fee: Fee,
        track_orders: bool,
    ) -> QfoldResult<Reward> {
        let exit_close = data.close(self.cursor.row());
        let row = self.cursor.advance(data.n_rows())?;
        let period_return = data.period_return(row)?;

        let (next, reward, fill) = transition(self.position, action, period_return, fee);

        if track_orders {
            match fill {
                Some(Fill::Buy) => self.ledger.upsert_buy(data.timestamp(row), data.close(row)),
                Some(Fill::Sell) => self.ledger.fill_sell(exit_close)?,
                None => {}
            }
        }

        self.position = next;
        Ok(reward)
    }
}
