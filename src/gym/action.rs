use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{EnvError, QfoldResult};

/// The discrete action space served to the agent.
///
/// The index order is the contract with the agent's output layer and must
/// never change between runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Decodes the argmax index of an agent's output layer.
    pub fn from_index(index: usize) -> QfoldResult<Self> {
        Action::iter()
            .nth(index)
            .ok_or_else(|| EnvError::InvalidAction(index).into())
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::EnumCount as _;

    #[test]
    fn index_round_trips_over_the_whole_action_space() {
        for action in Action::iter() {
            assert_eq!(Action::from_index(action.index()).unwrap(), action);
        }
        assert!(Action::from_index(Action::COUNT).is_err());
    }

    #[test]
    fn names_are_lowercase() {
        assert_eq!(Action::Buy.to_string(), "buy");
        assert_eq!("sell".parse::<Action>().unwrap(), Action::Sell);
    }
}
