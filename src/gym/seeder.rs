use crate::{error::QfoldResult, gym::env::Environment};

/// Iterator seeding an agent's replay memory with the warmup rows.
///
/// Each item observes the state under the cursor, then advances one row, so
/// exhausting the iterator leaves the cursor exactly on the first training row
/// of fold zero. The position and the ledger are untouched; seeding is pure
/// observation.
pub struct ReplayMemories<'e> {
    env: &'e mut Environment,
    remaining: usize,
}

impl<'e> ReplayMemories<'e> {
    pub(crate) fn new(env: &'e mut Environment, size: usize) -> Self {
        Self {
            env,
            remaining: size,
        }
    }
}

impl Iterator for ReplayMemories<'_> {
    type Item = QfoldResult<Vec<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.env.observe_and_advance() {
            Ok(state) => Some(Ok(state)),
            Err(e) => {
                // Fail once, then stop.
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ReplayMemories<'_> {}
