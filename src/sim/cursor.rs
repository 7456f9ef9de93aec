use crate::error::{EnvError, QfoldResult};

/// Position of the simulation inside the dataset, as an absolute row index.
///
/// The cursor only ever moves forward one row per [`advance`](Self::advance);
/// rewinding between epochs or folds goes through the explicit
/// [`seek`](Self::seek) so no step can accidentally look backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

impl Cursor {
    pub fn new(row: usize) -> Self {
        Self(row)
    }

    pub fn row(&self) -> usize {
        self.0
    }

    /// Moves one row forward. Stepping past the last row of the dataset is a
    /// driver bug, not an episode-end signal, so it fails loudly.
    pub fn advance(&mut self, n_rows: usize) -> QfoldResult<usize> {
        let next = self.0 + 1;
        if next >= n_rows {
            return Err(EnvError::InvalidState(format!(
                "cursor advanced past the end of the dataset ({next} >= {n_rows})"
            ))
            .into());
        }
        self.0 = next;
        Ok(next)
    }

    pub fn seek(&mut self, row: usize, n_rows: usize) -> QfoldResult<()> {
        if row >= n_rows {
            return Err(EnvError::InvalidState(format!(
                "cursor seek out of bounds ({row} >= {n_rows})"
            ))
            .into());
        }
        self.0 = row;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_single_step_and_bounded() {
        let mut cursor = Cursor::new(0);
        assert_eq!(cursor.advance(3).unwrap(), 1);
        assert_eq!(cursor.advance(3).unwrap(), 2);
        assert!(cursor.advance(3).is_err());
        assert_eq!(cursor.row(), 2);
    }

    #[test]
    fn seek_rejects_out_of_bounds_rows() {
        let mut cursor = Cursor::new(5);
        cursor.seek(0, 10).unwrap();
        assert_eq!(cursor.row(), 0);
        assert!(cursor.seek(10, 10).is_err());
    }
}
