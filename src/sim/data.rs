use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;

use crate::{
    data::{domain::Price, schema::CanonicalCol},
    error::{DataError, EnvError, QfoldResult},
};

/// The composite frame flattened into dense row-major storage for the
/// simulation hot path.
///
/// Every non-timestamp column becomes one state factor, in frame column
/// order; a state vector is a contiguous slice of the matrix, so serving it
/// to an agent is a bounds check and nothing else.
#[derive(Debug, Clone)]
pub struct SimulationData {
    timestamps: Vec<DateTime<Utc>>,
    matrix: Vec<f64>,
    n_state_factors: usize,
    close_idx: usize,
}

impl SimulationData {
    #[tracing::instrument(skip(frame), fields(rows = frame.height()))]
    pub fn from_frame(frame: &DataFrame) -> QfoldResult<Self> {
        let n_rows = frame.height();
        if n_rows == 0 {
            return Err(DataError::Empty("simulation frame has no rows".to_string()).into());
        }

        let timestamps = extract_timestamps(frame)?;

        let factor_names: Vec<_> = frame
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != CanonicalCol::Timestamp.as_str())
            .cloned()
            .collect();
        let n_state_factors = factor_names.len();

        let close_idx = factor_names
            .iter()
            .position(|name| name.as_str() == CanonicalCol::Close.as_str())
            .ok_or_else(|| DataError::MissingColumn(CanonicalCol::Close.to_string()))?;

        // Column-wise read, row-major write.
        let mut matrix = vec![0.0; n_rows * n_state_factors];
        for (factor, name) in factor_names.iter().enumerate() {
            let values = frame.column(name.as_str())?.f64()?;
            for (row, value) in values.into_iter().enumerate() {
                matrix[row * n_state_factors + factor] = value.ok_or_else(|| {
                    DataError::DataFrame(format!("null value in column '{name}' at row {row}"))
                })?;
            }
        }

        Ok(Self {
            timestamps,
            matrix,
            n_state_factors,
            close_idx,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_state_factors(&self) -> usize {
        self.n_state_factors
    }

    /// The full state vector of one row.
    pub fn state(&self, row: usize) -> &[f64] {
        let start = row * self.n_state_factors;
        &self.matrix[start..start + self.n_state_factors]
    }

    pub fn close(&self, row: usize) -> Price {
        Price(self.matrix[row * self.n_state_factors + self.close_idx])
    }

    pub fn timestamp(&self, row: usize) -> DateTime<Utc> {
        self.timestamps[row]
    }

    /// Fractional close-to-close return of the interval ending at `row`.
    pub fn period_return(&self, row: usize) -> QfoldResult<f64> {
        if row == 0 {
            return Err(EnvError::InvalidState(
                "period return is undefined at the first row".to_string(),
            )
            .into());
        }
        let prev = self.close(row - 1).0;
        let curr = self.close(row).0;
        Ok(curr / prev - 1.0)
    }
}

fn extract_timestamps(frame: &DataFrame) -> QfoldResult<Vec<DateTime<Utc>>> {
    let column = frame
        .column(CanonicalCol::Timestamp.as_str())
        .map_err(|_| DataError::MissingColumn(CanonicalCol::Timestamp.to_string()))?;

    let mut timestamps = Vec::with_capacity(frame.height());
    for (row, micros) in column.datetime()?.physical().into_iter().enumerate() {
        let micros = micros.ok_or_else(|| {
            DataError::DataFrame(format!("null timestamp at row {row}"))
        })?;
        let ts = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            DataError::TimestampConversion(format!("{micros} microseconds out of range"))
        })?;
        timestamps.push(ts);
    }
    Ok(timestamps)
}
