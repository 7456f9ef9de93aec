use std::sync::Arc;

use polars::prelude::{DataType, Field, PlSmallStr, Schema, SchemaRef, TimeUnit, TimeZone};
use strum::{Display, EnumString, IntoStaticStr};

/// The standardized vocabulary for all qfold market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalCol {
    // ========================================================================
    // Raw Input (headerless CSV, split date/time)
    // ========================================================================
    /// Calendar date in the source timezone (raw input only).
    Date,
    /// Wall-clock time in the source timezone (raw input only).
    Time,

    // ========================================================================
    // Resampled Series
    // ========================================================================
    /// The primary index: interval close time, UTC, strictly increasing and
    /// uniformly spaced after resampling.
    Timestamp,

    Open,
    High,
    Low,
    Close,
    Volume,
}

impl From<CanonicalCol> for PlSmallStr {
    fn from(value: CanonicalCol) -> Self {
        value.as_str().into()
    }
}

impl CanonicalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Self::Date | Self::Time => DataType::String,

            Self::Open | Self::High | Self::Low | Self::Close | Self::Volume => DataType::Float64,

            Self::Timestamp => DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC)),
        }
    }

    pub fn field(&self) -> Field {
        Field::new(self.name(), self.dtype())
    }
}

/// Schema of a raw per-symbol file: `[date, time, open, high, low, close, volume]`,
/// comma-separated, no header. Supplying this schema to the CSV reader makes a
/// non-numeric price or volume field a hard load error.
pub fn raw_ohlcv_schema() -> SchemaRef {
    let s = Schema::from_iter([
        CanonicalCol::Date.field(),
        CanonicalCol::Time.field(),
        CanonicalCol::Open.field(),
        CanonicalCol::High.field(),
        CanonicalCol::Low.field(),
        CanonicalCol::Close.field(),
        CanonicalCol::Volume.field(),
    ]);

    Arc::new(s)
}

/// Column order of a resampled uniform-frequency series.
pub fn resampled_ohlcv_columns() -> [CanonicalCol; 6] {
    [
        CanonicalCol::Timestamp,
        CanonicalCol::Open,
        CanonicalCol::High,
        CanonicalCol::Low,
        CanonicalCol::Close,
        CanonicalCol::Volume,
    ]
}
