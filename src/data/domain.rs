// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

use std::{fmt, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    error::DataError, impl_add_sub_mul_div_primitive, impl_from_primitive, impl_neg_primitive,
};

/// A price level in the instrument's quote currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Price(pub f64);
impl_from_primitive!(Price, f64);
impl_add_sub_mul_div_primitive!(Price, f64);
impl_neg_primitive!(Price, f64);

/// A traded instrument, identified by the stem of its raw data file
/// (e.g. `aapl` for `aapl.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Temporal granularity of a resampled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Minute(u32),
    Hour(u32),
    Day(u32),
}

impl Default for Period {
    fn default() -> Self {
        Period::Minute(1)
    }
}

impl Period {
    pub fn duration(&self) -> Duration {
        match *self {
            Period::Minute(n) => Duration::minutes(n as i64),
            Period::Hour(n) => Duration::hours(n as i64),
            Period::Day(n) => Duration::days(n as i64),
        }
    }

    /// Polars duration string (e.g. `5m`, `1h`), used by the downsample
    /// truncation expression.
    pub fn as_polars_every(&self) -> String {
        match *self {
            Period::Minute(n) => format!("{n}m"),
            Period::Hour(n) => format!("{n}h"),
            Period::Day(n) => format!("{n}d"),
        }
    }

}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Period::Minute(n) => write!(f, "{n}min"),
            Period::Hour(n) => write!(f, "{n}h"),
            Period::Day(n) => write!(f, "{n}d"),
        }
    }
}

impl FromStr for Period {
    type Err = DataError;

    /// Parses the CLI interval surface: `1min`, `15Min`, `1h`, `1d` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| DataError::InvalidPeriod(s.to_string()))?;
        let (digits, unit) = lower.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| DataError::InvalidPeriod(s.to_string()))?;
        if n == 0 {
            return Err(DataError::InvalidPeriod(s.to_string()));
        }

        match unit {
            "min" | "m" | "minute" | "minutes" => Ok(Period::Minute(n)),
            "h" | "hour" | "hours" => Ok(Period::Hour(n)),
            "d" | "day" | "days" => Ok(Period::Day(n)),
            _ => Err(DataError::InvalidPeriod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_interval_strings() {
        assert_eq!("1Min".parse::<Period>().unwrap(), Period::Minute(1));
        assert_eq!("15min".parse::<Period>().unwrap(), Period::Minute(15));
        assert_eq!("1h".parse::<Period>().unwrap(), Period::Hour(1));
        assert_eq!("2d".parse::<Period>().unwrap(), Period::Day(2));
    }

    #[test]
    fn rejects_zero_length_and_garbage() {
        assert!("0min".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
        assert!("min".parse::<Period>().is_err());
        assert!("5fortnights".parse::<Period>().is_err());
    }

    #[test]
    fn duration_matches_unit() {
        assert_eq!(Period::Minute(5).duration(), Duration::minutes(5));
        assert_eq!(Period::Hour(1).duration(), Duration::hours(1));
        assert_eq!(Period::Minute(5).as_polars_every(), "5m");
    }
}
