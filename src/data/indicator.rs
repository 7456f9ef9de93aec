use std::str::FromStr;

use polars::{
    prelude::{EWMOptions, Expr, RollingOptionsFixedWindow, col, lit, when},
    series::ops::NullBehavior,
};
use serde::{Deserialize, Serialize};

use crate::{data::schema::CanonicalCol, error::DataError};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RsiWindow(pub u16);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MomentumWindow(pub u16);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacdWindows {
    pub fast: u16,
    pub slow: u16,
    pub signal: u16,
}

impl Default for MacdWindows {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StochWindows {
    pub k: u16,
    pub d: u16,
}

impl Default for StochWindows {
    fn default() -> Self {
        Self { k: 14, d: 3 }
    }
}

/// A technical indicator attached to the primary symbol of a composite
/// dataset. Each indicator contributes one or more derived columns to the
/// state vector; [`IndicatorDescriptor`] records those columns so external
/// rendering can give each indicator its own subplot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechnicalIndicator {
    Macd(MacdWindows),
    Momentum(MomentumWindow),
    Rsi(RsiWindow),
    Stochastic(StochWindows),
}

impl FromStr for TechnicalIndicator {
    type Err = DataError;

    /// Maps the CLI indicator names (`macd`, `rsi`, `mom`, `stoch`) onto the
    /// conventional default windows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "macd" => Ok(TechnicalIndicator::Macd(MacdWindows::default())),
            "mom" | "momentum" => Ok(TechnicalIndicator::Momentum(MomentumWindow(10))),
            "rsi" => Ok(TechnicalIndicator::Rsi(RsiWindow(14))),
            "stoch" | "stochastic" => Ok(TechnicalIndicator::Stochastic(StochWindows::default())),
            other => Err(DataError::InvalidIndicator(other.to_string())),
        }
    }
}

impl TechnicalIndicator {
    /// Names of the derived columns, in the order [`Self::exprs`] emits them.
    pub fn columns(&self) -> Vec<String> {
        match self {
            TechnicalIndicator::Macd(w) => vec![
                format!("macd_{}_{}", w.fast, w.slow),
                format!("macd_signal_{}", w.signal),
            ],
            TechnicalIndicator::Momentum(w) => vec![format!("mom_{}", w.0)],
            TechnicalIndicator::Rsi(w) => vec![format!("rsi_{}", w.0)],
            TechnicalIndicator::Stochastic(w) => {
                vec![format!("stoch_k_{}", w.k), format!("stoch_d_{}", w.d)]
            }
        }
    }

    /// Aliased polars expressions computing the derived columns from the
    /// primary `close` (and `high`/`low` for the stochastic channel).
    pub fn exprs(&self) -> Vec<Expr> {
        let names = self.columns();
        match self {
            TechnicalIndicator::Macd(w) => {
                let line = ema(col(CanonicalCol::Close), w.fast)
                    - ema(col(CanonicalCol::Close), w.slow);
                let signal = ema(line.clone(), w.signal);
                vec![line.alias(names[0].as_str()), signal.alias(names[1].as_str())]
            }

            TechnicalIndicator::Momentum(w) => {
                let mom = col(CanonicalCol::Close).diff(lit(w.0 as i64), NullBehavior::Ignore);
                vec![mom.alias(names[0].as_str())]
            }

            TechnicalIndicator::Rsi(w) => {
                // Wilder's smoothing: an EMA with alpha = 1/N.
                let options = wilder_options(w.0);

                let delta = col(CanonicalCol::Close).diff(lit(1), NullBehavior::Ignore);
                let gain = delta.clone().clip(lit(0), lit(f64::MAX));
                let loss = delta.clip(lit(f64::MIN), lit(0)).abs();

                let avg_gain = gain.ewm_mean(options.clone());
                let avg_loss = loss.ewm_mean(options);

                let rs = avg_gain / avg_loss;
                let rsi = lit(100.0) - (lit(100.0) / (lit(1.0) + rs));
                vec![rsi.alias(names[0].as_str())]
            }

            TechnicalIndicator::Stochastic(w) => {
                let channel_low = col(CanonicalCol::Low).rolling_min(rolling(w.k));
                let channel_high = col(CanonicalCol::High).rolling_max(rolling(w.k));
                let width = channel_high - channel_low.clone();

                // A run of >= k flat bars (gap fill synthesizes exactly flat
                // prices) collapses the channel to zero width; the midline is
                // the only value that keeps %K bounded there.
                let k = when(width.clone().eq(lit(0.0)))
                    .then(lit(50.0))
                    .otherwise(
                        (col(CanonicalCol::Close) - channel_low) / width * lit(100.0),
                    );
                let d = k.clone().rolling_mean(rolling(w.d));
                vec![k.alias(names[0].as_str()), d.alias(names[1].as_str())]
            }
        }
    }

    pub fn descriptor(&self) -> IndicatorDescriptor {
        IndicatorDescriptor {
            indicator: *self,
            columns: self.columns(),
        }
    }
}

fn ema(input: Expr, window: u16) -> Expr {
    // Standard EMA formula: alpha = 2 / (span + 1)
    let alpha = 2.0 / (window as f64 + 1.0);
    let options = EWMOptions {
        alpha,
        // Use recursive calculation
        adjust: false,

        // Do not apply statistical sample correction; we want the raw weighted average.
        bias: false,

        // Don't emit values until we have seen 'window' rows.
        // This avoids noisy, highly-volatile values at the start of the stream.
        min_periods: window as usize,

        // If a price is missing, skip the decay step for that row.
        ignore_nulls: true,
    };
    input.ewm_mean(options)
}

fn wilder_options(window: u16) -> EWMOptions {
    EWMOptions {
        alpha: 1.0 / (window as f64),
        adjust: false,
        bias: false,
        min_periods: window as usize,
        ignore_nulls: true,
    }
}

fn rolling(window: u16) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window as usize,
        min_periods: window as usize, // Strict: Require full window validity
        weights: None,
        center: false, // False prevents look-ahead bias
        fn_params: None,
    }
}

/// Per-indicator state handed to the visualization subsystem: which indicator
/// produced which columns of the composite frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDescriptor {
    pub indicator: TechnicalIndicator,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_names_map_to_default_windows() {
        assert_eq!(
            "macd".parse::<TechnicalIndicator>().unwrap(),
            TechnicalIndicator::Macd(MacdWindows::default())
        );
        assert_eq!(
            "rsi".parse::<TechnicalIndicator>().unwrap(),
            TechnicalIndicator::Rsi(RsiWindow(14))
        );
        assert_eq!(
            "mom".parse::<TechnicalIndicator>().unwrap(),
            TechnicalIndicator::Momentum(MomentumWindow(10))
        );
        assert_eq!(
            "stoch".parse::<TechnicalIndicator>().unwrap(),
            TechnicalIndicator::Stochastic(StochWindows { k: 14, d: 3 })
        );
        assert!("bollinger".parse::<TechnicalIndicator>().is_err());
    }

    #[test]
    fn descriptor_columns_match_expr_aliases() {
        for indicator in [
            TechnicalIndicator::Macd(MacdWindows::default()),
            TechnicalIndicator::Momentum(MomentumWindow(10)),
            TechnicalIndicator::Rsi(RsiWindow(14)),
            TechnicalIndicator::Stochastic(StochWindows::default()),
        ] {
            let descriptor = indicator.descriptor();
            assert_eq!(descriptor.columns.len(), indicator.exprs().len());
        }
    }
}
