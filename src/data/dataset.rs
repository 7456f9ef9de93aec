use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use itertools::Itertools;
use polars::prelude::{DataFrame, Expr, IntoLazy, JoinArgs, JoinType, LazyFrame, PlSmallStr,
    SortMultipleOptions, col};
use tracing::info;

use crate::{
    data::{
        domain::{Period, Symbol},
        indicator::{IndicatorDescriptor, TechnicalIndicator},
        resample,
        schema::CanonicalCol,
    },
    error::{DataError, IoError, QfoldResult},
};

/// Configuration for building a [`CompositeDataset`] from raw symbol files.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Target resample interval of the uniform series.
    pub period: Period,

    /// Fixed source timezone of the raw date/time columns.
    pub timezone: Tz,

    /// Indicators computed on the primary symbol's series.
    pub indicators: Vec<TechnicalIndicator>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            period: Period::default(),
            timezone: chrono_tz::America::New_York,
            indicators: Vec::new(),
        }
    }
}

impl DatasetConfig {
    pub fn with_period(self, period: Period) -> Self {
        Self { period, ..self }
    }

    pub fn with_timezone(self, timezone: Tz) -> Self {
        Self { timezone, ..self }
    }

    pub fn with_indicators(self, indicators: Vec<TechnicalIndicator>) -> Self {
        Self { indicators, ..self }
    }

    /// Parses the CLI indicator-name surface (e.g. `["macd", "rsi", "mom", "stoch"]`).
    /// An unknown name fails the whole configuration.
    pub fn with_indicator_names(self, names: &[&str]) -> QfoldResult<Self> {
        let indicators = names
            .iter()
            .map(|n| n.parse::<TechnicalIndicator>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { indicators, ..self })
    }
}

/// One merged tabular dataset built from a directory of per-symbol raw files.
///
/// The first symbol (sorted file-name order) is the primary traded instrument
/// and keeps the canonical OHLCV column names; every further symbol contributes
/// feature columns prefixed with its name. Indicator columns are computed on
/// the primary close/high/low and appended on the right.
#[derive(Debug, Clone)]
pub struct CompositeDataset {
    frame: DataFrame,
    indicators: Vec<IndicatorDescriptor>,
    symbols: Vec<Symbol>,
}

impl CompositeDataset {
    /// Builds the composite dataset from every `*.csv` file in `dir`.
    ///
    /// Any unreadable or unparseable entry fails the whole construction: a
    /// partially loaded dataset would silently corrupt the fold-length
    /// arithmetic downstream.
    #[tracing::instrument(skip(cfg), fields(dir = %dir.display()))]
    pub fn from_csv_dir(dir: &Path, cfg: &DatasetConfig) -> QfoldResult<Self> {
        let files = csv_files(dir)?;
        if files.is_empty() {
            return Err(DataError::Empty(format!("no csv files in {}", dir.display())).into());
        }

        let mut series = Vec::with_capacity(files.len());
        for path in &files {
            let symbol = symbol_of(path)?;
            let frame = resample::load_symbol_csv(path, cfg.period, cfg.timezone)?;
            series.push((symbol, frame));
        }

        Self::assemble(series, cfg)
    }

    /// Single-file convenience for one-symbol datasets.
    pub fn from_csv(path: &Path, cfg: &DatasetConfig) -> QfoldResult<Self> {
        let symbol = symbol_of(path)?;
        let frame = resample::load_symbol_csv(path, cfg.period, cfg.timezone)?;
        Self::assemble(vec![(symbol, frame)], cfg)
    }

    /// Wraps an externally prepared frame that already carries the canonical
    /// timestamp column and numeric feature columns.
    pub fn from_frame(frame: DataFrame) -> QfoldResult<Self> {
        if frame.height() == 0 {
            return Err(DataError::Empty("frame has no rows".to_string()).into());
        }
        if frame.column(CanonicalCol::Timestamp.as_str()).is_err() {
            return Err(DataError::MissingColumn(CanonicalCol::Timestamp.to_string()).into());
        }
        Ok(Self {
            frame,
            indicators: Vec::new(),
            symbols: Vec::new(),
        })
    }

    fn assemble(series: Vec<(Symbol, DataFrame)>, cfg: &DatasetConfig) -> QfoldResult<Self> {
        let mut iter = series.into_iter();
        let (primary, primary_frame) = iter
            .next()
            .ok_or_else(|| DataError::Empty("no symbol series".to_string()))?;

        let mut symbols = vec![primary];
        let mut lf = primary_frame.lazy();

        for (symbol, frame) in iter {
            lf = lf.join(
                prefixed(frame, &symbol)?,
                [col(CanonicalCol::Timestamp)],
                [col(CanonicalCol::Timestamp)],
                JoinArgs::new(JoinType::Inner),
            );
            symbols.push(symbol);
        }

        let exprs: Vec<Expr> = cfg.indicators.iter().flat_map(|i| i.exprs()).collect();
        if !exprs.is_empty() {
            // Rolling/EWM warm-up nulls only occur in a leading prefix, so
            // dropping them keeps the series uniformly spaced.
            lf = lf.with_columns(exprs).drop_nulls(None);
        }

        let frame = lf
            .sort([CanonicalCol::Timestamp], SortMultipleOptions::default())
            .collect()?;

        if frame.height() == 0 {
            return Err(
                DataError::Empty("no overlapping rows across symbol series".to_string()).into(),
            );
        }

        let indicators: Vec<IndicatorDescriptor> =
            cfg.indicators.iter().map(|i| i.descriptor()).collect();

        info!(
            rows = frame.height(),
            columns = frame.width(),
            symbols = symbols.len(),
            indicators = indicators.len(),
            "built composite dataset"
        );

        Ok(Self {
            frame,
            indicators,
            symbols,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn indicators(&self) -> &[IndicatorDescriptor] {
        &self.indicators
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn csv_files(dir: &Path) -> QfoldResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }

    // Sorted name order makes the primary-symbol choice deterministic.
    Ok(files.into_iter().sorted().collect())
}

fn symbol_of(path: &Path) -> QfoldResult<Symbol> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IoError::FileSystem(format!("invalid file name: {}", path.display())))?;
    Ok(Symbol(stem.to_ascii_lowercase()))
}

/// Renames every non-timestamp column of a secondary symbol to `{symbol}_{col}`.
fn prefixed(frame: DataFrame, symbol: &Symbol) -> QfoldResult<LazyFrame> {
    let existing: Vec<PlSmallStr> = frame
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != CanonicalCol::Timestamp.as_str())
        .cloned()
        .collect();
    let renamed: Vec<PlSmallStr> = existing
        .iter()
        .map(|name| PlSmallStr::from(format!("{symbol}_{name}")))
        .collect();

    Ok(frame.lazy().rename(existing, renamed, true))
}
