/// Building the merged, indicator-enriched dataset from raw symbol files.
pub mod dataset;
/// Core market-data value types.
pub mod domain;
/// Technical indicators computed on the resampled series.
pub mod indicator;
/// Timestamp normalization and resampling of raw per-symbol files.
pub mod resample;
/// The canonical column vocabulary and frame schemas.
pub mod schema;
