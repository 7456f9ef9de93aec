use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use polars::prelude::{
    DataFrame, DataType, IntoLazy, LazyCsvReader, LazyFileListReader, PlPath, SortMultipleOptions,
    TimeUnit, TimeZone, col, df, lit,
};
use tracing::debug;

use crate::{
    data::{
        domain::Period,
        schema::{CanonicalCol, raw_ohlcv_schema, resampled_ohlcv_columns},
    },
    error::{DataError, IoError, QfoldResult},
};

/// Accepted `date time` layouts for the raw input. The first matching format
/// wins; a row matching none of them aborts the load.
const LOCAL_TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// One bar of a (possibly gappy) series, timestamped in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawBar {
    ts: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

// ================================================================================================
// Loading
// ================================================================================================

/// Loads one raw per-symbol CSV and produces a uniform-frequency series.
///
/// The file is headerless with columns `[date, time, open, high, low, close, volume]`
/// in the source timezone `tz`. Timestamps are localized, converted to UTC and
/// resampled onto a gap-free spine at `period` spacing: intervals with no trade
/// get `volume = 0` and a flat bar at the previous close.
///
/// Any malformed timestamp, non-numeric field or duplicate bar fails the whole
/// load; nothing is skipped.
#[tracing::instrument(skip_all, fields(path = %path.display(), %period))]
pub fn load_symbol_csv(path: &Path, period: Period, tz: Tz) -> QfoldResult<DataFrame> {
    let file = path.display().to_string();
    let utf8_path = path
        .to_str()
        .ok_or_else(|| IoError::FileSystem(format!("non-UTF8 path: {file}")))?;

    let raw = LazyCsvReader::new(PlPath::new(utf8_path))
        .with_has_header(false)
        .with_schema(Some(raw_ohlcv_schema()))
        .finish()?
        .collect()?;

    let mut bars = decode_bars(&raw, &file, tz)?;
    bars.sort_by_key(|b| b.ts);
    reject_duplicates(&bars, &file)?;

    let before = bars.len();
    let bars = upsample(bars, period)?;
    debug!(raw_rows = before, resampled_rows = bars.len(), "resampled symbol file");

    to_frame(&bars)
}

fn decode_bars(raw: &DataFrame, file: &str, tz: Tz) -> QfoldResult<Vec<RawBar>> {
    if raw.height() == 0 {
        return Err(DataError::Empty(file.to_string()).into());
    }

    let date = raw.column(CanonicalCol::Date.as_str())?.str()?;
    let time = raw.column(CanonicalCol::Time.as_str())?.str()?;
    let open = raw.column(CanonicalCol::Open.as_str())?.f64()?;
    let high = raw.column(CanonicalCol::High.as_str())?.f64()?;
    let low = raw.column(CanonicalCol::Low.as_str())?.f64()?;
    let close = raw.column(CanonicalCol::Close.as_str())?.f64()?;
    let volume = raw.column(CanonicalCol::Volume.as_str())?.f64()?;

    let mut bars = Vec::with_capacity(raw.height());
    for row in 0..raw.height() {
        let numeric = |name: &str, value: Option<f64>| {
            value.ok_or_else(|| DataError::DataFrame(format!("null {name} in '{file}' at row {row}")))
        };

        let (d, t) = match (date.get(row), time.get(row)) {
            (Some(d), Some(t)) => (d, t),
            _ => {
                return Err(DataError::MalformedTimestamp {
                    file: file.to_string(),
                    row,
                    value: "<null>".to_string(),
                }
                .into());
            }
        };

        bars.push(RawBar {
            ts: parse_local_timestamp(d, t, tz, file, row)?,
            open: numeric("open", open.get(row))?,
            high: numeric("high", high.get(row))?,
            low: numeric("low", low.get(row))?,
            close: numeric("close", close.get(row))?,
            volume: numeric("volume", volume.get(row))?,
        });
    }
    Ok(bars)
}

/// Combines a split date/time pair, localizes it in `tz` and converts to UTC.
///
/// DST resolution is deterministic: an ambiguous local time maps to the
/// earliest of its two instants; a nonexistent local time (spring-forward gap)
/// is a load error. Both choices preserve total order over valid inputs.
fn parse_local_timestamp(
    date: &str,
    time: &str,
    tz: Tz,
    file: &str,
    row: usize,
) -> QfoldResult<DateTime<Utc>> {
    let combined = format!("{date} {time}");
    let naive = LOCAL_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .ok_or_else(|| DataError::MalformedTimestamp {
            file: file.to_string(),
            row,
            value: combined.clone(),
        })?;

    match naive.and_local_timezone(tz) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        chrono::LocalResult::None => Err(DataError::NonexistentLocalTime {
            file: file.to_string(),
            value: combined,
        }
        .into()),
    }
}

fn reject_duplicates(bars: &[RawBar], file: &str) -> QfoldResult<()> {
    for pair in bars.windows(2) {
        if pair[0].ts == pair[1].ts {
            return Err(DataError::DuplicateTimestamp {
                file: file.to_string(),
                ts: pair[0].ts.to_rfc3339(),
            }
            .into());
        }
    }
    Ok(())
}

// ================================================================================================
// Upsampling (gap fill)
// ================================================================================================

/// Resamples sorted bars onto a uniform spine at `period` spacing.
///
/// Every bar is floored onto its spine slot. Slots without a trade synthesize
/// `volume = 0` and a flat bar at the last known close; two source bars landing
/// in the same slot means the input is finer than the target interval, which is
/// an error rather than an implicit aggregation.
///
/// The spine starts at the floor of the first real bar, so the first output row
/// always carries a real close and never needs a forward fill.
fn upsample(bars: Vec<RawBar>, period: Period) -> QfoldResult<Vec<RawBar>> {
    let step = period
        .duration()
        .num_microseconds()
        .ok_or_else(|| DataError::InvalidPeriod(period.to_string()))?;

    let mut out: Vec<RawBar> = Vec::with_capacity(bars.len());
    let mut prev_slot: Option<i64> = None;
    let mut last_close = f64::NAN;

    for bar in bars {
        let slot = bar.ts.timestamp_micros().div_euclid(step) * step;

        if let Some(prev) = prev_slot {
            if slot == prev {
                return Err(DataError::IntervalCollision {
                    ts: bar.ts.to_rfc3339(),
                }
                .into());
            }
            // Synthesize flat zero-volume bars for every skipped slot.
            let mut gap = prev + step;
            while gap < slot {
                out.push(RawBar {
                    ts: utc_from_micros(gap)?,
                    open: last_close,
                    high: last_close,
                    low: last_close,
                    close: last_close,
                    volume: 0.0,
                });
                gap += step;
            }
        }

        out.push(RawBar {
            ts: utc_from_micros(slot)?,
            ..bar
        });
        last_close = bar.close;
        prev_slot = Some(slot);
    }

    Ok(out)
}

fn utc_from_micros(micros: i64) -> QfoldResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        DataError::TimestampConversion(format!("microsecond value {micros} out of range")).into()
    })
}

fn to_frame(bars: &[RawBar]) -> QfoldResult<DataFrame> {
    let mut timestamps = Vec::with_capacity(bars.len());
    let mut opens = Vec::with_capacity(bars.len());
    let mut highs = Vec::with_capacity(bars.len());
    let mut lows = Vec::with_capacity(bars.len());
    let mut closes = Vec::with_capacity(bars.len());
    let mut volumes = Vec::with_capacity(bars.len());

    for bar in bars {
        timestamps.push(bar.ts.timestamp_micros());
        opens.push(bar.open);
        highs.push(bar.high);
        lows.push(bar.low);
        closes.push(bar.close);
        volumes.push(bar.volume);
    }

    let frame = df![
        CanonicalCol::Timestamp.to_string() => timestamps,
        CanonicalCol::Open.to_string() => opens,
        CanonicalCol::High.to_string() => highs,
        CanonicalCol::Low.to_string() => lows,
        CanonicalCol::Close.to_string() => closes,
        CanonicalCol::Volume.to_string() => volumes,
    ]
    .map_err(DataError::from)?;

    let frame = frame
        .lazy()
        .with_column(col(CanonicalCol::Timestamp).cast(DataType::Datetime(
            TimeUnit::Microseconds,
            Some(TimeZone::UTC),
        )))
        .collect()?;

    Ok(frame)
}

// ================================================================================================
// Downsampling
// ================================================================================================

/// Aggregates a fine series to a coarser interval:
/// `open = first`, `high = max`, `low = min`, `close = last`, `volume = sum`
/// over each destination interval. Secondary analysis only; the training path
/// consumes the upsampled series as-is.
pub fn downsample(frame: &DataFrame, period: Period) -> QfoldResult<DataFrame> {
    let every = period.as_polars_every();

    let out = frame
        .clone()
        .lazy()
        .sort(
            [CanonicalCol::Timestamp],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .group_by_stable([col(CanonicalCol::Timestamp)
            .dt()
            .truncate(lit(every))
            .alias(CanonicalCol::Timestamp)])
        .agg([
            col(CanonicalCol::Open).first(),
            col(CanonicalCol::High).max(),
            col(CanonicalCol::Low).min(),
            col(CanonicalCol::Close).last(),
            col(CanonicalCol::Volume).sum(),
        ])
        // Pin the canonical column order regardless of agg output order.
        .select(resampled_ohlcv_columns().map(col))
        .sort([CanonicalCol::Timestamp], SortMultipleOptions::default())
        .collect()?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn bar(ts_s: &str, close: f64, volume: f64) -> RawBar {
        RawBar {
            ts: ts(ts_s),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    // ============================================================================================
    // Timestamp parsing
    // ============================================================================================

    #[test]
    fn parses_all_supported_layouts() {
        let tz = chrono_tz::America::New_York;
        for (d, t) in [
            ("07/19/2016", "09:30:00"),
            ("07/19/2016", "09:30"),
            ("2016-07-19", "09:30:00"),
            ("2016-07-19", "09:30"),
        ] {
            let parsed = parse_local_timestamp(d, t, tz, "f", 0).unwrap();
            // 09:30 EDT == 13:30 UTC
            assert_eq!(parsed, ts("2016-07-19T13:30:00Z"));
        }
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let tz = chrono_tz::America::New_York;
        assert!(parse_local_timestamp("not-a-date", "09:30", tz, "f", 3).is_err());
    }

    #[test]
    fn ambiguous_local_time_resolves_to_earliest() {
        // 2016-11-06 01:30 occurs twice in New York (fall back).
        let tz = chrono_tz::America::New_York;
        let parsed = parse_local_timestamp("2016-11-06", "01:30", tz, "f", 0).unwrap();
        // Earliest instant is still EDT (UTC-4).
        assert_eq!(parsed, ts("2016-11-06T05:30:00Z"));
    }

    #[test]
    fn nonexistent_local_time_is_an_error() {
        // 2017-03-12 02:30 does not exist in New York (spring forward).
        let tz = chrono_tz::America::New_York;
        assert!(parse_local_timestamp("2017-03-12", "02:30", tz, "f", 0).is_err());
    }

    #[test]
    fn utc_conversion_preserves_order() {
        let tz = chrono_tz::America::New_York;
        // Straddles the fall-back transition; local order must survive in UTC.
        let inputs = [
            ("2016-11-06", "00:59"),
            ("2016-11-06", "01:30"),
            ("2016-11-06", "02:01"),
        ];
        let parsed: Vec<_> = inputs
            .iter()
            .map(|(d, t)| parse_local_timestamp(d, t, tz, "f", 0).unwrap())
            .collect();
        assert!(parsed.windows(2).all(|w| w[0] < w[1]));
    }

    // ============================================================================================
    // Upsampling
    // ============================================================================================

    #[test]
    fn gap_fill_synthesizes_flat_zero_volume_bars() {
        let bars = vec![
            bar("2016-07-19T13:30:00Z", 100.0, 10.0),
            bar("2016-07-19T13:31:00Z", 101.0, 20.0),
            // 13:32 and 13:33 missing
            bar("2016-07-19T13:34:00Z", 103.0, 5.0),
        ];

        let out = upsample(bars, Period::Minute(1)).unwrap();
        assert_eq!(out.len(), 5);

        // No missing rows between min and max at the configured frequency.
        for (i, b) in out.iter().enumerate() {
            assert_eq!(b.ts, ts("2016-07-19T13:30:00Z") + chrono::Duration::minutes(i as i64));
        }

        // Synthesized rows collapse to a single flat price point at the
        // nearest preceding close.
        for filled in &out[2..4] {
            assert_eq!(filled.volume, 0.0);
            assert_eq!(filled.close, 101.0);
            assert_eq!(filled.open, 101.0);
            assert_eq!(filled.high, 101.0);
            assert_eq!(filled.low, 101.0);
        }

        // Real bars are untouched apart from slot alignment.
        assert_eq!(out[4].close, 103.0);
        assert_eq!(out[4].volume, 5.0);
    }

    #[test]
    fn first_row_is_always_a_real_bar() {
        let bars = vec![bar("2016-07-19T13:30:30Z", 100.0, 10.0)];
        let out = upsample(bars, Period::Minute(1)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ts, ts("2016-07-19T13:30:00Z"));
        assert_eq!(out[0].close, 100.0);
    }

    #[test]
    fn finer_input_than_target_interval_is_an_error() {
        let bars = vec![
            bar("2016-07-19T13:30:00Z", 100.0, 10.0),
            bar("2016-07-19T13:30:30Z", 100.5, 10.0),
        ];
        assert!(upsample(bars, Period::Minute(1)).is_err());
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let bars = vec![
            bar("2016-07-19T13:30:00Z", 100.0, 10.0),
            bar("2016-07-19T13:30:00Z", 100.0, 10.0),
        ];
        assert!(reject_duplicates(&bars, "f").is_err());
    }

    // ============================================================================================
    // Downsampling
    // ============================================================================================

    #[test]
    fn downsample_aggregates_five_minute_buckets_exactly() {
        // 15 one-minute bars -> 3 five-minute bars.
        let start = Utc.with_ymd_and_hms(2016, 7, 19, 13, 30, 0).unwrap();
        let bars: Vec<RawBar> = (0..15)
            .map(|i| RawBar {
                ts: start + chrono::Duration::minutes(i),
                open: 100.0 + i as f64,
                high: 110.0 + i as f64,
                low: 90.0 + i as f64,
                close: 105.0 + i as f64,
                volume: (i + 1) as f64,
            })
            .collect();
        let fine = to_frame(&bars).unwrap();

        let coarse = downsample(&fine, Period::Minute(5)).unwrap();
        assert_eq!(coarse.height(), 3);

        let names: Vec<&str> = coarse.get_column_names().iter().map(|n| n.as_str()).collect();
        let expected: Vec<&str> = resampled_ohlcv_columns().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, expected);

        let opens = col_values(&coarse, CanonicalCol::Open);
        let highs = col_values(&coarse, CanonicalCol::High);
        let lows = col_values(&coarse, CanonicalCol::Low);
        let closes = col_values(&coarse, CanonicalCol::Close);
        let volumes = col_values(&coarse, CanonicalCol::Volume);

        // Bucket 0 covers bars 0..5, bucket 1 bars 5..10, bucket 2 bars 10..15.
        assert_eq!(opens, vec![100.0, 105.0, 110.0]);
        assert_eq!(highs, vec![114.0, 119.0, 124.0]);
        assert_eq!(lows, vec![90.0, 95.0, 100.0]);
        assert_eq!(closes, vec![109.0, 114.0, 119.0]);
        assert_eq!(volumes, vec![15.0, 40.0, 65.0]);
    }

    fn col_values(frame: &DataFrame, column: CanonicalCol) -> Vec<f64> {
        frame
            .column(column.as_str())
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }
}
