use chrono::{DateTime, Utc};
use polars::prelude::{DataFrame, DataType, IntoLazy, TimeUnit, TimeZone, col, df};
use serde::{Deserialize, Serialize};

use crate::{
    data::{domain::Price, schema::CanonicalCol},
    error::{EnvError, QfoldResult},
};

/// One round trip: a buy fill and, once the position is closed again, the
/// matching sell fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Fill time of the buy, which is also the record key.
    pub timestamp: DateTime<Utc>,
    pub buy: Price,
    pub sell: Option<Price>,
}

impl OrderRecord {
    pub fn is_open(&self) -> bool {
        self.sell.is_none()
    }
}

/// Order history of an evaluation run, kept sorted by buy timestamp.
///
/// Epoch replay revisits the same rows, so a buy at an already recorded
/// timestamp overwrites that record instead of duplicating it.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    records: Vec<OrderRecord>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a buy fill, replacing any record already keyed by `timestamp`.
    pub fn upsert_buy(&mut self, timestamp: DateTime<Utc>, price: Price) {
        let record = OrderRecord {
            timestamp,
            buy: price,
            sell: None,
        };
        match self
            .records
            .binary_search_by_key(&timestamp, |r| r.timestamp)
        {
            Ok(i) => self.records[i] = record,
            Err(i) => self.records.insert(i, record),
        }
    }

    /// Completes the most recent round trip with its sell fill.
    ///
    /// The position machine guarantees a sell only ever follows a buy; a
    /// violation here means the ledger and the position state have diverged.
    pub fn fill_sell(&mut self, price: Price) -> QfoldResult<()> {
        let open = self
            .records
            .last_mut()
            .ok_or_else(|| EnvError::LedgerViolation("sell fill with no orders".to_string()))?;
        if !open.is_open() {
            return Err(EnvError::LedgerViolation(
                "sell fill but the last order is already closed".to_string(),
            )
            .into());
        }
        open.sell = Some(price);
        Ok(())
    }

    /// Fractional returns of the completed round trips, in buy-time order.
    /// An order still open at the end of a run is not a realized trade and is
    /// excluded.
    pub fn order_returns(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.sell.map(|sell| sell.0 / r.buy.0 - 1.0))
            .collect()
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Tabular view for plotting fills on top of the price series.
    pub fn as_df(&self) -> QfoldResult<DataFrame> {
        let ts: Vec<i64> = self.records.iter().map(|r| r.timestamp.timestamp_micros()).collect();
        let buys: Vec<f64> = self.records.iter().map(|r| r.buy.0).collect();
        let sells: Vec<Option<f64>> = self.records.iter().map(|r| r.sell.map(|p| p.0)).collect();

        let frame = df![
            CanonicalCol::Timestamp.to_string() => ts,
            "buy" => buys,
            "sell" => sells,
        ]
        .map_err(crate::error::DataError::from)?
        .lazy()
        .with_column(col(CanonicalCol::Timestamp).cast(DataType::Datetime(
            TimeUnit::Microseconds,
            Some(TimeZone::UTC),
        )))
        .collect()?;

        Ok(frame)
    }
}
