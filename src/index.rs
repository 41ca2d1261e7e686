//! Time-keyed lookup over a daily dataset.
//!
//! ```text
//! settlement_period: [PeriodRecord]  ──►  by_settlement_period: sp   → zone → PeriodRecord
//! hourly:            [HourRecord]    ──►  by_hour:              hour → zone → HourRecord
//! daily:             [DailyRecord]   ──►  (no time key, folded straight into a slice)
//! ```
//!
//! The index is a read-only projection of the dataset. It is rebuilt in full
//! whenever the dataset is replaced and never patched in place.

use std::collections::BTreeMap;

use crate::aggregation::AggregationMode;
use crate::model::{DailyDataset, DailyRecord, HourRecord, PeriodRecord, ZoneMetrics, ZoneRecord};

pub type ZoneMap<R> = BTreeMap<String, R>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSliceIndex {
    by_settlement_period: BTreeMap<u32, ZoneMap<PeriodRecord>>,
    by_hour: BTreeMap<u32, ZoneMap<HourRecord>>,
}

/// Single pass. A zone appearing twice under one key keeps the later record.
fn index_by<R, K>(records: &[R], key: K) -> BTreeMap<u32, ZoneMap<R>>
where
    R: ZoneRecord + Clone,
    K: Fn(&R) -> u32,
{
    let mut out: BTreeMap<u32, ZoneMap<R>> = BTreeMap::new();
    for rec in records {
        out.entry(key(rec))
            .or_default()
            .insert(rec.gsp_group_id().to_string(), rec.clone());
    }
    out
}

impl TimeSliceIndex {
    pub fn build(dataset: &DailyDataset) -> Self {
        Self::from_records(&dataset.settlement_period, &dataset.hourly)
    }

    pub fn from_records(periods: &[PeriodRecord], hours: &[HourRecord]) -> Self {
        Self {
            by_settlement_period: index_by(periods, |r| r.settlement_period),
            by_hour: index_by(hours, |r| r.hour),
        }
    }

    pub fn by_settlement_period(&self) -> &BTreeMap<u32, ZoneMap<PeriodRecord>> {
        &self.by_settlement_period
    }

    pub fn by_hour(&self) -> &BTreeMap<u32, ZoneMap<HourRecord>> {
        &self.by_hour
    }

    pub fn period(&self, settlement_period: u32) -> Option<&ZoneMap<PeriodRecord>> {
        self.by_settlement_period.get(&settlement_period)
    }

    pub fn hour(&self, hour: u32) -> Option<&ZoneMap<HourRecord>> {
        self.by_hour.get(&hour)
    }

    pub fn is_empty(&self) -> bool {
        self.by_settlement_period.is_empty() && self.by_hour.is_empty()
    }
}

/// Borrowed record of whichever granularity the active slice uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceRecord<'a> {
    Period(&'a PeriodRecord),
    Hour(&'a HourRecord),
    Day(&'a DailyRecord),
}

impl ZoneRecord for SliceRecord<'_> {
    fn gsp_group_id(&self) -> &str {
        match self {
            SliceRecord::Period(r) => &r.gsp_group_id,
            SliceRecord::Hour(r) => &r.gsp_group_id,
            SliceRecord::Day(r) => &r.gsp_group_id,
        }
    }

    fn metrics(&self) -> &ZoneMetrics {
        match self {
            SliceRecord::Period(r) => &r.metrics,
            SliceRecord::Hour(r) => &r.metrics,
            SliceRecord::Day(r) => &r.metrics,
        }
    }

    fn plot_x(&self) -> u32 {
        match self {
            SliceRecord::Period(r) => r.plot_x(),
            SliceRecord::Hour(r) => r.plot_x(),
            SliceRecord::Day(r) => r.plot_x(),
        }
    }
}

/// zone id -> record for one point in time.
pub type ZoneSlice<'a> = BTreeMap<&'a str, SliceRecord<'a>>;

/// Zone map for `point` under `mode`. Daily mode ignores `point`.
/// A time key with no records yields an empty slice.
pub fn select_slice<'a>(
    index: &'a TimeSliceIndex,
    daily: &'a [DailyRecord],
    mode: AggregationMode,
    point: u32,
) -> ZoneSlice<'a> {
    match mode {
        AggregationMode::ThirtyMinute => index
            .period(point)
            .map(|zones| {
                zones
                    .iter()
                    .map(|(id, r)| (id.as_str(), SliceRecord::Period(r)))
                    .collect()
            })
            .unwrap_or_default(),
        AggregationMode::Hourly => index
            .hour(point)
            .map(|zones| {
                zones
                    .iter()
                    .map(|(id, r)| (id.as_str(), SliceRecord::Hour(r)))
                    .collect()
            })
            .unwrap_or_default(),
        AggregationMode::Daily => daily
            .iter()
            .map(|r| (r.gsp_group_id.as_str(), SliceRecord::Day(r)))
            .collect(),
    }
}
