//! Daily balancing dataset as served by the backend.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Technology name -> signed volume (MWh).
pub type Mix = BTreeMap<String, f64>;

/// Business day whose dataset is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSelection {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Year,
    Month,
    Day,
}

impl FromStr for DateField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(DateField::Year),
            "month" => Ok(DateField::Month),
            "day" => Ok(DateField::Day),
            other => Err(format!("unknown date field: {}", other)),
        }
    }
}

impl DateSelection {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Copy with one field replaced. No calendar validation: the backend
    /// rejects impossible dates.
    pub fn with_field(self, field: DateField, value: i32) -> Self {
        match field {
            DateField::Year => Self { year: value, ..self },
            DateField::Month => Self { month: value.max(0) as u32, ..self },
            DateField::Day => Self { day: value.max(0) as u32, ..self },
        }
    }

    /// `DD-MM-YYYY`, the daily-data query format
    pub fn to_query(&self) -> String {
        format!("{:02}-{:02}-{}", self.day, self.month, self.year)
    }

    /// `YYYY-MM-DD`
    pub fn iso(&self) -> String {
        format!("{}-{:02}-{:02}", self.year, self.month, self.day)
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn next_day(&self) -> Option<Self> {
        let next = self.to_naive()? + Duration::days(1);
        Some(Self::from(next))
    }
}

impl From<NaiveDate> for DateSelection {
    fn from(d: NaiveDate) -> Self {
        Self::new(d.year(), d.month(), d.day())
    }
}

impl FromStr for DateSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self::from)
            .map_err(|e| format!("invalid date {:?}: {}", s, e))
    }
}

impl fmt::Display for DateSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

/// Clock-change classification of a settlement day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayType {
    #[default]
    #[serde(rename = "N")]
    Normal,
    /// Clocks go back
    #[serde(rename = "L")]
    Long,
    /// Clocks go forward
    #[serde(rename = "S")]
    Short,
}

impl DayType {
    pub fn settlement_periods(self) -> u32 {
        match self {
            DayType::Normal => 48,
            DayType::Long => 50,
            DayType::Short => 46,
        }
    }
}

/// Tolerant decoding for backend numbers.
///
/// The backend serialises from pandas, so integers may arrive as `3.0` and
/// gaps as `null`. Integral fields still reject fractions and negatives.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    use super::Mix;
    use std::collections::BTreeMap;

    fn to_u32<E: Error>(v: f64) -> Result<u32, E> {
        if !v.is_finite() || v.fract() != 0.0 || v < 0.0 || v > f64::from(u32::MAX) {
            return Err(E::custom(format!("expected a non-negative whole number, got {}", v)));
        }
        Ok(v as u32)
    }

    /// Required whole number; `3` and `3.0` both decode.
    pub fn whole<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        to_u32(f64::deserialize(d)?)
    }

    /// Whole number where `null` counts as zero.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Option::<f64>::deserialize(d)?.map_or(Ok(0), to_u32)
    }

    /// `null` counts as zero.
    pub fn volume<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
    }

    /// Technologies with a `null` volume are dropped.
    pub fn mix<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Mix>, D::Error> {
        let raw = Option::<BTreeMap<String, Option<f64>>>::deserialize(d)?;
        Ok(raw.map(|m| m.into_iter().filter_map(|(k, v)| Some((k, v?))).collect()))
    }
}

/// Numeric fields shared by every record granularity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneMetrics {
    #[serde(default, deserialize_with = "lenient::count")]
    pub offers_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub bids_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub boas_count: u32,
    #[serde(default, deserialize_with = "lenient::volume")]
    pub net_volume: f64,
    #[serde(default, deserialize_with = "lenient::volume")]
    pub energy_volume: f64,
    #[serde(default, deserialize_with = "lenient::volume")]
    pub system_volume: f64,
    #[serde(default, deserialize_with = "lenient::volume")]
    pub balancing_cost: f64,
    #[serde(default, deserialize_with = "lenient::mix", skip_serializing_if = "Option::is_none")]
    pub generation_mix: Option<Mix>,
    #[serde(default, deserialize_with = "lenient::mix", skip_serializing_if = "Option::is_none")]
    pub consumption_mix: Option<Mix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    #[serde(deserialize_with = "lenient::whole")]
    pub settlement_period: u32,
    pub gsp_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<String>,
    #[serde(flatten)]
    pub metrics: ZoneMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    #[serde(deserialize_with = "lenient::whole")]
    pub hour: u32,
    pub gsp_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<String>,
    #[serde(flatten)]
    pub metrics: ZoneMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub gsp_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<String>,
    #[serde(flatten)]
    pub metrics: ZoneMetrics,
}

/// Common view over the three record granularities.
pub trait ZoneRecord {
    fn gsp_group_id(&self) -> &str;
    fn metrics(&self) -> &ZoneMetrics;
    /// Position on a time axis: settlement period, hour + 1, or 1 for a whole day
    fn plot_x(&self) -> u32;
}

impl ZoneRecord for PeriodRecord {
    fn gsp_group_id(&self) -> &str {
        &self.gsp_group_id
    }
    fn metrics(&self) -> &ZoneMetrics {
        &self.metrics
    }
    fn plot_x(&self) -> u32 {
        self.settlement_period
    }
}

impl ZoneRecord for HourRecord {
    fn gsp_group_id(&self) -> &str {
        &self.gsp_group_id
    }
    fn metrics(&self) -> &ZoneMetrics {
        &self.metrics
    }
    fn plot_x(&self) -> u32 {
        self.hour + 1
    }
}

impl ZoneRecord for DailyRecord {
    fn gsp_group_id(&self) -> &str {
        &self.gsp_group_id
    }
    fn metrics(&self) -> &ZoneMetrics {
        &self.metrics
    }
    fn plot_x(&self) -> u32 {
        1
    }
}

impl<R: ZoneRecord + ?Sized> ZoneRecord for &R {
    fn gsp_group_id(&self) -> &str {
        (**self).gsp_group_id()
    }
    fn metrics(&self) -> &ZoneMetrics {
        (**self).metrics()
    }
    fn plot_x(&self) -> u32 {
        (**self).plot_x()
    }
}

/// One business day of balancing data. Replaced wholesale on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyDataset {
    #[serde(default)]
    pub day_type: DayType,
    #[serde(default)]
    pub settlement_period: Vec<PeriodRecord>,
    #[serde(default)]
    pub hourly: Vec<HourRecord>,
    #[serde(default)]
    pub daily: Vec<DailyRecord>,
}

impl DailyDataset {
    /// `{day_type: N, settlement_period: [], hourly: [], daily: []}`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.settlement_period.is_empty() && self.hourly.is_empty() && self.daily.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.settlement_period.len() + self.hourly.len() + self.daily.len()
    }

    /// sha256 over the canonical JSON encoding, for audit log lines
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
