use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::DateSelection;

/// One time-series row keyed by variable name.
pub type SeriesRow = Map<String, Value>;

/// zone id -> summed net volume (legacy imbalance endpoint)
pub type ImbalanceMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableVariables {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub numeric: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesQuery {
    pub start: DateSelection,
    pub end: DateSelection,
    pub variables: Vec<String>,
}

impl TimeSeriesQuery {
    pub fn params(&self) -> [(&'static str, String); 3] {
        [
            ("start_date", self.start.iso()),
            ("end_date", self.end.iso()),
            ("variables", self.variables.join(",")),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImbalanceRequest {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(rename = "settlementPeriod")]
    pub settlement_period: u32,
}

impl ImbalanceRequest {
    pub fn new(date: DateSelection, settlement_period: u32) -> Self {
        Self {
            year: date.year,
            month: date.month,
            day: date.day,
            settlement_period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VwapRequest {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(rename = "settlementPeriod")]
    pub settlement_period: u32,
    #[serde(rename = "gspId")]
    pub gsp_id: String,
}

impl VwapRequest {
    pub fn new(date: DateSelection, settlement_period: u32, gsp_id: &str) -> Self {
        Self {
            year: date.year,
            month: date.month,
            day: date.day,
            settlement_period,
            gsp_id: gsp_id.to_string(),
        }
    }
}

/// Running VWAP within one settlement period for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapSeries {
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default)]
    pub vwap: Vec<f64>,
    pub gsp_id: String,
    pub date: String,
    pub settlement_period: u32,
}

impl VwapSeries {
    /// No acceptances in the period: a valid, empty result.
    pub fn empty(req: &VwapRequest) -> Self {
        Self {
            times: Vec::new(),
            vwap: Vec::new(),
            gsp_id: req.gsp_id.clone(),
            date: format!("{}-{:02}-{:02}", req.year, req.month, req.day),
            settlement_period: req.settlement_period,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Bid,
    #[default]
    Offer,
    Both,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Bid => "bid",
            AssetType::Offer => "offer",
            AssetType::Both => "both",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bid" => Ok(AssetType::Bid),
            "offer" => Ok(AssetType::Offer),
            "both" => Ok(AssetType::Both),
            other => Err(format!("unknown asset type: {}", other)),
        }
    }
}

/// Hypothetical asset submitted to the regional benchmark simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkParams {
    pub start: DateSelection,
    pub end: DateSelection,
    pub asset_type: AssetType,
    pub capacity_mw: f64,
    pub price_bid: Option<f64>,
    pub price_offer: Option<f64>,
}

impl BenchmarkParams {
    /// Absent prices are sent as empty strings.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let price = |p: Option<f64>| p.map(|v| v.to_string()).unwrap_or_default();
        vec![
            ("start_date", self.start.iso()),
            ("end_date", self.end.iso()),
            ("asset_type", self.asset_type.to_string()),
            ("capacity_mw", self.capacity_mw.to_string()),
            ("price_bid", price(self.price_bid)),
            ("price_offer", price(self.price_offer)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub gsp_group_id: String,
    #[serde(default)]
    pub accepted_volume_mwh: f64,
    #[serde(default)]
    pub skipped_volume_mwh: f64,
    #[serde(default)]
    pub skip_rate_percent: f64,
    #[serde(default)]
    pub estimated_revenue: f64,
}

/// Highest estimated revenue first.
pub fn rank_by_revenue(mut results: Vec<BenchmarkResult>) -> Vec<BenchmarkResult> {
    results.sort_by(|a, b| b.estimated_revenue.total_cmp(&a.estimated_revenue));
    results
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub data_loaded: bool,
    #[serde(default)]
    pub vwap_data_loaded: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
