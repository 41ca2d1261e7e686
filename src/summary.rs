//! Read-only reductions over slices and record lists for info panels and plots.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::index::ZoneSlice;
use crate::model::{Mix, PeriodRecord, ZoneRecord};
use crate::zones::{Zone, GSP_ZONES};

/// Sums across every zone of one slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SliceTotals {
    pub accepted_offers: u64,
    pub accepted_bids: u64,
    pub total_actions: u64,
    pub net_imbalance_volume: f64,
    pub energy_action_volume: f64,
    pub system_action_volume: f64,
    pub balancing_cost: f64,
}

impl SliceTotals {
    pub fn from_slice(slice: &ZoneSlice<'_>) -> Self {
        slice.values().fold(Self::default(), |mut acc, rec| {
            let m = rec.metrics();
            acc.accepted_offers += u64::from(m.offers_count);
            acc.accepted_bids += u64::from(m.bids_count);
            acc.total_actions += u64::from(m.boas_count);
            acc.net_imbalance_volume += m.net_volume;
            acc.energy_action_volume += m.energy_volume;
            acc.system_action_volume += m.system_volume;
            acc.balancing_cost += m.balancing_cost;
            acc
        })
    }
}

/// Balancing cost accrued from the start of the day through `up_to` inclusive.
pub fn cumulative_cost(records: &[PeriodRecord], up_to: u32) -> f64 {
    records
        .iter()
        .filter(|r| r.settlement_period <= up_to)
        .map(|r| r.metrics.balancing_cost)
        .sum()
}

/// National technology mix for one slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnologyMix {
    /// Largest first
    pub generation: Vec<(String, f64)>,
    /// Largest magnitude first
    pub consumption: Vec<(String, f64)>,
    pub total_generation: f64,
    pub total_consumption: f64,
}

fn sum_mixes<'a>(mixes: impl Iterator<Item = &'a Mix>) -> Vec<(String, f64)> {
    let mut acc: BTreeMap<String, f64> = BTreeMap::new();
    for mix in mixes {
        for (tech, value) in mix {
            *acc.entry(tech.clone()).or_insert(0.0) += value;
        }
    }
    acc.into_iter().collect()
}

impl TechnologyMix {
    pub fn from_slice(slice: &ZoneSlice<'_>) -> Self {
        let mut generation = sum_mixes(slice.values().filter_map(|r| r.metrics().generation_mix.as_ref()));
        let mut consumption = sum_mixes(slice.values().filter_map(|r| r.metrics().consumption_mix.as_ref()));
        generation.sort_by(|a, b| b.1.total_cmp(&a.1));
        consumption.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        Self {
            total_generation: generation.iter().map(|(_, v)| v).sum(),
            total_consumption: consumption.iter().map(|(_, v)| v).sum(),
            generation,
            consumption,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty() && self.consumption.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    Generation,
    Consumption,
    #[default]
    Both,
}

impl PlotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotMode::Generation => "generation",
            PlotMode::Consumption => "consumption",
            PlotMode::Both => "both",
        }
    }
}

impl fmt::Display for PlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "generation" => Ok(PlotMode::Generation),
            "consumption" => Ok(PlotMode::Consumption),
            "both" => Ok(PlotMode::Both),
            other => Err(format!("unknown plot mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MixSide {
    Generation,
    Consumption,
}

/// One stacked trace of a technology-mix history plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixTrace {
    pub name: String,
    pub fuel: String,
    pub side: MixSide,
    pub points: Vec<(u32, f64)>,
}

/// Per-fuel series over `records`, generation traces first, each group
/// ordered by trace name.
///
/// Generation keeps strictly positive values, consumption strictly negative
/// ones. In consumption-only mode consumption is plotted as magnitudes.
pub fn mix_series<R: ZoneRecord>(records: &[R], mode: PlotMode) -> Vec<MixTrace> {
    let mut generation: BTreeMap<String, MixTrace> = BTreeMap::new();
    let mut consumption: BTreeMap<String, MixTrace> = BTreeMap::new();

    for rec in records {
        let x = rec.plot_x();
        let metrics = rec.metrics();
        if mode != PlotMode::Consumption {
            for (fuel, &value) in metrics.generation_mix.iter().flatten() {
                if value > 0.0 {
                    generation
                        .entry(fuel.clone())
                        .or_insert_with(|| MixTrace {
                            name: fuel.clone(),
                            fuel: fuel.clone(),
                            side: MixSide::Generation,
                            points: Vec::new(),
                        })
                        .points
                        .push((x, value));
                }
            }
        }
        if mode != PlotMode::Generation {
            for (fuel, &value) in metrics.consumption_mix.iter().flatten() {
                if value < 0.0 {
                    let (name, y) = match mode {
                        PlotMode::Consumption => (fuel.clone(), value.abs()),
                        _ => (format!("{} (Bid)", fuel), value),
                    };
                    consumption
                        .entry(name.clone())
                        .or_insert_with(|| MixTrace {
                            name,
                            fuel: fuel.clone(),
                            side: MixSide::Consumption,
                            points: Vec::new(),
                        })
                        .points
                        .push((x, y));
                }
            }
        }
    }

    generation.into_values().chain(consumption.into_values()).collect()
}

/// Regional volumes for one catalog zone; `None` when the zone has no record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericsRow {
    pub zone: &'static Zone,
    pub net_volume: Option<f64>,
    pub energy_volume: Option<f64>,
    pub system_volume: Option<f64>,
}

/// One row per catalog zone, in catalog order.
pub fn numerics_rows(slice: &ZoneSlice<'_>) -> Vec<NumericsRow> {
    GSP_ZONES
        .iter()
        .map(|zone| {
            let metrics = slice.get(zone.id).map(|r| r.metrics());
            NumericsRow {
                zone,
                net_volume: metrics.map(|m| m.net_volume),
                energy_volume: metrics.map(|m| m.energy_volume),
                system_volume: metrics.map(|m| m.system_volume),
            }
        })
        .collect()
}
