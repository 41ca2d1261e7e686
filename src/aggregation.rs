//! Temporal aggregation modes and the slider bounds each one allows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::DayType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationMode {
    #[default]
    #[serde(rename = "30min")]
    ThirtyMinute,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::ThirtyMinute => "30min",
            AggregationMode::Hourly => "hourly",
            AggregationMode::Daily => "daily",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "30min" => Ok(AggregationMode::ThirtyMinute),
            "hourly" => Ok(AggregationMode::Hourly),
            "daily" => Ok(AggregationMode::Daily),
            other => Err(format!("unknown aggregation mode: {}", other)),
        }
    }
}

/// Valid time-pointer range for the active aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliderConfig {
    pub label: &'static str,
    pub min: u32,
    pub max: u32,
    pub disabled: bool,
}

impl SliderConfig {
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }

    pub fn steps(&self) -> u32 {
        self.max - self.min + 1
    }
}

/// Sole authority for pointer bounds and playback looping.
pub fn slider_config(mode: AggregationMode, day_type: DayType) -> SliderConfig {
    match mode {
        AggregationMode::Hourly => SliderConfig {
            label: "Hour",
            min: 0,
            max: 23,
            disabled: false,
        },
        // One aggregate value per zone for the whole day
        AggregationMode::Daily => SliderConfig {
            label: "Time Point",
            min: 1,
            max: 1,
            disabled: true,
        },
        AggregationMode::ThirtyMinute => SliderConfig {
            label: "Settlement Period",
            min: 1,
            max: day_type.settlement_periods(),
            disabled: false,
        },
    }
}
