//! Shared fixtures: an in-memory daily-data source and record builders.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use balmap::api::DailyDataSource;
use balmap::error::{FetchError, Result};
use balmap::model::{DailyDataset, DateSelection, DayType, HourRecord, PeriodRecord, ZoneMetrics};

pub const DAY_ONE: DateSelection = DateSelection { year: 2021, month: 3, day: 14 };
pub const DAY_TWO: DateSelection = DateSelection { year: 2021, month: 3, day: 15 };

/// Canned datasets per date. Unknown dates fail with a network error.
#[derive(Default)]
pub struct MemorySource {
    days: HashMap<DateSelection, DailyDataset>,
    delays: HashMap<DateSelection, Duration>,
    failures: HashMap<DateSelection, (u16, String)>,
    pub calls: Mutex<Vec<DateSelection>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, date: DateSelection, dataset: DailyDataset) -> Self {
        self.days.insert(date, dataset);
        self
    }

    pub fn with_delay(mut self, date: DateSelection, delay: Duration) -> Self {
        self.delays.insert(date, delay);
        self
    }

    /// Answer `date` with a non-2xx status carrying the backend's message.
    pub fn with_failure(mut self, date: DateSelection, status: u16, message: &str) -> Self {
        self.failures.insert(date, (status, message.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DailyDataSource for MemorySource {
    async fn fetch_daily_data(&self, date: DateSelection) -> Result<DailyDataset> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(date);
        }
        if let Some(delay) = self.delays.get(&date) {
            tokio::time::sleep(*delay).await;
        }
        if let Some((status, message)) = self.failures.get(&date) {
            return Err(FetchError::Server {
                status: *status,
                message: message.clone(),
            });
        }
        self.days.get(&date).cloned().ok_or_else(|| FetchError::Network {
            message: "connection refused".to_string(),
        })
    }
}

pub fn metrics(net_volume: f64) -> ZoneMetrics {
    ZoneMetrics {
        net_volume,
        ..Default::default()
    }
}

pub fn period(settlement_period: u32, zone: &str, net_volume: f64) -> PeriodRecord {
    PeriodRecord {
        settlement_period,
        gsp_group_id: zone.to_string(),
        settlement_date: None,
        metrics: metrics(net_volume),
    }
}

pub fn hour(hour: u32, zone: &str, net_volume: f64) -> HourRecord {
    HourRecord {
        hour,
        gsp_group_id: zone.to_string(),
        settlement_date: None,
        metrics: metrics(net_volume),
    }
}

pub fn dataset(day_type: DayType, periods: Vec<PeriodRecord>) -> DailyDataset {
    DailyDataset {
        day_type,
        settlement_period: periods,
        ..Default::default()
    }
}
