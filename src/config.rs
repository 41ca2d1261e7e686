use std::time::Duration;

use crate::aggregation::AggregationMode;
use crate::model::DateSelection;
use crate::playback::PlaybackSpeed;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub tick_ms: u64,
    pub initial_date: DateSelection,
    pub compare_date: DateSelection,
    pub split_view: bool,
    pub aggregation: AggregationMode,
    pub speed: PlaybackSpeed,
    pub max_ticks: u64,
    pub export_path: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let initial_date = env_parse("BALMAP_DATE").unwrap_or(DateSelection::new(2024, 1, 1));
        let compare_date = env_parse("BALMAP_COMPARE_DATE")
            .or_else(|| initial_date.next_day())
            .unwrap_or(initial_date);
        Self {
            api_base: std::env::var("BALMAP_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            request_timeout_secs: env_parse("BALMAP_TIMEOUT_SECS").unwrap_or(30),
            tick_ms: env_parse("BALMAP_TICK_MS").unwrap_or(500),
            initial_date,
            compare_date,
            split_view: std::env::var("BALMAP_SPLIT").map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(false),
            aggregation: env_parse("BALMAP_AGGREGATION").unwrap_or_default(),
            speed: env_parse::<u32>("BALMAP_SPEED").and_then(|v| PlaybackSpeed::try_from(v).ok()).unwrap_or_default(),
            max_ticks: env_parse("BALMAP_TICKS").unwrap_or(48),
            export_path: std::env::var("BALMAP_EXPORT_PATH").ok(),
        }
    }

    pub fn tick_base(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
