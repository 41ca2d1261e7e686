use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DailyDataset, DateSelection};

mod client;
pub mod types;

pub use client::ApiClient;

/// Anything able to resolve a date to its daily dataset.
///
/// The controller calls this once per distinct date selection and never
/// retries on failure.
#[async_trait]
pub trait DailyDataSource: Send + Sync {
    async fn fetch_daily_data(&self, date: DateSelection) -> Result<DailyDataset>;
}
