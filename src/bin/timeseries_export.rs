//! Fetch a time series and write it as CSV.
//!
//! usage: timeseries_export START END [VAR,VAR,...] [OUT]
//! Dates are YYYY-MM-DD. Without variables every available column is exported.

use anyhow::{bail, Context, Result};
use balmap::api::types::TimeSeriesQuery;
use balmap::api::ApiClient;
use balmap::config::Config;
use balmap::export::write_csv;
use balmap::model::DateSelection;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: timeseries_export START END [VAR,VAR,...] [OUT]");
    }
    let start: DateSelection = args[0].parse().map_err(anyhow::Error::msg)?;
    let end: DateSelection = args[1].parse().map_err(anyhow::Error::msg)?;
    if end.to_naive() < start.to_naive() {
        bail!("end date {} is before start date {}", end, start);
    }

    let client = ApiClient::from_config(&cfg)?;
    let mut variables: Vec<String> = args
        .get(2)
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    if variables.is_empty() {
        let available = client
            .available_variables()
            .await
            .context("listing available variables")?;
        variables = available.time.into_iter().chain(available.numeric).collect();
    }

    let out = args
        .get(3)
        .cloned()
        .or_else(|| cfg.export_path.clone())
        .unwrap_or_else(|| format!("timeseries_{}_{}.csv", start, end));

    let query = TimeSeriesQuery { start, end, variables };
    let rows = client.time_series(&query).await.context("fetching time series")?;
    write_csv(&rows, &out).with_context(|| format!("writing {}", out))?;
    println!("wrote {} rows to {}", rows.len(), out);
    Ok(())
}
