//! Rank GSP groups by simulated revenue for a hypothetical asset.
//!
//! usage: asset_benchmark START END [offer|bid|both] [CAPACITY_MW]
//! Prices come from BENCH_PRICE_BID / BENCH_PRICE_OFFER when set.

use anyhow::{bail, Context, Result};
use balmap::api::types::{rank_by_revenue, AssetType, BenchmarkParams};
use balmap::api::ApiClient;
use balmap::config::Config;
use balmap::model::DateSelection;
use balmap::zones;
use std::env;

fn env_price(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: asset_benchmark START END [offer|bid|both] [CAPACITY_MW]");
    }
    let start: DateSelection = args[0].parse().map_err(anyhow::Error::msg)?;
    let end: DateSelection = args[1].parse().map_err(anyhow::Error::msg)?;
    let asset_type: AssetType = match args.get(2) {
        Some(s) => s.parse().map_err(anyhow::Error::msg)?,
        None => AssetType::default(),
    };
    let capacity_mw: f64 = match args.get(3) {
        Some(s) => s.parse().with_context(|| format!("invalid capacity {:?}", s))?,
        None => 50.0,
    };
    if capacity_mw <= 0.0 {
        bail!("capacity must be positive, got {}", capacity_mw);
    }

    let params = BenchmarkParams {
        start,
        end,
        asset_type,
        capacity_mw,
        price_bid: env_price("BENCH_PRICE_BID"),
        price_offer: env_price("BENCH_PRICE_OFFER"),
    };
    let client = ApiClient::from_config(&cfg)?;
    let results = client
        .asset_benchmark(&params)
        .await
        .context("running asset benchmark")?;

    println!(
        "{:<4} {:<28} {:>14} {:>14} {:>8} {:>14}",
        "rank", "region", "accepted_mwh", "skipped_mwh", "skip_%", "revenue"
    );
    for (i, r) in rank_by_revenue(results).iter().enumerate() {
        println!(
            "{:<4} {:<28} {:>14.2} {:>14.2} {:>8.1} {:>14.2}",
            i + 1,
            zones::name_of(&r.gsp_group_id),
            r.accepted_volume_mwh,
            r.skipped_volume_mwh,
            r.skip_rate_percent,
            r.estimated_revenue
        );
    }
    Ok(())
}
