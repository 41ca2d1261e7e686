use std::sync::Arc;

use anyhow::Result;
use balmap::api::{ApiClient, DailyDataSource};
use balmap::config::Config;
use balmap::controller::{ViewController, ViewEvent};
use balmap::coordinator::{DualViewCoordinator, ViewSide};
use balmap::logging::{log, obj, v_num, v_str, Domain, Level};
use balmap::summary::{cumulative_cost, SliceTotals, TechnologyMix};

fn log_slice(side: ViewSide, view: &ViewController) {
    let slice = view.current_slice();
    let totals = SliceTotals::from_slice(&slice);
    let mix = TechnologyMix::from_slice(&slice);
    log(
        Level::Info,
        Domain::View,
        "slice",
        obj(&[
            ("view", v_str(side.as_str())),
            ("date", v_str(&view.date().iso())),
            ("aggregation", v_str(view.aggregation().as_str())),
            ("time_point", v_num(view.time_point() as f64)),
            ("zones", v_num(slice.len() as f64)),
            ("offers", v_num(totals.accepted_offers as f64)),
            ("bids", v_num(totals.accepted_bids as f64)),
            ("net_volume", v_num(totals.net_imbalance_volume)),
            ("balancing_cost", v_num(totals.balancing_cost)),
            (
                "cumulative_cost",
                v_num(cumulative_cost(&view.dataset().settlement_period, view.time_point())),
            ),
            ("generation", v_num(mix.total_generation)),
            ("consumption", v_num(mix.total_consumption)),
        ]),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let client = ApiClient::from_config(&cfg)?;
    log(
        Level::Info,
        Domain::System,
        "session_start",
        obj(&[
            ("api_base", v_str(client.base().as_str())),
            ("date", v_str(&cfg.initial_date.iso())),
            ("compare_date", v_str(&cfg.compare_date.iso())),
            ("split", v_str(if cfg.split_view { "on" } else { "off" })),
            ("speed", v_str(&cfg.speed.to_string())),
            ("max_ticks", v_num(cfg.max_ticks as f64)),
        ]),
    );

    match client.health().await {
        Ok(h) => log(
            Level::Info,
            Domain::Fetch,
            "health",
            obj(&[
                ("status", v_str(&h.status)),
                ("data_loaded", v_str(&h.data_loaded.to_string())),
                ("vwap_data_loaded", v_str(&h.vwap_data_loaded.to_string())),
            ]),
        ),
        Err(e) => log(
            Level::Warn,
            Domain::Fetch,
            "health_failed",
            obj(&[("msg", v_str(&e.to_string()))]),
        ),
    }

    let source: Arc<dyn DailyDataSource> = Arc::new(client);
    let mut views = DualViewCoordinator::from_source(source, cfg.initial_date, cfg.compare_date, cfg.tick_base());
    views.set_split(cfg.split_view);
    for side in [ViewSide::Primary, ViewSide::Secondary] {
        views.view_mut(side).on_aggregation_change(cfg.aggregation);
    }
    views.refresh_all();
    views.wait_loaded().await;

    let visible: Vec<ViewSide> = views.visible().into_iter().map(|(side, _)| side).collect();
    for &side in &visible {
        let view = views.view(side);
        let status = view.status();
        log(
            if status.error { Level::Error } else { Level::Info },
            Domain::View,
            "loaded",
            obj(&[
                ("view", v_str(side.as_str())),
                ("msg", v_str(&status.message)),
                ("records", v_num(view.dataset().record_count() as f64)),
            ]),
        );
        log_slice(side, view);
    }

    for &side in &visible {
        let view = views.view_mut(side);
        view.set_speed(cfg.speed);
        view.play();
    }
    if visible.iter().all(|&side| !views.view(side).is_clock_running()) {
        log(
            Level::Info,
            Domain::Playback,
            "playback_idle",
            obj(&[("msg", v_str("slider disabled, nothing to play"))]),
        );
        return Ok(());
    }

    let mut ticks = 0u64;
    while ticks < cfg.max_ticks {
        let Some((side, event)) = views.next_event().await else {
            break;
        };
        let is_tick = matches!(event, ViewEvent::Tick(_));
        if views.handle(side, event) && is_tick {
            if side == ViewSide::Primary {
                ticks += 1;
            }
            log_slice(side, views.view(side));
        }
    }

    for &side in &visible {
        views.view_mut(side).pause();
    }
    log(
        Level::Info,
        Domain::System,
        "session_end",
        obj(&[("ticks", v_num(ticks as f64))]),
    );
    Ok(())
}
