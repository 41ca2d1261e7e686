//! Reactive core of one map view.
//!
//! ```text
//!  on_date_change ──► request_fetch ──► [task] source.fetch_daily_data ─┐
//!                                                                       │ ViewEvent::Loaded{seq}
//!  PlaybackClock ──────────────────────────────────► ViewEvent::Tick ───┤
//!                                                                       ▼
//!                                      next_event().await ──► handle(event)
//! ```
//!
//! All state lives in the controller and is only written from `&mut self`
//! methods, so the owner drives it from a single task. Background work (the
//! fetch and the clock timer) communicates only through the event channel.
//!
//! Derived state is recomputed on write: replacing the dataset rebuilds the
//! index and slider bounds in the same call, and the playback timer is
//! re-synchronised after every transition that can affect it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::aggregation::{slider_config, AggregationMode, SliderConfig};
use crate::api::DailyDataSource;
use crate::error::FetchError;
use crate::index::{select_slice, SliceRecord, TimeSliceIndex, ZoneSlice};
use crate::logging::{
    log, log_dataset_applied, log_fetch_failed, log_fetch_issued, log_stale_response, obj,
    v_num, v_str, Domain, Level, ProfileScope,
};
use crate::model::{DailyDataset, DateField, DateSelection, DayType, PeriodRecord};
use crate::playback::{advance, PlaybackClock, PlaybackSpeed, PlaybackState, Tick, BASE_TICK};
use crate::zones::{self, Zone};

/// Banner text shown alongside the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub error: bool,
}

impl Status {
    pub fn ready() -> Self {
        Self { message: "Ready".to_string(), error: false }
    }

    fn fetching() -> Self {
        Self { message: "Fetching daily data...".to_string(), error: false }
    }

    fn cleared() -> Self {
        Self { message: String::new(), error: false }
    }

    fn failed(err: &FetchError) -> Self {
        Self {
            message: format!("Error fetching daily data: {}", err),
            error: true,
        }
    }
}

#[derive(Debug)]
pub enum ViewEvent {
    Tick(Tick),
    Loaded {
        seq: u64,
        date: DateSelection,
        result: Result<DailyDataset, FetchError>,
    },
}

pub struct ViewController {
    name: String,
    source: Arc<dyn DailyDataSource>,
    date: DateSelection,
    aggregation: AggregationMode,
    time_point: u32,
    dataset: DailyDataset,
    index: TimeSliceIndex,
    slider: SliderConfig,
    playback: PlaybackState,
    clock: PlaybackClock,
    status: Status,
    loading: bool,
    fetch_seq: u64,
    selected_region: Option<&'static Zone>,
    show_numerics: bool,
    show_tech_mix: bool,
    events_tx: UnboundedSender<ViewEvent>,
    events_rx: UnboundedReceiver<ViewEvent>,
}

impl ViewController {
    /// Idle controller for `date`. Nothing is fetched until `refresh`.
    pub fn new(name: impl Into<String>, source: Arc<dyn DailyDataSource>, date: DateSelection) -> Self {
        let dataset = DailyDataset::empty();
        let aggregation = AggregationMode::default();
        let slider = slider_config(aggregation, dataset.day_type);
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            name: name.into(),
            source,
            date,
            aggregation,
            time_point: slider.min,
            dataset,
            index: TimeSliceIndex::default(),
            slider,
            playback: PlaybackState::default(),
            clock: PlaybackClock::new(BASE_TICK),
            status: Status::ready(),
            loading: false,
            fetch_seq: 0,
            selected_region: None,
            show_numerics: false,
            show_tech_mix: false,
            events_tx,
            events_rx,
        }
    }

    /// Replace the 1x tick period. A running timer is restarted at the new rate.
    pub fn with_tick_base(mut self, base: Duration) -> Self {
        self.clock.stop();
        self.clock = PlaybackClock::new(base);
        self.sync_clock();
        self
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> DateSelection {
        self.date
    }

    pub fn aggregation(&self) -> AggregationMode {
        self.aggregation
    }

    pub fn time_point(&self) -> u32 {
        self.time_point
    }

    pub fn dataset(&self) -> &DailyDataset {
        &self.dataset
    }

    pub fn index(&self) -> &TimeSliceIndex {
        &self.index
    }

    pub fn slider(&self) -> SliderConfig {
        self.slider
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selected_region(&self) -> Option<&'static Zone> {
        self.selected_region
    }

    /// Regional volumes panel visibility.
    pub fn show_numerics(&self) -> bool {
        self.show_numerics
    }

    /// Technology mix panel visibility.
    pub fn show_tech_mix(&self) -> bool {
        self.show_tech_mix
    }

    // ---------------------------------------------------------------------
    // Derived views
    // ---------------------------------------------------------------------

    /// Zone map at the current pointer under the active aggregation.
    pub fn current_slice(&self) -> ZoneSlice<'_> {
        select_slice(&self.index, &self.dataset.daily, self.aggregation, self.time_point)
    }

    /// Settlement-period records of one zone, in dataset order.
    pub fn region_history(&self, zone_id: &str) -> Vec<&PeriodRecord> {
        self.dataset
            .settlement_period
            .iter()
            .filter(|r| r.gsp_group_id == zone_id)
            .collect()
    }

    /// Every record at the active granularity, for technology-mix history plots.
    pub fn mix_history(&self) -> Vec<SliceRecord<'_>> {
        match self.aggregation {
            AggregationMode::ThirtyMinute => self
                .dataset
                .settlement_period
                .iter()
                .map(SliceRecord::Period)
                .collect(),
            AggregationMode::Hourly => self.dataset.hourly.iter().map(SliceRecord::Hour).collect(),
            AggregationMode::Daily => self.dataset.daily.iter().map(SliceRecord::Day).collect(),
        }
    }

    // ---------------------------------------------------------------------
    // User actions
    // ---------------------------------------------------------------------

    /// Fetch the dataset for the current date.
    pub fn refresh(&mut self) {
        self.request_fetch();
    }

    pub fn on_date_change(&mut self, field: DateField, value: i32) {
        self.date = self.date.with_field(field, value);
        self.playback.is_playing = false;
        self.time_point = self.slider.min;
        log(
            Level::Info,
            Domain::View,
            "date_change",
            obj(&[("view", v_str(&self.name)), ("date", v_str(&self.date.iso()))]),
        );
        self.sync_clock();
        self.request_fetch();
    }

    pub fn on_aggregation_change(&mut self, mode: AggregationMode) {
        self.aggregation = mode;
        self.playback.is_playing = false;
        self.slider = slider_config(mode, self.dataset.day_type);
        self.time_point = self.slider.min;
        log(
            Level::Info,
            Domain::View,
            "aggregation_change",
            obj(&[
                ("view", v_str(&self.name)),
                ("aggregation", v_str(mode.as_str())),
                ("max", v_num(self.slider.max as f64)),
            ]),
        );
        self.sync_clock();
    }

    /// Manual scrub. Always stops playback; out-of-range values are clamped.
    pub fn on_time_point_change(&mut self, value: u32) {
        self.time_point = self.slider.clamp(value);
        self.playback.is_playing = false;
        self.sync_clock();
    }

    /// Request playback. The clock stays idle while the slider is disabled.
    pub fn play(&mut self) {
        self.playback.is_playing = true;
        self.sync_clock();
    }

    pub fn pause(&mut self) {
        self.playback.is_playing = false;
        self.sync_clock();
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.playback.speed = speed;
        self.sync_clock();
    }

    /// Open the detail panel for a catalog zone. Unknown ids are ignored.
    pub fn select_region(&mut self, zone_id: &str) -> bool {
        match zones::find(zone_id) {
            Some(zone) => {
                self.selected_region = Some(zone);
                true
            }
            None => false,
        }
    }

    pub fn clear_region(&mut self) {
        self.selected_region = None;
    }

    pub fn set_show_numerics(&mut self, visible: bool) {
        self.show_numerics = visible;
    }

    pub fn toggle_tech_mix(&mut self) -> bool {
        self.show_tech_mix = !self.show_tech_mix;
        self.show_tech_mix
    }

    // ---------------------------------------------------------------------
    // Event loop
    // ---------------------------------------------------------------------

    /// Wait for the next background event. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        self.events_rx.recv().await
    }

    /// Apply one event. Returns true if visible state changed.
    pub fn handle(&mut self, event: ViewEvent) -> bool {
        match event {
            ViewEvent::Tick(tick) => {
                if !self.clock.consume(tick) {
                    return false;
                }
                self.time_point = advance(self.time_point, &self.slider);
                log(
                    Level::Trace,
                    Domain::Playback,
                    "tick",
                    obj(&[("view", v_str(&self.name)), ("time_point", v_num(self.time_point as f64))]),
                );
                true
            }
            ViewEvent::Loaded { seq, date, result } => self.apply_loaded(seq, date, result),
        }
    }

    /// Drain events until the in-flight fetch (if any) has been applied.
    pub async fn wait_loaded(&mut self) {
        while self.loading {
            match self.next_event().await {
                Some(event) => {
                    self.handle(event);
                }
                None => break,
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn request_fetch(&mut self) {
        self.fetch_seq += 1;
        self.loading = true;
        self.status = Status::fetching();

        let seq = self.fetch_seq;
        let date = self.date;
        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        log_fetch_issued(&self.name, seq, &date.iso());
        tokio::spawn(async move {
            let result = source.fetch_daily_data(date).await;
            let _ = tx.send(ViewEvent::Loaded { seq, date, result });
        });
    }

    fn apply_loaded(&mut self, seq: u64, date: DateSelection, result: Result<DailyDataset, FetchError>) -> bool {
        // last request wins: a slow response for a superseded date is dropped
        if seq != self.fetch_seq {
            log_stale_response(&self.name, seq, self.fetch_seq);
            return false;
        }
        self.loading = false;
        match result {
            Ok(dataset) => {
                log_dataset_applied(
                    &self.name,
                    &date.iso(),
                    day_type_code(&dataset),
                    dataset.record_count(),
                    &dataset.fingerprint(),
                );
                self.replace_dataset(dataset);
                self.status = Status::cleared();
            }
            Err(err) => {
                log_fetch_failed(&self.name, &date.iso(), &err.to_string());
                self.replace_dataset(DailyDataset::empty());
                self.status = Status::failed(&err);
            }
        }
        true
    }

    fn replace_dataset(&mut self, dataset: DailyDataset) {
        {
            let _scope = ProfileScope::with_context(
                "index_build",
                &[("records", v_num(dataset.record_count() as f64))],
            );
            self.index = TimeSliceIndex::build(&dataset);
        }
        log(
            Level::Debug,
            Domain::Index,
            "index_rebuilt",
            obj(&[
                ("view", v_str(&self.name)),
                ("periods", v_num(self.index.by_settlement_period().len() as f64)),
                ("hours", v_num(self.index.by_hour().len() as f64)),
            ]),
        );
        self.dataset = dataset;
        self.slider = slider_config(self.aggregation, self.dataset.day_type);
        self.time_point = self.slider.clamp(self.time_point);
        self.sync_clock();
    }

    fn sync_clock(&mut self) {
        let tx = self.events_tx.clone();
        self.clock
            .sync(&self.playback, &self.slider, move |tick| tx.send(ViewEvent::Tick(tick)).is_ok());
    }
}

fn day_type_code(dataset: &DailyDataset) -> &'static str {
    match dataset.day_type {
        DayType::Normal => "N",
        DayType::Long => "L",
        DayType::Short => "S",
    }
}
