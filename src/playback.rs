//! Playback clock driving the time pointer.
//!
//! The clock owns at most one timer task. Every reconfiguration aborts the
//! running task and bumps a generation counter; ticks carry the generation
//! that produced them, so a tick already queued by an aborted timer is
//! recognised as stale and dropped by the owner.
//!
//! At most one tick per timer is in flight: the task skips firings until the
//! owner has consumed the previous tick, so an owner that stops draining
//! never accumulates a backlog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::aggregation::SliderConfig;
use crate::logging::{log, obj, v_num, Domain, Level};

/// Tick period at 1x speed.
pub const BASE_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X4,
}

impl PlaybackSpeed {
    pub fn factor(self) -> u32 {
        match self {
            PlaybackSpeed::X1 => 1,
            PlaybackSpeed::X2 => 2,
            PlaybackSpeed::X4 => 4,
        }
    }
}

impl TryFrom<u32> for PlaybackSpeed {
    type Error = String;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(PlaybackSpeed::X1),
            2 => Ok(PlaybackSpeed::X2),
            4 => Ok(PlaybackSpeed::X4),
            other => Err(format!("unsupported playback speed: {}x", other)),
        }
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub speed: PlaybackSpeed,
}

/// One timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Next pointer value: wraps to `min` once `max` is reached.
pub fn advance(pointer: u32, slider: &SliderConfig) -> u32 {
    if pointer >= slider.max {
        slider.min
    } else {
        pointer + 1
    }
}

pub fn tick_interval(base: Duration, speed: PlaybackSpeed) -> Duration {
    base / speed.factor()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClockConfig {
    interval: Duration,
    slider: SliderConfig,
}

#[derive(Debug)]
struct RunningTimer {
    config: ClockConfig,
    handle: JoinHandle<()>,
    /// Set by the task when it sends a tick, cleared by `consume`.
    pending: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct PlaybackClock {
    base: Duration,
    generation: u64,
    running: Option<RunningTimer>,
}

impl PlaybackClock {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            generation: 0,
            running: None,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.running.as_ref().map(|r| r.config.interval)
    }

    /// True when `tick` came from the timer that is currently running.
    pub fn accepts(&self, tick: Tick) -> bool {
        self.running.is_some() && tick.generation == self.generation
    }

    /// Like `accepts`, and on success lets the timer deliver its next tick.
    pub fn consume(&self, tick: Tick) -> bool {
        match &self.running {
            Some(running) if tick.generation == self.generation => {
                running.pending.store(false, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    /// Bring the timer in line with `state` and `slider`.
    ///
    /// Leaves a matching timer alone; otherwise tears it down and, if playback
    /// should run, starts a new one feeding `sink`. `sink` returns false once
    /// its receiver is gone, which ends the task. Returns true when a new
    /// timer was started. Must be called inside a tokio runtime.
    pub fn sync<S>(&mut self, state: &PlaybackState, slider: &SliderConfig, sink: S) -> bool
    where
        S: Fn(Tick) -> bool + Send + 'static,
    {
        let desired = (state.is_playing && !slider.disabled).then(|| ClockConfig {
            interval: tick_interval(self.base, state.speed),
            slider: *slider,
        });

        if let (Some(running), Some(want)) = (&self.running, &desired) {
            if running.config == *want {
                return false;
            }
        }
        self.stop();

        let Some(config) = desired else {
            return false;
        };
        self.generation += 1;
        let generation = self.generation;
        let period = config.interval;
        let pending = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::clone(&pending);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if in_flight.swap(true, Ordering::AcqRel) {
                    continue;
                }
                if !sink(Tick { generation }) {
                    break;
                }
            }
        });
        log(
            Level::Debug,
            Domain::Playback,
            "clock_start",
            obj(&[
                ("generation", v_num(generation as f64)),
                ("interval_ms", v_num(period.as_millis() as f64)),
                ("max", v_num(slider.max as f64)),
            ]),
        );
        self.running = Some(RunningTimer { config, handle, pending });
        true
    }

    /// Abort the running timer, if any. Queued ticks become stale.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
            self.generation += 1;
            log(
                Level::Debug,
                Domain::Playback,
                "clock_stop",
                obj(&[("generation", v_num(self.generation as f64))]),
            );
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(BASE_TICK)
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}
