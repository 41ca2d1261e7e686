//! Split-screen comparison of two business days.
//!
//! Both controllers stay alive while the split is hidden, so toggling it off
//! and on keeps each side's date, pointer, aggregation and playback intact.
//! The one exception is the numerics panel, which has no room in split view
//! and is hidden on both sides when the split opens.

use std::sync::Arc;
use std::time::Duration;

use crate::api::DailyDataSource;
use crate::controller::{ViewController, ViewEvent};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::DateSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewSide {
    Primary,
    Secondary,
}

impl ViewSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewSide::Primary => "primary",
            ViewSide::Secondary => "secondary",
        }
    }
}

pub struct DualViewCoordinator {
    primary: ViewController,
    secondary: ViewController,
    split_active: bool,
}

impl DualViewCoordinator {
    pub fn new(primary: ViewController, secondary: ViewController) -> Self {
        Self {
            primary,
            secondary,
            split_active: false,
        }
    }

    /// Two controllers over one shared source. Starts with the split hidden.
    pub fn from_source(
        source: Arc<dyn DailyDataSource>,
        left: DateSelection,
        right: DateSelection,
        tick_base: Duration,
    ) -> Self {
        let primary = ViewController::new(ViewSide::Primary.as_str(), Arc::clone(&source), left)
            .with_tick_base(tick_base);
        let secondary = ViewController::new(ViewSide::Secondary.as_str(), source, right)
            .with_tick_base(tick_base);
        Self::new(primary, secondary)
    }

    pub fn toggle_split(&mut self) -> bool {
        self.set_split(!self.split_active);
        self.split_active
    }

    pub fn set_split(&mut self, active: bool) {
        if self.split_active != active {
            log(
                Level::Info,
                Domain::View,
                "split_toggle",
                obj(&[("split", v_str(if active { "on" } else { "off" }))]),
            );
        }
        self.split_active = active;
        if active {
            self.primary.set_show_numerics(false);
            self.secondary.set_show_numerics(false);
        }
    }

    /// Flip the numerics panel of one side. Unavailable while split.
    pub fn toggle_numerics(&mut self, side: ViewSide) -> bool {
        if self.split_active {
            return false;
        }
        let view = self.view_mut(side);
        let visible = !view.show_numerics();
        view.set_show_numerics(visible);
        visible
    }

    pub fn is_split(&self) -> bool {
        self.split_active
    }

    pub fn primary(&self) -> &ViewController {
        &self.primary
    }

    pub fn secondary(&self) -> &ViewController {
        &self.secondary
    }

    pub fn view(&self, side: ViewSide) -> &ViewController {
        match side {
            ViewSide::Primary => &self.primary,
            ViewSide::Secondary => &self.secondary,
        }
    }

    pub fn view_mut(&mut self, side: ViewSide) -> &mut ViewController {
        match side {
            ViewSide::Primary => &mut self.primary,
            ViewSide::Secondary => &mut self.secondary,
        }
    }

    /// Controllers currently on screen, left to right.
    pub fn visible(&self) -> Vec<(ViewSide, &ViewController)> {
        let mut out = vec![(ViewSide::Primary, &self.primary)];
        if self.split_active {
            out.push((ViewSide::Secondary, &self.secondary));
        }
        out
    }

    /// Fetch both days. The hidden side is kept warm so showing it is instant.
    pub fn refresh_all(&mut self) {
        self.primary.refresh();
        self.secondary.refresh();
    }

    /// Next event from either side, tagged with its origin.
    pub async fn next_event(&mut self) -> Option<(ViewSide, ViewEvent)> {
        tokio::select! {
            Some(ev) = self.primary.next_event() => Some((ViewSide::Primary, ev)),
            Some(ev) = self.secondary.next_event() => Some((ViewSide::Secondary, ev)),
            else => None,
        }
    }

    pub fn handle(&mut self, side: ViewSide, event: ViewEvent) -> bool {
        self.view_mut(side).handle(event)
    }

    /// Drain events until neither side has a fetch in flight.
    pub async fn wait_loaded(&mut self) {
        while self.primary.is_loading() || self.secondary.is_loading() {
            match self.next_event().await {
                Some((side, event)) => {
                    self.handle(side, event);
                }
                None => break,
            }
        }
    }
}
