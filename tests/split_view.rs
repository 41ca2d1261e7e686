//! Two controllers side by side.

mod common;

use std::sync::Arc;
use std::time::Duration;

use balmap::aggregation::AggregationMode;
use balmap::coordinator::{DualViewCoordinator, ViewSide};
use balmap::model::{DateField, DayType};
use common::*;

fn two_days() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_day(DAY_ONE, dataset(DayType::Short, vec![period(1, "_A", 1.0)]))
            .with_day(DAY_TWO, dataset(DayType::Normal, vec![period(1, "_B", 2.0)])),
    )
}

#[tokio::test]
async fn both_sides_load_their_own_day() {
    let source = two_days();
    let mut views = DualViewCoordinator::from_source(source.clone(), DAY_ONE, DAY_TWO, Duration::from_millis(500));
    assert!(!views.is_split());
    views.refresh_all();
    views.wait_loaded().await;

    assert_eq!(views.primary().slider().max, 46);
    assert_eq!(views.secondary().slider().max, 48);
    assert!(views.primary().current_slice().contains_key("_A"));
    assert!(views.secondary().current_slice().contains_key("_B"));
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn toggling_split_preserves_controller_state() {
    let mut views = DualViewCoordinator::from_source(two_days(), DAY_ONE, DAY_TWO, Duration::from_millis(500));
    views.refresh_all();
    views.wait_loaded().await;
    views.set_split(true);

    views.view_mut(ViewSide::Primary).on_aggregation_change(AggregationMode::Hourly);
    views.view_mut(ViewSide::Primary).on_time_point_change(7);
    views.view_mut(ViewSide::Secondary).on_time_point_change(12);

    assert!(!views.toggle_split());
    assert_eq!(views.visible().len(), 1);
    assert!(views.toggle_split());
    assert_eq!(views.visible().len(), 2);

    assert_eq!(views.primary().aggregation(), AggregationMode::Hourly);
    assert_eq!(views.primary().time_point(), 7);
    assert_eq!(views.secondary().aggregation(), AggregationMode::ThirtyMinute);
    assert_eq!(views.secondary().time_point(), 12);
    assert_eq!(views.secondary().date(), DAY_TWO);
}

#[tokio::test(start_paused = true)]
async fn playback_on_one_side_leaves_the_other_alone() {
    let mut views = DualViewCoordinator::from_source(two_days(), DAY_ONE, DAY_TWO, Duration::from_millis(100));
    views.set_split(true);
    views.refresh_all();
    views.wait_loaded().await;
    views.view_mut(ViewSide::Secondary).play();

    let mut advanced = 0;
    while advanced < 3 {
        let (side, event) = views.next_event().await.expect("events");
        assert_eq!(side, ViewSide::Secondary);
        if views.handle(side, event) {
            advanced += 1;
        }
    }
    assert_eq!(views.secondary().time_point(), 4);
    assert_eq!(views.primary().time_point(), 1);
    assert!(!views.primary().playback().is_playing);
}

#[tokio::test]
async fn date_change_on_one_side_refetches_only_that_side() {
    let source = two_days();
    let mut views = DualViewCoordinator::from_source(source.clone(), DAY_ONE, DAY_TWO, Duration::from_millis(500));
    views.refresh_all();
    views.wait_loaded().await;

    views.view_mut(ViewSide::Primary).on_date_change(DateField::Day, 15);
    views.wait_loaded().await;
    assert_eq!(views.primary().date(), DAY_TWO);
    assert_eq!(views.primary().slider().max, 48);
    assert_eq!(views.secondary().date(), DAY_TWO);
    assert_eq!(source.call_count(), 3);
}

#[tokio::test]
async fn opening_split_hides_numerics_on_both_sides() {
    let mut views = DualViewCoordinator::from_source(two_days(), DAY_ONE, DAY_TWO, Duration::from_millis(500));
    assert!(views.toggle_numerics(ViewSide::Primary));
    assert!(views.toggle_numerics(ViewSide::Secondary));
    views.view_mut(ViewSide::Primary).toggle_tech_mix();

    views.set_split(true);
    assert!(!views.primary().show_numerics());
    assert!(!views.secondary().show_numerics());
    assert!(views.primary().show_tech_mix());

    assert!(!views.toggle_numerics(ViewSide::Primary));
    assert!(!views.primary().show_numerics());

    views.set_split(false);
    assert!(views.toggle_numerics(ViewSide::Primary));
    assert!(views.primary().show_numerics());
}
