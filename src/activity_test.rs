use super::*;
use crate::storage::StorageHub;

fn clock_on(hub: &StorageHub) -> ActivityClock {
    ActivityClock::new(Arc::new(hub.open_tab()), "last_activity")
}

// =============================================================================
// ActivitySignal
// =============================================================================

#[test]
fn event_names_map_to_signals() {
    assert_eq!(ActivitySignal::from_event_name("mousemove"), Some(ActivitySignal::PointerMove));
    assert_eq!(ActivitySignal::from_event_name("mousedown"), Some(ActivitySignal::PointerDown));
    assert_eq!(ActivitySignal::from_event_name("keydown"), Some(ActivitySignal::KeyDown));
    assert_eq!(ActivitySignal::from_event_name("scroll"), Some(ActivitySignal::Scroll));
    assert_eq!(ActivitySignal::from_event_name("touchstart"), Some(ActivitySignal::TouchStart));
    assert_eq!(ActivitySignal::from_event_name("click"), Some(ActivitySignal::Click));
}

#[test]
fn unrelated_events_are_not_activity() {
    assert_eq!(ActivitySignal::from_event_name("resize"), None);
    assert_eq!(ActivitySignal::from_event_name("visibilitychange"), None);
    assert_eq!(ActivitySignal::from_event_name(""), None);
}

#[test]
fn signal_display_is_event_name() {
    assert_eq!(ActivitySignal::KeyDown.to_string(), "keydown");
}

// =============================================================================
// Throttle
// =============================================================================

#[test]
fn throttle_admits_first_signal() {
    let mut t = Throttle::new(1000);
    assert!(t.admit(5_000));
}

#[test]
fn throttle_drops_burst_within_window() {
    let mut t = Throttle::new(1000);
    assert!(t.admit(0));
    for now in (100..1000).step_by(100) {
        assert!(!t.admit(now), "signal at {now}ms should be dropped");
    }
    assert!(t.admit(1000));
}

#[test]
fn throttle_writes_at_most_one_per_second_for_dense_input() {
    let mut t = Throttle::new(1000);
    // One signal every 250ms for ten seconds.
    let admitted = (0..40_i64).filter(|&i| t.admit(i * 250)).count();
    assert_eq!(admitted, 10);
}

#[test]
fn throttle_reset_admits_immediately() {
    let mut t = Throttle::new(1000);
    assert!(t.admit(0));
    t.reset();
    assert!(t.admit(10));
}

// =============================================================================
// ActivityClock
// =============================================================================

#[test]
fn last_is_none_without_record() {
    let hub = StorageHub::new();
    assert_eq!(clock_on(&hub).last(), None);
}

#[test]
fn record_is_visible_to_other_tabs() {
    let hub = StorageHub::new();
    let a = clock_on(&hub);
    let b = clock_on(&hub);
    a.record(1_700_000_000_123);
    assert_eq!(b.last(), Some(1_700_000_000_123));
}

#[test]
fn malformed_timestamp_reads_as_no_record() {
    let hub = StorageHub::new();
    let tab = hub.open_tab();
    tab.set("last_activity", "yesterday");
    let clock = ActivityClock::new(Arc::new(tab), "last_activity");
    assert_eq!(clock.last(), None);
}

#[test]
fn clear_removes_record() {
    let hub = StorageHub::new();
    let clock = clock_on(&hub);
    clock.record(10);
    clock.clear();
    assert_eq!(clock.last(), None);
}

#[test]
fn parse_timestamp_tolerates_whitespace() {
    assert_eq!(parse_timestamp(" 42\n"), Some(42));
    assert_eq!(parse_timestamp("4.2"), None);
}
