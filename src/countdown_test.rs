use super::*;

// =============================================================================
// format_remaining
// =============================================================================

#[test]
fn format_under_a_minute_uses_seconds_suffix() {
    assert_eq!(format_remaining(59), "59s");
    assert_eq!(format_remaining(5), "5s");
    assert_eq!(format_remaining(0), "0s");
}

#[test]
fn format_minute_and_above_pads_seconds() {
    assert_eq!(format_remaining(60), "1:00");
    assert_eq!(format_remaining(65), "1:05");
    assert_eq!(format_remaining(754), "12:34");
}

// =============================================================================
// WarningCountdown
// =============================================================================

#[test]
fn stop_without_ticker_is_safe() {
    let mut c = WarningCountdown::new();
    c.stop();
    c.stop();
    assert!(!c.is_running());
}

#[test]
fn tick_is_not_due_before_one_second() {
    let mut c = WarningCountdown::new();
    c.start(60, 0);
    assert_eq!(c.tick_if_due(999), None);
    assert_eq!(c.remaining(), Some(60));
}

#[test]
fn ticks_decrement_once_per_second() {
    let mut c = WarningCountdown::new();
    c.start(3, 0);
    assert_eq!(c.tick_if_due(1000), Some(Tick::Remaining(2)));
    assert_eq!(c.next_tick_at(), Some(2000));
    assert_eq!(c.tick_if_due(2000), Some(Tick::Remaining(1)));
    assert_eq!(c.tick_if_due(3000), Some(Tick::Expired));
    assert!(!c.is_running());
    assert_eq!(c.tick_if_due(4000), None);
}

#[test]
fn sixty_ticks_expire_exactly_once() {
    let mut c = WarningCountdown::new();
    c.start(60, 0);
    let mut expired = 0;
    for s in 1..=120 {
        if c.tick_if_due(s * 1000) == Some(Tick::Expired) {
            expired += 1;
            assert_eq!(s, 60);
        }
    }
    assert_eq!(expired, 1);
}

#[test]
fn restart_replaces_running_ticker() {
    let mut c = WarningCountdown::new();
    c.start(60, 0);
    c.tick_if_due(1000);
    c.start(30, 1500);
    assert_eq!(c.remaining(), Some(30));
    assert_eq!(c.next_tick_at(), Some(2500));
    assert_eq!(c.tick_if_due(2000), None);
}
