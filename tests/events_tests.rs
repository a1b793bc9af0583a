//! Event script tests
//!
//! Tests for:
//! - Record parsing (AVAILABLE / PLAY / SAVE / MARK)
//! - Timestamp monotonicity enforcement
//! - Sliding-window cursor semantics
//! - The playback clock driven from event timestamps

use std::path::PathBuf;

use helios::events::{EventKind, EventScript};
use helios::scene::PlaybackClock;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn parses_all_record_kinds() {
    let script = EventScript::from_text(
        "0 AVAILABLE\n\
         1000 PLAY 2.5 1\n\
         2000 SAVE out/frame.ppm\n\
         3000 MARK checkpoint one\n",
    )
    .unwrap();

    let events = script.events();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].kind, EventKind::Available);
    assert_eq!(
        events[1].kind,
        EventKind::Play {
            start: 2.5,
            rate: 1
        }
    );
    assert_eq!(
        events[2].kind,
        EventKind::Save {
            path: PathBuf::from("out/frame.ppm")
        }
    );
    assert_eq!(
        events[3].kind,
        EventKind::Mark {
            text: "checkpoint one".to_string()
        }
    );
}

#[test]
fn mark_keeps_the_rest_of_the_line() {
    let script = EventScript::from_text("5 MARK words with   spacing kept\n").unwrap();
    assert_eq!(
        script.events()[0].kind,
        EventKind::Mark {
            text: "words with   spacing kept".to_string()
        }
    );
}

#[test]
fn mark_skips_only_one_separator() {
    // Only the single separator after the keyword is consumed; any further
    // leading whitespace belongs to the text.
    let script = EventScript::from_text("5 MARK  two spaces\n").unwrap();
    assert_eq!(
        script.events()[0].kind,
        EventKind::Mark {
            text: " two spaces".to_string()
        }
    );
}

#[test]
fn blank_lines_are_skipped() {
    let script = EventScript::from_text("\n0 AVAILABLE\n\n\n10 AVAILABLE\n").unwrap();
    assert_eq!(script.events().len(), 2);
}

#[test]
fn decreasing_timestamps_are_rejected() {
    assert!(EventScript::from_text("10 AVAILABLE\n5 AVAILABLE\n").is_err());
}

#[test]
fn equal_timestamps_are_allowed() {
    let script = EventScript::from_text("10 AVAILABLE\n10 MARK same tick\n").unwrap();
    assert_eq!(script.events().len(), 2);
}

#[test]
fn malformed_records_are_errors() {
    assert!(EventScript::from_text("abc AVAILABLE\n").is_err());
    assert!(EventScript::from_text("0 EXPLODE\n").is_err());
    assert!(EventScript::from_text("0 PLAY 1.0\n").is_err());
    assert!(EventScript::from_text("0 SAVE\n").is_err());
}

// ============================================================================
// Sliding window
// ============================================================================

#[test]
fn window_advances_in_order() {
    let mut script = EventScript::from_text(
        "0 MARK a\n\
         100 MARK b\n\
         100 MARK c\n\
         500 MARK d\n",
    )
    .unwrap();

    assert!(!script.finished());
    assert_eq!(script.next_time(), Some(0));

    let first = script.take_ready(99).to_vec();
    assert_eq!(first.len(), 1);

    // Both t=100 records become ready on the same tick, in file order.
    let second = script.take_ready(100).to_vec();
    assert_eq!(second.len(), 2);
    assert_eq!(
        second[0].kind,
        EventKind::Mark {
            text: "b".to_string()
        }
    );

    assert_eq!(script.next_time(), Some(500));
    let third = script.take_ready(10_000).to_vec();
    assert_eq!(third.len(), 1);
    assert!(script.finished());

    // Once consumed, nothing fires again.
    assert!(script.take_ready(u64::MAX).is_empty());
}

// ============================================================================
// Deterministic clock
// ============================================================================

#[test]
fn clock_driven_by_event_timestamps_is_deterministic() {
    // PLAY at t=1s starting the animation at 2s, rate 1: an AVAILABLE at
    // t=3s samples scene time 4s. Replaying gives the same answer.
    for _ in 0..2 {
        let mut clock = PlaybackClock::new();
        clock.play(2.0, 1.0, 1.0);
        let t = clock.time(3.0);
        assert!((t - 4.0).abs() < 1e-6);
    }
}

#[test]
fn clock_rate_zero_freezes_scene_time() {
    let mut clock = PlaybackClock::new();
    clock.play(5.0, 0.0, 0.0);
    assert!((clock.time(100.0) - 5.0).abs() < 1e-6);
}
