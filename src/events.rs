//! Headless event scripts.
//!
//! One record per line, whitespace-separated, led by a non-decreasing
//! timestamp in microseconds:
//!
//! ```text
//! <t> AVAILABLE
//! <t> PLAY <start> <rate>
//! <t> SAVE <path>
//! <t> MARK <text to end of line>
//! ```
//!
//! The cursor advances as a sliding window: on each tick every event with
//! `t <= now` becomes ready and fires in order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{HeliosError, Result};

/// A parsed event record.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Render one frame at the current scene time.
    Available,
    /// Reset and start the animation at `start` seconds with integer `rate`.
    Play { start: f32, rate: i32 },
    /// Render one frame and dump it as PPM to the path.
    Save { path: PathBuf },
    /// Emit the text on standard output.
    Mark { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Timestamp in microseconds.
    pub time: u64,
    pub kind: EventKind,
}

/// The event list plus the sliding-window cursor.
#[derive(Debug, Default)]
pub struct EventScript {
    events: Vec<Event>,
    cursor: usize,
}

impl EventScript {
    /// Reads and parses an event file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| HeliosError::io(path, e))?;
        Self::from_text(&text)
    }

    /// Parses script text.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut events = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = parse_line(line)
                .map_err(|e| HeliosError::Event(format!("line {}: {e}", line_no + 1)))?;
            if events.last().is_some_and(|prev: &Event| event.time < prev.time) {
                return Err(HeliosError::Event(format!(
                    "line {}: timestamps must be non-decreasing",
                    line_no + 1
                )));
            }
            events.push(event);
        }
        Ok(Self { events, cursor: 0 })
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Whether every event has been consumed.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.cursor >= self.events.len()
    }

    /// Timestamp of the next pending event.
    #[must_use]
    pub fn next_time(&self) -> Option<u64> {
        self.events.get(self.cursor).map(|e| e.time)
    }

    /// Slides the window to `now` and returns the events that became ready.
    pub fn take_ready(&mut self, now: u64) -> &[Event] {
        let start = self.cursor;
        let end = start
            + self.events[start..]
                .iter()
                .take_while(|e| e.time <= now)
                .count();
        self.cursor = end;
        &self.events[start..end]
    }
}

fn parse_line(line: &str) -> Result<Event> {
    let mut tokens = line.split_whitespace();
    let time: u64 = tokens
        .next()
        .ok_or_else(|| HeliosError::Event("missing timestamp".into()))?
        .parse()
        .map_err(|_| HeliosError::Event("timestamp is not an integer".into()))?;

    let kind = match tokens.next() {
        Some("AVAILABLE") => EventKind::Available,
        Some("PLAY") => {
            let start: f32 = tokens
                .next()
                .ok_or_else(|| HeliosError::Event("PLAY is missing <start>".into()))?
                .parse()
                .map_err(|_| HeliosError::Event("PLAY <start> is not a number".into()))?;
            let rate: i32 = tokens
                .next()
                .ok_or_else(|| HeliosError::Event("PLAY is missing <rate>".into()))?
                .parse()
                .map_err(|_| HeliosError::Event("PLAY <rate> is not an integer".into()))?;
            EventKind::Play { start, rate }
        }
        Some("SAVE") => {
            let path = tokens
                .next()
                .ok_or_else(|| HeliosError::Event("SAVE is missing <path>".into()))?;
            EventKind::Save {
                path: PathBuf::from(path),
            }
        }
        Some("MARK") => {
            // One separator character after the keyword, then the rest of
            // the line verbatim.
            let after = line.find("MARK").map_or("", |i| &line[i + 4..]);
            let text = after.strip_prefix(' ').unwrap_or(after);
            EventKind::Mark {
                text: text.to_string(),
            }
        }
        Some(other) => {
            return Err(HeliosError::Event(format!("unknown event type '{other}'")));
        }
        None => return Err(HeliosError::Event("missing event type".into())),
    };

    Ok(Event { time, kind })
}
