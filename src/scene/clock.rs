//! Animation playback clock.
//!
//! Scene time advances only while playback is active and wraps modulo 120
//! seconds to bound drift. The clock never reads the wall clock itself: the
//! caller supplies "now" on a reference timeline (wall-clock seconds in
//! windowed mode, event timestamps in headless mode), which keeps headless
//! output deterministic.

/// Animation time wraps at this many seconds.
pub const ANIMATION_WRAP_SECONDS: f32 = 120.0;

#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    playing: bool,
    rate: f32,
    /// Scene time at the moment of the last play/pause.
    base: f32,
    /// Reference-timeline seconds at the moment of the last play.
    anchor: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            playing: false,
            rate: 1.0,
            base: 0.0,
            anchor: 0.0,
        }
    }
}

impl PlaybackClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) playback at `start` scene seconds with the given
    /// rate, anchored at `now` on the reference timeline.
    pub fn play(&mut self, start: f32, rate: f32, now: f64) {
        self.playing = true;
        self.rate = rate;
        self.base = start;
        self.anchor = now;
    }

    /// Resumes from the current scene time without resetting it.
    pub fn resume(&mut self, now: f64) {
        if !self.playing {
            self.playing = true;
            self.anchor = now;
        }
    }

    /// Freezes scene time at its value for `now`.
    pub fn pause(&mut self, now: f64) {
        if self.playing {
            self.base = self.time(now);
            self.playing = false;
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Scene time for a reference-timeline instant, wrapped to the 120 s
    /// window.
    #[must_use]
    pub fn time(&self, now: f64) -> f32 {
        let t = if self.playing {
            self.base + ((now - self.anchor) as f32) * self.rate
        } else {
            self.base
        };
        t.rem_euclid(ANIMATION_WRAP_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_holds() {
        let mut clock = PlaybackClock::new();
        clock.play(3.0, 1.0, 10.0);
        clock.pause(12.0);
        assert!((clock.time(100.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn wraps_at_two_minutes() {
        let mut clock = PlaybackClock::new();
        clock.play(0.0, 1.0, 0.0);
        assert!((clock.time(121.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rate_scales_time() {
        let mut clock = PlaybackClock::new();
        clock.play(1.0, 2.0, 5.0);
        assert!((clock.time(7.0) - 5.0).abs() < 1e-6);
    }
}
