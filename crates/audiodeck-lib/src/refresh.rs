//! Cooldown filter for mute-state icon refreshes.
//!
//! The host polls the mic state on a timer; other applications can flip
//! mute rapidly. [`RefreshThrottle`] reports a changed state at most once per
//! cooldown window so the control surface is not redrawn on every flicker.

use std::time::{Duration, Instant};

pub struct RefreshThrottle {
    cooldown: Duration,
    reported: Option<bool>,
    last_report: Option<Instant>,
}

impl RefreshThrottle {
    /// `initial` is the state the display already shows, if known.
    pub fn new(cooldown: Duration, initial: Option<bool>) -> Self {
        RefreshThrottle {
            cooldown,
            reported: initial,
            last_report: None,
        }
    }

    /// Feed a polled state. Returns `Some(state)` when it differs from the
    /// last reported state and the cooldown has elapsed since that report.
    ///
    /// A change suppressed by the cooldown is reported by a later poll.
    pub fn update(&mut self, state: bool, now: Instant) -> Option<bool> {
        if self.reported == Some(state) {
            return None;
        }
        if let Some(last) = self.last_report
            && now.saturating_duration_since(last) < self.cooldown
        {
            return None;
        }
        self.reported = Some(state);
        self.last_report = Some(now);
        Some(state)
    }

    /// Record a state the display was refreshed to through another path
    /// (e.g. the toggle command itself), restarting the cooldown.
    pub fn force_state(&mut self, state: bool, now: Instant) {
        self.reported = Some(state);
        self.last_report = Some(now);
    }

    /// Last state reported or forced.
    pub fn reported(&self) -> Option<bool> {
        self.reported
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
