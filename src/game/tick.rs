//! Simulation ticks and the authoritative tick clock

use serde::{Deserialize, Serialize};

/// A simulation tick index.
///
/// Tick indices wrap at `u32::MAX`. Ordering is defined by signed half-range
/// distance, so a tick is "newer" than another when it lies less than
/// `2^31` steps ahead of it. Never compare the raw indices directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(u32);

impl Tick {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    /// Tick `ticks` steps after this one.
    pub const fn add(self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    pub const fn next(self) -> Self {
        self.add(1)
    }

    /// Signed number of ticks from `earlier` to `self`.
    ///
    /// Positive when `self` is newer, negative when it is older.
    pub const fn ticks_since(self, earlier: Tick) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    pub const fn is_newer_than(self, other: Tick) -> bool {
        self.ticks_since(other) > 0
    }

    pub const fn is_newer_or_equal(self, other: Tick) -> bool {
        self.ticks_since(other) >= 0
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authoritative tick counter of one match.
#[derive(Debug, Clone)]
pub struct TickClock {
    current: Tick,
    tick_rate: u32,
}

impl TickClock {
    pub fn new(tick_rate: u32) -> Self {
        Self::starting_at(Tick::default(), tick_rate)
    }

    pub fn starting_at(start: Tick, tick_rate: u32) -> Self {
        Self {
            current: start,
            tick_rate: tick_rate.max(1),
        }
    }

    pub fn current(&self) -> Tick {
        self.current
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Fixed step length in seconds
    pub fn delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Advance by one tick and return the new current tick
    pub fn advance(&mut self) -> Tick {
        self.current = self.current.next();
        self.current
    }

    pub fn seconds_to_ticks(&self, seconds: f32) -> u32 {
        (seconds.max(0.0) * self.tick_rate as f32) as u32
    }

    /// Whole seconds left until `target`, rounded up. Zero once reached.
    pub fn seconds_until(&self, target: Tick) -> i32 {
        seconds_until(self.current, target, self.tick_rate)
    }
}

/// Whole seconds from `now` until `target` at `tick_rate`, rounded up.
pub fn seconds_until(now: Tick, target: Tick, tick_rate: u32) -> i32 {
    let ticks = target.ticks_since(now);
    if ticks <= 0 {
        return 0;
    }
    let rate = tick_rate.max(1) as i64;
    ((ticks as i64 + rate - 1) / rate) as i32
}
