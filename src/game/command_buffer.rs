//! Tick-stamped per-entity value history
//!
//! A `CommandBuffer<T>` keeps the last few values written for an entity, each
//! stamped with the tick that produced it. Queries resolve "the value in
//! effect at tick T", which is what deterministic re-simulation needs: a
//! replayed tick reads exactly what the original pass wrote.

use std::collections::VecDeque;

use super::tick::Tick;

/// Default number of ticks retained per buffer
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct CommandBuffer<T> {
    entries: VecDeque<(Tick, T)>,
    capacity: usize,
}

impl<T> CommandBuffer<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `value` for `tick`.
    ///
    /// A second write for the same tick replaces the first. When the buffer
    /// is full the oldest tick is dropped, unless the write is older than
    /// everything retained, in which case the write itself is discarded.
    pub fn set(&mut self, tick: Tick, value: T) {
        if let Some(slot) = self.entries.iter_mut().find(|(t, _)| *t == tick) {
            slot.1 = value;
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.oldest_index() {
                if self.entries[oldest].0.is_newer_than(tick) {
                    return;
                }
                self.entries.remove(oldest);
            }
        }
        self.entries.push_back((tick, value));
    }

    /// Most recent value recorded at or before `tick`.
    ///
    /// `None` means the query predates everything retained; callers treat it
    /// as the default value.
    pub fn get_at_or_before(&self, tick: Tick) -> Option<&T> {
        self.entry_at_or_before(tick).map(|(_, value)| value)
    }

    /// Like [`get_at_or_before`](Self::get_at_or_before) but also returns the
    /// tick the value was recorded at.
    pub fn entry_at_or_before(&self, tick: Tick) -> Option<(Tick, &T)> {
        self.entries
            .iter()
            .filter(|(t, _)| tick.is_newer_or_equal(*t))
            .min_by_key(|(t, _)| tick.ticks_since(*t))
            .map(|(t, value)| (*t, value))
    }

    /// Value recorded for exactly `tick`
    pub fn get_exact(&self, tick: Tick) -> Option<&T> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tick)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index of the entry with the oldest tick
    fn oldest_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, (a, _)), (_, (b, _))| a.ticks_since(*b).cmp(&0))
            .map(|(idx, _)| idx)
    }
}

impl<T> Default for CommandBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_fills_missing_ticks() {
        let mut buf = CommandBuffer::new();
        buf.set(Tick::new(10), "a");
        buf.set(Tick::new(14), "b");

        assert_eq!(buf.get_at_or_before(Tick::new(9)), None);
        assert_eq!(buf.get_at_or_before(Tick::new(10)), Some(&"a"));
        assert_eq!(buf.get_at_or_before(Tick::new(13)), Some(&"a"));
        assert_eq!(buf.get_at_or_before(Tick::new(14)), Some(&"b"));
        assert_eq!(buf.get_at_or_before(Tick::new(500)), Some(&"b"));
    }

    #[test]
    fn same_tick_overwrites() {
        let mut buf = CommandBuffer::new();
        buf.set(Tick::new(3), 1);
        buf.set(Tick::new(3), 7);

        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get_exact(Tick::new(3)), Some(&7));
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut buf = CommandBuffer::with_capacity(3);
        for i in 1..=5u32 {
            buf.set(Tick::new(i), i);
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get_exact(Tick::new(2)), None);
        assert_eq!(buf.get_at_or_before(Tick::new(2)), None);
        assert_eq!(buf.get_at_or_before(Tick::new(3)), Some(&3));
    }

    #[test]
    fn full_buffer_discards_writes_older_than_window() {
        let mut buf = CommandBuffer::with_capacity(3);
        for tick in [10u32, 11, 12] {
            buf.set(Tick::new(tick), tick);
        }

        buf.set(Tick::new(5), 5);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get_exact(Tick::new(5)), None);
        assert_eq!(buf.get_exact(Tick::new(10)), Some(&10));
        assert_eq!(buf.get_exact(Tick::new(12)), Some(&12));
    }

    #[test]
    fn late_write_inside_window_evicts_oldest() {
        let mut buf = CommandBuffer::with_capacity(3);
        for tick in [10u32, 12, 14] {
            buf.set(Tick::new(tick), tick);
        }

        buf.set(Tick::new(11), 11);
        assert_eq!(buf.get_exact(Tick::new(10)), None);
        assert_eq!(buf.get_exact(Tick::new(11)), Some(&11));
        assert_eq!(buf.get_exact(Tick::new(14)), Some(&14));
    }

    #[test]
    fn out_of_order_writes_resolve_by_tick() {
        let mut buf = CommandBuffer::new();
        buf.set(Tick::new(20), 'b');
        buf.set(Tick::new(10), 'a');

        assert_eq!(buf.get_at_or_before(Tick::new(15)), Some(&'a'));
        assert_eq!(buf.get_at_or_before(Tick::new(25)), Some(&'b'));
    }

    #[test]
    fn lookups_work_across_wraparound() {
        let mut buf = CommandBuffer::new();
        let before = Tick::new(u32::MAX - 1);
        let after = before.add(4);
        buf.set(before, 1);
        buf.set(after, 2);

        assert_eq!(buf.get_at_or_before(before.add(2)), Some(&1));
        assert_eq!(buf.entry_at_or_before(after.add(1)), Some((after, &2)));
    }
}
