use std::collections::{BTreeMap, HashMap};

/// Handle of an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Single-shot timers on a virtual millisecond clock.
///
/// Nothing fires by itself: the owner moves the clock with [`pop_due`],
/// so tests drive rounds without real delays and the CLI maps wall time
/// onto it.
///
/// [`pop_due`]: TimerQueue::pop_due
#[derive(Debug)]
pub struct TimerQueue<T> {
    now_ms: u64,
    next_id: u64,
    /// (deadline, id) keeps equal deadlines in arming order
    entries: BTreeMap<(u64, u64), T>,
    deadlines: HashMap<u64, u64>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fires at or after `now + delay_ms`
    pub fn arm(&mut self, delay_ms: u64, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = self.now_ms.saturating_add(delay_ms);
        self.entries.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancel an unfired timer; returns its payload if it was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let deadline = self.deadlines.remove(&handle.0)?;
        self.entries.remove(&(deadline, handle.0))
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerHandle, T)> {
        let (&(deadline, id), _) = self.entries.iter().next()?;
        if deadline > until {
            return None;
        }

        let payload = self.entries.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now_ms = self.now_ms.max(deadline);
        Some((TimerHandle(id), payload))
    }

    /// Move the clock forward without firing anything
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
