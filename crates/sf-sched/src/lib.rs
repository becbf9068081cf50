//! Cooperative timer and debounce registries over an explicit millisecond clock.
//!
//! Nothing here spawns threads or sleeps. Callers pass the current tick into
//! every scheduling call and drain due actions with `fire_due`; actions are
//! plain values executed by whoever owns the registry.

use std::collections::BTreeMap;

/// Handle addressing one outstanding timer.
pub type TimerId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TimerEntry<A> {
    deadline: u64,
    period: Option<u64>,
    action: A,
}

/// Tracks every outstanding delayed or periodic action so each one can be
/// canceled individually and all of them in one sweep at teardown.
#[derive(Debug)]
pub struct TimerRegistry<A> {
    next_id: TimerId,
    entries: BTreeMap<TimerId, TimerEntry<A>>,
    shut_down: bool,
}

impl<A: Clone> TimerRegistry<A> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
            shut_down: false,
        }
    }

    /// Arms a one-shot action. Returns `None` once the registry is shut down.
    pub fn set_timeout(&mut self, action: A, delay: u64, now: u64) -> Option<TimerId> {
        self.arm(action, now.saturating_add(delay), None)
    }

    /// Arms a repeating action. Returns `None` once the registry is shut down.
    pub fn set_interval(&mut self, action: A, period: u64, now: u64) -> Option<TimerId> {
        let period = period.max(1);
        self.arm(action, now.saturating_add(period), Some(period))
    }

    fn arm(&mut self, action: A, deadline: u64, period: Option<u64>) -> Option<TimerId> {
        if self.shut_down {
            return None;
        }

        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.insert(
            id,
            TimerEntry {
                deadline,
                period,
                action,
            },
        );
        Some(id)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Cancels everything and refuses any future arming.
    pub fn shutdown(&mut self) {
        self.entries.clear();
        self.shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Removes and returns every action whose deadline has passed.
    /// Intervals re-arm themselves relative to `now`.
    pub fn fire_due(&mut self, now: u64) -> Vec<A> {
        let due: Vec<TimerId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut fired = Vec::with_capacity(due.len());
        for id in due {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };

            fired.push(entry.action.clone());
            match entry.period {
                Some(period) => entry.deadline = now.saturating_add(period),
                None => {
                    self.entries.remove(&id);
                }
            }
        }

        fired
    }
}

impl<A: Clone> Default for TimerRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DebounceEntry<A> {
    deadline: u64,
    action: A,
}

/// Coalesces repeated trigger requests keyed by purpose into one delayed
/// action. Scheduling under an existing key cancels-and-replaces the pending
/// entry, so a key always fires with the latest trigger's intent.
#[derive(Debug)]
pub struct Debouncer<K, A> {
    entries: BTreeMap<K, DebounceEntry<A>>,
    shut_down: bool,
}

impl<K: Ord + Clone, A> Debouncer<K, A> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            shut_down: false,
        }
    }

    /// Schedules `action` under `key`, displacing any pending entry.
    /// Returns false once the registry is shut down.
    pub fn debounce(&mut self, key: K, action: A, delay: u64, now: u64) -> bool {
        if self.shut_down {
            return false;
        }

        self.entries.insert(
            key,
            DebounceEntry {
                deadline: now.saturating_add(delay),
                action,
            },
        );
        true
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Cancels everything and refuses any future scheduling.
    pub fn shutdown(&mut self) {
        self.entries.clear();
        self.shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Removes and returns every entry whose delay has elapsed.
    pub fn fire_due(&mut self, now: u64) -> Vec<(K, A)> {
        let due: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut fired = Vec::with_capacity(due.len());
        for key in due {
            if let Some(entry) = self.entries.remove(&key) {
                fired.push((key, entry.action));
            }
        }

        fired
    }
}

impl<K: Ord + Clone, A> Default for Debouncer<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use super::TimerRegistry;

    #[test]
    fn timeout_fires_once_at_deadline() {
        let mut timers = TimerRegistry::new();
        let armed = timers.set_timeout("scan", 50, 0);
        assert!(armed.is_some());

        assert!(timers.fire_due(49).is_empty());
        assert_eq!(timers.fire_due(50), vec!["scan"]);
        assert!(timers.fire_due(500).is_empty());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn interval_rearms_after_each_firing() {
        let mut timers = TimerRegistry::new();
        timers.set_interval("poll", 100, 0);

        assert_eq!(timers.fire_due(100), vec!["poll"]);
        assert!(timers.fire_due(150).is_empty());
        assert_eq!(timers.fire_due(200), vec!["poll"]);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn canceled_timer_never_fires() {
        let mut timers = TimerRegistry::new();
        let id = timers.set_timeout("scan", 10, 0);
        assert!(id.is_some_and(|id| timers.cancel(id)));
        assert!(timers.fire_due(100).is_empty());
    }

    #[test]
    fn shutdown_cancels_everything_and_blocks_new_arms() {
        let mut timers = TimerRegistry::new();
        timers.set_timeout("a", 10, 0);
        timers.set_interval("b", 10, 0);

        timers.shutdown();
        assert_eq!(timers.pending(), 0);
        assert!(timers.set_timeout("c", 10, 0).is_none());
        assert!(timers.fire_due(1_000).is_empty());
    }

    #[test]
    fn debounce_collapses_repeated_triggers_into_one_firing() {
        let mut debouncer = Debouncer::new();
        for i in 0..50_u64 {
            debouncer.debounce("mutation", i, 50, i / 5);
        }

        assert_eq!(debouncer.pending(), 1);
        let fired = debouncer.fire_due(9 + 50);
        assert_eq!(fired, vec![("mutation", 49)]);
        assert!(debouncer.fire_due(10_000).is_empty());
    }

    #[test]
    fn rescheduling_pushes_the_deadline_out() {
        let mut debouncer = Debouncer::new();
        debouncer.debounce("k", 1, 50, 0);
        debouncer.debounce("k", 2, 50, 40);

        assert!(debouncer.fire_due(50).is_empty());
        assert_eq!(debouncer.fire_due(90), vec![("k", 2)]);
    }

    #[test]
    fn keys_are_independent() {
        let mut debouncer = Debouncer::new();
        debouncer.debounce("mutation", 1, 50, 0);
        debouncer.debounce("navigation", 2, 300, 0);

        assert_eq!(debouncer.fire_due(50), vec![("mutation", 1)]);
        assert!(debouncer.is_pending(&"navigation"));
        assert_eq!(debouncer.fire_due(300), vec![("navigation", 2)]);
    }

    #[test]
    fn shutdown_blocks_future_debounces() {
        let mut debouncer = Debouncer::new();
        debouncer.debounce("k", 1, 50, 0);
        debouncer.shutdown();

        assert!(!debouncer.debounce("k", 2, 50, 0));
        assert!(debouncer.fire_due(1_000).is_empty());
        assert_eq!(debouncer.pending(), 0);
    }
}
