use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Cancellable one-shot deadlines. Nothing fires on its own; the owner
/// calls `take_due` from its update loop.
#[derive(Debug)]
pub struct Deadlines<K> {
    next_id: u64,
    entries: Vec<(TimerHandle, Instant, K)>,
}

impl<K> Default for Deadlines<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<K> Deadlines<K> {
    pub fn schedule(&mut self, key: K, at: Instant) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((handle, at, key));
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != handle);
        self.entries.len() != before
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        self.entries.retain(|(_, _, key)| !predicate(key));
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].1 <= now {
                due.push(self.entries.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|(handle, at, _)| (*at, handle.0));
        due.into_iter().map(|(_, _, key)| key).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(_, at, _)| *at).min()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(_, _, key)| key)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn fires_in_deadline_order_and_only_once() {
        let start = Instant::now();
        let mut timers = Deadlines::default();
        timers.schedule("late", start + Duration::from_millis(30));
        timers.schedule("early", start + Duration::from_millis(10));
        timers.schedule("future", start + Duration::from_secs(60));

        assert!(timers.take_due(start).is_empty());
        let due = timers.take_due(start + Duration::from_millis(40));
        assert_eq!(due, vec!["early", "late"]);
        assert!(timers.take_due(start + Duration::from_millis(40)).is_empty());
        assert_eq!(
            timers.next_deadline(),
            Some(start + Duration::from_secs(60))
        );
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let start = Instant::now();
        let mut timers = Deadlines::default();
        let handle = timers.schedule(1, start);
        timers.schedule(2, start);
        timers.schedule(3, start);

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        timers.cancel_where(|key| *key == 3);
        assert_eq!(timers.take_due(start + Duration::from_secs(1)), vec![2]);

        timers.schedule(4, start);
        timers.cancel_all();
        assert_eq!(timers.next_deadline(), None);
        assert!(timers.take_due(start + Duration::from_secs(1)).is_empty());
    }
}
