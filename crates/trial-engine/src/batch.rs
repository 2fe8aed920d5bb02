//! Mutual exclusion between tests that share a batch key.
//!
//! Each key has one slot and a FIFO of waiting items. The slot is held from
//! the moment an item is handed out until [`release`](BatchCoordinator::release)
//! is called for that key, i.e. for the whole lifetime of the scenario
//! (including any time spent waiting for world space).

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

/// Per-key FIFO queues with at most one active member per key.
#[derive(Debug)]
pub struct BatchCoordinator<T> {
    active: IndexSet<String>,
    queues: IndexMap<String, VecDeque<T>>,
}

impl<T> Default for BatchCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BatchCoordinator<T> {
    /// No active keys, nothing queued.
    pub fn new() -> Self {
        Self {
            active: IndexSet::new(),
            queues: IndexMap::new(),
        }
    }

    /// Whether `key` currently has an active member.
    pub fn is_busy(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    /// Take the slot for `key`. Returns false if it was already taken.
    pub fn try_claim(&mut self, key: &str) -> bool {
        if self.active.contains(key) {
            return false;
        }
        self.active.insert(key.to_string());
        true
    }

    /// Queue `item` behind the members already waiting on `key`.
    pub fn enqueue(&mut self, key: &str, item: T) {
        self.queue_mut(key).push_back(item);
    }

    /// Queue `item` ahead of every member waiting on `key`.
    pub fn enqueue_front(&mut self, key: &str, item: T) {
        self.queue_mut(key).push_front(item);
    }

    /// Free the slot of `key` and hand it to the next waiting member, if
    /// any. The returned item already holds the slot.
    pub fn release(&mut self, key: &str) -> Option<T> {
        self.active.shift_remove(key);
        let next = self.queues.get_mut(key).and_then(VecDeque::pop_front);
        if next.is_some() {
            self.active.insert(key.to_string());
        }
        if self.queues.get(key).is_some_and(VecDeque::is_empty) {
            self.queues.shift_remove(key);
        }
        next
    }

    /// Remove and return every queued item matching `pred`, in queue order.
    pub fn drain_matching(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut drained = Vec::new();
        for queue in self.queues.values_mut() {
            let mut kept = VecDeque::with_capacity(queue.len());
            for item in queue.drain(..) {
                if pred(&item) {
                    drained.push(item);
                } else {
                    kept.push_back(item);
                }
            }
            *queue = kept;
        }
        self.queues.retain(|_, q| !q.is_empty());
        drained
    }

    /// Number of keys with an active member.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of queued items across all keys.
    pub fn queued(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Number of items waiting on `key`.
    pub fn queued_for(&self, key: &str) -> usize {
        self.queues.get(key).map_or(0, VecDeque::len)
    }

    fn queue_mut(&mut self, key: &str) -> &mut VecDeque<T> {
        if !self.queues.contains_key(key) {
            self.queues.insert(key.to_string(), VecDeque::new());
        }
        &mut self.queues[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_member_per_key() {
        let mut b = BatchCoordinator::<u32>::new();
        assert!(b.try_claim("night"));
        assert!(!b.try_claim("night"));
        assert!(b.try_claim("day"));
        assert_eq!(b.active_count(), 2);
    }

    #[test]
    fn release_hands_the_slot_to_the_next_in_line() {
        let mut b = BatchCoordinator::new();
        assert!(b.try_claim("night"));
        b.enqueue("night", 1);
        b.enqueue("night", 2);
        assert_eq!(b.release("night"), Some(1));
        assert!(b.is_busy("night"));
        assert_eq!(b.release("night"), Some(2));
        assert_eq!(b.release("night"), None);
        assert!(!b.is_busy("night"));
        assert_eq!(b.queued(), 0);
    }

    #[test]
    fn front_of_queue_wins() {
        let mut b = BatchCoordinator::new();
        b.try_claim("k");
        b.enqueue("k", "second");
        b.enqueue_front("k", "retry");
        assert_eq!(b.release("k"), Some("retry"));
    }

    #[test]
    fn drain_matching_keeps_order_of_the_rest() {
        let mut b = BatchCoordinator::new();
        for i in 0..6 {
            b.enqueue(if i % 2 == 0 { "even" } else { "odd" }, i);
        }
        assert_eq!(b.drain_matching(|&i| i >= 4), vec![4, 5]);
        assert_eq!(b.queued_for("even"), 2);
        assert_eq!(b.queued_for("odd"), 2);
    }

    proptest! {
        /// Replaying claim/release traffic never yields two holders of the
        /// same key.
        #[test]
        fn never_two_holders(ops in prop::collection::vec((0u8..3, any::<bool>()), 1..60)) {
            let keys = ["a", "b", "c"];
            let mut b = BatchCoordinator::new();
            let mut holders = [0u32; 3];
            let mut next = 0u32;
            for (k, claim) in ops {
                let key = keys[k as usize];
                if claim {
                    if b.try_claim(key) {
                        holders[k as usize] += 1;
                    } else {
                        b.enqueue(key, next);
                        next += 1;
                    }
                } else if b.is_busy(key) {
                    holders[k as usize] -= 1;
                    if b.release(key).is_some() {
                        holders[k as usize] += 1;
                    }
                }
                prop_assert!(holders.iter().all(|&h| h <= 1));
            }
        }
    }
}
