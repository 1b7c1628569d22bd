//! One-shot timers driven by a simulation's frame clock.
//!
//! A timer is armed through [`FrameTimers::schedule`], which hands back a
//! [`TimerHandle`]. The entity that owns the handle owns the timer: dropping
//! or cancelling the handle guarantees the timer never fires.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner-held handle to a pending timer
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    due_tick: u64,
}

impl TimerHandle {
    /// Invalidate the pending callback
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn due_tick(&self) -> u64 {
        self.due_tick
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
struct Pending<K> {
    due_tick: u64,
    seq: u64,
    key: K,
    cancelled: Arc<AtomicBool>,
}

impl<K> PartialEq for Pending<K> {
    fn eq(&self, other: &Self) -> bool {
        (self.due_tick, self.seq) == (other.due_tick, other.seq)
    }
}

impl<K> Eq for Pending<K> {}

impl<K> PartialOrd for Pending<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Pending<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_tick, self.seq).cmp(&(other.due_tick, other.seq))
    }
}

/// Timer queue for a single simulation instance
#[derive(Debug)]
pub struct FrameTimers<K> {
    now: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Pending<K>>>,
}

impl<K> FrameTimers<K> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current frame-clock tick
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Arm a timer firing `delay_ticks` after the current tick
    pub fn schedule(&mut self, delay_ticks: u64, key: K) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let due_tick = self.now + delay_ticks;
        self.queue.push(Reverse(Pending {
            due_tick,
            seq: self.next_seq,
            key,
            cancelled: cancelled.clone(),
        }));
        self.next_seq += 1;

        TimerHandle {
            cancelled,
            due_tick,
        }
    }

    /// Advance the clock by one tick and return the keys of timers due,
    /// in scheduling order. Cancelled timers are discarded silently.
    pub fn advance(&mut self) -> Vec<K> {
        self.now += 1;
        let mut fired = Vec::new();
        while let Some(Reverse(top)) = self.queue.peek() {
            if top.due_tick > self.now {
                break;
            }
            if let Some(Reverse(pending)) = self.queue.pop() {
                if !pending.cancelled.load(Ordering::Acquire) {
                    fired.push(pending.key);
                }
            }
        }
        fired
    }

    /// Number of timers still queued, cancelled ones included
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl<K> Default for FrameTimers<K> {
    fn default() -> Self {
        Self::new()
    }
}
