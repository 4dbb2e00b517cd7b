//! Priority-based cell transmission scheduling.
//!
//! Outbound cells wait in a min-heap keyed by their absolute send time.
//! Real data becomes eligible after a short random jitter; cover traffic
//! is pushed a full probing interval out so it never preempts eligible
//! real cells queued at the same moment.
//!
//! Jittered send times are clamped to be non-decreasing across real
//! cells: fragments of one message enter the queue in sequence order, and
//! the reassembler on the far side only accepts contiguous sequence
//! numbers, so a later fragment must never dequeue before an earlier one.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use crate::framing::{Cell, CellType};
use crate::profile::Profile;
use crate::random::random_delay_us;

/// One queued cell with its release time.
#[derive(Debug)]
struct QueueEntry {
    cell: Cell,
    due: Instant,
    order: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.order == other.order
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.order.cmp(&other.order))
    }
}

/// Time-ordered transmission queue for outbound cells.
#[derive(Debug)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<QueueEntry>>,
    probing_interval: Duration,
    latency_jitter: Duration,
    next_order: u64,
    /// Send time of the most recently queued real cell
    last_real_due: Instant,
}

impl Scheduler {
    /// Create a scheduler using the profile's timing parameters.
    pub fn new(profile: &Profile) -> Self {
        Self {
            queue: BinaryHeap::new(),
            probing_interval: profile.probing_interval,
            latency_jitter: profile.latency_jitter,
            next_order: 0,
            last_real_due: Instant::now(),
        }
    }

    /// Adopt the timing parameters of a new profile.
    ///
    /// Cells already queued keep their computed send times.
    pub fn set_profile(&mut self, profile: &Profile) {
        self.probing_interval = profile.probing_interval;
        self.latency_jitter = profile.latency_jitter;
    }

    /// Queue a cell for transmission.
    ///
    /// Real cells become eligible after a uniform random slice of the
    /// latency jitter, but never earlier than a previously queued real
    /// cell, so per-stream sequence order survives the jitter. Dummy
    /// cells are deferred a full probing interval.
    pub fn schedule_cell(&mut self, cell: Cell) {
        let now = Instant::now();
        let due = if cell.cell_type == CellType::Dummy {
            now + self.probing_interval
        } else {
            let jitter_us = random_delay_us(0, self.latency_jitter.as_micros() as u64);
            let due = (now + Duration::from_micros(jitter_us)).max(self.last_real_due);
            self.last_real_due = due;
            due
        };

        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(Reverse(QueueEntry { cell, due, order }));
    }

    /// Pop the next cell whose send time has elapsed.
    ///
    /// Non-blocking: returns `None` when the queue is empty or the
    /// earliest cell is still in the future. Callers poll at their own
    /// cadence.
    pub fn next_cell(&mut self) -> Option<Cell> {
        let head = self.queue.peek()?;
        if head.0.due > Instant::now() {
            return None;
        }
        self.queue.pop().map(|entry| entry.0.cell)
    }

    /// Number of cells awaiting transmission.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
