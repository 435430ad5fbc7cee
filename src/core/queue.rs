//! Bounded message queue shared by a producer/consumer pair of agents.
//!
//! The queue models a list with a head and a tail. Items always leave from
//! the tail; where they enter depends on [`QueueOrder`]:
//! - `Lifo`: enqueue at the tail (the outbound queue)
//! - `Fifo`: enqueue at the head (the inbound queue)
//!
//! One mutex guards the storage and one `Notify` plays the role of the
//! queue's condition variable. Every push, pop and close wakes all waiters,
//! and every waiter re-checks its predicate before proceeding.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::Notify;

/// Default capacity of both chat queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Where new items are inserted. Removal is always at the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Insert at the tail: the newest item is dequeued first.
    Lifo,
    /// Insert at the head: the oldest item is dequeued first.
    Fifo,
}

/// Queue failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("{queue} queue is full ({capacity} messages)")]
    Full { queue: &'static str, capacity: usize },

    #[error("{queue} queue is closed")]
    Closed { queue: &'static str },
}

struct Slots<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity queue with blocking push and pop.
pub struct BoundedQueue<T> {
    name: &'static str,
    order: QueueOrder,
    capacity: usize,
    slots: Mutex<Slots<T>>,
    changed: Notify,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue. A capacity of zero is raised to one.
    pub fn new(name: &'static str, order: QueueOrder, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            order,
            capacity,
            slots: Mutex::new(Slots {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            changed: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy.
    pub fn count(&self) -> usize {
        self.slots().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.slots().closed
    }

    /// Push an item, waiting for space while the queue is full.
    pub async fn push(&self, item: T) -> Result<(), QueueError> {
        let mut warned = false;
        loop {
            let notified = self.changed.notified();
            {
                let mut slots = self.slots();
                if slots.closed {
                    return Err(self.closed_error());
                }
                if slots.items.len() < self.capacity {
                    self.insert(&mut slots, item);
                    drop(slots);
                    self.changed.notify_waiters();
                    return Ok(());
                }
            }

            if !warned {
                tracing::warn!(
                    queue = self.name,
                    capacity = self.capacity,
                    "Queue is full, waiting for space"
                );
                warned = true;
            }
            notified.await;
        }
    }

    /// Push without waiting. Fails with [`QueueError::Full`] at capacity.
    pub fn try_push(&self, item: T) -> Result<(), QueueError> {
        let mut slots = self.slots();
        if slots.closed {
            return Err(self.closed_error());
        }
        if slots.items.len() >= self.capacity {
            return Err(QueueError::Full {
                queue: self.name,
                capacity: self.capacity,
            });
        }
        self.insert(&mut slots, item);
        drop(slots);
        self.changed.notify_waiters();
        Ok(())
    }

    /// Pop the tail item, waiting while the queue is empty.
    pub async fn pop(&self) -> Result<T, QueueError> {
        loop {
            let notified = self.changed.notified();
            {
                let mut slots = self.slots();
                if slots.closed {
                    return Err(self.closed_error());
                }
                if let Some(item) = slots.items.pop_back() {
                    drop(slots);
                    self.changed.notify_waiters();
                    return Ok(item);
                }
            }
            notified.await;
        }
    }

    /// Clone of the item `pop` would return, waiting while the queue is empty.
    ///
    /// Lets a single consumer act on an item before removing it, so the
    /// removal (and the wakeup it sends) happens only once the work is done.
    pub async fn peek(&self) -> Result<T, QueueError>
    where
        T: Clone,
    {
        loop {
            let notified = self.changed.notified();
            {
                let slots = self.slots();
                if slots.closed {
                    return Err(self.closed_error());
                }
                if let Some(item) = slots.items.back() {
                    return Ok(item.clone());
                }
            }
            notified.await;
        }
    }

    /// Wait until the consumer has taken everything in the queue.
    pub async fn wait_until_empty(&self) -> Result<(), QueueError> {
        loop {
            let notified = self.changed.notified();
            {
                let slots = self.slots();
                if slots.closed {
                    return Err(self.closed_error());
                }
                if slots.items.is_empty() {
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Drop all stored items and fail every current and future caller.
    ///
    /// Returns how many items were discarded. Closing twice is a no-op.
    pub fn close(&self) -> usize {
        let mut slots = self.slots();
        if slots.closed {
            return 0;
        }
        slots.closed = true;
        let discarded = slots.items.len();
        slots.items.clear();
        drop(slots);

        self.changed.notify_waiters();
        tracing::debug!(queue = self.name, discarded, "Queue closed");
        discarded
    }

    fn insert(&self, slots: &mut Slots<T>, item: T) {
        match self.order {
            QueueOrder::Lifo => slots.items.push_back(item),
            QueueOrder::Fifo => slots.items.push_front(item),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn closed_error(&self) -> QueueError {
        QueueError::Closed { queue: self.name }
    }
}
