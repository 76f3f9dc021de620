use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// FIFO queue shared between many producers and many consumers.
///
/// `pop` waits while the queue is empty. `close` releases every waiter; after
/// it, `push` is ignored and `pop` returns `None` straight away. Items that
/// were still buffered at close time stay available through `drain`.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Notify,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail and wake one waiting consumer.
    pub fn push(&self, item: T) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
    }

    /// Take the head, waiting for a push if the queue is empty.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn pop(&self) -> Option<T> {
        loop {
            // Register before checking so a push between the check and the
            // await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
    }

    /// Remove and return everything still buffered.
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
