//! FIFO work queue shared by a producer loop and a pool of workers.
//!
//! Every pushed item counts as unfinished until a worker calls `task_done`
//! for it, which lets the producer `join` the queue during shutdown.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

struct State<T> {
    items: VecDeque<T>,
    unfinished: usize,
}

pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    available: Notify,
    drained: Notify,
}

impl<T: Send> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            available: Notify::new(),
            drained: Notify::new(),
        }
    }

    pub async fn push(&self, item: T) {
        {
            let mut state = self.state.lock().await;
            state.items.push_back(item);
            state.unfinished += 1;
        }
        self.available.notify_one();
    }

    /// Takes the oldest item, waiting at most `idle` for one to arrive.
    ///
    /// Returns `None` when nothing showed up in time so that callers can
    /// re-check their stop condition between polls.
    pub async fn pop(&self, idle: Duration) -> Option<T> {
        let available = self.available.notified();
        tokio::pin!(available);
        available.as_mut().enable();

        if let Some(item) = self.try_pop().await {
            return Some(item);
        }
        let _ = tokio::time::timeout(idle, available).await;
        self.try_pop().await
    }

    pub async fn try_pop(&self) -> Option<T> {
        self.state.lock().await.items.pop_front()
    }

    /// Marks one previously popped item as fully processed.
    pub async fn task_done(&self) {
        let mut state = self.state.lock().await;
        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            self.drained.notify_waiters();
        }
    }

    /// Waits until every pushed item has been popped and marked done.
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.state.lock().await.unfinished == 0 {
                return;
            }
            drained.await;
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }
}

impl<T: Send> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
