//! Bounded message queue with graceful close.
//!
//! Both transports build their channels on this queue: a sender fills it
//! while `buffered_amount + len <= max_buffered_amount` (or while it is
//! empty), a receiver drains it, and a close only becomes visible to the
//! receiver once the queued messages are gone.

use super::{RecvError, TrySendError, Writable};
use crate::transfer::TransferMessage;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<TransferMessage>,
    buffered: usize,
    closed: bool,
    /// Set when the producer stopped because of a malformed frame.
    failure: Option<String>,
}

impl QueueState {
    fn accepts(&self, len: usize, max_buffered: usize) -> bool {
        self.items.is_empty() || self.buffered + len <= max_buffered
    }
}

#[derive(Debug)]
pub(crate) struct MessageQueue {
    state: Mutex<QueueState>,
    readable: Condvar,
    writable: Condvar,
    max_buffered: usize,
}

impl MessageQueue {
    pub(crate) fn new(max_buffered: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            readable: Condvar::new(),
            writable: Condvar::new(),
            max_buffered,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Critical sections never leave the state half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn try_push(&self, msg: TransferMessage) -> Result<(), TrySendError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TrySendError::Closed(msg));
        }
        if !state.accepts(msg.len(), self.max_buffered) {
            return Err(TrySendError::Full(msg));
        }
        state.buffered += msg.len();
        state.items.push_back(msg);
        self.readable.notify_all();
        Ok(())
    }

    /// Blocks until a message of `len` bytes would be accepted, the queue
    /// closes, or `timeout` elapses.
    pub(crate) fn wait_writable(&self, len: usize, timeout: Duration) -> Writable {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.closed {
                return Writable::Closed;
            }
            if state.accepts(len, self.max_buffered) {
                return Writable::Ready;
            }
            let now = Instant::now();
            if now >= deadline {
                return Writable::TimedOut;
            }
            state = self
                .writable
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
    }

    /// Pops the oldest message. `None` waits without a deadline.
    pub(crate) fn pop(&self, timeout: Option<Duration>) -> Result<TransferMessage, RecvError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        loop {
            if let Some(msg) = state.items.pop_front() {
                state.buffered -= msg.len();
                self.writable.notify_all();
                return Ok(msg);
            }
            if state.closed {
                return Err(match &state.failure {
                    Some(reason) => RecvError::Malformed(reason.clone()),
                    None => RecvError::Closed,
                });
            }
            state = match deadline {
                None => self.readable.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RecvError::Timeout);
                    }
                    self.readable
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }

    pub(crate) fn buffered_amount(&self) -> usize {
        self.lock().buffered
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.readable.notify_all();
        self.writable.notify_all();
    }

    /// Closes the queue; once drained, receivers see `Malformed(reason)`.
    pub(crate) fn fail(&self, reason: String) {
        let mut state = self.lock();
        if !state.closed {
            state.failure = Some(reason);
        }
        state.closed = true;
        self.readable.notify_all();
        self.writable.notify_all();
    }
}
