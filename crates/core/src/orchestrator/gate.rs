//! One-shot completion gate.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

/// Errors returned while waiting on a [`CompletionGate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("completion gate not signaled within {0:?}")]
    TimedOut(Duration),
}

/// Single-slot gate that lets callers wait for a value signaled exactly once.
///
/// The first `signal` wins and later ones are ignored. A wait that starts
/// after the gate was signaled returns immediately.
///
/// Cheaply cloneable; all clones share the same slot.
#[derive(Debug)]
pub struct CompletionGate<T> {
    slot: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for CompletionGate<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Default for CompletionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CompletionGate<T> {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Store `value` and wake all waiters.
    ///
    /// Returns true if this call signaled the gate, false if it was already
    /// signaled (in which case `value` is dropped).
    pub fn signal(&self, value: T) -> bool {
        let mut value = Some(value);
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn is_signaled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The signaled value, without waiting.
    pub fn peek(&self) -> Option<T> {
        self.slot.borrow().clone()
    }

    /// Wait for the gate to be signaled.
    pub async fn wait_async(&self) -> T {
        let mut rx = self.slot.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().as_ref() {
                return value.clone();
            }
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.changed().await;
        }
    }

    /// Wait for the gate to be signaled, giving up after `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<T, GateError> {
        tokio::time::timeout(timeout, self.wait_async())
            .await
            .map_err(|_| GateError::TimedOut(timeout))
    }

    /// Block the current thread until the gate is signaled.
    ///
    /// Must not be called from an async task: it parks the thread, and on a
    /// current-thread runtime the signal would never arrive.
    pub fn wait(&self) -> T {
        futures::executor::block_on(self.wait_async())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_wait_after_signal_returns_immediately() {
        let gate = CompletionGate::new();
        assert!(!gate.is_signaled());

        assert!(gate.signal(7));
        assert!(gate.is_signaled());
        assert_eq!(gate.wait(), 7);
        assert_eq!(gate.wait(), 7);
    }

    #[test]
    fn test_second_signal_is_ignored() {
        let gate = CompletionGate::new();
        assert!(gate.signal("first"));
        assert!(!gate.signal("second"));
        assert_eq!(gate.peek(), Some("first"));
    }

    #[test]
    fn test_wait_blocks_until_signaled_from_other_thread() {
        let gate = CompletionGate::new();
        let signaler = gate.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaler.signal(42u32)
        });

        assert_eq!(gate.wait(), 42);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_double_signal_from_threads_wakes_once() {
        let gate = CompletionGate::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gate = gate.clone();
                thread::spawn(move || gate.signal(i))
            })
            .collect();

        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(fired, 1);

        let value = gate.wait();
        assert!(value < 4);
        assert_eq!(gate.peek(), Some(value));
    }

    #[tokio::test]
    async fn test_wait_async() {
        let gate = CompletionGate::new();
        let signaler = gate.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signaler.signal("done".to_string());
        });

        assert_eq!(gate.wait_async().await, "done");
    }

    #[test]
    fn test_pending_waiter_is_woken_by_signal() {
        let gate = CompletionGate::new();
        let mut first = task::spawn(gate.wait_async());
        let mut second = task::spawn(gate.wait_async());
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        gate.signal(9u16);
        assert!(first.is_woken());
        assert!(second.is_woken());
        assert_ready_eq!(first.poll(), 9);
        assert_ready_eq!(second.poll(), 9);
    }

    #[test]
    fn test_wait_async_ready_when_already_signaled() {
        let gate = CompletionGate::new();
        gate.signal("late");
        let mut waiter = task::spawn(gate.wait_async());
        assert_ready_eq!(waiter.poll(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_expires() {
        let gate: CompletionGate<u8> = CompletionGate::new();
        let result = gate.wait_timeout(Duration::from_secs(5)).await;
        assert_eq!(result, Err(GateError::TimedOut(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_after_signal() {
        let gate = CompletionGate::new();
        gate.signal(1u8);
        assert_eq!(gate.wait_timeout(Duration::from_millis(1)).await, Ok(1));
    }
}
