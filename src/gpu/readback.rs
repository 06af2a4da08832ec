//! Scoped read-back buffers and their completion handles.
//!
//! A [`ReadbackBuffer`] is acquired from a [`ReadbackPool`] when a dispatch is
//! issued and goes back to the pool when dropped, whichever path the
//! read-back takes. The backend reports the outcome through a
//! [`ReadbackCompletion`], which is delivered to the dispatcher over a
//! channel on a later tick.

use crossbeam_channel::Sender;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct PoolInner {
    free: Vec<Vec<f32>>,
    outstanding: usize,
}

/// Recycles read-back storage between dispatches.
#[derive(Debug, Clone, Default)]
pub struct ReadbackPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl ReadbackPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        // the pool holds plain vectors, a poisoned lock leaves them usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hands out a zeroed buffer of `len` floats.
    pub fn acquire(&self, len: usize) -> ReadbackBuffer {
        let mut inner = self.lock();
        let mut data = inner.free.pop().unwrap_or_default();
        data.clear();
        data.resize(len, 0.0);
        inner.outstanding += 1;
        ReadbackBuffer {
            data,
            pool: self.clone(),
        }
    }

    /// Buffers acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Buffers waiting to be reused.
    pub fn pooled(&self) -> usize {
        self.lock().free.len()
    }

    fn release(&self, data: Vec<f32>) {
        let mut inner = self.lock();
        inner.outstanding = inner.outstanding.saturating_sub(1);
        inner.free.push(data);
    }
}

/// CPU copy of one result texture, ordered `[layer][row][column]`.
#[derive(Debug)]
pub struct ReadbackBuffer {
    data: Vec<f32>,
    pool: ReadbackPool,
}

impl ReadbackBuffer {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl Deref for ReadbackBuffer {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl DerefMut for ReadbackBuffer {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl Drop for ReadbackBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.data));
    }
}

#[derive(Debug)]
pub(crate) enum ReadbackMessage {
    Completed {
        ticket: u64,
        buffer: ReadbackBuffer,
    },
    Failed {
        ticket: u64,
        reason: String,
        buffer: Option<ReadbackBuffer>,
    },
}

impl ReadbackMessage {
    pub(crate) fn ticket(&self) -> u64 {
        match self {
            Self::Completed { ticket, .. } | Self::Failed { ticket, .. } => *ticket,
        }
    }
}

/// One-shot completion handle for an outstanding read-back.
///
/// Exactly one message reaches the dispatcher per handle: `complete`, `fail`,
/// or an "abandoned" failure when the handle is dropped unused.
#[derive(Debug)]
pub struct ReadbackCompletion {
    ticket: u64,
    sender: Option<Sender<ReadbackMessage>>,
}

impl ReadbackCompletion {
    pub(crate) fn new(ticket: u64, sender: Sender<ReadbackMessage>) -> Self {
        Self {
            ticket,
            sender: Some(sender),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Delivers a filled buffer.
    pub fn complete(mut self, buffer: ReadbackBuffer) {
        self.send(ReadbackMessage::Completed {
            ticket: self.ticket,
            buffer,
        });
    }

    /// Reports a failed transfer; the buffer is handed back for disposal.
    pub fn fail(mut self, buffer: ReadbackBuffer, reason: impl Into<String>) {
        self.send(ReadbackMessage::Failed {
            ticket: self.ticket,
            reason: reason.into(),
            buffer: Some(buffer),
        });
    }

    fn send(&mut self, message: ReadbackMessage) {
        if let Some(sender) = self.sender.take() {
            // a closed channel drops the message, which releases its buffer
            let _ = sender.send(message);
        }
    }
}

impl Drop for ReadbackCompletion {
    fn drop(&mut self) {
        if self.sender.is_some() {
            let ticket = self.ticket;
            self.send(ReadbackMessage::Failed {
                ticket,
                reason: "read-back abandoned by backend".into(),
                buffer: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_returns_buffer_to_pool() {
        let pool = ReadbackPool::new();
        let buffer = pool.acquire(16);
        assert_eq!(buffer.len(), 16);
        assert_eq!(pool.outstanding(), 1);

        drop(buffer);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.pooled(), 1);

        let mut reused = pool.acquire(4);
        assert_eq!(pool.pooled(), 0);
        assert!(reused.iter().all(|v| *v == 0.0));
        reused.as_mut_slice()[0] = 1.0;
        assert_eq!(reused[0], 1.0);
    }

    #[test]
    fn test_completion_sends_exactly_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let pool = ReadbackPool::new();

        ReadbackCompletion::new(3, tx.clone()).complete(pool.acquire(2));
        let message = rx.try_recv().unwrap();
        assert!(matches!(message, ReadbackMessage::Completed { ticket: 3, .. }));
        assert!(rx.try_recv().is_err());
        drop(message);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_dropped_completion_reports_abandoned() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(ReadbackCompletion::new(9, tx));
        match rx.try_recv().unwrap() {
            ReadbackMessage::Failed { ticket, buffer, .. } => {
                assert_eq!(ticket, 9);
                assert!(buffer.is_none());
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_closed_channel_still_releases_buffer() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let pool = ReadbackPool::new();
        ReadbackCompletion::new(1, tx).fail(pool.acquire(8), "device lost");
        assert_eq!(pool.outstanding(), 0);
    }
}
