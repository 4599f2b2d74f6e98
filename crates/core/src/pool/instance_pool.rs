use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("No engine instance became available within {0:?}")]
    Timeout(Duration),
}

struct Slots<E> {
    idle_tx: Sender<E>,
    idle_rx: Receiver<E>,
    capacity: usize,
}

/// Fixed-capacity pool of engine instances.
///
/// Idle instances live in a bounded channel sized to the pool, so waiters
/// block inside the channel rather than polling. Checkout hands out a
/// [`PooledEngine`] guard that puts the instance back when dropped, which
/// keeps `checked_out + available == capacity` on every exit path.
pub struct InstancePool<E> {
    slots: Arc<Slots<E>>,
}

impl<E> Clone for InstancePool<E> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<E> InstancePool<E> {
    /// Builds a pool owning every given instance. Capacity is fixed to their
    /// count for the lifetime of the pool.
    pub fn new(instances: Vec<E>) -> Self {
        let capacity = instances.len();
        let (idle_tx, idle_rx) = crossbeam_channel::bounded(capacity.max(1));
        for instance in instances {
            // Cannot fail: the channel has room for every instance and we
            // hold the receiver.
            let _ = idle_tx.send(instance);
        }
        Self {
            slots: Arc::new(Slots {
                idle_tx,
                idle_rx,
                capacity,
            }),
        }
    }

    /// Blocks until an instance is idle or `timeout` elapses.
    pub fn acquire(&self, timeout: Duration) -> Result<PooledEngine<E>, PoolError> {
        match self.slots.idle_rx.recv_timeout(timeout) {
            Ok(engine) => Ok(PooledEngine {
                engine: Some(engine),
                slots: Arc::clone(&self.slots),
            }),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                Err(PoolError::Timeout(timeout))
            }
        }
    }

    /// Takes an instance only if one is idle right now.
    pub fn try_acquire(&self) -> Option<PooledEngine<E>> {
        self.slots.idle_rx.try_recv().ok().map(|engine| PooledEngine {
            engine: Some(engine),
            slots: Arc::clone(&self.slots),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity
    }

    pub fn available_count(&self) -> usize {
        self.slots.idle_rx.len()
    }

    pub fn checked_out(&self) -> usize {
        self.capacity() - self.available_count()
    }
}

/// Exclusive checkout of one engine instance.
///
/// Returning the instance is not a method call: dropping the guard is the
/// only release path, so it happens exactly once.
pub struct PooledEngine<E> {
    engine: Option<E>,
    slots: Arc<Slots<E>>,
}

impl<E> Deref for PooledEngine<E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine.as_ref().expect("engine present until drop")
    }
}

impl<E> DerefMut for PooledEngine<E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine.as_mut().expect("engine present until drop")
    }
}

impl<E> Drop for PooledEngine<E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            let sent = self.slots.idle_tx.try_send(engine);
            debug_assert!(sent.is_ok(), "pool received more instances than its capacity");
        }
    }
}
