//! MeasurementPool - checkout/return pool of measurement buffers
//!
//! A tick checks a buffer out (exclusive), fills it, and hands the
//! `PooledMeasurement` to transport. Dropping the guard, wherever that
//! happens, puts the buffer back on the idle list so steady-state ticks
//! reuse already-grown storage instead of allocating.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::LidarMeasurement;

/// Shared pool of measurement buffers for one channel layout
#[derive(Clone)]
pub struct MeasurementPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    channel_count: u32,
    max_idle: usize,
    idle: Mutex<Vec<LidarMeasurement>>,
    created: AtomicU64,
    reused: AtomicU64,
    returned: AtomicU64,
    discarded: AtomicU64,
}

/// Pool counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers allocated because the idle list was empty
    pub created: u64,
    /// Checkouts served from the idle list
    pub reused: u64,
    /// Buffers put back on the idle list
    pub returned: u64,
    /// Buffers dropped because the idle list was full
    pub discarded: u64,
    /// Buffers currently idle
    pub idle: usize,
}

impl MeasurementPool {
    /// Create a pool for `channel_count` channels keeping at most
    /// `max_idle` buffers around
    pub fn new(channel_count: u32, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                channel_count,
                max_idle,
                idle: Mutex::new(Vec::with_capacity(max_idle)),
                created: AtomicU64::new(0),
                reused: AtomicU64::new(0),
                returned: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Take a buffer for exclusive use.
    ///
    /// The content is whatever the previous user left; callers reset it.
    pub fn checkout(&self) -> PooledMeasurement {
        let recycled = self.inner.lock_idle().pop();
        let measurement = match recycled {
            Some(m) => {
                self.inner.reused.fetch_add(1, Ordering::Relaxed);
                m
            }
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                trace!(
                    channels = self.inner.channel_count,
                    "allocating new measurement buffer"
                );
                LidarMeasurement::new(self.inner.channel_count)
            }
        };

        PooledMeasurement {
            measurement,
            pool: Some(Arc::clone(&self.inner)),
        }
    }

    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.inner.channel_count
    }

    /// Number of idle buffers
    pub fn idle_len(&self) -> usize {
        self.inner.lock_idle().len()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.inner.created.load(Ordering::Relaxed),
            reused: self.inner.reused.load(Ordering::Relaxed),
            returned: self.inner.returned.load(Ordering::Relaxed),
            discarded: self.inner.discarded.load(Ordering::Relaxed),
            idle: self.idle_len(),
        }
    }
}

impl fmt::Debug for MeasurementPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementPool")
            .field("channel_count", &self.inner.channel_count)
            .field("max_idle", &self.inner.max_idle)
            .field("stats", &self.stats())
            .finish()
    }
}

impl PoolInner {
    fn lock_idle(&self) -> MutexGuard<'_, Vec<LidarMeasurement>> {
        // A panic while holding the lock cannot leave the Vec inconsistent
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn give_back(&self, measurement: LidarMeasurement) {
        let mut idle = self.lock_idle();
        if idle.len() < self.max_idle {
            idle.push(measurement);
            self.returned.fetch_add(1, Ordering::Relaxed);
        } else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Exclusive handle to a pooled buffer; returns it to the pool on drop
pub struct PooledMeasurement {
    measurement: LidarMeasurement,
    pool: Option<Arc<PoolInner>>,
}

impl PooledMeasurement {
    /// Detach the buffer from its pool
    pub fn into_inner(mut self) -> LidarMeasurement {
        self.pool = None;
        std::mem::take(&mut self.measurement)
    }
}

impl Deref for PooledMeasurement {
    type Target = LidarMeasurement;

    #[inline]
    fn deref(&self) -> &LidarMeasurement {
        &self.measurement
    }
}

impl DerefMut for PooledMeasurement {
    #[inline]
    fn deref_mut(&mut self) -> &mut LidarMeasurement {
        &mut self.measurement
    }
}

impl Drop for PooledMeasurement {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.give_back(std::mem::take(&mut self.measurement));
        }
    }
}

impl fmt::Debug for PooledMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledMeasurement")
            .field("points", &self.measurement.point_count())
            .field("channels", &self.measurement.channel_count())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}
