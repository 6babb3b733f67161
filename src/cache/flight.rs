//! Single-flight coordination.
//!
//! Collapses concurrent computations for the same cache key into one
//! upstream call. The first caller to register a key becomes the owner and
//! runs the computation; everyone else waits for the owner to finish, then
//! re-probes the cache. Registration lives in a [`DashMap`] and is released
//! by an RAII guard, so an owner that fails, times out, or is cancelled can
//! never leave the registry stuck.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use super::key::Fingerprint;

/// One wait-then-retry cycle per waiter before giving up, bounding retry
/// storms when owners fail repeatedly.
const MAX_WAIT_CYCLES: u32 = 2;

#[derive(Debug, Error)]
pub enum FlightError<E> {
    /// The caller owned the computation and it failed.
    #[error(transparent)]
    Compute(E),
    /// Every wait cycle ended with the owner leaving nothing cached and
    /// another caller already owning the retry.
    #[error("computation for key `{key}` kept failing under contention")]
    Exhausted { key: Fingerprint },
}

/// Per-key in-flight registry. Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct SingleFlight {
    in_flight: Arc<DashMap<Fingerprint, Arc<Notify>>>,
    waiter_timeout: Duration,
}

/// Releases the in-flight registration and wakes waiters when dropped.
struct FlightGuard {
    key: Fingerprint,
    in_flight: Arc<DashMap<Fingerprint, Arc<Notify>>>,
    notify: Arc<Notify>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
        self.notify.notify_waiters();
    }
}

enum Attempt {
    Owner(FlightGuard),
    Busy(Arc<Notify>),
}

impl SingleFlight {
    pub fn new(waiter_timeout: Duration) -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            waiter_timeout,
        }
    }

    /// Number of computations currently registered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn try_begin(&self, key: &Fingerprint) -> Attempt {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                let notify = Arc::new(Notify::new());
                vacant.insert(Arc::clone(&notify));
                Attempt::Owner(FlightGuard {
                    key: key.clone(),
                    in_flight: Arc::clone(&self.in_flight),
                    notify,
                })
            }
            Entry::Occupied(occupied) => Attempt::Busy(Arc::clone(occupied.get())),
        }
    }

    /// Runs `compute` for `key`, ensuring at most one execution is in flight
    /// process-wide.
    ///
    /// `probe` checks the cache; owners are expected to store their result
    /// there before `compute` returns, so released waiters find it via
    /// `probe`. A waiter whose owner finished with nothing cached (failure
    /// or timeout) retries once, acquiring ownership itself if the key is
    /// free; after [`MAX_WAIT_CYCLES`] fruitless waits it gives up with
    /// [`FlightError::Exhausted`].
    pub async fn run_exclusive<T, E, P, PFut, C, CFut>(
        &self,
        key: &Fingerprint,
        probe: P,
        compute: C,
    ) -> Result<T, FlightError<E>>
    where
        P: Fn() -> PFut,
        PFut: Future<Output = Option<T>>,
        C: FnOnce() -> CFut,
        CFut: Future<Output = Result<T, E>>,
    {
        let mut compute = Some(compute);
        let mut cycles = 0u32;

        loop {
            match self.try_begin(key) {
                Attempt::Owner(guard) => {
                    let Some(compute) = compute.take() else {
                        // Unreachable: ownership returns below on first win.
                        return Err(FlightError::Exhausted { key: key.clone() });
                    };
                    counter!("waypost_flight_owner_total").increment(1);
                    debug!(key = %key, "single-flight ownership acquired");
                    let result = compute().await.map_err(FlightError::Compute);
                    // Deregistration and waiter wake-up happen on every exit
                    // path, success or failure, via the guard.
                    drop(guard);
                    return result;
                }
                Attempt::Busy(notify) => {
                    if cycles >= MAX_WAIT_CYCLES {
                        return Err(FlightError::Exhausted { key: key.clone() });
                    }
                    cycles += 1;
                    counter!("waypost_flight_wait_total").increment(1);
                    debug!(key = %key, cycle = cycles, "waiting on in-flight computation");

                    // Subscribe before probing so an owner finishing between
                    // the probe and the await cannot be missed.
                    let released = notify.notified();
                    tokio::pin!(released);
                    if let Some(value) = probe().await {
                        return Ok(value);
                    }
                    if tokio::time::timeout(self.waiter_timeout, &mut released)
                        .await
                        .is_err()
                    {
                        debug!(key = %key, "waiter timed out, attempting ownership");
                    }
                    if let Some(value) = probe().await {
                        return Ok(value);
                    }
                    counter!("waypost_flight_retry_total").increment(1);
                }
            }
        }
    }
}
