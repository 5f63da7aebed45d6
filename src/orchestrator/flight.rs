//! In-flight load table
//!
//! Maps a key to the watch channel of the load currently running for it. The
//! first caller to miss becomes the leader and owns the sender; everyone else
//! subscribes and waits for the leader's result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{CacheError, LoadError, Result};

/// Slot shared by the waiters of one load; `None` until the load finishes.
pub(crate) type FlightSlot<V> = Option<std::result::Result<V, LoadError>>;

type FlightMap<V> = HashMap<String, watch::Receiver<FlightSlot<V>>>;

/// Outcome of joining the table for a key.
pub(crate) enum Joined<V> {
    /// The value showed up locally while the table was locked
    Ready(V),
    /// This caller must run the load
    Leader(FlightGuard<V>, watch::Receiver<FlightSlot<V>>),
    /// A load is already running; wait on it
    Follower(watch::Receiver<FlightSlot<V>>),
}

#[derive(Debug)]
pub(crate) struct FlightTable<V> {
    flights: Arc<Mutex<FlightMap<V>>>,
}

impl<V> Default for FlightTable<V> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<V>(flights: &Mutex<FlightMap<V>>) -> MutexGuard<'_, FlightMap<V>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V: Clone> FlightTable<V> {
    /// Joins the load for `key`, or registers a new one.
    ///
    /// `recheck` runs under the table lock before a new load is registered,
    /// so a load that completed between the caller's miss and this call is
    /// not started again.
    pub(crate) fn join(&self, key: &str, recheck: impl FnOnce() -> Option<V>) -> Joined<V> {
        let mut flights = lock(&self.flights);

        if let Some(rx) = flights.get(key) {
            return Joined::Follower(rx.clone());
        }

        if let Some(value) = recheck() {
            return Joined::Ready(value);
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(key.to_string(), rx.clone());

        let guard = FlightGuard {
            key: key.to_string(),
            flights: Arc::clone(&self.flights),
            tx: Some(tx),
            released: false,
        };
        Joined::Leader(guard, rx)
    }

    /// Number of loads currently running.
    pub(crate) fn len(&self) -> usize {
        lock(&self.flights).len()
    }
}

/// Ownership of a running load.
///
/// Dropping the guard without completing it (the load task panicked or was
/// aborted) still frees the key; waiters then see a closed channel.
#[derive(Debug)]
pub(crate) struct FlightGuard<V> {
    key: String,
    flights: Arc<Mutex<FlightMap<V>>>,
    tx: Option<watch::Sender<FlightSlot<V>>>,
    released: bool,
}

impl<V> FlightGuard<V> {
    /// Frees the key, then hands `result` to every waiter.
    pub(crate) fn complete(mut self, result: std::result::Result<V, LoadError>) {
        self.release();
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(result));
        }
    }

    fn release(&mut self) {
        if !self.released {
            lock(&self.flights).remove(&self.key);
            self.released = true;
        }
    }
}

impl<V> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Waits for the result published on a flight channel.
pub(crate) async fn wait<V: Clone>(
    key: &str,
    mut rx: watch::Receiver<FlightSlot<V>>,
) -> Result<V> {
    let outcome = match rx.wait_for(Option::is_some).await {
        Ok(slot) => slot.clone(),
        Err(_) => None,
    };

    match outcome {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(CacheError::Load(err)),
        None => Err(CacheError::LoadAborted(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_caller_leads_others_follow() {
        let table: FlightTable<u32> = FlightTable::default();

        let Joined::Leader(guard, leader_rx) = table.join("k", || None) else {
            panic!("first caller should lead");
        };
        let Joined::Follower(follower_rx) = table.join("k", || None) else {
            panic!("second caller should follow");
        };
        assert_eq!(table.len(), 1);

        guard.complete(Ok(5));

        assert_eq!(table.len(), 0);
        assert_eq!(wait("k", leader_rx).await.unwrap(), 5);
        assert_eq!(wait("k", follower_rx).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_recheck_short_circuits() {
        let table: FlightTable<u32> = FlightTable::default();

        assert!(matches!(table.join("k", || Some(9)), Joined::Ready(9)));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared() {
        let table: FlightTable<u32> = FlightTable::default();

        let Joined::Leader(guard, rx_a) = table.join("k", || None) else {
            panic!("first caller should lead");
        };
        let Joined::Follower(rx_b) = table.join("k", || None) else {
            panic!("second caller should follow");
        };

        guard.complete(Err(LoadError::new(anyhow::anyhow!("no row"))));

        let (Err(CacheError::Load(a)), Err(CacheError::Load(b))) =
            (wait("k", rx_a).await, wait("k", rx_b).await)
        else {
            panic!("both waiters should see the load error");
        };
        assert!(a.same_failure(&b));
    }

    #[tokio::test]
    async fn test_dropped_guard_aborts_waiters() {
        let table: FlightTable<u32> = FlightTable::default();

        let Joined::Leader(guard, rx) = table.join("k", || None) else {
            panic!("first caller should lead");
        };
        drop(guard);

        assert_eq!(table.len(), 0);
        assert!(matches!(wait("k", rx).await, Err(CacheError::LoadAborted(_))));
    }

    #[tokio::test]
    async fn test_completed_guard_does_not_free_next_flight() {
        let table: FlightTable<u32> = FlightTable::default();

        let Joined::Leader(first, _rx) = table.join("k", || None) else {
            panic!("first caller should lead");
        };
        first.complete(Ok(1));

        let Joined::Leader(_second, _rx2) = table.join("k", || None) else {
            panic!("a new load should start after completion");
        };
        assert_eq!(table.len(), 1);
    }
}
