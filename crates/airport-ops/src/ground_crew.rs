//! Background ground crew.
//!
//! Moves one landed aircraft to a parking spot per tick, freeing the runway.
//! Runs on tokio; each sweep goes through [`tokio::task::spawn_blocking`]
//! because the control tower holds a blocking SQLite connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::tower::ControlTower;

/// Cloneable handle used to stop a running [`GroundCrew`].
#[derive(Debug, Clone, Default)]
pub struct GroundCrewHandle {
    stop_signal: Arc<AtomicBool>,
    wake: Arc<Notify>,
    parked: Arc<AtomicU64>,
}

impl GroundCrewHandle {
    /// Ask the crew to stop after the current sweep.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Aircraft parked since the crew started.
    #[must_use]
    pub fn parked_count(&self) -> u64 {
        self.parked.load(Ordering::SeqCst)
    }
}

/// Periodic landed-to-parked sweeper.
#[derive(Debug)]
pub struct GroundCrew {
    tower: Arc<ControlTower>,
    interval: Duration,
    handle: GroundCrewHandle,
}

impl GroundCrew {
    /// Create a crew sweeping `tower` every `interval`.
    #[must_use]
    pub fn new(tower: Arc<ControlTower>, interval: Duration) -> Self {
        Self {
            tower,
            interval,
            handle: GroundCrewHandle::default(),
        }
    }

    /// Handle for stopping the crew from another task.
    #[must_use]
    pub fn handle(&self) -> GroundCrewHandle {
        self.handle.clone()
    }

    /// Sweep once on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep fails or the blocking task panics.
    pub async fn sweep_once(&self) -> Result<Option<String>> {
        let tower = Arc::clone(&self.tower);
        let parked = tokio::task::spawn_blocking(move || tower.sweep_landed_to_parked())
            .await
            .map_err(|e| Error::internal(format!("ground crew task failed: {e}")))??;

        if parked.is_some() {
            self.handle.parked.fetch_add(1, Ordering::SeqCst);
        }
        Ok(parked)
    }

    /// Sweep every interval until stopped.
    ///
    /// The first sweep happens one full interval after start. A failed sweep
    /// is logged and the crew keeps going.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs_f64(), "Ground crew started");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.handle.should_stop() {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.handle.wake.notified() => continue,
            }

            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Ground crew sweep failed");
            }
        }

        debug!(parked = self.handle.parked_count(), "Ground crew stopped");
    }
}
