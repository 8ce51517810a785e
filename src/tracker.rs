use crate::client::{AttendanceClient, ClientError};
use crate::model::attendance::LocationStamp;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Sampling period used by the stock agent.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("position unavailable: {0}")]
    Position(String),

    #[error(transparent)]
    Push(#[from] ClientError),
}

/// Device positioning capability. Implementations wrap whatever the host
/// platform offers (browser geolocation bridge, GPS daemon, test fixture).
pub trait LocationProvider: Send + Sync + 'static {
    fn current_position(
        &self,
    ) -> impl Future<Output = Result<LocationStamp, TrackerError>> + Send;
}

/// Destination for accepted samples.
pub trait LocationSink: Send + Sync + 'static {
    fn push(&self, sample: &LocationStamp) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

/// Pushes samples to the attendance API's location endpoint.
pub struct HttpLocationSink {
    client: Arc<AttendanceClient>,
}

impl HttpLocationSink {
    pub fn new(client: Arc<AttendanceClient>) -> Self {
        Self { client }
    }
}

impl LocationSink for HttpLocationSink {
    async fn push(&self, sample: &LocationStamp) -> Result<(), TrackerError> {
        self.client.update_location(sample).await?;
        Ok(())
    }
}

/// Handle for a running tracking loop. Dropping the handle does not stop
/// the loop; call `stop`.
pub struct TrackerHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl TrackerHandle {
    /// Idempotent; safe to call repeatedly and safe after the session has
    /// already ended server-side. An in-flight tick finishes its own push
    /// but nothing further is scheduled.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub struct LocationTracker;

impl LocationTracker {
    /// Starts the periodic sampling loop. The first sample fires
    /// immediately, then every `period`.
    pub fn start<P, S>(provider: P, sink: S, period: Duration) -> TrackerHandle
    where
        P: LocationProvider,
        S: LocationSink,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        run_tick(&provider, &sink).await;
                    }
                }
            }

            debug!("Location tracking stopped");
        });

        TrackerHandle { stop_tx, task }
    }
}

/// One sampling tick. Failures are logged and swallowed: location updates
/// are best-effort telemetry and must never end the loop.
async fn run_tick<P: LocationProvider, S: LocationSink>(provider: &P, sink: &S) {
    match provider.current_position().await {
        Ok(sample) => {
            if let Err(e) = sink.push(&sample).await {
                warn!(error = %e, "Location update failed");
            }
        }
        Err(e) => warn!(error = %e, "Position acquisition failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::Coordinates;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn stamp(n: u32) -> LocationStamp {
        LocationStamp {
            coordinates: Coordinates {
                latitude: 23.78 + n as f64 * 0.001,
                longitude: 90.27,
            },
            address: None,
            last_updated: None,
        }
    }

    struct ScriptedProvider {
        calls: Arc<AtomicU32>,
        fail_on: Option<u32>,
    }

    impl LocationProvider for ScriptedProvider {
        async fn current_position(&self) -> Result<LocationStamp, TrackerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.fail_on {
                Err(TrackerError::Position("gps unavailable".to_string()))
            } else {
                Ok(stamp(n))
            }
        }
    }

    struct RecordingSink {
        pushes: Arc<Mutex<Vec<LocationStamp>>>,
    }

    impl LocationSink for RecordingSink {
        async fn push(&self, sample: &LocationStamp) -> Result<(), TrackerError> {
            self.pushes.lock().unwrap().push(sample.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_does_not_stop_the_loop() {
        let calls = Arc::new(AtomicU32::new(0));
        let pushes = Arc::new(Mutex::new(Vec::new()));

        let handle = LocationTracker::start(
            ScriptedProvider {
                calls: calls.clone(),
                fail_on: Some(2),
            },
            RecordingSink {
                pushes: pushes.clone(),
            },
            DEFAULT_PERIOD,
        );

        // Ticks at 0s, 30s, 60s and 90s; the second one fails to acquire.
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(pushes.lock().unwrap().len(), 3);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let calls = Arc::new(AtomicU32::new(0));
        let pushes = Arc::new(Mutex::new(Vec::new()));

        let handle = LocationTracker::start(
            ScriptedProvider {
                calls: calls.clone(),
                fail_on: None,
            },
            RecordingSink {
                pushes: pushes.clone(),
            },
            DEFAULT_PERIOD,
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        let pushed_before_stop = pushes.lock().unwrap().len();
        assert_eq!(pushed_before_stop, 2);

        handle.stop();
        // Repeated stop is a no-op.
        handle.stop();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(pushes.lock().unwrap().len(), pushed_before_stop);
        assert!(handle.is_finished());
    }
}
