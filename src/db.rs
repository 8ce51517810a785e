use crate::config::Config;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_CAP_MS: u64 = 30_000;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Exponential backoff schedule: `min(base · 2^retry_count, cap)`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub cap_ms: u64,
    /// Consecutive failures before escalating the log level. The supervisor
    /// never stops retrying; see DESIGN.md.
    pub max_retries: u32,
}

impl BackoffPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_ms: BACKOFF_BASE_MS,
            cap_ms: BACKOFF_CAP_MS,
            max_retries: config.db_max_retries,
        }
    }

    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exp = retry_count.min(32);
        let ms = self.base_ms.saturating_mul(1u64 << exp).min(self.cap_ms);
        Duration::from_millis(ms)
    }
}

/// Process-wide connection state, shared with the HTTP layer for `/health`.
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: AtomicBool,
    retry_count: AtomicU32,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    fn record_success(&self) {
        self.connected.store(true, Ordering::Relaxed);
        self.retry_count.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) -> u32 {
        self.connected.store(false, Ordering::Relaxed);
        self.retry_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Owns the pool and the single reconnect loop for the process lifetime.
///
/// `start` gates on a first successful liveness probe, then hands the same
/// backoff state machine to a heartbeat monitor task, so at most one
/// reconnect attempt is ever scheduled.
pub struct ConnectionSupervisor {
    pool: MySqlPool,
    state: Arc<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    monitor: tokio::task::JoinHandle<()>,
}

impl ConnectionSupervisor {
    pub async fn start(config: &Config) -> Result<Self, sqlx::Error> {
        let policy = BackoffPolicy::from_config(config);
        let heartbeat = Duration::from_secs(config.db_heartbeat_secs);

        // A malformed URL cannot be retried into working; fail startup.
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(60))
            .connect_lazy(&config.database_url)?;

        let state = Arc::new(ConnectionState::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("Connecting to database...");
        {
            let mut rx = shutdown_rx.clone();
            let pool = pool.clone();
            retry_until_connected(&state, policy, || ping(&pool), &mut rx).await;
        }

        let monitor = tokio::spawn(monitor_loop(
            pool.clone(),
            state.clone(),
            policy,
            heartbeat,
            shutdown_rx,
        ));

        Ok(Self {
            pool,
            state,
            shutdown_tx,
            monitor,
        })
    }

    pub fn pool(&self) -> MySqlPool {
        self.pool.clone()
    }

    pub fn state(&self) -> Arc<ConnectionState> {
        self.state.clone()
    }

    /// Stops the monitor and closes the pool under a bounded wait.
    pub async fn shutdown(self) -> std::io::Result<()> {
        let _ = self.shutdown_tx.send(true);
        let _ = self.monitor.await;

        match tokio::time::timeout(CLOSE_TIMEOUT, self.pool.close()).await {
            Ok(()) => {
                info!("Database connection closed");
                Ok(())
            }
            Err(_) => {
                error!("Timed out closing database connection");
                Err(std::io::Error::other("database connection close timed out"))
            }
        }
    }
}

async fn ping(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Probes until success or shutdown, sleeping the backoff delay between
/// attempts. Returns false when interrupted by shutdown.
async fn retry_until_connected<F, Fut>(
    state: &ConnectionState,
    policy: BackoffPolicy,
    mut probe: F,
    shutdown: &mut watch::Receiver<bool>,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    loop {
        if *shutdown.borrow() {
            return false;
        }

        match probe().await {
            Ok(()) => {
                state.record_success();
                info!("Database connection established");
                return true;
            }
            Err(e) => {
                let retries = state.record_failure();
                let delay = policy.delay_for(retries);
                if retries >= policy.max_retries {
                    error!(
                        error = %e,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        "Database still unreachable after retry budget; continuing to retry"
                    );
                } else {
                    warn!(
                        error = %e,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        "Database connection failed; retrying"
                    );
                }

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return false;
                        }
                    }
                }
            }
        }
    }
}

/// Heartbeat half of the state machine: probes on a fixed period while
/// connected and re-enters the shared backoff loop on a failed probe.
async fn monitor_loop(
    pool: MySqlPool,
    state: Arc<ConnectionState>,
    policy: BackoffPolicy,
    heartbeat: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(heartbeat) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        if ping(&pool).await.is_ok() {
            state.record_success();
            continue;
        }

        warn!("Database heartbeat failed; reconnecting");
        if !retry_until_connected(&state, policy, || ping(&pool), &mut shutdown_rx).await {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;
    use tokio::time::Instant;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base_ms: BACKOFF_BASE_MS,
            cap_ms: BACKOFF_CAP_MS,
            max_retries: 5,
        }
    }

    #[test]
    fn backoff_delays_are_non_decreasing_and_capped() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for retry in 1..20 {
            let delay = policy.delay_for(retry);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(BACKOFF_CAP_MS));
            previous = delay;
        }
        assert_eq!(policy.delay_for(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(16_000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for(100), Duration::from_millis(30_000));
    }

    #[test]
    fn state_transitions() {
        let state = ConnectionState::default();
        assert!(!state.is_connected());

        assert_eq!(state.record_failure(), 1);
        assert_eq!(state.record_failure(), 2);
        assert!(!state.is_connected());

        state.record_success();
        assert!(state.is_connected());
        assert_eq!(state.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_backoff_until_success() {
        let state = ConnectionState::default();
        let attempts = AtomicU32::new(0);
        let instants: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
        let (_tx, mut rx) = watch::channel(false);

        let connected = retry_until_connected(
            &state,
            policy(),
            || {
                instants.lock().unwrap().push(Instant::now());
                let n = attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    if n < 3 {
                        Err(sqlx::Error::PoolClosed)
                    } else {
                        Ok(())
                    }
                }
            },
            &mut rx,
        )
        .await;

        assert!(connected);
        assert!(state.is_connected());
        assert_eq!(state.retry_count(), 0);

        // Three failures, then success on the fourth attempt, with the
        // 2s / 4s / 8s schedule between them.
        let instants = instants.lock().unwrap();
        assert_eq!(instants.len(), 4);
        let gaps: Vec<Duration> = instants.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(2_000),
                Duration::from_millis(4_000),
                Duration::from_millis(8_000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_retry_loop() {
        let state = ConnectionState::default();
        let (tx, mut rx) = watch::channel(false);

        let retry = retry_until_connected(
            &state,
            policy(),
            || async { Err(sqlx::Error::PoolClosed) },
            &mut rx,
        );
        tokio::pin!(retry);

        // Let a couple of failures accumulate, then signal shutdown.
        tokio::select! {
            _ = &mut retry => panic!("loop must not finish while probes fail"),
            _ = tokio::time::sleep(Duration::from_secs(5)) => {}
        }
        tx.send(true).unwrap();

        assert!(!retry.await);
        assert!(!state.is_connected());
    }
}
