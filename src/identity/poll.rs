//! Bounded polling of tenant provisioning status
//!
//! The loop re-fetches on a fixed schedule until the tenant is terminal or the
//! attempt budget runs out. A failed fetch ends the poll unless the caller
//! opted into `transient_retries`, which only ever re-issues transport
//! failures.

use super::types::TenantStatus;
use crate::error::BackendError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30000;
const JITTER_FACTOR: f64 = 0.3;

/// Anything that can produce a tenant status snapshot
pub trait StatusSource {
    fn fetch_status(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = Result<TenantStatus, BackendError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Extra tries for a fetch that failed at the transport level. 0 keeps
    /// the strict behaviour: the first failure aborts the poll.
    pub transient_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            transient_retries: 0,
        }
    }
}

impl PollOptions {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval_ms(self, interval_ms: u64) -> Self {
        self.interval(Duration::from_millis(interval_ms))
    }

    pub fn transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }
}

/// Poll `source` until the tenant is `active` or `failed`.
///
/// `on_progress` sees every snapshot exactly once, before the terminal check.
/// After each non-terminal snapshot the loop sleeps for `options.interval`;
/// once `max_attempts` fetches have come back non-terminal it fails with
/// [`BackendError::PollingTimeout`]. Fetch errors propagate unchanged.
pub async fn poll_tenant_status<S, F>(
    source: &S,
    tenant_id: &str,
    options: &PollOptions,
    mut on_progress: F,
) -> Result<TenantStatus, BackendError>
where
    S: StatusSource + ?Sized,
    F: FnMut(&TenantStatus),
{
    for attempt in 1..=options.max_attempts {
        let status = fetch_with_retry(source, tenant_id, options).await?;

        tracing::debug!(
            "Tenant '{}' is {} (attempt {}/{})",
            tenant_id,
            status.status,
            attempt,
            options.max_attempts
        );
        on_progress(&status);

        if status.is_terminal() {
            return Ok(status);
        }

        tokio::time::sleep(options.interval).await;
    }

    tracing::warn!(
        "Tenant '{}' still not provisioned after {} attempts",
        tenant_id,
        options.max_attempts
    );
    Err(BackendError::PollingTimeout {
        attempts: options.max_attempts,
    })
}

async fn fetch_with_retry<S>(
    source: &S,
    tenant_id: &str,
    options: &PollOptions,
) -> Result<TenantStatus, BackendError>
where
    S: StatusSource + ?Sized,
{
    let mut retries = 0;

    loop {
        match source.fetch_status(tenant_id).await {
            Err(e) if e.is_transport() && retries < options.transient_retries => {
                let wait_time = calculate_backoff_with_jitter(retries);
                tracing::warn!(
                    "Connection error: {}. Retrying in {:?}... (retry {}/{})",
                    e,
                    wait_time,
                    retries + 1,
                    options.transient_retries
                );
                tokio::time::sleep(wait_time).await;
                retries += 1;
            }
            result => return result,
        }
    }
}

/// Exponential backoff capped at 30s with +/- 30% jitter
pub(crate) fn calculate_backoff_with_jitter(attempt: u32) -> Duration {
    let base_backoff = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    let capped_backoff = base_backoff.min(MAX_BACKOFF_MS);

    let jitter_range = (capped_backoff as f64 * JITTER_FACTOR) as u64;
    let jitter = if jitter_range > 0 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::time::SystemTime::now().hash(&mut hasher);
        (hasher.finish() % (jitter_range * 2)) as i64 - jitter_range as i64
    } else {
        0
    };

    let final_backoff = (capped_backoff as i64 + jitter).max(100) as u64;
    Duration::from_millis(final_backoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::types::TenantState;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn snapshot(state: TenantState) -> TenantStatus {
        TenantStatus {
            id: "t-123".into(),
            azure_tenant_guid: None,
            name: None,
            status: state,
            admin_email: None,
            created_at: None,
            provisioned_at: None,
        }
    }

    /// Replays scripted results, then answers `pending` forever
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<TenantStatus, BackendError>>>,
        calls: AtomicU32,
        fetched_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TenantStatus, BackendError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                fetched_at: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _tenant_id: &str) -> Result<TenantStatus, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fetched_at.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(snapshot(TenantState::Pending)))
        }
    }

    fn refused() -> BackendError {
        BackendError::transport("Network error fetching tenant status", "connection refused")
    }

    #[test]
    fn test_default_options() {
        let options = PollOptions::default();
        assert_eq!(options.max_attempts, 60);
        assert_eq!(options.interval, Duration::from_millis(5000));
        assert_eq!(options.transient_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_terminal_snapshot() {
        let source = ScriptedSource::new(vec![Ok(snapshot(TenantState::Active))]);
        let mut seen = Vec::new();

        let status = poll_tenant_status(&source, "t-123", &PollOptions::default(), |s| {
            seen.push(s.status.clone())
        })
        .await
        .unwrap();

        assert_eq!(status.status, TenantState::Active);
        assert_eq!(seen, vec![TenantState::Active]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_terminal_too() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(TenantState::Pending)),
            Ok(snapshot(TenantState::Failed)),
        ]);

        let status = poll_tenant_status(&source, "t-123", &PollOptions::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(status.status, TenantState::Failed);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_provisioning_active_sequence() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(TenantState::Pending)),
            Ok(snapshot(TenantState::Provisioning)),
            Ok(snapshot(TenantState::Active)),
        ]);
        let options = PollOptions::default().max_attempts(5);
        let mut progress = Vec::new();

        let status = poll_tenant_status(&source, "t-123", &options, |s| {
            progress.push(s.status.clone())
        })
        .await
        .unwrap();

        assert_eq!(status.status, TenantState::Active);
        assert_eq!(source.calls(), 3);
        assert_eq!(
            progress,
            vec![
                TenantState::Pending,
                TenantState::Provisioning,
                TenantState::Active
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_exact_attempts_and_sleeps() {
        let source = ScriptedSource::new(Vec::new());
        let options = PollOptions::default().max_attempts(4).interval_ms(250);
        let started = Instant::now();
        let mut progress_calls = 0;

        let err = poll_tenant_status(&source, "t-123", &options, |_| progress_calls += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::PollingTimeout { attempts: 4 }));
        assert_eq!(err.status_code(), None);
        assert_eq!(source.calls(), 4);
        assert_eq!(progress_calls, 4);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));

        let fetched_at = source.fetched_at.lock().unwrap();
        for pair in fetched_at.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_state_keeps_polling() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(TenantState::Other("queued".into()))),
            Ok(snapshot(TenantState::Active)),
        ]);

        let status = poll_tenant_status(&source, "t-123", &PollOptions::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(status.status, TenantState::Active);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_times_out_without_fetching() {
        let source = ScriptedSource::new(vec![Ok(snapshot(TenantState::Active))]);
        let options = PollOptions::default().max_attempts(0);

        let err = poll_tenant_status(&source, "t-123", &options, |_| {})
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_aborts_poll() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(TenantState::Pending)),
            Err(refused()),
            Ok(snapshot(TenantState::Active)),
        ]);
        let mut progress_calls = 0;

        let err = poll_tenant_status(&source, "t-123", &PollOptions::default(), |_| {
            progress_calls += 1
        })
        .await
        .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(source.calls(), 2);
        assert_eq!(progress_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_aborts_poll_with_status() {
        let source = ScriptedSource::new(vec![Err(BackendError::Http {
            status: 404,
            message: "Failed to fetch tenant status: 404".into(),
            details: None,
        })]);

        let err = poll_tenant_status(&source, "t-123", &PollOptions::default(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retries_recover_from_transport_blip() {
        let source = ScriptedSource::new(vec![
            Err(refused()),
            Err(refused()),
            Ok(snapshot(TenantState::Active)),
        ]);
        let options = PollOptions::default().max_attempts(1).transient_retries(2);

        let status = poll_tenant_status(&source, "t-123", &options, |_| {})
            .await
            .unwrap();

        assert_eq!(status.status, TenantState::Active);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retries_are_bounded() {
        let source = ScriptedSource::new(vec![Err(refused()), Err(refused()), Err(refused())]);
        let options = PollOptions::default().transient_retries(1);

        let err = poll_tenant_status(&source, "t-123", &options, |_| {})
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retries_skip_http_errors() {
        let source = ScriptedSource::new(vec![Err(BackendError::Http {
            status: 500,
            message: "Failed to fetch tenant status: 500".into(),
            details: None,
        })]);
        let options = PollOptions::default().transient_retries(3);

        let err = poll_tenant_status(&source, "t-123", &options, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        for attempt in 0..10 {
            let wait = calculate_backoff_with_jitter(attempt);
            assert!(wait >= Duration::from_millis(100));
            assert!(wait <= Duration::from_millis(39000));
        }
        assert!(calculate_backoff_with_jitter(40) <= Duration::from_millis(39000));
    }
}
