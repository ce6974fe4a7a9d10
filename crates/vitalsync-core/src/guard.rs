//! Bounded-wait reads against the native store.
//!
//! Each native call runs on its own task and races a timer. The winner is
//! decided by a [`Settle`] slot: whoever resolves it first delivers the
//! result, every later resolution is a no-op. The native call is never
//! cancelled (platform APIs may not support it); when it finishes after the
//! timer its output is dropped and counted, never handed to anyone.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::{Semaphore, oneshot};
use tokio::time::Instant;

use crate::config::{DEFAULT_MAX_CONCURRENT_READS, DEFAULT_NATIVE_TIMEOUT_MS};
use crate::error::SourceError;
use crate::range::DateRange;
use crate::source::{DataPoint, NativeHealthSource};

/// Single-assignment result slot. The first `resolve` wins.
pub struct Settle<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settle<T> {
    /// Create a slot and the receiver that observes its one value.
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
        });
        (slot, rx)
    }

    /// Claim the slot with `value`. Returns `false` if it was already settled,
    /// in which case `value` is dropped.
    pub fn resolve(&self, value: T) -> bool {
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // A dropped receiver means the caller went away; the slot is
                // still claimed.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        match self.tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Why a guarded read produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The timer fired first.
    TimedOut,
    /// The source returned an error or panicked.
    Failed,
    /// The source answered with nothing usable.
    NoData,
}

/// Result of a guarded read. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardedRead<T> {
    Ready(T),
    Unavailable(UnavailableReason),
}

impl<T> GuardedRead<T> {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Unavailable(_) => None,
        }
    }
}

/// Counters exposed for health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardStats {
    pub reads: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub late_discarded: u64,
}

#[derive(Default)]
struct GuardCounters {
    reads: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    late_discarded: AtomicU64,
}

enum Outcome<T> {
    Value(T),
    Empty,
    Error(SourceError),
    Panicked,
    TimedOut,
}

/// Wraps a [`NativeHealthSource`] so that no read waits longer than the
/// configured timeout.
///
/// At most `max_in_flight` native calls run at once. A call holds its permit
/// until it really finishes, including after the caller has timed out, so a
/// hung store cannot accumulate abandoned calls.
#[derive(Clone)]
pub struct TimeoutGuardedReader {
    source: Arc<dyn NativeHealthSource>,
    timeout: Duration,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    counters: Arc<GuardCounters>,
}

impl TimeoutGuardedReader {
    pub fn new(source: Arc<dyn NativeHealthSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_READS)),
            max_in_flight: DEFAULT_MAX_CONCURRENT_READS,
            counters: Arc::new(GuardCounters::default()),
        }
    }

    /// Cap concurrent native calls (at least one).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        self.permits = Arc::new(Semaphore::new(max_in_flight));
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Native calls currently holding a permit, abandoned ones included.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Reader with the default 5 s bound.
    pub fn with_default_timeout(source: Arc<dyn NativeHealthSource>) -> Self {
        Self::new(source, Duration::from_millis(DEFAULT_NATIVE_TIMEOUT_MS))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scalar read for one metric and day.
    pub async fn read(&self, metric_id: &str, date: NaiveDate) -> GuardedRead<f64> {
        let source = Arc::clone(&self.source);
        let id = metric_id.to_owned();
        let call = async move { source.read_scalar(&id, date).await };
        match self.race(metric_id, call).await {
            GuardedRead::Ready(v) if !v.is_finite() => {
                debug!("{metric_id}: native returned non-finite value {v}, treating as no data");
                GuardedRead::Unavailable(UnavailableReason::NoData)
            }
            other => other,
        }
    }

    /// Range read for one metric. An empty answer counts as no data.
    pub async fn read_range(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> GuardedRead<Vec<DataPoint>> {
        let source = Arc::clone(&self.source);
        let id = metric_id.to_owned();
        let call = async move {
            source
                .read_range(&id, range)
                .await
                .map(|points| if points.is_empty() { None } else { Some(points) })
        };
        self.race(metric_id, call).await
    }

    pub fn stats(&self) -> GuardStats {
        GuardStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            late_discarded: self.counters.late_discarded.load(Ordering::Relaxed),
        }
    }

    async fn race<T, F>(&self, metric_id: &str, call: F) -> GuardedRead<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<Option<T>, SourceError>> + Send + 'static,
    {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.timeout;

        // Waiting for a free slot counts against the same budget.
        let permit = match tokio::time::timeout_at(
            deadline,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Some(permit),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!("{metric_id}: no native slot free before the deadline");
                None
            }
        };

        let outcome = match permit {
            None => Outcome::TimedOut,
            Some(permit) => {
                let (settle, mut rx) = Settle::new();

                let native_slot = Arc::clone(&settle);
                let counters = Arc::clone(&self.counters);
                let id = metric_id.to_owned();
                tokio::spawn(async move {
                    let outcome = match AssertUnwindSafe(call).catch_unwind().await {
                        Ok(Ok(Some(v))) => Outcome::Value(v),
                        Ok(Ok(None)) => Outcome::Empty,
                        Ok(Err(e)) => Outcome::Error(e),
                        Err(_) => Outcome::Panicked,
                    };
                    drop(permit);
                    if !native_slot.resolve(outcome) {
                        counters.late_discarded.fetch_add(1, Ordering::Relaxed);
                        debug!("{id}: native result arrived after timeout, discarded");
                    }
                });

                tokio::select! {
                    delivered = &mut rx => delivered.unwrap_or(Outcome::Panicked),
                    _ = tokio::time::sleep_until(deadline) => {
                        if settle.resolve(Outcome::TimedOut) {
                            Outcome::TimedOut
                        } else {
                            // Native settled in the same instant; its value is already queued.
                            rx.await.unwrap_or(Outcome::Panicked)
                        }
                    }
                }
            }
        };

        match outcome {
            Outcome::Value(v) => GuardedRead::Ready(v),
            Outcome::Empty => {
                debug!("{metric_id}: native store has no data");
                GuardedRead::Unavailable(UnavailableReason::NoData)
            }
            Outcome::Error(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!("{metric_id}: native read failed: {e}");
                GuardedRead::Unavailable(UnavailableReason::Failed)
            }
            Outcome::Panicked => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("{metric_id}: native read panicked");
                GuardedRead::Unavailable(UnavailableReason::Failed)
            }
            Outcome::TimedOut => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "{metric_id}: native read exceeded {}ms",
                    self.timeout.as_millis()
                );
                GuardedRead::Unavailable(UnavailableReason::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicBool;

    // -----------------------------------------------------------------------
    // Mock native sources
    // -----------------------------------------------------------------------

    /// Answers with a fixed value after a fixed delay.
    struct DelayedSource {
        value: Option<f64>,
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    impl DelayedSource {
        fn new(value: Option<f64>, delay: Duration) -> Self {
            Self {
                value,
                delay,
                finished: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl NativeHealthSource for DelayedSource {
        async fn read_scalar(
            &self,
            _metric_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<f64>, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(self.value)
        }

        async fn read_range(
            &self,
            _metric_id: &str,
            range: DateRange,
        ) -> Result<Vec<DataPoint>, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(self
                .value
                .map(|v| vec![DataPoint::new(range.start_instant(), v)])
                .unwrap_or_default())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl NativeHealthSource for FailingSource {
        async fn read_scalar(&self, _: &str, _: NaiveDate) -> Result<Option<f64>, SourceError> {
            Err(SourceError::Platform("store locked".into()))
        }

        async fn read_range(&self, _: &str, _: DateRange) -> Result<Vec<DataPoint>, SourceError> {
            Err(SourceError::Platform("store locked".into()))
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl NativeHealthSource for PanickingSource {
        async fn read_scalar(&self, _: &str, _: NaiveDate) -> Result<Option<f64>, SourceError> {
            panic!("bridge crashed")
        }

        async fn read_range(&self, _: &str, _: DateRange) -> Result<Vec<DataPoint>, SourceError> {
            panic!("bridge crashed")
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    // -----------------------------------------------------------------------
    // Settle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_settle_first_writer_wins() {
        let (slot, rx) = Settle::new();
        assert!(!slot.is_settled());
        assert!(slot.resolve(1));
        assert!(slot.is_settled());
        assert!(!slot.resolve(2));
        assert_eq!(rx.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_settle_claims_even_without_receiver() {
        let (slot, rx) = Settle::new();
        drop(rx);
        assert!(slot.resolve("first"));
        assert!(!slot.resolve("second"));
    }

    // -----------------------------------------------------------------------
    // Guarded reads
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_fast_read_returns_exact_value() {
        let src = Arc::new(DelayedSource::new(Some(8123.25), Duration::from_millis(10)));
        let reader = TimeoutGuardedReader::with_default_timeout(src);
        assert_eq!(reader.read("steps", today()).await, GuardedRead::Ready(8123.25));
        let stats = reader.stats();
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.timeouts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_times_out_within_bound() {
        let src = Arc::new(DelayedSource::new(Some(1.0), Duration::from_secs(60)));
        let reader = TimeoutGuardedReader::new(src, Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        let result = reader.read("steps", today()).await;
        let waited = started.elapsed();
        assert_eq!(result, GuardedRead::Unavailable(UnavailableReason::TimedOut));
        assert!(waited >= Duration::from_secs(5));
        assert!(waited < Duration::from_secs(5) + Duration::from_millis(50));
        assert_eq!(reader.stats().timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_native_result_is_discarded() {
        let src = Arc::new(DelayedSource::new(Some(99.0), Duration::from_secs(8)));
        let finished = Arc::clone(&src.finished);
        let reader = TimeoutGuardedReader::new(src, Duration::from_secs(5));

        let result = reader.read("body_mass", today()).await;
        assert_eq!(result, GuardedRead::Unavailable(UnavailableReason::TimedOut));
        assert!(!finished.load(Ordering::SeqCst));

        // Let the abandoned native call finish.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));

        // The already-returned result is untouched and the late value was dropped.
        assert_eq!(result, GuardedRead::Unavailable(UnavailableReason::TimedOut));
        let stats = reader.stats();
        assert_eq!(stats.late_discarded, 1);
        assert_eq!(stats.timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_call_keeps_its_slot() {
        let src = Arc::new(DelayedSource::new(Some(1.0), Duration::from_secs(60)));
        let finished = Arc::clone(&src.finished);
        let reader =
            TimeoutGuardedReader::new(src, Duration::from_millis(100)).with_max_in_flight(1);

        let first = reader.read("steps", today()).await;
        assert_eq!(first, GuardedRead::Unavailable(UnavailableReason::TimedOut));
        assert_eq!(reader.in_flight(), 1);

        // The hung call still holds the only slot, so this read never reaches
        // the store and gives up after its own timeout.
        let started = tokio::time::Instant::now();
        let second = reader.read("steps", today()).await;
        assert_eq!(second, GuardedRead::Unavailable(UnavailableReason::TimedOut));
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(reader.stats().timeouts, 2);
        assert!(!finished.load(Ordering::SeqCst));

        // Once the store answers, the slot is released.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(reader.in_flight(), 0);
        assert_eq!(reader.stats().late_discarded, 1);
    }

    #[test]
    fn test_max_in_flight_is_at_least_one() {
        let src = Arc::new(FailingSource);
        let reader = TimeoutGuardedReader::with_default_timeout(src).with_max_in_flight(0);
        assert_eq!(reader.max_in_flight(), 1);
        assert_eq!(reader.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_is_no_data() {
        let src = Arc::new(DelayedSource::new(None, Duration::from_millis(1)));
        let reader = TimeoutGuardedReader::with_default_timeout(src);
        assert_eq!(
            reader.read("steps", today()).await,
            GuardedRead::Unavailable(UnavailableReason::NoData)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nan_is_no_data() {
        let src = Arc::new(DelayedSource::new(Some(f64::NAN), Duration::from_millis(1)));
        let reader = TimeoutGuardedReader::with_default_timeout(src);
        assert!(reader.read("steps", today()).await.is_unavailable());
    }

    #[tokio::test]
    async fn test_error_is_failed_not_raised() {
        let reader = TimeoutGuardedReader::with_default_timeout(Arc::new(FailingSource));
        assert_eq!(
            reader.read("steps", today()).await,
            GuardedRead::Unavailable(UnavailableReason::Failed)
        );
        assert_eq!(reader.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_panic_is_failed_not_raised() {
        let reader = TimeoutGuardedReader::with_default_timeout(Arc::new(PanickingSource));
        assert_eq!(
            reader.read("steps", today()).await,
            GuardedRead::Unavailable(UnavailableReason::Failed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_read_ready_and_empty() {
        let range = DateRange::last_days(today(), 7).unwrap();
        let reader = TimeoutGuardedReader::with_default_timeout(Arc::new(DelayedSource::new(
            Some(3.0),
            Duration::from_millis(5),
        )));
        let points = reader.read_range("steps", range).await.into_option().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 26, 0, 0, 0).unwrap());

        let empty = TimeoutGuardedReader::with_default_timeout(Arc::new(DelayedSource::new(
            None,
            Duration::from_millis(5),
        )));
        assert_eq!(
            empty.read_range("steps", range).await,
            GuardedRead::Unavailable(UnavailableReason::NoData)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_are_independent() {
        let fast = TimeoutGuardedReader::new(
            Arc::new(DelayedSource::new(Some(1.0), Duration::from_millis(100))),
            Duration::from_secs(1),
        );
        let slow = TimeoutGuardedReader::new(
            Arc::new(DelayedSource::new(Some(2.0), Duration::from_secs(3))),
            Duration::from_secs(1),
        );
        let (a, b) = tokio::join!(fast.read("a", today()), slow.read("b", today()));
        assert_eq!(a, GuardedRead::Ready(1.0));
        assert_eq!(b, GuardedRead::Unavailable(UnavailableReason::TimedOut));
    }
}
