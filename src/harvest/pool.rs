//! Worker pool and run orchestration
//!
//! This module owns the concurrent part of a harvest run:
//! - A fixed set of fetcher instances, one per worker slot
//! - A dispatch loop that assigns pages to free fetchers
//! - Per-page retry, settle, extract, and append steps
//! - Failure accounting and the cooperative abort signal
//!
//! Fetcher instances are handed to exactly one in-flight unit at a time
//! and returned to the pool when the unit completes, so the pool size is
//! the concurrency bound.

use crate::config::FetchConfig;
use crate::harvest::fetcher::{FetchError, PageFetcher, RawPage};
use crate::harvest::{extract_stories, PageIndex};
use crate::sink::{RecordSink, SinkError};
use crate::RakeError;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Cooperative stop signal for a running harvest
///
/// Aborting stops new pages from being dispatched. Units already in
/// flight run to completion and their records are kept; pages that were
/// never dispatched are reported as failed.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Creates a fresh, un-aborted handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop dispatching new pages
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether an abort has been requested
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of a completed harvest run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Total records appended to the output
    pub records_written: u64,

    /// Pages that were never harvested (exhausted retries or skipped)
    pub pages_failed: BTreeSet<PageIndex>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunResult {
    /// Elapsed wall-clock time in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Terminal state of one page unit
enum UnitResult {
    /// Records appended (zero when the page had nothing extractable)
    Written(usize),

    /// Every fetch attempt failed
    FetchFailed(FetchError),

    /// Records could not be persisted
    SinkFailed(SinkError),
}

struct UnitOutcome {
    page: PageIndex,
    result: UnitResult,
}

/// Aggregated counters for one run
struct RunState {
    records_written: u64,
    pages_failed: BTreeSet<PageIndex>,
    in_flight: HashSet<PageIndex>,
    completed: usize,
    total: usize,
    fatal: Option<SinkError>,
}

/// Drives a harvest run over a page range
///
/// The orchestrator owns the fetcher instances and the shared sink. It is
/// consumed by [`run`](Orchestrator::run), which tears both down on every
/// exit path.
pub struct Orchestrator<F> {
    fetchers: Vec<F>,
    sink: Arc<dyn RecordSink>,
    fetch: FetchConfig,
    abort: AbortHandle,
}

impl<F: PageFetcher + 'static> Orchestrator<F> {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `fetchers` - One fetcher per worker slot; the length bounds concurrency
    /// * `sink` - Shared record sink all workers append through
    /// * `fetch` - Retry and settle settings applied to every page
    pub fn new(fetchers: Vec<F>, sink: Arc<dyn RecordSink>, fetch: FetchConfig) -> Self {
        Self {
            fetchers,
            sink,
            fetch,
            abort: AbortHandle::new(),
        }
    }

    /// Handle for stopping this run from another task
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Harvests every page in the inclusive range
    ///
    /// Pages are dispatched in order to free fetchers; completion order is
    /// whatever the network gives. The run keeps going past individual page
    /// failures and only returns an error when records could not be
    /// persisted, after every in-flight unit has finished.
    ///
    /// # Arguments
    ///
    /// * `first` - First page number (inclusive)
    /// * `last` - Last page number (inclusive)
    ///
    /// # Returns
    ///
    /// * `Ok(RunResult)` - Counters for the run, including failed pages
    /// * `Err(RakeError::Sink)` - A write failed; the run was cut short
    pub async fn run(mut self, first: PageIndex, last: PageIndex) -> Result<RunResult, RakeError> {
        let start_time = Instant::now();
        let total = (last.saturating_sub(first) + 1) as usize;

        tracing::info!(
            "Harvesting pages {}..={} with {} workers",
            first,
            last,
            self.fetchers.len()
        );

        let mut state = RunState {
            records_written: 0,
            pages_failed: BTreeSet::new(),
            in_flight: HashSet::new(),
            completed: 0,
            total,
            fatal: None,
        };
        let mut units: JoinSet<(F, UnitOutcome)> = JoinSet::new();

        'pages: for page in first..=last {
            if self.abort.is_aborted() {
                tracing::debug!("Abort requested, not dispatching page {}", page);
                state.pages_failed.insert(page);
                continue;
            }

            // Wait for a free fetcher, folding in finished units as they land
            let fetcher = loop {
                if let Some(fetcher) = self.fetchers.pop() {
                    break fetcher;
                }
                match units.join_next().await {
                    Some(joined) => {
                        if let Some(fetcher) = absorb(joined, &mut state, &self.abort) {
                            self.fetchers.push(fetcher);
                        }
                    }
                    None => {
                        tracing::error!(
                            "No fetch workers remain; page {} cannot be dispatched",
                            page
                        );
                        state.pages_failed.insert(page);
                        continue 'pages;
                    }
                }
            };

            // An abort may have arrived while we waited for the fetcher
            if self.abort.is_aborted() {
                tracing::debug!("Abort requested, not dispatching page {}", page);
                self.fetchers.push(fetcher);
                state.pages_failed.insert(page);
                continue;
            }

            state.in_flight.insert(page);
            let sink = Arc::clone(&self.sink);
            let fetch = self.fetch.clone();
            units.spawn(run_unit(fetcher, page, fetch, sink));
        }

        // Drain everything still in flight
        while let Some(joined) = units.join_next().await {
            if let Some(fetcher) = absorb(joined, &mut state, &self.abort) {
                self.fetchers.push(fetcher);
            }
        }

        // A unit that crashed without reporting leaves its page here
        for page in state.in_flight.drain() {
            state.pages_failed.insert(page);
        }

        let elapsed = start_time.elapsed();

        if let Some(error) = state.fatal {
            return Err(RakeError::Sink(error));
        }

        tracing::info!(
            "Harvest finished: {} records written, {} pages failed, {:.2}s elapsed",
            state.records_written,
            state.pages_failed.len(),
            elapsed.as_secs_f64()
        );

        Ok(RunResult {
            records_written: state.records_written,
            pages_failed: state.pages_failed,
            elapsed,
        })
    }
}

/// Folds one joined unit into the run counters, returning its fetcher
fn absorb<F>(
    joined: Result<(F, UnitOutcome), tokio::task::JoinError>,
    state: &mut RunState,
    abort: &AbortHandle,
) -> Option<F> {
    match joined {
        Ok((fetcher, outcome)) => {
            state.in_flight.remove(&outcome.page);
            state.completed += 1;

            match outcome.result {
                UnitResult::Written(count) => {
                    state.records_written += count as u64;
                    tracing::debug!("Page {}: {} records written", outcome.page, count);
                }
                UnitResult::FetchFailed(error) => {
                    state.pages_failed.insert(outcome.page);
                    tracing::warn!("Page {} gave up: {}", outcome.page, error);
                }
                UnitResult::SinkFailed(error) => {
                    state.pages_failed.insert(outcome.page);
                    tracing::error!(
                        "Output write failed on page {}: {}; stopping dispatch",
                        outcome.page,
                        error
                    );
                    if state.fatal.is_none() {
                        state.fatal = Some(error);
                    }
                    abort.abort();
                }
            }

            if state.completed % 10 == 0 {
                tracing::info!(
                    "Progress: {}/{} pages complete, {} records written",
                    state.completed,
                    state.total,
                    state.records_written
                );
            }

            Some(fetcher)
        }
        Err(join_error) => {
            tracing::error!("Harvest worker crashed: {}", join_error);
            None
        }
    }
}

/// Runs one page unit to its terminal state and returns the fetcher
async fn run_unit<F: PageFetcher>(
    fetcher: F,
    page: PageIndex,
    fetch: FetchConfig,
    sink: Arc<dyn RecordSink>,
) -> (F, UnitOutcome) {
    let result = harvest_page(&fetcher, page, &fetch, sink.as_ref()).await;
    (fetcher, UnitOutcome { page, result })
}

/// Fetch, settle, extract, append for a single page
async fn harvest_page<F: PageFetcher>(
    fetcher: &F,
    page: PageIndex,
    fetch: &FetchConfig,
    sink: &dyn RecordSink,
) -> UnitResult {
    let raw = match fetch_with_retry(fetcher, page, fetch.attempts).await {
        Ok(raw) => raw,
        Err(error) => return UnitResult::FetchFailed(error),
    };

    // Give the page a moment before reading it, like a human viewer would
    if fetch.settle_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(fetch.settle_delay_ms)).await;
    }

    let stories = match extract_stories(&raw.html) {
        Ok(stories) => stories,
        Err(error) => {
            tracing::warn!("Page {}: {}", page, error);
            return UnitResult::Written(0);
        }
    };

    match sink.append(&stories) {
        Ok(count) => UnitResult::Written(count),
        Err(error) => UnitResult::SinkFailed(error),
    }
}

/// Fetches a page, retrying failed attempts up to the configured bound
async fn fetch_with_retry<F: PageFetcher>(
    fetcher: &F,
    page: PageIndex,
    attempts: u32,
) -> Result<RawPage, FetchError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetcher.fetch(page).await {
            Ok(raw) => return Ok(raw),
            Err(error) if attempt < attempts => {
                tracing::warn!(
                    "Page {} attempt {}/{} failed: {}",
                    page,
                    attempt,
                    attempts,
                    error
                );
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::Story;
    use crate::sink::SinkResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn test_fetch_config() -> FetchConfig {
        FetchConfig {
            load_timeout_ms: 1_000,
            poll_interval_ms: 10,
            attempts: 3,
            settle_delay_ms: 0,
        }
    }

    fn page_markup(page: PageIndex, rows: usize) -> String {
        let mut body = String::new();
        for i in 0..rows {
            let id = page * 100 + i as u32;
            body.push_str(&format!(
                r#"<tr class="athing" id="{id}">
                    <td><span class="rank">{rank}.</span></td>
                    <td><a href="x" class="storylink">Story {id}</a></td>
                </tr>
                <tr><td class="subtext"><span id="score_{id}">{points} points</span></td></tr>"#,
                id = id,
                rank = i + 1,
                points = id,
            ));
        }
        format!(
            r#"<html><body><table id="hnmain">{}</table></body></html>"#,
            body
        )
    }

    /// Fetcher with scripted failures and a shared attempt log
    #[derive(Clone, Default)]
    struct ScriptedFetcher {
        rows_per_page: usize,
        fail_pages: HashSet<PageIndex>,
        flaky_pages: HashMap<PageIndex, u32>,
        attempts_seen: Arc<Mutex<HashMap<PageIndex, u32>>>,
    }

    impl ScriptedFetcher {
        fn with_rows(rows_per_page: usize) -> Self {
            Self {
                rows_per_page,
                ..Self::default()
            }
        }

        fn fail_always(mut self, page: PageIndex) -> Self {
            self.fail_pages.insert(page);
            self
        }

        fn fail_first(mut self, page: PageIndex, failures: u32) -> Self {
            self.flaky_pages.insert(page, failures);
            self
        }

        fn attempts_for(&self, page: PageIndex) -> u32 {
            self.attempts_seen
                .lock()
                .unwrap()
                .get(&page)
                .copied()
                .unwrap_or(0)
        }

        fn pages_touched(&self) -> usize {
            self.attempts_seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, page: PageIndex) -> Result<RawPage, FetchError> {
            let attempt = {
                let mut seen = self.attempts_seen.lock().unwrap();
                let counter = seen.entry(page).or_insert(0);
                *counter += 1;
                *counter
            };

            if self.fail_pages.contains(&page) {
                return Err(FetchError::LoadTimeout {
                    page,
                    waited_ms: 1,
                });
            }

            if let Some(&failures) = self.flaky_pages.get(&page) {
                if attempt <= failures {
                    return Err(FetchError::Status { page, status: 503 });
                }
            }

            Ok(RawPage {
                page,
                html: page_markup(page, self.rows_per_page),
            })
        }
    }

    /// Sink that keeps appended records in memory
    #[derive(Default)]
    struct VecSink {
        rows: Mutex<Vec<Story>>,
        path: PathBuf,
    }

    impl RecordSink for VecSink {
        fn append(&self, stories: &[Story]) -> SinkResult<usize> {
            self.rows.lock().unwrap().extend_from_slice(stories);
            Ok(stories.len())
        }

        fn destination(&self) -> &Path {
            &self.path
        }
    }

    /// Sink whose every append fails
    #[derive(Default)]
    struct FailingSink {
        path: PathBuf,
    }

    impl RecordSink for FailingSink {
        fn append(&self, _stories: &[Story]) -> SinkResult<usize> {
            Err(SinkError::Flush(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "disk full",
            )))
        }

        fn destination(&self) -> &Path {
            &self.path
        }
    }

    /// Fetcher that records how many fetches overlap in flight
    #[derive(Clone, Default)]
    struct GaugeFetcher {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageFetcher for GaugeFetcher {
        async fn fetch(&self, page: PageIndex) -> Result<RawPage, FetchError> {
            let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            Ok(RawPage {
                page,
                html: page_markup(page, 1),
            })
        }
    }

    #[tokio::test]
    async fn test_full_range_harvested() {
        let stub = ScriptedFetcher::with_rows(2);
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone(), stub.clone(), stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 20).await.unwrap();

        assert_eq!(result.records_written, 40);
        assert!(result.pages_failed.is_empty());
        assert_eq!(stub.pages_touched(), 20);
        assert_eq!(sink.rows.lock().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_worker_count_caps_concurrent_fetches() {
        let gauge = GaugeFetcher::default();
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![gauge.clone(), gauge.clone(), gauge.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 30).await.unwrap();

        assert_eq!(result.records_written, 30);
        assert!(result.pages_failed.is_empty());

        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 3);
        assert!(peak > 1);
    }

    #[tokio::test]
    async fn test_failed_page_reported_after_three_attempts() {
        let stub = ScriptedFetcher::with_rows(2).fail_always(3);
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone(), stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 5).await.unwrap();

        assert_eq!(result.pages_failed, BTreeSet::from([3]));
        assert_eq!(stub.attempts_for(3), 3);
        assert_eq!(result.records_written, 8);
    }

    #[tokio::test]
    async fn test_flaky_page_recovers_within_attempts() {
        let stub = ScriptedFetcher::with_rows(1).fail_first(2, 2);
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 3).await.unwrap();

        assert!(result.pages_failed.is_empty());
        assert_eq!(stub.attempts_for(2), 3);
        assert_eq!(result.records_written, 3);
    }

    #[tokio::test]
    async fn test_abort_before_run_skips_every_page() {
        let stub = ScriptedFetcher::with_rows(2);
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone(), stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        orchestrator.abort_handle().abort();
        let result = orchestrator.run(1, 8).await.unwrap();

        assert_eq!(result.records_written, 0);
        assert_eq!(result.pages_failed.len(), 8);
        assert_eq!(stub.pages_touched(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_stops_dispatch() {
        let stub = ScriptedFetcher::with_rows(2);
        let sink = Arc::new(FailingSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 5).await;

        assert!(matches!(result, Err(RakeError::Sink(_))));
        // One page reached the sink, the rest were never dispatched
        assert_eq!(stub.pages_touched(), 1);
    }

    #[tokio::test]
    async fn test_page_without_rows_writes_nothing() {
        let stub = ScriptedFetcher::with_rows(0);
        let sink = Arc::new(VecSink::default());
        let orchestrator = Orchestrator::new(
            vec![stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            test_fetch_config(),
        );

        let result = orchestrator.run(1, 2).await.unwrap();

        assert_eq!(result.records_written, 0);
        assert!(result.pages_failed.is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_configuration() {
        let stub = ScriptedFetcher::with_rows(1).fail_first(1, 1);
        let sink = Arc::new(VecSink::default());
        let mut fetch = test_fetch_config();
        fetch.attempts = 1;
        let orchestrator = Orchestrator::new(
            vec![stub.clone()],
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            fetch,
        );

        let result = orchestrator.run(1, 1).await.unwrap();

        assert_eq!(result.pages_failed, BTreeSet::from([1]));
        assert_eq!(stub.attempts_for(1), 1);
    }
}
