//! Search controller: owns the search state, inputs and everything the
//! presentation layer renders.
//!
//! Network calls are split into a `begin_*` phase that validates and records
//! state, and a `finish_*` phase that applies the outcome. The terminal UI runs
//! the request in between on a spawned task; [`SearchController::handle_search`]
//! and [`SearchController::clear_cache`] await both phases inline.

use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::banner::{Banner, ERROR_BANNER_DURATION, SUCCESS_BANNER_DURATION};
use crate::client::{CacheClearResponse, ScanResponse, ScanService};
use crate::debounce::Debouncer;
use crate::error::SearchError;
use crate::results::{display_results, ResultsView};

pub const EMPTY_PATH_MESSAGE: &str = "Please enter a path to scan";
pub const CACHE_CLEARED_MESSAGE: &str = "The cache has been cleared successfully";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub last_search_term: String,
    pub is_searching: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub debounce: Duration,
    pub error_banner: Duration,
    pub success_banner: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            error_banner: ERROR_BANNER_DURATION,
            success_banner: SUCCESS_BANNER_DURATION,
        }
    }
}

/// A validated scan request, produced by [`SearchController::begin_search`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_path: String,
    pub search_term: String,
}

/// Timing and provenance the service may attach to a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanStats {
    pub scan_time: f64,
    pub from_cache: bool,
}

pub struct SearchController<S> {
    service: S,
    state: SearchState,
    base_path: String,
    search_input: String,
    results: ResultsView,
    error_banner: Banner,
    success_banner: Banner,
    stats_line: Option<String>,
    debouncer: Debouncer,
}

impl<S: ScanService> SearchController<S> {
    pub fn new(service: S, timings: Timings) -> Self {
        Self {
            service,
            state: SearchState::default(),
            base_path: String::new(),
            search_input: String::new(),
            results: ResultsView::Cleared,
            error_banner: Banner::new(timings.error_banner),
            success_banner: Banner::new(timings.success_banner),
            stats_line: None,
            debouncer: Debouncer::new(timings.debounce),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn is_searching(&self) -> bool {
        self.state.is_searching
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn results(&self) -> &ResultsView {
        &self.results
    }

    pub fn error_message(&self, now: Instant) -> Option<&str> {
        self.error_banner.message(now)
    }

    pub fn success_message(&self, now: Instant) -> Option<&str> {
        self.success_banner.message(now)
    }

    pub fn stats_line(&self) -> Option<&str> {
        self.stats_line.as_deref()
    }

    /// Replace the base path input. Does not trigger a search.
    pub fn set_base_path(&mut self, path: impl Into<String>) {
        self.base_path = path.into();
    }

    /// Replace the search input and restart the debounce window
    pub fn set_search_input(&mut self, term: impl Into<String>, now: Instant) {
        self.search_input = term.into();
        self.debouncer.on_event(now);
    }

    /// Enter pressed in either input: search now, skipping the debounce window
    pub fn submit(&mut self, now: Instant) -> Option<SearchRequest> {
        self.debouncer.cancel();
        self.begin_search(now)
    }

    /// Advance timers. Returns a request when the debounce window elapsed
    /// and a search could start.
    pub fn tick(&mut self, now: Instant) -> Option<SearchRequest> {
        self.error_banner.tick(now);
        self.success_banner.tick(now);
        if self.debouncer.poll(now) {
            debug!("debounce window elapsed");
            self.begin_search(now)
        } else {
            None
        }
    }

    /// Validate inputs and mark a search in progress.
    ///
    /// Returns `None` without side effects while a search is already running,
    /// and `None` with an error banner when the base path is empty.
    pub fn begin_search(&mut self, now: Instant) -> Option<SearchRequest> {
        if self.state.is_searching {
            debug!("search already in progress, ignoring");
            return None;
        }

        if self.base_path.is_empty() {
            self.show_error(&SearchError::Validation(EMPTY_PATH_MESSAGE.to_string()), now);
            return None;
        }

        self.state.last_search_term = self.search_input.clone();
        self.state.is_searching = true;
        info!(path = %self.base_path, term = %self.search_input, "starting search");

        Some(SearchRequest {
            base_path: self.base_path.clone(),
            search_term: self.search_input.clone(),
        })
    }

    /// Apply a scan outcome and return to idle
    pub fn finish_search(
        &mut self,
        request: &SearchRequest,
        result: Result<ScanResponse, SearchError>,
        now: Instant,
    ) {
        let outcome = result.and_then(|mut data| match data.error.take() {
            Some(message) if !message.is_empty() => Err(SearchError::Service(message)),
            _ => Ok(data),
        });

        match outcome {
            Ok(data) => {
                if let (Some(scan_time), Some(from_cache)) = (data.scan_time, data.from_cache) {
                    self.update_stats(ScanStats {
                        scan_time,
                        from_cache,
                    });
                }
                let files = data.files.unwrap_or_default();
                info!(files = files.len(), "search finished");
                self.results = display_results(&files, &request.search_term);
            }
            Err(err) => {
                self.show_error(&err, now);
                self.results = ResultsView::Cleared;
            }
        }

        self.state.is_searching = false;
    }

    /// Run a complete search cycle against the service
    pub async fn handle_search(&mut self) {
        let Some(request) = self.begin_search(Instant::now()) else {
            return;
        };
        let result = self.service.scan(&request.base_path).await;
        self.finish_search(&request, result, Instant::now());
    }

    /// Apply a cache-clear outcome. The results view is left untouched.
    pub fn finish_clear_cache(
        &mut self,
        result: Result<CacheClearResponse, SearchError>,
        now: Instant,
    ) {
        match result {
            Ok(data) => {
                let message = data
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| CACHE_CLEARED_MESSAGE.to_string());
                info!(%message, "cache cleared");
                self.success_banner.show(message, now);
            }
            Err(err) => self.show_error(&err, now),
        }
    }

    pub async fn clear_cache(&mut self, path: Option<&str>) {
        let result = self.service.clear_cache(path).await;
        self.finish_clear_cache(result, Instant::now());
    }

    /// Update the status line with scan timing and cache provenance
    pub fn update_stats(&mut self, stats: ScanStats) {
        let source = if stats.from_cache {
            "from the cache"
        } else {
            "New scan"
        };
        self.stats_line = Some(format!(
            "Scan time: {} seconds source: {}",
            stats.scan_time, source
        ));
    }

    fn show_error(&mut self, err: &SearchError, now: Instant) {
        error!(error = ?err, "search failed");
        self.error_banner.show(err.message(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FileEntry;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeService {
        scan_calls: Arc<AtomicUsize>,
        clear_calls: Arc<AtomicUsize>,
        scan_replies: Arc<Mutex<VecDeque<Result<ScanResponse, SearchError>>>>,
        clear_replies: Arc<Mutex<VecDeque<Result<CacheClearResponse, SearchError>>>>,
    }

    impl FakeService {
        fn with_scan(reply: Result<ScanResponse, SearchError>) -> Self {
            let service = Self::default();
            service.scan_replies.lock().unwrap().push_back(reply);
            service
        }

        fn with_clear(reply: Result<CacheClearResponse, SearchError>) -> Self {
            let service = Self::default();
            service.clear_replies.lock().unwrap().push_back(reply);
            service
        }

        fn scan_calls(&self) -> usize {
            self.scan_calls.load(Ordering::SeqCst)
        }
    }

    impl ScanService for FakeService {
        async fn scan(&self, _path: &str) -> Result<ScanResponse, SearchError> {
            self.scan_calls.fetch_add(1, Ordering::SeqCst);
            self.scan_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ScanResponse::default()))
        }

        async fn clear_cache(&self, _path: Option<&str>) -> Result<CacheClearResponse, SearchError> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            self.clear_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CacheClearResponse::default()))
        }
    }

    fn checkpoint_response() -> ScanResponse {
        ScanResponse {
            files: Some(vec![FileEntry {
                name: "a.ckpt".to_string(),
                path: "C:\\m\\a.ckpt".to_string(),
                size: 2048,
                modified: "2023-01-01T10:00:00".to_string(),
            }]),
            ..Default::default()
        }
    }

    fn controller(service: FakeService) -> SearchController<FakeService> {
        SearchController::new(service, Timings::default())
    }

    #[tokio::test]
    async fn test_empty_base_path_skips_network() {
        let service = FakeService::default();
        let mut ctl = controller(service.clone());
        ctl.set_search_input("sd", Instant::now());

        ctl.handle_search().await;

        assert_eq!(service.scan_calls(), 0);
        assert_eq!(ctl.error_message(Instant::now()), Some(EMPTY_PATH_MESSAGE));
        assert!(!ctl.is_searching());
    }

    #[tokio::test]
    async fn test_successful_search_renders_groups() {
        let service = FakeService::with_scan(Ok(checkpoint_response()));
        let mut ctl = controller(service.clone());
        ctl.set_base_path("C:\\m");

        ctl.handle_search().await;

        assert_eq!(service.scan_calls(), 1);
        assert!(!ctl.is_searching());
        let groups = ctl.results().groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].folder, "C:\\m");
        assert_eq!(groups[0].entries[0].type_info.name, "Checkpoint");
        assert_eq!(groups[0].entries[0].size_label, "2 KB");
        assert!(ctl.error_message(Instant::now()).is_none());
    }

    #[tokio::test]
    async fn test_service_error_clears_results() {
        let service = FakeService::with_scan(Ok(checkpoint_response()));
        service.scan_replies.lock().unwrap().push_back(Ok(ScanResponse {
            error: Some("disk not found".to_string()),
            ..Default::default()
        }));
        let mut ctl = controller(service.clone());
        ctl.set_base_path("C:\\m");

        ctl.handle_search().await;
        assert_eq!(ctl.results().groups().len(), 1);

        ctl.handle_search().await;
        assert_eq!(ctl.error_message(Instant::now()), Some("disk not found"));
        assert_eq!(ctl.results(), &ResultsView::Cleared);
        assert!(!ctl.is_searching());
    }

    #[tokio::test]
    async fn test_transport_error_shows_status() {
        let service = FakeService::with_scan(Err(SearchError::Transport(
            "Scan error: Not Found".to_string(),
        )));
        let mut ctl = controller(service);
        ctl.set_base_path("Z:\\missing");

        ctl.handle_search().await;

        assert_eq!(
            ctl.error_message(Instant::now()),
            Some("Scan error: Not Found")
        );
        assert_eq!(ctl.results(), &ResultsView::Cleared);
        assert!(!ctl.is_searching());
    }

    #[tokio::test]
    async fn test_missing_files_renders_placeholder() {
        let service = FakeService::with_scan(Ok(ScanResponse::default()));
        let mut ctl = controller(service);
        ctl.set_base_path("C:\\empty");

        ctl.handle_search().await;

        assert_eq!(ctl.results(), &ResultsView::NoFiles);
    }

    #[tokio::test]
    async fn test_second_search_ignored_while_in_flight() {
        let service = FakeService::with_scan(Ok(checkpoint_response()));
        let mut ctl = controller(service.clone());
        ctl.set_base_path("C:\\m");

        let now = Instant::now();
        let request = ctl.begin_search(now).expect("first search starts");
        assert!(ctl.is_searching());

        // Both the async path and the two-phase path are rejected
        ctl.handle_search().await;
        assert!(ctl.begin_search(now).is_none());
        assert!(ctl.submit(now).is_none());
        assert_eq!(service.scan_calls(), 0);

        let result = service.scan(&request.base_path).await;
        ctl.finish_search(&request, result, now);
        assert!(!ctl.is_searching());
        assert_eq!(service.scan_calls(), 1);
    }

    #[tokio::test]
    async fn test_search_term_recorded_and_applied() {
        let service = FakeService::with_scan(Ok(checkpoint_response()));
        let mut ctl = controller(service);
        ctl.set_base_path("C:\\m");
        ctl.set_search_input("zzz", Instant::now());

        ctl.handle_search().await;

        assert_eq!(ctl.state().last_search_term, "zzz");
        assert_eq!(ctl.results(), &ResultsView::Groups(vec![]));
    }

    #[test]
    fn test_debounced_input_starts_one_search() {
        let mut ctl = controller(FakeService::default());
        ctl.set_base_path("C:\\m");

        let t0 = Instant::now();
        ctl.set_search_input("s", t0);
        ctl.set_search_input("sd", t0 + Duration::from_millis(100));
        assert!(ctl.tick(t0 + Duration::from_millis(350)).is_none());

        let request = ctl.tick(t0 + Duration::from_millis(400)).expect("fires");
        assert_eq!(request.search_term, "sd");
        assert!(ctl.tick(t0 + Duration::from_millis(800)).is_none());
    }

    #[test]
    fn test_submit_bypasses_debounce() {
        let mut ctl = controller(FakeService::default());
        ctl.set_base_path("C:\\m");

        let t0 = Instant::now();
        ctl.set_search_input("sd", t0);
        let request = ctl.submit(t0 + Duration::from_millis(10)).expect("immediate");
        assert_eq!(request.search_term, "sd");

        ctl.finish_search(&request, Ok(checkpoint_response()), t0);
        // The pending keystroke window was discarded
        assert!(ctl.tick(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_error_banner_expires() {
        let mut ctl = controller(FakeService::default());
        let t0 = Instant::now();
        assert!(ctl.submit(t0).is_none());

        assert_eq!(ctl.error_message(t0), Some(EMPTY_PATH_MESSAGE));
        ctl.tick(t0 + Duration::from_secs(5));
        assert!(ctl.error_message(t0 + Duration::from_secs(5)).is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_success_messages() {
        let service = FakeService::with_clear(Ok(CacheClearResponse {
            message: Some("Cleared entire cache".to_string()),
            error: None,
        }));
        service
            .clear_replies
            .lock()
            .unwrap()
            .push_back(Ok(CacheClearResponse::default()));
        let mut ctl = controller(service.clone());

        ctl.clear_cache(None).await;
        assert_eq!(
            ctl.success_message(Instant::now()),
            Some("Cleared entire cache")
        );

        ctl.clear_cache(None).await;
        assert_eq!(
            ctl.success_message(Instant::now()),
            Some(CACHE_CLEARED_MESSAGE)
        );
        assert_eq!(service.clear_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_failure_keeps_results() {
        let service = FakeService::with_scan(Ok(checkpoint_response()));
        service
            .clear_replies
            .lock()
            .unwrap()
            .push_back(Err(SearchError::Transport("Error clearing the cache".to_string())));
        let mut ctl = controller(service);
        ctl.set_base_path("C:\\m");
        ctl.handle_search().await;

        ctl.clear_cache(None).await;

        assert_eq!(
            ctl.error_message(Instant::now()),
            Some("Error clearing the cache")
        );
        assert!(ctl.success_message(Instant::now()).is_none());
        assert_eq!(ctl.results().groups().len(), 1);
    }

    #[test]
    fn test_update_stats_line() {
        let mut ctl = controller(FakeService::default());
        assert!(ctl.stats_line().is_none());

        ctl.update_stats(ScanStats {
            scan_time: 1.25,
            from_cache: true,
        });
        assert_eq!(
            ctl.stats_line(),
            Some("Scan time: 1.25 seconds source: from the cache")
        );

        ctl.update_stats(ScanStats {
            scan_time: 3.0,
            from_cache: false,
        });
        assert_eq!(ctl.stats_line(), Some("Scan time: 3 seconds source: New scan"));
    }

    #[test]
    fn test_stats_only_from_responses_carrying_them() {
        let mut ctl = controller(FakeService::default());
        ctl.set_base_path("C:\\m");
        let now = Instant::now();

        let request = ctl.begin_search(now).unwrap();
        ctl.finish_search(&request, Ok(checkpoint_response()), now);
        assert!(ctl.stats_line().is_none());

        let request = ctl.begin_search(now).unwrap();
        let mut response = checkpoint_response();
        response.scan_time = Some(0.5);
        response.from_cache = Some(false);
        ctl.finish_search(&request, Ok(response), now);
        assert_eq!(ctl.stats_line(), Some("Scan time: 0.5 seconds source: New scan"));
    }
}
