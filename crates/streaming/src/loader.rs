use foundation::time::Time;
use runtime::event_bus::EventBus;
use runtime::timers::TimerQueue;
use scene::SceneGraph;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{FetchError, LoadError};
use crate::fetch::Fetcher;
use crate::request::{Request, RequestTokens};
use crate::state::LoadState;

/// One observed transition of a load attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadEvent {
    pub request: Request,
    pub url: String,
    pub state: LoadState,
    pub error: Option<LoadError>,
}

/// Snapshot of the current attempt for UI binding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStatus {
    pub request: Option<Request>,
    pub url: Option<String>,
    pub state: LoadState,
    pub error: Option<LoadError>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LoadTimer {
    Verify(Request),
    Download(Request),
    Watchdog(Request),
}

impl LoadTimer {
    fn request(self) -> Request {
        match self {
            LoadTimer::Verify(r) | LoadTimer::Download(r) | LoadTimer::Watchdog(r) => r,
        }
    }
}

#[derive(Debug)]
struct Attempt {
    request: Request,
    url: String,
    state: LoadState,
    error: Option<LoadError>,
    started: Time,
}

/// Fetches, verifies and parses one model at a time.
///
/// The loader never blocks: it starts host work through a [`Fetcher`] and is
/// resumed by `on_*_result` calls and by [`ModelResourceLoader::advance`] for
/// timers. Every continuation carries a [`Request`] token; anything that does
/// not match the current attempt's token, or arrives after its terminal
/// state, is dropped.
pub struct ModelResourceLoader<F: Fetcher> {
    config: LoaderConfig,
    fetcher: F,
    tokens: RequestTokens,
    current: Option<Attempt>,
    timers: TimerQueue<LoadTimer>,
    events: EventBus<LoadEvent>,
    scene: Option<(Request, SceneGraph)>,
}

impl<F: Fetcher> ModelResourceLoader<F> {
    pub fn new(config: LoaderConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            tokens: RequestTokens::new(),
            current: None,
            timers: TimerQueue::new(),
            events: EventBus::new(),
            scene: None,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn events(&self) -> &EventBus<LoadEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<LoadEvent> {
        &mut self.events
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Time> {
        self.timers.next_deadline()
    }

    pub fn state(&self) -> LoadState {
        self.current
            .as_ref()
            .map(|a| a.state)
            .unwrap_or(LoadState::Idle)
    }

    pub fn current_request(&self) -> Option<Request> {
        self.current.as_ref().map(|a| a.request)
    }

    pub fn status(&self) -> LoadStatus {
        match &self.current {
            Some(a) => LoadStatus {
                request: Some(a.request),
                url: Some(a.url.clone()),
                state: a.state,
                error: a.error.clone(),
            },
            None => LoadStatus {
                request: None,
                url: None,
                state: LoadState::Idle,
                error: None,
            },
        }
    }

    /// Starts loading `url`, or joins the attempt already running for it.
    ///
    /// A different URL aborts whatever is in flight. The same URL after a
    /// failure starts a fresh attempt (caller-driven retry).
    pub fn load(&mut self, url: &str, now: Time) -> Request {
        if let Some(current) = &self.current
            && current.url == url
            && (current.state.is_busy() || current.state == LoadState::Ready)
        {
            debug!(url, request = %current.request, state = %current.state, "load deduplicated");
            return current.request;
        }

        self.abandon(now);

        let request = self.tokens.next();
        info!(url, request = %request, "model load started");
        self.current = Some(Attempt {
            request,
            url: url.to_string(),
            state: LoadState::Idle,
            error: None,
            started: now,
        });
        self.timers.schedule(
            now.after(self.config.watchdog_timeout_s),
            LoadTimer::Watchdog(request),
        );

        if self.config.verify {
            self.transition(request, LoadState::Verifying, None, now);
            self.timers.schedule(
                now.after(self.config.verify_timeout_s),
                LoadTimer::Verify(request),
            );
            self.fetcher.verify(request, url);
        } else {
            self.start_download(request, now);
        }
        request
    }

    /// Re-runs the last URL after a `Failed`/`TimedOut` terminal state.
    pub fn retry(&mut self, now: Time) -> Option<Request> {
        let url = match &self.current {
            Some(a) if a.state.is_failure() => a.url.clone(),
            _ => return None,
        };
        Some(self.load(&url, now))
    }

    /// Aborts any in-flight work and forgets the current attempt.
    ///
    /// No further events are emitted for the abandoned request.
    pub fn cancel(&mut self) {
        if let Some(a) = self.current.take() {
            if a.state.is_busy() {
                debug!(url = %a.url, request = %a.request, "model load cancelled");
                self.fetcher.abort(a.request);
            }
            self.timers.cancel_where(|t| t.request() == a.request);
        }
        self.scene = None;
    }

    /// Hands the parsed scene to its owner; yields at most once per attempt.
    pub fn take_scene(&mut self, request: Request) -> Option<SceneGraph> {
        match &self.scene {
            Some((r, _)) if *r == request => self.scene.take().map(|(_, s)| s),
            _ => None,
        }
    }

    pub fn on_verify_result(&mut self, request: Request, result: Result<(), FetchError>, now: Time) {
        if !self.is_current_in(request, LoadState::Verifying) {
            debug!(request = %request, "stale verification result ignored");
            return;
        }
        self.timers
            .cancel_where(|t| *t == LoadTimer::Verify(request));

        match result {
            Ok(()) => self.start_download(request, now),
            Err(err) if err.is_not_found() => {
                self.finish(request, LoadState::Failed, Some(LoadError::from_download(&err)), now);
            }
            Err(err) => {
                let err = LoadError::from_verify(&err);
                warn!(request = %request, error = %err, "model verification failed; downloading anyway");
                self.start_download(request, now);
            }
        }
    }

    pub fn on_download_result(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, FetchError>,
        now: Time,
    ) {
        if !self.is_current_in(request, LoadState::Downloading) {
            debug!(request = %request, "stale download result ignored");
            return;
        }
        self.timers
            .cancel_where(|t| *t == LoadTimer::Download(request));

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = LoadError::from_download(&err);
                self.finish(request, LoadState::Failed, Some(err), now);
                return;
            }
        };

        self.transition(request, LoadState::Parsing, None, now);
        match formats::load_scene_from_glb(&bytes) {
            Ok(scene) => {
                info!(
                    request = %request,
                    bytes = bytes.len(),
                    nodes = scene.node_count(),
                    fingerprint = scene.fingerprint().unwrap_or(""),
                    "model parsed"
                );
                self.scene = Some((request, scene));
                self.finish(request, LoadState::Ready, None, now);
            }
            Err(err) => {
                let err = LoadError::from_parse(&err);
                self.finish(request, LoadState::Failed, Some(err), now);
            }
        }
    }

    /// Fires every timer due at `now`.
    pub fn advance(&mut self, now: Time) {
        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                LoadTimer::Verify(request) => {
                    if self.is_current_in(request, LoadState::Verifying) {
                        warn!(request = %request, "model verification timed out; downloading anyway");
                        self.fetcher.abort(request);
                        self.start_download(request, now);
                    }
                }
                LoadTimer::Download(request) => {
                    if self.is_current_in(request, LoadState::Downloading) {
                        self.fetcher.abort(request);
                        let err = LoadError::from_download(&FetchError::Timeout);
                        self.finish(request, LoadState::Failed, Some(err), now);
                    }
                }
                LoadTimer::Watchdog(request) => {
                    let busy = self
                        .current
                        .as_ref()
                        .is_some_and(|a| a.request == request && a.state.is_busy());
                    if busy {
                        self.fetcher.abort(request);
                        self.finish(request, LoadState::TimedOut, None, now);
                    }
                }
            }
        }
    }

    fn is_current_in(&self, request: Request, state: LoadState) -> bool {
        self.current
            .as_ref()
            .is_some_and(|a| a.request == request && a.state == state)
    }

    fn start_download(&mut self, request: Request, now: Time) {
        let Some(url) = self.current.as_ref().map(|a| a.url.clone()) else {
            return;
        };
        self.transition(request, LoadState::Downloading, None, now);
        self.timers.schedule(
            now.after(self.config.download_timeout_s),
            LoadTimer::Download(request),
        );
        self.fetcher.download(request, &url);
    }

    /// Drops the current attempt before a new URL takes over.
    fn abandon(&mut self, now: Time) {
        let Some(a) = self.current.take() else {
            return;
        };
        self.timers.cancel_where(|t| t.request() == a.request);
        self.scene = None;
        if a.state.is_busy() {
            debug!(url = %a.url, request = %a.request, "in-flight load aborted");
            self.fetcher.abort(a.request);
        } else if a.state.is_failure() {
            self.events.emit(
                now,
                LoadEvent {
                    request: a.request,
                    url: a.url,
                    state: LoadState::Idle,
                    error: None,
                },
            );
        }
    }

    fn finish(&mut self, request: Request, state: LoadState, error: Option<LoadError>, now: Time) {
        self.timers.cancel_where(|t| t.request() == request);
        if let Some(a) = &self.current {
            let elapsed = now.since(a.started);
            match (&error, state) {
                (Some(err), _) => {
                    warn!(url = %a.url, request = %request, error = %err, elapsed_s = elapsed, "model load failed")
                }
                (None, LoadState::TimedOut) => {
                    warn!(url = %a.url, request = %request, elapsed_s = elapsed, "model load timed out")
                }
                _ => info!(url = %a.url, request = %request, elapsed_s = elapsed, "model ready"),
            }
        }
        self.transition(request, state, error, now);
    }

    fn transition(
        &mut self,
        request: Request,
        state: LoadState,
        error: Option<LoadError>,
        now: Time,
    ) {
        let Some(a) = self.current.as_mut() else {
            return;
        };
        if a.request != request || a.state.is_terminal() {
            return;
        }
        a.state = state;
        a.error = error.clone();
        let url = a.url.clone();
        self.events.emit(
            now,
            LoadEvent {
                request,
                url,
                state,
                error,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::ModelResourceLoader;
    use crate::config::LoaderConfig;
    use crate::error::{FetchError, LoadErrorKind};
    use crate::fetch::{FetchCall, RecordingFetcher};
    use crate::state::LoadState;
    use foundation::time::Time;
    use formats::samples::sample_chair_glb;

    fn loader() -> ModelResourceLoader<RecordingFetcher> {
        ModelResourceLoader::new(LoaderConfig::default(), RecordingFetcher::new())
    }

    fn states(l: &mut ModelResourceLoader<RecordingFetcher>) -> Vec<LoadState> {
        l.events_mut()
            .drain_payloads()
            .into_iter()
            .map(|e| e.state)
            .collect()
    }

    #[test]
    fn happy_path_emits_phases_in_order() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Ok(()), Time(0.1));
        l.on_download_result(r, Ok(sample_chair_glb()), Time(1.0));

        assert_eq!(
            states(&mut l),
            vec![
                LoadState::Verifying,
                LoadState::Downloading,
                LoadState::Parsing,
                LoadState::Ready
            ]
        );
        assert!(l.take_scene(r).is_some());
        assert!(l.take_scene(r).is_none());
        assert_eq!(l.pending_timers(), 0);
    }

    #[test]
    fn concurrent_loads_of_same_url_transfer_once() {
        let mut l = loader();
        let a = l.load("/chair.glb", Time(0.0));
        let b = l.load("/chair.glb", Time(0.2));
        assert_eq!(a, b);
        l.on_verify_result(a, Ok(()), Time(0.3));
        let c = l.load("/chair.glb", Time(0.4));
        assert_eq!(a, c);
        assert_eq!(l.fetcher().downloads(), 1);
        assert_eq!(l.fetcher().verifies(), 1);
    }

    #[test]
    fn verification_failure_is_absorbed() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Err(FetchError::Network("HEAD refused".into())), Time(0.1));
        assert_eq!(l.state(), LoadState::Downloading);
        assert_eq!(l.fetcher().downloads(), 1);
    }

    #[test]
    fn verification_timeout_proceeds_to_download() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.advance(Time(5.0));
        assert_eq!(l.state(), LoadState::Downloading);
        assert!(l.fetcher().aborted(r));

        // A verify answer arriving late is ignored.
        l.on_verify_result(r, Err(FetchError::HttpStatus(404)), Time(6.0));
        assert_eq!(l.state(), LoadState::Downloading);
    }

    #[test]
    fn missing_model_fails_not_found_and_never_times_out() {
        let mut l = loader();
        let r = l.load("/missing.model", Time(0.0));
        l.on_verify_result(r, Err(FetchError::HttpStatus(404)), Time(0.1));

        let status = l.status();
        assert_eq!(status.state, LoadState::Failed);
        assert_eq!(
            status.error.map(|e| e.kind),
            Some(LoadErrorKind::DownloadNotFound)
        );
        assert_eq!(l.fetcher().downloads(), 0);

        l.advance(Time(500.0));
        let seen = states(&mut l);
        assert!(!seen.contains(&LoadState::TimedOut));
        assert_eq!(seen.last(), Some(&LoadState::Failed));
    }

    #[test]
    fn missing_model_without_verification_fails_not_found() {
        let cfg = LoaderConfig {
            verify: false,
            ..LoaderConfig::default()
        };
        let mut l = ModelResourceLoader::new(cfg, RecordingFetcher::new());
        let r = l.load("/missing.model", Time(0.0));
        l.on_download_result(r, Err(FetchError::HttpStatus(404)), Time(0.3));
        l.advance(Time(500.0));
        assert_eq!(l.state(), LoadState::Failed);
        assert_eq!(
            l.status().error.map(|e| e.kind),
            Some(LoadErrorKind::DownloadNotFound)
        );
    }

    #[test]
    fn download_timeout_fails_before_watchdog() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Ok(()), Time(1.0));
        l.advance(Time(86.0));
        assert_eq!(l.state(), LoadState::Failed);
        assert_eq!(
            l.status().error.map(|e| e.kind),
            Some(LoadErrorKind::DownloadTimeout)
        );
        assert_eq!(l.pending_timers(), 0);
    }

    #[test]
    fn result_after_watchdog_is_discarded() {
        let cfg = LoaderConfig {
            download_timeout_s: 200.0,
            ..LoaderConfig::default()
        };
        let mut l = ModelResourceLoader::new(cfg, RecordingFetcher::new());
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Ok(()), Time(0.5));
        l.advance(Time(90.0));
        assert_eq!(l.state(), LoadState::TimedOut);

        l.on_download_result(r, Ok(sample_chair_glb()), Time(95.0));
        assert_eq!(l.state(), LoadState::TimedOut);
        assert!(l.take_scene(r).is_none());

        let seen = states(&mut l);
        let terminals = seen.iter().filter(|s| s.is_terminal()).count();
        assert_eq!(terminals, 1);
    }

    #[test]
    fn url_change_aborts_previous_attempt() {
        let mut l = loader();
        let old = l.load("/a.glb", Time(0.0));
        l.on_verify_result(old, Ok(()), Time(0.1));
        let new = l.load("/b.glb", Time(0.2));
        assert_ne!(old, new);
        assert!(l.fetcher().aborted(old));

        l.on_download_result(old, Ok(sample_chair_glb()), Time(0.3));
        assert!(l.take_scene(old).is_none());
        assert_eq!(l.state(), LoadState::Verifying);
        assert_eq!(l.status().url.as_deref(), Some("/b.glb"));
    }

    #[test]
    fn finished_load_leaves_no_timer_for_the_next_one() {
        let mut l = loader();
        let first = l.load("/a.glb", Time(0.0));
        l.on_verify_result(first, Ok(()), Time(0.1));
        l.on_download_result(first, Ok(sample_chair_glb()), Time(1.0));
        assert_eq!(l.pending_timers(), 0);

        let second = l.load("/b.glb", Time(80.0));
        l.on_verify_result(second, Ok(()), Time(80.5));
        // The first load's watchdog would have been due at 90s.
        l.advance(Time(91.0));
        assert_eq!(l.state(), LoadState::Downloading);
    }

    #[test]
    fn caller_retry_starts_a_new_attempt() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Ok(()), Time(0.1));
        l.on_download_result(r, Err(FetchError::Network("reset".into())), Time(0.2));
        assert_eq!(l.state(), LoadState::Failed);

        let again = l.retry(Time(1.0)).expect("retry");
        assert!(again > r);
        assert_eq!(l.state(), LoadState::Verifying);
        assert!(l.retry(Time(1.1)).is_none());
    }

    #[test]
    fn url_change_after_failure_passes_through_idle() {
        let mut l = loader();
        let r = l.load("/a.glb", Time(0.0));
        l.on_verify_result(r, Err(FetchError::HttpStatus(404)), Time(0.1));
        l.events_mut().drain();
        l.load("/b.glb", Time(1.0));
        assert_eq!(
            states(&mut l),
            vec![LoadState::Idle, LoadState::Verifying]
        );
    }

    #[test]
    fn html_payload_fails_as_invalid_format() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.on_verify_result(r, Ok(()), Time(0.1));
        l.on_download_result(r, Ok(b"<!doctype html>".to_vec()), Time(0.2));
        assert_eq!(
            l.status().error.map(|e| e.kind),
            Some(LoadErrorKind::ParseInvalidFormat)
        );
    }

    #[test]
    fn cancel_aborts_and_silences() {
        let mut l = loader();
        let r = l.load("/chair.glb", Time(0.0));
        l.events_mut().drain();
        l.cancel();
        assert!(l.fetcher().calls.contains(&FetchCall::Abort(r)));
        assert_eq!(l.pending_timers(), 0);
        l.on_verify_result(r, Ok(()), Time(0.1));
        l.advance(Time(200.0));
        assert!(l.events().is_empty());
        assert_eq!(l.state(), LoadState::Idle);
    }
}
