use crate::request::Request;

/// Host network capability.
///
/// Calls only *start* work. The host reports completion back through
/// [`crate::ModelResourceLoader::on_verify_result`] and
/// [`crate::ModelResourceLoader::on_download_result`], tagged with the same
/// request token.
pub trait Fetcher {
    /// Lightweight existence check (e.g. `HEAD`).
    fn verify(&mut self, request: Request, url: &str);
    /// Full binary transfer.
    fn download(&mut self, request: Request, url: &str);
    /// Best-effort cancellation of any transfer started for `request`.
    fn abort(&mut self, request: Request);
}

/// Fetch call as seen by a [`RecordingFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Verify(Request, String),
    Download(Request, String),
    Abort(Request),
}

/// Fetcher that only records calls; completions are fed in by the caller.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    pub calls: Vec<FetchCall>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, FetchCall::Download(..)))
            .count()
    }

    pub fn verifies(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, FetchCall::Verify(..)))
            .count()
    }

    pub fn aborted(&self, request: Request) -> bool {
        self.calls.contains(&FetchCall::Abort(request))
    }
}

impl Fetcher for RecordingFetcher {
    fn verify(&mut self, request: Request, url: &str) {
        self.calls.push(FetchCall::Verify(request, url.to_string()));
    }

    fn download(&mut self, request: Request, url: &str) {
        self.calls.push(FetchCall::Download(request, url.to_string()));
    }

    fn abort(&mut self, request: Request) {
        self.calls.push(FetchCall::Abort(request));
    }
}

// Lets callers keep ownership of a fetcher while the loader drives it.
impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn verify(&mut self, request: Request, url: &str) {
        (**self).verify(request, url);
    }

    fn download(&mut self, request: Request, url: &str) {
        (**self).download(request, url);
    }

    fn abort(&mut self, request: Request) {
        (**self).abort(request);
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn verify(&mut self, request: Request, url: &str) {
        (**self).verify(request, url);
    }

    fn download(&mut self, request: Request, url: &str) {
        (**self).download(request, url);
    }

    fn abort(&mut self, request: Request) {
        (**self).abort(request);
    }
}
