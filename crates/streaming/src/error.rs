use formats::{ModelParseError, ParseClass};
use serde::Serialize;
use url::Url;

/// Outcome of a host-side network operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The host's own transfer timeout fired.
    Timeout,
    Network(String),
    HttpStatus(u16),
    /// Cross-origin or mixed-content policy refused the response.
    Blocked(String),
    Aborted,
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::HttpStatus(404 | 410))
    }

    /// Classifies a browser `fetch` rejection that carried no response.
    ///
    /// CORS and mixed-content refusals surface as a bare `TypeError`, the
    /// same as a dropped connection. A target whose origin differs from the
    /// page's is taken as a policy block; anything else stays a network
    /// error. `url` may be relative to `page_url`.
    pub fn from_transport(error_name: &str, message: &str, url: &str, page_url: &str) -> Self {
        match error_name {
            "AbortError" => return FetchError::Aborted,
            "TimeoutError" => return FetchError::Timeout,
            _ => {}
        }
        if error_name == "TypeError"
            && let Ok(page) = Url::parse(page_url)
            && let Ok(target) = page.join(url)
            && target.origin() != page.origin()
        {
            return FetchError::Blocked(format!(
                "{message} (cross-origin request to {})",
                target.origin().ascii_serialization()
            ));
        }
        FetchError::Network(message.to_string())
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::HttpStatus(code) => write!(f, "HTTP status {code}"),
            FetchError::Blocked(msg) => write!(f, "blocked by security policy: {msg}"),
            FetchError::Aborted => write!(f, "request aborted"),
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    /// Absorbed by the loader; never a terminal classification.
    VerificationFailed,
    DownloadTimeout,
    DownloadNetworkError,
    DownloadNotFound,
    ParseInvalidFormat,
    ParseCorsBlocked,
    ParseGeneric,
}

impl LoadErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadErrorKind::VerificationFailed => "verification_failed",
            LoadErrorKind::DownloadTimeout => "download_timeout",
            LoadErrorKind::DownloadNetworkError => "download_network_error",
            LoadErrorKind::DownloadNotFound => "download_not_found",
            LoadErrorKind::ParseInvalidFormat => "parse_invalid_format",
            LoadErrorKind::ParseCorsBlocked => "parse_cors_blocked",
            LoadErrorKind::ParseGeneric => "parse_generic",
        }
    }
}

/// Classified load failure carried by a `Failed` terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub detail: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_verify(err: &FetchError) -> Self {
        Self::new(LoadErrorKind::VerificationFailed, err.to_string())
    }

    pub fn from_download(err: &FetchError) -> Self {
        let kind = match err {
            FetchError::HttpStatus(404 | 410) => LoadErrorKind::DownloadNotFound,
            FetchError::Timeout => LoadErrorKind::DownloadTimeout,
            FetchError::Blocked(_) => LoadErrorKind::ParseCorsBlocked,
            FetchError::Network(_) | FetchError::HttpStatus(_) | FetchError::Aborted => {
                LoadErrorKind::DownloadNetworkError
            }
        };
        Self::new(kind, err.to_string())
    }

    pub fn from_parse(err: &ModelParseError) -> Self {
        let kind = match err.class() {
            ParseClass::InvalidFormat => LoadErrorKind::ParseInvalidFormat,
            ParseClass::Generic => LoadErrorKind::ParseGeneric,
        };
        Self::new(kind, err.to_string())
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind {
            LoadErrorKind::VerificationFailed => "The 3D model could not be verified.",
            LoadErrorKind::DownloadTimeout => "The 3D model took too long to download.",
            LoadErrorKind::DownloadNetworkError => "The 3D model could not be downloaded.",
            LoadErrorKind::DownloadNotFound => "The 3D model file was not found.",
            LoadErrorKind::ParseInvalidFormat => "The 3D model file is not in a supported format.",
            LoadErrorKind::ParseCorsBlocked => {
                "The 3D model was blocked by the browser's security policy."
            }
            LoadErrorKind::ParseGeneric => "The 3D model could not be displayed.",
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self.kind {
            LoadErrorKind::VerificationFailed => "Loading will continue without verification.",
            LoadErrorKind::DownloadTimeout | LoadErrorKind::DownloadNetworkError => {
                "Check your connection and try again."
            }
            LoadErrorKind::DownloadNotFound => {
                "The file may have been moved or removed. Contact the store if this persists."
            }
            LoadErrorKind::ParseInvalidFormat => "The file may be corrupted. Re-export it as GLB.",
            LoadErrorKind::ParseCorsBlocked => {
                "The model host must allow cross-origin requests from this site."
            }
            LoadErrorKind::ParseGeneric => "Try reloading the page.",
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.detail)
    }
}

impl std::error::Error for LoadError {}

/// Message shown when the outer watchdog gives up on a load.
pub const TIMED_OUT_MESSAGE: &str = "Loading the 3D model timed out.";
pub const TIMED_OUT_REMEDIATION: &str = "Check your connection and try again.";

#[cfg(test)]
mod tests {
    use super::{FetchError, LoadError, LoadErrorKind};
    use formats::load_scene_from_glb;

    const PAGE: &str = "https://shop.example/products/oak-chair";

    #[test]
    fn cross_origin_type_error_is_blocked() {
        let err = FetchError::from_transport(
            "TypeError",
            "Failed to fetch",
            "https://cdn.other.example/chair.glb",
            PAGE,
        );
        assert!(matches!(&err, FetchError::Blocked(m) if m.contains("https://cdn.other.example")));
        assert_eq!(LoadError::from_download(&err).kind, LoadErrorKind::ParseCorsBlocked);

        // Mixed content: same host, different scheme.
        let err = FetchError::from_transport("TypeError", "Failed to fetch", "http://shop.example/c.glb", PAGE);
        assert!(matches!(err, FetchError::Blocked(_)));
    }

    #[test]
    fn same_origin_type_error_stays_network() {
        for url in ["/models/chair.glb", "https://shop.example/models/chair.glb"] {
            let err = FetchError::from_transport("TypeError", "Failed to fetch", url, PAGE);
            assert_eq!(err, FetchError::Network("Failed to fetch".into()));
        }
        let err = FetchError::from_transport("TypeError", "Failed to fetch", "/c.glb", "");
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn abort_and_timeout_names_are_recognized() {
        assert_eq!(FetchError::from_transport("AbortError", "", "/c.glb", PAGE), FetchError::Aborted);
        assert_eq!(FetchError::from_transport("TimeoutError", "", "/c.glb", PAGE), FetchError::Timeout);
    }

    #[test]
    fn download_errors_are_classified() {
        let cases = [
            (FetchError::HttpStatus(404), LoadErrorKind::DownloadNotFound),
            (FetchError::HttpStatus(410), LoadErrorKind::DownloadNotFound),
            (FetchError::HttpStatus(500), LoadErrorKind::DownloadNetworkError),
            (FetchError::Timeout, LoadErrorKind::DownloadTimeout),
            (
                FetchError::Blocked("cors".into()),
                LoadErrorKind::ParseCorsBlocked,
            ),
            (
                FetchError::Network("reset".into()),
                LoadErrorKind::DownloadNetworkError,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(LoadError::from_download(&err).kind, kind, "{err}");
        }
    }

    #[test]
    fn html_payload_maps_to_invalid_format() {
        let parse = load_scene_from_glb(b"<html>404</html>").unwrap_err();
        let err = LoadError::from_parse(&parse);
        assert_eq!(err.kind, LoadErrorKind::ParseInvalidFormat);
        assert!(err.detail.contains("HTML"));
    }

    #[test]
    fn not_found_has_distinct_remediation() {
        let nf = LoadError::new(LoadErrorKind::DownloadNotFound, "");
        let net = LoadError::new(LoadErrorKind::DownloadNetworkError, "");
        assert_ne!(nf.remediation(), net.remediation());
        assert!(net.remediation().contains("connection"));
    }
}
