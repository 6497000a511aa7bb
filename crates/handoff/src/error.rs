use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArUnavailableReason {
    /// The device has no AR support at all.
    UnsupportedPlatform,
    /// The AR element script failed or did not load in time.
    ScriptLoadFailed,
    /// The element exists but refused to start a session.
    PresentFailed,
}

/// Informational: AR is not possible here, the QR bridge is shown instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArUnavailable {
    pub reason: ArUnavailableReason,
    pub detail: String,
}

impl ArUnavailable {
    pub fn new(reason: ArUnavailableReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.reason {
            ArUnavailableReason::UnsupportedPlatform => {
                "AR isn't supported on this device. Scan the code with a phone instead."
            }
            ArUnavailableReason::ScriptLoadFailed => {
                "The AR viewer couldn't be loaded. Scan the code with a phone instead."
            }
            ArUnavailableReason::PresentFailed => {
                "The AR session couldn't be started. Scan the code with a phone instead."
            }
        }
    }
}

impl std::fmt::Display for ArUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AR unavailable ({:?}): {}", self.reason, self.detail)
    }
}

impl std::error::Error for ArUnavailable {}

#[derive(Debug)]
pub enum HandoffError {
    InvalidUrl(url::ParseError),
    QrEncode(qrcode::types::QrError),
}

impl std::fmt::Display for HandoffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffError::InvalidUrl(e) => write!(f, "invalid product URL: {e}"),
            HandoffError::QrEncode(e) => write!(f, "QR encoding failed: {e}"),
        }
    }
}

impl std::error::Error for HandoffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandoffError::InvalidUrl(e) => Some(e),
            HandoffError::QrEncode(e) => Some(e),
        }
    }
}

impl From<url::ParseError> for HandoffError {
    fn from(e: url::ParseError) -> Self {
        HandoffError::InvalidUrl(e)
    }
}

impl From<qrcode::types::QrError> for HandoffError {
    fn from(e: qrcode::types::QrError) -> Self {
        HandoffError::QrEncode(e)
    }
}
