use camera::CameraTransitionState;
use gpu::SurfaceState;
use handoff::ArAvailability;
use serde::Serialize;
use streaming::{LoadError, LoadState, TIMED_OUT_MESSAGE, TIMED_OUT_REMEDIATION};

/// Dismissible, classified message shown when a model could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerMessage {
    pub kind: &'static str,
    pub text: &'static str,
    pub remediation: &'static str,
}

impl ViewerMessage {
    pub fn from_load_error(err: &LoadError) -> Self {
        Self {
            kind: err.kind.as_str(),
            text: err.user_message(),
            remediation: err.remediation(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            kind: LoadState::TimedOut.as_str(),
            text: TIMED_OUT_MESSAGE,
            remediation: TIMED_OUT_REMEDIATION,
        }
    }
}

/// UI-facing snapshot of a viewer session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerStatus {
    pub load_state: LoadState,
    pub loading: bool,
    pub message: Option<ViewerMessage>,
    pub showing_placeholder: bool,
    pub surface: SurfaceState,
    pub transition: CameraTransitionState,
    pub presets_enabled: bool,
    pub ar: ArAvailability,
    pub rotating: bool,
    pub scale_factors: [f64; 3],
    pub price_adjustment: f64,
    /// Latest component transitions, oldest first.
    pub recent_events: Vec<String>,
}
