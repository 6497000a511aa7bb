use serde::Serialize;

/// Lifecycle of a single model load.
///
/// Forward only: `Idle -> Verifying -> Downloading -> Parsing -> Ready`, with
/// `Failed`/`TimedOut` reachable from any busy phase. The only way back to
/// `Idle` is a new URL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Verifying,
    Downloading,
    Parsing,
    Ready,
    Failed,
    TimedOut,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Verifying => "verifying",
            LoadState::Downloading => "downloading",
            LoadState::Parsing => "parsing",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
            LoadState::TimedOut => "timed_out",
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(
            self,
            LoadState::Verifying | LoadState::Downloading | LoadState::Parsing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoadState::Ready | LoadState::Failed | LoadState::TimedOut
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, LoadState::Failed | LoadState::TimedOut)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
