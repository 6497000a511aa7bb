use serde::{Deserialize, Serialize};

/// Layered timeout budget for a model load, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Issue an existence check before downloading.
    pub verify: bool,
    pub verify_timeout_s: f64,
    pub download_timeout_s: f64,
    /// Guards the whole attempt independently of the phase timeouts.
    pub watchdog_timeout_s: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            verify: true,
            verify_timeout_s: 5.0,
            download_timeout_s: 85.0,
            watchdog_timeout_s: 90.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LoaderConfig;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LoaderConfig =
            serde_json::from_str(r#"{ "watchdog_timeout_s": 120.0 }"#).expect("parse");
        assert_eq!(cfg.watchdog_timeout_s, 120.0);
        assert_eq!(cfg.download_timeout_s, 85.0);
        assert!(cfg.verify);
    }
}
