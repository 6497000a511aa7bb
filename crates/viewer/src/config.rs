use camera::CameraConfig;
use catalog::{DimensionLimits, PriceTable};
use gpu::SurfaceConfig;
use handoff::ArConfig;
use serde::{Deserialize, Serialize};
use streaming::LoaderConfig;

/// Everything a viewer host may tune. Missing sections keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub loader: LoaderConfig,
    pub camera: CameraConfig,
    pub surface: SurfaceConfig,
    pub ar: ArConfig,
    pub limits: DimensionLimits,
    pub prices: PriceTable,
}

impl ViewerConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerConfig;

    #[test]
    fn empty_and_partial_configs() {
        assert_eq!(ViewerConfig::from_json("").expect("empty"), ViewerConfig::default());

        let cfg = ViewerConfig::from_json(
            r#"{ "loader": { "watchdog_timeout_s": 120 }, "camera": { "settle_s": 0.25 } }"#,
        )
        .expect("parse");
        assert_eq!(cfg.loader.watchdog_timeout_s, 120.0);
        assert_eq!(cfg.loader.verify_timeout_s, 5.0);
        assert_eq!(cfg.camera.settle_s, 0.25);
        assert_eq!(cfg.surface.forced_resize_delay_s, 0.1);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(ViewerConfig::from_json("{ loader: ").is_err());
    }
}
