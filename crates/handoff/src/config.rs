use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    /// Script that registers the AR element when the page does not ship it.
    pub script_url: String,
    /// Custom element name looked up in the element registry.
    pub element_name: String,
    /// Wait after the script's load signal before re-probing.
    pub settle_s: f64,
    pub script_timeout_s: f64,
    pub qr_min_size_px: u32,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            script_url: "https://ajax.googleapis.com/ajax/libs/model-viewer/3.4.0/model-viewer.min.js"
                .to_string(),
            element_name: "model-viewer".to_string(),
            settle_s: 0.5,
            script_timeout_s: 10.0,
            qr_min_size_px: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ArConfig;

    #[test]
    fn overrides_merge_with_defaults() {
        let cfg: ArConfig =
            serde_json::from_str(r#"{ "script_url": "/vendor/ar.js" }"#).expect("parse");
        assert_eq!(cfg.script_url, "/vendor/ar.js");
        assert_eq!(cfg.element_name, "model-viewer");
        assert_eq!(cfg.settle_s, 0.5);
    }
}
