//! Device classification shared by camera controls and the AR router.
//!
//! The class is derived from several signals together; no single one (user
//! agent, touch support, viewport size) decides it on its own.

/// Coarse device class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }
}

/// Raw platform signals gathered by the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub max_touch_points: u32,
    pub has_touch_events: bool,
    /// `(pointer: coarse)` media query.
    pub coarse_pointer: bool,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    /// Touch-classified devices get no pan gesture (two-finger zoom wins).
    pub touch: bool,
}

impl DeviceProfile {
    pub fn desktop() -> Self {
        Self {
            class: DeviceClass::Desktop,
            touch: false,
        }
    }

    pub fn mobile() -> Self {
        Self {
            class: DeviceClass::Mobile,
            touch: true,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.class == DeviceClass::Mobile
    }
}

const MOBILE_UA_TOKENS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "opera mini",
    "iemobile",
    "silk",
];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeviceClassifier {
    /// Widest viewport (CSS px) still treated as a handheld when touch is present.
    pub handheld_max_viewport: f64,
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self {
            handheld_max_viewport: 1024.0,
        }
    }
}

impl DeviceClassifier {
    pub fn classify(&self, signals: &DeviceSignals) -> DeviceProfile {
        let ua = signals.user_agent.to_ascii_lowercase();
        let touch = signals.max_touch_points > 0 || signals.has_touch_events;

        let ua_mobile = MOBILE_UA_TOKENS.iter().any(|t| ua.contains(t));
        // iPadOS reports a desktop Safari user agent but keeps multi-touch.
        let desktop_ua_tablet = ua.contains("macintosh") && signals.max_touch_points > 1;

        let short_side = signals.viewport_width.min(signals.viewport_height);
        let handheld_viewport = short_side > 0.0 && short_side <= self.handheld_max_viewport;
        let touch_first = touch && (signals.coarse_pointer || handheld_viewport);

        let mobile = (ua_mobile && touch) || desktop_ua_tablet || (touch_first && handheld_viewport);

        DeviceProfile {
            class: if mobile {
                DeviceClass::Mobile
            } else {
                DeviceClass::Desktop
            },
            touch: touch && (mobile || signals.coarse_pointer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceClass, DeviceClassifier, DeviceSignals};

    fn signals(ua: &str, touch_points: u32, coarse: bool, w: f64, h: f64) -> DeviceSignals {
        DeviceSignals {
            user_agent: ua.to_string(),
            max_touch_points: touch_points,
            has_touch_events: touch_points > 0,
            coarse_pointer: coarse,
            viewport_width: w,
            viewport_height: h,
        }
    }

    #[test]
    fn phone_is_mobile_and_touch() {
        let p = signals(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148",
            5,
            true,
            390.0,
            844.0,
        );
        let profile = DeviceClassifier::default().classify(&p);
        assert_eq!(profile.class, DeviceClass::Mobile);
        assert!(profile.touch);
    }

    #[test]
    fn desktop_browser_is_desktop() {
        let p = signals(
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0",
            0,
            false,
            1920.0,
            1080.0,
        );
        let profile = DeviceClassifier::default().classify(&p);
        assert_eq!(profile.class, DeviceClass::Desktop);
        assert!(!profile.touch);
    }

    #[test]
    fn ipados_desktop_user_agent_is_mobile() {
        let p = signals(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Safari/605.1.15",
            5,
            true,
            1180.0,
            820.0,
        );
        assert_eq!(DeviceClassifier::default().classify(&p).class, DeviceClass::Mobile);
    }

    #[test]
    fn mobile_token_without_touch_is_not_enough() {
        // Desktop browser in responsive-design mode spoofing a phone UA.
        let p = signals("Mozilla/5.0 (Linux; Android 14) Mobile", 0, false, 1920.0, 1080.0);
        assert_eq!(DeviceClassifier::default().classify(&p).class, DeviceClass::Desktop);
    }

    #[test]
    fn touch_laptop_with_fine_pointer_stays_desktop() {
        let p = signals("Mozilla/5.0 (Windows NT 10.0; Win64; x64)", 10, false, 1920.0, 1080.0);
        let profile = DeviceClassifier::default().classify(&p);
        assert_eq!(profile.class, DeviceClass::Desktop);
        assert!(!profile.touch);
    }
}
