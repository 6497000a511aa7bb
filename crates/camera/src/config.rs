use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// How long preset selection stays disabled after a preset is applied.
    pub settle_s: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Polar angle is measured from straight up (+Y).
    pub min_polar_rad: f64,
    pub max_polar_rad: f64,
    /// Radians per pointer pixel.
    pub rotate_speed: f64,
    /// Exponential dolly factor per wheel delta unit.
    pub zoom_speed: f64,
    /// Target offset per pixel, relative to the orbit distance.
    pub pan_speed: f64,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
    /// Turntable rate of the rotating-model behaviour.
    pub auto_rotate_rad_per_s: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            settle_s: 0.3,
            min_distance: 0.5,
            max_distance: 10.0,
            min_polar_rad: 0.0,
            max_polar_rad: std::f64::consts::FRAC_PI_2,
            rotate_speed: 0.005,
            zoom_speed: 0.0015,
            pan_speed: 0.002,
            fov_y_rad: 45f64.to_radians(),
            near: 0.01,
            far: 100.0,
            auto_rotate_rad_per_s: 0.5,
        }
    }
}
