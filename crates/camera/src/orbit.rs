use foundation::math::Vec3;

use crate::config::CameraConfig;
use crate::presets::CameraPose;

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Spherical orbit around a target point, bounded by distance and polar
/// limits. Pointer deltas are in CSS pixels, wheel deltas as reported by the
/// browser.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    target: Vec3,
    distance: f64,
    azimuth_rad: f64,
    polar_rad: f64,
    pan_enabled: bool,
    min_distance: f64,
    max_distance: f64,
    min_polar_rad: f64,
    max_polar_rad: f64,
    rotate_speed: f64,
    zoom_speed: f64,
    pan_speed: f64,
}

impl OrbitControls {
    pub fn new(config: &CameraConfig, pose: CameraPose, pan_enabled: bool) -> Self {
        let mut controls = Self {
            target: pose.target,
            distance: 1.0,
            azimuth_rad: 0.0,
            polar_rad: std::f64::consts::FRAC_PI_2,
            pan_enabled,
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            min_polar_rad: config.min_polar_rad,
            max_polar_rad: config.max_polar_rad.max(config.min_polar_rad),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
        };
        controls.set_pose(pose);
        controls
    }

    pub fn pan_enabled(&self) -> bool {
        self.pan_enabled
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn azimuth_rad(&self) -> f64 {
        self.azimuth_rad
    }

    pub fn polar_rad(&self) -> f64 {
        self.polar_rad
    }

    /// Re-derives the spherical state from an explicit pose.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.target = pose.target;
        let offset = pose.position - pose.target;
        let d = offset.length();
        if d > 1e-9 {
            self.distance = d;
            self.polar_rad = clamp(offset.y / d, -1.0, 1.0).acos();
            self.azimuth_rad = offset.x.atan2(offset.z);
        }
        self.update();
    }

    /// Re-applies every limit. Called after any external pose change.
    pub fn update(&mut self) {
        self.distance = clamp(self.distance, self.min_distance, self.max_distance);
        self.polar_rad = clamp(self.polar_rad, self.min_polar_rad, self.max_polar_rad);
    }

    pub fn rotate(&mut self, delta_x_px: f64, delta_y_px: f64) {
        self.azimuth_rad -= delta_x_px * self.rotate_speed;
        self.polar_rad -= delta_y_px * self.rotate_speed;
        self.update();
    }

    pub fn zoom(&mut self, wheel_delta_y: f64) {
        self.distance *= (wheel_delta_y * self.zoom_speed).exp();
        self.update();
    }

    /// Moves the target in the view plane. Returns `false` when panning is
    /// disabled for this device.
    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) -> bool {
        if !self.pan_enabled {
            return false;
        }
        let pose = self.pose();
        let forward = (pose.target - pose.position).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        let scale = self.distance * self.pan_speed;
        self.target = self.target + right * (-delta_x_px * scale) + up * (delta_y_px * scale);
        true
    }

    pub fn set_distance(&mut self, distance: f64) {
        if distance.is_finite() {
            self.distance = distance;
        }
        self.update();
    }

    pub fn set_target(&mut self, target: Vec3) {
        if target.is_finite() {
            self.target = target;
        }
    }

    pub fn pose(&self) -> CameraPose {
        let (sp, cp) = self.polar_rad.sin_cos();
        let (sa, ca) = self.azimuth_rad.sin_cos();
        let offset = Vec3::new(sp * sa, cp, sp * ca) * self.distance;
        CameraPose::new(self.target + offset, self.target)
    }
}
