use foundation::bounds::Aabb3;
use foundation::time::Time;
use runtime::device::DeviceProfile;
use runtime::event_bus::EventBus;
use runtime::timers::TimerQueue;
use serde::Serialize;
use tracing::debug;

use crate::config::CameraConfig;
use crate::orbit::OrbitControls;
use crate::presets::{CameraPose, CameraPreset};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraTransitionState {
    Idle,
    Transitioning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    TransitionStarted(CameraPreset),
    TransitionSettled(CameraPreset),
    Framed { distance: f64 },
}

/// Switches between free orbit and preset transitions.
///
/// A preset applies its pose to the camera and the orbit controls in one
/// step, then holds `Transitioning` for the settle delay. Preset input is
/// ignored until the machine is back in `Idle`.
pub struct CameraControlStateMachine {
    config: CameraConfig,
    device: DeviceProfile,
    state: CameraTransitionState,
    camera: CameraPose,
    controls: OrbitControls,
    settle: TimerQueue<CameraPreset>,
    active_preset: Option<CameraPreset>,
    events: EventBus<CameraEvent>,
}

impl CameraControlStateMachine {
    pub fn new(config: CameraConfig, device: DeviceProfile) -> Self {
        let pose = CameraPreset::Front.pose(device.class);
        let controls = OrbitControls::new(&config, pose, !device.touch);
        let camera = controls.pose();
        Self {
            config,
            device,
            state: CameraTransitionState::Idle,
            camera,
            controls,
            settle: TimerQueue::new(),
            active_preset: Some(CameraPreset::Front),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn device(&self) -> DeviceProfile {
        self.device
    }

    pub fn state(&self) -> CameraTransitionState {
        self.state
    }

    /// `false` while a preset transition is in flight; hosts use it to grey
    /// out preset buttons.
    pub fn presets_enabled(&self) -> bool {
        self.state == CameraTransitionState::Idle
    }

    pub fn pose(&self) -> CameraPose {
        self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn active_preset(&self) -> Option<CameraPreset> {
        self.active_preset
    }

    pub fn events_mut(&mut self) -> &mut EventBus<CameraEvent> {
        &mut self.events
    }

    /// Starts a transition to `preset`. No-op while already transitioning.
    pub fn select_preset(&mut self, preset: CameraPreset, now: Time) -> bool {
        if self.state == CameraTransitionState::Transitioning {
            debug!(preset = %preset, "preset ignored while transitioning");
            return false;
        }

        let pose = preset.pose(self.device.class);
        self.controls.set_pose(pose);
        self.controls.update();
        self.camera = self.controls.pose();

        self.state = CameraTransitionState::Transitioning;
        self.active_preset = Some(preset);
        self.settle.schedule(now.after(self.config.settle_s), preset);
        self.events.emit(now, CameraEvent::TransitionStarted(preset));
        true
    }

    /// Returns to the default front view.
    pub fn reset(&mut self, now: Time) -> bool {
        self.select_preset(CameraPreset::Front, now)
    }

    pub fn advance(&mut self, now: Time) {
        while let Some((_, preset)) = self.settle.pop_due(now) {
            self.state = CameraTransitionState::Idle;
            self.events.emit(now, CameraEvent::TransitionSettled(preset));
        }
    }

    pub fn orbit(&mut self, delta_x_px: f64, delta_y_px: f64) -> bool {
        self.user_input(|c| {
            c.rotate(delta_x_px, delta_y_px);
            true
        })
    }

    pub fn zoom(&mut self, wheel_delta_y: f64) -> bool {
        self.user_input(|c| {
            c.zoom(wheel_delta_y);
            true
        })
    }

    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) -> bool {
        self.user_input(|c| c.pan(delta_x_px, delta_y_px))
    }

    /// Centers the orbit on `bounds` and backs off until it fits the
    /// vertical field of view.
    pub fn frame_bounds(&mut self, bounds: &Aabb3, now: Time) -> Option<f64> {
        if bounds.is_empty() {
            return None;
        }
        let half_fov = (self.config.fov_y_rad * 0.5).clamp(0.05, 1.5);
        let distance = bounds.radius() / half_fov.sin();
        self.controls.set_target(bounds.center());
        self.controls.set_distance(distance);
        self.camera = self.controls.pose();
        let distance = self.controls.distance();
        self.events.emit(now, CameraEvent::Framed { distance });
        Some(distance)
    }

    fn user_input(&mut self, f: impl FnOnce(&mut OrbitControls) -> bool) -> bool {
        if self.state != CameraTransitionState::Idle {
            return false;
        }
        let changed = f(&mut self.controls);
        if changed {
            self.camera = self.controls.pose();
            self.active_preset = None;
        }
        changed
    }
}
