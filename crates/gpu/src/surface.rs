use foundation::time::Time;
use runtime::event_bus::EventBus;
use runtime::timers::TimerQueue;
use scene::SceneGraph;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::renderer::{Camera3D, RenderFrame, Renderer};
use crate::residency::{Residency, UploadPlan};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    Active,
    Lost,
    Recovering,
}

/// Platform notifications the manager listens for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceSignal {
    ContextLost,
    ContextRestored,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subscription(pub u64);

/// GPU surface capability provided by the host (canvas + graphics context).
pub trait SurfacePlatform {
    fn subscribe(&mut self, signal: SurfaceSignal) -> Subscription;
    fn unsubscribe(&mut self, subscription: Subscription);
    /// Keeps the platform from discarding the context for good after a loss.
    fn prevent_default_teardown(&mut self);
    fn pixel_size(&self) -> (u32, u32);
    fn set_pixel_size(&mut self, width: u32, height: u32);
    fn upload(&mut self, scene: &SceneGraph, plan: &UploadPlan);
    fn release_all(&mut self);
    fn submit(&mut self, frame: &RenderFrame);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Delay before the pixel-size toggle that nudges the platform into
    /// reallocating a lost context.
    pub forced_resize_delay_s: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            forced_resize_delay_s: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    ContextLost,
    ForcedResize { width: u32, height: u32 },
    Recovering,
    Redrawn,
    Active,
    TornDown,
}

/// Owns the rendering surface for the lifetime of one viewer.
///
/// Context loss is a state, never an error: while `Lost` draws are skipped,
/// and restoration re-uploads and redraws the current scene exactly once.
pub struct RenderSurfaceManager<P: SurfacePlatform> {
    platform: P,
    config: SurfaceConfig,
    state: SurfaceState,
    subscriptions: Vec<Subscription>,
    timers: TimerQueue<()>,
    residency: Residency,
    frames: u64,
    redraws: u64,
    events: EventBus<SurfaceEvent>,
    torn_down: bool,
}

impl<P: SurfacePlatform> RenderSurfaceManager<P> {
    pub fn create(mut platform: P, config: SurfaceConfig) -> Self {
        let subscriptions = vec![
            platform.subscribe(SurfaceSignal::ContextLost),
            platform.subscribe(SurfaceSignal::ContextRestored),
        ];
        Self {
            platform,
            config,
            state: SurfaceState::Active,
            subscriptions,
            timers: TimerQueue::new(),
            residency: Residency::new(),
            frames: 0,
            redraws: 0,
            events: EventBus::new(),
            torn_down: false,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn events_mut(&mut self) -> &mut EventBus<SurfaceEvent> {
        &mut self.events
    }

    /// Frames submitted through [`RenderSurfaceManager::draw`].
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Recovery redraws issued after a context restoration.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn resident_bytes(&self) -> usize {
        self.residency.resident_bytes()
    }

    /// Uploads pending resources and submits one frame.
    ///
    /// Returns `false` when the surface cannot currently draw.
    pub fn draw(&mut self, scene: &SceneGraph, camera: Camera3D) -> bool {
        if self.torn_down || self.state != SurfaceState::Active {
            return false;
        }
        self.submit(scene, camera);
        self.frames += 1;
        true
    }

    /// Frees every GPU resource held for the current scene.
    pub fn release_scene(&mut self) {
        if self.torn_down {
            return;
        }
        if !self.residency.is_empty() {
            debug!(bytes = self.residency.resident_bytes(), "releasing scene resources");
        }
        self.platform.release_all();
        self.residency.clear();
    }

    pub fn on_context_lost(&mut self, now: Time) {
        if self.torn_down {
            return;
        }
        self.platform.prevent_default_teardown();
        if self.state == SurfaceState::Lost {
            return;
        }
        warn!("rendering context lost; scheduling forced resize");
        self.state = SurfaceState::Lost;
        // Everything on the GPU is gone with the context.
        self.residency.clear();
        self.timers.clear();
        self.timers
            .schedule(now.after(self.config.forced_resize_delay_s), ());
        self.events.emit(now, SurfaceEvent::ContextLost);
    }

    /// Redraws `scene` once from `camera`, the pose the viewer holds now.
    pub fn on_context_restored(&mut self, now: Time, scene: Option<&SceneGraph>, camera: Camera3D) {
        if self.torn_down || self.state != SurfaceState::Lost {
            debug!(state = ?self.state, "ignoring restore notification");
            return;
        }
        self.timers.clear();
        self.state = SurfaceState::Recovering;
        self.events.emit(now, SurfaceEvent::Recovering);

        if let Some(scene) = scene {
            self.submit(scene, camera);
            self.redraws += 1;
            self.events.emit(now, SurfaceEvent::Redrawn);
        }

        self.state = SurfaceState::Active;
        info!(redraws = self.redraws, "rendering context restored");
        self.events.emit(now, SurfaceEvent::Active);
    }

    /// Fires the forced-resize toggle when it is due.
    pub fn advance(&mut self, now: Time) {
        while self.timers.pop_due(now).is_some() {
            if self.state != SurfaceState::Lost {
                continue;
            }
            let (width, height) = self.platform.pixel_size();
            self.platform
                .set_pixel_size(width.saturating_sub(1).max(1), height.saturating_sub(1).max(1));
            self.platform.set_pixel_size(width, height);
            debug!(width, height, "forced surface resize");
            self.events
                .emit(now, SurfaceEvent::ForcedResize { width, height });
        }
    }

    /// Deregisters every listener and frees GPU resources. Idempotent.
    pub fn teardown(&mut self, now: Time) {
        if self.torn_down {
            return;
        }
        for sub in self.subscriptions.drain(..) {
            self.platform.unsubscribe(sub);
        }
        self.platform.release_all();
        self.residency.clear();
        self.timers.clear();
        self.torn_down = true;
        self.events.emit(now, SurfaceEvent::TornDown);
    }

    fn submit(&mut self, scene: &SceneGraph, camera: Camera3D) {
        let plan = self.residency.sync(scene);
        if !plan.is_empty() {
            self.platform.upload(scene, &plan);
        }
        let frame = Renderer::collect(scene, camera);
        self.platform.submit(&frame);
    }
}

/// In-memory surface that records what the manager asked of it.
#[derive(Debug)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub next_subscription: u64,
    pub active_subscriptions: Vec<(Subscription, SurfaceSignal)>,
    pub prevented_teardowns: usize,
    pub resizes: Vec<(u32, u32)>,
    pub uploads: Vec<UploadPlan>,
    pub releases: usize,
    pub submitted: Vec<RenderFrame>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_subscription: 0,
            active_subscriptions: Vec::new(),
            prevented_teardowns: 0,
            resizes: Vec::new(),
            uploads: Vec::new(),
            releases: 0,
            submitted: Vec::new(),
        }
    }
}

impl SurfacePlatform for RecordingSurface {
    fn subscribe(&mut self, signal: SurfaceSignal) -> Subscription {
        self.next_subscription += 1;
        let sub = Subscription(self.next_subscription);
        self.active_subscriptions.push((sub, signal));
        sub
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.active_subscriptions.retain(|(s, _)| *s != subscription);
    }

    fn prevent_default_teardown(&mut self) {
        self.prevented_teardowns += 1;
    }

    fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.resizes.push((width, height));
    }

    fn upload(&mut self, _scene: &SceneGraph, plan: &UploadPlan) {
        self.uploads.push(plan.clone());
    }

    fn release_all(&mut self) {
        self.releases += 1;
    }

    fn submit(&mut self, frame: &RenderFrame) {
        self.submitted.push(frame.clone());
    }
}
