use camera::{CameraControlStateMachine, CameraPreset, RotatingModel};
use catalog::{
    AddToCartIntent, Axis, CustomizationError, CustomizationState, CustomizationStore,
    ProductModelDescriptor,
};
use std::collections::VecDeque;

use foundation::math::Vec3;
use foundation::time::Time;
use gpu::{Camera3D, RenderSurfaceManager, SurfacePlatform};
use handoff::{ArHandoffRouter, ArOutcome, ArPlatform, ArSignal, HandoffError, wants_ar};
use runtime::device::DeviceProfile;
use scene::prefabs::placeholder_box;
use scene::{MaterialNormalizer, SceneGraph};
use streaming::{FetchError, Fetcher, LoadState, ModelResourceLoader, Request};
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::status::{ViewerMessage, ViewerStatus};

/// Component events kept for status after the buses are drained.
pub const RECENT_EVENTS: usize = 32;

/// Host capabilities a session runs on.
pub struct ViewerPlatform<F, S, A> {
    pub fetcher: F,
    pub surface: S,
    pub ar: A,
}

/// One mounted product view.
///
/// Owns the loaded scene exclusively. Switching products or unmounting
/// releases the scene's GPU resources and silences the previous load.
pub struct ViewerSession<F: Fetcher, S: SurfacePlatform, A: ArPlatform> {
    descriptor: ProductModelDescriptor,
    device: DeviceProfile,
    config: ViewerConfig,
    loader: ModelResourceLoader<F>,
    normalizer: MaterialNormalizer,
    surface: RenderSurfaceManager<S>,
    camera: CameraControlStateMachine,
    rotating: RotatingModel,
    customization: CustomizationStore,
    ar: ArHandoffRouter<A>,
    scene: Option<SceneGraph>,
    showing_placeholder: bool,
    message: Option<ViewerMessage>,
    // Load attempt whose terminal state has been applied to the scene.
    settled: Option<Request>,
    recent_events: VecDeque<String>,
    mounted: bool,
}

impl<F: Fetcher, S: SurfacePlatform, A: ArPlatform> ViewerSession<F, S, A> {
    pub fn mount(
        descriptor: ProductModelDescriptor,
        customization: Option<&CustomizationState>,
        config: ViewerConfig,
        device: DeviceProfile,
        platform: ViewerPlatform<F, S, A>,
        now: Time,
    ) -> Self {
        let mut store = CustomizationStore::new(
            descriptor.base_dimensions,
            config.limits.clone(),
            config.prices.clone(),
        );
        if let Some(saved) = customization {
            store.restore(saved);
        }

        let mut session = Self {
            loader: ModelResourceLoader::new(config.loader.clone(), platform.fetcher),
            normalizer: MaterialNormalizer::default(),
            surface: RenderSurfaceManager::create(platform.surface, config.surface.clone()),
            camera: CameraControlStateMachine::new(config.camera.clone(), device),
            rotating: RotatingModel::new(config.camera.auto_rotate_rad_per_s),
            customization: store,
            ar: ArHandoffRouter::new(config.ar.clone(), device, platform.ar),
            descriptor,
            device,
            config,
            scene: None,
            showing_placeholder: false,
            message: None,
            settled: None,
            recent_events: VecDeque::new(),
            mounted: true,
        };
        info!(product = %session.descriptor.display_name, device = session.device.class.as_str(), "viewer mounted");
        session.begin(now);
        session
    }

    pub fn descriptor(&self) -> &ProductModelDescriptor {
        &self.descriptor
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    pub fn loader(&self) -> &ModelResourceLoader<F> {
        &self.loader
    }

    pub fn surface(&self) -> &RenderSurfaceManager<S> {
        &self.surface
    }

    pub fn camera(&self) -> &CameraControlStateMachine {
        &self.camera
    }

    pub fn ar(&self) -> &ArHandoffRouter<A> {
        &self.ar
    }

    pub fn customization(&self) -> &CustomizationStore {
        &self.customization
    }

    pub fn status(&self) -> ViewerStatus {
        let load_state = self.loader.state();
        ViewerStatus {
            load_state,
            loading: load_state.is_busy(),
            message: self.message.clone(),
            showing_placeholder: self.showing_placeholder,
            surface: self.surface.state(),
            transition: self.camera.state(),
            presets_enabled: self.camera.presets_enabled(),
            ar: self.ar.availability(),
            rotating: self.rotating.is_enabled(),
            scale_factors: self.customization.scale_factors(),
            price_adjustment: self.customization.price_adjustment(),
            recent_events: self.recent_events.iter().cloned().collect(),
        }
    }

    /// Most recent component transitions, oldest first.
    pub fn recent_events(&self) -> impl Iterator<Item = &str> {
        self.recent_events.iter().map(String::as_str)
    }

    /// Switches to another product. The previous scene's GPU resources are
    /// released before the next load starts.
    pub fn set_descriptor(&mut self, descriptor: ProductModelDescriptor, now: Time) {
        if !self.mounted || descriptor == self.descriptor {
            return;
        }
        debug!(product = %descriptor.display_name, "switching product");
        let same_model = descriptor.model_url.is_some()
            && descriptor.model_url == self.descriptor.model_url
            && !self.showing_placeholder;
        self.customization = CustomizationStore::new(
            descriptor.base_dimensions,
            self.config.limits.clone(),
            self.config.prices.clone(),
        );
        self.descriptor = descriptor;
        if same_model {
            self.apply_scale();
            return;
        }

        self.surface.release_scene();
        self.scene = None;
        self.showing_placeholder = false;
        self.message = None;
        self.ar.close(now);
        self.begin(now);
    }

    /// Tears everything down: in-flight load, timers, AR resources, surface
    /// listeners and GPU memory.
    pub fn unmount(&mut self, now: Time) {
        if !self.mounted {
            return;
        }
        self.loader.cancel();
        self.ar.close(now);
        self.surface.teardown(now);
        self.scene = None;
        self.mounted = false;
        info!("viewer unmounted");
    }

    /// Caller-driven retry after a failed load.
    pub fn retry(&mut self, now: Time) -> bool {
        if !self.mounted || self.loader.retry(now).is_none() {
            return false;
        }
        self.message = None;
        true
    }

    pub fn dismiss_message(&mut self) {
        self.message = None;
    }

    pub fn on_verify_result(&mut self, request: Request, result: Result<(), FetchError>, now: Time) {
        self.loader.on_verify_result(request, result, now);
        self.settle_load(now);
    }

    pub fn on_download_result(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, FetchError>,
        now: Time,
    ) {
        self.loader.on_download_result(request, result, now);
        self.settle_load(now);
    }

    pub fn on_context_lost(&mut self, now: Time) {
        self.surface.on_context_lost(now);
    }

    pub fn on_context_restored(&mut self, now: Time) {
        let camera = self.render_camera();
        self.surface
            .on_context_restored(now, self.scene.as_ref(), camera);
    }

    pub fn on_ar_script_loaded(&mut self, now: Time) {
        self.ar.on_script_loaded(now);
    }

    pub fn on_ar_script_failed(&mut self, detail: &str, now: Time) {
        self.ar.on_script_failed(detail, now);
    }

    pub fn on_ar_signal(&mut self, signal: ArSignal, now: Time) {
        self.ar.on_signal(signal, now);
    }

    /// One host tick: fire due timers, spin the model and draw a frame.
    /// Returns whether a frame was submitted.
    pub fn advance(&mut self, now: Time) -> bool {
        if !self.mounted {
            return false;
        }
        self.loader.advance(now);
        self.settle_load(now);
        self.surface.advance(now);
        self.camera.advance(now);
        self.ar.advance(now);

        if self.rotating.is_enabled() {
            self.rotating.advance(now);
            let rotation = self.rotating.rotation();
            if let Some(scene) = self.scene.as_mut() {
                scene.set_root_rotation(rotation);
            }
        }
        let drawn = self.draw();
        self.drain_events();
        drawn
    }

    pub fn select_preset(&mut self, preset: CameraPreset, now: Time) -> bool {
        self.camera.select_preset(preset, now)
    }

    pub fn orbit(&mut self, delta_x_px: f64, delta_y_px: f64) -> bool {
        self.camera.orbit(delta_x_px, delta_y_px)
    }

    pub fn zoom(&mut self, wheel_delta_y: f64) -> bool {
        self.camera.zoom(wheel_delta_y)
    }

    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) -> bool {
        self.camera.pan(delta_x_px, delta_y_px)
    }

    pub fn toggle_rotation(&mut self, now: Time) -> bool {
        self.rotating.toggle(now)
    }

    pub fn set_dimension(&mut self, axis: Axis, value: f64) -> Result<f64, CustomizationError> {
        let stored = self.customization.set_dimension(axis, value)?;
        self.apply_scale();
        Ok(stored)
    }

    /// Re-applies previously saved selections to the current product.
    pub fn restore_customization(&mut self, saved: &CustomizationState) {
        self.customization.restore(saved);
        self.apply_scale();
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<f64, CustomizationError> {
        self.customization.set_option(name, value)
    }

    pub fn add_to_cart_intent(&self, slug: &str, quantity: u32, list_price: f64) -> AddToCartIntent {
        self.customization.cart_intent(slug, quantity, list_price)
    }

    /// Starts the AR handoff for this product. `None` when the product has
    /// no 3D asset to show in AR.
    pub fn request_ar(
        &mut self,
        product_url: &str,
        now: Time,
    ) -> Result<Option<ArOutcome>, HandoffError> {
        let Some(model_url) = self.descriptor.model_url.clone() else {
            return Ok(None);
        };
        self.ar.request(&model_url, product_url, now).map(Some)
    }

    /// Opens AR on arrival when the page URL carries `ar=true` and the
    /// device can run it in-page.
    pub fn auto_open_ar(
        &mut self,
        page_url: &str,
        now: Time,
    ) -> Result<Option<ArOutcome>, HandoffError> {
        if !self.device.is_mobile() || !wants_ar(page_url) {
            return Ok(None);
        }
        self.request_ar(page_url, now)
    }

    pub fn retry_ar(&mut self, now: Time) -> Result<Option<ArOutcome>, HandoffError> {
        self.ar.retry(now)
    }

    fn begin(&mut self, now: Time) {
        self.settled = None;
        match self.descriptor.model_url.clone() {
            Some(url) => {
                self.loader.load(&url, now);
            }
            None => {
                self.loader.cancel();
                self.show_placeholder();
            }
        }
    }

    /// Applies a terminal load state to the view, once per attempt.
    fn settle_load(&mut self, now: Time) {
        let status = self.loader.status();
        let Some(request) = status.request else {
            return;
        };
        if !status.state.is_terminal() || self.settled == Some(request) {
            return;
        }
        self.settled = Some(request);

        match status.state {
            LoadState::Ready => {
                let Some(mut scene) = self.loader.take_scene(request) else {
                    return;
                };
                let report = self.normalizer.normalize(&mut scene);
                debug!(materials = report.materials, textures = report.textures, "materials normalized");
                self.surface.release_scene();
                self.scene = Some(scene);
                self.showing_placeholder = false;
                self.message = None;
                self.apply_scale();
                self.frame(now);
            }
            LoadState::Failed | LoadState::TimedOut => {
                self.message = Some(match &status.error {
                    Some(err) => ViewerMessage::from_load_error(err),
                    None => ViewerMessage::timed_out(),
                });
                self.show_placeholder();
                self.frame(now);
            }
            _ => {}
        }
    }

    fn show_placeholder(&mut self) {
        if self.showing_placeholder {
            return;
        }
        self.surface.release_scene();
        self.scene = Some(placeholder_box(self.descriptor.base_dimensions.to_array()));
        self.showing_placeholder = true;
        self.apply_scale();
    }

    fn frame(&mut self, now: Time) {
        if let Some(scene) = &self.scene {
            self.camera.frame_bounds(&scene.world_bounds(), now);
        }
    }

    fn apply_scale(&mut self) {
        let [w, d, h] = self.customization.scale_factors();
        if let Some(scene) = self.scene.as_mut() {
            scene.set_root_scale(Vec3::new(w, h, d));
        }
    }

    fn render_camera(&self) -> Camera3D {
        let pose = self.camera.pose();
        let cfg = self.camera.config();
        Camera3D::look_at(pose.position, pose.target, cfg.fov_y_rad, cfg.near, cfg.far)
    }

    fn draw(&mut self) -> bool {
        let camera = self.render_camera();
        let Some(scene) = &self.scene else {
            return false;
        };
        self.surface.draw(scene, camera)
    }

    /// Moves every component's pending events into the log and the recent
    /// list, so no bus outlives a tick.
    fn drain_events(&mut self) {
        let mut lines = Vec::new();
        for e in self.loader.events_mut().drain() {
            debug!(seq = e.seq, at = e.at.0, request = %e.payload.request, state = %e.payload.state, "load event");
            lines.push(format!("{:.3} load {} {}", e.at.0, e.payload.request, e.payload.state));
        }
        for e in self.surface.events_mut().drain() {
            debug!(seq = e.seq, at = e.at.0, event = ?e.payload, "surface event");
            lines.push(format!("{:.3} surface {:?}", e.at.0, e.payload));
        }
        for e in self.camera.events_mut().drain() {
            debug!(seq = e.seq, at = e.at.0, event = ?e.payload, "camera event");
            lines.push(format!("{:.3} camera {:?}", e.at.0, e.payload));
        }
        for e in self.ar.events_mut().drain() {
            debug!(seq = e.seq, at = e.at.0, event = ?e.payload, "ar event");
            lines.push(format!("{:.3} ar {:?}", e.at.0, e.payload));
        }
        for line in lines {
            if self.recent_events.len() == RECENT_EVENTS {
                self.recent_events.pop_front();
            }
            self.recent_events.push_back(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RECENT_EVENTS, ViewerPlatform, ViewerSession};
    use crate::config::ViewerConfig;
    use crate::status::ViewerMessage;
    use camera::CameraPreset;
    use catalog::{Axis, Dimensions, ProductModelDescriptor};
    use formats::samples::sample_chair_glb;
    use foundation::time::Time;
    use gpu::{RecordingSurface, SurfaceState};
    use handoff::{ArAvailability, ArOutcome, RecordingArPlatform};
    use pretty_assertions::assert_eq;
    use runtime::device::DeviceProfile;
    use runtime::event_bus::DEFAULT_EVENT_CAPACITY;
    use scene::components::Side;
    use streaming::{FetchError, LoadErrorKind, LoadState, RecordingFetcher, Request};

    type Session = ViewerSession<RecordingFetcher, RecordingSurface, RecordingArPlatform>;

    const PRODUCT_URL: &str = "https://shop.example/products/oak-chair";

    fn chair(url: Option<&str>) -> ProductModelDescriptor {
        ProductModelDescriptor {
            model_url: url.map(str::to_string),
            base_dimensions: Dimensions::new(60.0, 55.0, 90.0),
            display_name: "Oak chair".to_string(),
        }
    }

    fn mount_with(descriptor: ProductModelDescriptor, device: DeviceProfile) -> Session {
        mount_configured(descriptor, device, ViewerConfig::default())
    }

    fn mount_configured(
        descriptor: ProductModelDescriptor,
        device: DeviceProfile,
        config: ViewerConfig,
    ) -> Session {
        ViewerSession::mount(
            descriptor,
            None,
            config,
            device,
            ViewerPlatform {
                fetcher: RecordingFetcher::new(),
                surface: RecordingSurface::new(1280, 720),
                ar: RecordingArPlatform::new(),
            },
            Time(0.0),
        )
    }

    fn mount(url: &str) -> Session {
        mount_with(chair(Some(url)), DeviceProfile::desktop())
    }

    fn request(s: &Session) -> Request {
        s.loader().current_request().expect("request")
    }

    fn load_chair(s: &mut Session, at: f64) {
        let r = request(s);
        s.on_verify_result(r, Ok(()), Time(at));
        s.on_download_result(r, Ok(sample_chair_glb()), Time(at + 0.5));
    }

    #[test]
    fn loaded_model_is_normalized_and_drawn() {
        let mut s = mount("/models/oak-chair.glb");
        assert!(s.status().loading);
        load_chair(&mut s, 0.1);

        let status = s.status();
        assert_eq!(status.load_state, LoadState::Ready);
        assert!(!status.loading);
        assert!(!status.showing_placeholder);
        assert_eq!(status.message, None);

        let scene = s.scene().expect("scene");
        let m = &scene.materials()[0];
        assert_eq!(m.appearance.base_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(m.appearance.side, Side::Front);
        assert_eq!(m.appearance.metalness, 0.0);

        assert!(s.advance(Time(1.0)));
        assert_eq!(s.surface().platform().submitted.len(), 1);
    }

    #[test]
    fn missing_model_shows_not_found_and_placeholder() {
        let mut s = mount("/missing.model");
        let r = request(&s);
        s.on_verify_result(r, Err(FetchError::HttpStatus(404)), Time(0.2));

        let status = s.status();
        assert_eq!(status.load_state, LoadState::Failed);
        assert!(status.showing_placeholder);
        let message = status.message.expect("message");
        assert_eq!(message.kind, LoadErrorKind::DownloadNotFound.as_str());

        s.advance(Time(500.0));
        assert_eq!(s.status().load_state, LoadState::Failed);
        assert!(s.scene().is_some());

        s.dismiss_message();
        assert_eq!(s.status().message, None);
        assert!(s.status().showing_placeholder);
    }

    #[test]
    fn download_timeout_is_a_classified_failure() {
        let mut s = mount("/slow.glb");
        let r = request(&s);
        s.on_verify_result(r, Ok(()), Time(0.1));
        s.advance(Time(89.0));
        assert_eq!(s.status().load_state, LoadState::Failed);
        assert_eq!(
            s.status().message.map(|m| m.kind),
            Some(LoadErrorKind::DownloadTimeout.as_str())
        );
    }

    #[test]
    fn watchdog_expiry_reports_timed_out() {
        let mut config = ViewerConfig::default();
        config.loader.download_timeout_s = 200.0;
        config.loader.watchdog_timeout_s = 90.0;
        let mut s = mount_configured(chair(Some("/stalled.glb")), DeviceProfile::desktop(), config);
        let r = request(&s);
        s.on_verify_result(r, Ok(()), Time(0.1));

        s.advance(Time(89.0));
        assert!(s.status().loading);
        s.advance(Time(90.5));

        let status = s.status();
        assert_eq!(status.load_state, LoadState::TimedOut);
        assert_eq!(status.message, Some(ViewerMessage::timed_out()));
        assert!(status.showing_placeholder);
        assert!(s.loader().fetcher().aborted(r));

        // A download landing after the watchdog is ignored.
        s.on_download_result(r, Ok(sample_chair_glb()), Time(91.0));
        assert_eq!(s.status().load_state, LoadState::TimedOut);
        assert!(s.status().showing_placeholder);
    }

    #[test]
    fn retry_after_failure_loads_again() {
        let mut s = mount("/flaky.glb");
        let r = request(&s);
        s.on_verify_result(r, Ok(()), Time(0.1));
        s.on_download_result(r, Err(FetchError::Network("reset".into())), Time(0.2));
        assert!(s.status().showing_placeholder);

        assert!(s.retry(Time(1.0)));
        assert_eq!(s.status().message, None);
        load_chair(&mut s, 1.1);
        assert_eq!(s.status().load_state, LoadState::Ready);
        assert!(!s.status().showing_placeholder);
        assert_eq!(s.loader().fetcher().downloads(), 2);
    }

    #[test]
    fn dimension_changes_scale_the_root_only() {
        let mut s = mount("/models/oak-chair.glb");
        load_chair(&mut s, 0.1);
        s.set_dimension(Axis::Width, 80.0).expect("width");

        let scene = s.scene().expect("scene");
        let scale = scene.root_transform().scale;
        assert!((scale.x - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(scale.y, 1.0);
        assert_eq!(scale.z, 1.0);

        let intent = {
            s.set_option("fittings", "Premium").expect("option");
            s.add_to_cart_intent("oak-chair", 1, 199.0)
        };
        assert_eq!(intent.price_adjustment, 25.0);
        assert_eq!(intent.unit_price, 224.0);
    }

    #[test]
    fn context_loss_recovers_with_one_redraw() {
        let mut s = mount("/models/oak-chair.glb");
        load_chair(&mut s, 0.1);
        s.advance(Time(1.0));

        s.on_context_lost(Time(2.0));
        assert_eq!(s.status().surface, SurfaceState::Lost);
        assert!(!s.advance(Time(2.05)));
        s.advance(Time(2.2));
        s.on_context_restored(Time(2.3));

        assert_eq!(s.status().surface, SurfaceState::Active);
        assert_eq!(s.surface().redraws(), 1);
    }

    #[test]
    fn recovery_redraw_follows_camera_moved_while_lost() {
        let mut s = mount("/models/oak-chair.glb");
        load_chair(&mut s, 0.1);
        s.advance(Time(1.0));
        let before = s.surface().platform().submitted.last().map(|f| f.camera.position);

        s.on_context_lost(Time(2.0));
        assert!(s.orbit(240.0, 0.0));
        s.on_context_restored(Time(2.3));

        let redrawn = s.surface().platform().submitted.last().map(|f| f.camera.position);
        assert_eq!(redrawn, Some(s.camera().pose().position));
        assert_ne!(redrawn, before);
    }

    #[test]
    fn component_events_are_drained_each_tick() {
        let mut s = mount("/models/oak-chair.glb");
        load_chair(&mut s, 0.1);
        s.select_preset(CameraPreset::Top, Time(0.7));
        s.advance(Time(1.0));

        assert_eq!(s.loader().events().len(), 0);
        let recent: Vec<&str> = s.recent_events().collect();
        assert!(recent.iter().any(|e| e.contains("load") && e.contains("ready")));
        assert!(recent.iter().any(|e| e.contains("camera")));
        assert_eq!(s.status().recent_events.len(), recent.len());

        for i in 0..100 {
            s.select_preset(CameraPreset::Left, Time(2.0 + i as f64));
            s.advance(Time(2.5 + i as f64));
        }
        assert_eq!(s.recent_events().count(), RECENT_EVENTS);
    }

    #[test]
    fn event_logs_stay_bounded_without_ticks() {
        let mut s = mount("/a.glb");
        for i in 0..10_000 {
            let url = if i % 2 == 0 { "/b.glb" } else { "/a.glb" };
            s.set_descriptor(chair(Some(url)), Time(i as f64 * 0.001));
        }
        assert!(s.loader().events().len() <= DEFAULT_EVENT_CAPACITY);
        assert!(s.loader().events().dropped() > 0);

        s.advance(Time(11.0));
        assert!(s.loader().events().is_empty());
        assert!(s.recent_events().count() <= RECENT_EVENTS);
    }

    #[test]
    fn product_switch_aborts_and_releases() {
        let mut s = mount("/a.glb");
        load_chair(&mut s, 0.1);
        let releases = s.surface().platform().releases;

        s.set_descriptor(chair(Some("/b.glb")), Time(1.0));
        assert!(s.scene().is_none());
        assert!(s.surface().platform().releases > releases);
        let b = request(&s);
        s.on_verify_result(b, Ok(()), Time(1.1));

        s.set_descriptor(chair(Some("/c.glb")), Time(2.0));
        assert!(s.loader().fetcher().aborted(b));
        s.on_download_result(b, Ok(sample_chair_glb()), Time(2.1));
        assert!(s.scene().is_none());
        assert_eq!(s.loader().status().url.as_deref(), Some("/c.glb"));
    }

    #[test]
    fn same_descriptor_does_not_reload() {
        let mut s = mount("/a.glb");
        s.set_descriptor(chair(Some("/a.glb")), Time(0.5));
        let r = request(&s);
        s.on_verify_result(r, Ok(()), Time(0.6));
        s.set_descriptor(chair(Some("/a.glb")), Time(0.7));
        assert_eq!(s.loader().fetcher().verifies(), 1);
        assert_eq!(s.loader().fetcher().downloads(), 1);
    }

    #[test]
    fn missing_model_url_uses_placeholder_and_skips_ar() {
        let mut s = mount_with(chair(None), DeviceProfile::mobile());
        assert!(s.status().showing_placeholder);
        assert_eq!(s.status().message, None);
        assert_eq!(s.loader().fetcher().calls.len(), 0);
        assert_eq!(s.request_ar(PRODUCT_URL, Time(0.1)).expect("ar"), None);
    }

    #[test]
    fn desktop_ar_request_yields_qr() {
        let mut s = mount("/models/oak-chair.glb");
        let out = s.request_ar(PRODUCT_URL, Time(0.1)).expect("ar");
        assert!(matches!(out, Some(ArOutcome::Qr(_))));
        assert!(s.ar().platform().presented.is_empty());
        assert_eq!(
            s.auto_open_ar(&format!("{PRODUCT_URL}?ar=true"), Time(0.2))
                .expect("auto"),
            None
        );
    }

    #[test]
    fn mobile_deep_link_auto_opens_ar() {
        let mut s = mount_with(chair(Some("/models/oak-chair.glb")), DeviceProfile::mobile());
        assert_eq!(s.auto_open_ar(PRODUCT_URL, Time(0.0)).expect("auto"), None);

        let out = s
            .auto_open_ar(&format!("{PRODUCT_URL}?ar=true"), Time(0.1))
            .expect("auto");
        assert_eq!(out, Some(ArOutcome::Pending));
        assert_eq!(s.status().ar, ArAvailability::Checking);

        s.on_ar_script_failed("blocked", Time(0.5));
        assert_eq!(s.status().ar, ArAvailability::Unavailable);
        assert!(s.ar().platform().qr_visible);
    }

    #[test]
    fn unmount_releases_everything() {
        let mut s = mount_with(chair(Some("/a.glb")), DeviceProfile::mobile());
        let r = request(&s);
        s.request_ar(PRODUCT_URL, Time(0.1)).expect("ar");
        s.on_ar_script_failed("offline", Time(0.2));
        assert!(!s.ar().platform().is_clean());

        s.unmount(Time(1.0));
        assert!(s.loader().fetcher().aborted(r));
        assert_eq!(s.loader().pending_timers(), 0);
        assert!(s.surface().platform().active_subscriptions.is_empty());
        assert!(s.ar().platform().is_clean());
        assert!(!s.advance(Time(2.0)));

        // Late completions after unmount change nothing.
        s.on_verify_result(r, Ok(()), Time(3.0));
        assert_eq!(s.status().load_state, LoadState::Idle);
    }

    #[test]
    fn presets_and_rotation() {
        let mut s = mount("/models/oak-chair.glb");
        load_chair(&mut s, 0.1);

        assert!(s.select_preset(CameraPreset::Left, Time(1.0)));
        assert!(!s.select_preset(CameraPreset::Right, Time(1.1)));
        assert!(!s.status().presets_enabled);
        s.advance(Time(1.4));
        assert!(s.status().presets_enabled);

        assert!(s.toggle_rotation(Time(2.0)));
        s.advance(Time(3.0));
        let rotation = s.scene().expect("scene").root_transform().rotation;
        assert!(rotation.angle() > 0.0);
        assert!(s.status().rotating);
    }
}
