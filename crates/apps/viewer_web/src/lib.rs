use std::cell::{Cell, RefCell};

use camera::CameraPreset;
use catalog::{
    Axis, CustomizationSnapshot, CustomizationSnapshotStore, LocalStorageCustomizationStore,
    ProductModelDescriptor,
};
use console_error_panic_hook::set_once;
use foundation::time::Time;
use handoff::ArOutcome;
use runtime::device::{DeviceClassifier, DeviceSignals};
use serde::Serialize;
use viewer::{ViewerConfig, ViewerPlatform, ViewerSession};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod ar;
mod fetch;
mod surface;

use ar::WebArPlatform;
use fetch::WebFetcher;
use surface::WebGlSurface;

const SNAPSHOT_KEY: &str = "viewer.customization";

pub(crate) struct Host {
    epoch: u64,
    slug: String,
    pub(crate) session: ViewerSession<WebFetcher, WebGlSurface, WebArPlatform>,
    snapshots: Option<LocalStorageCustomizationStore>,
}

thread_local! {
    static HOST: RefCell<Option<Host>> = const { RefCell::new(None) };
    // Distinguishes callbacks of a previous mount from the current one.
    static NEXT_EPOCH: Cell<u64> = const { Cell::new(1) };
}

pub(crate) fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

fn now() -> Time {
    let ms = web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now);
    Time(ms / 1000.0)
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Runs `f` against the mounted host of `epoch` right away. Returns `false`
/// when the host is busy (re-entrant browser callback).
pub(crate) fn dispatch_now(epoch: u64, f: impl FnOnce(&mut Host, Time)) -> bool {
    HOST.with(|cell| {
        let Ok(mut guard) = cell.try_borrow_mut() else {
            return false;
        };
        if let Some(host) = guard.as_mut().filter(|h| h.epoch == epoch) {
            f(host, now());
        }
        true
    })
}

/// Queues `f` for the mounted host of `epoch`; stale epochs are dropped.
pub(crate) fn defer(epoch: u64, f: impl FnOnce(&mut Host, Time) + 'static) {
    spawn_local(async move {
        if !dispatch_now(epoch, f) {
            log("viewer busy; dropped callback");
        }
    });
}

fn with_host<R>(f: impl FnOnce(&mut Host, Time) -> R) -> Result<R, JsValue> {
    HOST.with(|cell| {
        let mut guard = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("viewer busy"))?;
        let host = guard
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer not mounted"))?;
        Ok(f(host, now()))
    })
}

fn read_device_signals() -> DeviceSignals {
    let Some(win) = web_sys::window() else {
        return DeviceSignals::default();
    };
    let nav = win.navigator();
    let px = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    DeviceSignals {
        user_agent: nav.user_agent().unwrap_or_default(),
        max_touch_points: nav.max_touch_points().max(0) as u32,
        has_touch_events: js_sys::Reflect::has(&win, &JsValue::from_str("ontouchstart"))
            .unwrap_or(false),
        coarse_pointer: win
            .match_media("(pointer: coarse)")
            .ok()
            .flatten()
            .is_some_and(|m| m.matches()),
        viewport_width: px(win.inner_width()),
        viewport_height: px(win.inner_height()),
    }
}

fn save_customization(host: &mut Host) {
    let Some(store) = host.snapshots.as_mut() else {
        return;
    };
    let snapshot = CustomizationSnapshot {
        slug: host.slug.clone(),
        state: host.session.customization().state().clone(),
        saved_at_ms: js_sys::Date::now() as u64,
    };
    if let Err(e) = store.save(snapshot) {
        log(&format!("customization not saved: {e}"));
    }
}

fn saved_customization(
    store: Option<&LocalStorageCustomizationStore>,
    slug: &str,
) -> Option<CustomizationSnapshot> {
    match store?.load(slug) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log(&format!("saved customization ignored: {e}"));
            None
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArOutcomeView {
    outcome: &'static str,
    deep_link: Option<String>,
    qr_svg: Option<String>,
}

impl ArOutcomeView {
    fn new(outcome: Option<ArOutcome>) -> Self {
        let (name, bridge) = match outcome {
            None => ("none", None),
            Some(ArOutcome::Session) => ("session", None),
            Some(ArOutcome::Pending) => ("pending", None),
            Some(ArOutcome::Qr(bridge)) => ("qr", Some(bridge)),
        };
        Self {
            outcome: name,
            deep_link: bridge.as_ref().map(|b| b.copy_link().to_string()),
            qr_svg: bridge.map(|b| b.svg),
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts a viewer on `canvas_id` for the product `slug`.
///
/// `descriptor_json` is a `ProductModelDescriptor`; `config_json` may be
/// empty for defaults.
#[wasm_bindgen]
pub fn mount(
    canvas_id: &str,
    slug: &str,
    descriptor_json: &str,
    config_json: &str,
) -> Result<(), JsValue> {
    unmount();

    let descriptor: ProductModelDescriptor = serde_json::from_str(descriptor_json).map_err(js_err)?;
    let config = ViewerConfig::from_json(config_json).map_err(js_err)?;
    let device = DeviceClassifier::default().classify(&read_device_signals());

    let epoch = NEXT_EPOCH.with(|e| {
        let v = e.get();
        e.set(v + 1);
        v
    });
    let snapshots = LocalStorageCustomizationStore::new(SNAPSHOT_KEY).ok();
    let saved = saved_customization(snapshots.as_ref(), slug);

    let platform = ViewerPlatform {
        fetcher: WebFetcher::new(epoch),
        surface: WebGlSurface::new(canvas_id, epoch)?,
        ar: WebArPlatform::new(epoch, &config.ar.element_name),
    };
    let session = ViewerSession::mount(
        descriptor,
        saved.as_ref().map(|s| &s.state),
        config,
        device,
        platform,
        now(),
    );
    log(&format!("viewer mounted ({})", device.class.as_str()));
    HOST.with(|cell| {
        *cell.borrow_mut() = Some(Host {
            epoch,
            slug: slug.to_string(),
            session,
            snapshots,
        });
    });

    if let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) {
        match with_host(|h, now| h.session.auto_open_ar(&href, now))? {
            Ok(Some(_)) => log("opening AR from deep link"),
            Ok(None) => {}
            Err(e) => log(&format!("AR deep link ignored: {e}")),
        }
    }
    Ok(())
}

/// Switches the mounted viewer to another product.
#[wasm_bindgen]
pub fn set_model(slug: &str, descriptor_json: &str) -> Result<(), JsValue> {
    let descriptor: ProductModelDescriptor = serde_json::from_str(descriptor_json).map_err(js_err)?;
    with_host(|h, now| {
        h.session.set_descriptor(descriptor, now);
        if h.slug != slug {
            h.slug = slug.to_string();
            if let Some(saved) = saved_customization(h.snapshots.as_ref(), slug) {
                h.session.restore_customization(&saved.state);
            }
        }
    })
}

#[wasm_bindgen]
pub fn select_preset(name: &str) -> Result<bool, JsValue> {
    let preset = CameraPreset::parse(name)
        .ok_or_else(|| JsValue::from_str(&format!("unknown preset: {name}")))?;
    with_host(|h, now| h.session.select_preset(preset, now))
}

/// Pointer drag delta in pixels.
#[wasm_bindgen]
pub fn camera_orbit(delta_x_px: f64, delta_y_px: f64) -> Result<bool, JsValue> {
    with_host(|h, _| h.session.orbit(delta_x_px, delta_y_px))
}

/// Wheel `deltaY`.
#[wasm_bindgen]
pub fn camera_zoom(wheel_delta_y: f64) -> Result<bool, JsValue> {
    with_host(|h, _| h.session.zoom(wheel_delta_y))
}

#[wasm_bindgen]
pub fn camera_pan(delta_x_px: f64, delta_y_px: f64) -> Result<bool, JsValue> {
    with_host(|h, _| h.session.pan(delta_x_px, delta_y_px))
}

/// Returns the stored (clamped) value in centimetres.
#[wasm_bindgen]
pub fn set_dimension(axis: &str, value: f64) -> Result<f64, JsValue> {
    let axis = Axis::parse(axis).ok_or_else(|| JsValue::from_str(&format!("unknown axis: {axis}")))?;
    with_host(|h, _| {
        let stored = h.session.set_dimension(axis, value).map_err(js_err)?;
        save_customization(h);
        Ok(stored)
    })?
}

/// Returns the resulting price adjustment.
#[wasm_bindgen]
pub fn set_option(name: &str, value: &str) -> Result<f64, JsValue> {
    with_host(|h, _| {
        let adjustment = h.session.set_option(name, value).map_err(js_err)?;
        save_customization(h);
        Ok(adjustment)
    })?
}

#[wasm_bindgen]
pub fn toggle_rotation() -> Result<bool, JsValue> {
    with_host(|h, now| h.session.toggle_rotation(now))
}

/// JSON `{ outcome, deepLink, qrSvg }`.
#[wasm_bindgen]
pub fn request_ar(product_url: &str) -> Result<String, JsValue> {
    let outcome = with_host(|h, now| h.session.request_ar(product_url, now))?.map_err(js_err)?;
    serde_json::to_string(&ArOutcomeView::new(outcome)).map_err(js_err)
}

#[wasm_bindgen]
pub fn retry_ar() -> Result<String, JsValue> {
    let outcome = with_host(|h, now| h.session.retry_ar(now))?.map_err(js_err)?;
    serde_json::to_string(&ArOutcomeView::new(outcome)).map_err(js_err)
}

#[wasm_bindgen]
pub fn close_ar() -> Result<(), JsValue> {
    with_host(|h, now| h.session.on_ar_signal(handoff::ArSignal::PanelDismissed, now))
}

#[wasm_bindgen]
pub fn retry_load() -> Result<bool, JsValue> {
    with_host(|h, now| h.session.retry(now))
}

#[wasm_bindgen]
pub fn dismiss_message() -> Result<(), JsValue> {
    with_host(|h, _| h.session.dismiss_message())
}

/// One animation frame: fires due timers and draws. Call from
/// `requestAnimationFrame`.
#[wasm_bindgen]
pub fn tick() -> bool {
    with_host(|h, now| h.session.advance(now)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn status_json() -> Result<String, JsValue> {
    with_host(|h, _| serde_json::to_string(&h.session.status()))?.map_err(js_err)
}

/// JSON `AddToCartIntent` for the current selections.
#[wasm_bindgen]
pub fn cart_intent_json(quantity: u32, list_price: f64) -> Result<String, JsValue> {
    with_host(|h, _| {
        let intent = h.session.add_to_cart_intent(&h.slug, quantity, list_price);
        serde_json::to_string(&intent)
    })?
    .map_err(js_err)
}

/// Releases the viewer: aborts loads, removes listeners, frees GPU memory.
#[wasm_bindgen]
pub fn unmount() {
    let host = HOST.with(|cell| cell.try_borrow_mut().ok().and_then(|mut g| g.take()));
    if let Some(mut host) = host {
        host.session.unmount(now());
        log("viewer unmounted");
    }
}
