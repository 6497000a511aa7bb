use foundation::time::Time;
use runtime::device::DeviceProfile;
use runtime::event_bus::EventBus;
use runtime::timers::TimerQueue;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ArConfig;
use crate::error::{ArUnavailable, ArUnavailableReason, HandoffError};
use crate::platform::{ArPlatform, ArSignal, ListenerId};
use crate::qr::QrBridge;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArAvailability {
    Unknown,
    Checking,
    Available,
    Unavailable,
}

/// Result of an AR request.
#[derive(Debug, Clone, PartialEq)]
pub enum ArOutcome {
    /// In-page AR session is presenting.
    Session,
    /// Capability check in progress; the session or QR opens once it settles.
    Pending,
    Qr(QrBridge),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArSurface {
    Session,
    Qr(QrBridge),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArEvent {
    Availability(ArAvailability),
    ScriptRequested,
    SessionPresented,
    QrShown,
    Unavailable(ArUnavailable),
    Closed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ArTimer {
    ScriptTimeout(u64),
    Settle(u64),
}

#[derive(Debug, Clone, PartialEq)]
struct ArRequest {
    model_url: String,
    product_url: String,
}

/// Decides between an in-page AR session and the QR bridge.
///
/// Desktop devices always get the QR bridge. Mobile devices check for the AR
/// element once per view, loading its script if needed; any failure degrades
/// to the QR bridge. Availability only moves forward, except through
/// [`ArHandoffRouter::retry`].
pub struct ArHandoffRouter<P: ArPlatform> {
    config: ArConfig,
    device: DeviceProfile,
    platform: P,
    availability: ArAvailability,
    unavailable: Option<ArUnavailable>,
    surface: Option<ArSurface>,
    listeners: Vec<ListenerId>,
    scroll_locked: bool,
    pending: Option<ArRequest>,
    last: Option<ArRequest>,
    attempt: u64,
    timers: TimerQueue<ArTimer>,
    events: EventBus<ArEvent>,
}

impl<P: ArPlatform> ArHandoffRouter<P> {
    pub fn new(config: ArConfig, device: DeviceProfile, platform: P) -> Self {
        Self {
            config,
            device,
            platform,
            availability: ArAvailability::Unknown,
            unavailable: None,
            surface: None,
            listeners: Vec::new(),
            scroll_locked: false,
            pending: None,
            last: None,
            attempt: 0,
            timers: TimerQueue::new(),
            events: EventBus::new(),
        }
    }

    pub fn availability(&self) -> ArAvailability {
        self.availability
    }

    pub fn unavailable(&self) -> Option<&ArUnavailable> {
        self.unavailable.as_ref()
    }

    pub fn surface(&self) -> Option<&ArSurface> {
        self.surface.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn events_mut(&mut self) -> &mut EventBus<ArEvent> {
        &mut self.events
    }

    pub fn request(
        &mut self,
        model_url: &str,
        product_url: &str,
        now: Time,
    ) -> Result<ArOutcome, HandoffError> {
        self.close(now);
        let req = ArRequest {
            model_url: model_url.to_string(),
            product_url: product_url.to_string(),
        };
        self.last = Some(req.clone());

        if !self.device.is_mobile() {
            return self.open_qr(&req.product_url, now);
        }

        match self.availability {
            ArAvailability::Available => self.open_session(req, now),
            ArAvailability::Unavailable => self.open_qr(&req.product_url, now),
            ArAvailability::Checking => {
                self.pending = Some(req);
                Ok(ArOutcome::Pending)
            }
            ArAvailability::Unknown => {
                self.set_availability(ArAvailability::Checking, now);
                if self.platform.element_registered(&self.config.element_name) {
                    self.set_availability(ArAvailability::Available, now);
                    return self.open_session(req, now);
                }
                self.attempt += 1;
                self.pending = Some(req);
                self.platform.load_script(&self.config.script_url);
                self.timers.schedule(
                    now.after(self.config.script_timeout_s),
                    ArTimer::ScriptTimeout(self.attempt),
                );
                debug!(script = %self.config.script_url, "loading AR element script");
                self.events.emit(now, ArEvent::ScriptRequested);
                Ok(ArOutcome::Pending)
            }
        }
    }

    /// Re-checks after an `Unavailable` verdict and replays the last request.
    pub fn retry(&mut self, now: Time) -> Result<Option<ArOutcome>, HandoffError> {
        if self.availability != ArAvailability::Unavailable {
            return Ok(None);
        }
        self.unavailable = None;
        self.set_availability(ArAvailability::Unknown, now);
        let Some(last) = self.last.clone() else {
            return Ok(None);
        };
        self.request(&last.model_url, &last.product_url, now).map(Some)
    }

    pub fn on_script_loaded(&mut self, now: Time) {
        if self.availability != ArAvailability::Checking {
            return;
        }
        let attempt = self.attempt;
        self.timers
            .cancel_where(|t| *t == ArTimer::ScriptTimeout(attempt));
        self.timers
            .schedule(now.after(self.config.settle_s), ArTimer::Settle(attempt));
    }

    pub fn on_script_failed(&mut self, detail: &str, now: Time) {
        if self.availability != ArAvailability::Checking {
            return;
        }
        self.fail_check(ArUnavailableReason::ScriptLoadFailed, detail, now);
    }

    /// Any platform signal ends the current AR surface.
    pub fn on_signal(&mut self, signal: ArSignal, now: Time) {
        debug!(?signal, "AR surface signal");
        self.close(now);
    }

    pub fn advance(&mut self, now: Time) {
        while let Some((_, timer)) = self.timers.pop_due(now) {
            let checking = self.availability == ArAvailability::Checking;
            match timer {
                ArTimer::ScriptTimeout(p) if checking && p == self.attempt => {
                    self.fail_check(
                        ArUnavailableReason::ScriptLoadFailed,
                        "AR element script timed out",
                        now,
                    );
                }
                ArTimer::Settle(p) if checking && p == self.attempt => {
                    if self.platform.element_registered(&self.config.element_name) {
                        self.set_availability(ArAvailability::Available, now);
                        if let Some(req) = self.pending.take()
                            && let Err(e) = self.open_session(req, now)
                        {
                            warn!(error = %e, "AR fallback failed");
                        }
                    } else {
                        self.fail_check(
                            ArUnavailableReason::UnsupportedPlatform,
                            "AR element not registered after script load",
                            now,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// Releases everything acquired for the current surface. Safe to call
    /// from any exit path, any number of times.
    pub fn close(&mut self, now: Time) -> bool {
        let had_surface = self.surface.is_some();
        let acquired = had_surface || self.scroll_locked || !self.listeners.is_empty();
        self.pending = None;
        if !acquired {
            return false;
        }
        self.release();
        if had_surface {
            info!("AR surface closed");
        }
        self.events.emit(now, ArEvent::Closed);
        true
    }

    fn release(&mut self) {
        for id in self.listeners.drain(..) {
            self.platform.unsubscribe(id);
        }
        if self.scroll_locked {
            self.platform.unlock_scroll();
            self.scroll_locked = false;
        }
        if let Some(ArSurface::Qr(_)) = self.surface.take() {
            self.platform.hide_qr();
        }
    }

    fn acquire(&mut self, signal: ArSignal) {
        self.platform.lock_scroll();
        self.scroll_locked = true;
        self.listeners.push(self.platform.subscribe(signal));
        self.listeners
            .push(self.platform.subscribe(ArSignal::Navigation));
    }

    fn open_session(&mut self, req: ArRequest, now: Time) -> Result<ArOutcome, HandoffError> {
        self.acquire(ArSignal::SessionEnded);
        match self.platform.present(&req.model_url) {
            Ok(()) => {
                self.surface = Some(ArSurface::Session);
                info!(model = %req.model_url, "AR session presented");
                self.events.emit(now, ArEvent::SessionPresented);
                Ok(ArOutcome::Session)
            }
            Err(detail) => {
                self.release();
                self.mark_unavailable(ArUnavailableReason::PresentFailed, &detail, now);
                self.open_qr(&req.product_url, now)
            }
        }
    }

    fn open_qr(&mut self, product_url: &str, now: Time) -> Result<ArOutcome, HandoffError> {
        let bridge = QrBridge::for_product(product_url, self.config.qr_min_size_px)?;
        self.platform.show_qr(&bridge);
        self.acquire(ArSignal::PanelDismissed);
        self.surface = Some(ArSurface::Qr(bridge.clone()));
        self.events.emit(now, ArEvent::QrShown);
        Ok(ArOutcome::Qr(bridge))
    }

    fn fail_check(&mut self, reason: ArUnavailableReason, detail: &str, now: Time) {
        let attempt = self.attempt;
        self.timers.cancel_where(|t| match t {
            ArTimer::ScriptTimeout(p) | ArTimer::Settle(p) => *p == attempt,
        });
        self.mark_unavailable(reason, detail, now);
        if let Some(req) = self.pending.take()
            && let Err(e) = self.open_qr(&req.product_url, now)
        {
            warn!(error = %e, "QR fallback failed");
        }
    }

    fn mark_unavailable(&mut self, reason: ArUnavailableReason, detail: &str, now: Time) {
        let err = ArUnavailable::new(reason, detail);
        info!(reason = ?reason, detail, "AR unavailable; using QR bridge");
        self.unavailable = Some(err.clone());
        self.set_availability(ArAvailability::Unavailable, now);
        self.events.emit(now, ArEvent::Unavailable(err));
    }

    fn set_availability(&mut self, availability: ArAvailability, now: Time) {
        if self.availability != availability {
            self.availability = availability;
            self.events.emit(now, ArEvent::Availability(availability));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArAvailability, ArHandoffRouter, ArOutcome, ArSurface};
    use crate::config::ArConfig;
    use crate::error::ArUnavailableReason;
    use crate::platform::{ArSignal, RecordingArPlatform};
    use foundation::time::Time;
    use runtime::device::DeviceProfile;

    const MODEL: &str = "https://cdn.example/oak-chair.glb";
    const PRODUCT: &str = "https://shop.example/products/oak-chair";

    fn router(device: DeviceProfile, platform: RecordingArPlatform) -> ArHandoffRouter<RecordingArPlatform> {
        ArHandoffRouter::new(ArConfig::default(), device, platform)
    }

    #[test]
    fn desktop_always_gets_qr() {
        let mut p = RecordingArPlatform::new();
        p.registered = true;
        let mut r = router(DeviceProfile::desktop(), p);
        let out = r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        assert!(matches!(out, ArOutcome::Qr(ref q) if q.deep_link.ends_with("?ar=true")));
        assert!(r.platform().presented.is_empty());
        assert!(r.platform().scripts_requested.is_empty());
        assert_eq!(r.availability(), ArAvailability::Unknown);
    }

    #[test]
    fn registered_element_presents_immediately() {
        let mut p = RecordingArPlatform::new();
        p.registered = true;
        let mut r = router(DeviceProfile::mobile(), p);
        assert_eq!(r.request(MODEL, PRODUCT, Time(0.0)).expect("request"), ArOutcome::Session);
        assert_eq!(r.availability(), ArAvailability::Available);
        assert_eq!(r.platform().presented, vec![MODEL.to_string()]);
        assert_eq!(r.platform().scroll_locks, 1);

        r.on_signal(ArSignal::SessionEnded, Time(5.0));
        assert!(r.platform().is_clean());
        assert_eq!(r.surface(), None);
    }

    #[test]
    fn script_load_then_settle_presents() {
        let mut p = RecordingArPlatform::new();
        p.script_registers = true;
        let mut r = router(DeviceProfile::mobile(), p);
        assert_eq!(r.request(MODEL, PRODUCT, Time(0.0)).expect("request"), ArOutcome::Pending);
        assert_eq!(r.availability(), ArAvailability::Checking);

        r.platform_mut().finish_script();
        r.on_script_loaded(Time(1.0));
        r.advance(Time(1.4));
        assert!(r.platform().presented.is_empty());
        r.advance(Time(1.5));
        assert_eq!(r.availability(), ArAvailability::Available);
        assert_eq!(r.surface(), Some(&ArSurface::Session));

        // The script timeout was cancelled when the script loaded.
        r.advance(Time(60.0));
        assert_eq!(r.availability(), ArAvailability::Available);
    }

    #[test]
    fn script_without_element_is_unsupported() {
        let mut r = router(DeviceProfile::mobile(), RecordingArPlatform::new());
        r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        r.on_script_loaded(Time(0.2));
        r.advance(Time(0.7));
        assert_eq!(r.availability(), ArAvailability::Unavailable);
        assert_eq!(
            r.unavailable().map(|u| u.reason),
            Some(ArUnavailableReason::UnsupportedPlatform)
        );
        assert!(matches!(r.surface(), Some(ArSurface::Qr(_))));
        assert!(r.platform().qr_visible);
    }

    #[test]
    fn script_failure_falls_back_and_is_not_rechecked() {
        let mut r = router(DeviceProfile::mobile(), RecordingArPlatform::new());
        r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        r.on_script_failed("404", Time(0.3));
        assert_eq!(
            r.unavailable().map(|u| u.reason),
            Some(ArUnavailableReason::ScriptLoadFailed)
        );
        assert!(matches!(r.surface(), Some(ArSurface::Qr(_))));

        let again = r.request(MODEL, PRODUCT, Time(1.0)).expect("request");
        assert!(matches!(again, ArOutcome::Qr(_)));
        assert_eq!(r.platform().scripts_requested.len(), 1);
        // The previous panel was released before the new one opened.
        assert_eq!(r.platform().scroll_locks, 1);
        assert_eq!(r.platform().listeners.len(), 2);
    }

    #[test]
    fn script_timeout_falls_back() {
        let mut r = router(DeviceProfile::mobile(), RecordingArPlatform::new());
        r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        r.advance(Time(10.0));
        assert_eq!(
            r.unavailable().map(|u| u.reason),
            Some(ArUnavailableReason::ScriptLoadFailed)
        );
        // A late load signal changes nothing.
        r.on_script_loaded(Time(11.0));
        r.advance(Time(12.0));
        assert_eq!(r.availability(), ArAvailability::Unavailable);
    }

    #[test]
    fn present_failure_releases_and_shows_qr() {
        let mut p = RecordingArPlatform::new();
        p.registered = true;
        p.present_error = Some("NotAllowedError".into());
        let mut r = router(DeviceProfile::mobile(), p);
        let out = r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        assert!(matches!(out, ArOutcome::Qr(_)));
        assert_eq!(
            r.unavailable().map(|u| u.reason),
            Some(ArUnavailableReason::PresentFailed)
        );
        assert_eq!(r.platform().scroll_locks, 1);

        assert!(r.close(Time(1.0)));
        assert!(!r.close(Time(1.1)));
        assert!(r.platform().is_clean());
    }

    #[test]
    fn retry_rechecks() {
        let mut r = router(DeviceProfile::mobile(), RecordingArPlatform::new());
        r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        r.on_script_failed("offline", Time(0.1));
        assert_eq!(r.retry(Time(2.0)).expect("retry"), Some(ArOutcome::Pending));
        assert_eq!(r.platform().scripts_requested.len(), 2);
        assert_eq!(r.availability(), ArAvailability::Checking);
        assert_eq!(r.retry(Time(2.1)).expect("retry"), None);
    }

    #[test]
    fn navigation_while_checking_cancels_the_pending_open() {
        let mut p = RecordingArPlatform::new();
        p.script_registers = true;
        let mut r = router(DeviceProfile::mobile(), p);
        r.request(MODEL, PRODUCT, Time(0.0)).expect("request");
        r.close(Time(0.1));
        r.platform_mut().finish_script();
        r.on_script_loaded(Time(0.2));
        r.advance(Time(1.0));
        assert_eq!(r.availability(), ArAvailability::Available);
        assert!(r.platform().presented.is_empty());
        assert!(r.platform().is_clean());
    }
}
