use crate::qr::QrBridge;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// What a listener registered by the router is waiting for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArSignal {
    /// The in-page AR session ended (user exit or platform error).
    SessionEnded,
    /// The QR panel's close control or Escape key.
    PanelDismissed,
    /// The page is navigating away.
    Navigation,
}

/// Browser-side AR capability.
///
/// Everything the router acquires here (listeners, the scroll lock, the QR
/// panel) is released again by [`crate::ArHandoffRouter::close`].
pub trait ArPlatform {
    /// Whether the AR custom element is already registered.
    fn element_registered(&self, element: &str) -> bool;
    /// Starts loading the element script; the host answers with
    /// `on_script_loaded` or `on_script_failed`.
    fn load_script(&mut self, url: &str);
    fn present(&mut self, model_url: &str) -> Result<(), String>;
    fn show_qr(&mut self, bridge: &QrBridge);
    fn hide_qr(&mut self);
    fn lock_scroll(&mut self);
    fn unlock_scroll(&mut self);
    fn subscribe(&mut self, signal: ArSignal) -> ListenerId;
    fn unsubscribe(&mut self, id: ListenerId);
}

/// In-memory AR platform that records calls, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingArPlatform {
    pub registered: bool,
    /// Whether a script load registers the element.
    pub script_registers: bool,
    pub present_error: Option<String>,
    pub scripts_requested: Vec<String>,
    pub presented: Vec<String>,
    pub qr_shown: Vec<String>,
    pub qr_visible: bool,
    pub scroll_locks: i32,
    pub listeners: Vec<(ListenerId, ArSignal)>,
    next_listener: u64,
}

impl RecordingArPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the script's side effect before its load signal fires.
    pub fn finish_script(&mut self) {
        if self.script_registers {
            self.registered = true;
        }
    }

    /// Every acquired resource has been released.
    pub fn is_clean(&self) -> bool {
        self.listeners.is_empty() && self.scroll_locks == 0 && !self.qr_visible
    }
}

impl ArPlatform for RecordingArPlatform {
    fn element_registered(&self, _element: &str) -> bool {
        self.registered
    }

    fn load_script(&mut self, url: &str) {
        self.scripts_requested.push(url.to_string());
    }

    fn present(&mut self, model_url: &str) -> Result<(), String> {
        if let Some(err) = &self.present_error {
            return Err(err.clone());
        }
        self.presented.push(model_url.to_string());
        Ok(())
    }

    fn show_qr(&mut self, bridge: &QrBridge) {
        self.qr_shown.push(bridge.deep_link.clone());
        self.qr_visible = true;
    }

    fn hide_qr(&mut self) {
        self.qr_visible = false;
    }

    fn lock_scroll(&mut self) {
        self.scroll_locks += 1;
    }

    fn unlock_scroll(&mut self) {
        self.scroll_locks -= 1;
    }

    fn subscribe(&mut self, signal: ArSignal) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, signal));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(l, _)| *l != id);
    }
}
