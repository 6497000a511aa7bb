use std::collections::HashMap;

use handoff::{ArPlatform, ArSignal, ListenerId, QrBridge};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Document, Element, Event, EventTarget, HtmlElement, KeyboardEvent};

use crate::{defer, log};

const QR_PANEL_ID: &str = "ar-qr-panel";
const DISMISS_ATTR: &str = "data-ar-dismiss";

struct Registration {
    target: EventTarget,
    event_name: &'static str,
    listener: Closure<dyn FnMut(Event)>,
}

/// `<model-viewer>`-based AR surface with an inline QR panel fallback.
pub struct WebArPlatform {
    epoch: u64,
    element_name: String,
    presented: Option<Element>,
    qr_panel: Option<Element>,
    saved_overflow: Option<String>,
    script_hooks: Vec<Closure<dyn FnMut(Event)>>,
    listeners: HashMap<ListenerId, Vec<Registration>>,
    next_listener: u64,
}

impl WebArPlatform {
    pub fn new(epoch: u64, element_name: &str) -> Self {
        Self {
            epoch,
            element_name: element_name.to_string(),
            presented: None,
            qr_panel: None,
            saved_overflow: None,
            script_hooks: Vec::new(),
            listeners: HashMap::new(),
            next_listener: 1,
        }
    }

    fn listen(
        &self,
        target: EventTarget,
        event_name: &'static str,
        signal: ArSignal,
        accept: fn(&Event) -> bool,
    ) -> Option<Registration> {
        let epoch = self.epoch;
        let listener = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            if accept(&ev) {
                defer(epoch, move |host, now| host.session.on_ar_signal(signal, now));
            }
        });
        // Capture phase, so events that do not bubble (`ar-status`) are seen too.
        target
            .add_event_listener_with_callback_and_bool(
                event_name,
                listener.as_ref().unchecked_ref(),
                true,
            )
            .map_err(|e| log(&format!("failed to listen for {event_name}: {e:?}")))
            .ok()?;
        Some(Registration {
            target,
            event_name,
            listener,
        })
    }
}

impl ArPlatform for WebArPlatform {
    fn element_registered(&self, element: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.custom_elements().get(element).dyn_into::<js_sys::Function>().ok())
            .is_some()
    }

    fn load_script(&mut self, url: &str) {
        let epoch = self.epoch;
        let Some(doc) = document() else {
            defer(epoch, |host, now| host.session.on_ar_script_failed("no document", now));
            return;
        };
        let script = match doc.create_element("script") {
            Ok(s) => s,
            Err(e) => {
                let detail = format!("{e:?}");
                defer(epoch, move |host, now| host.session.on_ar_script_failed(&detail, now));
                return;
            }
        };
        let _ = script.set_attribute("type", "module");
        let _ = script.set_attribute("src", url);

        let loaded = Closure::<dyn FnMut(Event)>::new(move |_ev: Event| {
            defer(epoch, |host, now| host.session.on_ar_script_loaded(now));
        });
        let failed = Closure::<dyn FnMut(Event)>::new(move |_ev: Event| {
            defer(epoch, |host, now| {
                host.session.on_ar_script_failed("script failed to load", now)
            });
        });
        let _ = script.add_event_listener_with_callback("load", loaded.as_ref().unchecked_ref());
        let _ = script.add_event_listener_with_callback("error", failed.as_ref().unchecked_ref());
        self.script_hooks.push(loaded);
        self.script_hooks.push(failed);

        let parent = doc.head().map(Element::from).or_else(|| doc.document_element());
        match parent {
            Some(p) => {
                if let Err(e) = p.append_child(&script) {
                    log(&format!("script insert failed: {e:?}"));
                }
            }
            None => log("no element to attach the AR script to"),
        }
    }

    fn present(&mut self, model_url: &str) -> Result<(), String> {
        let doc = document().ok_or("no document")?;
        let body = doc.body().ok_or("no body")?;
        let el = doc
            .create_element(&self.element_name)
            .map_err(|e| format!("{e:?}"))?;
        for (name, value) in [
            ("src", model_url),
            ("ar", ""),
            ("ar-modes", "webxr scene-viewer quick-look"),
            ("style", "position:fixed;inset:0;width:100%;height:100%;z-index:1000;background:#fff"),
        ] {
            el.set_attribute(name, value).map_err(|e| format!("{e:?}"))?;
        }
        body.append_child(&el).map_err(|e| format!("{e:?}"))?;

        let activate = js_sys::Reflect::get(&el, &JsValue::from_str("activateAR"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok());
        let result = match activate {
            Some(f) => f.call0(&el).map(|_| ()).map_err(|e| format!("{e:?}")),
            None => Err(format!("<{}> cannot activate AR", self.element_name)),
        };
        match result {
            Ok(()) => {
                self.presented = Some(el);
                Ok(())
            }
            Err(e) => {
                el.remove();
                Err(e)
            }
        }
    }

    fn show_qr(&mut self, bridge: &QrBridge) {
        self.hide_qr();
        let Some(doc) = document() else {
            return;
        };
        let Some(body) = doc.body() else {
            return;
        };
        let Ok(panel) = doc.create_element("div") else {
            return;
        };
        let _ = panel.set_attribute("id", QR_PANEL_ID);
        let _ = panel.set_attribute("role", "dialog");
        let link = escape_html(bridge.copy_link());
        panel.set_inner_html(&format!(
            "{svg}<p>Scan with your phone to view this product in your room.</p>\
             <input readonly value=\"{link}\">\
             <button type=\"button\" {DISMISS_ATTR}>Close</button>",
            svg = bridge.svg,
        ));
        if body.append_child(&panel).is_ok() {
            self.qr_panel = Some(panel);
        }
    }

    fn hide_qr(&mut self) {
        if let Some(panel) = self.qr_panel.take() {
            panel.remove();
        }
    }

    fn lock_scroll(&mut self) {
        let Some(body) = document().and_then(|d| d.body()) else {
            return;
        };
        let style = HtmlElement::style(&body);
        if self.saved_overflow.is_none() {
            self.saved_overflow = style.get_property_value("overflow").ok();
        }
        let _ = style.set_property("overflow", "hidden");
    }

    fn unlock_scroll(&mut self) {
        // The in-page AR element lives exactly as long as the scroll lock.
        if let Some(el) = self.presented.take() {
            el.remove();
        }
        let Some(body) = document().and_then(|d| d.body()) else {
            return;
        };
        let previous = self.saved_overflow.take().unwrap_or_default();
        let _ = HtmlElement::style(&body).set_property("overflow", &previous);
    }

    fn subscribe(&mut self, signal: ArSignal) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;

        let mut regs = Vec::new();
        if let Some(win) = web_sys::window() {
            let doc: Option<EventTarget> = win.document().map(Into::into);
            let win: EventTarget = win.into();
            match signal {
                ArSignal::SessionEnded => {
                    regs.extend(doc.and_then(|d| self.listen(d, "ar-status", signal, session_ended)));
                }
                ArSignal::PanelDismissed => {
                    regs.extend(doc.clone().and_then(|d| self.listen(d, "keydown", signal, is_escape)));
                    regs.extend(doc.and_then(|d| self.listen(d, "click", signal, is_dismiss_click)));
                }
                ArSignal::Navigation => {
                    regs.extend(self.listen(win.clone(), "popstate", signal, always));
                    regs.extend(self.listen(win, "pagehide", signal, always));
                }
            }
        }
        self.listeners.insert(id, regs);
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        for reg in self.listeners.remove(&id).unwrap_or_default() {
            let _ = reg.target.remove_event_listener_with_callback_and_bool(
                reg.event_name,
                reg.listener.as_ref().unchecked_ref(),
                true,
            );
        }
    }
}

fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

fn always(_: &Event) -> bool {
    true
}

fn is_escape(ev: &Event) -> bool {
    ev.dyn_ref::<KeyboardEvent>()
        .is_some_and(|k| k.key() == "Escape")
}

fn is_dismiss_click(ev: &Event) -> bool {
    ev.target()
        .and_then(|t| t.dyn_into::<Element>().ok())
        .and_then(|el| el.closest(&format!("[{DISMISS_ATTR}]")).ok().flatten())
        .is_some()
}

fn session_ended(ev: &Event) -> bool {
    let Some(custom) = ev.dyn_ref::<CustomEvent>() else {
        return false;
    };
    let status = js_sys::Reflect::get(&custom.detail(), &JsValue::from_str("status"))
        .ok()
        .and_then(|v| v.as_string());
    matches!(status.as_deref(), Some("not-presenting" | "failed"))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
