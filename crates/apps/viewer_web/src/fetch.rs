use std::collections::HashMap;

use gloo_net::http::{Method, RequestBuilder, Response};
use streaming::{FetchError, Fetcher, Request};
use wasm_bindgen_futures::spawn_local;
use web_sys::{AbortController, AbortSignal};

use crate::{defer, log};

/// Browser `fetch` behind the loader's `Fetcher` capability. Every transfer
/// gets its own `AbortController`, released by ticket.
pub struct WebFetcher {
    epoch: u64,
    in_flight: HashMap<Request, Vec<AbortController>>,
}

impl WebFetcher {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            in_flight: HashMap::new(),
        }
    }

    fn controller(&mut self, request: Request) -> Option<AbortSignal> {
        // Older tickets have either settled or been aborted by the loader.
        self.in_flight.retain(|r, _| *r >= request);
        match AbortController::new() {
            Ok(c) => {
                let signal = c.signal();
                self.in_flight.entry(request).or_default().push(c);
                Some(signal)
            }
            Err(e) => {
                log(&format!("AbortController unavailable: {e:?}"));
                None
            }
        }
    }
}

impl Fetcher for WebFetcher {
    fn verify(&mut self, request: Request, url: &str) {
        let signal = self.controller(request);
        let epoch = self.epoch;
        let url = url.to_string();
        spawn_local(async move {
            let result = send(&url, Method::HEAD, signal.as_ref())
                .await
                .and_then(|resp| check_status(&resp));
            defer(epoch, move |host, now| {
                host.session.on_verify_result(request, result, now)
            });
        });
    }

    fn download(&mut self, request: Request, url: &str) {
        let signal = self.controller(request);
        let epoch = self.epoch;
        let url = url.to_string();
        spawn_local(async move {
            let result = match send(&url, Method::GET, signal.as_ref()).await {
                Ok(resp) => match check_status(&resp) {
                    Ok(()) => resp.binary().await.map_err(|e| classify(e, &url)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            defer(epoch, move |host, now| {
                host.session.on_download_result(request, result, now)
            });
        });
    }

    fn abort(&mut self, request: Request) {
        if let Some(controllers) = self.in_flight.remove(&request) {
            for c in controllers {
                c.abort();
            }
        }
    }
}

async fn send(url: &str, method: Method, signal: Option<&AbortSignal>) -> Result<Response, FetchError> {
    RequestBuilder::new(url)
        .method(method)
        .abort_signal(signal)
        .send()
        .await
        .map_err(|e| classify(e, url))
}

fn check_status(resp: &Response) -> Result<(), FetchError> {
    if resp.ok() {
        Ok(())
    } else {
        Err(FetchError::HttpStatus(resp.status()))
    }
}

fn classify(err: gloo_net::Error, url: &str) -> FetchError {
    match err {
        gloo_net::Error::JsError(js) => {
            let page_url = web_sys::window()
                .and_then(|w| w.location().href().ok())
                .unwrap_or_default();
            FetchError::from_transport(&js.name, &js.message, url, &page_url)
        }
        other => FetchError::Network(other.to_string()),
    }
}
