use std::collections::HashMap;

use reqwest::{Client, StatusCode};
use streaming::{FetchError, Fetcher, Request};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tracing::debug;

/// A finished network operation, tagged with the attempt that started it.
#[derive(Debug)]
pub enum Completion {
    Verify(Request, Result<(), FetchError>),
    Download(Request, Result<Vec<u8>, FetchError>),
}

/// `Fetcher` over `reqwest`. Each call spawns a task that reports back
/// through the completion channel; `abort` cancels the request's tasks.
pub struct HttpFetcher {
    client: Client,
    completions: UnboundedSender<Completion>,
    tasks: HashMap<Request, Vec<AbortHandle>>,
}

impl HttpFetcher {
    pub fn new(client: Client, completions: UnboundedSender<Completion>) -> Self {
        Self {
            client,
            completions,
            tasks: HashMap::new(),
        }
    }

    fn track(&mut self, request: Request, handle: AbortHandle) {
        self.tasks.entry(request).or_default().push(handle);
    }
}

impl Fetcher for HttpFetcher {
    fn verify(&mut self, request: Request, url: &str) {
        let client = self.client.clone();
        let tx = self.completions.clone();
        let url = url.to_string();
        let task = tokio::spawn(async move {
            let result = match client.head(&url).send().await {
                Ok(resp) => check_status(resp.status()),
                Err(err) => Err(classify(&err)),
            };
            let _ = tx.send(Completion::Verify(request, result));
        });
        self.track(request, task.abort_handle());
    }

    fn download(&mut self, request: Request, url: &str) {
        let client = self.client.clone();
        let tx = self.completions.clone();
        let url = url.to_string();
        let task = tokio::spawn(async move {
            let result = match client.get(&url).send().await {
                Ok(resp) => match check_status(resp.status()) {
                    Ok(()) => resp
                        .bytes()
                        .await
                        .map(|b| b.to_vec())
                        .map_err(|e| classify(&e)),
                    Err(e) => Err(e),
                },
                Err(err) => Err(classify(&err)),
            };
            let _ = tx.send(Completion::Download(request, result));
        });
        self.track(request, task.abort_handle());
    }

    fn abort(&mut self, request: Request) {
        if let Some(handles) = self.tasks.remove(&request) {
            debug!(%request, tasks = handles.len(), "aborting transfers");
            for h in handles {
                h.abort();
            }
        }
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::HttpStatus(status.as_u16()))
    }
}

fn classify(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::check_status;
    use reqwest::StatusCode;
    use streaming::FetchError;

    #[test]
    fn non_success_statuses_become_http_errors() {
        assert_eq!(check_status(StatusCode::OK), Ok(()));
        assert_eq!(check_status(StatusCode::PARTIAL_CONTENT), Ok(()));
        assert_eq!(
            check_status(StatusCode::NOT_FOUND),
            Err(FetchError::HttpStatus(404))
        );
        assert!(check_status(StatusCode::GONE).unwrap_err().is_not_found());
        assert_eq!(
            check_status(StatusCode::BAD_GATEWAY),
            Err(FetchError::HttpStatus(502))
        );
    }
}
