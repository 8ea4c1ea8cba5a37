use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{HttpClient, HttpResponse, RequestOptions};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub form: Vec<(String, String)>,
}

/// Route table keyed by exact URL; unknown URLs answer 404.
#[derive(Default)]
pub struct MockHttp {
    routes: Mutex<HashMap<String, HttpResponse>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.respond(url, 200, body, url)
    }

    /// `url` answers after a redirect to `effective`.
    pub fn redirected(self, url: &str, effective: &str, body: &str) -> Self {
        self.respond(url, 200, body, effective)
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.respond(url, status, "", url)
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.insert(url, HttpResponse::transport_failure(url, "connection refused"))
    }

    pub fn respond(self, url: &str, status: u16, body: &str, effective: &str) -> Self {
        self.insert(
            url,
            HttpResponse {
                ok: (200..300).contains(&status),
                status,
                status_text: String::new(),
                body: body.to_string(),
                url: effective.to_string(),
                error: None,
            },
        )
    }

    fn insert(self, url: &str, response: HttpResponse) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), response);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn answer(&self, method: &'static str, url: &str, options: &RequestOptions) -> HttpResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                headers: options.headers.clone(),
                form: options.form.clone(),
            });
        }

        self.routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(url).cloned())
            .unwrap_or_else(|| HttpResponse {
                status: 404,
                url: url.to_string(),
                ..Default::default()
            })
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str, options: &RequestOptions) -> HttpResponse {
        self.answer("GET", url, options)
    }

    async fn post(&self, url: &str, _body: &str, options: &RequestOptions) -> HttpResponse {
        self.answer("POST", url, options)
    }
}
