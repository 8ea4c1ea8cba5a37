//! HTTP capability boundary.
//!
//! Every fetch the engine makes goes through [`HttpClient`]. Responses are
//! values, never errors: a transport failure comes back as status 0 with
//! `error` set, and callers decide via [`HttpResponse::into_result`].

#[cfg(test)]
pub(crate) mod mock;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header, redirect};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    pub follow_redirects: bool,
    /// Sent as `application/x-www-form-urlencoded` on POST.
    pub form: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            follow_redirects: true,
            form: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn referer(self, referer: impl Into<String>) -> Self {
        self.header("Referer", referer)
    }

    pub fn form_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.form.push((name.to_string(), value.into()));
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub ok: bool,
    /// 0 when the request never produced a response.
    pub status: u16,
    pub status_text: String,
    pub body: String,
    /// Effective URL after redirects.
    pub url: String,
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn transport_failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: 0,
            status_text: String::new(),
            body: String::new(),
            url: url.to_string(),
            error: Some(error.into()),
        }
    }

    /// Map the status 0 sentinel and non-2xx statuses to errors.
    pub fn into_result(self) -> Result<Self> {
        if self.status == 0 {
            let reason = self.error.unwrap_or_else(|| "no response".to_string());
            return Err(Error::Connectivity(format!("{}: {}", self.url, reason)));
        }
        if !(200..300).contains(&self.status) {
            return Err(Error::HttpStatus {
                status: self.status,
                url: self.url,
            });
        }
        Ok(self)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, options: &RequestOptions) -> HttpResponse;

    async fn post(&self, url: &str, body: &str, options: &RequestOptions) -> HttpResponse;
}

/// Fetch `url` and fail on anything but a 2xx.
pub async fn fetch_ok(http: &dyn HttpClient, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
    debug!(url, "GET");
    http.get(url, options).await.into_result()
}

/// reqwest-backed capability. The configured timeout is the only one applied.
pub struct ReqwestHttp {
    following: Client,
    direct: Client,
}

impl ReqwestHttp {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Self::with_builder(|| {
            Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .cookie_store(true)
        })
    }

    /// Build the following and non-following clients from one base builder.
    fn with_builder(base: impl Fn() -> ClientBuilder) -> Result<Self> {
        let build = |policy: redirect::Policy| {
            base()
                .redirect(policy)
                .build()
                .map_err(|e| Error::Connectivity(e.to_string()))
        };

        Ok(Self {
            following: build(redirect::Policy::limited(10))?,
            direct: build(redirect::Policy::none())?,
        })
    }

    fn client(&self, options: &RequestOptions) -> &Client {
        if options.follow_redirects {
            &self.following
        } else {
            &self.direct
        }
    }

    fn apply_headers(builder: reqwest::RequestBuilder, options: &RequestOptions) -> reqwest::RequestBuilder {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &options.headers {
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        builder.headers(headers)
    }

    async fn send(url: &str, builder: reqwest::RequestBuilder) -> HttpResponse {
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return HttpResponse::transport_failure(url, e.to_string()),
        };

        let status = response.status();
        let effective = response.url().to_string();

        match response.text().await {
            Ok(body) => HttpResponse {
                ok: status.is_success(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
                url: effective,
                error: None,
            },
            Err(e) => HttpResponse::transport_failure(&effective, e.to_string()),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttp {
    async fn get(&self, url: &str, options: &RequestOptions) -> HttpResponse {
        let builder = Self::apply_headers(self.client(options).get(url), options);
        Self::send(url, builder).await
    }

    async fn post(&self, url: &str, body: &str, options: &RequestOptions) -> HttpResponse {
        let mut builder = Self::apply_headers(self.client(options).post(url), options);
        builder = if options.form.is_empty() {
            builder.body(body.to_string())
        } else {
            builder.form(&options.form)
        };
        Self::send(url, builder).await
    }
}
