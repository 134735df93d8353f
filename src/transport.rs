//! HTTP transport abstraction and the reqwest-backed implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::TransportConfig;
use crate::proxy::Proxy;
use crate::Result;

/// A GET request for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    url: Url,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a GET request for the given URL.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Parses `url` and creates a GET request for it.
    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::get(Url::parse(url)?))
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order; names are kept as received.
    pub headers: Vec<(String, String)>,
    /// Body decoded with the charset the server announced.
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first value of header `name` (case-insensitive).
    pub fn header<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.header_values(name).next()
    }

    /// Returns every value of header `name` (case-insensitive).
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Splits a `Cookie`/`Set-Cookie` header into name/value pairs.
///
/// Attributes without a value (`HttpOnly`, `Secure`) map to `"true"`.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (part.to_string(), "true".to_string()),
        })
        .collect()
}

/// Executes single HTTP attempts, optionally through a proxy.
#[async_trait]
pub trait HttpTransport: Send {
    /// Performs one attempt. No retries happen at this level.
    async fn execute_once(
        &mut self,
        request: &HttpRequest,
        proxy: Option<&Proxy>,
    ) -> Result<HttpResponse>;

    /// Drops pooled connections. Called when a session ends.
    fn release(&mut self) {}
}

/// Executes the requests of a paging session.
#[async_trait]
pub trait RequestExecutor: Send {
    /// Executes `request`, applying whatever retry policy the executor has.
    async fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Drops pooled connections. Called when a session ends.
    fn release(&mut self) {}
}

/// Sends every request directly, without proxies or retries.
pub struct Direct<T> {
    inner: T,
}

impl<T: HttpTransport> Direct<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> RequestExecutor for Direct<T> {
    async fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        self.inner.execute_once(request, None).await
    }

    fn release(&mut self) {
        self.inner.release();
    }
}

/// An [`HttpTransport`] backed by reqwest.
///
/// reqwest binds proxies per client, so a client is built for the proxy in
/// use and kept until the proxy changes or the session releases it.
pub struct ReqwestTransport {
    config: TransportConfig,
    client: Option<(Option<Proxy>, Client)>,
}

impl ReqwestTransport {
    /// Creates a transport; fails on zero timeouts.
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: None,
        })
    }

    /// Returns whether a client (and its connection pool) is currently held.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    fn build_client(&self, proxy: Option<&Proxy>) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(&self.config.user_agent)
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.response_timeout());

        builder = match proxy {
            Some(proxy) => {
                debug!("Building client for proxy {}", proxy);
                builder.proxy(proxy.to_reqwest()?)
            }
            None => builder.no_proxy(),
        };

        Ok(builder.build()?)
    }

    fn client_for(&mut self, proxy: Option<&Proxy>) -> Result<Client> {
        if let Some((bound, client)) = &self.client {
            if bound.as_ref() == proxy {
                return Ok(client.clone());
            }
        }
        let client = self.build_client(proxy)?;
        self.client = Some((proxy.cloned(), client.clone()));
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute_once(
        &mut self,
        request: &HttpRequest,
        proxy: Option<&Proxy>,
    ) -> Result<HttpResponse> {
        let client = self.client_for(proxy)?;

        let mut builder = client.get(request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn release(&mut self) {
        if self.client.take().is_some() {
            debug!("Released HTTP client");
        }
    }
}
