//! Proxy failover transport.
//!
//! [`ProxyTransport`] never gives up on a request, only on a proxy: every
//! failed attempt discards the proxy in use and retries through the next one
//! until the pool is exhausted.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::proxy::{Proxy, ProxyPool};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, RequestExecutor};
use crate::{Result, SearchError};

/// Receives the outcome of every proxied attempt.
///
/// `uses` counts the earlier successful requests made through the same proxy
/// since it was selected; it is 0 on the first attempt.
pub trait ProxyObserver: Send + Sync {
    fn on_success(&self, _proxy: &Proxy, _uses: u32) {}

    fn on_failure(&self, _proxy: &Proxy, _uses: u32, _error: &SearchError) {}
}

/// Ignores every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProxyObserver for NoopObserver {}

/// Logs every outcome through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProxyObserver for LoggingObserver {
    fn on_success(&self, proxy: &Proxy, uses: u32) {
        info!(%proxy, uses, "Proxy request succeeded");
    }

    fn on_failure(&self, proxy: &Proxy, uses: u32, error: &SearchError) {
        warn!(%proxy, uses, "Proxy request failed: {}", error);
    }
}

/// Statuses that condemn the proxy rather than the request.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 407 | 429 | 500..=599)
}

/// Executes requests through proxies taken from a [`ProxyPool`].
pub struct ProxyTransport<T> {
    inner: T,
    pool: ProxyPool,
    current: Option<Proxy>,
    uses: u32,
    observer: Box<dyn ProxyObserver>,
}

impl<T: HttpTransport> ProxyTransport<T> {
    /// Creates a transport that reports proxy outcomes to no one.
    pub fn new(inner: T, pool: ProxyPool) -> Self {
        Self {
            inner,
            pool,
            current: None,
            uses: 0,
            observer: Box::new(NoopObserver),
        }
    }

    /// Replaces the outcome observer.
    pub fn with_observer<O: ProxyObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// The proxy that will be tried first on the next request.
    pub fn current_proxy(&self) -> Option<&Proxy> {
        self.current.as_ref()
    }

    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn attempt(&mut self, request: &HttpRequest, proxy: &Proxy) -> Result<HttpResponse> {
        let response = self.inner.execute_once(request, Some(proxy)).await?;
        if is_retryable_status(response.status) {
            return Err(SearchError::Transport(format!(
                "status {} from {}",
                response.status,
                request.url()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl<T: HttpTransport> RequestExecutor for ProxyTransport<T> {
    async fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        loop {
            let proxy = match &self.current {
                Some(proxy) => {
                    self.uses += 1;
                    proxy.clone()
                }
                None => {
                    let proxy = self
                        .pool
                        .next_proxy()
                        .await?
                        .ok_or(SearchError::ProxiesExhausted)?;
                    info!(%proxy, "Using proxy");
                    self.uses = 0;
                    self.current = Some(proxy.clone());
                    proxy
                }
            };

            match self.attempt(request, &proxy).await {
                Ok(response) => {
                    self.observer.on_success(&proxy, self.uses);
                    return Ok(response);
                }
                Err(e) if e.is_transport_failure() => {
                    self.observer.on_failure(&proxy, self.uses, &e);
                    self.current = None;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn release(&mut self) {
        self.inner.release();
    }
}
