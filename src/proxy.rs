//! Proxy values, proxy sources and the FIFO proxy pool.
//!
//! Proxies are disposable tokens: the pool hands each one out once and never
//! takes it back. When the pool runs dry it asks its [`ProxySource`] for a
//! fresh batch, lazily, on the first request that needs one.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Proxy as ReqwestProxy;
use tracing::{debug, info, warn};

use crate::{Result, SearchError};

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProxyScheme {
    /// HTTP proxy
    #[default]
    Http,
    /// HTTPS proxy
    Https,
    /// SOCKS proxy
    Socks,
}

impl ProxyScheme {
    fn as_str(&self) -> &'static str {
        match self {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks => "socks",
        }
    }
}

/// A single egress proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proxy {
    host: String,
    port: Option<u16>,
    scheme: ProxyScheme,
}

impl Proxy {
    /// Creates an HTTP proxy.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            scheme: ProxyScheme::Http,
        }
    }

    /// Creates an HTTP proxy on the scheme's default port.
    pub fn without_port(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            scheme: ProxyScheme::Http,
        }
    }

    /// Sets the proxy scheme.
    pub fn with_scheme(mut self, scheme: ProxyScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn scheme(&self) -> ProxyScheme {
        self.scheme
    }

    /// Parses one `host:port` entry.
    pub fn parse(entry: &str) -> Result<Self> {
        parse_entry(entry).map_err(SearchError::Configuration)
    }

    /// Converts to a reqwest proxy routing all traffic.
    pub fn to_reqwest(&self) -> Result<ReqwestProxy> {
        let scheme = match self.scheme {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks => "socks5",
        };
        let url = match self.port {
            Some(port) => format!("{}://{}:{}", scheme, self.host, port),
            None => format!("{}://{}", scheme, self.host),
        };
        Ok(ReqwestProxy::all(url)?)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

fn parse_entry(entry: &str) -> std::result::Result<Proxy, String> {
    let entry = entry.trim();
    let (host, port) = entry
        .rsplit_once(':')
        .ok_or_else(|| format!("Proxy entry '{}' has no port", entry))?;
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(format!("Proxy entry '{}' has an invalid host", entry));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("Proxy entry '{}' has an invalid port", entry))?;
    Ok(Proxy::new(host, port))
}

/// Parses a proxy list, one `host:port` per line.
///
/// Blank lines are skipped. A single malformed line rejects the whole list.
pub fn parse_proxy_list(content: &str) -> Result<Vec<Proxy>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_entry(line)
                .map_err(|e| SearchError::Configuration(format!("line {}: {}", index + 1, e)))
        })
        .collect()
}

/// Reads and parses a proxy list file.
pub async fn load_proxy_file(path: impl AsRef<Path>) -> Result<Vec<Proxy>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_proxy_list(&content)
}

/// Supplies batches of fresh proxies to a [`ProxyPool`].
#[async_trait]
pub trait ProxySource: Send {
    /// Fetches the next batch. An empty batch means the source is spent.
    async fn fetch_proxies(&mut self) -> Result<Vec<Proxy>>;
}

/// A local proxy list file.
///
/// The file is read on the first fetch only; afterwards the source is spent,
/// so proxies that already failed are never handed out again.
pub struct FileProxySource {
    path: PathBuf,
    consumed: bool,
}

impl FileProxySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: false,
        }
    }
}

#[async_trait]
impl ProxySource for FileProxySource {
    async fn fetch_proxies(&mut self) -> Result<Vec<Proxy>> {
        if self.consumed {
            return Ok(Vec::new());
        }
        self.consumed = true;
        let proxies = load_proxy_file(&self.path).await?;
        info!("Loaded {} proxies from {}", proxies.len(), self.path.display());
        Ok(proxies)
    }
}

/// A FIFO queue of unused proxies.
pub struct ProxyPool {
    queue: VecDeque<Proxy>,
    source: Option<Box<dyn ProxySource>>,
}

impl ProxyPool {
    /// Creates an empty pool with no source.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            source: None,
        }
    }

    /// Creates a pool seeded with `proxies` and no source.
    pub fn with_proxies(proxies: Vec<Proxy>) -> Self {
        Self {
            queue: proxies.into(),
            source: None,
        }
    }

    /// Creates an empty pool that replenishes from `source`.
    pub fn with_source<S: ProxySource + 'static>(source: S) -> Self {
        Self {
            queue: VecDeque::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Number of unused proxies currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends a proxy at the back of the queue.
    pub fn push(&mut self, proxy: Proxy) {
        self.queue.push_back(proxy);
    }

    /// Refills the queue from the source.
    ///
    /// A broken local input (malformed entry, unreadable file) is returned to
    /// the caller. Any other source failure is logged and treated as having
    /// yielded nothing.
    pub async fn replenish(&mut self) -> Result<usize> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        match source.fetch_proxies().await {
            Ok(proxies) => {
                let count = proxies.len();
                debug!("Replenished proxy pool with {} proxies", count);
                self.queue.extend(proxies);
                Ok(count)
            }
            Err(e @ (SearchError::Configuration(_) | SearchError::Io(_))) => Err(e),
            Err(e) => {
                warn!("Proxy source failed: {}", e);
                Ok(0)
            }
        }
    }

    /// Takes the oldest unused proxy, replenishing first if the queue is empty.
    ///
    /// `Ok(None)` means the pool is exhausted.
    pub async fn next_proxy(&mut self) -> Result<Option<Proxy>> {
        if self.queue.is_empty() {
            info!("Proxy pool empty, fetching new proxies");
            self.replenish().await?;
        }
        Ok(self.queue.pop_front())
    }
}

impl Default for ProxyPool {
    fn default() -> Self {
        Self::new()
    }
}
