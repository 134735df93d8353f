//! Caller-facing search entry points.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{ManagerConfig, ProxyMode};
use crate::engine::Accumulator;
use crate::engines::{ETools, Google, ListingProxySource};
use crate::proxy::{FileProxySource, ProxyPool};
use crate::session::PagingSession;
use crate::switcher::{LoggingObserver, ProxyTransport};
use crate::transport::{
    Direct, HttpRequest, HttpResponse, HttpTransport, RequestExecutor, ReqwestTransport,
};
use crate::{Result, SearchResponse};

/// How one engine's requests leave the process.
enum Route<T> {
    Direct(Direct<T>),
    Proxied(ProxyTransport<T>),
}

#[async_trait]
impl<T: HttpTransport> RequestExecutor for Route<T> {
    async fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        match self {
            Route::Direct(direct) => direct.execute(request).await,
            Route::Proxied(proxied) => proxied.execute(request).await,
        }
    }

    fn release(&mut self) {
        match self {
            Route::Direct(direct) => direct.release(),
            Route::Proxied(proxied) => proxied.release(),
        }
    }
}

impl<T: HttpTransport> Route<T> {
    async fn run<A: Accumulator>(&mut self, accumulator: &mut A) -> Result<A::Output> {
        PagingSession::new(self).run(accumulator).await
    }
}

/// Runs searches, each engine through its own transport and proxy pool.
///
/// Engines never share proxies: a proxy that one engine has burned may still
/// be good for the other.
pub struct ProxyManager<T: HttpTransport = ReqwestTransport> {
    google: Route<T>,
    etools: Route<T>,
}

impl ProxyManager<ReqwestTransport> {
    /// Builds a manager from configuration, using reqwest for every request.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        config.transport.validate()?;
        let transport = config.transport;
        Self::with_transports(&config.proxy, || ReqwestTransport::new(transport.clone()))
    }
}

impl<T: HttpTransport + 'static> ProxyManager<T> {
    /// Builds a manager for `mode`, creating transports with `make`.
    ///
    /// In scrape mode the listing itself is fetched directly through a
    /// transport of its own.
    pub fn with_transports<F>(mode: &ProxyMode, mut make: F) -> Result<Self>
    where
        F: FnMut() -> Result<T>,
    {
        let mut route = || -> Result<Route<T>> {
            let route = match mode {
                ProxyMode::Direct => Route::Direct(Direct::new(make()?)),
                ProxyMode::File { path } => {
                    let pool = ProxyPool::with_source(FileProxySource::new(path.clone()));
                    Route::Proxied(
                        ProxyTransport::new(make()?, pool).with_observer(LoggingObserver),
                    )
                }
                ProxyMode::Scrape { base_url } => {
                    let source = ListingProxySource::new(make()?, base_url.clone());
                    Route::Proxied(
                        ProxyTransport::new(make()?, ProxyPool::with_source(source))
                            .with_observer(LoggingObserver),
                    )
                }
            };
            Ok(route)
        };

        let manager = Self {
            google: route()?,
            etools: route()?,
        };
        debug!("Proxy manager ready ({:?})", mode);
        Ok(manager)
    }

    /// Sends every request directly.
    pub fn direct(google: T, etools: T) -> Self {
        Self {
            google: Route::Direct(Direct::new(google)),
            etools: Route::Direct(Direct::new(etools)),
        }
    }

    /// Sends requests through the given proxy transports.
    pub fn proxied(google: ProxyTransport<T>, etools: ProxyTransport<T>) -> Self {
        Self {
            google: Route::Proxied(google),
            etools: Route::Proxied(etools),
        }
    }

    /// Searches Google for up to `count` results.
    pub async fn search_google(&mut self, text: &str, count: usize) -> Result<SearchResponse> {
        let mut engine = Google::new(text, count)?;
        info!("Searching Google for '{}' ({} results)", text, count);
        let response = self.google.run(&mut engine).await?;
        info!("Google returned {} results for '{}'", response.len(), text);
        Ok(response)
    }

    /// Searches eTools for up to `count` results.
    pub async fn search_etools(&mut self, text: &str, count: usize) -> Result<SearchResponse> {
        let mut engine = ETools::new(text, count)?;
        info!("Searching ETools for '{}' ({} results)", text, count);
        let response = self.etools.run(&mut engine).await?;
        info!("ETools returned {} results for '{}'", response.len(), text);
        Ok(response)
    }
}
