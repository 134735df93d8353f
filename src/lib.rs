//! # relay-search
//!
//! Paginated web search through rotating proxies.
//!
//! A search is a [`PagingSession`] that drives an [`Accumulator`] page by
//! page until the accumulator marks its [`Context`] complete. Requests go out
//! through a [`RequestExecutor`]; the [`ProxyTransport`] executor retries each
//! request through fresh proxies from a [`ProxyPool`] until one succeeds or
//! the pool is exhausted.
//!
//! Two engines are included:
//!
//! - [`engines::Google`], paged by result offset
//! - [`engines::ETools`], paged through a server-side session
//!
//! Proxies come from a local list file or from a scraped public listing whose
//! decoy markup is stripped by the [`HoneypotFilter`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use relay_search::{ManagerConfig, ProxyManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut manager = ProxyManager::new(ManagerConfig::default())?;
//!     let response = manager.search_google("rust programming", 20).await?;
//!
//!     for result in response.items() {
//!         println!("{:?}: {:?}", result.title, result.link);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod engine;
mod error;
mod honeypot;
mod manager;
mod query;
mod result;
mod session;
mod switcher;

pub mod engines;
pub mod output;
pub mod proxy;
pub mod transport;

pub use config::{ManagerConfig, ProxyMode, TransportConfig, DEFAULT_LISTING_URL};
pub use context::{Context, ContextValue};
pub use engine::Accumulator;
pub use error::{Result, SearchError};
pub use honeypot::HoneypotFilter;
pub use manager::ProxyManager;
pub use proxy::{Proxy, ProxyPool, ProxyScheme, ProxySource};
pub use query::SearchQuery;
pub use result::{EngineStats, SearchResponse, SearchResult};
pub use session::PagingSession;
pub use switcher::{LoggingObserver, NoopObserver, ProxyObserver, ProxyTransport};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, RequestExecutor};
