//! Accumulator implementations.

// Web search
pub mod etools;
pub mod google;

// Proxy sources
pub mod proxy_list;

pub use etools::ETools;
pub use google::Google;
pub use proxy_list::{ListingProxySource, ProxyListPages};
