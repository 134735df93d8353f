//! Example: Google search through proxies from a local list file.
//!
//! Usage: `cargo run --example basic_search -- proxies.txt "rust programming"`

use relay_search::{ManagerConfig, ProxyManager, ProxyMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let proxy_file = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: basic_search <proxy-file> [query]"))?;
    let query = args.next().unwrap_or_else(|| "rust programming language".to_string());

    let config = ManagerConfig {
        proxy: ProxyMode::File {
            path: proxy_file.into(),
        },
        ..Default::default()
    };
    let mut manager = ProxyManager::new(config)?;

    println!("Searching for: {}", query);
    println!();

    let response = manager.search_google(&query, 20).await?;

    if let Some(total) = response.stats.total_result_count {
        println!("Google reports about {} results", total);
    }
    println!("Collected {} results", response.len());
    println!();

    for (i, result) in response.items().iter().enumerate() {
        println!("{}. {}", i + 1, result.title.as_deref().unwrap_or("(untitled)"));
        println!("   URL: {}", result.link.as_deref().unwrap_or("-"));
        if let Some(snippet) = &result.snippet {
            let snippet = if snippet.chars().count() > 100 {
                format!("{}...", snippet.chars().take(100).collect::<String>())
            } else {
                snippet.clone()
            };
            println!("   {}", snippet);
        }
        println!();
    }

    Ok(())
}
