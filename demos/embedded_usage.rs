//! Minimal embedding example for idc-core
//!
//! This example demonstrates using idc-core as a library in a custom
//! application. Segment lines come from the application itself rather than
//! from the standard files, and the resolver lifecycle is fully managed by
//! the application.

use idc_core::{
    AddressFamily, Error, IdcResolver, ResolverConfig, Result, traits::SegmentSource,
};
use std::sync::{Arc, Mutex};

/// Segment lines pushed by the application, e.g. from a config service
struct AppSegmentSource {
    v4: Arc<Mutex<Vec<String>>>,
}

impl AppSegmentSource {
    fn new(lines: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
        let v4 = Arc::new(Mutex::new(
            lines.iter().map(|line| line.to_string()).collect(),
        ));
        (Self { v4: Arc::clone(&v4) }, v4)
    }
}

#[async_trait::async_trait]
impl SegmentSource for AppSegmentSource {
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>> {
        match family {
            AddressFamily::V4 => Ok(self.v4.lock().unwrap().clone()),
            AddressFamily::V6 => Err(Error::source_unavailable("no IPv6 segments in this app")),
        }
    }

    fn source_name(&self) -> &str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded idc-core Example ===\n");

    let (source, lines) = AppSegmentSource::new(&["10.8.0.0/16 agsh", "10.8.0.0/22 agcq"]);
    let config = ResolverConfig::new()
        .with_region_file(None)
        .with_refresh_interval_secs(1);

    println!("1. Creating resolver...");
    let (resolver, mut event_rx) = IdcResolver::new(Box::new(source), config)?;
    let resolver = Arc::new(resolver);

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. Starting periodic refresh...");
    let refresh_task = resolver.spawn_refresh();
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    for ip in ["10.8.1.1", "10.8.200.1", "192.0.2.1"] {
        println!("   {} -> {}", ip, resolver.lookup_str(ip));
    }

    println!("\n3. Application changes its segments...");
    lines
        .lock()
        .unwrap()
        .push("10.8.200.0/24 lf".to_string());
    tokio::time::sleep(tokio::time::Duration::from_millis(1200)).await;
    println!("   10.8.200.1 -> {}", resolver.lookup_str("10.8.200.1"));

    println!("\n4. Stopping refresh task...");
    refresh_task.shutdown().await?;
    tracing::info!(stats = ?resolver.stats(), "resolver stopped");

    drop(resolver);
    let _ = tokio::time::timeout(tokio::time::Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Resolver lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- Lookups keep answering from the last published table");

    Ok(())
}
