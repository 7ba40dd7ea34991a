//! Test doubles and common utilities for resolver contract tests
//!
//! This module provides minimal segment sources whose behaviour the tests
//! control directly, plus helpers for building resolvers around them.

#![allow(dead_code)]

use idc_core::error::{Error, Result};
use idc_core::traits::SegmentSource;
use idc_core::{AddressFamily, IdcResolver, ResolverConfig, ResolverEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// A segment source whose lines and availability the test controls
#[derive(Clone)]
pub struct ControlledSource {
    /// Lines returned per family
    lines: Arc<std::sync::Mutex<HashMap<AddressFamily, Vec<String>>>>,
    /// When set, every load fails
    failing: Arc<AtomicBool>,
    /// Call counter for load()
    load_call_count: Arc<AtomicUsize>,
    /// Artificial delay applied to every load
    delay: Option<Duration>,
}

impl ControlledSource {
    /// Create a source serving the given IPv4 and IPv6 lines
    pub fn new(v4: &[&str], v6: &[&str]) -> Self {
        let mut lines = HashMap::new();
        lines.insert(AddressFamily::V4, to_lines(v4));
        lines.insert(AddressFamily::V6, to_lines(v6));

        Self {
            lines: Arc::new(std::sync::Mutex::new(lines)),
            failing: Arc::new(AtomicBool::new(false)),
            load_call_count: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Delay every load by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the lines of a family
    pub fn set_lines(&self, family: AddressFamily, lines: &[&str]) {
        self.lines.lock().unwrap().insert(family, to_lines(lines));
    }

    /// Make every subsequent load fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get the number of times load() was called
    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SegmentSource for ControlledSource {
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>> {
        self.load_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::source_unavailable("controlled failure"));
        }

        Ok(self
            .lines
            .lock()
            .unwrap()
            .get(&family)
            .cloned()
            .unwrap_or_default())
    }

    fn source_name(&self) -> &str {
        "controlled"
    }
}

/// A source that is never readable
pub struct UnavailableSource;

#[async_trait::async_trait]
impl SegmentSource for UnavailableSource {
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>> {
        Err(Error::source_unavailable(format!("{} segments offline", family)))
    }

    fn source_name(&self) -> &str {
        "unavailable"
    }
}

/// Helper to create a config without a region catalogue
pub fn minimal_config() -> ResolverConfig {
    ResolverConfig::new()
        .with_region_file(None)
        .with_refresh_interval_secs(10)
}

/// Build a resolver around `source` and load it once
pub async fn loaded_resolver(
    source: impl SegmentSource + 'static,
) -> (Arc<IdcResolver>, mpsc::Receiver<ResolverEvent>) {
    let (resolver, rx) = IdcResolver::new(Box::new(source), minimal_config())
        .expect("resolver construction succeeds");
    resolver.refresh().await.expect("initial refresh succeeds");
    (Arc::new(resolver), rx)
}

/// Collect every event currently queued
pub fn drain_events(rx: &mut mpsc::Receiver<ResolverEvent>) -> Vec<ResolverEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn to_lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}
