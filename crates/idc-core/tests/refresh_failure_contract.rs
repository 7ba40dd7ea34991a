//! Contract Test: Refresh Failure Keeps Last Good State
//!
//! This test verifies that an unreadable source never degrades lookups.
//!
//! Constraints verified:
//! - A failed rebuild leaves the previous table published
//! - Failures are reported as errors and events, never through lookups
//! - A recovered source is picked up by the next refresh
//! - A broken region catalogue keeps the previous catalogue
//!
//! If this test fails, someone has:
//! - Published an empty table on read failure
//! - Swallowed source errors silently
//! - Made lookups depend on refresh success

mod common;

use common::*;
use idc_core::{
    AddressFamily, Datacenter, Error, IdcResolver, ResolverConfig, ResolverEvent,
};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn failed_refresh_keeps_previous_table() {
    let source = ControlledSource::new(&["10.0.0.0/8 lf"], &["fd00::/8 hl"]);
    let handle = source.clone();
    let (resolver, _rx) = loaded_resolver(source).await;
    let before = resolver.stats();

    handle.set_failing(true);
    let result = resolver.refresh().await;
    assert!(matches!(result, Err(Error::SourceUnavailable(_))));

    assert_eq!(resolver.lookup_str("10.1.1.1"), "lf");
    assert_eq!(resolver.lookup_str("fd00::1"), "hl");
    assert_eq!(resolver.stats(), before);
}

#[tokio::test]
async fn failure_is_reported_as_event() {
    let source = ControlledSource::new(&["10.0.0.0/8 lf"], &[]);
    let handle = source.clone();
    let (resolver, mut rx) = loaded_resolver(source).await;
    drain_events(&mut rx);

    handle.set_failing(true);
    assert_err!(resolver.refresh_family(AddressFamily::V4).await);

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ResolverEvent::RefreshFailed { family: AddressFamily::V4, .. }
    ));
}

#[tokio::test]
async fn recovered_source_is_picked_up() {
    let source = ControlledSource::new(&["10.0.0.0/8 old"], &[]);
    let handle = source.clone();
    let (resolver, _rx) = loaded_resolver(source).await;

    handle.set_failing(true);
    handle.set_lines(AddressFamily::V4, &["10.0.0.0/8 new"]);
    assert_err!(resolver.refresh_family(AddressFamily::V4).await);
    assert_eq!(resolver.lookup_str("10.0.0.1"), "old");

    handle.set_failing(false);
    let segments = assert_ok!(resolver.refresh_family(AddressFamily::V4).await);
    assert_eq!(segments, 1);
    assert_eq!(resolver.lookup_str("10.0.0.1"), "new");
}

#[tokio::test]
async fn readable_empty_source_publishes_empty_table() {
    let source = ControlledSource::new(&["10.0.0.0/8 lf"], &[]);
    let handle = source.clone();
    let (resolver, _rx) = loaded_resolver(source).await;

    handle.set_lines(AddressFamily::V4, &[]);
    assert_ok!(resolver.refresh_family(AddressFamily::V4).await);

    assert_eq!(resolver.lookup_str("10.0.0.1"), Datacenter::Unknown);
    assert_eq!(resolver.stats().v4_segments, 0);
}

#[tokio::test]
async fn never_loaded_resolver_answers_unknown() {
    let (resolver, _rx) =
        IdcResolver::new(Box::new(UnavailableSource), minimal_config()).unwrap();

    assert_err!(resolver.refresh().await);
    assert_eq!(resolver.lookup_str("10.0.0.1"), Datacenter::Unknown);
    assert_eq!(resolver.stats().v4_generation, 0);
}

#[tokio::test]
async fn broken_region_catalogue_keeps_previous() {
    let mut region_file = NamedTempFile::new().unwrap();
    region_file
        .write_all(br#"{"CN": ["lf", "hl"], "SG": ["sg1"]}"#)
        .unwrap();

    let config = minimal_config().with_region_file(Some(region_file.path().to_path_buf()));
    let source = ControlledSource::new(&["10.0.0.0/8 lf", "11.0.0.0/8 sg1"], &[]);
    let (resolver, mut rx) = IdcResolver::new(Box::new(source), config).unwrap();

    assert_ok!(resolver.refresh().await);
    assert_eq!(resolver.region_for_ip("10.0.0.1").as_deref(), Some("CN"));
    assert_eq!(resolver.region_for_ip("11.0.0.1").as_deref(), Some("SG"));
    assert_eq!(resolver.region_for_ip("12.0.0.1"), None);
    assert_eq!(resolver.stats().datacenters, 3);

    std::fs::write(region_file.path(), "not json").unwrap();
    drain_events(&mut rx);
    assert!(matches!(
        resolver.refresh_regions().await,
        Err(Error::Region(_))
    ));

    assert_eq!(resolver.region_for_ip("10.0.0.1").as_deref(), Some("CN"));
    assert!(matches!(
        drain_events(&mut rx).as_slice(),
        [ResolverEvent::RegionRefreshFailed { .. }]
    ));
}

#[tokio::test]
async fn absent_region_file_means_empty_catalogue() {
    let config = ResolverConfig::new()
        .with_region_file(None)
        .with_refresh_interval_secs(10);
    let (resolver, _rx) = IdcResolver::new(
        Box::new(ControlledSource::new(&["10.0.0.0/8 lf"], &[])),
        config,
    )
    .unwrap();

    assert_ok!(resolver.refresh().await);
    assert!(resolver.regions().is_empty());
    assert_eq!(resolver.region_for_ip("10.0.0.1"), None);
}
