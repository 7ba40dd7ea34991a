//! IDC resolver
//!
//! The IdcResolver is responsible for:
//! - Loading segment lines from a SegmentSource (or an override file)
//! - Building IPv4 and IPv6 lookup tables
//! - Publishing tables atomically so lookups never block
//! - Refreshing tables and the region catalogue on a timer
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   lines   ┌──────────────┐  swap   ┌──────────────────┐
//! │ SegmentSource │──────────►│ IdcResolver  │────────►│ ArcSwap<Snapshot>│
//! │ / override    │           │  (rebuild)   │         │  v4 / v6         │
//! └───────────────┘           └──────────────┘         └──────────────────┘
//!                                    │                          ▲
//!                                    ▼                          │ load
//!                             ┌─────────────┐              ┌─────────┐
//!                             │   Events    │              │ lookups │
//!                             └─────────────┘              └─────────┘
//! ```
//!
//! ## Refresh Flow
//!
//! 1. Take the refresh lock (rebuilds are serialized)
//! 2. Read the override file if one is set, else ask the source
//! 3. Parse, flatten and merge into a new table
//! 4. Swap the published snapshot
//! 5. Emit an event
//!
//! A failure at step 2 leaves the previous snapshot in place.

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::family::{AddressFamily, SegmentAddr};
use crate::region::RegionMap;
use crate::segment::{Datacenter, Label, SegmentTable};
use crate::source::read_segment_file;
use crate::traits::SegmentSource;

/// Events emitted by the IdcResolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEvent {
    /// A new table was published
    TablePublished {
        family: AddressFamily,
        segments: usize,
        generation: u64,
        /// Source name, or `override <path>` when an override file was read
        origin: String,
    },

    /// A table rebuild failed; the previous table stays published
    RefreshFailed {
        family: AddressFamily,
        error: String,
    },

    /// A new region catalogue was published
    RegionsPublished {
        datacenters: usize,
    },

    /// The region catalogue could not be reloaded
    RegionRefreshFailed {
        error: String,
    },

    /// An override file was set or cleared
    OverrideChanged {
        family: AddressFamily,
        path: Option<PathBuf>,
    },

    /// Refresh task started
    Started {
        refresh_interval_secs: u64,
    },

    /// Refresh task stopped
    Stopped {
        reason: String,
    },
}

/// Published table of one family
#[derive(Debug, Clone)]
pub struct TableSnapshot<A> {
    /// The lookup table
    pub table: SegmentTable<A>,
    /// Publish counter value; 0 for the initial empty table
    pub generation: u64,
    /// When the table was built; `None` for the initial empty table
    pub built_at: Option<DateTime<Utc>>,
}

impl<A: SegmentAddr> TableSnapshot<A> {
    fn initial() -> Self {
        Self {
            table: SegmentTable::empty(),
            generation: 0,
            built_at: None,
        }
    }
}

/// Point-in-time summary of the published state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    /// Segments in the IPv4 table
    pub v4_segments: usize,
    /// Segments in the IPv6 table
    pub v6_segments: usize,
    /// Generation of the IPv4 table
    pub v4_generation: u64,
    /// Generation of the IPv6 table
    pub v6_generation: u64,
    /// IDCs in the region catalogue
    pub datacenters: usize,
}

/// IP to IDC resolver
///
/// Lookups read the currently published snapshot with a single atomic
/// load and never wait on a refresh. Refreshes build a brand-new table
/// and replace the published one as a whole.
///
/// ## Lifecycle
///
/// 1. Create with [`IdcResolver::new()`] (tables start empty)
/// 2. Load once with [`IdcResolver::refresh()`], or
/// 3. Start the periodic task with [`IdcResolver::spawn_refresh()`]
/// 4. Stop it with [`RefreshTask::shutdown()`]
///
/// ## Threading
///
/// Share the resolver as `Arc<IdcResolver>`; every method takes `&self`.
pub struct IdcResolver {
    /// Default source of segment lines
    source: Box<dyn SegmentSource>,

    /// Published IPv4 snapshot
    v4: ArcSwap<TableSnapshot<u32>>,

    /// Published IPv6 snapshot
    v6: ArcSwap<TableSnapshot<u128>>,

    /// Published region catalogue
    regions: ArcSwap<RegionMap>,

    /// IPv4 override file
    override_v4: ArcSwapOption<PathBuf>,

    /// IPv6 override file
    override_v6: ArcSwapOption<PathBuf>,

    /// Region catalogue file
    region_file: ArcSwapOption<PathBuf>,

    /// Interval between background refreshes
    refresh_interval: Duration,

    /// Publish counter shared by both families
    generation: AtomicU64,

    /// Serializes rebuilds so an older rebuild never overwrites a newer one
    refresh_lock: Mutex<()>,

    /// Same for region catalogue reloads
    region_lock: Mutex<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ResolverEvent>,
}

impl IdcResolver {
    /// Create a new resolver
    ///
    /// # Parameters
    ///
    /// - `source`: Default source of segment lines
    /// - `config`: Resolver configuration
    ///
    /// # Returns
    ///
    /// A tuple of (resolver, event_receiver) where event_receiver yields
    /// resolver events
    pub fn new(
        source: Box<dyn SegmentSource>,
        config: ResolverConfig,
    ) -> Result<(Self, mpsc::Receiver<ResolverEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let resolver = Self {
            source,
            v4: ArcSwap::from_pointee(TableSnapshot::initial()),
            v6: ArcSwap::from_pointee(TableSnapshot::initial()),
            regions: ArcSwap::from_pointee(RegionMap::empty()),
            override_v4: ArcSwapOption::new(config.override_v4.clone().map(Arc::new)),
            override_v6: ArcSwapOption::new(config.override_v6.clone().map(Arc::new)),
            region_file: ArcSwapOption::new(config.region_file.clone().map(Arc::new)),
            refresh_interval: config.refresh_interval(),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            region_lock: Mutex::new(()),
            event_tx: tx,
        };

        Ok((resolver, rx))
    }

    /// Resolve an IPv4 address
    pub fn lookup_v4(&self, ip: Ipv4Addr) -> Datacenter {
        self.v4.load().table.lookup(u32::from(ip))
    }

    /// Resolve an IPv6 address against the IPv6 table
    pub fn lookup_v6(&self, ip: Ipv6Addr) -> Datacenter {
        self.v6.load().table.lookup(u128::from(ip))
    }

    /// Resolve an address of either family
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) use the IPv4 table.
    pub fn lookup_ip(&self, ip: IpAddr) -> Datacenter {
        match ip {
            IpAddr::V4(v4) => self.lookup_v4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => self.lookup_v4(v4),
                None => self.lookup_v6(v6),
            },
        }
    }

    /// Resolve an address given as text
    ///
    /// Text that is not an IP address resolves to [`Datacenter::Unknown`].
    pub fn lookup_str(&self, ip: &str) -> Datacenter {
        match ip.trim().parse::<IpAddr>() {
            Ok(ip) => self.lookup_ip(ip),
            Err(_) => Datacenter::Unknown,
        }
    }

    /// Region of the IDC an address resolves to
    pub fn region_for_ip(&self, ip: &str) -> Option<Label> {
        match self.lookup_str(ip) {
            Datacenter::Known(idc) => self.regions.load().region_of(&idc),
            Datacenter::Unknown => None,
        }
    }

    /// Currently published IPv4 snapshot
    pub fn snapshot_v4(&self) -> Arc<TableSnapshot<u32>> {
        self.v4.load_full()
    }

    /// Currently published IPv6 snapshot
    pub fn snapshot_v6(&self) -> Arc<TableSnapshot<u128>> {
        self.v6.load_full()
    }

    /// Currently published region catalogue
    pub fn regions(&self) -> Arc<RegionMap> {
        self.regions.load_full()
    }

    /// Summary of the published state
    pub fn stats(&self) -> ResolverStats {
        let v4 = self.v4.load();
        let v6 = self.v6.load();
        ResolverStats {
            v4_segments: v4.table.len(),
            v6_segments: v6.table.len(),
            v4_generation: v4.generation,
            v6_generation: v6.generation,
            datacenters: self.regions.load().len(),
        }
    }

    /// Override file currently set for a family
    pub fn override_path(&self, family: AddressFamily) -> Option<PathBuf> {
        self.override_slot(family)
            .load_full()
            .map(|path| PathBuf::clone(&path))
    }

    /// Read segments of a family from `path` instead of the source
    ///
    /// The family is rebuilt from the new file immediately. If the file
    /// cannot be read the previous table stays published, the override
    /// stays set, and the error is returned; later refreshes retry it.
    pub async fn set_override_path(
        &self,
        family: AddressFamily,
        path: impl Into<PathBuf>,
    ) -> Result<usize> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("override path cannot be empty"));
        }

        info!("Setting {} segment override: {}", family, path.display());
        self.override_slot(family).store(Some(Arc::new(path.clone())));
        self.emit_event(ResolverEvent::OverrideChanged {
            family,
            path: Some(path),
        });

        self.refresh_family(family).await
    }

    /// Drop the override of a family and rebuild from the source
    pub async fn clear_override_path(&self, family: AddressFamily) -> Result<usize> {
        info!("Clearing {} segment override", family);
        self.override_slot(family).store(None);
        self.emit_event(ResolverEvent::OverrideChanged { family, path: None });

        self.refresh_family(family).await
    }

    /// Region catalogue file currently in use
    pub fn region_file(&self) -> Option<PathBuf> {
        self.region_file.load_full().map(|path| PathBuf::clone(&path))
    }

    /// Read the region catalogue from `path` from now on
    ///
    /// The catalogue is reloaded immediately. If the file cannot be read or
    /// parsed the previous catalogue stays published, the new path stays
    /// set, and the error is returned; later refreshes retry it.
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of IDCs in the published catalogue
    /// - `Err(Error)`: Catalogue unreadable; previous catalogue kept
    pub async fn set_region_file(&self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("region file path cannot be empty"));
        }

        info!("Setting region catalogue file: {}", path.display());
        self.region_file.store(Some(Arc::new(path)));

        self.refresh_regions().await
    }

    /// Rebuild both tables and the region catalogue
    ///
    /// Every part is attempted; the first failure is returned after all
    /// parts ran. Failed parts keep their previous published value.
    pub async fn refresh(&self) -> Result<()> {
        let mut first_error = None;

        for family in AddressFamily::ALL {
            if let Err(e) = self.refresh_family(family).await {
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.refresh_regions().await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rebuild and publish the table of one family
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of segments in the published table
    /// - `Err(Error)`: Source unavailable; previous table kept
    pub async fn refresh_family(&self, family: AddressFamily) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;

        let (lines, origin) = match self.load_lines(family).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Keeping previous {} table: {}", family, e);
                self.emit_event(ResolverEvent::RefreshFailed {
                    family,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let segments = match family {
            AddressFamily::V4 => {
                self.publish(&self.v4, SegmentTable::from_lines(&lines), &origin)
            }
            AddressFamily::V6 => {
                self.publish(&self.v6, SegmentTable::from_lines(&lines), &origin)
            }
        };

        Ok(segments)
    }

    /// Reload the region catalogue, if one is configured
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of IDCs in the published catalogue
    /// - `Err(Error)`: Catalogue unreadable; previous catalogue kept
    pub async fn refresh_regions(&self) -> Result<usize> {
        let _guard = self.region_lock.lock().await;

        // read under the lock so a newer path set meanwhile is never lost
        let Some(path) = self.region_file.load_full() else {
            return Ok(self.regions.load().len());
        };

        match RegionMap::from_file(path.as_path()).await {
            Ok(regions) => {
                let datacenters = regions.len();
                self.regions.store(Arc::new(regions));
                debug!(
                    "Published region catalogue with {} IDC(s) from {}",
                    datacenters,
                    path.display()
                );
                self.emit_event(ResolverEvent::RegionsPublished { datacenters });
                Ok(datacenters)
            }
            Err(e) => {
                warn!("Keeping previous region catalogue: {}", e);
                self.emit_event(ResolverEvent::RegionRefreshFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start the periodic refresh task
    ///
    /// The first refresh runs immediately, then every refresh interval.
    /// The task stops when [`RefreshTask::shutdown()`] is called or the
    /// returned handle is dropped.
    pub fn spawn_refresh(self: &Arc<Self>) -> RefreshTask {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let resolver = Arc::clone(self);

        let handle = tokio::spawn(async move { resolver.run_with_shutdown(shutdown_rx).await });

        RefreshTask {
            shutdown_tx,
            handle,
        }
    }

    /// Run the refresh loop until `shutdown_rx` fires or its sender is dropped
    pub async fn run_with_shutdown(&self, mut shutdown_rx: oneshot::Receiver<()>) {
        self.emit_event(ResolverEvent::Started {
            refresh_interval_secs: self.refresh_interval.as_secs(),
        });
        info!(
            "Segment refresh task started, interval {:?}",
            self.refresh_interval
        );

        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        // non-fatal, retried on the next tick
                        debug!("Refresh incomplete: {}", e);
                    }
                }

                _ = &mut shutdown_rx => {
                    info!("Segment refresh task stopping");
                    self.emit_event(ResolverEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }
    }

    /// Lines for a family and where they came from: the override file if
    /// set, else the source
    async fn load_lines(&self, family: AddressFamily) -> Result<(Vec<String>, String)> {
        match self.override_slot(family).load_full() {
            Some(path) => {
                let lines = read_segment_file(path.as_path()).await?;
                Ok((lines, format!("override {}", path.display())))
            }
            None => {
                let lines = self.source.load(family).await?;
                Ok((lines, self.source.source_name().to_string()))
            }
        }
    }

    /// Swap in a new table and return its segment count
    fn publish<A: SegmentAddr>(
        &self,
        slot: &ArcSwap<TableSnapshot<A>>,
        table: SegmentTable<A>,
        origin: &str,
    ) -> usize {
        let segments = table.len();
        if !table.is_well_formed() {
            error!("{} table violates ordering invariant", A::FAMILY);
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        slot.store(Arc::new(TableSnapshot {
            table,
            generation,
            built_at: Some(Utc::now()),
        }));

        info!(
            "Published {} table: {} segment(s), generation {} (source: {})",
            A::FAMILY,
            segments,
            generation,
            origin
        );
        self.emit_event(ResolverEvent::TablePublished {
            family: A::FAMILY,
            segments,
            generation,
            origin: origin.to_string(),
        });

        segments
    }

    fn override_slot(&self, family: AddressFamily) -> &ArcSwapOption<PathBuf> {
        match family {
            AddressFamily::V4 => &self.override_v4,
            AddressFamily::V6 => &self.override_v6,
        }
    }

    /// Emit a resolver event
    fn emit_event(&self, event: ResolverEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Handle to the periodic refresh task
///
/// Dropping the handle also stops the task at its next wake-up.
#[derive(Debug)]
pub struct RefreshTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Stop the task and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        // the task may already be gone; the join below reports that
        let _ = self.shutdown_tx.send(());
        self.handle
            .await
            .map_err(|e| Error::Other(format!("Refresh task failed: {}", e)))
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
