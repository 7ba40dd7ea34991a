//! Configuration types for the IDC resolver
//!
//! Every field has a default matching the standard deployment layout, so
//! an empty JSON object (`{}`) is a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::family::AddressFamily;

/// Segment file written by the local service-discovery agent (IPv4)
pub const AGENT_FILE_V4: &str = "/opt/tmp/consul_agent/netsegment";
/// Locally maintained segment file (IPv4)
pub const LOCAL_FILE_V4: &str = "/opt/tiger/chadc/netsegment";
/// Segment file written by the local service-discovery agent (IPv6)
pub const AGENT_FILE_V6: &str = "/opt/tmp/consul_agent/netsegment6";
/// Locally maintained segment file (IPv6)
pub const LOCAL_FILE_V6: &str = "/opt/tiger/chadc/netsegment6";
/// Default region catalogue
pub const REGION_FILE: &str = "/opt/tiger/chadc/region.json";

/// Main resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Default segment files per family
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Region catalogue file; `None` disables region lookups
    #[serde(default = "default_region_file")]
    pub region_file: Option<PathBuf>,

    /// Interval between background refreshes (in seconds)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Capacity of the resolver event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// IPv4 override file, read instead of the default files when set
    #[serde(default)]
    pub override_v4: Option<PathBuf>,

    /// IPv6 override file, read instead of the default files when set
    #[serde(default)]
    pub override_v6: Option<PathBuf>,
}

impl ResolverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            sources: SourcesConfig::default(),
            region_file: default_region_file(),
            refresh_interval_secs: default_refresh_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            override_v4: None,
            override_v6: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.refresh_interval_secs == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        for family in AddressFamily::ALL {
            if let Some(path) = self.override_path(family)
                && path.as_os_str().is_empty()
            {
                return Err(crate::Error::config(format!(
                    "{} override path cannot be empty",
                    family
                )));
            }
        }

        Ok(())
    }

    /// Refresh interval as a [`Duration`]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Override file configured for a family
    pub fn override_path(&self, family: AddressFamily) -> Option<&Path> {
        match family {
            AddressFamily::V4 => self.override_v4.as_deref(),
            AddressFamily::V6 => self.override_v6.as_deref(),
        }
    }

    /// Set the refresh interval
    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Set or clear the region catalogue file
    pub fn with_region_file(mut self, path: Option<PathBuf>) -> Self {
        self.region_file = path;
        self
    }

    /// Set the initial override file for a family
    pub fn with_override(mut self, family: AddressFamily, path: impl Into<PathBuf>) -> Self {
        let path = Some(path.into());
        match family {
            AddressFamily::V4 => self.override_v4 = path,
            AddressFamily::V6 => self.override_v6 = path,
        }
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Default segment files for both families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// IPv4 segment files
    #[serde(default = "SegmentFiles::default_v4")]
    pub v4: SegmentFiles,

    /// IPv6 segment files
    #[serde(default = "SegmentFiles::default_v6")]
    pub v6: SegmentFiles,
}

impl SourcesConfig {
    /// Files for one family
    pub fn files(&self, family: AddressFamily) -> &SegmentFiles {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            v4: SegmentFiles::default_v4(),
            v6: SegmentFiles::default_v6(),
        }
    }
}

/// Pair of segment files read in order: agent first, then local
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentFiles {
    /// File maintained by the discovery agent
    pub agent: PathBuf,
    /// File maintained on the host
    pub local: PathBuf,
}

impl SegmentFiles {
    /// Create a file pair
    pub fn new(agent: impl Into<PathBuf>, local: impl Into<PathBuf>) -> Self {
        Self {
            agent: agent.into(),
            local: local.into(),
        }
    }

    /// Standard IPv4 locations
    pub fn default_v4() -> Self {
        Self::new(AGENT_FILE_V4, LOCAL_FILE_V4)
    }

    /// Standard IPv6 locations
    pub fn default_v6() -> Self {
        Self::new(AGENT_FILE_V6, LOCAL_FILE_V6)
    }

    /// Files in read order
    pub fn paths(&self) -> [&Path; 2] {
        [self.agent.as_path(), self.local.as_path()]
    }
}

fn default_region_file() -> Option<PathBuf> {
    Some(PathBuf::from(REGION_FILE))
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default_config() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.sources.v4, SegmentFiles::default_v4());
        assert_eq!(config.sources.v6.agent, PathBuf::from(AGENT_FILE_V6));
        assert_eq!(config.region_file, Some(PathBuf::from(REGION_FILE)));
        assert!(config.override_path(AddressFamily::V4).is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{
                "sources": {"v4": {"agent": "/tmp/a", "local": "/tmp/b"}},
                "region_file": null,
                "refresh_interval_secs": 30,
                "override_v6": "/tmp/v6"
            }"#,
        )
        .unwrap();
        assert_eq!(config.sources.v4.paths(), [Path::new("/tmp/a"), Path::new("/tmp/b")]);
        assert_eq!(config.sources.v6, SegmentFiles::default_v6());
        assert!(config.region_file.is_none());
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(
            config.override_path(AddressFamily::V6),
            Some(Path::new("/tmp/v6"))
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = ResolverConfig::new().with_refresh_interval_secs(0);
        assert!(config.validate().is_err());

        let mut config = ResolverConfig::new();
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());

        let config = ResolverConfig::new().with_override(AddressFamily::V4, "");
        assert!(config.validate().is_err());
    }
}
