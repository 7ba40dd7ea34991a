// # Region catalogue
//
// Maps IDC labels to the coarse region they belong to.
//
// ## File Format
//
// ```json
// {
//   "CN": ["lf", "hl", "lq"],
//   "SG": ["sg1", "alisg"]
// }
// ```
//
// The file is keyed by region; it is inverted on load so lookups go from
// IDC to region. An IDC listed under two regions keeps the one that sorts
// first, so repeated loads of the same file always agree.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tokio::fs;

use crate::error::{Error, Result};
use crate::segment::Label;

/// Marker for IDCs without a region
pub const UNKNOWN_REGION: &str = "-";

/// Inverted `IDC -> region` catalogue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    regions: HashMap<String, Label>,
}

impl RegionMap {
    /// Catalogue with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the `{region: [idc, ...]}` JSON form
    pub fn from_json_str(json: &str) -> Result<Self> {
        let by_region: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;

        let mut regions = HashMap::new();
        for (region, idcs) in by_region {
            let region: Label = Arc::from(region);
            for idc in idcs {
                regions.entry(idc).or_insert_with(|| region.clone());
            }
        }

        Ok(Self { regions })
    }

    /// Read and parse a catalogue file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::region(format!(
                "Failed to read region file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json_str(&content).map_err(|e| {
            Error::region(format!(
                "Failed to parse region file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Region of an IDC, if catalogued
    pub fn region_of(&self, idc: &str) -> Option<Label> {
        self.regions.get(idc).cloned()
    }

    /// Region of an IDC, or [`UNKNOWN_REGION`]
    pub fn region_or_unknown(&self, idc: &str) -> &str {
        self.regions
            .get(idc)
            .map(|region| &**region)
            .unwrap_or(UNKNOWN_REGION)
    }

    /// Whether the IDC is catalogued
    pub fn contains(&self, idc: &str) -> bool {
        self.regions.contains_key(idc)
    }

    /// All catalogued IDCs, sorted
    pub fn datacenters(&self) -> Vec<&str> {
        let mut idcs: Vec<&str> = self.regions.keys().map(String::as_str).collect();
        idcs.sort_unstable();
        idcs
    }

    /// Number of catalogued IDCs
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the catalogue is empty
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
