// # File Segment Source
//
// Reads segment lines from the agent-provided file and the local file of
// each address family.
//
// ## Read Order
//
// The agent file is read first, then the local file; lines are
// concatenated in that order. Since the loader keeps the first occurrence
// of a CIDR, the agent file takes priority over the local one.
//
// ## Availability
//
// A missing file contributes no lines. The source only fails when *none*
// of the files of a family could be read, in which case the resolver keeps
// its previously published table.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::Error;
use crate::config::{SegmentFiles, SourcesConfig};
use crate::family::AddressFamily;
use crate::traits::SegmentSource;

/// Read one segment file into lines
pub async fn read_segment_file(path: impl AsRef<Path>) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        Error::source_unavailable(format!(
            "Failed to read segment file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(content.lines().map(str::to_string).collect())
}

/// File-based segment source
///
/// # Example
///
/// ```rust,no_run
/// use idc_core::source::FileSegmentSource;
/// use idc_core::traits::SegmentSource;
/// use idc_core::AddressFamily;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = FileSegmentSource::default();
///     let lines = source.load(AddressFamily::V4).await?;
///     println!("{} lines", lines.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSegmentSource {
    files: SourcesConfig,
}

impl FileSegmentSource {
    /// Create a source over the given files
    pub fn new(files: SourcesConfig) -> Self {
        Self { files }
    }

    /// Files read for a family
    pub fn files(&self, family: AddressFamily) -> &SegmentFiles {
        self.files.files(family)
    }
}

#[async_trait]
impl SegmentSource for FileSegmentSource {
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>, Error> {
        let mut lines = Vec::new();
        let mut last_error = None;
        let mut readable = 0usize;

        for path in self.files(family).paths() {
            match read_segment_file(path).await {
                Ok(mut file_lines) => {
                    debug!(
                        "Read {} line(s) from {} segment file {}",
                        file_lines.len(),
                        family,
                        path.display()
                    );
                    readable += 1;
                    lines.append(&mut file_lines);
                }
                Err(e) => {
                    debug!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        match (readable, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(lines),
        }
    }

    fn source_name(&self) -> &str {
        "file"
    }
}
