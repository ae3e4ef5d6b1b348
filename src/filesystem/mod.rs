/// Filesystem identification and inspection plugins
///
/// Every supported format implements the same two-call contract: `identify`
/// is a pure predicate over an image and partition, and `info` re-derives
/// the same header locations to produce a canonical metadata record plus a
/// human-readable report. Plugins are stateless unit structs registered in
/// a single immutable table, so a dispatcher can probe any subset in any
/// order, including in parallel.

/// Amiga OFS/FFS
pub mod amigados;
/// Commodore 1541/1571/1581
pub mod cbm;
/// Apple Hierarchical File System
pub mod hfs;
/// Apple HFS Plus
pub mod hfsplus;
/// HP Logical Interchange Format
pub mod lif;
/// Amiga Smart File System
pub mod sfs;

pub use amigados::AmigaFileSystem;
pub use cbm::CbmFileSystem;
pub use hfs::HfsFileSystem;
pub use hfsplus::HfsPlusFileSystem;
pub use lif::LifFileSystem;
pub use sfs::SmartFileSystem;

use crate::encoding::TextEncoding;
use crate::error::{ErrorKind, ImageError};
use crate::image::{Partition, SectorImage};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What a plugin is able to do with a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Identification and metadata extraction only
    ReadOnlyIdentification,
    /// Extended operations beyond identification
    Extended,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::ReadOnlyIdentification => write!(f, "read-only identification"),
            Capability::Extended => write!(f, "extended"),
        }
    }
}

/// Constant metadata describing a format plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Stable identifier for this plugin
    pub id: Uuid,
    /// Display name of the format
    pub name: &'static str,
    /// Plugin author
    pub author: &'static str,
    /// Declared capability
    pub capability: Capability,
}

/// Outcome of probing one format against one partition
///
/// Identification is fail-open: structural mismatches are the normal outcome
/// of probing the wrong format and fold into `NotMatched`, while genuine
/// read failures are reported as `Failed` so callers that care can tell the
/// two apart. Nothing at this layer ever propagates an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All declared checks passed
    Matched,
    /// A bounds, magic or consistency check failed
    NotMatched,
    /// The underlying image could not be read
    Failed(ErrorKind),
}

impl Verdict {
    /// Whether the format positively matched
    pub fn matched(&self) -> bool {
        matches!(self, Verdict::Matched)
    }

    /// Fold a probe result into a verdict, mapping read errors to `Failed`
    pub(crate) fn from_probe(result: Result<bool, ImageError>) -> Self {
        match result {
            Ok(true) => Verdict::Matched,
            Ok(false) => Verdict::NotMatched,
            Err(err) => Verdict::Failed(err.kind()),
        }
    }
}

/// Canonical volume metadata decoded from a positively-identified partition
///
/// Optional fields stay `None` when the format does not store them; nothing
/// here is computed speculatively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeInfo {
    /// Filesystem type name
    pub fs_type: String,
    /// Number of allocation units
    pub clusters: u64,
    /// Size of one allocation unit in bytes
    pub cluster_size: u32,
    /// Volume name or label
    pub volume_name: Option<String>,
    /// Volume serial number or identifier
    pub volume_serial: Option<String>,
    /// Creation timestamp
    pub created: Option<DateTime<Utc>>,
    /// Last modification timestamp
    pub modified: Option<DateTime<Utc>>,
    /// Last backup timestamp
    pub backed_up: Option<DateTime<Utc>>,
    /// Free allocation units, when the header stores the count
    pub free_clusters: Option<u64>,
    /// File count, when the header stores it
    pub files: Option<u64>,
    /// Volume was not cleanly unmounted
    pub dirty: bool,
    /// Volume is bootable
    pub bootable: bool,
    /// System identifier
    pub system_id: Option<String>,
    /// Application identifier
    pub application_id: Option<String>,
}

/// Metadata record plus the human-readable report derived from it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeReport {
    /// Multi-line plain-text report
    pub text: String,
    /// Decoded metadata
    pub volume: VolumeInfo,
}

/// The identification and inspection contract every format implements
pub trait Filesystem: Send + Sync {
    /// Constant plugin metadata
    fn descriptor(&self) -> &'static FormatDescriptor;

    /// Probe whether this format occupies the partition
    ///
    /// A pure predicate: no mutation, no propagated errors, safe to call
    /// speculatively against any partition of any image. Partitions outside
    /// the image bounds, truncated headers, failed magic or consistency
    /// checks all yield `NotMatched`; only read failures yield `Failed`.
    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict;

    /// Decode volume metadata and build a report
    ///
    /// Re-derives every offset from the image rather than assuming a prior
    /// `identify` cached anything. If the header no longer matches, the
    /// default (empty) report is returned rather than an error. The encoding
    /// override applies to embedded strings; `None` selects the format's
    /// declared default.
    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        encoding: Option<TextEncoding>,
    ) -> VolumeReport;
}

/// All registered format plugins
///
/// An explicit, hand-maintained list rather than discovered at runtime, so
/// dispatch stays visible and each addition is a reviewed change.
pub static PLUGINS: &[&dyn Filesystem] = &[
    &AmigaFileSystem,
    &CbmFileSystem,
    &HfsFileSystem,
    &HfsPlusFileSystem,
    &LifFileSystem,
    &SmartFileSystem,
];

/// Find a registered plugin by its descriptor name (case-insensitive)
pub fn find_plugin(name: &str) -> Option<&'static dyn Filesystem> {
    PLUGINS
        .iter()
        .find(|p| p.descriptor().name.eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_descriptors_are_distinct() {
        for (i, a) in PLUGINS.iter().enumerate() {
            for b in &PLUGINS[i + 1..] {
                assert_ne!(a.descriptor().id, b.descriptor().id);
                assert_ne!(a.descriptor().name, b.descriptor().name);
            }
        }
    }

    #[test]
    fn test_find_plugin() {
        assert!(find_plugin("Apple HFS").is_some());
        assert!(find_plugin("apple hfs").is_some());
        assert!(find_plugin("NoSuchFormat").is_none());
    }

    #[test]
    fn test_verdict_from_probe() {
        assert_eq!(Verdict::from_probe(Ok(true)), Verdict::Matched);
        assert_eq!(Verdict::from_probe(Ok(false)), Verdict::NotMatched);
        let err = ImageError::out_of_range(0, 1, 0);
        assert_eq!(
            Verdict::from_probe(Err(err)),
            Verdict::Failed(ErrorKind::OutOfRange)
        );
    }

    #[test]
    fn test_default_report_is_empty() {
        let report = VolumeReport::default();
        assert!(report.text.is_empty());
        assert_eq!(report.volume, VolumeInfo::default());
    }
}
