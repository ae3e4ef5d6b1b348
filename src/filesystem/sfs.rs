/// Amiga Smart File System
///
/// SFS keeps a root block at the first block of the partition:
///
/// - 0x00: u32 BE magic `"SFS\0"`
/// - 0x04: u32 BE block checksum
/// - 0x08: u32 BE own-block pointer (0 for the primary root block)
/// - 0x0C: u16 BE version (major in the high byte)
/// - 0x0E: u16 BE sequence number
/// - 0x10: u32 BE creation date, seconds since 1978-01-01
/// - 0x14: u8 root flags (bit 7 case sensitive, bit 6 recycle folder)
/// - 0x18: u64 BE first byte of the partition
/// - 0x20: u64 BE last byte of the partition
/// - 0x28: u32 BE block size
/// - 0x30: u32 BE total blocks
///
/// The volume name lives in the root object container, not the root block,
/// so no name is reported here.
use crate::decode::RawHeader;
use crate::encoding::TextEncoding;
use crate::error::ImageResult;
use crate::filesystem::{
    Capability, Filesystem, FormatDescriptor, Verdict, VolumeInfo, VolumeReport,
};
use crate::image::{read_partition_bytes, Partition, SectorImage};
use crate::time;
use tracing::{debug, trace};
use uuid::uuid;

/// Root block magic, `"SFS\0"` as a big-endian u32
pub const SFS_MAGIC: u32 = 0x5346_5300;

/// Root flag bit: names are compared case-sensitively
pub const SFS_ROOT_CASE_SENSITIVE: u8 = 0x80;

/// Root flag bit: the volume keeps a recycle folder
pub const SFS_ROOT_RECYCLE: u8 = 0x40;

/// Highest major version this decoder fully understands
const SUPPORTED_MAJOR: u8 = 1;

const ROOT_BLOCK_SIZE: usize = 512;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("26ff6e82-7d10-4a0d-bb14-61b7e1a1bfc9"),
    name: "Smart File System",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// Root block fields used for identification and reporting
#[derive(Debug, Clone)]
struct RootBlock {
    own_block: u32,
    version: u16,
    sequence: u16,
    date_created: u32,
    bits: u8,
    first_byte: u64,
    last_byte: u64,
    block_size: u32,
    total_blocks: u32,
}

impl RootBlock {
    fn decode(raw: &[u8]) -> Option<Self> {
        let hdr = RawHeader::new(raw);
        hdr.require(0x40).ok()?;

        if hdr.u32_be(0x00).ok()? != SFS_MAGIC {
            return None;
        }

        Some(Self {
            own_block: hdr.u32_be(0x08).ok()?,
            version: hdr.u16_be(0x0C).ok()?,
            sequence: hdr.u16_be(0x0E).ok()?,
            date_created: hdr.u32_be(0x10).ok()?,
            bits: hdr.u8(0x14).ok()?,
            first_byte: hdr.u64_be(0x18).ok()?,
            last_byte: hdr.u64_be(0x20).ok()?,
            block_size: hdr.u32_be(0x28).ok()?,
            total_blocks: hdr.u32_be(0x30).ok()?,
        })
    }

    fn major(&self) -> u8 {
        (self.version >> 8) as u8
    }

    fn minor(&self) -> u8 {
        (self.version & 0xFF) as u8
    }

    fn case_sensitive(&self) -> bool {
        self.bits & SFS_ROOT_CASE_SENSITIVE != 0
    }

    fn recycle_folder(&self) -> bool {
        self.bits & SFS_ROOT_RECYCLE != 0
    }
}

/// Amiga Smart File System identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartFileSystem;

impl SmartFileSystem {
    fn read_root_block(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<RootBlock>> {
        if !partition.fits_within(image) {
            return Ok(None);
        }
        if partition.byte_len(image.sector_size()) < ROOT_BLOCK_SIZE as u64 {
            return Ok(None);
        }

        let raw = read_partition_bytes(image, partition, 0, ROOT_BLOCK_SIZE)?;
        let Some(root) = RootBlock::decode(&raw) else {
            return Ok(None);
        };

        // The primary root block points at itself at block 0
        if root.own_block != 0 {
            trace!(own_block = root.own_block, "SFS root self-pointer mismatch");
            return Ok(None);
        }

        // Declared geometry must fit the partition
        if root.block_size < 256 || !root.block_size.is_power_of_two() {
            trace!(block_size = root.block_size, "SFS block size out of domain");
            return Ok(None);
        }
        let declared = root.block_size as u64 * root.total_blocks as u64;
        if root.total_blocks == 0 || declared > partition.byte_len(image.sector_size()) {
            trace!(
                total_blocks = root.total_blocks,
                "SFS declared size exceeds partition"
            );
            return Ok(None);
        }

        Ok(Some(root))
    }
}

impl Filesystem for SmartFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(
            self.read_root_block(image, partition)
                .map(|root| root.is_some()),
        )
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        _encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let root = match self.read_root_block(image, partition) {
            Ok(Some(r)) => r,
            _ => return VolumeReport::default(),
        };

        let volume = VolumeInfo {
            fs_type: "Smart File System".to_string(),
            clusters: root.total_blocks as u64,
            cluster_size: root.block_size,
            created: time::amiga_seconds(root.date_created),
            ..VolumeInfo::default()
        };

        let mut text = String::new();
        text.push_str("Smart File System\n");
        text.push_str(&format!("Version {}.{}\n", root.major(), root.minor()));
        if root.major() != SUPPORTED_MAJOR {
            debug!(version = root.version, "unsupported SFS version");
            text.push_str(&format!(
                "Version {}.{} detected, not supported; stopping at the root block\n",
                root.major(),
                root.minor()
            ));
            return VolumeReport { text, volume };
        }

        text.push_str(&format!(
            "{} blocks of {} bytes\n",
            root.total_blocks, root.block_size
        ));
        text.push_str(&format!(
            "Volume spans bytes {} to {}\n",
            root.first_byte, root.last_byte
        ));
        text.push_str(&format!("Root sequence {}\n", root.sequence));
        if let Some(created) = volume.created {
            text.push_str(&format!("Created: {}\n", created));
        }
        if root.case_sensitive() {
            text.push_str("Names are case sensitive\n");
        }
        if root.recycle_folder() {
            text.push_str("Volume keeps a recycle folder\n");
        }

        VolumeReport { text, volume }
    }
}
