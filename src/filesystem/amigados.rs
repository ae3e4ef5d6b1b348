/// AmigaDOS Original and Fast File System
///
/// An AmigaDOS volume starts with a 1024-byte boot block whose first long is
/// `"DOS"` plus a flags byte (bit 0 FFS, bit 1 international mode, bit 2
/// directory cache; the remaining bits are reserved and clear). The root
/// block is not pointed to reliably by the boot block; it sits at the
/// midpoint of the partition, one block off on some geometries, and is
/// recognized by structure:
///
/// - 0x00: u32 BE block type (2, T_HEADER)
/// - 0x0C: u32 BE hash table size (longs per block minus 56)
/// - 0x14: u32 BE checksum; all longs of the block sum to zero
/// - after the hash table: bitmap-valid flag (-1 when clean)
/// - end-relative: BCPL volume name at -0x50, alteration datestamp at
///   -0x28, creation datestamp at -0x1C, secondary type 1 at -0x04
///
/// Datestamps are days/minutes/ticks since 1978-01-01. The boot block is
/// bootable when its carry-folded checksum over all 1024 bytes is all-ones.
use crate::decode::RawHeader;
use crate::encoding::TextEncoding;
use crate::error::ImageResult;
use crate::filesystem::{
    Capability, Filesystem, FormatDescriptor, Verdict, VolumeInfo, VolumeReport,
};
use crate::image::{read_partition_bytes, Partition, SectorImage};
use crate::time;
use tracing::trace;
use uuid::uuid;

/// Boot block flags byte: fast file system
pub const AMIGA_FLAG_FFS: u8 = 0x01;

/// Boot block flags byte: international character handling
pub const AMIGA_FLAG_INTL: u8 = 0x02;

/// Boot block flags byte: directory cache blocks
pub const AMIGA_FLAG_DIRCACHE: u8 = 0x04;

const BOOT_BLOCK_SIZE: usize = 1024;
const ROOT_TYPE_HEADER: u32 = 2;
const ROOT_SECTYPE_ROOT: u32 = 1;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("3f7cbea8-8997-4a71-ab31-0c9e9a0f8e72"),
    name: "Amiga Original/Fast File System",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// Root block fields used for identification and reporting
#[derive(Debug, Clone)]
struct RootBlock {
    bitmap_valid: bool,
    name: Vec<u8>,
    altered: Option<chrono::DateTime<chrono::Utc>>,
    created: Option<chrono::DateTime<chrono::Utc>>,
}

impl RootBlock {
    /// Decode and structurally validate a root block candidate
    fn decode(raw: &[u8]) -> Option<Self> {
        let block_size = raw.len();
        if block_size < 512 || block_size % 4 != 0 {
            return None;
        }
        let hdr = RawHeader::new(raw);

        if hdr.u32_be(0x00).ok()? != ROOT_TYPE_HEADER {
            return None;
        }
        if hdr.u32_be(block_size - 0x04).ok()? != ROOT_SECTYPE_ROOT {
            return None;
        }

        let longs = block_size / 4;
        let hash_table_size = hdr.u32_be(0x0C).ok()?;
        if hash_table_size as usize != longs - 56 {
            trace!(hash_table_size, "root hash table size mismatch");
            return None;
        }

        if !checksum_folds_to_zero(raw) {
            trace!("root block checksum invalid");
            return None;
        }

        // Bitmap flag follows the hash table
        let bitmap_flag = hdr.u32_be(0x18 + hash_table_size as usize * 4).ok()?;

        let name_field = hdr.bytes(block_size - 0x50, 31).ok()?;
        let name = crate::decode::pascal_string(name_field).to_vec();

        let altered = time::amiga_epoch(
            hdr.u32_be(block_size - 0x28).ok()?,
            hdr.u32_be(block_size - 0x24).ok()?,
            hdr.u32_be(block_size - 0x20).ok()?,
        );
        let created = time::amiga_epoch(
            hdr.u32_be(block_size - 0x1C).ok()?,
            hdr.u32_be(block_size - 0x18).ok()?,
            hdr.u32_be(block_size - 0x14).ok()?,
        );

        Some(Self {
            bitmap_valid: bitmap_flag == 0xFFFF_FFFF,
            name,
            altered,
            created,
        })
    }
}

/// Everything the probe learns about a volume
#[derive(Debug, Clone)]
struct Probed {
    flags: u8,
    bootable: bool,
    root: RootBlock,
}

/// Amiga OFS/FFS identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct AmigaFileSystem;

impl AmigaFileSystem {
    fn probe(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<Probed>> {
        if !partition.fits_within(image) {
            return Ok(None);
        }
        let sector_size = image.sector_size();
        if sector_size < 512 || sector_size % 4 != 0 {
            return Ok(None);
        }
        if partition.byte_len(sector_size) < (BOOT_BLOCK_SIZE * 4) as u64 {
            return Ok(None);
        }

        let boot = read_partition_bytes(image, partition, 0, BOOT_BLOCK_SIZE)?;
        if &boot[0..3] != b"DOS" || boot[3] & 0xF8 != 0 {
            trace!("no AmigaDOS boot signature");
            return Ok(None);
        }

        let Some(root) = self.find_root_block(image, partition)? else {
            trace!("boot signature without a valid root block");
            return Ok(None);
        };

        Ok(Some(Probed {
            flags: boot[3],
            bootable: boot_checksum_valid(&boot),
            root,
        }))
    }

    /// Locate the root block around the partition midpoint
    ///
    /// Odd sector counts put the nominal root one block off, so the
    /// structurally-valid candidate among {mid, mid-1, mid+1} wins.
    fn find_root_block(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<RootBlock>> {
        let mid = partition.start + partition.sector_len() / 2;

        for candidate in [mid, mid.saturating_sub(1), mid + 1] {
            if candidate <= partition.start || candidate >= partition.end {
                continue;
            }
            let raw = image.read_sector(candidate)?;
            if let Some(root) = RootBlock::decode(&raw) {
                return Ok(Some(root));
            }
        }
        Ok(None)
    }
}

/// Rotating checksum: every long of the block sums to zero
fn checksum_folds_to_zero(raw: &[u8]) -> bool {
    let mut sum = 0u32;
    for chunk in raw.chunks_exact(4) {
        sum = sum.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    sum == 0
}

/// Boot block checksum: carry-folded sum over 1024 bytes is all-ones
fn boot_checksum_valid(boot: &[u8]) -> bool {
    let mut sum = 0u32;
    for chunk in boot.chunks_exact(4) {
        let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let (folded, carry) = sum.overflowing_add(value);
        sum = folded.wrapping_add(carry as u32);
    }
    sum == 0xFFFF_FFFF
}

impl Filesystem for AmigaFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(self.probe(image, partition).map(|probed| probed.is_some()))
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let probed = match self.probe(image, partition) {
            Ok(Some(p)) => p,
            _ => return VolumeReport::default(),
        };

        let encoding = encoding.unwrap_or(TextEncoding::Latin1);
        let name = encoding.decode(&probed.root.name);
        let ffs = probed.flags & AMIGA_FLAG_FFS != 0;
        let fs_type = if ffs { "Amiga FFS" } else { "Amiga OFS" };

        let volume = VolumeInfo {
            fs_type: fs_type.to_string(),
            clusters: partition.sector_len(),
            cluster_size: image.sector_size(),
            volume_name: (!name.is_empty()).then_some(name),
            created: probed.root.created,
            modified: probed.root.altered,
            dirty: !probed.root.bitmap_valid,
            bootable: probed.bootable,
            ..VolumeInfo::default()
        };

        let mut text = String::new();
        text.push_str(&format!("{}\n", fs_type));
        if probed.flags & AMIGA_FLAG_INTL != 0 {
            text.push_str("International character handling\n");
        }
        if probed.flags & AMIGA_FLAG_DIRCACHE != 0 {
            text.push_str("Directory cache blocks\n");
        }
        if let Some(name) = &volume.volume_name {
            text.push_str(&format!("Volume name: {}\n", name));
        }
        text.push_str(&format!(
            "{} blocks of {} bytes\n",
            volume.clusters, volume.cluster_size
        ));
        if let Some(created) = volume.created {
            text.push_str(&format!("Created: {}\n", created));
        }
        if let Some(altered) = volume.modified {
            text.push_str(&format!("Last altered: {}\n", altered));
        }
        if volume.dirty {
            text.push_str("Block bitmap is not valid\n");
        }
        if volume.bootable {
            text.push_str("Boot block checksum is valid\n");
        }

        VolumeReport { text, volume }
    }
}
