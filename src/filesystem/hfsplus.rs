/// Apple HFS Plus and HFSX
///
/// The volume header sits 1024 bytes into the volume, all fields
/// big-endian:
///
/// - 0x00: u16 signature, `"H+"` (0x482B) or `"HX"` (0x4858)
/// - 0x02: u16 version, 4 for HFS+ and 5 for HFSX
/// - 0x04: u32 attributes (bit 8 unmounted clean, bit 13 journaled,
///   bit 15 software lock)
/// - 0x08: 4 ASCII bytes, implementation that last mounted the volume
/// - 0x10/0x14/0x18: create/modify/backup dates, seconds since 1904
/// - 0x20: u32 file count, 0x24: u32 folder count
/// - 0x28: u32 allocation block size, 0x2C: u32 total blocks,
///   0x30: u32 free blocks
/// - 0x44: u32 write count
/// - 0x50: finder info, 8 longs; words 0/3/5 mark bootability and words
///   6-7 carry the volume identifier
///
/// Early volumes hide inside an HFS wrapper: an MDB signed `"BD"` whose
/// embed signature is `"H+"`. The embedded volume starts at
/// `drAlBlSt * 512 + embedExtent.start * drAlBlkSiz` bytes into the
/// partition and carries its own volume header 1024 bytes in. The volume
/// name lives in the catalog B-tree, not the header, so none is reported.
use crate::decode::RawHeader;
use crate::encoding::TextEncoding;
use crate::error::ImageResult;
use crate::filesystem::hfs::{HfsFileSystem, HFS_EMBED_HFSPLUS, HFS_MAGIC};
use crate::filesystem::{
    Capability, Filesystem, FormatDescriptor, Verdict, VolumeInfo, VolumeReport,
};
use crate::image::{read_partition_bytes, Partition, SectorImage};
use crate::time;
use tracing::{debug, trace};
use uuid::uuid;

/// Volume header signature, `"H+"`
pub const HFSPLUS_MAGIC: u16 = 0x482B;

/// Volume header signature, `"HX"`
pub const HFSX_MAGIC: u16 = 0x4858;

/// Byte offset of the volume header from the start of the volume
pub const HFSPLUS_HEADER_OFFSET: u64 = 1024;

const HEADER_SIZE: usize = 0x70;
const VERSION_HFSPLUS: u16 = 4;
const VERSION_HFSX: u16 = 5;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("e0e1cdb0-2e21-4cbe-9b4b-ab3e25ad0b4c"),
    name: "Apple HFS+",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// Volume header fields used for identification and reporting
#[derive(Debug, Clone)]
struct VolumeHeader {
    signature: u16,
    version: u16,
    attributes: u32,
    last_mounted: [u8; 4],
    create_date: u32,
    modify_date: u32,
    backup_date: u32,
    file_count: u32,
    folder_count: u32,
    block_size: u32,
    total_blocks: u32,
    free_blocks: u32,
    write_count: u32,
    finder_info: [u32; 8],
}

impl VolumeHeader {
    fn decode(raw: &[u8]) -> Option<Self> {
        let hdr = RawHeader::new(raw);
        hdr.require(HEADER_SIZE).ok()?;

        let mut finder_info = [0u32; 8];
        for (i, word) in finder_info.iter_mut().enumerate() {
            *word = hdr.u32_be(0x50 + i * 4).ok()?;
        }

        Some(Self {
            signature: hdr.u16_be(0x00).ok()?,
            version: hdr.u16_be(0x02).ok()?,
            attributes: hdr.u32_be(0x04).ok()?,
            last_mounted: hdr.array(0x08).ok()?,
            create_date: hdr.u32_be(0x10).ok()?,
            modify_date: hdr.u32_be(0x14).ok()?,
            backup_date: hdr.u32_be(0x18).ok()?,
            file_count: hdr.u32_be(0x20).ok()?,
            folder_count: hdr.u32_be(0x24).ok()?,
            block_size: hdr.u32_be(0x28).ok()?,
            total_blocks: hdr.u32_be(0x2C).ok()?,
            free_blocks: hdr.u32_be(0x30).ok()?,
            write_count: hdr.u32_be(0x44).ok()?,
            finder_info,
        })
    }

    fn unmounted_clean(&self) -> bool {
        self.attributes & 0x0000_0100 != 0
    }

    fn journaled(&self) -> bool {
        self.attributes & 0x0000_2000 != 0
    }

    fn software_locked(&self) -> bool {
        self.attributes & 0x0000_8000 != 0
    }

    fn version_supported(&self) -> bool {
        self.version == VERSION_HFSPLUS || self.version == VERSION_HFSX
    }
}

/// Where the volume header was found
#[derive(Debug, Clone)]
struct Located {
    header: VolumeHeader,
    wrapped: bool,
}

/// Apple HFS+/HFSX identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct HfsPlusFileSystem;

impl HfsPlusFileSystem {
    fn locate_header(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<Located>> {
        if !partition.fits_within(image) {
            return Ok(None);
        }
        let partition_bytes = partition.byte_len(image.sector_size());
        if partition_bytes < HFSPLUS_HEADER_OFFSET + HEADER_SIZE as u64 {
            return Ok(None);
        }

        let raw = read_partition_bytes(image, partition, HFSPLUS_HEADER_OFFSET, HEADER_SIZE)?;
        let direct = RawHeader::new(&raw).u16_be(0).unwrap_or(0);

        if direct == HFSPLUS_MAGIC || direct == HFSX_MAGIC {
            return Ok(VolumeHeader::decode(&raw).map(|header| Located {
                header,
                wrapped: false,
            }));
        }

        if direct != HFS_MAGIC {
            return Ok(None);
        }

        // An HFS signature here is only interesting as a wrapper
        let Some(mdb) = HfsFileSystem::read_mdb(image, partition)? else {
            return Ok(None);
        };
        if mdb.embed_signature != HFS_EMBED_HFSPLUS {
            trace!("bare HFS volume, not a wrapper");
            return Ok(None);
        }

        let embedded_offset = mdb.first_allocation_block as u64 * 512
            + mdb.embed_start_block as u64 * mdb.allocation_block_size as u64;
        if embedded_offset + HFSPLUS_HEADER_OFFSET + HEADER_SIZE as u64 > partition_bytes {
            trace!(embedded_offset, "embedded volume outside the partition");
            return Ok(None);
        }

        let raw = read_partition_bytes(
            image,
            partition,
            embedded_offset + HFSPLUS_HEADER_OFFSET,
            HEADER_SIZE,
        )?;
        let embedded = RawHeader::new(&raw).u16_be(0).unwrap_or(0);
        if embedded != HFSPLUS_MAGIC && embedded != HFSX_MAGIC {
            trace!(embedded, "wrapper embed extent holds no HFS+ header");
            return Ok(None);
        }

        Ok(VolumeHeader::decode(&raw).map(|header| Located {
            header,
            wrapped: true,
        }))
    }

    fn matches(located: &Located, partition: &Partition, sector_size: u32) -> bool {
        let header = &located.header;
        if !header.version_supported() {
            // Recognized but undecodable; extraction reports the version
            return true;
        }
        if header.block_size < 512 || !header.block_size.is_power_of_two() {
            trace!(block_size = header.block_size, "HFS+ block size out of domain");
            return false;
        }
        if header.total_blocks == 0 {
            return false;
        }
        let declared = header.block_size as u64 * header.total_blocks as u64;
        if declared > partition.byte_len(sector_size) {
            trace!(declared, "HFS+ declared size exceeds partition");
            return false;
        }
        true
    }
}

impl Filesystem for HfsPlusFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(self.locate_header(image, partition).map(|located| {
            located
                .map(|l| Self::matches(&l, partition, image.sector_size()))
                .unwrap_or(false)
        }))
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        _encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let located = match self.locate_header(image, partition) {
            Ok(Some(l)) if Self::matches(&l, partition, image.sector_size()) => l,
            _ => return VolumeReport::default(),
        };
        let header = &located.header;

        let fs_type = if header.signature == HFSX_MAGIC {
            "HFSX"
        } else {
            "HFS+"
        };

        let mut text = String::new();
        text.push_str(&format!("Apple {}\n", fs_type));
        if located.wrapped {
            text.push_str("Volume is embedded inside an HFS wrapper\n");
        }

        if !header.version_supported() {
            debug!(version = header.version, "unsupported HFS+ version");
            text.push_str(&format!(
                "Version {} detected, not supported; stopping at the signature\n",
                header.version
            ));
            let volume = VolumeInfo {
                fs_type: fs_type.to_string(),
                ..VolumeInfo::default()
            };
            return VolumeReport { text, volume };
        }

        let serial = (header.finder_info[6] != 0 || header.finder_info[7] != 0).then(|| {
            format!(
                "{:08X}{:08X}",
                header.finder_info[6], header.finder_info[7]
            )
        });
        let last_mounted = TextEncoding::Ascii.decode(&header.last_mounted);
        let bootable = header.finder_info[0] != 0
            || header.finder_info[3] != 0
            || header.finder_info[5] != 0;

        let volume = VolumeInfo {
            fs_type: fs_type.to_string(),
            clusters: header.total_blocks as u64,
            cluster_size: header.block_size,
            volume_serial: serial,
            created: time::mac_epoch(header.create_date),
            modified: time::mac_epoch(header.modify_date),
            backed_up: time::mac_epoch(header.backup_date),
            free_clusters: Some(header.free_blocks as u64),
            files: Some(header.file_count as u64),
            dirty: !header.unmounted_clean(),
            bootable,
            system_id: (!last_mounted.trim().is_empty())
                .then(|| last_mounted.trim().to_string()),
            ..VolumeInfo::default()
        };

        text.push_str(&format!("Version {}\n", header.version));
        text.push_str(&format!(
            "{} allocation blocks of {} bytes, {} free\n",
            header.total_blocks, header.block_size, header.free_blocks
        ));
        text.push_str(&format!(
            "{} files, {} folders\n",
            header.file_count, header.folder_count
        ));
        text.push_str(&format!("Volume written {} times\n", header.write_count));
        if let Some(id) = &volume.system_id {
            text.push_str(&format!("Last mounted by: {}\n", id));
        }
        if let Some(created) = volume.created {
            text.push_str(&format!("Created: {}\n", created));
        }
        if let Some(modified) = volume.modified {
            text.push_str(&format!("Last modified: {}\n", modified));
        }
        if let Some(backed_up) = volume.backed_up {
            text.push_str(&format!("Last backup: {}\n", backed_up));
        }
        if let Some(serial) = &volume.volume_serial {
            text.push_str(&format!("Volume serial: {}\n", serial));
        }
        if header.journaled() {
            text.push_str("Volume is journaled\n");
        }
        if header.software_locked() {
            text.push_str("Volume is locked by software\n");
        }
        if volume.dirty {
            text.push_str("Volume was not unmounted cleanly\n");
        }
        if volume.bootable {
            text.push_str("Volume is bootable\n");
        }

        VolumeReport { text, volume }
    }
}
