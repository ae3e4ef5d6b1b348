/// Apple Hierarchical File System
///
/// The Master Directory Block sits 1024 bytes into the volume, all fields
/// big-endian:
///
/// - 0x00: u16 drSigWord (`"BD"`, 0x4244)
/// - 0x02: u32 drCrDate, 0x06: u32 drLsMod (seconds since 1904)
/// - 0x0A: u16 drAtrb (bit 7 hardware lock, bit 8 unmounted clean,
///   bit 15 software lock)
/// - 0x0C: u16 drNmFls
/// - 0x12: u16 drNmAlBlks, 0x14: u32 drAlBlkSiz
/// - 0x1C: u16 drAlBlSt
/// - 0x22: u16 drFreeBks
/// - 0x24: drVN, Pascal volume name (27 bytes max), Mac Roman
/// - 0x40: u32 drVolBkUp, 0x46: u32 drWrCnt
/// - 0x54: u32 drFilCnt, 0x58: u32 drDirCnt
/// - 0x5C: drFndrInfo, 8 longs; the first is the system folder id
/// - 0x7C: u16 drEmbedSigWord, 0x7E/0x80: embed extent start/count
///
/// A volume whose MDB declares an embedded HFS+ signature is a wrapper, not
/// a bare HFS volume; those belong to the HFS+ plugin and are refused here
/// so probe order between the two plugins never matters.
use crate::decode::{pascal_string, RawHeader};
use crate::encoding::TextEncoding;
use crate::error::ImageResult;
use crate::filesystem::{
    Capability, Filesystem, FormatDescriptor, Verdict, VolumeInfo, VolumeReport,
};
use crate::image::{read_partition_bytes, Partition, SectorImage};
use crate::time;
use tracing::trace;
use uuid::uuid;

/// MDB signature, `"BD"` as a big-endian u16
pub const HFS_MAGIC: u16 = 0x4244;

/// Embedded HFS+ signature inside a wrapper MDB
pub const HFS_EMBED_HFSPLUS: u16 = 0x482B;

/// Byte offset of the MDB from the start of the volume
pub const HFS_MDB_OFFSET: u64 = 1024;

const MDB_SIZE: usize = 0x84;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("8e7f1a3c-6f52-4b0a-b2cb-c16767f9c2a0"),
    name: "Apple HFS",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// Master Directory Block fields used here and by the HFS+ wrapper logic
#[derive(Debug, Clone)]
pub(crate) struct MasterDirectoryBlock {
    pub(crate) signature: u16,
    create_date: u32,
    modify_date: u32,
    attributes: u16,
    file_count: u16,
    pub(crate) allocation_blocks: u16,
    pub(crate) allocation_block_size: u32,
    pub(crate) first_allocation_block: u16,
    free_blocks: u16,
    volume_name: [u8; 28],
    backup_date: u32,
    write_count: u32,
    finder_info: [u32; 8],
    pub(crate) embed_signature: u16,
    pub(crate) embed_start_block: u16,
}

impl MasterDirectoryBlock {
    pub(crate) fn decode(raw: &[u8]) -> Option<Self> {
        let hdr = RawHeader::new(raw);
        hdr.require(MDB_SIZE).ok()?;

        let mut finder_info = [0u32; 8];
        for (i, word) in finder_info.iter_mut().enumerate() {
            *word = hdr.u32_be(0x5C + i * 4).ok()?;
        }

        Some(Self {
            signature: hdr.u16_be(0x00).ok()?,
            create_date: hdr.u32_be(0x02).ok()?,
            modify_date: hdr.u32_be(0x06).ok()?,
            attributes: hdr.u16_be(0x0A).ok()?,
            file_count: hdr.u16_be(0x0C).ok()?,
            allocation_blocks: hdr.u16_be(0x12).ok()?,
            allocation_block_size: hdr.u32_be(0x14).ok()?,
            first_allocation_block: hdr.u16_be(0x1C).ok()?,
            free_blocks: hdr.u16_be(0x22).ok()?,
            volume_name: hdr.array(0x24).ok()?,
            backup_date: hdr.u32_be(0x40).ok()?,
            write_count: hdr.u32_be(0x46).ok()?,
            finder_info,
            embed_signature: hdr.u16_be(0x7C).ok()?,
            embed_start_block: hdr.u16_be(0x7E).ok()?,
        })
    }

    fn hardware_locked(&self) -> bool {
        self.attributes & 0x0080 != 0
    }

    fn unmounted_clean(&self) -> bool {
        self.attributes & 0x0100 != 0
    }

    fn software_locked(&self) -> bool {
        self.attributes & 0x8000 != 0
    }
}

/// Apple HFS identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct HfsFileSystem;

impl HfsFileSystem {
    pub(crate) fn read_mdb(
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<MasterDirectoryBlock>> {
        if !partition.fits_within(image) {
            return Ok(None);
        }
        if partition.byte_len(image.sector_size()) < HFS_MDB_OFFSET + MDB_SIZE as u64 {
            return Ok(None);
        }

        let raw = read_partition_bytes(image, partition, HFS_MDB_OFFSET, MDB_SIZE)?;
        Ok(MasterDirectoryBlock::decode(&raw))
    }

    fn matches(mdb: &MasterDirectoryBlock, partition: &Partition, sector_size: u32) -> bool {
        if mdb.signature != HFS_MAGIC {
            trace!(signature = mdb.signature, "HFS signature mismatch");
            return false;
        }

        // Wrapped HFS+ volumes are not bare HFS
        if mdb.embed_signature == HFS_EMBED_HFSPLUS {
            trace!("HFS wrapper around HFS+, refusing");
            return false;
        }

        if mdb.allocation_blocks == 0
            || mdb.allocation_block_size == 0
            || mdb.allocation_block_size % 512 != 0
        {
            trace!(
                blocks = mdb.allocation_blocks,
                block_size = mdb.allocation_block_size,
                "HFS allocation geometry out of domain"
            );
            return false;
        }

        let declared = mdb.allocation_blocks as u64 * mdb.allocation_block_size as u64;
        if declared > partition.byte_len(sector_size) {
            trace!(declared, "HFS declared size exceeds partition");
            return false;
        }

        true
    }
}

impl Filesystem for HfsFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(Self::read_mdb(image, partition).map(|mdb| {
            mdb.map(|m| Self::matches(&m, partition, image.sector_size()))
                .unwrap_or(false)
        }))
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let mdb = match Self::read_mdb(image, partition) {
            Ok(Some(m)) if Self::matches(&m, partition, image.sector_size()) => m,
            _ => return VolumeReport::default(),
        };

        let encoding = encoding.unwrap_or(TextEncoding::MacRoman);
        let name = encoding.decode(pascal_string(&mdb.volume_name));

        let volume = VolumeInfo {
            fs_type: "HFS".to_string(),
            clusters: mdb.allocation_blocks as u64,
            cluster_size: mdb.allocation_block_size,
            volume_name: (!name.is_empty()).then_some(name),
            created: time::mac_epoch(mdb.create_date),
            modified: time::mac_epoch(mdb.modify_date),
            backed_up: time::mac_epoch(mdb.backup_date),
            free_clusters: Some(mdb.free_blocks as u64),
            files: Some(mdb.file_count as u64),
            dirty: !mdb.unmounted_clean(),
            bootable: mdb.finder_info[0] != 0,
            ..VolumeInfo::default()
        };

        let mut text = String::new();
        text.push_str("Apple Hierarchical File System\n");
        if let Some(name) = &volume.volume_name {
            text.push_str(&format!("Volume name: {}\n", name));
        }
        text.push_str(&format!(
            "{} allocation blocks of {} bytes, {} free\n",
            mdb.allocation_blocks, mdb.allocation_block_size, mdb.free_blocks
        ));
        text.push_str(&format!(
            "First allocation block at {}\n",
            mdb.first_allocation_block
        ));
        text.push_str(&format!("{} files in the root folder\n", mdb.file_count));
        text.push_str(&format!("Volume written {} times\n", mdb.write_count));
        if let Some(created) = volume.created {
            text.push_str(&format!("Created: {}\n", created));
        }
        if let Some(modified) = volume.modified {
            text.push_str(&format!("Last modified: {}\n", modified));
        }
        if let Some(backed_up) = volume.backed_up {
            text.push_str(&format!("Last backup: {}\n", backed_up));
        }
        if volume.dirty {
            text.push_str("Volume was not unmounted cleanly\n");
        }
        if mdb.hardware_locked() {
            text.push_str("Volume is locked by hardware\n");
        }
        if mdb.software_locked() {
            text.push_str("Volume is locked by software\n");
        }
        if volume.bootable {
            text.push_str("Volume has a system folder\n");
        }

        VolumeReport { text, volume }
    }
}
