/// HP Logical Interchange Format
///
/// LIF volumes carry a 256-byte system block at the start of the volume:
///
/// - 0x00: u16 BE magic (0x8000)
/// - 0x02: 6-byte volume label, ASCII, space padded
/// - 0x08: u32 BE directory start (in 256-byte LIF sectors)
/// - 0x0C: u16 BE LIF identifier
/// - 0x10: u32 BE directory size
/// - 0x14: u16 BE LIF version
/// - 0x18: u32 BE tracks per surface
/// - 0x1C: u32 BE surfaces
/// - 0x20: u32 BE sectors per track
/// - 0x24: 6-byte BCD creation date (yy mm dd hh mm ss)
///
/// All multi-byte fields are big-endian. The allocation unit is always the
/// 256-byte LIF sector regardless of the physical sector size.
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

/// LIF system block magic
pub const LIF_MAGIC: u16 = 0x8000;

/// LIF sector (allocation unit) size in bytes
pub const LIF_SECTOR_SIZE: u32 = 256;

const SYSTEM_BLOCK_SIZE: usize = 256;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("41535fd8-5622-4bfa-ae41-5fb2d5b07b4e"),
    name: "HP Logical Interchange Format",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// System block fields used for identification and reporting
#[derive(Debug, Clone)]
struct SystemBlock {
    magic: u16,
    volume_label: [u8; 6],
    directory_start: u32,
    lif_id: u16,
    directory_size: u32,
    lif_version: u16,
    tracks: u32,
    heads: u32,
    sectors: u32,
    creation_date: [u8; 6],
}

impl SystemBlock {
    fn decode(raw: &[u8]) -> Option<Self> {
        let hdr = RawHeader::new(raw);
        hdr.require(SYSTEM_BLOCK_SIZE).ok()?;

        Some(Self {
            magic: hdr.u16_be(0x00).ok()?,
            volume_label: hdr.array(0x02).ok()?,
            directory_start: hdr.u32_be(0x08).ok()?,
            lif_id: hdr.u16_be(0x0C).ok()?,
            directory_size: hdr.u32_be(0x10).ok()?,
            lif_version: hdr.u16_be(0x14).ok()?,
            tracks: hdr.u32_be(0x18).ok()?,
            heads: hdr.u32_be(0x1C).ok()?,
            sectors: hdr.u32_be(0x20).ok()?,
            creation_date: hdr.array(0x24).ok()?,
        })
    }
}

/// HP LIF identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct LifFileSystem;

impl LifFileSystem {
    fn read_system_block(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<SystemBlock>> {
        if !partition.fits_within(image) {
            return Ok(None);
        }
        if partition.byte_len(image.sector_size()) < SYSTEM_BLOCK_SIZE as u64 {
            return Ok(None);
        }

        let raw = read_partition_bytes(image, partition, 0, SYSTEM_BLOCK_SIZE)?;
        Ok(SystemBlock::decode(&raw))
    }

    fn matches(block: &SystemBlock, partition: &Partition, sector_size: u32) -> bool {
        if block.magic != LIF_MAGIC {
            trace!(magic = block.magic, "LIF magic mismatch");
            return false;
        }

        // Directory must start past the system block and inside the volume
        let lif_sectors = partition.byte_len(sector_size) / LIF_SECTOR_SIZE as u64;
        if block.directory_start == 0 || block.directory_start as u64 >= lif_sectors {
            trace!(
                directory_start = block.directory_start,
                "LIF directory start outside volume"
            );
            return false;
        }

        true
    }
}

impl Filesystem for LifFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(self.read_system_block(image, partition).map(|block| {
            block
                .map(|b| Self::matches(&b, partition, image.sector_size()))
                .unwrap_or(false)
        }))
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let block = match self.read_system_block(image, partition) {
            Ok(Some(b)) if Self::matches(&b, partition, image.sector_size()) => b,
            _ => return VolumeReport::default(),
        };

        let encoding = encoding.unwrap_or(TextEncoding::Ascii);
        let label = encoding
            .decode(crate::decode::c_string(&block.volume_label))
            .trim_end()
            .to_string();
        let created = time::lif_bcd(&block.creation_date);

        let volume = VolumeInfo {
            fs_type: "LIF".to_string(),
            clusters: partition.byte_len(image.sector_size()) / LIF_SECTOR_SIZE as u64,
            cluster_size: LIF_SECTOR_SIZE,
            volume_name: (!label.is_empty()).then_some(label),
            created,
            ..VolumeInfo::default()
        };

        let mut text = String::new();
        text.push_str("HP Logical Interchange Format\n");
        if let Some(name) = &volume.volume_name {
            text.push_str(&format!("Volume name: {}\n", name));
        }
        text.push_str(&format!(
            "Volume: {} sectors of {} bytes\n",
            volume.clusters, volume.cluster_size
        ));
        text.push_str(&format!(
            "Directory: starts at sector {}, {} sectors\n",
            block.directory_start, block.directory_size
        ));
        text.push_str(&format!(
            "LIF identifier 0x{:04X}, version {}\n",
            block.lif_id, block.lif_version
        ));
        if block.tracks > 0 || block.heads > 0 || block.sectors > 0 {
            text.push_str(&format!(
                "Geometry: {} tracks, {} heads, {} sectors\n",
                block.tracks, block.heads, block.sectors
            ));
        }
        if let Some(created) = created {
            text.push_str(&format!("Created: {}\n", created));
        }

        VolumeReport { text, volume }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MemoryImage;
    use chrono::{TimeZone, Utc};

    fn lif_image() -> MemoryImage {
        let mut data = vec![0u8; 16 * 256];
        data[0] = 0x80; // magic
        data[1] = 0x00;
        data[2..8].copy_from_slice(b"TEST  ");
        data[0x08..0x0C].copy_from_slice(&2u32.to_be_bytes()); // directory start
        data[0x0C..0x0E].copy_from_slice(&0x1000u16.to_be_bytes());
        data[0x10..0x14].copy_from_slice(&4u32.to_be_bytes()); // directory size
        data[0x14..0x16].copy_from_slice(&1u16.to_be_bytes()); // version
        data[0x24..0x2A].copy_from_slice(&[0x98, 0x11, 0x05, 0x14, 0x30, 0x00]);
        MemoryImage::new(data, 256).unwrap()
    }

    #[test]
    fn test_identify_lif() {
        let image = lif_image();
        let partition = Partition::whole_image(&image, "lif");
        assert!(LifFileSystem.identify(&image, &partition).matched());
    }

    #[test]
    fn test_identify_rejects_bad_magic() {
        let image = lif_image();
        let mut raw = image.read_sectors(0, 16).unwrap();
        raw[0] = 0x7F;
        let image = MemoryImage::new(raw, 256).unwrap();
        let partition = Partition::whole_image(&image, "lif");
        assert_eq!(
            LifFileSystem.identify(&image, &partition),
            Verdict::NotMatched
        );
    }

    #[test]
    fn test_identify_rejects_directory_outside_volume() {
        let image = lif_image();
        let mut raw = image.read_sectors(0, 16).unwrap();
        raw[0x08..0x0C].copy_from_slice(&100u32.to_be_bytes());
        let image = MemoryImage::new(raw, 256).unwrap();
        let partition = Partition::whole_image(&image, "lif");
        assert_eq!(
            LifFileSystem.identify(&image, &partition),
            Verdict::NotMatched
        );
    }

    #[test]
    fn test_info_decodes_label_and_date() {
        let image = lif_image();
        let partition = Partition::whole_image(&image, "lif");
        let report = LifFileSystem.info(&image, &partition, None);

        assert_eq!(report.volume.fs_type, "LIF");
        assert_eq!(report.volume.cluster_size, 256);
        assert_eq!(report.volume.clusters, 16);
        assert_eq!(report.volume.volume_name.as_deref(), Some("TEST"));
        assert_eq!(
            report.volume.created,
            Some(Utc.with_ymd_and_hms(1998, 11, 5, 14, 30, 0).unwrap())
        );
        assert!(report.text.contains("Volume name: TEST"));
    }

    #[test]
    fn test_info_zero_date_stays_unset() {
        let image = lif_image();
        let mut raw = image.read_sectors(0, 16).unwrap();
        raw[0x24..0x2A].fill(0);
        let image = MemoryImage::new(raw, 256).unwrap();
        let partition = Partition::whole_image(&image, "lif");

        let report = LifFileSystem.info(&image, &partition, None);
        assert!(report.volume.created.is_none());
        assert!(!report.text.contains("Created"));
    }

    #[test]
    fn test_info_on_mismatch_is_empty() {
        let image = MemoryImage::new(vec![0; 4 * 256], 256).unwrap();
        let partition = Partition::whole_image(&image, "blank");
        assert_eq!(
            LifFileSystem.info(&image, &partition, None),
            VolumeReport::default()
        );
    }

    #[test]
    fn test_identify_partition_exceeding_image() {
        let image = lif_image();
        let partition = Partition::new(0, 32, "overrun");
        assert_eq!(
            LifFileSystem.identify(&image, &partition),
            Verdict::NotMatched
        );
    }
}
