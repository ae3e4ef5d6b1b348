/// Commodore 1541/1571/1581 filesystem
///
/// CBM drives keep their allocation and name data in a fixed sector chosen
/// by the drive model rather than a superblock, so identification is driven
/// by exact geometry plus the directory pointers inside that sector:
///
/// - 1541 (683 or 768 sectors) and 1571 (1366 sectors): the BAM lives at
///   linear sector 357 (track 18, sector 0). Directory track byte 0x12,
///   DOS version byte `'A'`, double-side flag 0x00 or 0x80.
/// - 1581 (3200 sectors): the header lives at linear sector 1600 (track 40,
///   sector 0). Disk DOS version byte `'D'` and DOS type `"3D"`.
///
/// All sectors are 256 bytes; the format stores no timestamps. Text is
/// PETSCII with 0xA0 padding.
use crate::decode::RawHeader;
use crate::encoding::TextEncoding;
use crate::error::ImageResult;
use crate::filesystem::{
    Capability, Filesystem, FormatDescriptor, Verdict, VolumeInfo, VolumeReport,
};
use crate::image::{Partition, SectorImage};
use tracing::trace;
use uuid::uuid;

/// CBM sector size in bytes
pub const CBM_SECTOR_SIZE: u32 = 256;

/// Linear sector of the 1541/1571 BAM (track 18, sector 0)
pub const CBM_BAM_SECTOR: u64 = 357;

/// Linear sector of the 1581 disk header (track 40, sector 0)
pub const CBM_1581_HEADER_SECTOR: u64 = 1600;

/// Expected directory track byte in a 1541/1571 BAM
pub const CBM_DIRECTORY_TRACK: u8 = 0x12;

/// Expected DOS version byte in a 1541/1571 BAM
pub const CBM_DOS_VERSION: u8 = 0x41;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    id: uuid!("d104744e-90a1-49b9-9c5c-fcbb4c5de126"),
    name: "Commodore file system",
    author: "Damien Guard",
    capability: Capability::ReadOnlyIdentification,
};

/// Drive model implied by the image geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveModel {
    /// 1541, 35 tracks (683 sectors)
    Cbm1541,
    /// 1541, 40-track extension (768 sectors)
    Cbm1541Extended,
    /// 1571 (1366 sectors)
    Cbm1571,
    /// 1581 (3200 sectors)
    Cbm1581,
}

impl DriveModel {
    fn from_sector_count(sectors: u64) -> Option<Self> {
        match sectors {
            683 => Some(DriveModel::Cbm1541),
            768 => Some(DriveModel::Cbm1541Extended),
            1366 => Some(DriveModel::Cbm1571),
            3200 => Some(DriveModel::Cbm1581),
            _ => None,
        }
    }
}

impl std::fmt::Display for DriveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveModel::Cbm1541 => write!(f, "Commodore 1541"),
            DriveModel::Cbm1541Extended => write!(f, "Commodore 1541 (40 track)"),
            DriveModel::Cbm1571 => write!(f, "Commodore 1571"),
            DriveModel::Cbm1581 => write!(f, "Commodore 1581"),
        }
    }
}

/// Name and identity fields shared by the BAM and 1581 header layouts
#[derive(Debug, Clone)]
struct DiskHeader {
    model: DriveModel,
    name: [u8; 16],
    disk_id: [u8; 2],
    dos_type: [u8; 2],
    double_sided: bool,
}

/// Commodore 1541/1571/1581 identification and inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct CbmFileSystem;

impl CbmFileSystem {
    fn read_header(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
    ) -> ImageResult<Option<DiskHeader>> {
        if !partition.fits_within(image) || partition.start != 0 {
            return Ok(None);
        }
        if image.sector_size() != CBM_SECTOR_SIZE {
            return Ok(None);
        }

        let Some(model) = DriveModel::from_sector_count(partition.sector_len()) else {
            trace!(sectors = partition.sector_len(), "not a CBM geometry");
            return Ok(None);
        };

        if model == DriveModel::Cbm1581 {
            let raw = image.read_sector(CBM_1581_HEADER_SECTOR)?;
            Ok(Self::decode_1581_header(&raw))
        } else {
            let raw = image.read_sector(CBM_BAM_SECTOR)?;
            Ok(Self::decode_bam(&raw, model))
        }
    }

    fn decode_bam(raw: &[u8], model: DriveModel) -> Option<DiskHeader> {
        let hdr = RawHeader::new(raw);
        hdr.require(0xAB).ok()?;

        let directory_track = hdr.u8(0x00).ok()?;
        let dos_version = hdr.u8(0x02).ok()?;
        let double_sided = hdr.u8(0x03).ok()?;

        if directory_track != CBM_DIRECTORY_TRACK {
            trace!(directory_track, "CBM directory track mismatch");
            return None;
        }
        if dos_version != CBM_DOS_VERSION {
            trace!(dos_version, "CBM DOS version mismatch");
            return None;
        }
        if double_sided != 0x00 && double_sided != 0x80 {
            trace!(double_sided, "CBM double-side flag out of domain");
            return None;
        }

        Some(DiskHeader {
            model,
            name: hdr.array(0x90).ok()?,
            disk_id: hdr.array(0xA2).ok()?,
            dos_type: hdr.array(0xA5).ok()?,
            double_sided: double_sided == 0x80,
        })
    }

    fn decode_1581_header(raw: &[u8]) -> Option<DiskHeader> {
        let hdr = RawHeader::new(raw);
        hdr.require(0x1B).ok()?;

        let disk_dos_version = hdr.u8(0x02).ok()?;
        let dos_type: [u8; 2] = hdr.array(0x19).ok()?;

        if disk_dos_version != 0x44 {
            trace!(disk_dos_version, "1581 disk DOS version mismatch");
            return None;
        }
        if dos_type != *b"3D" {
            trace!(?dos_type, "1581 DOS type mismatch");
            return None;
        }

        Some(DiskHeader {
            model: DriveModel::Cbm1581,
            name: hdr.array(0x04).ok()?,
            disk_id: hdr.array(0x16).ok()?,
            dos_type,
            double_sided: true,
        })
    }
}

/// Strip PETSCII 0xA0 padding (and stray NULs) from a fixed name field
fn trim_petscii(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|&b| b != 0xA0 && b != 0x00)
        .map_or(0, |i| i + 1);
    &field[..end]
}

impl Filesystem for CbmFileSystem {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn identify(&self, image: &dyn SectorImage, partition: &Partition) -> Verdict {
        Verdict::from_probe(
            self.read_header(image, partition)
                .map(|header| header.is_some()),
        )
    }

    fn info(
        &self,
        image: &dyn SectorImage,
        partition: &Partition,
        encoding: Option<TextEncoding>,
    ) -> VolumeReport {
        let header = match self.read_header(image, partition) {
            Ok(Some(h)) => h,
            _ => return VolumeReport::default(),
        };

        let encoding = encoding.unwrap_or(TextEncoding::Petscii);
        let name = encoding.decode(trim_petscii(&header.name));
        let disk_id = encoding.decode(trim_petscii(&header.disk_id));
        let dos_type = TextEncoding::Ascii.decode(&header.dos_type);

        let volume = VolumeInfo {
            fs_type: "Commodore file system".to_string(),
            clusters: partition.sector_len(),
            cluster_size: CBM_SECTOR_SIZE,
            volume_name: (!name.is_empty()).then_some(name),
            volume_serial: (!disk_id.is_empty()).then_some(disk_id),
            application_id: Some(dos_type.clone()),
            ..VolumeInfo::default()
        };

        let mut text = String::new();
        text.push_str(&format!("{}\n", header.model));
        if let Some(name) = &volume.volume_name {
            text.push_str(&format!("Disk name: {}\n", name));
        }
        if let Some(id) = &volume.volume_serial {
            text.push_str(&format!("Disk ID: {}\n", id));
        }
        text.push_str(&format!("DOS type: {}\n", dos_type));
        text.push_str(&format!(
            "{} sectors of {} bytes\n",
            volume.clusters, volume.cluster_size
        ));
        if header.double_sided {
            text.push_str("Double sided\n");
        }

        VolumeReport { text, volume }
    }
}
