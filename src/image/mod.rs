/// Sector image abstraction
///
/// A uniform, randomly-addressable view over an already-opened media
/// container. Filesystem probes consume nothing but this contract, so the
/// backing store (raw file, compressed archive, flux capture decode) is the
/// caller's concern.

/// In-memory sector image
pub mod memory;
/// Partition value type
pub mod partition;

pub use memory::MemoryImage;
pub use partition::Partition;

use crate::error::{ImageError, ImageResult};

/// Coarse classification of the media a sector image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    /// Unknown or unspecified media
    #[default]
    Unknown,
    /// Floppy disk
    FloppyDisk,
    /// Hard disk
    HardDisk,
    /// Optical disc
    OpticalDisc,
    /// Decoded flux capture
    FluxCapture,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Unknown => write!(f, "Unknown"),
            MediaType::FloppyDisk => write!(f, "Floppy disk"),
            MediaType::HardDisk => write!(f, "Hard disk"),
            MediaType::OpticalDisc => write!(f, "Optical disc"),
            MediaType::FluxCapture => write!(f, "Flux capture"),
        }
    }
}

/// Read-only, randomly-addressable view over fixed-size sectors
///
/// Implementations must return buffers of exactly the requested length or an
/// error; partial reads are never silently accepted. All methods take
/// `&self` and implementations must be safe to probe from multiple threads
/// at once, since a dispatcher may run many format probes against the same
/// image in parallel. The sector size is nonzero and fixed for the lifetime
/// of the image.
pub trait SectorImage: Send + Sync {
    /// Sector size in bytes
    fn sector_size(&self) -> u32;

    /// Total number of sectors
    fn sector_count(&self) -> u64;

    /// Media classification tag
    fn media_type(&self) -> MediaType;

    /// Read a single sector
    fn read_sector(&self, index: u64) -> ImageResult<Vec<u8>>;

    /// Read `count` consecutive sectors starting at `index`
    fn read_sectors(&self, index: u64, count: u32) -> ImageResult<Vec<u8>> {
        let end = index
            .checked_add(count as u64)
            .ok_or_else(|| ImageError::out_of_range(index, count as u64, self.sector_count()))?;
        if end > self.sector_count() {
            return Err(ImageError::out_of_range(
                index,
                count as u64,
                self.sector_count(),
            ));
        }

        let mut data = Vec::with_capacity(count as usize * self.sector_size() as usize);
        for sector in index..end {
            data.extend_from_slice(&self.read_sector(sector)?);
        }
        Ok(data)
    }
}

/// Read a byte span at a fixed offset from the start of a partition
///
/// Converts the byte range into whole-sector reads and slices the result, so
/// format headers that live at byte offsets (rather than sector boundaries)
/// decode the same way at any sector size. Spans reaching past the partition
/// end are out of range even when the image itself is larger.
pub fn read_partition_bytes(
    image: &dyn SectorImage,
    partition: &Partition,
    byte_offset: u64,
    len: usize,
) -> ImageResult<Vec<u8>> {
    let sector_size = image.sector_size() as u64;
    let first = partition.start + byte_offset / sector_size;
    let skip = (byte_offset % sector_size) as usize;
    let count = (skip as u64 + len as u64).div_ceil(sector_size);

    if first + count > partition.end {
        return Err(ImageError::out_of_range(first, count, partition.end));
    }

    let data = image.read_sectors(first, count as u32)?;
    Ok(data[skip..skip + len].to_vec())
}
