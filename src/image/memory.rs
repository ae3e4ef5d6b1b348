/// In-memory sector image
///
/// Wraps a fully-loaded byte buffer as a `SectorImage`. This is the backing
/// used by tests and by callers whose container layer already produced a
/// linear sector dump.
use crate::error::{ImageError, ImageResult};
use crate::image::{MediaType, SectorImage};

/// A `SectorImage` backed by a byte vector
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Vec<u8>,
    sector_size: u32,
    sector_count: u64,
    media_type: MediaType,
}

impl MemoryImage {
    /// Create an image over a buffer of whole sectors
    ///
    /// The buffer length must be a nonzero multiple of `sector_size`;
    /// trailing partial sectors are a container-layer defect and are
    /// rejected here rather than silently truncated.
    pub fn new(data: Vec<u8>, sector_size: u32) -> ImageResult<Self> {
        if sector_size == 0 || data.is_empty() || data.len() % sector_size as usize != 0 {
            return Err(ImageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "buffer of {} bytes is not a whole number of {}-byte sectors",
                    data.len(),
                    sector_size
                ),
            )));
        }

        let sector_count = (data.len() / sector_size as usize) as u64;
        Ok(Self {
            data,
            sector_size,
            sector_count,
            media_type: MediaType::Unknown,
        })
    }

    /// Set the media classification tag
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }
}

impl SectorImage for MemoryImage {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn read_sector(&self, index: u64) -> ImageResult<Vec<u8>> {
        if index >= self.sector_count {
            return Err(ImageError::out_of_range(index, 1, self.sector_count));
        }
        let start = index as usize * self.sector_size as usize;
        Ok(self.data[start..start + self.sector_size as usize].to_vec())
    }

    fn read_sectors(&self, index: u64, count: u32) -> ImageResult<Vec<u8>> {
        let end = index
            .checked_add(count as u64)
            .ok_or_else(|| ImageError::out_of_range(index, count as u64, self.sector_count))?;
        if end > self.sector_count {
            return Err(ImageError::out_of_range(
                index,
                count as u64,
                self.sector_count,
            ));
        }
        let start = index as usize * self.sector_size as usize;
        let stop = end as usize * self.sector_size as usize;
        Ok(self.data[start..stop].to_vec())
    }
}
