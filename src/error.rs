use thiserror::Error;

/// Result type alias for sector image operations
pub type ImageResult<T> = std::result::Result<T, ImageError>;

/// Result type alias for binary structure decoding
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Coarse error classification surfaced by probe verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested sector range exceeds the image bounds
    OutOfRange,
    /// Underlying read failed
    Io,
}

/// Errors that can occur when reading sectors from an image
#[derive(Debug, Error)]
pub enum ImageError {
    /// Requested sector range exceeds the declared sector count
    #[error("Sector range out of bounds: {start}+{count} exceeds {total} sectors")]
    OutOfRange {
        /// First requested sector
        start: u64,
        /// Number of sectors requested
        count: u64,
        /// Declared sector count of the image
        total: u64,
    },

    /// Underlying read failed (corrupted or truncated container)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Create an out-of-range error
    pub fn out_of_range(start: u64, count: u64, total: u64) -> Self {
        ImageError::OutOfRange {
            start,
            count,
            total,
        }
    }

    /// Classify this error for probe verdicts
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageError::OutOfRange { .. } => ErrorKind::OutOfRange,
            ImageError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Errors that can occur when decoding a fixed-layout structure
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Input buffer is shorter than the structure requires
    #[error("Truncated structure: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to decode the field or structure
        needed: usize,
        /// Bytes actually available
        available: usize,
    },
}

impl DecodeError {
    /// Create a truncation error
    pub fn truncated(needed: usize, available: usize) -> Self {
        DecodeError::Truncated { needed, available }
    }
}
