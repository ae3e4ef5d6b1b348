/*!
# fsprobe

A Rust library for identifying and inspecting legacy filesystems inside
sector-addressable disk images.

## Features

- Uniform sector-image abstraction over already-opened media containers
- Fixed-layout, endian-aware binary structure decoding
- Pure, fail-open format identification probes safe to run speculatively
- Canonical volume metadata extraction with human-readable reports
- Plugins for HP LIF, Commodore 1541/1571/1581, Amiga OFS/FFS, Amiga SFS,
  Apple HFS and Apple HFS+/HFSX

## Quick Start

```rust
use fsprobe::{MemoryImage, Partition, PLUGINS};

// Wrap an already-loaded sector dump
let image = MemoryImage::new(vec![0u8; 683 * 256], 256)?;
let partition = Partition::whole_image(&image, "whole disk");

// Probe every registered format
for plugin in PLUGINS {
    if plugin.identify(&image, &partition).matched() {
        let report = plugin.info(&image, &partition, None);
        println!("{}", report.text);
    }
}
# Ok::<(), fsprobe::ImageError>(())
```

## Contract

Identification is a pure predicate: probes never panic and never propagate
errors, whatever the input bytes. Structural mismatches are the expected
outcome of probing the wrong format and read failures are reported in the
verdict, so an external dispatcher can probe every plugin against every
partition, in any order or in parallel.

## Modules

- `image`: sector image abstraction, in-memory image, partitions
- `decode`: fixed-offset endian-aware structure decoding
- `filesystem`: the plugin contract and the per-format implementations
- `encoding`: text encodings for embedded labels
- `time`: format-native epoch conversions
- `error`: error types and result aliases
*/

#![warn(missing_docs)]

/// Fixed-layout binary structure decoding
pub mod decode;
/// Text encodings for embedded volume labels
pub mod encoding;
/// Error types and Result aliases
pub mod error;
/// Filesystem identification and inspection plugins
pub mod filesystem;
/// Sector image abstraction and partitions
pub mod image;
/// Format-native epoch conversions
pub mod time;

// Re-export common types
pub use decode::RawHeader;
pub use encoding::TextEncoding;
pub use error::{DecodeError, ErrorKind, ImageError, ImageResult};
pub use filesystem::{
    find_plugin, AmigaFileSystem, Capability, CbmFileSystem, Filesystem, FormatDescriptor,
    HfsFileSystem, HfsPlusFileSystem, LifFileSystem, SmartFileSystem, Verdict, VolumeInfo,
    VolumeReport, PLUGINS,
};
pub use image::{MediaType, MemoryImage, Partition, SectorImage};
