/// Integration tests for fsprobe

use fsprobe::*;
use proptest::prelude::*;

/// HP LIF volume: magic 0x8000, label "TEST", creation date set
fn lif_image() -> MemoryImage {
    let mut data = vec![0u8; 32 * 256];
    data[0..2].copy_from_slice(&0x8000u16.to_be_bytes());
    data[2..8].copy_from_slice(b"TEST  ");
    data[0x08..0x0C].copy_from_slice(&2u32.to_be_bytes());
    data[0x24..0x2A].copy_from_slice(&[0x98, 0x11, 0x05, 0x14, 0x30, 0x00]);
    MemoryImage::new(data, 256).unwrap()
}

/// Commodore 1541: 683 sectors of 256 bytes, BAM at sector 357
fn cbm_image() -> MemoryImage {
    let mut data = vec![0u8; 683 * 256];
    let bam = 357 * 256;
    data[bam] = 0x12;
    data[bam + 2] = 0x41;
    data[bam + 0x90..bam + 0xA0]
        .copy_from_slice(b"DEMOS\xA0\xA0\xA0\xA0\xA0\xA0\xA0\xA0\xA0\xA0\xA0");
    MemoryImage::new(data, 256).unwrap()
}

/// Amiga SFS: root block at sector 0
fn sfs_image(bits: u8) -> MemoryImage {
    let mut data = vec![0u8; 64 * 512];
    data[0..4].copy_from_slice(&0x5346_5300u32.to_be_bytes());
    data[0x0C..0x0E].copy_from_slice(&0x0154u16.to_be_bytes());
    data[0x10..0x14].copy_from_slice(&86_400u32.to_be_bytes());
    data[0x14] = bits;
    data[0x28..0x2C].copy_from_slice(&512u32.to_be_bytes());
    data[0x30..0x34].copy_from_slice(&64u32.to_be_bytes());
    MemoryImage::new(data, 512).unwrap()
}

/// Apple HFS: MDB at byte 1024, optionally declaring an embedded HFS+ volume
fn hfs_image(wrapper: bool) -> MemoryImage {
    let mut data = vec![0u8; 2000 * 512];
    let mdb = 1024;
    data[mdb..mdb + 2].copy_from_slice(&0x4244u16.to_be_bytes());
    data[mdb + 0x12..mdb + 0x14].copy_from_slice(&1000u16.to_be_bytes());
    data[mdb + 0x14..mdb + 0x18].copy_from_slice(&512u32.to_be_bytes());
    data[mdb + 0x1C..mdb + 0x1E].copy_from_slice(&16u16.to_be_bytes());
    data[mdb + 0x24] = 4;
    data[mdb + 0x25..mdb + 0x29].copy_from_slice(b"Mac1");

    if wrapper {
        data[mdb + 0x7C..mdb + 0x7E].copy_from_slice(&0x482Bu16.to_be_bytes());
        data[mdb + 0x7E..mdb + 0x80].copy_from_slice(&2u16.to_be_bytes());

        // Embedded volume header at 16 * 512 + 2 * 512 + 1024
        let vh = 16 * 512 + 2 * 512 + 1024;
        data[vh..vh + 2].copy_from_slice(&0x482Bu16.to_be_bytes());
        data[vh + 2..vh + 4].copy_from_slice(&4u16.to_be_bytes());
        data[vh + 0x04..vh + 0x08].copy_from_slice(&0x0100u32.to_be_bytes());
        data[vh + 0x28..vh + 0x2C].copy_from_slice(&4096u32.to_be_bytes());
        data[vh + 0x2C..vh + 0x30].copy_from_slice(&64u32.to_be_bytes());
    }

    MemoryImage::new(data, 512).unwrap()
}

#[test]
fn test_lif_scenario() {
    let image = lif_image();
    let partition = Partition::whole_image(&image, "lif");
    let lif = find_plugin("HP Logical Interchange Format").expect("LIF plugin registered");

    assert!(lif.identify(&image, &partition).matched());

    let report = lif.info(&image, &partition, None);
    assert_eq!(report.volume.cluster_size, 256);
    assert_eq!(report.volume.volume_name.as_deref(), Some("TEST"));
    let created = report.volume.created.expect("creation date decoded");
    assert_eq!(created.to_string(), "1998-11-05 14:30:00 UTC");
}

#[test]
fn test_cbm_scenario() {
    let image = cbm_image();
    let partition = Partition::whole_image(&image, "d64");
    let cbm = find_plugin("Commodore file system").expect("CBM plugin registered");

    assert!(cbm.identify(&image, &partition).matched());

    // Any other directory track byte fails identification
    for wrong in [0x00u8, 0x11, 0x13, 0xFF] {
        let mut raw = image.read_sectors(0, 683).unwrap();
        raw[357 * 256] = wrong;
        let bad = MemoryImage::new(raw, 256).unwrap();
        assert_eq!(cbm.identify(&bad, &partition), Verdict::NotMatched);
    }
}

#[test]
fn test_sfs_flag_bits_scenario() {
    let sfs = find_plugin("Smart File System").expect("SFS plugin registered");

    // The two documented flags decode the same way whatever else is set
    for unrelated in [0x00u8, 0x0F, 0x3F] {
        let image = sfs_image(0x80 | 0x40 | unrelated);
        let partition = Partition::whole_image(&image, "sfs");
        assert!(sfs.identify(&image, &partition).matched());

        let report = sfs.info(&image, &partition, None);
        assert!(report.text.contains("case sensitive"));
        assert!(report.text.contains("recycle folder"));
    }

    let image = sfs_image(0x3F & !0x40);
    let partition = Partition::whole_image(&image, "sfs");
    let report = sfs.info(&image, &partition, None);
    assert!(!report.text.contains("case sensitive"));
    assert!(!report.text.contains("recycle folder"));
}

#[test]
fn test_hfs_wrapper_disambiguation() {
    let hfs = find_plugin("Apple HFS").unwrap();
    let hfsplus = find_plugin("Apple HFS+").unwrap();

    // A wrapped volume belongs to HFS+, not HFS
    let wrapped = hfs_image(true);
    let partition = Partition::whole_image(&wrapped, "wrapped");
    assert_eq!(hfs.identify(&wrapped, &partition), Verdict::NotMatched);
    assert!(hfsplus.identify(&wrapped, &partition).matched());

    // A bare HFS volume belongs to HFS, not HFS+
    let bare = hfs_image(false);
    let partition = Partition::whole_image(&bare, "bare");
    assert!(hfs.identify(&bare, &partition).matched());
    assert_eq!(hfsplus.identify(&bare, &partition), Verdict::NotMatched);
}

#[test]
fn test_no_cross_matches_between_sample_volumes() {
    let volumes: Vec<(&str, MemoryImage)> = vec![
        ("HP Logical Interchange Format", lif_image()),
        ("Commodore file system", cbm_image()),
        ("Smart File System", sfs_image(0)),
        ("Apple HFS", hfs_image(false)),
        ("Apple HFS+", hfs_image(true)),
    ];

    for (expected, image) in &volumes {
        let partition = Partition::whole_image(image, "probe");
        for plugin in PLUGINS {
            let verdict = plugin.identify(image, &partition);
            if plugin.descriptor().name == *expected {
                assert!(verdict.matched(), "{} should match its own volume", expected);
            } else {
                assert_eq!(
                    verdict,
                    Verdict::NotMatched,
                    "{} must not match a {} volume",
                    plugin.descriptor().name,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_identify_is_deterministic() {
    let image = cbm_image();
    let partition = Partition::whole_image(&image, "d64");

    for plugin in PLUGINS {
        let first = plugin.identify(&image, &partition);
        let second = plugin.identify(&image, &partition);
        assert_eq!(first, second);
    }
}

#[test]
fn test_matched_extractions_respect_partition_size() {
    let volumes: Vec<MemoryImage> = vec![
        lif_image(),
        cbm_image(),
        sfs_image(0),
        hfs_image(false),
        hfs_image(true),
    ];

    for image in &volumes {
        let partition = Partition::whole_image(image, "probe");
        for plugin in PLUGINS {
            if !plugin.identify(image, &partition).matched() {
                continue;
            }
            let report = plugin.info(image, &partition, None);
            let declared =
                report.volume.clusters * report.volume.cluster_size as u64;
            assert!(
                declared <= partition.byte_len(image.sector_size()),
                "{} declared {} bytes in a {}-byte partition",
                plugin.descriptor().name,
                declared,
                partition.byte_len(image.sector_size())
            );
        }
    }
}

#[test]
fn test_info_without_match_is_empty() {
    let image = MemoryImage::new(vec![0u8; 64 * 512], 512).unwrap();
    let partition = Partition::whole_image(&image, "blank");

    for plugin in PLUGINS {
        assert_eq!(
            plugin.info(&image, &partition, None),
            VolumeReport::default(),
            "{} reported on a blank volume",
            plugin.descriptor().name
        );
    }
}

#[test]
fn test_out_of_bounds_partition_is_not_matched() {
    let image = cbm_image();
    let beyond = Partition::new(0, 10_000, "beyond");
    let inverted = Partition::new(500, 100, "inverted");
    let empty = Partition::new(100, 100, "empty");

    for plugin in PLUGINS {
        for partition in [&beyond, &inverted, &empty] {
            assert_eq!(plugin.identify(&image, partition), Verdict::NotMatched);
            assert_eq!(plugin.info(&image, partition, None), VolumeReport::default());
        }
    }
}

#[test]
fn test_registry_capabilities() {
    for plugin in PLUGINS {
        let descriptor = plugin.descriptor();
        assert!(!descriptor.name.is_empty());
        assert!(!descriptor.author.is_empty());
        assert_eq!(descriptor.capability, Capability::ReadOnlyIdentification);
    }
}

proptest! {
    /// No plugin panics or errors structurally on arbitrary volume content
    #[test]
    fn prop_identify_never_panics(
        sectors in 1usize..=8,
        sector_size in prop_oneof![Just(256u32), Just(512u32)],
        seed in any::<u64>(),
    ) {
        // Deterministic pseudo-random fill derived from the seed
        let mut state = seed | 1;
        let mut data = vec![0u8; sectors * sector_size as usize];
        for byte in &mut data {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            *byte = (state >> 56) as u8;
        }
        let image = MemoryImage::new(data, sector_size).unwrap();
        let partition = Partition::whole_image(&image, "fuzz");

        for plugin in PLUGINS {
            let first = plugin.identify(&image, &partition);
            // Pure predicate: same bytes, same verdict
            prop_assert_eq!(first, plugin.identify(&image, &partition));
            // In-memory reads cannot fail, so no verdict may report one
            prop_assert!(!matches!(first, Verdict::Failed(_)));
            let _ = plugin.info(&image, &partition, None);
        }
    }

    /// Raw header field reads fail cleanly at any offset
    #[test]
    fn prop_raw_header_reads_never_panic(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        offset in 0usize..128,
    ) {
        let hdr = RawHeader::new(&data);
        let _ = hdr.u8(offset);
        let _ = hdr.u16_be(offset);
        let _ = hdr.u16_le(offset);
        let _ = hdr.u32_be(offset);
        let _ = hdr.u32_le(offset);
        let _ = hdr.u64_be(offset);
        let _ = hdr.u64_le(offset);
        let _ = hdr.bytes(offset, 16);
    }
}
