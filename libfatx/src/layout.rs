use std::{
    io::{Read, Seek, SeekFrom, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    FatxError,
    device::Device,
    geometry::{DriveLayout, GeometryError, SECTOR_SIZE, TABLE_RESERVED_BYTES},
    table::{self, PartitionEntry},
    volume::{self, VOLUME_PROBE_LEN, VolumeParams},
};

/// Conventional drive letters of the well known partition offsets.
const KNOWN_OFFSETS: &[(u64, &str)] = &[
    (524_288, "X"),
    (786_956_288, "Y"),
    (1_573_388_288, "Z"),
    (2_359_820_288, "C"),
    (2_884_108_288, "E"),
    (8_004_132_864, "F"),
];

/// Letter label of the partition at `offset`.
pub fn drive_letter(offset: u64) -> &'static str {
    KNOWN_OFFSETS
        .iter()
        .find(|(known, _)| *known == offset)
        .map(|(_, letter)| *letter)
        .unwrap_or("G / other")
}

/// One row of a device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub name: String,
    pub letter: &'static str,
    pub offset: u64,
    pub size: u64,
    /// `None` when the partition start did not carry a volume magic.
    pub cluster_size: Option<u64>,
}

impl PartitionReport {
    pub fn size_mib(&self) -> u64 {
        self.size / (1024 * 1024)
    }
}

fn unix_timestamp() -> u32 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as u32,
        Err(_) => 0,
    }
}

/// Write a complete FATX drive layout to `sink`.
///
/// The partition table goes first, then each volume header at its
/// partition offset, then a single zero byte at `capacity - 1` so file
/// backed stores materialize their full declared length. The sequence is
/// not transactional: a failure partway through leaves a valid table
/// pointing at partially initialized partitions.
pub fn write_drive_layout<W: Write + Seek>(
    sink: &mut W,
    capacity: u64,
    created: u32,
) -> Result<DriveLayout, FatxError> {
    let layout = DriveLayout::plan(capacity)?;

    let table = table::encode_partition_table(&layout.in_declared_order())?;
    sink.seek(SeekFrom::Start(0))?;
    sink.write_all(&table)?;

    for spec in layout.in_placement_order() {
        log::debug!(
            "write_drive_layout - {} at {:#x}, {} bytes",
            spec.name(),
            spec.offset,
            spec.size
        );
        let header = volume::encode_volume_header(&VolumeParams::from_partition(spec), created);
        sink.seek(SeekFrom::Start(spec.offset))?;
        sink.write_all(&header)?;
    }

    sink.seek(SeekFrom::Start(capacity - 1))?;
    sink.write_all(&[0])?;
    sink.flush()?;

    Ok(layout)
}

/// Plan and format an open device, stamping the current time.
pub fn format_drive(dev: &mut Device) -> Result<DriveLayout, FatxError> {
    let capacity = dev.size();
    write_drive_layout(dev, capacity, unix_timestamp())
}

/// Write a standalone single volume memory unit image of `total_bytes`.
///
/// No outer partition table; the volume header sits at offset 0 and the
/// remainder is zero filled in cluster sized writes.
pub fn write_memory_unit<W: Write>(
    sink: &mut W,
    total_bytes: u64,
    created: u32,
) -> Result<VolumeParams, FatxError> {
    let params = VolumeParams::for_memory_unit(total_bytes);
    let header_len = params.header_len();
    if total_bytes < header_len {
        return Err(GeometryError::DeviceTooSmall(total_bytes).into());
    }

    let header = volume::encode_volume_header(&params, created);
    sink.write_all(&header)?;

    let zeros = vec![0u8; params.cluster_size as usize];
    let mut remaining = total_bytes - header_len;
    while remaining > params.cluster_size {
        sink.write_all(&zeros)?;
        remaining -= params.cluster_size;
    }
    sink.write_all(&zeros[..remaining as usize])?;
    sink.flush()?;

    Ok(params)
}

/// [`write_memory_unit`] stamped with the current time.
pub fn format_memory_unit<W: Write>(
    sink: &mut W,
    total_bytes: u64,
) -> Result<VolumeParams, FatxError> {
    write_memory_unit(sink, total_bytes, unix_timestamp())
}

/// Parse a formatted device and report every named partition, sorted by
/// physical offset.
///
/// A missing volume magic at a partition start is reported in that row
/// rather than failing the whole listing; well formed slots still show.
pub fn read_drive_layout<R: Read + Seek>(source: &mut R) -> Result<Vec<PartitionReport>, FatxError> {
    let mut header = vec![0u8; TABLE_RESERVED_BYTES as usize];
    source.seek(SeekFrom::Start(0))?;
    source.read_exact(&mut header)?;

    let entries = table::decode_partition_table(&header)?;

    let mut reports = Vec::with_capacity(entries.len());
    for PartitionEntry { name, offset, size } in entries {
        let mut prefix = [0u8; VOLUME_PROBE_LEN];
        source.seek(SeekFrom::Start(offset))?;

        let cluster_size = match source.read_exact(&mut prefix) {
            Ok(()) => match volume::decode_volume_header(&prefix, SECTOR_SIZE) {
                Ok(info) => Some(info.cluster_size),
                Err(e) => {
                    log::debug!("read_drive_layout - {name}: {e}");
                    None
                }
            },
            Err(e) => {
                log::debug!("read_drive_layout - {name}: {e}");
                None
            }
        };

        reports.push(PartitionReport {
            letter: drive_letter(offset),
            name,
            offset,
            size,
            cluster_size,
        });
    }

    reports.sort_by_key(|r| r.offset);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DriveRole, PartitionSpec};
    use std::io::Cursor;

    #[test]
    fn memory_unit_image_round_trip() {
        let total = 16 * 1024 * 1024u64;
        let mut image = Vec::new();
        let params = write_memory_unit(&mut image, total, 42).unwrap();

        assert_eq!(image.len() as u64, total);
        assert_eq!(&image[..4], b"FATX");
        assert!(
            image[params.header_len() as usize..]
                .iter()
                .all(|b| *b == 0)
        );

        let info = volume::decode_volume_header(&image, params.sector_size).unwrap();
        assert_eq!(info.created, 42);
        assert_eq!(info.cluster_size, 16 * 1024);
    }

    #[test]
    fn memory_unit_must_fit_its_header() {
        let mut image = Vec::new();
        assert!(write_memory_unit(&mut image, 1024, 0).is_err());
        assert!(image.is_empty());
    }

    #[test]
    fn lists_partitions_and_flags_bad_volumes() {
        let specs = [
            PartitionSpec {
                role: DriveRole::System,
                offset: 0x10_0000,
                size: 0x8000,
            },
            PartitionSpec {
                role: DriveRole::Data,
                offset: 0x20_0000,
                size: 0x1_0000,
            },
        ];
        let table = table::encode_partition_table(&specs).unwrap();

        let mut image = vec![0u8; 0x21_0000];
        image[..table.len()].copy_from_slice(&table);

        // Only the first partition gets a real volume header.
        let params = VolumeParams {
            sector_size: SECTOR_SIZE,
            cluster_size: 16 * 1024,
            cluster_count: 2,
        };
        let header = volume::encode_volume_header(&params, 7);
        image[0x10_0000..0x10_0000 + header.len()].copy_from_slice(&header);

        let mut cursor = Cursor::new(image);
        let reports = read_drive_layout(&mut cursor).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "XBOX SYSTEM");
        assert_eq!(reports[0].cluster_size, Some(16 * 1024));
        assert_eq!(reports[0].letter, "G / other");
        assert_eq!(reports[1].name, "XBOX DATA");
        assert_eq!(reports[1].cluster_size, None);
    }

    #[test]
    fn listing_requires_the_table_signature() {
        let mut cursor = Cursor::new(vec![0u8; TABLE_RESERVED_BYTES as usize]);
        assert!(matches!(
            read_drive_layout(&mut cursor),
            Err(FatxError::Table(_))
        ));
    }

    #[test]
    fn letter_map() {
        assert_eq!(drive_letter(524_288), "X");
        assert_eq!(drive_letter(2_884_108_288), "E");
        assert_eq!(drive_letter(8_004_132_864), "F");
        assert_eq!(drive_letter(12_345), "G / other");
    }
}
