use bitflags::bitflags;
use thiserror::Error;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, Unaligned,
    byteorder::{LittleEndian, U32},
};

use crate::geometry::{PartitionSpec, SECTOR_SIZE, TABLE_RESERVED_BYTES};

/// Signature opening the partition table.
pub const TABLE_MAGIC: &[u8; 16] = b"****PARTINFO****";

/// Reserved zero bytes between the signature and the first slot.
pub const TABLE_RESERVED_GAP: usize = 32;

/// Secondary signature written at [`TABLE_TRAILER_OFFSET`].
pub const TABLE_TRAILER_MAGIC: &[u8; 4] = b"BRFR";

/// Fixed offset of the trailer signature inside the table.
pub const TABLE_TRAILER_OFFSET: usize = 0x600;

/// Number of slots in the table, populated or not.
pub const TABLE_SLOTS: usize = 14;

const SLOT_NAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("partition table signature not found")]
    NotAFatxTable,
    #[error("partition table truncated")]
    Truncated,
    #[error("partition {0} does not fit the 32 bit sector fields")]
    EntryOutOfRange(&'static str),
}

bitflags! {
    /// Flags word of a table slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u32 {
        const IN_USE = 0x8000_0000;
    }
}

/// On-disk table slot.
///
///   0 | name, space padded
///  16 | flags
///  20 | start, in sectors
///  24 | size, in sectors
///  28 | reserved
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable)]
pub struct TableSlotRaw {
    pub name: [u8; SLOT_NAME_LEN],
    pub flags: U32<LittleEndian>,
    pub start_sector: U32<LittleEndian>,
    pub sector_count: U32<LittleEndian>,
    pub reserved: U32<LittleEndian>,
}

const SLOT_LEN: usize = size_of::<TableSlotRaw>();

/// A named region decoded from the table, offset and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

fn slot_name(name: &str) -> [u8; SLOT_NAME_LEN] {
    let mut out = [b' '; SLOT_NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(SLOT_NAME_LEN);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

fn decode_slot_name(raw: &[u8; SLOT_NAME_LEN]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

/// Serialize the whole device partition table.
///
/// `slots` must already be in declared slot order; the remaining slots
/// are left blank. The result is always the full 512 KiB reservation.
pub fn encode_partition_table(slots: &[PartitionSpec]) -> Result<Vec<u8>, TableError> {
    let mut out = Vec::with_capacity(TABLE_RESERVED_BYTES as usize);
    out.extend_from_slice(TABLE_MAGIC);
    out.extend_from_slice(&[0u8; TABLE_RESERVED_GAP]);

    for spec in slots {
        let start_sector = u32::try_from(spec.offset / SECTOR_SIZE)
            .map_err(|_| TableError::EntryOutOfRange(spec.name()))?;
        let sector_count = u32::try_from(spec.size / SECTOR_SIZE)
            .map_err(|_| TableError::EntryOutOfRange(spec.name()))?;

        let slot = TableSlotRaw {
            name: slot_name(spec.name()),
            flags: U32::new(SlotFlags::IN_USE.bits()),
            start_sector: U32::new(start_sector),
            sector_count: U32::new(sector_count),
            reserved: U32::new(0),
        };
        out.extend_from_slice(slot.as_bytes());
    }

    for _ in slots.len()..TABLE_SLOTS {
        out.extend_from_slice(&[b' '; SLOT_NAME_LEN]);
        out.extend_from_slice(&[0u8; SLOT_LEN - SLOT_NAME_LEN]);
    }

    out.resize(TABLE_TRAILER_OFFSET, 0);
    out.extend_from_slice(TABLE_TRAILER_MAGIC);
    out.resize(TABLE_RESERVED_BYTES as usize, 0);
    Ok(out)
}

/// Decode a partition table read from the start of a device.
///
/// Returns the populated slots in table order; readers interested in
/// physical order sort by offset afterwards.
pub fn decode_partition_table(buf: &[u8]) -> Result<Vec<PartitionEntry>, TableError> {
    let intro_len = TABLE_MAGIC.len() + TABLE_RESERVED_GAP;
    let intro = buf.get(..intro_len).ok_or(TableError::Truncated)?;

    if &intro[..TABLE_MAGIC.len()] != TABLE_MAGIC
        || intro[TABLE_MAGIC.len()..].iter().any(|b| *b != 0)
    {
        return Err(TableError::NotAFatxTable);
    }

    let mut entries = Vec::new();
    for slot_no in 0..TABLE_SLOTS {
        let start = intro_len + slot_no * SLOT_LEN;
        let raw = TableSlotRaw::read_from_bytes(
            buf.get(start..start + SLOT_LEN).ok_or(TableError::Truncated)?,
        )
        .map_err(|_| TableError::Truncated)?;

        let name = decode_slot_name(&raw.name);
        if name.is_empty() {
            continue;
        }

        entries.push(PartitionEntry {
            name,
            offset: u64::from(raw.start_sector.get()) * SECTOR_SIZE,
            size: u64::from(raw.sector_count.get()) * SECTOR_SIZE,
        });
    }

    Ok(entries)
}
