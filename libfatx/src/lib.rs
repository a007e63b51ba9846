//! FATX on-disk layout toolkit.
//!
//! Plans drive geometry from a raw device capacity, serializes the fixed
//! whole-device partition table and the per-partition volume headers, and
//! parses both back for inspection. The byte layouts are bit compatible
//! with the console firmware that consumes them.

pub mod chain;
pub mod device;
pub mod geometry;
pub mod layout;
pub mod table;
pub mod volume;

#[cfg(target_os = "linux")]
pub(crate) mod ioctl;

use thiserror::Error;

pub use crate::{
    chain::{ChainWidth, build_chain_table, chain_table_len},
    device::{Device, DeviceError},
    geometry::{
        DECLARED_SLOT_ORDER, DriveLayout, DriveRole, GeometryError, MIN_DEVICE_BYTES,
        PLACEMENT_ORDER, PartitionSpec, SECTOR_SIZE, TABLE_RESERVED_BYTES, cluster_size_for,
    },
    layout::{
        PartitionReport, drive_letter, format_drive, format_memory_unit, read_drive_layout,
        write_drive_layout, write_memory_unit,
    },
    table::{
        PartitionEntry, SlotFlags, TABLE_MAGIC, TABLE_TRAILER_MAGIC, TableError,
        decode_partition_table, encode_partition_table,
    },
    volume::{
        VOLUME_MAGIC, VolumeError, VolumeInfo, VolumeParams, decode_volume_header,
        encode_volume_header,
    },
};

/// Top level error for library operations.
///
/// Each module reports through its own error enum; this aggregates them
/// for callers that drive whole read or write paths.
#[derive(Debug, Error)]
pub enum FatxError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Partition table error: {0}")]
    Table(#[from] TableError),
    #[error("Volume header error: {0}")]
    Volume(#[from] VolumeError),
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),
}
