use thiserror::Error;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, Unaligned,
    byteorder::{LittleEndian, U16, U32},
};

use crate::{
    chain::{self, ChainWidth},
    geometry::{PartitionSpec, SECTOR_SIZE},
};

/// Magic tag opening every FATX volume header.
pub const VOLUME_MAGIC: &[u8; 4] = b"FATX";

/// Sector size of memory unit images.
pub const MEMORY_UNIT_SECTOR_SIZE: u64 = 4096;

/// Cluster size of memory unit images.
pub const MEMORY_UNIT_CLUSTER_SIZE: u64 = 16 * 1024;

/// The root directory starts out as this single cluster.
pub const ROOT_DIR_CLUSTER: u16 = 1;

/// Fill byte marking a directory entry slot as unused.
pub const DIR_ENTRY_FREE: u8 = 0xff;

/// Bytes of 0xFF between the fixed fields and the chain table.
pub const RESERVED_REGION_LEN: usize = 0xfee;

/// Prefix bytes needed to identify a volume and recover its geometry.
pub const VOLUME_PROBE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("volume header magic not found")]
    UnknownVolume,
    #[error("volume header truncated")]
    Truncated,
}

/// On-disk fixed fields of a volume header.
///
///   0 | magic "FATX"
///   4 | creation time, seconds since epoch
///   8 | sectors per cluster
///  12 | first cluster of the root directory
///  14 | volume flags
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable)]
pub struct VolumeHeaderRaw {
    pub magic: [u8; 4],
    pub created: U32<LittleEndian>,
    pub sectors_per_cluster: U32<LittleEndian>,
    pub root_cluster: U16<LittleEndian>,
    pub flags: U32<LittleEndian>,
}

/// The identifying prefix of [`VolumeHeaderRaw`], as much as a reader
/// needs to recover cluster geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Unaligned, Immutable)]
struct VolumeProbeRaw {
    magic: [u8; 4],
    created: U32<LittleEndian>,
    sectors_per_cluster: U32<LittleEndian>,
}

/// Geometry of a single FATX volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeParams {
    pub sector_size: u64,
    pub cluster_size: u64,
    pub cluster_count: u64,
}

impl VolumeParams {
    /// Volume geometry of a planned drive partition.
    pub fn from_partition(spec: &PartitionSpec) -> VolumeParams {
        VolumeParams {
            sector_size: SECTOR_SIZE,
            cluster_size: spec.cluster_size(),
            cluster_count: spec.cluster_count(),
        }
    }

    /// Volume geometry of a standalone memory unit image.
    pub fn for_memory_unit(total_bytes: u64) -> VolumeParams {
        VolumeParams {
            sector_size: MEMORY_UNIT_SECTOR_SIZE,
            cluster_size: MEMORY_UNIT_CLUSTER_SIZE,
            cluster_count: total_bytes / MEMORY_UNIT_CLUSTER_SIZE,
        }
    }

    pub fn chain_width(&self) -> ChainWidth {
        ChainWidth::for_cluster_count(self.cluster_count)
    }

    pub fn chain_table_len(&self) -> u64 {
        chain::chain_table_len(self.cluster_count, self.chain_width())
    }

    /// Total serialized header length: fixed fields, reserved region,
    /// chain table and the bootstrap root directory cluster.
    pub fn header_len(&self) -> u64 {
        (size_of::<VolumeHeaderRaw>() + RESERVED_REGION_LEN) as u64
            + self.chain_table_len()
            + self.cluster_size
    }
}

/// Serialize a complete volume header.
///
/// The root directory cluster is filled with [`DIR_ENTRY_FREE`]: an all
/// 0xFF entry is this format's "no directory entry" sentinel, so the
/// fresh root directory reads back as empty.
pub fn encode_volume_header(params: &VolumeParams, created: u32) -> Vec<u8> {
    let raw = VolumeHeaderRaw {
        magic: *VOLUME_MAGIC,
        created: U32::new(created),
        sectors_per_cluster: U32::new((params.cluster_size / params.sector_size) as u32),
        root_cluster: U16::new(ROOT_DIR_CLUSTER),
        flags: U32::new(0),
    };

    let mut out = Vec::with_capacity(params.header_len() as usize);
    out.extend_from_slice(raw.as_bytes());
    out.extend_from_slice(&[DIR_ENTRY_FREE; RESERVED_REGION_LEN]);
    out.extend_from_slice(&chain::build_chain_table(
        params.cluster_count,
        params.chain_width(),
    ));
    out.resize(out.len() + params.cluster_size as usize, DIR_ENTRY_FREE);
    out
}

/// Identification data recovered from a volume header prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    pub created: u32,
    pub cluster_size: u64,
}

/// Decode the identifying prefix of a volume header.
///
/// `sector_size` is the sector size of the containing store; cluster
/// size is kept on disk in sectors.
pub fn decode_volume_header(buf: &[u8], sector_size: u64) -> Result<VolumeInfo, VolumeError> {
    let prefix = buf.get(..VOLUME_PROBE_LEN).ok_or(VolumeError::Truncated)?;
    let raw = VolumeProbeRaw::read_from_bytes(prefix).map_err(|_| VolumeError::Truncated)?;

    if raw.magic != *VOLUME_MAGIC {
        return Err(VolumeError::UnknownVolume);
    }

    Ok(VolumeInfo {
        created: raw.created.get(),
        cluster_size: u64::from(raw.sectors_per_cluster.get()) * sector_size,
    })
}
