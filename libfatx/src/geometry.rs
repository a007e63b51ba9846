use thiserror::Error;

use crate::chain::{self, ChainWidth};

/// Logical sector size of a physical FATX drive.
pub const SECTOR_SIZE: u64 = 512;

/// Fixed on-device footprint of the partition table, reserved ahead of the
/// first partition.
pub const TABLE_RESERVED_BYTES: u64 = 512 * 1024;

/// Smallest device the planner will accept. Protects against formatting
/// the wrong target.
pub const MIN_DEVICE_BYTES: u64 = 7 * 1024 * 1024 * 1024;

const SWAP_BYTES: u64 = 750 * 1024 * 1024;
const SYSTEM_BYTES: u64 = 500 * 1024 * 1024;
const DATA_BYTES: u64 = 10_000_048 * SECTOR_SIZE;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("device size abnormally small ({0} bytes)")]
    DeviceTooSmall(u64),
}

/// The seven fixed partition roles of a FATX drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveRole {
    GameSwap1,
    GameSwap2,
    GameSwap3,
    System,
    Data,
    ExtendedF,
    ExtendedG,
}

/// Physical placement order. Offsets are assigned cumulatively in this
/// order, starting right after the partition table reservation.
pub const PLACEMENT_ORDER: [DriveRole; 7] = [
    DriveRole::GameSwap1,
    DriveRole::GameSwap2,
    DriveRole::GameSwap3,
    DriveRole::System,
    DriveRole::Data,
    DriveRole::ExtendedF,
    DriveRole::ExtendedG,
];

/// Slot order of the serialized partition table. Fixed, and independent
/// of the placement order above.
pub const DECLARED_SLOT_ORDER: [DriveRole; 7] = [
    DriveRole::Data,
    DriveRole::System,
    DriveRole::GameSwap1,
    DriveRole::GameSwap2,
    DriveRole::GameSwap3,
    DriveRole::ExtendedF,
    DriveRole::ExtendedG,
];

impl DriveRole {
    /// Canonical partition name, at most 16 bytes.
    pub const fn name(self) -> &'static str {
        match self {
            DriveRole::GameSwap1 => "XBOX GAME SWAP 1",
            DriveRole::GameSwap2 => "XBOX GAME SWAP 2",
            DriveRole::GameSwap3 => "XBOX GAME SWAP 3",
            DriveRole::System => "XBOX SYSTEM",
            DriveRole::Data => "XBOX DATA",
            DriveRole::ExtendedF => "XBOX F",
            DriveRole::ExtendedG => "XBOX G",
        }
    }

    /// Fixed byte size of the role, or `None` for the two trailing roles
    /// that split whatever capacity remains.
    const fn fixed_size(self) -> Option<u64> {
        match self {
            DriveRole::GameSwap1 | DriveRole::GameSwap2 | DriveRole::GameSwap3 => Some(SWAP_BYTES),
            DriveRole::System => Some(SYSTEM_BYTES),
            DriveRole::Data => Some(DATA_BYTES),
            DriveRole::ExtendedF | DriveRole::ExtendedG => None,
        }
    }
}

/// Cluster size tier for a partition of the given byte size.
///
/// The comparison is in whole GiB, so a partition sized exactly on the
/// 250 GiB or 500 GiB boundary stays in the lower tier.
pub fn cluster_size_for(partition_bytes: u64) -> u64 {
    let gib = partition_bytes / (1024 * 1024 * 1024);
    if gib > 500 {
        64 * 1024
    } else if gib > 250 {
        32 * 1024
    } else {
        16 * 1024
    }
}

/// One planned partition: role, physical byte offset and byte size.
///
/// Cluster geometry is derived, never stored, so the writer and the
/// reader cannot disagree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub role: DriveRole,
    pub offset: u64,
    pub size: u64,
}

impl PartitionSpec {
    pub fn name(&self) -> &'static str {
        self.role.name()
    }

    pub fn cluster_size(&self) -> u64 {
        cluster_size_for(self.size)
    }

    pub fn cluster_count(&self) -> u64 {
        self.size / self.cluster_size()
    }

    pub fn chain_width(&self) -> ChainWidth {
        ChainWidth::for_cluster_count(self.cluster_count())
    }

    pub fn chain_table_len(&self) -> u64 {
        chain::chain_table_len(self.cluster_count(), self.chain_width())
    }
}

/// Planner output: all seven partitions, held in placement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveLayout {
    partitions: Vec<PartitionSpec>,
}

impl DriveLayout {
    /// Plan the partition layout for a device of `capacity` bytes.
    ///
    /// The fixed roles keep their fixed sizes; F and G evenly split the
    /// capacity left after the table reservation, rounded down so both
    /// stay sector aligned and identical in size.
    pub fn plan(capacity: u64) -> Result<DriveLayout, GeometryError> {
        if capacity < MIN_DEVICE_BYTES {
            return Err(GeometryError::DeviceTooSmall(capacity));
        }

        let fixed: u64 = PLACEMENT_ORDER.iter().filter_map(|r| r.fixed_size()).sum();
        let remaining = capacity
            .checked_sub(TABLE_RESERVED_BYTES + fixed)
            .ok_or(GeometryError::DeviceTooSmall(capacity))?;

        let split = remaining / (2 * SECTOR_SIZE) * SECTOR_SIZE;
        if split < cluster_size_for(split) {
            // F and G must hold at least one cluster each.
            return Err(GeometryError::DeviceTooSmall(capacity));
        }

        log::debug!("plan - capacity {capacity}, trailing partitions get {split} bytes each");

        let mut offset = TABLE_RESERVED_BYTES;
        let mut partitions = Vec::with_capacity(PLACEMENT_ORDER.len());
        for role in PLACEMENT_ORDER {
            let size = role.fixed_size().unwrap_or(split);
            partitions.push(PartitionSpec { role, offset, size });
            offset += size;
        }

        Ok(DriveLayout { partitions })
    }

    /// Partitions in physical placement order (ascending offset).
    pub fn in_placement_order(&self) -> &[PartitionSpec] {
        &self.partitions
    }

    /// Partitions reordered to the slot order of the serialized table.
    pub fn in_declared_order(&self) -> Vec<PartitionSpec> {
        DECLARED_SLOT_ORDER
            .iter()
            .filter_map(|role| self.partitions.iter().find(|p| p.role == *role))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn rejects_small_devices() {
        assert!(matches!(
            DriveLayout::plan(MIN_DEVICE_BYTES - 1),
            Err(GeometryError::DeviceTooSmall(_))
        ));
        // Above the 7 GiB floor but below the fixed partition footprint.
        assert!(matches!(
            DriveLayout::plan(8_000_000_000),
            Err(GeometryError::DeviceTooSmall(_))
        ));
    }

    #[test]
    fn plans_120_gib_drive() {
        let capacity = 120 * GIB;
        let layout = DriveLayout::plan(capacity).unwrap();
        let parts = layout.in_placement_order();

        assert_eq!(parts.len(), 7);
        assert_eq!(parts[0].offset, TABLE_RESERVED_BYTES);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].offset + pair[0].size, pair[1].offset);
        }
        for part in parts {
            assert_eq!(part.offset % SECTOR_SIZE, 0);
            assert_eq!(part.size % SECTOR_SIZE, 0);
        }

        assert_eq!(parts[0].size, 750 * 1024 * 1024);
        assert_eq!(parts[1].size, 750 * 1024 * 1024);
        assert_eq!(parts[2].size, 750 * 1024 * 1024);
        assert_eq!(parts[3].size, 500 * 1024 * 1024);
        assert_eq!(parts[4].size, 10_000_048 * SECTOR_SIZE);
        assert_eq!(parts[5].size, parts[6].size);

        let total: u64 = parts.iter().map(|p| p.size).sum();
        assert_eq!(total + TABLE_RESERVED_BYTES, capacity);
    }

    #[test]
    fn trailing_split_is_sector_aligned_for_odd_capacities() {
        let capacity = 120 * GIB + 777;
        let layout = DriveLayout::plan(capacity).unwrap();
        let parts = layout.in_placement_order();

        assert_eq!(parts[5].size, parts[6].size);
        assert_eq!(parts[5].size % SECTOR_SIZE, 0);

        let total: u64 = parts.iter().map(|p| p.size).sum();
        assert!(capacity - (total + TABLE_RESERVED_BYTES) < 2 * SECTOR_SIZE);
    }

    #[test]
    fn offsets_match_the_known_letter_map() {
        let layout = DriveLayout::plan(10 * GIB).unwrap();
        let parts = layout.in_placement_order();

        assert_eq!(parts[0].offset, 524_288); // X
        assert_eq!(parts[1].offset, 786_956_288); // Y
        assert_eq!(parts[2].offset, 1_573_388_288); // Z
        assert_eq!(parts[3].offset, 2_359_820_288); // C
        assert_eq!(parts[4].offset, 2_884_108_288); // E
        assert_eq!(parts[5].offset, 8_004_132_864); // F
    }

    #[test]
    fn cluster_tier_boundaries_are_exclusive() {
        assert_eq!(cluster_size_for(250 * GIB), 16 * 1024);
        assert_eq!(cluster_size_for(251 * GIB), 32 * 1024);
        assert_eq!(cluster_size_for(500 * GIB), 32 * 1024);
        assert_eq!(cluster_size_for(501 * GIB), 64 * 1024);
    }

    #[test]
    fn declared_order_differs_from_placement() {
        let layout = DriveLayout::plan(10 * GIB).unwrap();
        let declared = layout.in_declared_order();

        assert_eq!(declared.len(), 7);
        assert_eq!(declared[0].role, DriveRole::Data);
        assert_eq!(declared[1].role, DriveRole::System);
        assert_eq!(declared[2].role, DriveRole::GameSwap1);
        assert_eq!(declared[6].role, DriveRole::ExtendedG);
    }
}
