use std::{
    fs::{File, OpenOptions},
    io::{Error as IoError, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use rustix::fs::{FileType, fstat};
use rustix::fd::AsFd;
use thiserror::Error;

#[cfg(target_os = "linux")]
use crate::ioctl::ioctl_blkgetsize64;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("I/O operation failed: {0}")]
    Io(#[from] IoError),
    #[error("device capacity query failed: {0}")]
    CapacityQuery(rustix::io::Errno),
}

/// An open target device or image file.
///
/// Capacity is resolved once at open time: block devices are asked via
/// the kernel, regular files report their current length. The type
/// implements [`Read`], [`Write`] and [`Seek`] so the layout routines
/// stay generic over their backing store.
#[derive(Debug)]
pub struct Device {
    file: File,
    path: PathBuf,
    size: u64,
    block_device: bool,
}

impl Device {
    /// Open for inspection only.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> Result<Device, DeviceError> {
        let file = File::open(path.as_ref())?;
        Device::with_file(file, path.as_ref())
    }

    /// Open for formatting. The target is not truncated; layouts are
    /// written in place at fixed offsets.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Device, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        Device::with_file(file, path.as_ref())
    }

    fn with_file(file: File, path: &Path) -> Result<Device, DeviceError> {
        let stat = fstat(file.as_fd()).map_err(DeviceError::CapacityQuery)?;
        let block_device = FileType::from_raw_mode(stat.st_mode).is_block_device();

        let size = if block_device {
            block_device_size(&file)?
        } else {
            stat.st_size as u64
        };

        log::debug!(
            "Device::with_file - {:?}, {size} bytes, block device: {block_device}",
            path
        );

        Ok(Device {
            file,
            path: path.to_path_buf(),
            size,
            block_device,
        })
    }

    /// Total size in bytes of the device or image.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path the device was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns if the target is a block device rather than a file.
    #[inline]
    pub fn is_block_device(&self) -> bool {
        self.block_device
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        self.file.read(buf)
    }
}

impl Write for Device {
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.file.flush()
    }
}

impl Seek for Device {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        self.file.seek(pos)
    }
}

#[cfg(target_os = "linux")]
fn block_device_size(file: &File) -> Result<u64, DeviceError> {
    ioctl_blkgetsize64(file.as_fd()).map_err(DeviceError::CapacityQuery)
}

#[cfg(not(target_os = "linux"))]
fn block_device_size(file: &File) -> Result<u64, DeviceError> {
    let mut clone = file.try_clone()?;
    Ok(clone.seek(SeekFrom::End(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn regular_files_report_their_length() {
        let path = std::env::temp_dir().join(format!("fatx-dev-{}.img", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 4096]).unwrap();
        drop(file);

        let dev = Device::open_ro(&path).unwrap();
        assert_eq!(dev.size(), 4096);
        assert!(!dev.is_block_device());
        assert_eq!(dev.path(), path);

        std::fs::remove_file(&path).unwrap();
    }
}
