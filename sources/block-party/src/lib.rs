//! block-party is a library for finding Linux block devices and their partition nodes.
//!
//! It supports:
//!
//! * Listing the block devices the kernel knows about, through `/sys/block`
//! * Getting the `/dev` node of a block device
//! * Getting the `/dev` node of a numbered partition on a disk

#![deny(missing_docs)]

#[macro_use]
extern crate log;

use snafu::{ensure, OptionExt, ResultExt};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

mod error {
    use snafu::Snafu;
    use std::ffi::OsString;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    /// The error type for this library.
    pub enum Error {
        #[snafu(display("Unable to list directory {}: {} ", path.display(), source))]
        /// Unable to list a given directory.
        ListDirectory {
            /// Contains the directory we failed to list.
            path: PathBuf,
            /// The source error describing the list failure.
            source: io::Error,
        },

        #[snafu(display("Unable to read directory entry in {}: {} ", path.display(), source))]
        /// Unable to read a listed directory entry.
        ReadDirectoryEntry {
            /// Contains the directory with an entry we failed to read.
            path: PathBuf,
            /// The source error describing the read failure.
            source: io::Error,
        },

        #[snafu(display("Device name {:?} is not valid UTF-8", name))]
        /// A device name in the listing can't be used to build a partition path.
        DeviceName {
            /// The name as it was listed.
            name: OsString,
        },

        #[snafu(display("Could not determine partition {} path for device '{}'", number, device))]
        /// The device naming scheme is unknown, or the partition number is invalid.
        PartitionScheme {
            /// The disk name, e.g. `sda`.
            device: String,
            /// The requested partition number.
            number: u32,
        },
    }
}
pub use error::Error;
/// Convenience alias pointing to our Error type.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Where the kernel lists block devices.
pub const SYS_BLOCK: &str = "/sys/block";

/// Where device nodes live.
pub const DEV: &str = "/dev";

// Disks whose names end in a digit get a `p` before the partition number.
const SEPARATED_PREFIXES: &[&str] = &["nvme", "mmcblk", "loop", "nbd", "md"];
const DIRECT_PREFIXES: &[&str] = &["sd", "hd", "vd", "xvd"];

/// Returns the partition node name for partition `number` of disk `device_name`, e.g.
/// `sda` + 2 = `sda2` and `nvme0n1` + 2 = `nvme0n1p2`.
pub fn partition_node_name(device_name: &str, number: u32) -> Result<String> {
    ensure!(
        number > 0,
        error::PartitionSchemeSnafu {
            device: device_name,
            number
        }
    );

    if SEPARATED_PREFIXES
        .iter()
        .any(|prefix| device_name.starts_with(prefix))
    {
        Ok(format!("{}p{}", device_name, number))
    } else if DIRECT_PREFIXES
        .iter()
        .any(|prefix| device_name.starts_with(prefix))
    {
        Ok(format!("{}{}", device_name, number))
    } else {
        error::PartitionSchemeSnafu {
            device: device_name,
            number,
        }
        .fail()
    }
}

/// The places to look for block devices.
#[derive(Debug, Clone)]
pub struct BlockDevices {
    sys_block: PathBuf,
    dev: PathBuf,
}

impl Default for BlockDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevices {
    /// Uses the standard `/sys/block` and `/dev` locations.
    pub fn new() -> Self {
        Self::with_roots(SYS_BLOCK, DEV)
    }

    /// Uses alternate locations for the block device listing and the device nodes.
    pub fn with_roots<P1, P2>(sys_block: P1, dev: P2) -> Self
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
    {
        Self {
            sys_block: sys_block.into(),
            dev: dev.into(),
        }
    }

    /// Returns the directory block devices are listed in.
    pub fn sys_block(&self) -> &Path {
        &self.sys_block
    }

    /// Returns the directory device nodes are created in.
    pub fn dev(&self) -> &Path {
        &self.dev
    }

    /// Lists every block device in the sysfs listing, sorted by name.
    pub fn list(&self) -> Result<Vec<BlockDevice>> {
        let path = &self.sys_block;
        let mut devices = Vec::new();
        for entry in fs::read_dir(path).context(error::ListDirectorySnafu { path })? {
            let entry = entry.context(error::ReadDirectoryEntrySnafu { path })?;
            devices.push(self.device(entry.file_name()));
        }
        devices.sort_by(|a, b| a.device_name.cmp(&b.device_name));
        trace!("found {} block devices in {}", devices.len(), path.display());
        Ok(devices)
    }

    /// Returns the block device with the given kernel name, without checking it exists.
    pub fn device<S: Into<OsString>>(&self, device_name: S) -> BlockDevice {
        BlockDevice {
            device_name: device_name.into(),
            dev: self.dev.clone(),
        }
    }
}

/// A Linux block device, known by its kernel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    device_name: OsString,
    dev: PathBuf,
}

impl BlockDevice {
    /// Returns the kernel name of the device, e.g. `sda`.
    pub fn name(&self) -> &OsString {
        &self.device_name
    }

    /// Returns the path in `/dev` to the block device.
    pub fn path(&self) -> PathBuf {
        self.dev.join(&self.device_name)
    }

    /// Returns the path in `/dev` to partition `number` of this disk.
    ///
    /// This only builds the path; the node may not exist.
    pub fn partition_path(&self, number: u32) -> Result<PathBuf> {
        let name = self.device_name.to_str().context(error::DeviceNameSnafu {
            name: &self.device_name,
        })?;
        Ok(self.dev.join(partition_node_name(name, number)?))
    }
}

impl fmt::Display for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.device_name.to_string_lossy().fmt(f)
    }
}
