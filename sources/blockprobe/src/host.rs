//! The services the probing engine needs from the system it runs on.

use crate::device::{Device, LinuxDevice, OpenMode};
use crate::error::{self, Result};
use crate::superblock::{self, Superblock};
use block_party::{partition_node_name, BlockDevices};
use snafu::ResultExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Access to the block devices of a system.
pub trait Host {
    type Device: Device;

    /// Names of every block device, in enumeration order.
    fn block_devices(&self) -> Result<Vec<String>>;

    /// Device node path for a block device name.
    fn device_path(&self, name: &str) -> PathBuf;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Self::Device>;

    /// Looks for a filesystem at `path`. `Ok(None)` means nothing was recognized.
    fn probe_superblock(&self, path: &Path) -> Result<Option<Superblock>>;

    /// Device node path of partition `number` on the disk named `device_name`.
    fn partition_path(&self, device_name: &str, number: u32) -> Result<PathBuf>;
}

/// The running Linux system, seen through `/sys/block` and `/dev`.
#[derive(Debug, Clone, Default)]
pub struct LinuxHost {
    devices: BlockDevices,
}

impl LinuxHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks for block devices in `sys_block` and their nodes in `dev`.
    pub fn with_roots<P1, P2>(sys_block: P1, dev: P2) -> Self
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
    {
        Self {
            devices: BlockDevices::with_roots(sys_block, dev),
        }
    }
}

impl Host for LinuxHost {
    type Device = LinuxDevice;

    fn block_devices(&self) -> Result<Vec<String>> {
        Ok(self
            .devices
            .list()
            .context(error::ListBlockDevicesSnafu)?
            .iter()
            .map(|device| device.to_string())
            .collect())
    }

    fn device_path(&self, name: &str) -> PathBuf {
        self.devices.device(name).path()
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<LinuxDevice> {
        LinuxDevice::open(path, mode)
    }

    fn probe_superblock(&self, path: &Path) -> Result<Option<Superblock>> {
        let mut f = File::open(path).context(error::DeviceOpenSnafu {
            path,
            mode: OpenMode::ReadOnly,
        })?;
        superblock::probe(&mut f).context(error::ProbeSuperblockSnafu { path })
    }

    fn partition_path(&self, device_name: &str, number: u32) -> Result<PathBuf> {
        let name = partition_node_name(device_name, number).context(error::PartitionPathSnafu {
            device: device_name,
            number,
        })?;
        Ok(self.devices.dev().join(name))
    }
}
