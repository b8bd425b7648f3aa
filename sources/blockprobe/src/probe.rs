/*!
Finds the filesystems on a block device.

A device either has a partition table, in which case each partition is probed for a
filesystem, or it doesn't, in which case the whole device is probed. Devices that can't be
opened or read are treated as having no filesystem; that is normal for empty disks and
optical drives without media, and is not an error.
*/

use crate::device::{Device, OpenMode};
use crate::error::{self, Result};
use crate::host::Host;
use crate::superblock::Superblock;
use snafu::OptionExt;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// An open device along with the filesystem found while probing it.
#[derive(Debug)]
pub struct ProbedDevice<D> {
    device: D,
    superblock: Option<Superblock>,
    path: PathBuf,
}

impl<D: Device> ProbedDevice<D> {
    pub fn new(device: D, superblock: Option<Superblock>, path: PathBuf) -> Self {
        Self {
            device,
            superblock,
            path,
        }
    }

    /// The handle, which is open on the whole device.
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn superblock(&self) -> Option<&Superblock> {
        self.superblock.as_ref()
    }

    /// The path that was probed, which is a partition node if the filesystem was found on a
    /// partition.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn close(self) -> Result<()> {
        self.device.close()
    }
}

/// Owns probed devices until they are handed to a caller. Anything still held when the
/// collection is dropped gets closed.
#[derive(Debug)]
pub(crate) struct Handles<D: Device> {
    devices: VecDeque<ProbedDevice<D>>,
}

impl<D: Device> Handles<D> {
    pub(crate) fn new() -> Self {
        Self {
            devices: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, device: ProbedDevice<D>) {
        self.devices.push_back(device);
    }

    pub(crate) fn pop(&mut self) -> Option<ProbedDevice<D>> {
        self.devices.pop_front()
    }

    /// Hands every held device to the caller, who becomes responsible for closing them.
    pub(crate) fn release(mut self) -> Vec<ProbedDevice<D>> {
        self.devices.drain(..).collect()
    }
}

impl<D: Device> From<Vec<ProbedDevice<D>>> for Handles<D> {
    fn from(devices: Vec<ProbedDevice<D>>) -> Self {
        Self {
            devices: devices.into(),
        }
    }
}

impl<D: Device> Drop for Handles<D> {
    fn drop(&mut self) {
        for probed in self.devices.drain(..) {
            let path = probed.device().path().to_path_buf();
            if let Err(e) = probed.close() {
                warn!("{}", e);
            } else {
                debug!("released {}", path.display());
            }
        }
    }
}

/// Returns the kernel name of a device from its node path.
pub(crate) fn device_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .context(error::DeviceNameSnafu { path })
}

/// Returns the paths on `device_path` that hold a recognized filesystem, along with what was
/// found there.
pub fn probe<H: Host>(host: &H, device_path: &Path) -> Vec<(PathBuf, Superblock)> {
    let table = host
        .open(device_path, OpenMode::ReadOnly)
        .and_then(|mut device| {
            let table = device.partition_table();
            if let Err(e) = device.close() {
                debug!("{}", e);
            }
            table
        });

    // Without a partition table, a filesystem may still span the whole device.
    let table = match table {
        Ok(table) => table,
        Err(e) => {
            debug!("{}, checking whole device", e);
            return probe_path(host, device_path)
                .map(|sb| (device_path.to_path_buf(), sb))
                .into_iter()
                .collect();
        }
    };

    let mut found = Vec::new();
    let name = match device_name(device_path) {
        Ok(name) => name,
        Err(e) => {
            debug!("{}", e);
            return found;
        }
    };

    for partition in table.partitions() {
        let partition_path = match host.partition_path(name, partition.number) {
            Ok(path) => path,
            Err(e) => {
                debug!("{}, skipping remaining partitions", e);
                break;
            }
        };

        if let Some(sb) = probe_path(host, &partition_path) {
            found.push((partition_path, sb));
        }
    }

    found
}

/// Probes one path, treating errors as "no filesystem".
fn probe_path<H: Host>(host: &H, path: &Path) -> Option<Superblock> {
    match host.probe_superblock(path) {
        Ok(Some(sb)) => {
            debug!(
                "found {} filesystem '{}' on {}",
                sb.kind(),
                sb.label(),
                path.display()
            );
            Some(sb)
        }
        Ok(None) => {
            trace!("no filesystem on {}", path.display());
            None
        }
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

/// Opens `device_path` with `mode` once for every filesystem `probe` finds on it.
///
/// Each handle is on the device itself, not on the partition where the filesystem lives. Paths
/// whose device can't be opened are skipped.
pub fn probe_partitions<H: Host>(
    host: &H,
    device_path: &Path,
    mode: OpenMode,
) -> Vec<ProbedDevice<H::Device>> {
    let mut probed = Vec::new();
    for (path, superblock) in probe(host, device_path) {
        match host.open(device_path, mode) {
            Ok(device) => probed.push(ProbedDevice::new(device, Some(superblock), path)),
            Err(e) => debug!("{}, skipping {}", e, path.display()),
        }
    }
    probed
}
