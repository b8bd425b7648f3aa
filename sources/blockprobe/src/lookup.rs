//! Finding a single device or partition by label.
//!
//! These return `Ok(None)` when nothing matches, so callers can tell a label that doesn't exist
//! yet from a real failure. More than one matching device is an error.

use crate::device::{Device, OpenMode, Partition};
use crate::enumerate::all;
use crate::error::{self, Result};
use crate::host::Host;
use crate::probe::{device_name, Handles, ProbedDevice};
use crate::select::{with_filesystem_label, with_partition_label, with_single_result};
use snafu::OptionExt;
use std::path::{Path, PathBuf};

/// An open partition and its partition table entry.
#[derive(Debug)]
pub struct ProbedPartition<D> {
    pub partition: Partition,
    pub path: PathBuf,
    pub device: D,
}

/// Finds the device with a partition named `label`. The device is opened read-write.
pub fn find_device_by_partition_label<H: Host>(
    host: &H,
    label: &str,
) -> Result<Option<ProbedDevice<H::Device>>> {
    let found = all(
        host,
        OpenMode::default(),
        &mut [
            &mut with_partition_label(label),
            &mut with_single_result(),
        ],
    )?;
    first_match(found)
}

/// Finds the device with a filesystem labeled `label`. The device is opened read-write.
pub fn find_device_by_filesystem_label<H: Host>(
    host: &H,
    label: &str,
) -> Result<Option<ProbedDevice<H::Device>>> {
    find_by_filesystem_label(host, label, OpenMode::default())
}

/// Finds the path of the filesystem labeled `label`, without keeping anything open.
pub fn find_device_path_by_filesystem_label<H: Host>(
    host: &H,
    label: &str,
) -> Result<Option<PathBuf>> {
    match find_by_filesystem_label(host, label, OpenMode::ReadOnly)? {
        Some(probed) => {
            let path = probed.path().to_path_buf();
            probed.close()?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

fn find_by_filesystem_label<H: Host>(
    host: &H,
    label: &str,
    mode: OpenMode,
) -> Result<Option<ProbedDevice<H::Device>>> {
    let found = all(
        host,
        mode,
        &mut [
            &mut with_filesystem_label(label),
            &mut with_single_result(),
        ],
    )?;
    first_match(found)
}

/// Keeps the first handle and closes the rest, which are other probes of the same device.
fn first_match<D: Device>(found: Vec<ProbedDevice<D>>) -> Result<Option<ProbedDevice<D>>> {
    let mut found = Handles::from(found);
    let first = match found.pop() {
        Some(first) => first,
        None => return Ok(None),
    };
    while let Some(extra) = found.pop() {
        if let Err(e) = extra.close() {
            if let Err(close_err) = first.close() {
                warn!("{}", close_err);
            }
            return Err(e);
        }
    }
    Ok(Some(first))
}

/// Finds the partition named `label` on whichever device has it, and opens it.
pub fn find_partition_by_name<H: Host>(
    host: &H,
    label: &str,
) -> Result<Option<ProbedPartition<H::Device>>> {
    match find_device_by_partition_label(host, label)? {
        Some(probed) => open_and_close(host, probed.into_device(), label).map(Some),
        None => Ok(None),
    }
}

/// Opens the partition named `label` on the device at `device_path`.
pub fn open_partition_by_label<H: Host>(
    host: &H,
    device_path: &Path,
    label: &str,
) -> Result<H::Device> {
    let device = host.open(device_path, OpenMode::default())?;
    Ok(open_and_close(host, device, label)?.device)
}

/// Resolves the partition named `name` on `device` and opens it with the device's mode.
pub fn open_partition<H: Host>(
    host: &H,
    device: &mut H::Device,
    name: &str,
) -> Result<ProbedPartition<H::Device>> {
    let table = device.partition_table()?;
    let partition = table
        .find_by_name(name)
        .context(error::PartitionNotFoundSnafu {
            device: device.path(),
            name,
        })?
        .clone();
    let path = host.partition_path(device_name(device.path())?, partition.number)?;
    let handle = host.open(&path, device.mode())?;
    debug!(
        "opened partition {} '{}' at {}",
        partition.number,
        partition.name,
        path.display()
    );

    Ok(ProbedPartition {
        partition,
        path,
        device: handle,
    })
}

/// Opens the named partition, then closes `device` whether that worked or not.
fn open_and_close<H: Host>(
    host: &H,
    mut device: H::Device,
    name: &str,
) -> Result<ProbedPartition<H::Device>> {
    let opened = open_partition(host, &mut device, name);
    match (opened, device.close()) {
        (Ok(partition), Ok(())) => Ok(partition),
        (Ok(partition), Err(e)) => {
            if let Err(close_err) = partition.device.close() {
                warn!("{}", close_err);
            }
            Err(e)
        }
        (Err(e), close) => {
            if let Err(close_err) = close {
                warn!("{}", close_err);
            }
            Err(e)
        }
    }
}
