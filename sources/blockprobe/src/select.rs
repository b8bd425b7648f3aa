/*!
Criteria for choosing among probed devices.

Selectors are evaluated in order against each probed device; the first one that doesn't match
rejects the device. Any `FnMut(&H, &mut ProbedDevice<H::Device>) -> Result<bool>` can be used as
a selector alongside the ones here.
*/

use crate::device::Device;
use crate::error::{self, Result};
use crate::host::Host;
use crate::probe::ProbedDevice;
use snafu::ensure;
use std::path::PathBuf;

/// Decides whether a probed device is wanted.
pub trait Select<H: Host> {
    /// Returns whether `device` matches. An error aborts the whole search.
    fn select(&mut self, host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool>;
}

impl<H, F> Select<H> for F
where
    H: Host,
    F: FnMut(&H, &mut ProbedDevice<H::Device>) -> Result<bool>,
{
    fn select(&mut self, host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool> {
        self(host, device)
    }
}

/// Matches devices with a partition named `label`.
#[derive(Debug, Clone)]
pub struct PartitionLabel {
    label: String,
}

pub fn with_partition_label<S: Into<String>>(label: S) -> PartitionLabel {
    PartitionLabel {
        label: label.into(),
    }
}

impl<H: Host> Select<H> for PartitionLabel {
    fn select(&mut self, _host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool> {
        let table = device.device_mut().partition_table()?;
        Ok(table.find_by_name(&self.label).is_some())
    }
}

/// Matches devices with a partition of the given type GUID.
#[derive(Debug, Clone)]
pub struct PartitionType {
    type_guid: [u8; 16],
}

pub fn with_partition_type(type_guid: [u8; 16]) -> PartitionType {
    PartitionType { type_guid }
}

impl<H: Host> Select<H> for PartitionType {
    fn select(&mut self, _host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool> {
        let table = device.device_mut().partition_table()?;
        Ok(table.find_by_type(&self.type_guid).is_some())
    }
}

/// Matches devices whose filesystem is labeled `label`.
#[derive(Debug, Clone)]
pub struct FilesystemLabel {
    label: String,
}

pub fn with_filesystem_label<S: Into<String>>(label: S) -> FilesystemLabel {
    FilesystemLabel {
        label: label.into(),
    }
}

impl<H: Host> Select<H> for FilesystemLabel {
    // The filesystem is looked up again on the handle's own path rather than taken from the
    // probe result, which may describe a partition instead of the device.
    fn select(&mut self, host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool> {
        let path = device.device().path().to_path_buf();
        Ok(host
            .probe_superblock(&path)?
            .map_or(false, |sb| sb.label_matches(&self.label)))
    }
}

/// Fails the search if more than one device gets this far. Put it last.
///
/// A device can be probed more than once when several of its partitions carry filesystems;
/// every handle on the device that matched first passes.
#[derive(Debug, Clone, Default)]
pub struct SingleResult {
    device: Option<PathBuf>,
}

pub fn with_single_result() -> SingleResult {
    SingleResult::default()
}

impl<H: Host> Select<H> for SingleResult {
    fn select(&mut self, _host: &H, device: &mut ProbedDevice<H::Device>) -> Result<bool> {
        let device_path = device.device().path();
        let first = self
            .device
            .get_or_insert_with(|| device_path.to_path_buf());
        ensure!(
            first.as_path() == device_path,
            error::MultipleMatchesSnafu {
                path: device.path()
            }
        );
        Ok(true)
    }
}
