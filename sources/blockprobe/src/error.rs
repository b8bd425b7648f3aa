use crate::device::OpenMode;
use snafu::Snafu;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to list block devices: {}", source))]
    ListBlockDevices { source: block_party::Error },

    #[snafu(display("Failed to open '{}' {}: {}", path.display(), mode, source))]
    DeviceOpen {
        path: PathBuf,
        mode: OpenMode,
        source: io::Error,
    },

    #[snafu(display("Failed to close '{}': {}", path.display(), source))]
    DeviceClose { path: PathBuf, source: nix::Error },

    #[snafu(display("Unable to get device name from '{}'", path.display()))]
    DeviceName { path: PathBuf },

    #[snafu(display("Failed to read partition table from '{}': {}", path.display(), source))]
    ReadPartitionTable { path: PathBuf, source: GPTError },

    #[snafu(display("Failed to probe '{}' for a filesystem: {}", path.display(), source))]
    ProbeSuperblock { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to find path of partition {} on '{}': {}", number, device, source))]
    PartitionPath {
        device: String,
        number: u32,
        source: block_party::Error,
    },

    #[snafu(display("No partition named '{}' on '{}'", name, device.display()))]
    PartitionNotFound { device: PathBuf, name: String },

    #[snafu(display(
        "Got more than one block device matching the given criteria, including '{}'",
        path.display()
    ))]
    MultipleMatches { path: PathBuf },
}

/// Wraps `gptman::Error` so it can be used as a snafu source.
#[derive(Debug)]
pub struct GPTError(pub gptman::Error);

impl fmt::Display for GPTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for GPTError {}

pub type Result<T> = std::result::Result<T, Error>;
