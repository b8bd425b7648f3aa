//! Open handles to block devices and the partition tables read from them.

use crate::error::{self, GPTError, Result};
use gptman::{GPTPartitionEntry, GPT};
use snafu::ResultExt;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

/// How a device is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::ReadOnly => write!(f, "read-only"),
            OpenMode::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// An open handle to a block device or partition.
///
/// A handle is released by `close`, which consumes it, so it can't be closed twice.
pub trait Device: Sized {
    /// The path the handle was opened with.
    fn path(&self) -> &Path;

    /// The mode the handle was opened with.
    fn mode(&self) -> OpenMode;

    /// Reads the GPT from the device.
    fn partition_table(&mut self) -> Result<PartitionTable>;

    /// Releases the handle.
    fn close(self) -> Result<()>;
}

/// A used entry in a GPT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub number: u32,
    pub name: String,
    pub type_guid: [u8; 16],
    pub unique_guid: [u8; 16],
    pub first_lba: u64,
    pub last_lba: u64,
}

impl Partition {
    fn from_entry(number: u32, entry: &GPTPartitionEntry) -> Self {
        Self {
            number,
            name: entry.partition_name.as_str().to_string(),
            type_guid: entry.partition_type_guid,
            unique_guid: entry.unique_partition_guid,
            first_lba: entry.starting_lba,
            last_lba: entry.ending_lba,
        }
    }
}

/// The used partitions of a GPT, ordered by partition number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    partitions: Vec<Partition>,
}

impl PartitionTable {
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Returns the first partition whose name is exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn find_by_type(&self, type_guid: &[u8; 16]) -> Option<&Partition> {
        self.partitions.iter().find(|p| &p.type_guid == type_guid)
    }
}

impl From<&GPT> for PartitionTable {
    fn from(gpt: &GPT) -> Self {
        let partitions = gpt
            .iter()
            .filter(|(_, entry)| entry.is_used())
            .map(|(number, entry)| Partition::from_entry(number, entry))
            .collect();
        Self { partitions }
    }
}

/// A block device node opened through the filesystem.
#[derive(Debug)]
pub struct LinuxDevice {
    path: PathBuf,
    mode: OpenMode,
    file: File,
}

impl LinuxDevice {
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(path)
            .context(error::DeviceOpenSnafu { path, mode })?;
        trace!("opened {} {}", path.display(), mode);

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            file,
        })
    }

    /// Gives access to the underlying file, e.g. to read data from a matched partition.
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Device for LinuxDevice {
    fn path(&self) -> &Path {
        &self.path
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn partition_table(&mut self) -> Result<PartitionTable> {
        let gpt = GPT::find_from(&mut self.file)
            .map_err(GPTError)
            .context(error::ReadPartitionTableSnafu { path: &self.path })?;
        Ok(PartitionTable::from(&gpt))
    }

    fn close(self) -> Result<()> {
        let Self { path, file, .. } = self;
        // Dropping a File ignores close(2) errors, so take the descriptor and close it ourselves.
        nix::unistd::close(file.into_raw_fd()).context(error::DeviceCloseSnafu { path: &path })?;
        trace!("closed {}", path.display());
        Ok(())
    }
}
