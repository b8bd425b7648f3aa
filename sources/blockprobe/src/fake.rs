//! An in-memory host for tests, with disk images built on the fly.

use crate::device::{Device, OpenMode, PartitionTable};
use crate::error::{self, GPTError, Result};
use crate::host::Host;
use crate::superblock::{self, Superblock};
use block_party::{partition_node_name, BlockDevices};
use gptman::GPT;
use nix::errno::Errno;
use snafu::ResultExt;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::rc::Rc;

const DEV: &str = "/dev";

/// Which handles have been opened, and which are still open.
#[derive(Debug, Default)]
struct Ledger {
    next_id: usize,
    open: HashSet<usize>,
    modes: Vec<OpenMode>,
    failing_close: HashSet<PathBuf>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    devices: Vec<String>,
    images: HashMap<PathBuf, Rc<Vec<u8>>>,
    unopenable: HashSet<PathBuf>,
    unreadable: HashSet<PathBuf>,
    list_fails: bool,
    ledger: Rc<RefCell<Ledger>>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a listed block device holding `data`.
    pub(crate) fn disk(mut self, name: &str, data: Vec<u8>) -> Self {
        self.devices.push(name.to_string());
        self.node(name, data)
    }

    /// Adds a device node, such as a partition, that isn't listed.
    pub(crate) fn node(mut self, name: &str, data: Vec<u8>) -> Self {
        self.images.insert(Path::new(DEV).join(name), Rc::new(data));
        self
    }

    /// Makes `open` fail for `path`. Probing still works.
    pub(crate) fn unopenable(mut self, path: &str) -> Self {
        self.unopenable.insert(PathBuf::from(path));
        self
    }

    /// Makes probing fail for `path`. Opening still works.
    pub(crate) fn unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(PathBuf::from(path));
        self
    }

    /// Makes `close` fail for handles on `path`. The handle is released all the same.
    pub(crate) fn failing_close(self, path: &str) -> Self {
        self.ledger
            .borrow_mut()
            .failing_close
            .insert(PathBuf::from(path));
        self
    }

    pub(crate) fn without_listing(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Number of handles opened and not yet closed.
    pub(crate) fn open_handles(&self) -> usize {
        self.ledger.borrow().open.len()
    }

    /// Number of calls to `open` that succeeded.
    pub(crate) fn opened(&self) -> usize {
        self.ledger.borrow().modes.len()
    }

    pub(crate) fn opened_modes(&self) -> Vec<OpenMode> {
        self.ledger.borrow().modes.clone()
    }

    pub(crate) fn is_open(&self, device: &FakeDevice) -> bool {
        self.ledger.borrow().open.contains(&device.id)
    }
}

impl Host for FakeHost {
    type Device = FakeDevice;

    fn block_devices(&self) -> Result<Vec<String>> {
        if self.list_fails {
            BlockDevices::with_roots("/nonexistent/sys/block", DEV)
                .list()
                .context(error::ListBlockDevicesSnafu)?;
        }
        let mut names = self.devices.clone();
        names.sort();
        Ok(names)
    }

    fn device_path(&self, name: &str) -> PathBuf {
        Path::new(DEV).join(name)
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<FakeDevice> {
        let data = match self.images.get(path) {
            Some(data) if !self.unopenable.contains(path) => Rc::clone(data),
            _ => {
                return Err(io::Error::from(io::ErrorKind::NotFound))
                    .context(error::DeviceOpenSnafu { path, mode })
            }
        };

        let mut ledger = self.ledger.borrow_mut();
        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.open.insert(id);
        ledger.modes.push(mode);

        Ok(FakeDevice {
            id,
            path: path.to_path_buf(),
            mode,
            data,
            ledger: Rc::clone(&self.ledger),
        })
    }

    fn probe_superblock(&self, path: &Path) -> Result<Option<Superblock>> {
        let data = self
            .images
            .get(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
            .context(error::DeviceOpenSnafu {
                path,
                mode: OpenMode::ReadOnly,
            })?;
        if self.unreadable.contains(path) {
            return Err(io::Error::new(io::ErrorKind::Other, "I/O error"))
                .context(error::ProbeSuperblockSnafu { path });
        }
        superblock::probe(&mut Cursor::new(&data[..])).context(error::ProbeSuperblockSnafu { path })
    }

    fn partition_path(&self, device_name: &str, number: u32) -> Result<PathBuf> {
        let name = partition_node_name(device_name, number).context(error::PartitionPathSnafu {
            device: device_name,
            number,
        })?;
        Ok(Path::new(DEV).join(name))
    }
}

#[derive(Debug)]
pub(crate) struct FakeDevice {
    id: usize,
    path: PathBuf,
    mode: OpenMode,
    data: Rc<Vec<u8>>,
    ledger: Rc<RefCell<Ledger>>,
}

impl Device for FakeDevice {
    fn path(&self) -> &Path {
        &self.path
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn partition_table(&mut self) -> Result<PartitionTable> {
        let gpt = GPT::find_from(&mut Cursor::new(&self.data[..]))
            .map_err(GPTError)
            .context(error::ReadPartitionTableSnafu { path: &self.path })?;
        Ok(PartitionTable::from(&gpt))
    }

    fn close(self) -> Result<()> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.open.remove(&self.id);
        if ledger.failing_close.contains(&self.path) {
            return Err(Errno::EIO).context(error::DeviceCloseSnafu { path: &self.path });
        }
        Ok(())
    }
}

/// Just enough of each on-disk format to be recognized.
pub(crate) mod images {
    use gptman::{GPTPartitionEntry, GPT};
    use hex_literal::hex;
    use std::io::Cursor;

    pub(crate) const DISK_SIZE: usize = 1024 * 1024;

    // Type GUIDs in their on-disk byte order.
    pub(crate) const EFI_SYSTEM: [u8; 16] = hex!("28732ac1 1ff8 d211 ba4b 00a0c93ec93b");
    pub(crate) const LINUX_DATA: [u8; 16] = hex!("af3dc60f 8384 7247 8e79 3d69d8477de4");

    const PARTITION_SECTORS: u64 = 64;

    pub(crate) fn blank(len: usize) -> Vec<u8> {
        vec![0; len]
    }

    fn padded<const N: usize>(label: &str, pad: u8) -> [u8; N] {
        let mut field = [pad; N];
        field[..label.len()].copy_from_slice(label.as_bytes());
        field
    }

    pub(crate) fn iso9660(label: &str) -> Vec<u8> {
        let mut data = blank(64 * 1024);
        let pvd = &mut data[16 * 2048..17 * 2048];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        pvd[40..72].copy_from_slice(&padded::<32>(label, b' '));
        data
    }

    // Offsets of the extended boot signature, label and type within the boot sector.
    fn fat(label: &str, ebpb: [usize; 3], fs_type: &[u8; 8]) -> Vec<u8> {
        let [signature, label_at, fs_type_at] = ebpb;
        let mut data = blank(64 * 1024);
        data[510] = 0x55;
        data[511] = 0xaa;
        data[signature] = 0x29;
        data[label_at..label_at + 11].copy_from_slice(&padded::<11>(label, b' '));
        data[fs_type_at..fs_type_at + 8].copy_from_slice(fs_type);
        data
    }

    /// A FAT32 boot sector.
    pub(crate) fn vfat(label: &str) -> Vec<u8> {
        fat(label, [0x42, 0x47, 0x52], b"FAT32   ")
    }

    pub(crate) fn fat16(label: &str) -> Vec<u8> {
        fat(label, [0x26, 0x2b, 0x36], b"FAT16   ")
    }

    pub(crate) fn xfs(label: &str) -> Vec<u8> {
        let mut data = blank(64 * 1024);
        data[0..4].copy_from_slice(b"XFSB");
        data[108..120].copy_from_slice(&padded::<12>(label, 0));
        data
    }

    /// An ext superblock with the extents feature, so it reads as ext4.
    pub(crate) fn ext4(label: &str) -> Vec<u8> {
        let mut data = blank(64 * 1024);
        let sb = &mut data[0x400..0x800];
        sb[0x38..0x3a].copy_from_slice(&0xef53u16.to_le_bytes());
        sb[0x60..0x64].copy_from_slice(&0x40u32.to_le_bytes());
        sb[0x78..0x88].copy_from_slice(&padded::<16>(label, 0));
        data
    }

    /// A disk with a GPT holding one partition per `(name, type GUID)`, numbered from 1.
    pub(crate) fn gpt(partitions: &[(&str, [u8; 16])]) -> Vec<u8> {
        let mut data = blank(DISK_SIZE);
        let mut cursor = Cursor::new(&mut data);
        let mut gpt = GPT::new_from(&mut cursor, 512, [0xff; 16]).unwrap();
        for (i, (name, type_guid)) in partitions.iter().enumerate() {
            let starting_lba = gpt.header.first_usable_lba + i as u64 * PARTITION_SECTORS;
            gpt[i as u32 + 1] = GPTPartitionEntry {
                partition_name: (*name).into(),
                partition_type_guid: *type_guid,
                unique_partition_guid: [i as u8 + 1; 16],
                starting_lba,
                ending_lba: starting_lba + PARTITION_SECTORS - 1,
                attribute_bits: 0,
            };
        }
        gpt.write_into(&mut cursor).unwrap();
        data
    }
}
