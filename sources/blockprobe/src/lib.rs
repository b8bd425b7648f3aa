/*!
blockprobe finds block devices by what is on them rather than by name.

Each block device is probed for a GPT. If it has one, every partition is checked for a
filesystem; if not, the whole device is. The results can then be filtered with selectors such
as partition label or filesystem label.

```no_run
use blockprobe::{find_device_path_by_filesystem_label, LinuxHost};

let host = LinuxHost::new();
match find_device_path_by_filesystem_label(&host, "INSTALL")? {
    Some(path) => println!("install media is at {}", path.display()),
    None => println!("no install media"),
}
# Ok::<(), blockprobe::Error>(())
```

Every handle opened while searching is either closed before the search returns or handed to
the caller, including when a selector fails part way through.
*/

#[macro_use]
extern crate log;

pub mod device;
pub mod enumerate;
mod error;
pub mod host;
pub mod lookup;
pub mod probe;
pub mod select;
pub mod superblock;

#[cfg(test)]
mod fake;

pub use device::{Device, LinuxDevice, OpenMode, Partition, PartitionTable};
pub use enumerate::all;
pub use error::{Error, GPTError, Result};
pub use host::{Host, LinuxHost};
pub use lookup::{
    find_device_by_filesystem_label, find_device_by_partition_label,
    find_device_path_by_filesystem_label, find_partition_by_name, open_partition,
    open_partition_by_label, ProbedPartition,
};
pub use probe::{probe, probe_partitions, ProbedDevice};
pub use select::{
    with_filesystem_label, with_partition_label, with_partition_type, with_single_result,
    Select,
};
pub use superblock::Superblock;
