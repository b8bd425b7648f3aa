/*!
probedog finds block devices and partitions by label.

It prints the path it finds on stdout. The exit status is 0 when something was found, 2 when
nothing matched, and 1 on any other error.

An optional TOML configuration file, `/etc/probedog.toml` by default, can point it at other
`/sys/block` and `/dev` trees:

```toml
sys-block-path = "/sys/block"
dev-path = "/dev"
```
*/

#[macro_use]
extern crate log;

use argh::FromArgs;
use blockprobe::{
    find_device_by_partition_label, find_device_path_by_filesystem_label, find_partition_by_name,
    probe, Device, Host, LinuxHost,
};
use serde::Deserialize;
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};
use snafu::ResultExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_CONFIG_PATH: &str = "/etc/probedog.toml";

/// Finds block devices and partitions by label
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    /// log-level trace|debug|info|warn|error
    #[argh(option)]
    log_level: Option<LevelFilter>,
    /// configuration file, defaults to /etc/probedog.toml
    #[argh(option)]
    config: Option<PathBuf>,
    #[argh(subcommand)]
    subcommand: Subcommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Subcommand {
    List(ListArgs),
    PartitionLabel(PartitionLabelArgs),
    FsLabel(FsLabelArgs),
    Partition(PartitionArgs),
}

/// Lists every filesystem found on every block device
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "list")]
struct ListArgs {}

/// Prints the device that has a partition with the given name
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "partition-label")]
struct PartitionLabelArgs {
    /// partition name
    #[argh(positional)]
    label: String,
}

/// Prints the device or partition carrying the filesystem with the given label
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "fs-label")]
struct FsLabelArgs {
    /// filesystem label
    #[argh(positional)]
    label: String,
}

/// Prints the node of the partition with the given name
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "partition")]
struct PartitionArgs {
    /// partition name
    #[argh(positional)]
    name: String,
}

/// Where to look for block devices.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct Config {
    sys_block_path: PathBuf,
    dev_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sys_block_path: PathBuf::from(block_party::SYS_BLOCK),
            dev_path: PathBuf::from(block_party::DEV),
        }
    }
}

/// Reads the configuration at `path`. A missing file is only an error if it was asked for.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
            debug!("{} not found, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(e).context(error::ConfigReadSnafu { path }),
    };
    toml::from_str(&s).context(error::ConfigParseSnafu { path })
}

/// Prints each block device path, the path where a filesystem was found, its type and label.
fn list<H: Host>(host: &H) -> Result<bool> {
    let mut found = false;
    for name in host.block_devices().context(error::ProbeSnafu)? {
        let device_path = host.device_path(&name);
        for (path, sb) in probe(host, &device_path) {
            println!(
                "{} {} {} {}",
                device_path.display(),
                path.display(),
                sb.kind(),
                sb.label()
            );
            found = true;
        }
    }
    Ok(found)
}

fn partition_label<H: Host>(host: &H, label: &str) -> Result<bool> {
    match find_device_by_partition_label(host, label).context(error::ProbeSnafu)? {
        Some(probed) => {
            println!("{}", probed.device().path().display());
            probed.close().context(error::ProbeSnafu)?;
            Ok(true)
        }
        None => {
            info!("No device has a partition named '{}'", label);
            Ok(false)
        }
    }
}

fn fs_label<H: Host>(host: &H, label: &str) -> Result<bool> {
    match find_device_path_by_filesystem_label(host, label).context(error::ProbeSnafu)? {
        Some(path) => {
            println!("{}", path.display());
            Ok(true)
        }
        None => {
            info!("No filesystem labeled '{}'", label);
            Ok(false)
        }
    }
}

fn partition<H: Host>(host: &H, name: &str) -> Result<bool> {
    match find_partition_by_name(host, name).context(error::ProbeSnafu)? {
        Some(partition) => {
            println!("{}", partition.path.display());
            partition.device.close().context(error::ProbeSnafu)?;
            Ok(true)
        }
        None => {
            info!("No partition named '{}'", name);
            Ok(false)
        }
    }
}

/// Runs the subcommand, returning whether anything was found.
fn dispatch<H: Host>(host: &H, subcommand: &Subcommand) -> Result<bool> {
    match subcommand {
        Subcommand::List(_) => list(host),
        Subcommand::PartitionLabel(args) => partition_label(host, &args.label),
        Subcommand::FsLabel(args) => fs_label(host, &args.label),
        Subcommand::Partition(args) => partition(host, &args.name),
    }
}

fn setup_logger(args: &Args) -> Result<()> {
    let log_level = args.log_level.unwrap_or(LevelFilter::Info);
    SimpleLogger::init(log_level, LogConfig::default()).context(error::LoggerSnafu)
}

fn run() -> Result<bool> {
    let args: Args = argh::from_env();
    setup_logger(&args)?;
    let config = load_config(args.config.as_deref())?;
    let host = LinuxHost::with_roots(config.sys_block_path, config.dev_path);
    dispatch(&host, &args.subcommand)
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

mod error {
    use snafu::Snafu;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Failed to setup logger: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("Failed to read config '{}': {}", path.display(), source))]
        ConfigRead {
            path: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Failed to parse config '{}': {}", path.display(), source))]
        ConfigParse {
            path: PathBuf,
            source: toml::de::Error,
        },

        #[snafu(display("{}", source))]
        Probe { source: blockprobe::Error },
    }
}

type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn config_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn full_config() {
        let f = config_file("sys-block-path = \"/host/sys/block\"\ndev-path = \"/host/dev\"\n");
        assert_eq!(
            load_config(Some(f.path())).unwrap(),
            Config {
                sys_block_path: PathBuf::from("/host/sys/block"),
                dev_path: PathBuf::from("/host/dev"),
            }
        );
    }

    #[test]
    fn partial_config() {
        let f = config_file("dev-path = \"/host/dev\"\n");
        let config = load_config(Some(f.path())).unwrap();
        assert_eq!(config.sys_block_path, PathBuf::from("/sys/block"));
        assert_eq!(config.dev_path, PathBuf::from("/host/dev"));
    }

    #[test]
    fn unknown_key() {
        let f = config_file("dev = \"/host/dev\"\n");
        assert!(matches!(
            load_config(Some(f.path())),
            Err(error::Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn missing_requested_config() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(Some(&dir.path().join("probedog.toml"))),
            Err(error::Error::ConfigRead { .. })
        ));
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::from_args(&["probedog"], &["--log-level", "debug", "fs-label", "INSTALL"])
            .unwrap();
        assert_eq!(args.log_level, Some(LevelFilter::Debug));
        assert_eq!(
            args.subcommand,
            Subcommand::FsLabel(FsLabelArgs {
                label: "INSTALL".to_string()
            })
        );

        let args =
            Args::from_args(&["probedog"], &["--config", "/tmp/p.toml", "partition", "EFI"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/p.toml")));
        assert_eq!(
            args.subcommand,
            Subcommand::Partition(PartitionArgs {
                name: "EFI".to_string()
            })
        );
    }

    #[test]
    fn lookups_against_fixture_tree() {
        let root = TempDir::new().unwrap();
        let sys_block = root.path().join("sys/block");
        let dev = root.path().join("dev");
        fs::create_dir_all(sys_block.join("sda")).unwrap();
        fs::create_dir_all(&dev).unwrap();
        let mut xfs = vec![0u8; 64 * 1024];
        xfs[0..4].copy_from_slice(b"XFSB");
        xfs[108..112].copy_from_slice(b"DATA");
        fs::write(dev.join("sda"), &xfs).unwrap();
        let host = LinuxHost::with_roots(sys_block, dev);

        assert!(list(&host).unwrap());
        assert!(fs_label(&host, "DATA").unwrap());
        assert!(!fs_label(&host, "OTHER").unwrap());
        // sda has no partition table, which fails the partition search.
        assert!(matches!(
            partition_label(&host, "DATA"),
            Err(error::Error::Probe { .. })
        ));
    }
}
