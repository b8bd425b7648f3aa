//! Walks every block device on a host and keeps the probed devices that pass the selectors.

use crate::device::{Device, OpenMode};
use crate::error::Result;
use crate::host::Host;
use crate::probe::{probe_partitions, Handles, ProbedDevice};
use crate::select::Select;

/// Probes every block device on `host` and returns the ones that pass all `selectors`, in
/// device order and then partition order.
///
/// Devices are opened with `mode`. Rejected devices are closed as soon as a selector turns
/// them down. If a selector fails, every device opened so far is closed and the error is
/// returned; otherwise the returned devices are still open and belong to the caller.
pub fn all<H: Host>(
    host: &H,
    mode: OpenMode,
    selectors: &mut [&mut dyn Select<H>],
) -> Result<Vec<ProbedDevice<H::Device>>> {
    let mut selected = Handles::new();

    for name in host.block_devices()? {
        let device_path = host.device_path(&name);
        let mut pending = Handles::from(probe_partitions(host, &device_path, mode));

        while let Some(mut probed) = pending.pop() {
            match select_all(host, &mut probed, selectors) {
                Ok(true) => {
                    debug!(
                        "selected {} for {}",
                        device_path.display(),
                        probed.path().display()
                    );
                    selected.push(probed);
                }
                Ok(false) => probed.close()?,
                Err(e) => {
                    if let Err(close_err) = probed.close() {
                        warn!("{}", close_err);
                    }
                    return Err(e);
                }
            }
        }
    }

    Ok(selected.release())
}

fn select_all<H: Host>(
    host: &H,
    probed: &mut ProbedDevice<H::Device>,
    selectors: &mut [&mut dyn Select<H>],
) -> Result<bool> {
    for selector in selectors.iter_mut() {
        if !selector.select(host, probed)? {
            trace!(
                "{} ({}) rejected",
                probed.device().path().display(),
                probed.path().display()
            );
            return Ok(false);
        }
    }
    Ok(true)
}
