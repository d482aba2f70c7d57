//! `udev`-based discovery of candidate `/dev/i2c-N` device nodes.
//!
//! This only narrows the search space to buses that are plausibly
//! display-adjacent; it does not attempt to open them or check for a
//! reachable EDID -- that belongs to `ddc-hi`'s detection algorithm, which
//! has the context (and the budget) to try and fail gracefully.

use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// List stolen from ddcutil's `ignorable_i2c_device_sysfs_name`: I2C buses
/// that are never display-control channels, so probing them is both
/// pointless and occasionally unsafe on embedded SoCs.
const SKIP_PREFIX: &[&str] = &["SMBus", "soc:i2cdsi", "smu", "mac-io", "u4"];

/// Enumerates `/dev/i2c-N` nodes attached to the system, skipping buses
/// known never to carry a display.
pub struct Enumerator {
    inner: udev::Devices,
}

impl Enumerator {
    /// Create a new enumerator over the `i2c-dev` udev subsystem.
    pub fn new() -> io::Result<Self> {
        let udev = udev::Context::new()?;
        let mut en = udev::Enumerator::new(&udev)?;
        en.match_subsystem("i2c-dev")?;

        Ok(Enumerator {
            inner: en.scan_devices()?,
        })
    }
}

impl Iterator for Enumerator {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(dev) = self.inner.next() {
            let (devnode, name) = match dev
                .devnode()
                .and_then(|devnode| dev.attribute_value("name").map(|name| (devnode, name)))
            {
                Some(v) => v,
                None => continue,
            };

            if SKIP_PREFIX.iter().any(|p| name.as_bytes().starts_with(p.as_bytes())) {
                continue;
            }

            return Some(devnode.into());
        }

        None
    }
}
