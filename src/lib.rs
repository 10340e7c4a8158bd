//! Query sensors of Corsair Link RMi and HXi series power supplies.
//!
//! Every query is a command/response transaction over a 64 byte HID report
//! without a report ID. Transactions on one device are serialized; per-rail
//! readings select the rail and read it without letting another caller in
//! between.
//!
//! On Linux the [`PowerSupply`] type talks to the device through HIDRAW.
//! Other transports implement [`Transport`] and deliver inbound reports to
//! an [`Inbox`].
//!
//! # Example
//!
//! ```no_run
//! use corsairlink::PowerSupply;
//!
//! let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
//! println!("{}: {} uW", psu.identity(), psu.input_power()?);
//! # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
//! ```
//!
//! # Units
//!
//! Readings are fixed point integers: millivolts, milliamps and microwatts.
//! Temperatures and fan speed are reported as the device encodes them.
//!
//! # udev rules
//!
//! You will most likely want to update your udev rules so that you can access
//! the power supply as a non superuser.
//!
//! You will need to update the `idProduct` field for the product ID of your
//! power supply, you can figure this value out with `lsusb`, or from
//! [`Model::pid`].
//!
//! Also note the value for `idProduct` must be **lowercase** hexadecimal.
//!
//! ```text
//! # /etc/udev/rules.d/99-corsair.rules
//! SUBSYSTEM=="hidraw", ATTRS{idVendor}=="1b1c", ATTRS{idProduct}=="1c06", MODE="0666"
//! ```
//!
//! udev rules can be reloaded with
//! `sudo udevadm control --reload-rules && sudo udevadm trigger`
#![doc(html_root_url = "https://docs.rs/corsairlink/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod aio;
pub mod channel;
pub mod cmd;
pub mod decode;
mod error;
pub mod hidraw;
#[cfg(test)]
mod mock;
pub mod protocol;
mod sensor;
mod session;

pub use channel::{Frame, Inbox, Transport};
pub use error::{map_status, Error, OpenError, Status};
pub use hidraw::{Hidraw, PowerSupply};
pub use sensor::{Rail, RailSample, SensorKind, RAILS, SENSOR_KINDS};
pub use session::{Config, Session};

/// Corsair vendor ID.
pub const VID: u16 = 0x1B1C;

/// Size of every report in either direction.
pub const HID_REPORT_LEN: usize = 64;

/// Power supply models compatible with this API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Model {
    RM550i,
    RM650i,
    RM750i,
    RM850i,
    RM1000i,
    HX550i,
    HX650i,
    HX750i,
    HX850i,
    HX1000i,
    HX1200i,
}

impl Model {
    /// Get the product ID for the power supply model.
    ///
    /// # Example
    ///
    /// ```
    /// use corsairlink::Model;
    ///
    /// let m: Model = Model::RM850i;
    /// assert_eq!(m.pid(), 0x1C0Cu16);
    /// ```
    pub const fn pid(&self) -> u16 {
        match self {
            Model::RM550i => 0x1c09,
            Model::RM650i => 0x1c0a,
            Model::RM750i => 0x1c0b,
            Model::RM850i => 0x1c0c,
            Model::RM1000i => 0x1c0d,
            Model::HX550i => 0x1c03,
            Model::HX650i => 0x1c04,
            Model::HX750i => 0x1c05,
            Model::HX850i => 0x1c06,
            Model::HX1000i => 0x1c07,
            Model::HX1200i => 0x1c08,
        }
    }

    /// Look up the model for a product ID.
    ///
    /// # Example
    ///
    /// ```
    /// use corsairlink::Model;
    ///
    /// assert_eq!(Model::from_pid(0x1C06), Some(Model::HX850i));
    /// assert_eq!(Model::from_pid(0x1234), None);
    /// ```
    pub fn from_pid(pid: u16) -> Option<Model> {
        MODELS.iter().copied().find(|m| m.pid() == pid)
    }
}

/// Array of all models.
pub const MODELS: [Model; 11] = [
    Model::RM550i,
    Model::RM650i,
    Model::RM750i,
    Model::RM850i,
    Model::RM1000i,
    Model::HX550i,
    Model::HX650i,
    Model::HX750i,
    Model::HX850i,
    Model::HX1000i,
    Model::HX1200i,
];

/// USB vendor and product ID from a sysfs HID device name.
///
/// The name has the form `bus:vid:pid.instance` in hex, e.g.
/// `0003:1B1C:1C06.000A`.
fn usb_ids(name: &OsStr) -> Option<(u16, u16)> {
    fn hex4(field: &str) -> Option<u16> {
        if field.len() == 4 {
            u16::from_str_radix(field, 16).ok()
        } else {
            None
        }
    }

    let mut fields = name.to_str()?.split(|c: char| c == ':' || c == '.');
    let _bus = fields.next()?;
    let vid = hex4(fields.next()?)?;
    let pid = hex4(fields.next()?)?;
    Some((vid, pid))
}

/// Returns `true` if the VID and PID correspond to a valid power supply.
fn is_power_supply(vid: u16, pid: u16) -> bool {
    vid == VID && Model::from_pid(pid).is_some()
}

/// Device node for a `/sys/class/hidraw/` entry, if it is a power supply.
///
/// The entry links to `.../<hid device>/hidraw/hidrawN`.
fn hidraw_node(entry: &Path) -> Option<PathBuf> {
    let link: PathBuf = entry.read_link().ok()?;
    let node: &OsStr = link.file_name()?;
    let device: &OsStr = link.parent()?.parent()?.file_name()?;
    let (vid, pid) = usb_ids(device)?;
    if !is_power_supply(vid, pid) {
        return None;
    }
    let dev: PathBuf = Path::new("/dev").join(node);
    if dev.exists() {
        Some(dev)
    } else {
        None
    }
}

/// List power supply device paths.
///
/// This works by resolving the links under `/sys/class/hidraw/` and comparing
/// the USB vendor ID (VID) and product ID (PID) in the parent device name to
/// the known VID/PID.
///
/// Typically these files are accessible without super user permissions.
///
/// # Example
///
/// ```
/// let mut list = corsairlink::list()?;
/// if let Some(path) = list.pop() {
///     let psu = corsairlink::PowerSupply::open(path)?;
///     // call psu methods here
/// } else {
///     eprintln!("No PSUs found");
/// }
/// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
/// ```
pub fn list() -> io::Result<Vec<PathBuf>> {
    let sys_class_hidraw: &Path = Path::new("/sys/class/hidraw/");
    if !sys_class_hidraw.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(sys_class_hidraw)? {
        if let Some(dev) = hidraw_node(&entry?.path()) {
            paths.push(dev);
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unique_pid() {
        let mut pids: HashSet<u16> = HashSet::with_capacity(MODELS.len());
        for model in MODELS.iter() {
            let pid: u16 = model.pid();
            if !pids.insert(pid) {
                panic!("PID 0x{:04X} for model {:?} is a duplicate", pid, model);
            }
        }
    }

    #[test]
    fn pid_lookup() {
        for model in MODELS.iter() {
            assert_eq!(Model::from_pid(model.pid()), Some(*model));
        }
        assert_eq!(Model::from_pid(0x1c09), Some(Model::RM550i));
        assert_eq!(Model::from_pid(0x1c03), Some(Model::HX550i));
    }

    #[test]
    fn sysfs_device_names() {
        let ids = |name: &str| usb_ids(OsStr::new(name));
        assert_eq!(ids("0003:1B1C:1C06.000A"), Some((0x1B1C, 0x1C06)));
        assert_eq!(ids("0003:1b1c:1c0a.0001"), Some((0x1B1C, 0x1C0A)));
        assert_eq!(ids("0003:1B1C:1C06"), Some((0x1B1C, 0x1C06)));

        assert_eq!(ids(""), None);
        assert_eq!(ids("0003:1B1Z:1C06.000A"), None);
        assert_eq!(ids("0003:1B1C:1C0"), None);
        assert_eq!(ids("0003:01B1C:1C06.000A"), None);
    }

    #[test]
    fn power_supply_ids() {
        assert!(is_power_supply(VID, Model::HX850i.pid()));
        assert!(is_power_supply(VID, Model::RM550i.pid()));
        assert!(!is_power_supply(0x1234, Model::HX850i.pid()));
        assert!(!is_power_supply(VID, 0x1234));
    }

    #[test]
    fn non_link_entry_skipped() {
        assert_eq!(hidraw_node(Path::new("/nonexistent/hidraw99")), None);
    }
}
