//! Linux HIDRAW transport.

use std::{
    fs::{File, OpenOptions},
    io::{self, ErrorKind, Read, Write},
    os::unix::io::AsRawFd,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    channel::{Frame, Inbox, Transport},
    Config, Model, OpenError, Session, HID_REPORT_LEN, VID,
};

/// How often the reader thread checks for shutdown.
const POLL_INTERVAL_MS: libc::c_int = 100;

#[repr(C)]
#[derive(Debug)]
#[allow(non_camel_case_types)]
struct hidraw_devinfo {
    bustype: u32,
    vendor: u16,
    product: u16,
}

/// Query the USB vendor and product ID of a HIDRAW device.
fn devinfo(f: &File) -> io::Result<hidraw_devinfo> {
    // Only one IOCTL is needed for this crate.
    const IOC_READ: libc::c_ulong = 2;
    const IOC_NRBITS: libc::c_ulong = 8;
    const IOC_TYPEBITS: libc::c_ulong = 8;
    const IOC_SIZEBITS: libc::c_ulong = 14;
    const IOC_NRSHIFT: libc::c_ulong = 0;
    const IOC_TYPESHIFT: libc::c_ulong = IOC_NRSHIFT + IOC_NRBITS;
    const IOC_SIZESHIFT: libc::c_ulong = IOC_TYPESHIFT + IOC_TYPEBITS;
    const IOC_DIRSHIFT: libc::c_ulong = IOC_SIZESHIFT + IOC_SIZEBITS;
    const HIDIOCGRAWINFO: libc::c_ulong = (IOC_READ << IOC_DIRSHIFT)
        | ((b'H' as libc::c_ulong) << IOC_TYPESHIFT)
        | (0x03 << IOC_NRSHIFT)
        | (std::mem::size_of::<hidraw_devinfo>() << IOC_SIZESHIFT) as libc::c_ulong;

    let mut info = hidraw_devinfo {
        bustype: u32::MAX,
        vendor: u16::MAX,
        product: u16::MAX,
    };
    let fd = f.as_raw_fd();
    // safety: `fd` will not be dropped until `f` is dropped
    let rc = unsafe { libc::ioctl(fd, HIDIOCGRAWINFO as _, &mut info) };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(info)
    }
}

/// Wait up to `timeout_ms` for the file to become readable.
fn poll_readable(f: &File, timeout_ms: libc::c_int) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: f.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    // safety: `pfd` is a single valid pollfd for the duration of the call
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        Err(io::Error::new(ErrorKind::BrokenPipe, "device disconnected"))
    } else {
        Ok(rc > 0)
    }
}

/// Read reports until shutdown, handing each one to `inbox`.
fn read_reports(mut f: File, inbox: Arc<Inbox>, shutdown: Arc<AtomicBool>) {
    let mut buf: Frame = [0; HID_REPORT_LEN];
    while !shutdown.load(Ordering::Relaxed) {
        match poll_readable(&f, POLL_INTERVAL_MS) {
            Ok(false) => continue,
            Ok(true) => (),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("HIDRAW poll failed: {}", e);
                break;
            }
        }
        match f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                inbox.deliver(&buf[..n]);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => (),
            Err(e) => {
                tracing::warn!("HIDRAW read failed: {}", e);
                break;
            }
        }
    }
    tracing::trace!("HIDRAW reader exiting");
}

/// HIDRAW device node.
///
/// A reader thread delivers inbound reports to the session inbox until the
/// transport is dropped.
#[derive(Debug)]
pub struct Hidraw {
    f: File,
    model: Model,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Hidraw {
    /// Open a HIDRAW node and start delivering its reports to `inbox`.
    ///
    /// Fails if the node does not belong to a supported power supply.
    pub fn open<P: AsRef<Path>>(path: P, inbox: Arc<Inbox>) -> Result<Hidraw, OpenError> {
        let f: File = OpenOptions::new().read(true).write(true).open(path)?;
        let info = devinfo(&f)?;
        if info.vendor != VID {
            return Err(OpenError::InvalidVendorId(info.vendor));
        }
        let model = Model::from_pid(info.product).ok_or(OpenError::InvalidProductId(info.product))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let rx = f.try_clone()?;
        let flag = Arc::clone(&shutdown);
        let reader = thread::Builder::new()
            .name("hidraw-reader".to_string())
            .spawn(move || read_reports(rx, inbox, flag))?;

        Ok(Hidraw {
            f,
            model,
            shutdown,
            reader: Some(reader),
        })
    }

    pub const fn model(&self) -> Model {
        self.model
    }
}

impl Transport for Hidraw {
    fn send(&self, frame: &Frame) -> io::Result<()> {
        (&self.f).write_all(frame)
    }
}

impl Drop for Hidraw {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::warn!("HIDRAW reader panicked");
            }
        }
    }
}

/// Power supply.
pub type PowerSupply = Session<Hidraw>;

impl Session<Hidraw> {
    /// Open the power supply by file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::PowerSupply;
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// // e.g. "PSU name: HX850i"
    /// println!("PSU name: {}", psu.identity());
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PowerSupply, OpenError> {
        Self::open_with(path, Config::default())
    }

    /// Open the power supply by file path with a custom configuration.
    pub fn open_with<P: AsRef<Path>>(path: P, config: Config) -> Result<PowerSupply, OpenError> {
        let inbox = Arc::new(Inbox::new());
        let transport = Hidraw::open(path, Arc::clone(&inbox))?;
        Ok(Session::start(transport, inbox, config)?)
    }

    /// Get the power supply model.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::PowerSupply;
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// // e.g. "PSU model: HX850i"
    /// println!("PSU model: {:?}", psu.model());
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn model(&self) -> Model {
        self.transport().model()
    }
}
