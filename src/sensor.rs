//! Typed sensor readings.

use std::{fmt, time::Duration};

use crate::{
    channel::Transport,
    cmd, decode,
    protocol::{payload_string, payload_u32, Command},
    Error, Session, HID_REPORT_LEN,
};

/// Kind of sensor exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorKind {
    /// Temperature probes, raw device units.
    Temperature,
    /// Fan speed in RPM.
    Fan,
    /// Voltage in millivolts.
    Voltage,
    /// Current in milliamps.
    Current,
    /// Power in microwatts.
    Power,
}

/// Array of all sensor kinds.
pub const SENSOR_KINDS: [SensorKind; 5] = [
    SensorKind::Temperature,
    SensorKind::Fan,
    SensorKind::Voltage,
    SensorKind::Current,
    SensorKind::Power,
];

const SUPPLY_LABELS: [&str; 4] = ["Power supply", "+12V", "+5V", "+3.3V"];

impl SensorKind {
    /// Number of channels of this kind.
    pub const fn channels(self) -> u8 {
        match self {
            SensorKind::Temperature => 2,
            SensorKind::Fan => 1,
            SensorKind::Voltage | SensorKind::Power => 4,
            SensorKind::Current => 3,
        }
    }

    /// Static label of a channel.
    ///
    /// Voltage and power channel 0 is the power supply input, the remaining
    /// channels are the output rails. Current channels are the rails only, so
    /// current channel 0 is `+12V` where the Linux `corsair-link` hwmon driver
    /// reuses the voltage labels and calls it "Power supply".
    ///
    /// # Example
    ///
    /// ```
    /// use corsairlink::SensorKind;
    ///
    /// assert_eq!(SensorKind::Voltage.label(0), Some("Power supply"));
    /// assert_eq!(SensorKind::Current.label(0), Some("+12V"));
    /// assert_eq!(SensorKind::Fan.label(0), None);
    /// ```
    pub fn label(self, channel: u8) -> Option<&'static str> {
        let labels: &[&'static str] = match self {
            SensorKind::Voltage | SensorKind::Power => &SUPPLY_LABELS,
            SensorKind::Current => &SUPPLY_LABELS[1..],
            SensorKind::Temperature | SensorKind::Fan => &[],
        };
        labels.get(usize::from(channel)).copied()
    }
}

/// Power supply output rail.
///
/// This is an input argument for [`Session::rail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rail {
    /// 12V rail.
    Rail12v,
    /// 5V rail.
    Rail5v,
    /// 3.3V rail.
    Rail3v3,
}

impl Rail {
    /// Index written to the channel select register.
    pub(crate) fn idx(&self) -> u8 {
        match self {
            Rail::Rail12v => 0,
            Rail::Rail5v => 1,
            Rail::Rail3v3 => 2,
        }
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rail::Rail12v => write!(f, "12V"),
            Rail::Rail5v => write!(f, "5V"),
            Rail::Rail3v3 => write!(f, "3.3V"),
        }
    }
}

/// Array of all rails.
pub const RAILS: [Rail; 3] = [Rail::Rail12v, Rail::Rail5v, Rail::Rail3v3];

/// Output rail sample.
///
/// This is returned by [`Session::rail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RailSample {
    /// Current in milliamps.
    pub current: i64,
    /// Voltage in millivolts.
    pub voltage: i64,
    /// Power in microwatts.
    ///
    /// Note: this often does not add up to the product of current and voltage.
    pub power: i64,
}

impl<T: Transport> Session<T> {
    /// Read one sensor channel.
    ///
    /// Units are those documented on [`SensorKind`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::{PowerSupply, SensorKind, SENSOR_KINDS};
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// for kind in SENSOR_KINDS.iter() {
    ///     for channel in 0..kind.channels() {
    ///         println!("{:?}{}: {:?}", kind, channel, psu.read(*kind, channel));
    ///     }
    /// }
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn read(&self, kind: SensorKind, channel: u8) -> Result<i64, Error> {
        if channel >= kind.channels() {
            return Err(Error::InvalidChannel { kind, channel });
        }

        let mut tx = self.begin();
        let value: i64 = match (kind, channel) {
            (SensorKind::Temperature, probe) => {
                i64::from(tx.read_register(cmd::TEMP_BASE + probe)?.be())
            }
            (SensorKind::Fan, _) => i64::from(tx.read_register(cmd::FAN_RPM)?.le()),
            (SensorKind::Voltage, 0) => decode::milli(tx.read_register(cmd::VOLTAGE_PS)?.le()),
            (SensorKind::Voltage, rail) => decode::milli(
                tx.select_and_read(cmd::CHANNEL_SELECT, rail - 1, cmd::VOLTAGE)?
                    .le(),
            ),
            (SensorKind::Power, 0) => {
                decode::milli(tx.read_register(cmd::POWER_PS)?.le()) * 1000
            }
            (SensorKind::Power, rail) => {
                decode::milli(
                    tx.select_and_read(cmd::CHANNEL_SELECT, rail - 1, cmd::POWER)?
                        .le(),
                ) * 1000
            }
            (SensorKind::Current, rail) => decode::milli(
                tx.select_and_read(cmd::CHANNEL_SELECT, rail, cmd::CURRENT)?
                    .le(),
            ),
        };
        Ok(value)
    }

    /// Temperature probe reading, raw device units.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::PowerSupply;
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// println!("Temperature: {}", psu.temperature(0)?);
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn temperature(&self, probe: u8) -> Result<i64, Error> {
        self.read(SensorKind::Temperature, probe)
    }

    /// Fan rotations per minute.
    pub fn fan_rpm(&self) -> Result<i64, Error> {
        self.read(SensorKind::Fan, 0)
    }

    /// Input voltage in millivolts.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::PowerSupply;
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// // e.g. "Input voltage: 115000 mV"
    /// println!("Input voltage: {} mV", psu.input_voltage()?);
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn input_voltage(&self) -> Result<i64, Error> {
        self.read(SensorKind::Voltage, 0)
    }

    /// Input power in microwatts.
    pub fn input_power(&self) -> Result<i64, Error> {
        self.read(SensorKind::Power, 0)
    }

    /// Output voltage of a rail in millivolts.
    pub fn voltage(&self, rail: Rail) -> Result<i64, Error> {
        self.read(SensorKind::Voltage, rail.idx() + 1)
    }

    /// Output current of a rail in milliamps.
    pub fn current(&self, rail: Rail) -> Result<i64, Error> {
        self.read(SensorKind::Current, rail.idx())
    }

    /// Output power of a rail in microwatts.
    pub fn power(&self, rail: Rail) -> Result<i64, Error> {
        self.read(SensorKind::Power, rail.idx() + 1)
    }

    /// Get the current, voltage, and power for an output rail.
    ///
    /// Each value is read with its own channel select, another caller may
    /// run between them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::{PowerSupply, RAILS};
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// for rail in RAILS.iter() {
    ///     println!("{}: {:?}", rail, psu.rail(*rail)?);
    /// }
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn rail(&self, rail: Rail) -> Result<RailSample, Error> {
        Ok(RailSample {
            voltage: self.voltage(rail)?,
            current: self.current(rail)?,
            power: self.power(rail)?,
        })
    }

    /// Vendor name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::PowerSupply;
    ///
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5")?;
    /// // e.g. "PSU vendor: CORSAIR"
    /// println!("PSU vendor: {:?}", psu.vendor()?);
    /// # Ok::<(), std::boxed::Box<dyn std::error::Error>>(())
    /// ```
    pub fn vendor(&self) -> Result<String, Error> {
        self.read_string(cmd::VENDOR)
    }

    /// Product name.
    ///
    /// This often contains the same information as [`Session::identity`].
    pub fn product(&self) -> Result<String, Error> {
        self.read_string(cmd::PRODUCT)
    }

    /// Power supply uptime.
    ///
    /// This is the duration that the PSU has been connected to AC power,
    /// regardless of whether or not your PC has been powered on.
    pub fn uptime(&self) -> Result<Duration, Error> {
        self.read_seconds(cmd::UPTIME)
    }

    /// PC uptime.
    ///
    /// This is the duration that the PSU has been powering your PC.
    pub fn pc_uptime(&self) -> Result<Duration, Error> {
        self.read_seconds(cmd::PC_UPTIME)
    }

    fn read_string(&self, register: u8) -> Result<String, Error> {
        let mut tx = self.begin();
        let frame = tx.request(Command::read(register))?;
        Ok(payload_string(frame, HID_REPORT_LEN))
    }

    fn read_seconds(&self, register: u8) -> Result<Duration, Error> {
        let mut tx = self.begin();
        let frame = tx.request(Command::read(register))?;
        Ok(Duration::from_secs(u64::from(payload_u32(frame))))
    }
}
