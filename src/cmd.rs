//! Opcodes and register addresses.

/// Read a register.
pub const READ: u8 = 0x03;
/// Write a register.
pub const WRITE: u8 = 0x02;
/// Query device identity.
pub const IDENTIFY: u8 = 0xFE;

/// Selects the output rail consumed by the next per-rail read.
pub const CHANNEL_SELECT: u8 = 0x00;
/// Device name, read with [`IDENTIFY`].
pub const NAME: u8 = 0x03;

/// First temperature probe, the second follows at `TEMP_BASE + 1`.
pub const TEMP_BASE: u8 = 0x8D;
pub const FAN_RPM: u8 = 0x90;
pub const VOLTAGE_PS: u8 = 0x88;
pub const POWER_PS: u8 = 0xEE;
pub const VOLTAGE: u8 = 0x8B;
pub const CURRENT: u8 = 0x8C;
pub const POWER: u8 = 0x96;

pub const VENDOR: u8 = 0x99;
pub const PRODUCT: u8 = 0x9A;
pub const UPTIME: u8 = 0xD1;
pub const PC_UPTIME: u8 = 0xD2;
