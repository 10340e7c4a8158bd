//! Register reads and channel-selected reads.

use crate::{
    channel::{CommandBuffer, Frame, Transaction, Transport},
    cmd,
    error::map_status,
    Error, HID_REPORT_LEN,
};

/// Response header: status byte and one kind-dependent byte.
const RESPONSE_BYTES: usize = 2;

/// Outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `[opcode, register]`
    Read { opcode: u8, register: u8 },
    /// `[WRITE, register, value]`
    Write { register: u8, value: u8 },
}

impl Command {
    /// Read a register.
    pub const fn read(register: u8) -> Self {
        Command::Read {
            opcode: cmd::READ,
            register,
        }
    }

    /// Query the device name.
    pub const fn identify() -> Self {
        Command::Read {
            opcode: cmd::IDENTIFY,
            register: cmd::NAME,
        }
    }

    /// Set the device side cursor for the next read.
    pub const fn select(register: u8, channel: u8) -> Self {
        Command::Write {
            register,
            value: channel,
        }
    }

    pub(crate) fn encode_into(self, buf: &mut CommandBuffer) -> Result<(), Error> {
        buf.clear();
        match self {
            Command::Read { opcode, register } => {
                buf.push(opcode)?;
                buf.push(register)?;
            }
            Command::Write { register, value } => {
                buf.push(cmd::WRITE)?;
                buf.push(register)?;
                buf.push(value)?;
            }
        }
        Ok(())
    }
}

/// Value bytes 2 and 3 of a response, in the order received.
///
/// Byte order depends on the sensor, the caller picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawValue(pub [u8; 2]);

impl RawValue {
    /// Byte 2 low, byte 3 high.
    pub const fn le(self) -> u16 {
        u16::from_le_bytes(self.0)
    }

    /// Byte 2 high, byte 3 low.
    pub const fn be(self) -> u16 {
        u16::from_be_bytes(self.0)
    }
}

impl<T: Transport> Transaction<'_, T> {
    /// Send `command`, wait for the response and check its status.
    ///
    /// Returns the whole response frame.
    pub fn request(&mut self, command: Command) -> Result<&Frame, Error> {
        self.execute(command, true)?;
        map_status(self.buffer()[0])?;
        Ok(self.buffer())
    }

    /// Read a single register.
    pub fn read_register(&mut self, register: u8) -> Result<RawValue, Error> {
        let frame = self.request(Command::read(register))?;
        Ok(RawValue([frame[2], frame[3]]))
    }

    /// Select `channel` with a write to `select`, then read `register`.
    ///
    /// Both transactions run under this transaction's lock. The status of the
    /// select is not checked; a send failure or timeout aborts before the read.
    pub fn select_and_read(
        &mut self,
        select: u8,
        channel: u8,
        register: u8,
    ) -> Result<RawValue, Error> {
        self.execute(Command::select(select, channel), true)?;
        let status = self.buffer()[0];
        if status != 0 {
            tracing::debug!(status, channel, "channel select not acknowledged");
        }
        self.read_register(register)
    }
}

/// NUL terminated string following the response header, at most `max` bytes.
pub(crate) fn payload_string(frame: &Frame, max: usize) -> String {
    let end = (RESPONSE_BYTES + max).min(HID_REPORT_LEN);
    let payload = &frame[RESPONSE_BYTES..end];
    let null_term: usize = payload.iter().position(|x| *x == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..null_term]).to_string()
}

pub(crate) fn payload_u32(frame: &Frame) -> u32 {
    u32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]])
}
