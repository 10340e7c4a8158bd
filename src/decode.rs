//! Device number format.
//!
//! Voltage, current and power registers hold a 16-bit value with a signed
//! 11-bit mantissa in the low bits and a signed 5-bit exponent in the high
//! bits.

const MANTISSA_MASK: u16 = 0x07FF;

/// Decode a raw register value into milli-units.
///
/// Odd mantissas are rounded up to the next even value before scaling.
///
/// # Example
///
/// ```
/// // mantissa 230, exponent -1
/// assert_eq!(corsairlink::decode::milli(0xF8E6), 115_000);
/// ```
#[must_use = "Why decode a value if you are not going to use the result?"]
pub fn milli(raw: u16) -> i64 {
    let mut fraction: i64 = i64::from(raw & MANTISSA_MASK);
    if fraction > 1023 {
        fraction = -(2048 - fraction);
    }
    if fraction & 1 == 1 {
        fraction += 1;
    }

    let mut exponent: i32 = i32::from(raw >> 11);
    if exponent > 15 {
        exponent = -(32 - exponent);
    }

    let result: i64 = fraction * 1000;
    if exponent > 0 {
        result * (1_i64 << exponent)
    } else {
        result / (1_i64 << -exponent)
    }
}
