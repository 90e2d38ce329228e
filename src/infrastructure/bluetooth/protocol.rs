//! Felicita Arc Protocol
//!
//! The scale exposes a single GATT characteristic that carries telemetry
//! notifications in one direction and one-byte control commands in the
//! other.

use crate::domain::models::{ScaleCommand, ScaleReading, WeightUnit};
use anyhow::{Context, Result};
use thiserror::Error;
use uuid::Uuid;

/// Felicita Arc BLE Service UUID (16-bit `FFE0` on the Bluetooth base UUID)
pub const SERVICE_UUID: &str = "0000ffe0-0000-1000-8000-00805f9b34fb";

/// Telemetry/command characteristic UUID (16-bit `FFE1`)
pub const CHAR_UUID: &str = "0000ffe1-0000-1000-8000-00805f9b34fb";

/// Advertised name of the scale, used as a discovery fallback when an
/// advertisement does not carry the service UUID.
pub const DEVICE_NAME: &str = "FELICITA";

/// Telemetry frames are always exactly this long.
pub const FRAME_LEN: usize = 18;

/// Raw battery band reported by old-style firmware. The device sends a value
/// between these bounds which maps linearly onto 0..=100 percent.
pub const MIN_BATTERY_RAW: u8 = 129;
pub const MAX_BATTERY_RAW: u8 = 158;

/// Wire byte for a control command, written to [`CHAR_UUID`].
pub fn command_byte(command: ScaleCommand) -> u8 {
    match command {
        ScaleCommand::StartTimer => 0x52,
        ScaleCommand::StopTimer => 0x53,
        ScaleCommand::ResetTimer => 0x43,
        ScaleCommand::Tare => 0x54,
        ScaleCommand::ToggleUnit => 0x55,
        ScaleCommand::TogglePrecision => 0x44,
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame length {0} (expected {FRAME_LEN})")]
    BadLength(usize),
    #[error("weight field contains non-digit byte {0:#04x}")]
    BadWeightDigit(u8),
}

/// Decode an 18-byte telemetry frame.
///
/// # Frame layout
///
/// ```text
/// [3..9]  : weight as six ASCII digits, value / 100 in the active unit
/// [9..11] : unit tag, UTF-8, "g" (space padded) or "oz"
/// [15]    : battery level; raw 129..=158 band on old-style firmware,
///           plain percent on new-style firmware
/// ```
///
/// An unrecognized unit tag keeps `last_unit`, matching the scale's habit of
/// sending garbage in that span for a few frames right after a unit switch.
pub fn decode_frame(
    data: &[u8],
    new_style: bool,
    last_unit: WeightUnit,
) -> Result<ScaleReading, FrameError> {
    if data.len() != FRAME_LEN {
        return Err(FrameError::BadLength(data.len()));
    }

    let mut digits: u32 = 0;
    for &byte in &data[3..9] {
        if !byte.is_ascii_digit() {
            return Err(FrameError::BadWeightDigit(byte));
        }
        digits = digits * 10 + u32::from(byte - b'0');
    }
    let weight = f64::from(digits) / 100.0;

    let unit = std::str::from_utf8(&data[9..11])
        .ok()
        .map(str::trim)
        .and_then(WeightUnit::from_frame)
        .unwrap_or(last_unit);

    Ok(ScaleReading {
        weight,
        unit,
        battery_percent: decode_battery(data[15], new_style),
    })
}

/// Map the raw battery byte to a 0..=100 percentage.
pub fn decode_battery(raw: u8, new_style: bool) -> u8 {
    if new_style {
        return raw.min(100);
    }

    let span = f64::from(MAX_BATTERY_RAW - MIN_BATTERY_RAW);
    let percent = (f64::from(raw) - f64::from(MIN_BATTERY_RAW)) / span * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

/// Parse a UUID string such as a settings override.
pub fn parse_uuid(uuid_str: &str) -> Result<Uuid> {
    Uuid::parse_str(uuid_str).with_context(|| format!("invalid UUID: {uuid_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a frame with the given weight digits, unit tag and battery byte.
    fn frame(digits: &[u8; 6], unit: &[u8; 2], battery: u8) -> Vec<u8> {
        let mut data = vec![0u8; FRAME_LEN];
        data[3..9].copy_from_slice(digits);
        data[9..11].copy_from_slice(unit);
        data[15] = battery;
        data
    }

    #[test]
    fn test_decode_weight_and_unit() {
        let data = frame(b"001802", b"g ", 150);
        let reading = decode_frame(&data, false, WeightUnit::default()).unwrap();
        assert_eq!(reading.weight, 18.02);
        assert_eq!(reading.unit, WeightUnit::Grams);
    }

    #[test]
    fn test_decode_ounces() {
        let data = frame(b"000063", b"oz", 150);
        let reading = decode_frame(&data, false, WeightUnit::Grams).unwrap();
        assert_eq!(reading.weight, 0.63);
        assert_eq!(reading.unit, WeightUnit::Ounces);
    }

    #[test]
    fn test_unknown_unit_keeps_last() {
        let data = frame(b"012345", &[0xFF, 0xFF], 150);
        let reading = decode_frame(&data, false, WeightUnit::Ounces).unwrap();
        assert_eq!(reading.unit, WeightUnit::Ounces);
        assert_eq!(reading.weight, 123.45);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            decode_frame(&[0u8; 17], false, WeightUnit::default()),
            Err(FrameError::BadLength(17))
        );
        assert_eq!(
            decode_frame(&[0u8; 20], false, WeightUnit::default()),
            Err(FrameError::BadLength(20))
        );
    }

    #[test]
    fn test_rejects_non_digit_weight() {
        let data = frame(b"00:802", b"g ", 150);
        assert_eq!(
            decode_frame(&data, false, WeightUnit::default()),
            Err(FrameError::BadWeightDigit(b':'))
        );
    }

    #[test]
    fn test_battery_band_old_style() {
        assert_eq!(decode_battery(MIN_BATTERY_RAW, false), 0);
        assert_eq!(decode_battery(MAX_BATTERY_RAW, false), 100);
        // Midpoint of the band.
        assert_eq!(decode_battery(144, false), 52);
        // Out-of-band values clamp instead of wrapping.
        assert_eq!(decode_battery(0, false), 0);
        assert_eq!(decode_battery(255, false), 100);
    }

    #[test]
    fn test_battery_percent_new_style() {
        assert_eq!(decode_battery(87, true), 87);
        assert_eq!(decode_battery(250, true), 100);
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(command_byte(ScaleCommand::Tare), 0x54);
        assert_eq!(command_byte(ScaleCommand::StartTimer), 0x52);
        assert_eq!(command_byte(ScaleCommand::StopTimer), 0x53);
        assert_eq!(command_byte(ScaleCommand::ResetTimer), 0x43);
        assert_eq!(command_byte(ScaleCommand::ToggleUnit), 0x55);
    }

    #[test]
    fn test_parse_uuid() {
        let uuid = parse_uuid(SERVICE_UUID).unwrap();
        assert_eq!(uuid.as_fields().0, 0x0000ffe0);
        assert!(parse_uuid("not-a-uuid").is_err());
    }
}
