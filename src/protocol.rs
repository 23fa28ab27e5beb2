//! AMH200-FOS serial protocol
//!
//! Protocol Overview:
//! - Format: ASCII, one command per line, carriage-return terminated
//! - Command: `LIGHT,<level>` where level is 0 (off) or 1-100 (intensity in percent)
//! - Reply: `R...` on success, `E,<code>` when the device rejects the command
//! - Timing: half-duplex request-response, one reply per command
//!
//! Encoding and decoding are pure; terminators are added and stripped by the
//! transport layer.

/// Terminator appended to every command.
pub const COMMAND_TERMINATOR: &str = "\r";
/// Terminator that ends every reply line.
pub const REPLY_TERMINATOR: &str = "\r";

/// Lowest intensity the device accepts while lit.
pub const MIN_INTENSITY: u8 = 1;
/// Highest intensity the device accepts.
pub const MAX_INTENSITY: u8 = 100;
/// Intensity used until the caller picks one.
pub const DEFAULT_INTENSITY: u8 = 100;

const COMMAND_PREFIX: &str = "LIGHT,";

/// Parsed device reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Command acknowledged.
    Ack,
    /// Device rejected the command with the given raw code.
    DeviceError(i32),
    /// Reply matched no known format.
    Malformed(String),
}

/// Build the command that drives the light to `intensity`, or off when `open` is false.
///
/// The caller guarantees `intensity` is within range.
pub fn encode(open: bool, intensity: u8) -> String {
    let level = if open { intensity } else { 0 };
    format!("{COMMAND_PREFIX}{level}")
}

/// Classify a terminator-free reply line.
pub fn decode(raw: &str) -> CommandReply {
    if raw.starts_with('R') {
        return CommandReply::Ack;
    }

    // "E,<code>": the code starts at byte 2 regardless of the separator
    if raw.starts_with('E') && raw.len() > 2 {
        if let Some(code) = raw.get(2..).and_then(|s| s.trim().parse::<i32>().ok()) {
            return CommandReply::DeviceError(code);
        }
    }

    CommandReply::Malformed(raw.to_string())
}

/// True if `level` is a valid lit intensity.
pub fn intensity_in_range(level: u8) -> bool {
    (MIN_INTENSITY..=MAX_INTENSITY).contains(&level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_open_uses_intensity() {
        for i in MIN_INTENSITY..=MAX_INTENSITY {
            assert_eq!(encode(true, i), format!("LIGHT,{}", i));
        }
    }

    #[test]
    fn test_encode_closed_is_zero() {
        assert_eq!(encode(false, 1), "LIGHT,0");
        assert_eq!(encode(false, 57), "LIGHT,0");
        assert_eq!(encode(false, 100), "LIGHT,0");
    }

    #[test]
    fn test_decode_ack() {
        assert_eq!(decode("R"), CommandReply::Ack);
        // Anything after the leading R is ignored
        assert_eq!(decode("READY"), CommandReply::Ack);
    }

    #[test]
    fn test_decode_device_error() {
        assert_eq!(decode("E,12"), CommandReply::DeviceError(12));
        assert_eq!(decode("E,5"), CommandReply::DeviceError(5));
        assert_eq!(decode("E:7"), CommandReply::DeviceError(7));
        assert_eq!(decode("E,-3"), CommandReply::DeviceError(-3));
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode("E"), CommandReply::Malformed("E".into()));
        assert_eq!(decode("E,"), CommandReply::Malformed("E,".into()));
        assert_eq!(decode(""), CommandReply::Malformed(String::new()));
        assert_eq!(decode("X,5"), CommandReply::Malformed("X,5".into()));
        assert_eq!(decode("E,abc"), CommandReply::Malformed("E,abc".into()));
        // Lowercase is not part of the protocol
        assert_eq!(decode("r"), CommandReply::Malformed("r".into()));
    }

    #[test]
    fn test_decode_non_ascii_does_not_panic() {
        assert!(matches!(decode("Eé5"), CommandReply::Malformed(_)));
    }

    #[test]
    fn test_intensity_bounds() {
        assert!(!intensity_in_range(0));
        assert!(intensity_in_range(1));
        assert!(intensity_in_range(100));
        assert!(!intensity_in_range(101));
    }
}
