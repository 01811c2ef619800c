//! Utility functions and helpers
//!
//! Integer and hex parsing for command line values, wall-clock time and
//! logging setup.

use crate::config::LogFormat;
use crate::{Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging to stderr; `RUST_LOG` overrides `level`
pub fn init_logging(level: tracing::Level, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Parse `0x`-prefixed hex or plain decimal
pub fn parse_smart_int(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| Error::config(format!("Invalid integer '{}': {}", s, e)))
}

/// Parse a compact `bits` value
pub fn parse_bits(s: &str) -> Result<u32> {
    let value = parse_smart_int(s)?;
    u32::try_from(value)
        .map_err(|_| Error::config(format!("bits 0x{:x} do not fit in 32 bits", value)))
}

/// Decode a hex command line value, naming the option on failure
pub fn decode_hex_field(name: &str, s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| Error::config(format!("Invalid hex for {}: {}", name, e)))
}

/// Split a command string on whitespace
pub fn split_command(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Current Unix time in seconds, as stored in block headers
pub fn current_unix_time() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX)
}

/// Format duration as a human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_smart_int() {
        assert_eq!(parse_smart_int("0x1f07ffff").unwrap(), 0x1f07ffff);
        assert_eq!(parse_smart_int("0X10").unwrap(), 16);
        assert_eq!(parse_smart_int("520617983").unwrap(), 0x1f07ffff);
        assert_eq!(parse_smart_int(" 7 ").unwrap(), 7);
        assert_matches!(parse_smart_int("1f07ffff"), Err(Error::Config { .. }));
        assert_matches!(parse_smart_int("0xzz"), Err(Error::Config { .. }));
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("0x200f0f0f").unwrap(), 0x200f0f0f);
        assert!(parse_bits("0x100000000").is_err());
    }

    #[test]
    fn test_decode_hex_field() {
        assert_eq!(decode_hex_field("pubkey", "0x04ab").unwrap(), vec![0x04, 0xab]);
        let err = decode_hex_field("pubkey", "04a").unwrap_err();
        assert!(err.to_string().contains("pubkey"));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("  sa-solver --use 0\t-v "),
            vec!["sa-solver", "--use", "0", "-v"]
        );
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_current_unix_time() {
        // 2016-10-28, the Zcash genesis time
        assert!(current_unix_time() > 1_477_641_360);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m");
    }
}
