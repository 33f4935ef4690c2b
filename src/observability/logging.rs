//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Map configured level names onto tracing levels
//! - Render payloads as hex dumps for debug output
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set
//! - Every session logs inside a `client` span carrying the peer address

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bytes rendered per hex dump row.
const DUMP_ROW: usize = 16;

/// Map a configured level onto a tracing filter directive.
///
/// Accepts tracing's own names as well as the classic
/// `NOTSET`/`DEBUG`/`INFO`/`WARNING`/`ERROR`/`CRITICAL` set, case-insensitive.
pub fn normalize_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" | "notset" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        _ => None,
    }
}

/// Install the global subscriber. Call once, from the binary.
pub fn init_logging(level: &str) {
    let directive = normalize_level(level).unwrap_or("info");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Render `data` as offset / hex / ASCII rows, 16 bytes per row.
///
/// ```text
/// 0000   48 65 6C 6C 6F 00                                  Hello.
/// ```
pub fn hex_dump(data: &[u8]) -> String {
    data.chunks(DUMP_ROW)
        .enumerate()
        .map(|(row, bytes)| {
            let hex = bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let text: String = bytes
                .iter()
                .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
                .collect();
            format!(
                "{:04X}   {:<width$}   {}",
                row * DUMP_ROW,
                hex,
                text,
                width = DUMP_ROW * 3
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_level_names() {
        assert_eq!(normalize_level("WARNING"), Some("warn"));
        assert_eq!(normalize_level("CRITICAL"), Some("error"));
        assert_eq!(normalize_level("NOTSET"), Some("trace"));
        assert_eq!(normalize_level(" Debug "), Some("debug"));
        assert_eq!(normalize_level("loud"), None);
    }

    #[test]
    fn dump_single_row() {
        let dump = hex_dump(b"AB\x00");
        assert_eq!(dump, format!("0000   {:<48}   AB.", "41 42 00"));
    }

    #[test]
    fn dump_wraps_every_sixteen_bytes() {
        let data: Vec<u8> = (0x30..0x41).collect();
        let dump = hex_dump(&data);
        let rows: Vec<&str> = dump.lines().collect();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0000   30 31 32"));
        assert!(rows[0].ends_with("0123456789:;<=>?"));
        assert_eq!(rows[1], format!("0010   {:<48}   @", "40"));
    }

    #[test]
    fn dump_of_nothing_is_empty() {
        assert_eq!(hex_dump(&[]), "");
    }
}
