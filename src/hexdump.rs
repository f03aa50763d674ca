//! Renders binary buffers as an offset-annotated hex dump with an optional plain-text column.

use std::io::{self, Write};

/// Number of bytes shown per row.
pub const ROW_LENGTH: usize = 32;

/// Number of bytes per space-separated block within a row.
pub const BLOCK_LENGTH: usize = 8;

fn printable(byte: u8) -> char {
    if (0x20..=0x7e).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// Writes a hex dump of `data` to `out` and flushes it afterwards.
///
/// Every row starts with its offset into the buffer (at least four lowercase hex digits), followed
/// by up to 32 bytes in blocks of 8. With `with_ascii`, a text column is appended whose position
/// does not depend on the length of the row.
///
/// # Examples
///
/// ```rust
/// let mut out = Vec::new();
/// fx2prog::hexdump(&mut out, b"\x01\x02", false).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "  0x0000 0102\n");
/// ```
pub fn hexdump<W: Write>(out: &mut W, data: &[u8], with_ascii: bool) -> io::Result<()> {
    for (row, bytes) in data.chunks(ROW_LENGTH).enumerate() {
        let mut line = format!("  0x{:04x} ", row * ROW_LENGTH);

        for (i, byte) in bytes.iter().enumerate() {
            if i != 0 && i % BLOCK_LENGTH == 0 {
                line.push(' ');
            }
            line.push_str(&format!("{:02x}", byte));
        }

        if with_ascii {
            for i in bytes.len()..ROW_LENGTH {
                line.push_str(if i != 0 && i % BLOCK_LENGTH == 0 {
                    "   "
                } else {
                    "  "
                });
            }
            line.push_str("    ");
            line.extend(bytes.iter().copied().map(printable));
        }

        writeln!(out, "{}", line)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(data: &[u8], with_ascii: bool) -> String {
        let mut out = Vec::new();
        hexdump(&mut out, data, with_ascii).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sixteen_zero_bytes() {
        let expected = format!(
            "  0x0000 {} {}{}    {}\n",
            "00".repeat(8),
            "00".repeat(8),
            " ".repeat(34),
            ".".repeat(16)
        );
        assert_eq!(render(&[0; 16], true), expected);
    }

    #[test]
    fn full_row_without_text_column() {
        let data: Vec<u8> = (0..32).collect();
        assert_eq!(
            render(&data, false),
            "  0x0000 0001020304050607 08090a0b0c0d0e0f 1011121314151617 18191a1b1c1d1e1f\n"
        );
    }

    #[test]
    fn text_column_is_aligned() {
        let mut data = vec![b'A'; 32];
        data.extend_from_slice(b"Hi!\n");
        let output = render(&data, true);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  0x0000 "));
        assert!(lines[1].starts_with("  0x0020 4869210a"));
        assert_eq!(lines[0].find("AAAA"), lines[1].find("Hi!."));
        assert!(lines[1].ends_with("    Hi!."));
    }

    #[test]
    fn wide_offsets_are_not_truncated() {
        let data = vec![0xffu8; 0x10020];
        let output = render(&data, false);
        let last = output.lines().last().unwrap();
        assert!(last.starts_with("  0x10000 ffff"));
        assert_eq!(output.lines().count(), 0x10020 / ROW_LENGTH);
    }

    #[test]
    fn empty_buffer_renders_nothing() {
        assert_eq!(render(&[], true), "");
    }
}
