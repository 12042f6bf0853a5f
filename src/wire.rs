//! Low-level field helpers shared by every record codec.
//!
//! # Text fields
//! Text is never length-prefixed.  Each field occupies a fixed number of
//! bytes; encode NUL-pads, decode cuts at the first NUL and trims trailing
//! spaces (C tools left garbage after the terminator, Ruby tools padded with
//! spaces).
//!
//! # Endianness
//! All numbers are little-endian.

use std::io::{Read, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{FormatError, Result};

/// Write `value` into a `width`-byte NUL-padded field.
pub fn write_text<W: Write>(
    mut writer: W,
    field: &'static str,
    value: &str,
    width: usize,
) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        return Err(FormatError::FieldTooLong { field, width, len: bytes.len() });
    }
    writer.write_all(bytes)?;
    writer.write_all(&vec![0u8; width - bytes.len()])?;
    Ok(())
}

/// Read a `width`-byte text field.
pub fn read_text<R: Read>(mut reader: R, width: usize) -> Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    Ok(trim_text(&buf))
}

pub fn trim_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = &raw[..end];
    let end = text.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    String::from_utf8_lossy(&text[..end]).into_owned()
}

/// Bytes taken by `count` elements of `width` bytes.  Both come off disk,
/// and no stream can hold a length that overflows `usize`.
pub fn byte_len(width: usize, count: usize) -> Result<usize> {
    width.checked_mul(count).ok_or(FormatError::UnexpectedEndOfStream)
}

/// A length as the u32 count the record headers carry.
pub fn count_u32(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FormatError::CountOverflow { field, len })
}

/// Read exactly `len` bytes.  The buffer grows with the data actually read,
/// so a corrupt length fails on a short stream without allocating it first.
pub fn read_bytes<R: Read>(reader: R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(FormatError::UnexpectedEndOfStream);
    }
    Ok(buf)
}

/// Read `count` signed 16-bit samples.
pub fn read_i16s<R: Read>(reader: R, count: usize) -> Result<Vec<i16>> {
    let raw = read_bytes(reader, byte_len(2, count)?)?;
    Ok(raw
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

pub fn write_i16s<W: Write>(mut writer: W, values: &[i16]) -> Result<()> {
    for v in values {
        writer.write_i16::<LittleEndian>(*v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn text_is_nul_padded() {
        let mut buf = Vec::new();
        write_text(&mut buf, "name", "V5", 8).unwrap();
        assert_eq!(buf, b"V5\0\0\0\0\0\0");
    }

    #[test]
    fn text_trims_spaces_and_garbage_after_nul() {
        assert_eq!(trim_text(b"II      "), "II");
        assert_eq!(trim_text(b"II\0junk!"), "II");
        assert_eq!(trim_text(b"        "), "");
    }

    #[test]
    fn text_exactly_width_needs_no_terminator() {
        let mut buf = Vec::new();
        write_text(&mut buf, "sym", "ABCDEFGH", 8).unwrap();
        assert_eq!(read_text(&buf[..], 8).unwrap(), "ABCDEFGH");
    }

    #[test]
    fn text_too_long_is_rejected() {
        let mut buf = Vec::new();
        let err = write_text(&mut buf, "sym", "ABCDEFGHI", 8).unwrap_err();
        assert!(matches!(err, FormatError::FieldTooLong { field: "sym", width: 8, len: 9 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn short_read_is_end_of_stream() {
        let err = read_text(&b"abc"[..], 8).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
    }

    #[test]
    fn huge_declared_length_is_end_of_stream() {
        let err = read_bytes(&b"abcd"[..], usize::MAX).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
        let err = read_i16s(&b"abcd"[..], usize::MAX).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
        assert_eq!(read_i16s(&[1u8, 0, 0xFF, 0xFF][..], 2).unwrap(), [1, -1]);
    }

    #[test]
    fn count_above_u32_is_rejected() {
        assert_eq!(count_u32("signals", 7).unwrap(), 7);
        let err = count_u32("signals", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, FormatError::CountOverflow { field: "signals", .. }));
    }

    proptest! {
        #[test]
        fn text_round_trips(s in "[A-Za-z0-9(),+-]{0,16}") {
            let mut buf = Vec::new();
            write_text(&mut buf, "name", &s, 16).unwrap();
            prop_assert_eq!(buf.len(), 16);
            prop_assert_eq!(read_text(&buf[..], 16).unwrap(), s);
        }
    }
}
