//! Versioned container preamble shared by every file family.
//!
//! # Layout
//! ```text
//! [4-byte magic][f32 version][body header...]
//! ```
//! The body header shape depends on the stored version.  Each family names
//! one older generation by its version number; a stored version within
//! [`VERSION_TOLERANCE`] of it selects the older shape, anything else the
//! current one.  Writers always emit the current generation.
//!
//! # Headerless files
//! Tools predating the preamble wrote raw dumps.  When the magic does not
//! match, the remaining stream length is compared against the family's
//! table of [`LegacyLayout`] sizes; only an exact match is accepted.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;

use crate::error::{FormatError, Result};

/// Magic + version.
pub const PREAMBLE_SIZE: u64 = 8;
/// Absolute tolerance used when matching a stored version.
pub const VERSION_TOLERANCE: f64 = 0.1;

/// Seconds since the epoch, used for new and migrated containers.
pub fn now_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// 32-bit timestamp body header.
    Previous,
    /// 64-bit timestamp body header.
    Current,
}

/// A headerless layout recognised purely by total byte length.
#[derive(Debug, PartialEq, Eq)]
pub struct LegacyLayout {
    pub name: &'static str,
    pub size: u64,
    /// Bytes of unused preamble before the payload.
    pub skip: u64,
}

/// Per-family format constants.
#[derive(Debug)]
pub struct FamilyFormat {
    pub name:             &'static str,
    pub magic:            [u8; 4],
    pub version:          f32,
    pub previous_version: f64,
    pub legacy:           &'static [LegacyLayout],
}

/// Outcome of probing the start of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opened {
    Headered { version: f32, generation: Generation },
    /// Stream is positioned at the start of the legacy payload.
    Legacy(&'static LegacyLayout),
}

impl FamilyFormat {
    pub fn generation(&self, version: f32) -> Generation {
        if (version as f64 - self.previous_version).abs() <= VERSION_TOLERANCE {
            Generation::Previous
        } else {
            Generation::Current
        }
    }

    pub fn magic_str(&self) -> String {
        String::from_utf8_lossy(&self.magic).into_owned()
    }

    pub fn write_preamble<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_f32::<LittleEndian>(self.version)?;
        Ok(())
    }

    /// Read the preamble, or route to a legacy layout by stream length.
    pub fn open<R: Read + Seek>(&self, reader: &mut R) -> Result<Opened> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;
        let remaining = end.saturating_sub(start);

        let mut magic = [0u8; 4];
        if remaining >= PREAMBLE_SIZE {
            reader.read_exact(&mut magic)?;
            let version = reader.read_f32::<LittleEndian>()?;
            if magic == self.magic {
                let generation = self.generation(version);
                tracing::debug!(family = self.name, version, ?generation, "container header");
                return Ok(Opened::Headered { version, generation });
            }
            reader.seek(SeekFrom::Start(start))?;
        }

        if let Some(layout) = self.legacy.iter().find(|l| l.size == remaining) {
            tracing::debug!(family = self.name, layout = layout.name, size = remaining, "legacy layout");
            reader.seek(SeekFrom::Start(start + layout.skip))?;
            return Ok(Opened::Legacy(layout));
        }

        if remaining < PREAMBLE_SIZE {
            return Err(FormatError::UnexpectedEndOfStream);
        }
        Err(FormatError::MagicMismatch {
            family:   self.name,
            expected: self.magic_str(),
            found:    String::from_utf8_lossy(&magic).into_owned(),
        })
    }
}

/// Body header shared by the DCF, DGO, DSP and SAR families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerHeader {
    pub version:    f32,
    pub generation: Generation,
    pub timestamp:  u64,
    pub count:      u32,
}

impl ContainerHeader {
    pub fn read_body<R: Read>(mut reader: R, version: f32, generation: Generation) -> Result<Self> {
        let timestamp = match generation {
            Generation::Previous => reader.read_u32::<LittleEndian>()? as u64,
            Generation::Current  => reader.read_u64::<LittleEndian>()?,
        };
        let count = reader.read_u32::<LittleEndian>()?;
        Ok(Self { version, generation, timestamp, count })
    }

    /// Write preamble and current-generation body.
    pub fn write<W: Write>(family: &FamilyFormat, timestamp: u64, count: u32, mut writer: W) -> Result<()> {
        family.write_preamble(&mut writer)?;
        writer.write_u64::<LittleEndian>(timestamp)?;
        writer.write_u32::<LittleEndian>(count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TEST: FamilyFormat = FamilyFormat {
        name:             "TEST",
        magic:            *b"TSTl",
        version:          1.2,
        previous_version: 1.1,
        legacy:           &[LegacyLayout { name: "raw", size: 20, skip: 4 }],
    };

    fn preamble(magic: &[u8; 4], version: f32) -> Vec<u8> {
        let mut buf = magic.to_vec();
        buf.extend_from_slice(&version.to_le_bytes());
        buf
    }

    #[test]
    fn version_tolerance() {
        assert_eq!(TEST.generation(1.05), Generation::Previous);
        assert_eq!(TEST.generation(1.1), Generation::Previous);
        assert_eq!(TEST.generation(1.3), Generation::Current);
        assert_eq!(TEST.generation(1.2), Generation::Current);
    }

    #[test]
    fn headered_stream_is_left_at_body() {
        let mut buf = preamble(b"TSTl", 1.2);
        buf.extend_from_slice(&[0xAA; 12]);
        let mut cur = Cursor::new(buf);
        let opened = TEST.open(&mut cur).unwrap();
        assert_eq!(opened, Opened::Headered { version: 1.2, generation: Generation::Current });
        assert_eq!(cur.position(), PREAMBLE_SIZE);
    }

    #[test]
    fn legacy_is_routed_by_exact_size() {
        let mut cur = Cursor::new(vec![7u8; 20]);
        match TEST.open(&mut cur).unwrap() {
            Opened::Legacy(layout) => assert_eq!(layout.name, "raw"),
            other => panic!("expected legacy, got {other:?}"),
        }
        assert_eq!(cur.position(), 4);
    }

    #[test]
    fn wrong_magic_and_size_is_mismatch() {
        let mut cur = Cursor::new(vec![7u8; 21]);
        let err = TEST.open(&mut cur).unwrap_err();
        assert!(matches!(err, FormatError::MagicMismatch { family: "TEST", .. }));
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut cur = Cursor::new(Vec::new());
        assert!(matches!(TEST.open(&mut cur).unwrap_err(), FormatError::UnexpectedEndOfStream));
    }

    #[test]
    fn body_shapes() {
        let mut v1 = Vec::new();
        v1.extend_from_slice(&7u32.to_le_bytes());
        v1.extend_from_slice(&3u32.to_le_bytes());
        let h = ContainerHeader::read_body(&v1[..], 1.1, Generation::Previous).unwrap();
        assert_eq!((h.timestamp, h.count), (7, 3));

        let mut out = Vec::new();
        ContainerHeader::write(&TEST, 1_500_000_000_000, 2, &mut out).unwrap();
        assert_eq!(out.len(), 8 + 12);
        let h = ContainerHeader::read_body(&out[8..], 1.2, Generation::Current).unwrap();
        assert_eq!((h.timestamp, h.count), (1_500_000_000_000, 2));
    }
}
