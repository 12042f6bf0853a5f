//! Generic record-container codec.
//!
//! DCF, DGO, DSP and SAR files share one shape: preamble, body header with a
//! timestamp and a record count, then exactly that many records in order.
//! A family plugs in by implementing [`Record`] for its element and
//! [`Container`] for the list; the read/write/open/save entry points are
//! provided.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::error::{FormatError, Result};
use crate::header::{ContainerHeader, FamilyFormat, LegacyLayout, Opened};
use crate::wire::count_u32;

/// One element of a container.
pub trait Record: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self>;
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

/// A timestamped list of records with a family preamble.
pub trait Container: Sized {
    type Item: Record;

    const FORMAT: &'static FamilyFormat;

    fn timestamp(&self) -> u64;
    fn items(&self) -> &[Self::Item];
    fn assemble(timestamp: u64, items: Vec<Self::Item>) -> Self;

    /// Rebuild from a headerless layout.  The stream is positioned at the
    /// payload.  Families without legacy layouts never reach this.
    fn migrate<R: Read>(layout: &LegacyLayout, _reader: &mut R) -> Result<Self> {
        Err(FormatError::MagicMismatch {
            family:   Self::FORMAT.name,
            expected: Self::FORMAT.magic_str(),
            found:    layout.name.to_string(),
        })
    }

    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        match Self::FORMAT.open(reader)? {
            Opened::Legacy(layout) => Self::migrate(layout, reader),
            Opened::Headered { version, generation } => {
                let header = ContainerHeader::read_body(&mut *reader, version, generation)?;
                let items = read_records(reader, header.count)?;
                Ok(Self::assemble(header.timestamp, items))
            }
        }
    }

    /// Always writes the current generation.
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let items = self.items();
        let count = count_u32(Self::FORMAT.name, items.len())?;
        ContainerHeader::write(Self::FORMAT, self.timestamp(), count, &mut *writer)?;
        write_records(writer, items)
    }

    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Decode exactly `count` records.  A stream that ends early fails with
/// [`FormatError::UnexpectedEndOfStream`].
pub fn read_records<R: Read, T: Record>(reader: &mut R, count: u32) -> Result<Vec<T>> {
    // Cap the pre-allocation: the count comes straight off disk.
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        out.push(T::decode(reader)?);
    }
    Ok(out)
}

pub fn write_records<W: Write, T: Record>(writer: &mut W, items: &[T]) -> Result<()> {
    for item in items {
        item.encode(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
    use std::io::Cursor;

    use crate::header::{Generation, LegacyLayout};

    #[derive(Debug, PartialEq)]
    struct Num(u16);

    impl Record for Num {
        fn decode<R: Read>(reader: &mut R) -> Result<Self> {
            Ok(Num(reader.read_u16::<LittleEndian>()?))
        }
        fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
            writer.write_u16::<LittleEndian>(self.0)?;
            Ok(())
        }
    }

    const NUMS: FamilyFormat = FamilyFormat {
        name:             "NUM",
        magic:            *b"NUMl",
        version:          2.0,
        previous_version: 1.0,
        legacy:           &[LegacyLayout { name: "pair", size: 4, skip: 0 }],
    };

    #[derive(Debug, PartialEq)]
    struct Nums {
        ts:    u64,
        items: Vec<Num>,
    }

    impl Container for Nums {
        type Item = Num;
        const FORMAT: &'static FamilyFormat = &NUMS;

        fn timestamp(&self) -> u64 {
            self.ts
        }
        fn items(&self) -> &[Num] {
            &self.items
        }
        fn assemble(ts: u64, items: Vec<Num>) -> Self {
            Nums { ts, items }
        }
    }

    #[test]
    fn write_then_read() {
        let nums = Nums { ts: 99, items: vec![Num(1), Num(2), Num(3)] };
        let mut buf = Vec::new();
        nums.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 12 + 6);
        let back = Nums::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, nums);
    }

    #[test]
    fn previous_generation_body() {
        let mut buf = b"NUMl".to_vec();
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.extend_from_slice(&5u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&7u16.to_le_bytes());
        assert_eq!(NUMS.generation(1.0), Generation::Previous);
        let back = Nums::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, Nums { ts: 5, items: vec![Num(7)] });
    }

    #[test]
    fn truncated_record_list_fails() {
        let nums = Nums { ts: 1, items: vec![Num(1), Num(2)] };
        let mut buf = Vec::new();
        nums.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        let err = Nums::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
    }

    #[test]
    fn legacy_without_migrator_is_mismatch() {
        let err = Nums::read(&mut Cursor::new(vec![0u8; 4])).unwrap_err();
        assert!(matches!(err, FormatError::MagicMismatch { family: "NUM", .. }));
    }
}
