//! Disease Control Factor (DCF) lists.
//!
//! A DCF is a named patient attribute (sex, age, ...) used to weight
//! diagnoses.  The file is a flat list:
//!
//! ```text
//! [DCFl][f32 1.1][u64 timestamp][u32 count]
//! count × ( [name 64][sym 8][i32 type] [payload: table width] )
//! ```
//! The record has no size field, so only fixed-width value types can be
//! stored.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::container::{Container, Record};
use crate::error::{FormatError, Result};
use crate::header::FamilyFormat;
use crate::json::JsonMirror;
use crate::value::{TableValue, TypeTag};
use crate::wire::{read_text, write_text};

pub const FORMAT: FamilyFormat = FamilyFormat {
    name:             "DCF",
    magic:            *b"DCFl",
    version:          1.1,
    previous_version: 1.0,
    legacy:           &[],
};

pub const NAME_WIDTH: usize = 64;
pub const SYM_WIDTH: usize = 8;
/// Fixed prefix before the value payload.
pub const RECORD_SIZE: usize = NAME_WIDTH + SYM_WIDTH + 4;

pub const GENDER_NAME: &str = "gender";
pub const GENDER_SYM: &str = "Sex";
pub const GENDER_MALE: &str = "M";
pub const GENDER_FEMALE: &str = "F";
pub const AGE_NAME: &str = "age";
pub const AGE_SYM: &str = "Age";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dcf {
    pub name:  String,
    pub sym:   String,
    pub value: TableValue,
}

impl Dcf {
    pub fn new(name: impl Into<String>, sym: impl Into<String>, value: TableValue) -> Self {
        Self { name: name.into(), sym: sym.into(), value }
    }

    /// Standard sex factor; `value` is [`GENDER_MALE`] or [`GENDER_FEMALE`].
    pub fn gender(value: &str) -> Self {
        Self::new(GENDER_NAME, GENDER_SYM, TableValue::char(value))
    }

    pub fn age(years: u8) -> Self {
        Self::new(AGE_NAME, AGE_SYM, TableValue::uchar(years))
    }
}

impl fmt::Display for Dcf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}):{}", self.name, self.sym, self.value)
    }
}

impl Record for Dcf {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let name = read_text(&mut *reader, NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let tag = TypeTag::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let width = tag.width()?;
        if width == 0 {
            return Err(FormatError::UnsizedValue { family: FORMAT.name, code: tag.code() });
        }
        let value = TableValue::read_payload(reader, tag, width)?;
        Ok(Self { name, sym, value })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let tag = self.value.tag();
        if self.value.is_variable() {
            return Err(FormatError::UnsizedValue { family: FORMAT.name, code: tag.code() });
        }
        write_text(&mut *writer, "dcf.name", &self.name, NAME_WIDTH)?;
        write_text(&mut *writer, "dcf.sym", &self.sym, SYM_WIDTH)?;
        writer.write_i32::<LittleEndian>(tag.0 as i32)?;
        self.value.write_payload(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfList {
    pub timestamp: u64,
    pub dcfs:      Vec<Dcf>,
}

impl DcfList {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp, dcfs: Vec::new() }
    }

    pub fn find(&self, sym: &str) -> Option<&Dcf> {
        self.dcfs.iter().find(|d| d.sym == sym)
    }
}

impl Container for DcfList {
    type Item = Dcf;
    const FORMAT: &'static FamilyFormat = &FORMAT;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn items(&self) -> &[Dcf] {
        &self.dcfs
    }

    fn assemble(timestamp: u64, dcfs: Vec<Dcf>) -> Self {
        Self { timestamp, dcfs }
    }
}

impl JsonMirror for DcfList {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn sample() -> DcfList {
        let mut list = DcfList::new(1_500_000_000);
        list.dcfs.push(Dcf::new("float dcf", "fdcf", TableValue::float(1.0)));
        list.dcfs.push(Dcf::new("int dcf", "idcf", TableValue::int(-1)));
        list.dcfs.push(Dcf::gender(GENDER_MALE));
        list.dcfs.push(Dcf::age(42));
        list
    }

    #[test]
    fn char_value_is_one_byte_on_disk() {
        let mut buf = Vec::new();
        Dcf::gender(GENDER_FEMALE).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), RECORD_SIZE + 1);
        assert_eq!(buf[RECORD_SIZE], b'F');

        let back = Dcf::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back.value.as_text().as_deref(), Some("F"));
        assert_eq!(back.to_string(), "gender (Sex):F");
    }

    #[test]
    fn list_round_trip() {
        let list = sample();
        let mut buf = Vec::new();
        list.write(&mut buf).unwrap();
        assert_eq!(&buf[..4], b"DCFl");
        assert_eq!(buf.len(), 8 + 12 + 4 * RECORD_SIZE + 4 + 4 + 1 + 1);

        let back = DcfList::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, list);
        assert_eq!(back.find(AGE_SYM).and_then(|d| d.value.as_f64()), Some(42.0));
    }

    #[test]
    fn variable_width_value_is_refused() {
        let dcf = Dcf::new("notes", "n", TableValue::text("free text"));
        let err = dcf.encode(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, FormatError::UnsizedValue { family: "DCF", code: "a" }));
    }

    #[test]
    fn wrong_magic() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[..4].copy_from_slice(b"DGOl");
        let err = DcfList::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::MagicMismatch { family: "DCF", .. }));
    }

    #[test]
    fn json_mirror() {
        let list = sample();
        let text = list.to_json().unwrap();
        assert_eq!(DcfList::from_json(&text).unwrap(), list);
    }

    proptest! {
        #[test]
        fn numeric_factors_round_trip(ts in any::<u64>(), i in any::<i32>(), f in any::<f32>().prop_filter("nan", |f| !f.is_nan())) {
            let list = DcfList {
                timestamp: ts,
                dcfs: vec![
                    Dcf::new("i", "i", TableValue::int(i)),
                    Dcf::new("f", "f", TableValue::float(f)),
                ],
            };
            let mut buf = Vec::new();
            list.write(&mut buf).unwrap();
            prop_assert_eq!(DcfList::read(&mut Cursor::new(buf)).unwrap(), list);
        }
    }
}
