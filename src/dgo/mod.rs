//! Diagnosis object (DGO) files.
//!
//! ```text
//! [DGOl][f32 1.1][u64 timestamp][u32 num_algorithms]
//! Algorithm  [name 64][sym 8][u32 num_diagnoses]
//!   Diagnosis  [name 64][sym 8][i32 positive][i32 type][u32 size][u32 num_refs]
//!              [payload: size bytes]
//!     Ref        [i32 type][source 64][component 64][item 64][f32 weight]
//! ```
//! Unlike DCF, the diagnosis record carries an explicit payload size, so
//! variable-width values (text results) are allowed.

pub mod catalog;

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::container::{read_records, write_records, Container, Record};
use crate::error::{FormatError, Result};
use crate::header::FamilyFormat;
use crate::json::JsonMirror;
use crate::value::{TableValue, TypeTag};
use crate::wire::{count_u32, read_text, write_text};

pub const FORMAT: FamilyFormat = FamilyFormat {
    name:             "DGO",
    magic:            *b"DGOl",
    version:          1.1,
    previous_version: 1.0,
    legacy:           &[],
};

pub const NAME_WIDTH: usize = 64;
pub const SYM_WIDTH: usize = 8;
pub const REF_FIELD_WIDTH: usize = 64;

pub const ALGORITHM_SIZE: usize = NAME_WIDTH + SYM_WIDTH + 4;
pub const DIAGNOSIS_SIZE: usize = NAME_WIDTH + SYM_WIDTH + 4 * 4;
pub const REF_SIZE: usize = 4 + 3 * REF_FIELD_WIDTH + 4;

// ── Ref ──────────────────────────────────────────────────────────────────────

/// What kind of evidence a [`Ref`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefType {
    Dcf,
    Index,
    IntData,
    Diagnosis,
    Misc,
}

impl RefType {
    const ALL: [RefType; 5] = [
        RefType::Dcf,
        RefType::Index,
        RefType::IntData,
        RefType::Diagnosis,
        RefType::Misc,
    ];

    pub fn from_wire(ordinal: i32) -> Result<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(FormatError::UnknownTypeTag { registry: "dgo ref", ordinal: ordinal as i64 })
    }

    pub fn ordinal(self) -> i32 {
        self as i32
    }
}

/// Provenance of a diagnosis: which source/component/item contributed,
/// and by how much.  `weight` has no enforced range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    pub ref_type:  RefType,
    pub source:    String,
    pub component: String,
    pub item:      String,
    pub weight:    f32,
}

impl Ref {
    pub fn new(
        ref_type:  RefType,
        source:    impl Into<String>,
        component: impl Into<String>,
        item:      impl Into<String>,
        weight:    f32,
    ) -> Self {
        Self {
            ref_type,
            source: source.into(),
            component: component.into(),
            item: item.into(),
            weight,
        }
    }
}

impl Record for Ref {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let ref_type = RefType::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let source = read_text(&mut *reader, REF_FIELD_WIDTH)?;
        let component = read_text(&mut *reader, REF_FIELD_WIDTH)?;
        let item = read_text(&mut *reader, REF_FIELD_WIDTH)?;
        let weight = reader.read_f32::<LittleEndian>()?;
        Ok(Self { ref_type, source, component, item, weight })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.ref_type.ordinal())?;
        write_text(&mut *writer, "ref.source", &self.source, REF_FIELD_WIDTH)?;
        write_text(&mut *writer, "ref.component", &self.component, REF_FIELD_WIDTH)?;
        write_text(&mut *writer, "ref.item", &self.item, REF_FIELD_WIDTH)?;
        writer.write_f32::<LittleEndian>(self.weight)?;
        Ok(())
    }
}

// ── Diagnosis ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name:     String,
    pub sym:      String,
    pub positive: bool,
    pub value:    TableValue,
    pub refs:     Vec<Ref>,
}

impl Diagnosis {
    pub fn new(name: impl Into<String>, sym: impl Into<String>, positive: bool, value: TableValue) -> Self {
        Self { name: name.into(), sym: sym.into(), positive, value, refs: Vec::new() }
    }

    /// Build a catalogued diagnosis; the symbol comes from
    /// [`catalog::name_to_sym`].
    pub fn standard(name: &str, positive: bool, value: TableValue) -> Option<Self> {
        catalog::name_to_sym(name).map(|sym| Self::new(name, sym, positive, value))
    }

    /// Numeric result, if the value is a number.
    pub fn score(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.positive { '+' } else { '-' };
        write!(f, "{} ({}) {flag} {}", self.name, self.sym, self.value)
    }
}

impl Record for Diagnosis {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let name = read_text(&mut *reader, NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let positive = reader.read_i32::<LittleEndian>()? != 0;
        let tag = TypeTag::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let size = reader.read_u32::<LittleEndian>()? as usize;
        let num_refs = reader.read_u32::<LittleEndian>()?;

        let width = tag.width()?;
        if width != 0 && width != size {
            tracing::warn!(diagnosis = %name, code = tag.code(), size, width, "value size disagrees with type width");
        }
        let value = TableValue::read_payload(&mut *reader, tag, size)?;
        let refs = read_records(reader, num_refs)?;
        Ok(Self { name, sym, positive, value, refs })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "diagnosis.name", &self.name, NAME_WIDTH)?;
        write_text(&mut *writer, "diagnosis.sym", &self.sym, SYM_WIDTH)?;
        writer.write_i32::<LittleEndian>(self.positive as i32)?;
        writer.write_i32::<LittleEndian>(self.value.tag().0 as i32)?;
        writer.write_u32::<LittleEndian>(count_u32("diagnosis.size", self.value.data_size())?)?;
        writer.write_u32::<LittleEndian>(count_u32("diagnosis.refs", self.refs.len())?)?;
        self.value.write_payload(&mut *writer)?;
        write_records(writer, &self.refs)
    }
}

// ── Algorithm ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    pub name:      String,
    pub sym:       String,
    pub diagnoses: Vec<Diagnosis>,
}

impl Algorithm {
    pub fn new(name: impl Into<String>, sym: impl Into<String>) -> Self {
        Self { name: name.into(), sym: sym.into(), diagnoses: Vec::new() }
    }

    pub fn standard(name: &str) -> Option<Self> {
        catalog::algorithm_sym(name).map(|sym| Self::new(name, sym))
    }

    pub fn diagnosis(&self, sym: &str) -> Option<&Diagnosis> {
        self.diagnoses.iter().find(|d| d.sym == sym)
    }

    pub fn positives(&self) -> impl Iterator<Item = &Diagnosis> {
        self.diagnoses.iter().filter(|d| d.positive)
    }
}

impl Record for Algorithm {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let name = read_text(&mut *reader, NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let count = reader.read_u32::<LittleEndian>()?;
        let diagnoses = read_records(reader, count)?;
        Ok(Self { name, sym, diagnoses })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "algorithm.name", &self.name, NAME_WIDTH)?;
        write_text(&mut *writer, "algorithm.sym", &self.sym, SYM_WIDTH)?;
        writer.write_u32::<LittleEndian>(count_u32("algorithm.diagnoses", self.diagnoses.len())?)?;
        write_records(writer, &self.diagnoses)
    }
}

// ── Container ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dgo {
    pub timestamp:  u64,
    pub algorithms: Vec<Algorithm>,
}

impl Dgo {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp, algorithms: Vec::new() }
    }

    pub fn algorithm(&self, sym: &str) -> Option<&Algorithm> {
        self.algorithms.iter().find(|a| a.sym == sym)
    }
}

impl Container for Dgo {
    type Item = Algorithm;
    const FORMAT: &'static FamilyFormat = &FORMAT;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn items(&self) -> &[Algorithm] {
        &self.algorithms
    }

    fn assemble(timestamp: u64, algorithms: Vec<Algorithm>) -> Self {
        Self { timestamp, algorithms }
    }
}

impl JsonMirror for Dgo {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Dgo {
        let mut cad = Diagnosis::standard(catalog::LOCAL_ISCHEMIA, true, TableValue::float(0.75)).unwrap();
        cad.refs.push(Ref::new(RefType::Index, "V5", "aps", "main peak", 1.0));
        cad.refs.push(Ref::new(RefType::Dcf, "patient", "age", "Age", -0.25));
        let note = Diagnosis::new("Impression (text)", "IMPSTR", false, TableValue::text("ischemia suspected"));

        let mut algo = Algorithm::standard("MCG Primary Analysis").unwrap();
        algo.diagnoses.push(cad);
        algo.diagnoses.push(note);

        let mut dgo = Dgo::new(1_700_000_000_000);
        dgo.algorithms.push(algo);
        dgo.algorithms.push(Algorithm::standard("Clinical Review").unwrap());
        dgo
    }

    #[test]
    fn ref_is_fixed_size() {
        let mut buf = Vec::new();
        Ref::new(RefType::Misc, "a", "b", "c", 0.5).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), REF_SIZE);
        assert_eq!(REF_SIZE, 200);
    }

    #[test]
    fn nested_round_trip_preserves_order() {
        let dgo = sample();
        let mut buf = Vec::new();
        dgo.write(&mut buf).unwrap();

        let back = Dgo::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, dgo);
        let algo = back.algorithm("mcg-1").unwrap();
        assert_eq!(algo.diagnoses[0].refs[1].source, "patient");
        assert_eq!(algo.diagnosis("IMPSTR").unwrap().value.as_text().as_deref(), Some("ischemia suspected"));
        assert_eq!(algo.positives().count(), 1);
        assert!(back.algorithm("clinic").unwrap().diagnoses.is_empty());
    }

    #[test]
    fn diagnosis_size_field_covers_variable_payload() {
        let d = Diagnosis::new("x", "x", false, TableValue::text("abc"));
        let mut buf = Vec::new();
        d.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), DIAGNOSIS_SIZE + 3);
        let size = u32::from_le_bytes(buf[80..84].try_into().unwrap());
        assert_eq!(size, 3);
    }

    #[test]
    fn huge_declared_value_size_is_end_of_stream() {
        let d = Diagnosis::new("x", "x", false, TableValue::text("abc"));
        let mut buf = Vec::new();
        d.encode(&mut buf).unwrap();
        buf[80..84].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = Diagnosis::decode(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
    }

    #[test]
    fn unknown_ref_type_is_rejected() {
        let mut buf = Vec::new();
        Ref::new(RefType::Misc, "a", "b", "c", 0.5).encode(&mut buf).unwrap();
        buf[..4].copy_from_slice(&9i32.to_le_bytes());
        let err = Ref::decode(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnknownTypeTag { registry: "dgo ref", ordinal: 9 }));
    }

    #[test]
    fn previous_generation_header() {
        let dgo = sample();
        let mut current = Vec::new();
        dgo.write(&mut current).unwrap();

        // Rewrite as a 1.0 file: u32 timestamp, u32 count.
        let mut old = b"DGOl".to_vec();
        old.extend_from_slice(&1.0f32.to_le_bytes());
        old.extend_from_slice(&1234u32.to_le_bytes());
        old.extend_from_slice(&current[16..]);

        let back = Dgo::read(&mut Cursor::new(old)).unwrap();
        assert_eq!(back.timestamp, 1234);
        assert_eq!(back.algorithms, dgo.algorithms);
    }

    #[test]
    fn score_and_display() {
        let dgo = sample();
        let cad = dgo.algorithms[0].diagnosis("CAD").unwrap();
        assert_eq!(cad.score(), Some(0.75));
        assert_eq!(cad.to_string(), "Local Ischemia (CAD) + 0.75");
    }
}
