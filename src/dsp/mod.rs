//! Signal-processing output (DSP) files.
//!
//! A DSP file holds the output of processing a pair of leads: per-signal
//! operations (QRS template, power spectrum, amplitude histogram) and
//! signal-pair operations (cross spectrum, coherence, ...).
//!
//! ```text
//! [DSPl][f32 2.2][u64 timestamp][u32 num_ops]
//! Op  [source 64][u32 source type][name 32][sym 8][label 64][domain 32]
//!     [x axis 64][y axis 64][u32 num_elem][u32 elem_size]
//!     [num_elem × i16]
//! ```
//! Samples are always signed 16-bit.  `elem_size` is written as 2 and is
//! advisory on read.
//!
//! Headerless dumps from the acquisition firmware are recognised by size
//! and migrated, see [`legacy`].

pub mod legacy;
pub mod ops;

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::container::{Container, Record};
use crate::error::{FormatError, Result};
use crate::header::{now_timestamp, FamilyFormat, LegacyLayout};
use crate::json::JsonMirror;
use crate::wire::{count_u32, read_i16s, read_text, write_i16s, write_text};

pub use ops::StdOp;

pub const FORMAT: FamilyFormat = FamilyFormat {
    name:             "DSP",
    magic:            *b"DSPl",
    version:          2.2,
    previous_version: 2.1,
    legacy:           &legacy::LAYOUTS,
};

pub const SOURCE_WIDTH: usize = 64;
pub const NAME_WIDTH: usize = 32;
pub const SYM_WIDTH: usize = 8;
pub const LABEL_WIDTH: usize = 64;
pub const DOMAIN_WIDTH: usize = 32;
pub const AXIS_WIDTH: usize = 64;
pub const OP_SIZE: usize =
    SOURCE_WIDTH + 4 + NAME_WIDTH + SYM_WIDTH + LABEL_WIDTH + DOMAIN_WIDTH + 2 * AXIS_WIDTH + 4 + 4;

/// Sample width on disk.
pub const ELEMENT_SIZE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Unknown,
    Signal,
    SigPair,
    DspOp,
}

impl SourceType {
    const ALL: [SourceType; 4] = [SourceType::Unknown, SourceType::Signal, SourceType::SigPair, SourceType::DspOp];

    pub fn from_wire(ordinal: u32) -> Result<Self> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or(FormatError::UnknownTypeTag { registry: "dsp source", ordinal: ordinal as i64 })
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceType::Unknown => "Unknown",
            SourceType::Signal  => "Signal",
            SourceType::SigPair => "SigPair",
            SourceType::DspOp   => "DspOp",
        })
    }
}

// ── Op ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    pub source:   String,
    pub src_type: SourceType,
    pub name:     String,
    pub sym:      String,
    pub label:    String,
    pub domain:   String,
    pub x_axis:   String,
    pub y_axis:   String,
    pub data:     Vec<i16>,
}

impl Op {
    /// `name` followed by the source, unless `skip_pair` is set and the
    /// source is a pair label.
    pub fn fullname(&self, sep: &str, skip_pair: bool) -> String {
        qualify(&self.name, &self.source, sep, skip_pair)
    }

    pub fn fullsym(&self, sep: &str, skip_pair: bool) -> String {
        qualify(&self.sym, &self.source, sep, skip_pair)
    }
}

fn qualify(base: &str, source: &str, sep: &str, skip_pair: bool) -> String {
    if skip_pair && source.starts_with('(') {
        base.to_string()
    } else {
        format!("{base}{sep}{source}")
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ({})", self.src_type, self.source, self.name, self.sym)
    }
}

impl Record for Op {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let source = read_text(&mut *reader, SOURCE_WIDTH)?;
        let src_type = SourceType::from_wire(reader.read_u32::<LittleEndian>()?)?;
        let name = read_text(&mut *reader, NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let label = read_text(&mut *reader, LABEL_WIDTH)?;
        let domain = read_text(&mut *reader, DOMAIN_WIDTH)?;
        let x_axis = read_text(&mut *reader, AXIS_WIDTH)?;
        let y_axis = read_text(&mut *reader, AXIS_WIDTH)?;
        let num_elem = reader.read_u32::<LittleEndian>()?;
        let elem_size = reader.read_u32::<LittleEndian>()?;
        if elem_size != ELEMENT_SIZE {
            tracing::warn!(op = %name, source = %source, elem_size, "ignoring element size, reading 16-bit samples");
        }
        let data = read_i16s(reader, num_elem as usize)?;
        Ok(Self { source, src_type, name, sym, label, domain, x_axis, y_axis, data })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "op.source", &self.source, SOURCE_WIDTH)?;
        writer.write_u32::<LittleEndian>(self.src_type.ordinal())?;
        write_text(&mut *writer, "op.name", &self.name, NAME_WIDTH)?;
        write_text(&mut *writer, "op.sym", &self.sym, SYM_WIDTH)?;
        write_text(&mut *writer, "op.label", &self.label, LABEL_WIDTH)?;
        write_text(&mut *writer, "op.domain", &self.domain, DOMAIN_WIDTH)?;
        write_text(&mut *writer, "op.x_axis", &self.x_axis, AXIS_WIDTH)?;
        write_text(&mut *writer, "op.y_axis", &self.y_axis, AXIS_WIDTH)?;
        writer.write_u32::<LittleEndian>(count_u32("op.data", self.data.len())?)?;
        writer.write_u32::<LittleEndian>(ELEMENT_SIZE)?;
        write_i16s(writer, &self.data)
    }
}

// ── Container ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dsp {
    pub timestamp:  u64,
    pub operations: Vec<Op>,
}

impl Default for Dsp {
    fn default() -> Self {
        Self::new(now_timestamp())
    }
}

impl Dsp {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp, operations: Vec::new() }
    }

    /// Append the standard operations for a two-lead configuration:
    /// per-signal QRS, APS and AMP for each lead, then the six pair
    /// operations.
    pub fn create_std_ops(&mut self, sig_a: &str, sig_b: &str) {
        for std_op in ops::SIGNAL_OPS {
            for sig in [sig_a, sig_b] {
                self.operations.push(std_op.instantiate(sig, SourceType::Signal));
            }
        }
        let pair = ops::pair_label(sig_a, sig_b);
        for std_op in ops::PAIR_OPS {
            self.operations.push(std_op.instantiate(&pair, SourceType::SigPair));
        }
    }

    /// First operation called `name`, optionally restricted to `source`.
    pub fn operation(&self, name: &str, source: Option<&str>) -> Option<&Op> {
        self.operations
            .iter()
            .find(|op| op.name == name && source.map_or(true, |s| op.source == s))
    }

    pub fn operation_mut(&mut self, name: &str, source: Option<&str>) -> Option<&mut Op> {
        self.operations
            .iter_mut()
            .find(|op| op.name == name && source.map_or(true, |s| op.source == s))
    }

    pub fn operation_sym(&self, sym: &str, source: Option<&str>) -> Option<&Op> {
        self.operations
            .iter()
            .find(|op| op.sym == sym && source.map_or(true, |s| op.source == s))
    }

    /// Every operation matching `text` as full name, full symbol, name or
    /// symbol, in that order of preference.
    pub fn find(&self, text: &str, sep: &str) -> Vec<&Op> {
        let mut buckets: [Vec<&Op>; 4] = Default::default();
        for op in &self.operations {
            let bucket = if op.fullname(sep, false) == text {
                0
            } else if op.fullsym(sep, false) == text {
                1
            } else if op.name == text {
                2
            } else if op.sym == text {
                3
            } else {
                continue;
            };
            buckets[bucket].push(op);
        }
        buckets.into_iter().flatten().collect()
    }

    pub fn sources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.operations.iter().map(|op| op.source.as_str()).collect();
        out.sort_unstable();
        out
    }

    /// Distinct single-signal sources, in first-seen order.
    pub fn signals(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for op in self.operations.iter().filter(|op| op.src_type == SourceType::Signal) {
            if !out.contains(&op.source.as_str()) {
                out.push(&op.source);
            }
        }
        out
    }
}

impl Container for Dsp {
    type Item = Op;
    const FORMAT: &'static FamilyFormat = &FORMAT;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn items(&self) -> &[Op] {
        &self.operations
    }

    fn assemble(timestamp: u64, operations: Vec<Op>) -> Self {
        Self { timestamp, operations }
    }

    fn migrate<R: Read>(layout: &LegacyLayout, reader: &mut R) -> Result<Self> {
        legacy::migrate(layout, reader)
    }
}

impl JsonMirror for Dsp {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Dsp {
        let mut dsp = Dsp::new(1_600_000_000);
        dsp.create_std_ops("V5", "II");
        dsp.operation_mut(ops::APS.name, Some("II")).unwrap().data = vec![0, 1, 9, -3, i16::MIN, i16::MAX];
        dsp.operation_mut(ops::PSA.name, None).unwrap().data = vec![2, 0, 0];
        dsp
    }

    #[test]
    fn std_ops_layout() {
        let dsp = sample();
        let order: Vec<String> = dsp.operations.iter().map(|op| op.fullsym(" ", false)).collect();
        assert_eq!(
            order,
            [
                "qrs V5", "qrs II", "aps V5", "aps II", "amp V5", "amp II",
                "cps (V5,II)", "ccr (V5,II)", "imr (V5,II)", "psa (V5,II)", "xar (V5,II)", "coh (V5,II)",
            ]
        );
        assert_eq!(dsp.signals(), ["V5", "II"]);
        assert_eq!(dsp.operations[6].src_type, SourceType::SigPair);
    }

    #[test]
    fn op_record_size() {
        let op = ops::COH.instantiate("(V5,II)", SourceType::SigPair);
        let mut buf = Vec::new();
        op.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), OP_SIZE);
        assert_eq!(OP_SIZE, 340);
        assert_eq!(&buf[OP_SIZE - 4..], &2u32.to_le_bytes());
    }

    #[test]
    fn round_trip() {
        let dsp = sample();
        let mut buf = Vec::new();
        dsp.write(&mut buf).unwrap();
        let back = Dsp::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, dsp);
        assert_eq!(back.operation_sym("aps", Some("II")).unwrap().data[2], 9);
    }

    #[test]
    fn element_size_field_is_advisory() {
        let op = Op { data: vec![5, 6], ..ops::QRS.instantiate("V5", SourceType::Signal) };
        let mut buf = Vec::new();
        op.encode(&mut buf).unwrap();
        buf[OP_SIZE - 4..OP_SIZE].copy_from_slice(&4u32.to_le_bytes());
        let back = Op::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back.data, vec![5, 6]);
    }

    #[test]
    fn huge_declared_sample_count_is_end_of_stream() {
        let op = Op { data: vec![5, 6], ..ops::QRS.instantiate("V5", SourceType::Signal) };
        let mut buf = Vec::new();
        op.encode(&mut buf).unwrap();
        buf[OP_SIZE - 8..OP_SIZE - 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = Op::decode(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEndOfStream));
    }

    #[test]
    fn find_prefers_full_names() {
        let dsp = sample();
        let hits = dsp.find("aps II", " ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "II");
        assert_eq!(dsp.find("aps", " ").len(), 2);
        assert_eq!(dsp.find("coherence", " ")[0].source, "(V5,II)");
        assert_eq!(dsp.operations[9].fullname("/", true), "phase shift angle");
    }

    #[test]
    fn unknown_source_type() {
        let mut buf = Vec::new();
        ops::QRS.instantiate("V5", SourceType::Signal).encode(&mut buf).unwrap();
        buf[SOURCE_WIDTH..SOURCE_WIDTH + 4].copy_from_slice(&7u32.to_le_bytes());
        let err = Op::decode(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnknownTypeTag { registry: "dsp source", ordinal: 7 }));
    }
}
