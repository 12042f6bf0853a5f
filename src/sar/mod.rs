//! Signal Analysis Results (SAR) files.
//!
//! A SAR holds one [`Analysis`] per analysed source.  Each analysis carries
//! scalar features ([`Index`]) and arbitrary intermediate arrays
//! ([`IntData`]).
//!
//! ```text
//! [SARl][f32 1.2][u64 timestamp][u32 num_analyses]
//! Analysis  [source 64][name 48][sym 8][u32 num_indexes][u32 num_idata][u32 size]
//!   Index     [name 32][sym 8][f32 value]
//!   IntData   [name 32][i32 ref role][i32 ref type][ref name 64]
//!             [i32 element type][u32 element size][u32 count]
//!             [element size × count bytes]
//! ```
//! `size` is the byte length of everything following the analysis record
//! and is only checked, never trusted.

pub mod catalog;
pub mod llo;

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::container::{read_records, write_records, Container, Record};
use crate::dsp::ops::pair_label;
use crate::error::{FormatError, Result};
use crate::header::{now_timestamp, FamilyFormat};
use crate::json::JsonMirror;
use crate::value::{ElementArray, ElementType};
use crate::wire::{count_u32, read_text, write_text};

pub use catalog::StdAnalysis;

pub const FORMAT: FamilyFormat = FamilyFormat {
    name:             "SAR",
    magic:            *b"SARl",
    version:          1.2,
    previous_version: 1.1,
    legacy:           &[],
};

pub const SOURCE_WIDTH: usize = 64;
pub const ANALYSIS_NAME_WIDTH: usize = 48;
pub const SYM_WIDTH: usize = 8;
pub const INDEX_NAME_WIDTH: usize = 32;
pub const IDATA_NAME_WIDTH: usize = 32;
pub const REF_NAME_WIDTH: usize = 64;

pub const ANALYSIS_SIZE: usize = SOURCE_WIDTH + ANALYSIS_NAME_WIDTH + SYM_WIDTH + 3 * 4;
pub const INDEX_SIZE: usize = INDEX_NAME_WIDTH + SYM_WIDTH + 4;
pub const IDATA_SIZE: usize = IDATA_NAME_WIDTH + 4 + 4 + REF_NAME_WIDTH + 3 * 4;

// ── Ref ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefType {
    Dsp,
    Signal,
    IntermediateData,
    Index,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefRole {
    XAxis,
    YAxis,
    ZAxis,
    Ratio,
    Count,
    Score,
}

impl RefType {
    const ALL: [RefType; 5] = [
        RefType::Dsp,
        RefType::Signal,
        RefType::IntermediateData,
        RefType::Index,
        RefType::Misc,
    ];

    pub fn from_wire(ordinal: i32) -> Result<Self> {
        lookup(&Self::ALL, "sar ref type", ordinal)
    }

    pub fn label(self) -> &'static str {
        match self {
            RefType::Dsp              => "DSP",
            RefType::Signal           => "Signal",
            RefType::IntermediateData => "Intermediate Data",
            RefType::Index            => "Index",
            RefType::Misc             => "Misc",
        }
    }
}

impl RefRole {
    const ALL: [RefRole; 6] = [
        RefRole::XAxis,
        RefRole::YAxis,
        RefRole::ZAxis,
        RefRole::Ratio,
        RefRole::Count,
        RefRole::Score,
    ];

    pub fn from_wire(ordinal: i32) -> Result<Self> {
        lookup(&Self::ALL, "sar ref role", ordinal)
    }

    pub fn label(self) -> &'static str {
        match self {
            RefRole::XAxis => "x axis",
            RefRole::YAxis => "y axis",
            RefRole::ZAxis => "z axis",
            RefRole::Ratio => "ratio",
            RefRole::Count => "count",
            RefRole::Score => "score",
        }
    }
}

fn lookup<T: Copy>(all: &[T], registry: &'static str, ordinal: i32) -> Result<T> {
    usize::try_from(ordinal)
        .ok()
        .and_then(|i| all.get(i).copied())
        .ok_or(FormatError::UnknownTypeTag { registry, ordinal: ordinal as i64 })
}

/// Where a piece of intermediate data came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub ref_type: RefType,
    pub role:     RefRole,
    pub name:     String,
}

impl Ref {
    pub fn new(ref_type: RefType, role: RefRole, name: impl Into<String>) -> Self {
        Self { ref_type, role, name: name.into() }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}) '{}'", self.ref_type.label(), self.role.label(), self.name)
    }
}

// ── IntData ──────────────────────────────────────────────────────────────────

/// Intermediate data.  Element width and count travel with the record, so
/// decoding never consults a type table for sizing.
///
/// An absent [`Ref`] is stored as zero ordinals and an empty name, so a
/// present one must be named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntData {
    pub name:      String,
    pub reference: Option<Ref>,
    pub data:      ElementArray,
}

impl IntData {
    pub fn new(name: impl Into<String>, data: ElementArray, reference: Option<Ref>) -> Self {
        Self { name: name.into(), reference, data }
    }

    /// Bytes of the element payload.
    pub fn data_size(&self) -> usize {
        self.data.payload().len()
    }
}

impl fmt::Display for IntData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(r) => write!(f, "({}) {} ({}): {}", self.data.kind().code(), self.name, r, self.data),
            None    => write!(f, "({}) {}: {}", self.data.kind().code(), self.name, self.data),
        }
    }
}

impl Record for IntData {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let name = read_text(&mut *reader, IDATA_NAME_WIDTH)?;
        let role = RefRole::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let ref_type = RefType::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let ref_name = read_text(&mut *reader, REF_NAME_WIDTH)?;
        let kind = ElementType::from_wire(reader.read_i32::<LittleEndian>()?)?;
        let elem_size = reader.read_u32::<LittleEndian>()?;
        let count = reader.read_u32::<LittleEndian>()?;
        let data = ElementArray::read_payload(reader, kind, elem_size, count)?;

        let reference = (!ref_name.is_empty()).then(|| Ref { ref_type, role, name: ref_name });
        Ok(Self { name, reference, data })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "idata.name", &self.name, IDATA_NAME_WIDTH)?;
        let (role, ref_type, ref_name) = match &self.reference {
            Some(r) if r.name.is_empty() => return Err(FormatError::UnnamedReference(self.name.clone())),
            Some(r) => (r.role as i32, r.ref_type as i32, r.name.as_str()),
            None    => (0, 0, ""),
        };
        writer.write_i32::<LittleEndian>(role)?;
        writer.write_i32::<LittleEndian>(ref_type)?;
        write_text(&mut *writer, "idata.ref", ref_name, REF_NAME_WIDTH)?;
        writer.write_i32::<LittleEndian>(self.data.kind().0 as i32)?;
        writer.write_u32::<LittleEndian>(self.data.elem_size())?;
        writer.write_u32::<LittleEndian>(count_u32("idata.count", self.data.len())?)?;
        self.data.write_payload(writer)
    }
}

// ── Index ────────────────────────────────────────────────────────────────────

/// A feature produced by an analysis.  Usually 0/1, sometimes a count or a
/// half-step severity (0, 0.5, 1, 1.5, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name:  String,
    pub sym:   String,
    pub value: f32,
}

impl Index {
    pub const POSITIVE: f32 = 1.0;
    pub const NEGATIVE: f32 = 0.0;

    pub fn new(name: impl Into<String>, sym: impl Into<String>, value: f32) -> Self {
        Self { name: name.into(), sym: sym.into(), value }
    }

    /// Weighted values below one half count as unset.
    pub fn is_set(&self) -> bool {
        self.value - Self::NEGATIVE >= 0.5
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) : {:.1}", self.name, self.sym, self.value)
    }
}

impl Record for Index {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let name = read_text(&mut *reader, INDEX_NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let value = reader.read_f32::<LittleEndian>()?;
        Ok(Self { name, sym, value })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "index.name", &self.name, INDEX_NAME_WIDTH)?;
        write_text(&mut *writer, "index.sym", &self.sym, SYM_WIDTH)?;
        writer.write_f32::<LittleEndian>(self.value)?;
        Ok(())
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub source:  String,
    pub name:    String,
    pub sym:     String,
    pub indexes: Vec<Index>,
    pub idata:   Vec<IntData>,
}

impl Analysis {
    pub fn new(source: impl Into<String>, name: impl Into<String>, sym: impl Into<String>) -> Self {
        Self {
            source:  source.into(),
            name:    name.into(),
            sym:     sym.into(),
            indexes: Vec::new(),
            idata:   Vec::new(),
        }
    }

    pub fn fullname(&self, sep: &str, skip_pair: bool) -> String {
        if skip_pair && self.source.starts_with('(') {
            self.name.clone()
        } else {
            format!("{}{sep}{}", self.name, self.source)
        }
    }

    pub fn fullsym(&self, sep: &str, skip_pair: bool) -> String {
        if skip_pair && self.source.starts_with('(') {
            self.sym.clone()
        } else {
            format!("{}{sep}{}", self.sym, self.source)
        }
    }

    /// First index called `name`.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn index_sym(&self, sym: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.sym == sym)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    pub fn data(&self, name: &str) -> Option<&IntData> {
        self.idata.iter().find(|d| d.name == name)
    }

    pub fn add_index(&mut self, name: &str, sym: &str, value: f32) {
        self.indexes.push(Index::new(name, sym, value));
    }

    /// Add a catalogued index of this analysis, looking up its symbol.
    /// Names outside the catalogue use the name as symbol.
    pub fn add_std_index(&mut self, name: &str, value: f32) {
        let sym = catalog::index_sym(&self.sym, name).unwrap_or(name);
        self.indexes.push(Index::new(name, sym, value));
    }

    pub fn add_idata(&mut self, name: &str, data: ElementArray, reference: Option<Ref>) {
        self.idata.push(IntData::new(name, data, reference));
    }

    pub fn add_idata_i(&mut self, name: &str, data: &[i32], reference: Option<Ref>) {
        self.add_idata(name, ElementArray::from_i32(data), reference);
    }

    pub fn add_idata_ui(&mut self, name: &str, data: &[u32], reference: Option<Ref>) {
        self.add_idata(name, ElementArray::from_u32(data), reference);
    }

    pub fn add_idata_f(&mut self, name: &str, data: &[f32], reference: Option<Ref>) {
        self.add_idata(name, ElementArray::from_f32(data), reference);
    }

    pub fn add_idata_d(&mut self, name: &str, data: &[f64], reference: Option<Ref>) {
        self.add_idata(name, ElementArray::from_f64(data), reference);
    }

    pub fn add_idata_s(&mut self, name: &str, text: &str, reference: Option<Ref>) {
        self.add_idata(name, ElementArray::text(text), reference);
    }

    fn selected<'a>(&'a self, names: Option<&'a [&'a str]>) -> Vec<&'a str> {
        match names {
            Some(names) => names.to_vec(),
            None        => self.indexes.iter().map(|i| i.name.as_str()).collect(),
        }
    }

    /// Sum of the values of set indexes.  With `names`, only those indexes
    /// (looked up by name, missing ones count as zero).
    pub fn sum_indexes(&self, names: Option<&[&str]>) -> f64 {
        self.selected(names)
            .into_iter()
            .filter_map(|n| self.index(n))
            .filter(|i| i.is_set())
            .map(|i| i.value as f64)
            .sum()
    }

    pub fn count_indexes(&self, names: Option<&[&str]>) -> usize {
        self.selected(names)
            .into_iter()
            .filter(|n| self.index(n).map_or(false, Index::is_set))
            .count()
    }

    pub fn indexes_to_bool(&self, names: Option<&[&str]>) -> Vec<bool> {
        self.selected(names)
            .into_iter()
            .map(|n| self.index(n).map_or(false, Index::is_set))
            .collect()
    }

    /// Value of the `size` field: bytes of all nested records.
    pub fn content_size(&self) -> usize {
        self.indexes.len() * INDEX_SIZE
            + self.idata.iter().map(|d| IDATA_SIZE + d.data_size()).sum::<usize>()
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.source, self.name, self.sym)
    }
}

impl Record for Analysis {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let source = read_text(&mut *reader, SOURCE_WIDTH)?;
        let name = read_text(&mut *reader, ANALYSIS_NAME_WIDTH)?;
        let sym = read_text(&mut *reader, SYM_WIDTH)?;
        let num_indexes = reader.read_u32::<LittleEndian>()?;
        let num_idata = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()? as usize;

        let indexes = read_records(&mut *reader, num_indexes)?;
        let idata = read_records(reader, num_idata)?;
        let analysis = Self { source, name, sym, indexes, idata };

        if analysis.content_size() != size {
            tracing::warn!(
                analysis = %analysis,
                declared = size,
                actual = analysis.content_size(),
                "analysis size field disagrees with content"
            );
        }
        Ok(analysis)
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "analysis.source", &self.source, SOURCE_WIDTH)?;
        write_text(&mut *writer, "analysis.name", &self.name, ANALYSIS_NAME_WIDTH)?;
        write_text(&mut *writer, "analysis.sym", &self.sym, SYM_WIDTH)?;
        writer.write_u32::<LittleEndian>(count_u32("analysis.indexes", self.indexes.len())?)?;
        writer.write_u32::<LittleEndian>(count_u32("analysis.idata", self.idata.len())?)?;
        writer.write_u32::<LittleEndian>(count_u32("analysis.size", self.content_size())?)?;
        write_records(&mut *writer, &self.indexes)?;
        write_records(writer, &self.idata)
    }
}

// ── Container ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sar {
    pub timestamp: u64,
    pub analyses:  Vec<Analysis>,
}

impl Default for Sar {
    fn default() -> Self {
        Self::new(now_timestamp())
    }
}

/// Split `(a,b)` anywhere in `source` into its two lead names.
fn split_pair(source: &str) -> Option<(&str, &str)> {
    let open = source.find('(')?;
    let rest = &source[open + 1..];
    let comma = rest.find(',')?;
    let close = rest[comma + 1..].find(')')? + comma + 1;
    let (a, b) = (&rest[..comma], &rest[comma + 1..close]);
    (!a.is_empty() && !b.is_empty()).then_some((a, b))
}

impl Sar {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp, analyses: Vec::new() }
    }

    /// Append the standard analyses for a two-lead configuration.
    pub fn create_std_analyses(&mut self, sig_a: &str, sig_b: &str) {
        use catalog::{AMP, APS, CCR, COH, HR, IMR, PSA, XAR};

        let pair = pair_label(sig_a, sig_b);
        let pair = pair.as_str();
        let layout: [(&str, StdAnalysis); 10] = [
            (pair, HR),
            (sig_a, APS),
            (sig_b, APS),
            (sig_a, AMP),
            (sig_b, AMP),
            (pair, CCR),
            (pair, PSA),
            (pair, IMR),
            (pair, XAR),
            (pair, COH),
        ];
        for (source, std) in layout {
            self.analyses.push(Analysis::new(source, std.name, std.sym));
        }
    }

    pub fn analysis(&self, name: &str, source: Option<&str>) -> Option<&Analysis> {
        self.analyses
            .iter()
            .find(|a| a.name == name && source.map_or(true, |s| a.source == s))
    }

    pub fn analysis_sym(&self, sym: &str, source: Option<&str>) -> Option<&Analysis> {
        self.analyses
            .iter()
            .find(|a| a.sym == sym && source.map_or(true, |s| a.source == s))
    }

    pub fn analysis_mut(&mut self, name: &str, source: Option<&str>) -> Option<&mut Analysis> {
        self.analyses
            .iter_mut()
            .find(|a| a.name == name && source.map_or(true, |s| a.source == s))
    }

    pub fn get_or_create_analysis(&mut self, name: &str, sym: &str, source: &str) -> &mut Analysis {
        let pos = self.analyses.iter().position(|a| a.name == name && a.source == source);
        let pos = match pos {
            Some(pos) => pos,
            None => {
                self.analyses.push(Analysis::new(source, name, sym));
                self.analyses.len() - 1
            }
        };
        &mut self.analyses[pos]
    }

    /// Source of the first analysis whose source names a lead pair, or
    /// an empty string.
    pub fn lead_pair_name(&self) -> &str {
        self.analyses
            .iter()
            .map(|a| a.source.as_str())
            .find(|s| split_pair(s).is_some())
            .unwrap_or("")
    }

    pub fn primary_lead_name(&self) -> &str {
        split_pair(self.lead_pair_name()).map_or("", |(a, _)| a)
    }

    pub fn secondary_lead_name(&self) -> &str {
        split_pair(self.lead_pair_name()).map_or("", |(_, b)| b)
    }
}

impl Container for Sar {
    type Item = Analysis;
    const FORMAT: &'static FamilyFormat = &FORMAT;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn items(&self) -> &[Analysis] {
        &self.analyses
    }

    fn assemble(timestamp: u64, analyses: Vec<Analysis>) -> Self {
        Self { timestamp, analyses }
    }
}

impl JsonMirror for Sar {}
