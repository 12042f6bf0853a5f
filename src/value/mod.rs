//! Type registries and the two self-describing value encodings.
//!
//! # Registries
//! A [`TypeRegistry`] is a frozen ordinal table: the ordinal is what goes on
//! disk, the entry gives a display code and a canonical byte width.  Width 0
//! means "variable", the size then comes from the payload (or from an
//! explicit field in the record).  Ordinals are permanent; new types are
//! only ever appended.
//!
//! * [`TABLE_TYPES`] is shared by DCF and DGO values.
//! * [`ELEMENT_TYPES`] names SAR intermediate-data elements.  It is advisory
//!   only: element width always comes from the record itself.
//!
//! # Encodings
//! * [`TableValue`]: width looked up in [`TABLE_TYPES`].
//! * [`ElementArray`]: element width and count carried in the record.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::wire::{byte_len, read_bytes, trim_text};

// ── Registry ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeEntry {
    pub code:  &'static str,
    pub width: usize,
}

const fn entry(code: &'static str, width: usize) -> TypeEntry {
    TypeEntry { code, width }
}

#[derive(Debug)]
pub struct TypeRegistry {
    pub name: &'static str,
    entries:  &'static [TypeEntry],
}

impl TypeRegistry {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an ordinal read from disk.
    pub fn entry(&self, ordinal: i64) -> Result<&TypeEntry> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.entries.get(i))
            .ok_or(FormatError::UnknownTypeTag { registry: self.name, ordinal })
    }

    /// Canonical width in bytes; 0 means the caller sizes the value.
    pub fn width_of(&self, ordinal: i64) -> Result<usize> {
        self.entry(ordinal).map(|e| e.width)
    }

    pub fn ordinal_of(&self, code: &str) -> Option<u32> {
        self.entries.iter().position(|e| e.code == code).map(|i| i as u32)
    }
}

/// DCF/DGO value types.  `a` was appended for DGO text results.
pub const TABLE_TYPES: TypeRegistry = TypeRegistry {
    name: "value",
    entries: &[
        entry("o", 0),
        entry("c", 1),
        entry("C", 1),
        entry("a1", 1),
        entry("i", 4),
        entry("I", 4),
        entry("f", 4),
        entry("d", 8),
        entry("a", 0),
    ],
};

/// SAR intermediate-data element types.  Ordinals 11 and 12 are historical
/// aliases of `a`.
pub const ELEMENT_TYPES: TypeRegistry = TypeRegistry {
    name: "element",
    entries: &[
        entry("a", 1),
        entry("c", 1),
        entry("C", 1),
        entry("s", 2),
        entry("S", 2),
        entry("i", 4),
        entry("I", 4),
        entry("l", 4),
        entry("L", 4),
        entry("f", 4),
        entry("d", 8),
        entry("a", 1),
        entry("a", 1),
    ],
};

// ── TypeTag ──────────────────────────────────────────────────────────────────

/// Ordinal into [`TABLE_TYPES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTag(pub u32);

impl TypeTag {
    pub const OPAQUE: TypeTag = TypeTag(0);
    pub const CHAR:   TypeTag = TypeTag(1);
    pub const UCHAR:  TypeTag = TypeTag(2);
    pub const CHAR1:  TypeTag = TypeTag(3);
    pub const INT:    TypeTag = TypeTag(4);
    pub const UINT:   TypeTag = TypeTag(5);
    pub const FLOAT:  TypeTag = TypeTag(6);
    pub const DOUBLE: TypeTag = TypeTag(7);
    pub const TEXT:   TypeTag = TypeTag(8);

    /// Validate an ordinal read from disk.
    pub fn from_wire(ordinal: i32) -> Result<Self> {
        TABLE_TYPES.entry(ordinal as i64)?;
        Ok(TypeTag(ordinal as u32))
    }

    pub fn code(self) -> &'static str {
        TABLE_TYPES.entry(self.0 as i64).map(|e| e.code).unwrap_or("?")
    }

    pub fn width(self) -> Result<usize> {
        TABLE_TYPES.width_of(self.0 as i64)
    }

    fn is_text(self) -> bool {
        matches!(self, TypeTag::CHAR | TypeTag::CHAR1 | TypeTag::TEXT)
    }
}

// ── TableValue ───────────────────────────────────────────────────────────────

/// A value whose width comes from [`TABLE_TYPES`].
///
/// The payload is kept as raw little-endian bytes so that decode/encode is
/// byte-exact.  For fixed-width tags the payload is always exactly the
/// table width.  Deserialised values go through [`TableValue::new`] too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTableValue")]
pub struct TableValue {
    tag:     TypeTag,
    payload: Vec<u8>,
}

#[derive(Deserialize)]
struct RawTableValue {
    tag:     TypeTag,
    payload: Vec<u8>,
}

impl TryFrom<RawTableValue> for TableValue {
    type Error = FormatError;

    fn try_from(raw: RawTableValue) -> Result<Self> {
        Self::new(raw.tag, raw.payload)
    }
}

impl TableValue {
    /// Build a value, truncating or zero-extending `payload` to the table
    /// width of `tag` (unless the tag is variable-width).
    pub fn new(tag: TypeTag, mut payload: Vec<u8>) -> Result<Self> {
        let width = tag.width()?;
        if width != 0 {
            payload.resize(width, 0);
        }
        Ok(Self { tag, payload })
    }

    fn fixed(tag: TypeTag, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    /// Single character; only the first byte of `s` is kept.
    pub fn char(s: &str) -> Self {
        Self::fixed(TypeTag::CHAR, vec![s.as_bytes().first().copied().unwrap_or(0)])
    }

    pub fn uchar(v: u8) -> Self {
        Self::fixed(TypeTag::UCHAR, vec![v])
    }

    pub fn int(v: i32) -> Self {
        Self::fixed(TypeTag::INT, v.to_le_bytes().to_vec())
    }

    pub fn uint(v: u32) -> Self {
        Self::fixed(TypeTag::UINT, v.to_le_bytes().to_vec())
    }

    pub fn float(v: f32) -> Self {
        Self::fixed(TypeTag::FLOAT, v.to_le_bytes().to_vec())
    }

    pub fn double(v: f64) -> Self {
        Self::fixed(TypeTag::DOUBLE, v.to_le_bytes().to_vec())
    }

    pub fn text(s: &str) -> Self {
        Self::fixed(TypeTag::TEXT, s.as_bytes().to_vec())
    }

    pub fn opaque(bytes: Vec<u8>) -> Self {
        Self::fixed(TypeTag::OPAQUE, bytes)
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes this value occupies on disk.
    pub fn data_size(&self) -> usize {
        self.payload.len()
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.tag.width(), Ok(0))
    }

    pub fn as_f64(&self) -> Option<f64> {
        let p = &self.payload;
        Some(match self.tag {
            TypeTag::UCHAR  => *p.first()? as f64,
            TypeTag::INT    => i32::from_le_bytes(p.get(..4)?.try_into().ok()?) as f64,
            TypeTag::UINT   => u32::from_le_bytes(p.get(..4)?.try_into().ok()?) as f64,
            TypeTag::FLOAT  => f32::from_le_bytes(p.get(..4)?.try_into().ok()?) as f64,
            TypeTag::DOUBLE => f64::from_le_bytes(p.get(..8)?.try_into().ok()?),
            _ => return None,
        })
    }

    pub fn as_text(&self) -> Option<String> {
        self.tag.is_text().then(|| trim_text(&self.payload))
    }

    pub(crate) fn write_payload<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.payload)?;
        Ok(())
    }

    pub(crate) fn read_payload<R: Read>(reader: R, tag: TypeTag, len: usize) -> Result<Self> {
        let payload = read_bytes(reader, len)?;
        Self::new(tag, payload)
    }
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.as_text() {
            return f.write_str(&text);
        }
        match self.as_f64() {
            Some(v) => write!(f, "{v}"),
            None    => f.write_str("[Array]"),
        }
    }
}

// ── ElementArray ─────────────────────────────────────────────────────────────

/// Ordinal into [`ELEMENT_TYPES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType(pub u32);

impl ElementType {
    pub const TEXT:  ElementType = ElementType(0);
    pub const I8:    ElementType = ElementType(1);
    pub const U8:    ElementType = ElementType(2);
    pub const I16:   ElementType = ElementType(3);
    pub const U16:   ElementType = ElementType(4);
    pub const I32:   ElementType = ElementType(5);
    pub const U32:   ElementType = ElementType(6);
    pub const LONG:  ElementType = ElementType(7);
    pub const ULONG: ElementType = ElementType(8);
    pub const F32:   ElementType = ElementType(9);
    pub const F64:   ElementType = ElementType(10);

    pub fn from_wire(ordinal: i32) -> Result<Self> {
        ELEMENT_TYPES.entry(ordinal as i64)?;
        Ok(ElementType(ordinal as u32))
    }

    pub fn code(self) -> &'static str {
        ELEMENT_TYPES.entry(self.0 as i64).map(|e| e.code).unwrap_or("?")
    }

    /// Natural width, used only when building arrays in memory.
    pub fn natural_width(self) -> usize {
        ELEMENT_TYPES.width_of(self.0 as i64).unwrap_or(1)
    }

    fn is_text(self) -> bool {
        self.code() == "a"
    }
}

/// A flat array whose element width and count are stored with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementArray {
    kind:      ElementType,
    elem_size: u32,
    payload:   Vec<u8>,
}

macro_rules! from_slice {
    ($fn:ident, $t:ty, $kind:expr) => {
        pub fn $fn(values: &[$t]) -> Self {
            let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            Self { kind: $kind, elem_size: std::mem::size_of::<$t>() as u32, payload }
        }
    };
}

impl ElementArray {
    /// Build from raw parts.  A trailing partial element is dropped.
    pub fn new(kind: ElementType, elem_size: u32, mut payload: Vec<u8>) -> Self {
        let whole = match elem_size {
            0 => 0,
            n => payload.len() / n as usize * n as usize,
        };
        payload.truncate(whole);
        Self { kind, elem_size, payload }
    }

    from_slice!(from_i8,  i8,  ElementType::I8);
    from_slice!(from_i16, i16, ElementType::I16);
    from_slice!(from_u16, u16, ElementType::U16);
    from_slice!(from_i32, i32, ElementType::I32);
    from_slice!(from_u32, u32, ElementType::U32);
    from_slice!(from_f32, f32, ElementType::F32);
    from_slice!(from_f64, f64, ElementType::F64);

    pub fn from_u8(values: &[u8]) -> Self {
        Self { kind: ElementType::U8, elem_size: 1, payload: values.to_vec() }
    }

    pub fn text(s: &str) -> Self {
        Self { kind: ElementType::TEXT, elem_size: 1, payload: s.as_bytes().to_vec() }
    }

    pub fn kind(&self) -> ElementType {
        self.kind
    }

    pub fn elem_size(&self) -> u32 {
        self.elem_size
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Element count derived from the stored width only.
    pub fn len(&self) -> usize {
        match self.elem_size {
            0 => 0,
            n => self.payload.len() / n as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, i: usize) -> Option<&[u8]> {
        let n = self.elem_size as usize;
        (i < self.len()).then(|| &self.payload[i * n..(i + 1) * n])
    }

    /// Numeric view.  `None` for text, or when the stored width does not
    /// match the element type's natural width.
    pub fn to_f64s(&self) -> Option<Vec<f64>> {
        if self.kind.is_text() || self.elem_size as usize != self.kind.natural_width() {
            return None;
        }
        let n = self.elem_size as usize;
        self.payload
            .chunks_exact(n)
            .map(|c| decode_number(self.kind, c))
            .collect()
    }

    pub fn as_text(&self) -> Option<String> {
        self.kind.is_text().then(|| trim_text(&self.payload))
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.payload.len()
    }

    pub(crate) fn write_payload<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Read `count` elements of `elem_size` bytes; `kind` is not consulted
    /// for sizing.
    pub(crate) fn read_payload<R: Read>(
        reader:    R,
        kind:      ElementType,
        elem_size: u32,
        count:     u32,
    ) -> Result<Self> {
        let payload = read_bytes(reader, byte_len(elem_size as usize, count as usize)?)?;
        Ok(Self { kind, elem_size, payload })
    }
}

fn decode_number(kind: ElementType, c: &[u8]) -> Option<f64> {
    Some(match kind {
        ElementType::I8  => c[0] as i8 as f64,
        ElementType::U8  => c[0] as f64,
        ElementType::I16 => i16::from_le_bytes(c.try_into().ok()?) as f64,
        ElementType::U16 => u16::from_le_bytes(c.try_into().ok()?) as f64,
        ElementType::I32 | ElementType::LONG  => i32::from_le_bytes(c.try_into().ok()?) as f64,
        ElementType::U32 | ElementType::ULONG => u32::from_le_bytes(c.try_into().ok()?) as f64,
        ElementType::F32 => f32::from_le_bytes(c.try_into().ok()?) as f64,
        ElementType::F64 => f64::from_le_bytes(c.try_into().ok()?),
        _ => return None,
    })
}

impl fmt::Display for ElementArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.as_text() {
            return f.write_str(&text);
        }
        match self.to_f64s() {
            Some(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(","))
            }
            None => f.write_str(&hex::encode(&self.payload)),
        }
    }
}

// ── TaggedValue ──────────────────────────────────────────────────────────────

/// Borrowed view over either encoding, for code that renders or inspects
/// values without caring which family they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaggedValue<'a> {
    Table(&'a TableValue),
    Explicit(&'a ElementArray),
}

impl TaggedValue<'_> {
    pub fn type_code(&self) -> &'static str {
        match self {
            TaggedValue::Table(v)    => v.tag().code(),
            TaggedValue::Explicit(a) => a.kind().code(),
        }
    }

    pub fn element_count(&self) -> usize {
        match self {
            TaggedValue::Table(v) if v.is_variable() => v.data_size(),
            TaggedValue::Table(_)    => 1,
            TaggedValue::Explicit(a) => a.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            TaggedValue::Table(v)    => v.data_size(),
            TaggedValue::Explicit(a) => a.byte_len(),
        }
    }
}

impl fmt::Display for TaggedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::Table(v)    => write!(f, "({}) {}", self.type_code(), v),
            TaggedValue::Explicit(a) => write!(f, "({}) {}", self.type_code(), a),
        }
    }
}

impl<'a> From<&'a TableValue> for TaggedValue<'a> {
    fn from(v: &'a TableValue) -> Self {
        TaggedValue::Table(v)
    }
}

impl<'a> From<&'a ElementArray> for TaggedValue<'a> {
    fn from(a: &'a ElementArray) -> Self {
        TaggedValue::Explicit(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_widths() {
        assert_eq!(TABLE_TYPES.width_of(0).unwrap(), 0);
        assert_eq!(TABLE_TYPES.width_of(1).unwrap(), 1);
        assert_eq!(TABLE_TYPES.width_of(7).unwrap(), 8);
        assert_eq!(TABLE_TYPES.width_of(8).unwrap(), 0);
        assert_eq!(TABLE_TYPES.ordinal_of("f"), Some(6));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = TypeTag::from_wire(TABLE_TYPES.len() as i32).unwrap_err();
        assert!(matches!(err, FormatError::UnknownTypeTag { registry: "value", .. }));
        assert!(TypeTag::from_wire(-1).is_err());
        assert!(ElementType::from_wire(13).is_err());
        assert!(ElementType::from_wire(12).is_ok());
    }

    #[test]
    fn char_value_is_one_byte() {
        let v = TableValue::char("M");
        assert_eq!(v.payload(), b"M");
        assert_eq!(v.as_text().as_deref(), Some("M"));
        assert_eq!(v.to_string(), "M");
    }

    #[test]
    fn fixed_width_payload_is_normalised() {
        let v = TableValue::new(TypeTag::INT, vec![1, 0, 0, 0, 9, 9]).unwrap();
        assert_eq!(v.payload(), &[1, 0, 0, 0]);
        let v = TableValue::new(TypeTag::DOUBLE, vec![0]).unwrap();
        assert_eq!(v.data_size(), 8);
        let v = TableValue::new(TypeTag::OPAQUE, vec![1, 2, 3]).unwrap();
        assert_eq!(v.data_size(), 3);
        assert_eq!(v.to_string(), "[Array]");
    }

    #[test]
    fn deserialised_payload_is_normalised() {
        let v: TableValue = serde_json::from_str(r#"{"tag":4,"payload":[1]}"#).unwrap();
        assert_eq!(v, TableValue::int(1));
        assert_eq!(v.data_size(), 4);
        assert!(serde_json::from_str::<TableValue>(r#"{"tag":99,"payload":[]}"#).is_err());
    }

    #[test]
    fn numeric_views() {
        assert_eq!(TableValue::float(1.5).as_f64(), Some(1.5));
        assert_eq!(TableValue::int(-1).as_f64(), Some(-1.0));
        assert_eq!(TableValue::uchar(42).to_string(), "42");
        assert_eq!(TableValue::text("abc").as_f64(), None);
    }

    #[test]
    fn element_count_comes_from_stored_width() {
        let a = ElementArray::from_f32(&[1.0, 2.5, 3.5]);
        assert_eq!(a.len(), 3);
        assert_eq!(a.to_f64s(), Some(vec![1.0, 2.5, 3.5]));

        // Declared as 16-bit but stored 4 bytes wide: count still follows the
        // stored width, numeric view is refused.
        let odd = ElementArray::new(ElementType::I16, 4, a.payload().to_vec());
        assert_eq!(odd.len(), 3);
        assert_eq!(odd.element(1), Some(&2.5f32.to_le_bytes()[..]));
        assert!(odd.to_f64s().is_none());
    }

    #[test]
    fn partial_element_is_dropped() {
        let a = ElementArray::new(ElementType::I16, 2, vec![1, 0, 2, 0, 3]);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_f64s(), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn tagged_view() {
        let v = TableValue::char("F");
        let a = ElementArray::from_u16(&[76]);
        assert_eq!(TaggedValue::from(&v).to_string(), "(c) F");
        assert_eq!(TaggedValue::from(&a).to_string(), "(S) 76");
        assert_eq!(TaggedValue::from(&a).byte_len(), 2);
        assert_eq!(TaggedValue::from(&TableValue::text("abcd")).element_count(), 4);
    }
}
