//! Raw waveform (ECG) files.
//!
//! ```text
//! [ECG:][f32 3.0][u64 timestamp][u32 num_pairs][u32 num_signals]
//!                [u32 num_blocks][u32 block_size][u32 elem_size]
//! Signal  [name 16][f32 gain][u32 checksum][elem_size × block_size × num_blocks]
//! Pair    [name a 16][name b 16][f32 ratio]
//! ```
//! Every signal in a file shares one element size, block size and block
//! count.  Pairs name their signals and are resolved against the signals
//! decoded before them.
//!
//! Version 2.0 files store a 32-bit timestamp and carry a 40-byte database
//! block after the six header words; it is skipped.

pub mod legacy;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::dsp::ops::pair_label;
use crate::error::{FormatError, Result};
use crate::header::{FamilyFormat, Generation, Opened};
use crate::json::JsonMirror;
use crate::wire::{byte_len, count_u32, read_bytes, read_text, write_text};

pub const FORMAT: FamilyFormat = FamilyFormat {
    name:             "ECG",
    magic:            *b"ECG:",
    version:          3.0,
    previous_version: 2.0,
    legacy:           &legacy::LAYOUTS,
};

pub const NAME_WIDTH: usize = 16;
/// Per-signal prefix before the samples.
pub const SIGNAL_HEADER_SIZE: usize = NAME_WIDTH + 4 + 4;
pub const PAIR_SIZE: usize = 2 * NAME_WIDTH + 4;
/// Database block trailing a version 2.0 body header.
pub const DB_HEADER_SIZE: usize = 40;

// ── Signal ───────────────────────────────────────────────────────────────────

/// Descriptor of a data source.  Holds no samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name:       String,
    /// Bytes per sample on disk: 1, 2 or 4.
    pub elem_size:  u32,
    /// Samples per block.
    pub block_size: u32,
    /// Multiplier from stored units to millivolts.
    pub gain:       f32,
}

impl Signal {
    pub fn new(name: impl Into<String>, elem_size: u32, block_size: u32, gain: f32) -> Self {
        Self { name: name.into(), elem_size, block_size, gain }
    }

    /// Inclusive range of sample values the element size can hold.
    pub fn sample_range(&self) -> Result<(i32, i32)> {
        match self.elem_size {
            1 => Ok((i8::MIN as i32, i8::MAX as i32)),
            2 => Ok((i16::MIN as i32, i16::MAX as i32)),
            4 => Ok((i32::MIN, i32::MAX)),
            n => Err(FormatError::UnsupportedElementSize(n)),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signal '{}': 1 block = {} x {} bytes, gain {}",
            self.name, self.block_size, self.elem_size, self.gain
        )
    }
}

fn decode_samples(raw: &[u8], elem_size: u32) -> Result<Vec<i32>> {
    Ok(match elem_size {
        1 => raw.iter().map(|&b| b as i8 as i32).collect(),
        2 => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as i32)
            .collect(),
        4 => raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        n => return Err(FormatError::UnsupportedElementSize(n)),
    })
}

// ── SignalSample ─────────────────────────────────────────────────────────────

/// Samples recorded from one [`Signal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    pub signal:    Signal,
    pub data:      Vec<i32>,
    /// Reserved.  Written as 0, ignored on read.
    pub checksum:  u32,
    pub timestamp: u64,
}

impl SignalSample {
    pub fn new(signal: Signal, data: Vec<i32>, timestamp: u64) -> Self {
        Self { signal, data, checksum: 0, timestamp }
    }

    /// Whole blocks held.  A trailing partial block is not counted and is
    /// dropped on encode.
    pub fn num_blocks(&self) -> u32 {
        match self.signal.block_size {
            0 => 0,
            n => (self.data.len() / n as usize) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn append(&mut self, samples: &[i32]) {
        self.data.extend_from_slice(samples);
    }

    fn decode<R: Read>(reader: &mut R, timestamp: u64, layout: &BlockLayout) -> Result<Self> {
        let name = read_text(&mut *reader, NAME_WIDTH)?;
        let gain = reader.read_f32::<LittleEndian>()?;
        let _checksum = reader.read_u32::<LittleEndian>()?;

        let signal = Signal::new(name, layout.elem_size, layout.block_size, gain);
        signal.sample_range()?;
        let raw = read_bytes(reader, layout.sample_bytes()?)?;
        let data = decode_samples(&raw, layout.elem_size)?;
        Ok(Self { signal, data, checksum: 0, timestamp })
    }

    fn encode<W: Write>(&self, writer: &mut W, num_blocks: u32) -> Result<()> {
        write_text(&mut *writer, "signal.name", &self.signal.name, NAME_WIDTH)?;
        writer.write_f32::<LittleEndian>(self.signal.gain)?;
        writer.write_u32::<LittleEndian>(0)?;

        let (min, max) = self.signal.sample_range()?;
        let count = num_blocks as usize * self.signal.block_size as usize;
        for &value in &self.data[..count.min(self.data.len())] {
            if value < min || value > max {
                return Err(FormatError::SampleOutOfRange {
                    signal: self.signal.name.clone(),
                    value,
                    width:  self.signal.elem_size,
                });
            }
            match self.signal.elem_size {
                1 => writer.write_i8(value as i8)?,
                2 => writer.write_i16::<LittleEndian>(value as i16)?,
                _ => writer.write_i32::<LittleEndian>(value)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for SignalSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample from Signal '{}' ({} blocks = {} samples)",
            self.signal.name,
            self.num_blocks(),
            self.len()
        )
    }
}

// ── SignalPair ───────────────────────────────────────────────────────────────

/// A dominant signal `a` and a subordinate signal `b` analysed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPair {
    pub a:     Signal,
    pub b:     Signal,
    pub ratio: f32,
}

impl SignalPair {
    pub fn new(a: Signal, b: Signal, ratio: f32) -> Self {
        Self { a, b, ratio }
    }

    /// `(a,b)`, the source label used by DSP and SAR files.
    pub fn name(&self) -> String {
        pair_label(&self.a.name, &self.b.name)
    }

    /// Decode one pair, resolving both names against `signals`.
    pub fn decode<R: Read>(reader: &mut R, signals: &[Signal]) -> Result<Self> {
        let name_a = read_text(&mut *reader, NAME_WIDTH)?;
        let name_b = read_text(&mut *reader, NAME_WIDTH)?;
        let ratio = reader.read_f32::<LittleEndian>()?;

        let resolve = |name: String| {
            signals
                .iter()
                .find(|s| s.name == name)
                .cloned()
                .ok_or(FormatError::MissingReferencedSignal(name))
        };
        Ok(Self { a: resolve(name_a)?, b: resolve(name_b)?, ratio })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_text(&mut *writer, "pair.a", &self.a.name, NAME_WIDTH)?;
        write_text(&mut *writer, "pair.b", &self.b.name, NAME_WIDTH)?;
        writer.write_f32::<LittleEndian>(self.ratio)?;
        Ok(())
    }
}

impl fmt::Display for SignalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pair {}: Ratio {}", self.name(), self.ratio)
    }
}

// ── Body header ──────────────────────────────────────────────────────────────

/// Layout shared by every signal in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockLayout {
    num_blocks: u32,
    block_size: u32,
    elem_size:  u32,
}

impl BlockLayout {
    fn sample_bytes(&self) -> Result<usize> {
        let samples = byte_len(self.block_size as usize, self.num_blocks as usize)?;
        byte_len(self.elem_size as usize, samples)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SampleHeader {
    timestamp:   u64,
    num_pairs:   u32,
    num_signals: u32,
    layout:      BlockLayout,
}

impl SampleHeader {
    fn read_body<R: Read>(reader: &mut R, generation: Generation) -> Result<Self> {
        let timestamp = match generation {
            Generation::Previous => reader.read_u32::<LittleEndian>()? as u64,
            Generation::Current  => reader.read_u64::<LittleEndian>()?,
        };
        let num_pairs = reader.read_u32::<LittleEndian>()?;
        let num_signals = reader.read_u32::<LittleEndian>()?;
        let num_blocks = reader.read_u32::<LittleEndian>()?;
        let block_size = reader.read_u32::<LittleEndian>()?;
        let elem_size = reader.read_u32::<LittleEndian>()?;
        if generation == Generation::Previous {
            read_bytes(&mut *reader, DB_HEADER_SIZE)?;
        }
        Ok(Self {
            timestamp,
            num_pairs,
            num_signals,
            layout: BlockLayout { num_blocks, block_size, elem_size },
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        FORMAT.write_preamble(&mut *writer)?;
        writer.write_u64::<LittleEndian>(self.timestamp)?;
        writer.write_u32::<LittleEndian>(self.num_pairs)?;
        writer.write_u32::<LittleEndian>(self.num_signals)?;
        writer.write_u32::<LittleEndian>(self.layout.num_blocks)?;
        writer.write_u32::<LittleEndian>(self.layout.block_size)?;
        writer.write_u32::<LittleEndian>(self.layout.elem_size)?;
        Ok(())
    }
}

// ── Sample ───────────────────────────────────────────────────────────────────

/// One acquisition: recorded signals in file order plus the pairs to
/// analyse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub signals: Vec<SignalSample>,
    pub pairs:   Vec<SignalPair>,
}

impl Sample {
    pub fn new(signals: Vec<SignalSample>, pairs: Vec<SignalPair>) -> Self {
        Self { signals, pairs }
    }

    pub fn signal(&self, name: &str) -> Option<&SignalSample> {
        self.signals.iter().find(|s| s.signal.name == name)
    }

    pub fn signal_mut(&mut self, name: &str) -> Option<&mut SignalSample> {
        self.signals.iter_mut().find(|s| s.signal.name == name)
    }

    /// Add or replace the recording of a signal.
    pub fn insert(&mut self, sample: SignalSample) {
        match self.signal_mut(&sample.signal.name) {
            Some(existing) => *existing = sample,
            None => self.signals.push(sample),
        }
    }

    /// Acquisition time, taken from the first signal.
    pub fn timestamp(&self) -> u64 {
        self.signals.first().map_or(0, |s| s.timestamp)
    }

    /// Shared layout of all signals.
    fn layout(&self) -> Result<BlockLayout> {
        let Some(first) = self.signals.first() else {
            return Ok(BlockLayout { num_blocks: 0, block_size: 0, elem_size: 0 });
        };
        let layout = BlockLayout {
            num_blocks: first.num_blocks(),
            block_size: first.signal.block_size,
            elem_size:  first.signal.elem_size,
        };
        first.signal.sample_range()?;

        for s in &self.signals[1..] {
            let other = BlockLayout {
                num_blocks: s.num_blocks(),
                block_size: s.signal.block_size,
                elem_size:  s.signal.elem_size,
            };
            if other != layout {
                return Err(FormatError::InconsistentSignals(format!(
                    "'{}' has {} blocks of {} x {} bytes, '{}' has {} blocks of {} x {} bytes",
                    first.signal.name,
                    layout.num_blocks,
                    layout.block_size,
                    layout.elem_size,
                    s.signal.name,
                    other.num_blocks,
                    other.block_size,
                    other.elem_size,
                )));
            }
        }
        Ok(layout)
    }

    /// Decode from the current position; headerless recordings are
    /// recognised by size and migrated.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let generation = match FORMAT.open(reader)? {
            Opened::Legacy(layout) => return legacy::migrate(layout, reader),
            Opened::Headered { generation, .. } => generation,
        };
        let header = SampleHeader::read_body(reader, generation)?;

        let mut signals = Vec::with_capacity(header.num_signals.min(64) as usize);
        for _ in 0..header.num_signals {
            signals.push(SignalSample::decode(reader, header.timestamp, &header.layout)?);
        }

        let descriptors: Vec<Signal> = signals.iter().map(|s| s.signal.clone()).collect();
        let mut pairs = Vec::with_capacity(header.num_pairs.min(64) as usize);
        for _ in 0..header.num_pairs {
            pairs.push(SignalPair::decode(reader, &descriptors)?);
        }
        Ok(Self { signals, pairs })
    }

    /// Always writes the current generation.  Samples past the last whole
    /// block are dropped.  Every pair must name signals held by the sample.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for pair in &self.pairs {
            for name in [&pair.a.name, &pair.b.name] {
                if self.signal(name).is_none() {
                    return Err(FormatError::MissingReferencedSignal(name.clone()));
                }
            }
        }
        let header = SampleHeader {
            timestamp:   self.timestamp(),
            num_pairs:   count_u32("pairs", self.pairs.len())?,
            num_signals: count_u32("signals", self.signals.len())?,
            layout:      self.layout()?,
        };
        header.write(writer)?;
        for s in &self.signals {
            s.encode(writer, header.layout.num_blocks)?;
        }
        for p in &self.pairs {
            p.encode(writer)?;
        }
        Ok(())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data sample from {}", self.timestamp())?;
        for p in &self.pairs {
            writeln!(f, "{p}")?;
        }
        for s in &self.signals {
            writeln!(f, "{}", s.signal)?;
        }
        Ok(())
    }
}

impl JsonMirror for Sample {}
