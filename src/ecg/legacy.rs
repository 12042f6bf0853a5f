//! Headerless two-lead recordings.
//!
//! The V1 recorder wrote two f32 gains followed by 16 blocks of 512 i16
//! samples for V5, then the same for II.  K32 units prefixed the identical
//! payload with a 256-byte block.  Names, block layout and the pair ratio
//! were never stored.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{Sample, Signal, SignalPair, SignalSample};
use crate::error::Result;
use crate::header::{now_timestamp, LegacyLayout};
use crate::wire::read_i16s;

pub const K32_SIZE: u64 = 33032;
pub const K32_DATA_OFFSET: u64 = 256;
pub const V1_SIZE: u64 = 32776;

pub const LAYOUTS: [LegacyLayout; 2] = [
    LegacyLayout { name: "K32", size: K32_SIZE, skip: K32_DATA_OFFSET },
    LegacyLayout { name: "V1", size: V1_SIZE, skip: 0 },
];

pub const LEAD_A: &str = "V5";
pub const LEAD_B: &str = "II";
pub const RATIO: f32 = 1.3;
pub const ELEM_SIZE: u32 = 2;
pub const BLOCK_SIZE: u32 = 512;
pub const NUM_BLOCKS: u32 = 16;

const SAMPLES_PER_LEAD: usize = (BLOCK_SIZE * NUM_BLOCKS) as usize;

/// Rebuild a sample from a headerless recording.  The reader is positioned
/// at the gains.
pub fn migrate<R: Read>(layout: &LegacyLayout, reader: &mut R) -> Result<Sample> {
    tracing::debug!(layout = layout.name, size = layout.size, "migrating headerless ECG recording");
    let gain_a = reader.read_f32::<LittleEndian>()?;
    let gain_b = reader.read_f32::<LittleEndian>()?;

    let timestamp = now_timestamp();
    let mut signals = Vec::with_capacity(2);
    for (name, gain) in [(LEAD_A, gain_a), (LEAD_B, gain_b)] {
        let data = read_i16s(&mut *reader, SAMPLES_PER_LEAD)?;
        let signal = Signal::new(name, ELEM_SIZE, BLOCK_SIZE, gain);
        signals.push(SignalSample::new(
            signal,
            data.into_iter().map(i32::from).collect(),
            timestamp,
        ));
    }

    let pair = SignalPair::new(signals[0].signal.clone(), signals[1].signal.clone(), RATIO);
    Ok(Sample::new(signals, vec![pair]))
}
