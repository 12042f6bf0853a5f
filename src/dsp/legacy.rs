//! Headerless DSP dumps.
//!
//! Two firmware generations wrote the same raw i16 dump with no metadata:
//! K52 at offset 0 and P56 behind a 256-byte block.  Leads were always
//! V5 and II.  Migration seeds the standard operation set and fills it in
//! the fixed dump order; the cross power spectrum was never dumped and
//! stays empty.

use std::io::Read;

use super::{ops, Dsp, StdOp};
use crate::error::Result;
use crate::header::LegacyLayout;
use crate::wire::read_i16s;

pub const P56_SIZE: u64 = 5652;
pub const P56_ALT_SIZE: u64 = 5689;
pub const P56_DATA_OFFSET: u64 = 256;
pub const K52_SIZE: u64 = 5290;

pub const LAYOUTS: [LegacyLayout; 3] = [
    LegacyLayout { name: "P56", size: P56_SIZE, skip: P56_DATA_OFFSET },
    LegacyLayout { name: "P56", size: P56_ALT_SIZE, skip: P56_DATA_OFFSET },
    LegacyLayout { name: "K52", size: K52_SIZE, skip: 0 },
];

pub const SIG_A: &str = "V5";
pub const SIG_B: &str = "II";

enum Source {
    A,
    B,
    Pair,
}

/// Dump order: operation, which lead, sample count.
const DUMP_ORDER: [(&StdOp, Source, usize); 11] = [
    (&ops::APS, Source::A, 128),
    (&ops::APS, Source::B, 128),
    (&ops::COH, Source::Pair, 128),
    (&ops::XAR, Source::Pair, 128),
    (&ops::PSA, Source::Pair, 128),
    (&ops::IMR, Source::Pair, 256),
    (&ops::CCR, Source::Pair, 512),
    (&ops::AMP, Source::A, 100),
    (&ops::AMP, Source::B, 100),
    (&ops::QRS, Source::A, 512),
    (&ops::QRS, Source::B, 512),
];

/// Bytes consumed from the dump.
pub const DUMP_BYTES: usize = {
    let mut total = 0;
    let mut i = 0;
    while i < DUMP_ORDER.len() {
        total += DUMP_ORDER[i].2 * 2;
        i += 1;
    }
    total
};

/// Rebuild a DSP container from a dump.  The reader is positioned past any
/// fixed offset already.
pub fn migrate<R: Read>(layout: &LegacyLayout, reader: &mut R) -> Result<Dsp> {
    tracing::debug!(layout = layout.name, size = layout.size, "migrating headerless DSP dump");
    let pair = ops::pair_label(SIG_A, SIG_B);
    let mut dsp = Dsp::default();
    dsp.create_std_ops(SIG_A, SIG_B);

    for (std_op, source, count) in &DUMP_ORDER {
        let data = read_i16s(&mut *reader, *count)?;
        let source = match source {
            Source::A    => SIG_A,
            Source::B    => SIG_B,
            Source::Pair => pair.as_str(),
        };
        if let Some(op) = dsp.operation_mut(std_op.name, Some(source)) {
            op.data = data;
        }
    }
    Ok(dsp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use std::io::Cursor;

    /// Dump where every sample of a block holds its 1-based block index.
    fn dump(prefix: usize, total: u64) -> Vec<u8> {
        let mut buf = vec![0xEEu8; prefix];
        for (n, (_, _, count)) in DUMP_ORDER.iter().enumerate() {
            for _ in 0..*count {
                buf.extend_from_slice(&(n as i16 + 1).to_le_bytes());
            }
        }
        buf.resize(total as usize, 0);
        buf
    }

    #[test]
    fn dump_fits_every_layout() {
        assert_eq!(DUMP_BYTES, 5264);
        for layout in &LAYOUTS {
            assert!(layout.skip as usize + DUMP_BYTES <= layout.size as usize);
        }
    }

    #[test]
    fn k52_is_routed_and_filled_in_dump_order() {
        let dsp = Dsp::read(&mut Cursor::new(dump(0, K52_SIZE))).unwrap();
        assert_eq!(dsp.operations.len(), 12);

        let aps_b = dsp.operation(ops::APS.name, Some(SIG_B)).unwrap();
        assert_eq!(aps_b.data.len(), 128);
        assert!(aps_b.data.iter().all(|&v| v == 2));

        let ccr = dsp.operation(ops::CCR.name, None).unwrap();
        assert_eq!(ccr.data.len(), 512);
        assert_eq!(ccr.data[0], 7);

        let qrs_b = dsp.operation(ops::QRS.name, Some(SIG_B)).unwrap();
        assert_eq!((qrs_b.data.len(), qrs_b.data[511]), (512, 11));

        assert!(dsp.operation(ops::CPS.name, None).unwrap().data.is_empty());
    }

    #[test]
    fn p56_skips_its_preamble_block() {
        for size in [P56_SIZE, P56_ALT_SIZE] {
            let dsp = Dsp::read(&mut Cursor::new(dump(P56_DATA_OFFSET as usize, size))).unwrap();
            let aps_a = dsp.operation(ops::APS.name, Some(SIG_A)).unwrap();
            assert_eq!(aps_a.data[0], 1);
            assert_eq!(dsp.operation(ops::AMP.name, Some(SIG_B)).unwrap().data.len(), 100);
        }
    }

    #[test]
    fn migrated_file_upgrades_to_current_generation() {
        let dsp = Dsp::read(&mut Cursor::new(dump(0, K52_SIZE))).unwrap();
        let mut out = Vec::new();
        dsp.write(&mut out).unwrap();
        assert_eq!(&out[..4], b"DSPl");
        assert_eq!(f32::from_le_bytes(out[4..8].try_into().unwrap()), 2.2);
        assert_eq!(Dsp::read(&mut Cursor::new(out)).unwrap(), dsp);
    }
}
