//! Legacy Linear Output: the fixed-order flat vector older diagnosis code
//! consumes instead of named lookups.
//!
//! Slots are resolved by name against the standard analyses of the lead
//! pair, so the storage order of analyses inside a [`Sar`] never matters.

use super::catalog::{StdAnalysis, AMP, APS, CCR, COH, HR, IMR, PSA};
use super::{Analysis, Index, Sar};
use crate::error::{FormatError, Result};

pub const LLO_LEN: usize = 132;
pub const LLO_EXTENDED_LEN: usize = LLO_LEN + 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    Primary,
    Secondary,
    Pair,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    lead:     Lead,
    analysis: StdAnalysis,
    index:    &'static str,
    truncate: bool,
}

const fn slot(lead: Lead, analysis: StdAnalysis, index: &'static str) -> Slot {
    Slot { lead, analysis, index, truncate: true }
}

const fn raw(lead: Lead, analysis: StdAnalysis, index: &'static str) -> Slot {
    Slot { lead, analysis, index, truncate: false }
}

use Lead::{Pair, Primary, Secondary};

/// One lead's block: APS features with the pair's heart-rate features
/// spliced in after N3.
const fn lead_block(lead: Lead) -> [Slot; 26] {
    [
        slot(lead, APS, "1/2"),
        slot(lead, APS, "O"),
        slot(lead, APS, "U1"),
        slot(lead, APS, "U2"),
        slot(lead, APS, "U3"),
        slot(lead, APS, "U3xy"),
        slot(lead, APS, "U4"),
        slot(lead, APS, "N1"),
        slot(lead, APS, "N3"),
        slot(Pair, HR, "S"),
        slot(Pair, HR, "SS"),
        slot(Pair, HR, "F"),
        slot(Pair, HR, "FF"),
        slot(lead, APS, "A1"),
        slot(lead, APS, "A2"),
        slot(lead, APS, "A3"),
        slot(lead, APS, "A4"),
        slot(lead, APS, "A5"),
        slot(lead, APS, "A55"),
        slot(lead, APS, "N2"),
        slot(lead, APS, "AA12"),
        slot(lead, APS, "AA34"),
        slot(lead, APS, "AA123"),
        slot(lead, APS, "AA1"),
        slot(lead, APS, "AA4"),
        slot(lead, APS, "U5"),
    ]
}

const GXX: [Slot; 26] = lead_block(Primary);
const GYY: [Slot; 26] = lead_block(Secondary);

const QXY: [Slot; 6] = [
    slot(Pair, PSA, "P+"),
    slot(Pair, PSA, "P-"),
    slot(Pair, PSA, "WW"),
    slot(Pair, PSA, "PWW+"),
    slot(Pair, PSA, "PWW-"),
    slot(Pair, IMR, "L"),
];

const RH: [Slot; 2] = [slot(Pair, COH, "Q1"), slot(Pair, COH, "Q2")];

const PIH: [Slot; 10] = [
    slot(Pair, IMR, "D1"),
    slot(Pair, IMR, "D2"),
    slot(Pair, IMR, "f"),
    slot(Pair, IMR, "M1"),
    slot(Pair, IMR, "M3"),
    slot(Pair, IMR, "M2"),
    slot(Pair, IMR, "M4"),
    slot(Pair, IMR, "M5"),
    slot(Pair, IMR, "M6"),
    slot(Pair, IMR, "ff"),
];

const HA: [Slot; 8] = [
    slot(Primary, AMP, "A+"),
    slot(Secondary, AMP, "A+"),
    slot(Primary, AMP, "A-"),
    slot(Secondary, AMP, "A-"),
    slot(Primary, AMP, "n+"),
    slot(Secondary, AMP, "n+"),
    slot(Primary, AMP, "n-"),
    slot(Secondary, AMP, "n-"),
];

const VXY: [Slot; 25] = [
    slot(Pair, CCR, "rrr"),
    slot(Pair, CCR, "RRR"),
    slot(Pair, CCR, "r"),
    slot(Pair, CCR, "R"),
    slot(Pair, CCR, "RR"),
    slot(Pair, CCR, "rr"),
    slot(Pair, CCR, "rR"),
    slot(Pair, CCR, "R+"),
    slot(Pair, CCR, "R-"),
    slot(Pair, CCR, "Rw+"),
    slot(Pair, CCR, "Rw-"),
    slot(Pair, CCR, "PT1"),
    slot(Pair, CCR, "PT2"),
    slot(Pair, CCR, "pt1"),
    slot(Pair, CCR, "pt2"),
    slot(Pair, CCR, "Rn"),
    slot(Pair, CCR, "RVV+"),
    slot(Pair, CCR, "RVV-"),
    slot(Pair, CCR, "R^"),
    slot(Pair, CCR, "!R"),
    slot(Pair, CCR, "R!"),
    slot(Pair, CCR, "r2"),
    slot(Pair, CCR, "R2"),
    slot(Pair, CCR, "r22"),
    slot(Pair, CCR, "RM"),
];

const Q: [Slot; 29] = [
    slot(Pair, PSA, "T+"),
    slot(Pair, PSA, "T-"),
    slot(Pair, PSA, "U+"),
    slot(Pair, PSA, "U-"),
    slot(Pair, PSA, "W+"),
    slot(Pair, PSA, "W-"),
    slot(Pair, PSA, "W"),
    slot(Pair, PSA, "P+10"),
    slot(Pair, PSA, "P+15"),
    slot(Pair, PSA, "P+>15"),
    slot(Pair, PSA, "P-10"),
    slot(Pair, PSA, "P-15"),
    slot(Pair, PSA, "P->15"),
    slot(Pair, PSA, "V+"),
    slot(Pair, PSA, "V-"),
    slot(Pair, PSA, "X++"),
    slot(Pair, PSA, "X+-"),
    slot(Pair, PSA, "X--"),
    slot(Pair, PSA, "X-+"),
    slot(Pair, PSA, "Y++"),
    slot(Pair, PSA, "Y--"),
    slot(Pair, PSA, "Y+-"),
    slot(Pair, PSA, "Y-+"),
    slot(Pair, PSA, "Z+1"),
    slot(Pair, PSA, "Z+2"),
    slot(Pair, PSA, "Z+3"),
    slot(Pair, PSA, "Z-1"),
    slot(Pair, PSA, "Z-2"),
    slot(Pair, PSA, "Z-3"),
];

/// Severity features appended by the extended export.
const SEVERITY: [Slot; 16] = [
    raw(Primary, APS, "Camel1"),
    raw(Primary, APS, "Camel2"),
    raw(Primary, APS, "Camel3"),
    raw(Secondary, APS, "Camel1"),
    raw(Secondary, APS, "Camel2"),
    raw(Secondary, APS, "Camel3"),
    slot(Pair, PSA, "Dragon1"),
    slot(Pair, PSA, "Dragon2"),
    slot(Pair, PSA, "Dragon3"),
    slot(Pair, IMR, "Bat1"),
    slot(Pair, IMR, "Bat2"),
    slot(Pair, CCR, "Snail1"),
    slot(Pair, CCR, "Snail2"),
    slot(Pair, CCR, "Snail3"),
    slot(Pair, CCR, "Snail4"),
    slot(Pair, CCR, "Snail5"),
];

const SECTIONS: [&[Slot]; 8] = [&GXX, &GYY, &QXY, &RH, &PIH, &HA, &VXY, &Q];

fn base_slots() -> impl Iterator<Item = &'static Slot> {
    SECTIONS.into_iter().flatten()
}

impl Sar {
    fn lead_source(&self, lead: Lead) -> &str {
        match lead {
            Primary   => self.primary_lead_name(),
            Secondary => self.secondary_lead_name(),
            Pair      => self.lead_pair_name(),
        }
    }

    fn slot_analysis(&self, slot: &Slot) -> Result<&Analysis> {
        let source = self.lead_source(slot.lead);
        self.analysis(slot.analysis.name, Some(source))
            .ok_or_else(|| FormatError::MissingAnalysis {
                name:         slot.analysis.name.to_string(),
                source_label: source.to_string(),
            })
    }

    fn slot_value(&self, slot: &Slot) -> Result<f64> {
        let value = self
            .slot_analysis(slot)?
            .index(slot.index)
            .map_or(0.0, |i| i.value as f64);
        Ok(if slot.truncate { value.trunc() } else { value })
    }

    /// The 132 indexes of the linear export, in export order.  Absent
    /// indexes are `None`.
    pub fn legacy_indexes(&self) -> Result<Vec<Option<&Index>>> {
        base_slots()
            .map(|slot| Ok(self.slot_analysis(slot)?.index(slot.index)))
            .collect()
    }

    /// The 132-value linear export.  Values are truncated toward zero and
    /// absent indexes read as 0.
    pub fn to_llo(&self) -> Result<Vec<f64>> {
        tracing::debug!(pair = self.lead_pair_name(), "building linear output");
        base_slots().map(|slot| self.slot_value(slot)).collect()
    }

    /// [`Sar::to_llo`] followed by the 16 severity features.  The Camel
    /// values keep their fractional part.
    pub fn to_llo_extended(&self) -> Result<Vec<f64>> {
        let mut llo = self.to_llo()?;
        for slot in &SEVERITY {
            llo.push(self.slot_value(slot)?);
        }
        Ok(llo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every slot gets a distinct value: slot position plus 0.75.
    fn populated() -> Sar {
        let mut sar = Sar::new(0);
        sar.create_std_analyses("V5", "II");
        for (n, slot) in base_slots().chain(SEVERITY.iter()).enumerate() {
            let source = sar.lead_source(slot.lead).to_string();
            let analysis = sar.analysis_mut(slot.analysis.name, Some(&source)).unwrap();
            if !analysis.contains(slot.index) {
                analysis.add_std_index(slot.index, n as f32 + 0.75);
            }
        }
        sar
    }

    #[test]
    fn section_lengths() {
        assert_eq!(base_slots().count(), LLO_LEN);
        assert_eq!(LLO_LEN + SEVERITY.len(), LLO_EXTENDED_LEN);
    }

    #[test]
    fn fixed_positions() {
        let llo = populated().to_llo().unwrap();
        assert_eq!(llo.len(), LLO_LEN);
        assert_eq!(llo[0], 0.0);
        assert_eq!(llo[8], 8.0);
        // HR is shared by both lead blocks and keeps its first value.
        assert_eq!(llo[9], 9.0);
        assert_eq!(llo[35], 9.0);
        assert_eq!(llo[26], 26.0);
        assert_eq!(llo[57], 57.0);
        assert_eq!(llo[71], 71.0);
        assert_eq!(llo[131], 131.0);
    }

    #[test]
    fn extended_keeps_camel_fraction() {
        let llo = populated().to_llo_extended().unwrap();
        assert_eq!(llo.len(), LLO_EXTENDED_LEN);
        assert_eq!(llo[132], 132.75);
        assert_eq!(llo[137], 137.75);
        assert_eq!(llo[138], 138.0);
        assert_eq!(llo[147], 147.0);
    }

    #[test]
    fn storage_order_is_irrelevant() {
        let sar = populated();
        let mut shuffled = sar.clone();
        shuffled.analyses.reverse();
        shuffled.analyses.rotate_left(3);
        // The pair label must still be found first among pair analyses.
        assert_eq!(shuffled.lead_pair_name(), "(V5,II)");
        assert_eq!(shuffled.to_llo_extended().unwrap(), sar.to_llo_extended().unwrap());
    }

    #[test]
    fn missing_index_reads_zero() {
        let mut sar = Sar::new(0);
        sar.create_std_analyses("V5", "II");
        let llo = sar.to_llo().unwrap();
        assert!(llo.iter().all(|&v| v == 0.0));

        let indexes = sar.legacy_indexes().unwrap();
        assert_eq!(indexes.len(), LLO_LEN);
        assert!(indexes.iter().all(Option::is_none));
    }

    #[test]
    fn legacy_indexes_follow_export_order() {
        let sar = populated();
        let indexes = sar.legacy_indexes().unwrap();
        assert_eq!(indexes[57].unwrap().name, "L");
        assert_eq!(indexes[103].unwrap().sym, "T+");
        assert_eq!(indexes[0].unwrap().value, 0.75);
    }

    #[test]
    fn missing_analysis_is_an_error() {
        let mut sar = Sar::new(0);
        sar.create_std_analyses("V5", "II");
        sar.analyses.retain(|a| a.sym != "coh");
        let err = sar.to_llo().unwrap_err();
        assert!(matches!(err, FormatError::MissingAnalysis { ref name, ref source_label }
            if name == "coherence" && source_label == "(V5,II)"));
    }
}
