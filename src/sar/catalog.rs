//! Built-in analyses and the indexes each one produces.
//!
//! Most index names double as their symbol.  The exceptions are the main
//! peak, the severity features (Camel, Dragon, Bat, Snail) and the error
//! flags.

use crate::dsp::ops;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdAnalysis {
    pub name: &'static str,
    pub sym:  &'static str,
}

const fn from_op(op: &ops::StdOp) -> StdAnalysis {
    StdAnalysis { name: op.name, sym: op.sym }
}

pub const HR: StdAnalysis = StdAnalysis { name: "heart rate", sym: "hr" };
pub const APS: StdAnalysis = from_op(&ops::APS);
pub const AMP: StdAnalysis = from_op(&ops::AMP);
pub const CPS: StdAnalysis = from_op(&ops::CPS);
pub const CCR: StdAnalysis = from_op(&ops::CCR);
pub const IMR: StdAnalysis = from_op(&ops::IMR);
pub const PSA: StdAnalysis = from_op(&ops::PSA);
pub const XAR: StdAnalysis = from_op(&ops::XAR);
pub const COH: StdAnalysis = from_op(&ops::COH);

/// Catalogue order.
pub const STD_ANALYSES: [StdAnalysis; 9] = [HR, APS, CCR, CPS, AMP, XAR, IMR, PSA, COH];

// ── Indexes ──────────────────────────────────────────────────────────────────

/// (name, symbol)
pub type IndexEntry = (&'static str, &'static str);

pub const HR_INDEXES: &[IndexEntry] = &[
    ("RR", "RR"),
    ("HR", "HR"),
    ("S", "S"),
    ("SS", "SS"),
    ("F", "F"),
    ("FF", "FF"),
    ("Invalid Heart Rate", "ERRHR"),
    ("No Lead A Raw Rate", "ERRARR"),
    ("No Lead B Raw Rate", "ERRBRR"),
];

pub const AMP_INDEXES: &[IndexEntry] = &[
    ("A+", "A+"),
    ("A-", "A-"),
    ("n+", "n+"),
    ("n-", "n-"),
];

pub const APS_INDEXES: &[IndexEntry] = &[
    ("main peak", "MP"),
    ("1/2", "1/2"),
    ("O", "O"),
    ("N1", "N1"),
    ("N2", "N2"),
    ("N3", "N3"),
    ("U1", "U1"),
    ("U2", "U2"),
    ("U3", "U3"),
    ("U3xy", "U3xy"),
    ("U4", "U4"),
    ("U5", "U5"),
    ("A1", "A1"),
    ("A2", "A2"),
    ("A3", "A3"),
    ("A4", "A4"),
    ("A5", "A5"),
    ("A55", "A55"),
    ("AA1", "AA1"),
    ("AA4", "AA4"),
    ("AA12", "AA12"),
    ("AA34", "AA34"),
    ("AA123", "AA123"),
    ("Camel1", "C1"),
    ("Camel2", "C2"),
    ("Camel3", "C3"),
    ("Missing harmonic peaks", "ERRH5"),
];

pub const CCR_INDEXES: &[IndexEntry] = &[
    ("rrr", "rrr"),
    ("RRR", "RRR"),
    ("r", "r"),
    ("R", "R"),
    ("RR", "RR"),
    ("rr", "rr"),
    ("rR", "rR"),
    ("r2", "r2"),
    ("r22", "r22"),
    ("R2", "R2"),
    ("Ry-", "Ry-"),
    ("Ry+", "Ry+"),
    ("Rw-", "Rw-"),
    ("Rw+", "Rw+"),
    ("RVV-", "RVV-"),
    ("RVV+", "RVV+"),
    ("PT", "PT"),
    ("PT1", "PT1"),
    ("PT2", "PT2"),
    ("pt", "pt"),
    ("pt1", "pt1"),
    ("pt2", "pt2"),
    ("Rn", "Rn"),
    ("RM", "RM"),
    ("R+", "R+"),
    ("R-", "R-"),
    ("!R", "!R"),
    ("R!", "R!"),
    ("R^", "R^"),
    ("Snail1", "HHH"),
    ("Snail2", "L"),
    ("Snail3", "W"),
    ("Snail4", "Od"),
    ("Snail5", "Inv"),
    ("No Main Peak", "ERRMP"),
    ("No Center Max", "ERRMAX"),
    ("No V45 Curve", "ERRV45"),
];

pub const PSA_INDEXES: &[IndexEntry] = &[
    ("P+", "P+"),
    ("P+10", "P+10"),
    ("P+15", "P+15"),
    ("P+>15", "P+>15"),
    ("P-", "P-"),
    ("P-10", "P-10"),
    ("P-15", "P-15"),
    ("P->15", "P->15"),
    ("WW", "WW"),
    ("PWW+", "PWW+"),
    ("PWW-", "PWW-"),
    ("T+", "T+"),
    ("T-", "T-"),
    ("U+", "U+"),
    ("U-", "U-"),
    ("W+", "W+"),
    ("W-", "W-"),
    ("W", "W"),
    ("V+", "V+"),
    ("X++", "X++"),
    ("X-+", "X-+"),
    ("Y++", "Y++"),
    ("Y-+", "Y-+"),
    ("V-", "V-"),
    ("X--", "X--"),
    ("X+-", "X+-"),
    ("Y--", "Y--"),
    ("Y+-", "Y+-"),
    ("Z+1", "Z+1"),
    ("Z+2", "Z+2"),
    ("Z+3", "Z+3"),
    ("Z-1", "Z-1"),
    ("Z-2", "Z-2"),
    ("Z-3", "Z-3"),
    ("Dragon1", "WWs"),
    ("Dragon2", "Ct"),
    ("Dragon3", "HfW"),
];

pub const IMR_INDEXES: &[IndexEntry] = &[
    ("ff", "ff"),
    ("f", "f"),
    ("M1", "M1"),
    ("M3", "M3"),
    ("M2", "M2"),
    ("M4", "M4"),
    ("M5", "M5"),
    ("M6", "M6"),
    ("L", "L"),
    ("D1", "D1"),
    ("D2", "D2"),
    ("Bat1", "B1"),
    ("Bat2", "B2"),
    ("Too few apexes", "ERRPK"),
    ("No Main Peak", "ERRMP"),
    ("No Main M1 M2 Peak", "ERRM12"),
];

pub const COH_INDEXES: &[IndexEntry] = &[("Q1", "Q1"), ("Q2", "Q2")];

/// Index table for a standard analysis symbol.
pub fn indexes_for(analysis_sym: &str) -> &'static [IndexEntry] {
    match analysis_sym {
        "hr"  => HR_INDEXES,
        "amp" => AMP_INDEXES,
        "aps" => APS_INDEXES,
        "ccr" => CCR_INDEXES,
        "psa" => PSA_INDEXES,
        "imr" => IMR_INDEXES,
        "coh" => COH_INDEXES,
        _ => &[],
    }
}

/// Symbol of a standard index.  Symbols are only unique within one
/// analysis, hence the analysis argument.
pub fn index_sym(analysis_sym: &str, index_name: &str) -> Option<&'static str> {
    indexes_for(analysis_sym)
        .iter()
        .find(|(name, _)| *name == index_name)
        .map(|(_, sym)| *sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyses_share_dsp_names() {
        assert_eq!(APS.name, "auto power spectrum");
        assert_eq!(COH.sym, "coh");
        assert_eq!(STD_ANALYSES[0], HR);
    }

    #[test]
    fn symbols_are_scoped_per_analysis() {
        assert_eq!(index_sym("aps", "main peak"), Some("MP"));
        assert_eq!(index_sym("ccr", "Snail2"), Some("L"));
        assert_eq!(index_sym("imr", "L"), Some("L"));
        assert_eq!(index_sym("imr", "Bat2"), Some("B2"));
        assert_eq!(index_sym("xar", "anything"), None);
    }

    #[test]
    fn symbols_unique_within_analysis() {
        for analysis in STD_ANALYSES {
            let table = indexes_for(analysis.sym);
            for (i, (_, sym)) in table.iter().enumerate() {
                assert!(
                    table[i + 1..].iter().all(|(_, other)| other != sym),
                    "{} repeats {sym}",
                    analysis.sym
                );
            }
        }
    }
}
