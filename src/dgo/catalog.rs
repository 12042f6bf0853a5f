//! Built-in diagnosis and algorithm names.
//!
//! Lookups go through two maps built once on first use.  Alternate symbols
//! resolve to their canonical name but are never returned by
//! [`name_to_sym`].

use std::collections::HashMap;
use std::sync::OnceLock;

// ── Diagnoses ────────────────────────────────────────────────────────────────

pub const NORMAL: &str = "Normal";
pub const ABNORMAL: &str = "Abnormal";
pub const LOCAL_ISCHEMIA: &str = "Local Ischemia";
pub const GLOBAL_ISCHEMIA: &str = "Global Ischemia";
pub const VENTRICULAR_HYPERTROPHY: &str = "Ventricular Hypertrophy";
pub const MYOCARDIAL_INFARCT: &str = "Myocardial Infarct";
pub const HEART_RATE: &str = "Heart Rate";
pub const DISEASE_SEVERITY: &str = "Disease Severity";

/// (name, symbol) for every built-in diagnosis, in catalogue order.
pub const DIAGNOSES: &[(&str, &str)] = &[
    // impression
    (NORMAL, "NORM"),
    (ABNORMAL, "ABNORM"),
    ("Borderline", "BORD"),
    ("Borderline (arrhythmia)", "BLARRY"),
    ("Borderline (autonomic)", "BLAUTO"),
    // primary
    (LOCAL_ISCHEMIA, "CAD"),
    ("Local Ischemia (borderline)", "BLCAD"),
    (GLOBAL_ISCHEMIA, "NCI"),
    ("Global Ischemia (borderline)", "BLNCI"),
    ("Raw Disease Severity", "RSEV"),
    (DISEASE_SEVERITY, "SEV"),
    ("Disease Severity Score", "DS"),
    ("Disease Severity Sum", "DSSum"),
    ("Disease Severity Count", "DSCount"),
    ("Disease Severity Legacy Score", "DSOld"),
    // secondary
    (VENTRICULAR_HYPERTROPHY, "A"),
    ("Biventricular Hypertrophy", "BVH"),
    ("Left Ventricular Hypertrophy", "LVH"),
    ("Right Ventricular Hypertrophy", "RVH"),
    ("Ischemia", "C"),
    ("Rheumatic HD", "F"),
    ("Congenital HD", "G"),
    (MYOCARDIAL_INFARCT, "I"),
    ("Myocarditis", "K"),
    ("Cardio Myopathy", "M"),
    ("Atrial Fibrillation", "N"),
    ("Ventricular Fibrillation", "VFIB"),
    ("Potential Fibrillation", "PFIB"),
    ("Pulmonary HD", "U"),
    ("Arrhythmia", "T"),
    ("Ventricular Arrhythmia", "V"),
    ("Incipient Arrhythmia", "IARRY"),
    ("Intermittent Arrhythmia", "TARRY"),
    // tertiary
    ("Ejection Fraction", "EF"),
    ("Myocardial Remodelling", "MR"),
    ("Decreased Myocardial Compliance", "DMC"),
    ("Increased Myocardial Compliance", "IMC"),
    ("Local Asynchrony", "LA"),
    ("Signal B lags behind signal A (local)", "LAV5II"),
    ("Signal A lags behind signal B (local)", "LAIIV5"),
    ("Fibrillation", "FIB"),
    ("Global Asynchrony", "GA"),
    ("Signal B lags behind signal A (global)", "GAV5II"),
    ("Signal A lags behind signal B (global)", "GAIIV5"),
    ("Tachycardia", "TC"),
    ("Bradycardia", "BC"),
    ("Power Failure", "PF"),
    // meta
    ("Impression", "IMP"),
    ("Impression (text)", "IMPSTR"),
    ("Suggestion (1)", "SUGG1"),
    ("Suggestion (2)", "SUGG2"),
    ("Suggestion (3)", "SUGG3"),
    ("Suggestion (4)", "SUGG4"),
    ("Final Suggestion", "FIN1"),
    ("Final Suggestion (secondary)", "FIN2"),
    ("Final Suggestion (tertiary)", "FIN3"),
    ("Final Suggestion (quaternary)", "FIN4"),
    ("Relative Factor", "RF1"),
    ("Relative Factor (secondary)", "RF2"),
    ("Relative Factor (tertiary)", "RF3"),
    ("Relative Factor (quaternary)", "RF4"),
    ("DVBT", "DVBT"),
    ("DKIC", "DKIC"),
    ("Age Group", "AGRP"),
    (HEART_RATE, "HR"),
    ("Has CIM", "CIM"),
];

/// Symbols accepted on input only.
pub const ALTERNATE_SYMS: &[(&str, &str)] = &[
    ("H", VENTRICULAR_HYPERTROPHY),
    ("C(I)", MYOCARDIAL_INFARCT),
];

/// Standard MCG output diagnoses, in report order.
pub const MCG_DIAGNOSES: &[&str] = &[
    LOCAL_ISCHEMIA,
    "Local Ischemia (borderline)",
    GLOBAL_ISCHEMIA,
    "Global Ischemia (borderline)",
    VENTRICULAR_HYPERTROPHY,
    "Biventricular Hypertrophy",
    "Left Ventricular Hypertrophy",
    "Right Ventricular Hypertrophy",
    "Ischemia",
    "Rheumatic HD",
    "Congenital HD",
    MYOCARDIAL_INFARCT,
    "Myocarditis",
    "Cardio Myopathy",
    "Atrial Fibrillation",
    "Ventricular Fibrillation",
    "Potential Fibrillation",
    "Pulmonary HD",
    "Arrhythmia",
    "Ventricular Arrhythmia",
    "Incipient Arrhythmia",
    "Intermittent Arrhythmia",
    "Ejection Fraction",
    "Myocardial Remodelling",
    "Decreased Myocardial Compliance",
    "Increased Myocardial Compliance",
    "Local Asynchrony",
    "Signal B lags behind signal A (local)",
    "Signal A lags behind signal B (local)",
    "Fibrillation",
    "Global Asynchrony",
    "Signal B lags behind signal A (global)",
    "Signal A lags behind signal B (global)",
    "Tachycardia",
    "Bradycardia",
    "Power Failure",
];

// ── Algorithms ───────────────────────────────────────────────────────────────

pub const ALGORITHMS: &[(&str, &str)] = &[
    ("MCG Preliminary Analysis", "mcg-pre"),
    ("MCG Impression Analysis", "mcg-imp"),
    ("MCG Primary Analysis", "mcg-1"),
    ("MCG Ischemia Analysis", "mcg-cad"),
    ("MCG Disease Severity Analysis", "mcg-sev"),
    ("MCG Secondary Analysis", "mcg-2"),
    ("MCG Tertiary Analysis", "mcg-3"),
    ("MCG Final Analysis", "mcg-fin"),
    ("Clinical Review", "clinic"),
];

// ── Lookup ───────────────────────────────────────────────────────────────────

struct Catalog {
    by_name: HashMap<&'static str, &'static str>,
    by_sym:  HashMap<&'static str, &'static str>,
}

impl Catalog {
    fn build(entries: &[(&'static str, &'static str)], alternates: &[(&'static str, &'static str)]) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_sym = HashMap::with_capacity(entries.len() + alternates.len());
        for &(name, sym) in entries {
            by_name.entry(name).or_insert(sym);
            by_sym.entry(sym).or_insert(name);
        }
        for &(sym, name) in alternates {
            by_sym.entry(sym).or_insert(name);
        }
        Self { by_name, by_sym }
    }
}

fn diagnoses() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| Catalog::build(DIAGNOSES, ALTERNATE_SYMS))
}

fn algorithms() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| Catalog::build(ALGORITHMS, &[]))
}

pub fn name_to_sym(name: &str) -> Option<&'static str> {
    diagnoses().by_name.get(name).copied()
}

pub fn sym_to_name(sym: &str) -> Option<&'static str> {
    diagnoses().by_sym.get(sym).copied()
}

pub fn algorithm_sym(name: &str) -> Option<&'static str> {
    algorithms().by_name.get(name).copied()
}

pub fn algorithm_name(sym: &str) -> Option<&'static str> {
    algorithms().by_sym.get(sym).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_bidirectional() {
        assert_eq!(name_to_sym(LOCAL_ISCHEMIA), Some("CAD"));
        assert_eq!(sym_to_name("CAD"), Some(LOCAL_ISCHEMIA));
        assert_eq!(sym_to_name("DSCount"), Some("Disease Severity Count"));
        assert_eq!(name_to_sym("No Such Thing"), None);
    }

    #[test]
    fn alternates_resolve_but_never_win() {
        assert_eq!(sym_to_name("H"), Some(VENTRICULAR_HYPERTROPHY));
        assert_eq!(sym_to_name("C(I)"), Some(MYOCARDIAL_INFARCT));
        assert_eq!(name_to_sym(VENTRICULAR_HYPERTROPHY), Some("A"));
        assert_eq!(name_to_sym(MYOCARDIAL_INFARCT), Some("I"));
    }

    #[test]
    fn catalogue_has_no_duplicate_symbols() {
        let mut seen = std::collections::HashSet::new();
        for (_, sym) in DIAGNOSES {
            assert!(seen.insert(*sym), "duplicate symbol {sym}");
        }
    }

    #[test]
    fn mcg_output_set() {
        assert_eq!(MCG_DIAGNOSES.len(), 36);
        assert!(MCG_DIAGNOSES.iter().all(|n| name_to_sym(n).is_some()));
        assert_eq!(MCG_DIAGNOSES.last(), Some(&"Power Failure"));
    }

    #[test]
    fn algorithm_lookup() {
        assert_eq!(algorithm_sym("MCG Final Analysis"), Some("mcg-fin"));
        assert_eq!(algorithm_name("clinic"), Some("Clinical Review"));
    }
}
