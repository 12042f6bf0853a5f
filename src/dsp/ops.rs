//! Built-in DSP operations.

use super::{Op, SourceType};

/// Descriptive text shared by every instance of a standard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdOp {
    pub name:   &'static str,
    pub sym:    &'static str,
    pub domain: &'static str,
    pub label:  &'static str,
    pub x_axis: &'static str,
    pub y_axis: &'static str,
}

impl StdOp {
    /// An empty operation of this kind for `source`.
    pub fn instantiate(&self, source: &str, src_type: SourceType) -> Op {
        Op {
            source:   source.to_string(),
            src_type,
            name:     self.name.to_string(),
            sym:      self.sym.to_string(),
            label:    self.label.to_string(),
            domain:   self.domain.to_string(),
            x_axis:   self.x_axis.to_string(),
            y_axis:   self.y_axis.to_string(),
            data:     Vec::new(),
        }
    }
}

pub const QRS: StdOp = StdOp {
    name:   "qrs complex",
    sym:    "qrs",
    domain: "time",
    label:  "representative qrs complex",
    x_axis: "time in milliseconds (ms)",
    y_axis: "amplitude in millivolts (mV)",
};

pub const AMP: StdOp = StdOp {
    name:   "amplitude",
    sym:    "amp",
    domain: "amplitude",
    label:  "ratio of frequency to amplitude",
    x_axis: "amplitude in millivolts (mV)",
    y_axis: "count",
};

pub const APS: StdOp = StdOp {
    name:   "auto power spectrum",
    sym:    "aps",
    domain: "frequency",
    label:  "power peaks in signal",
    x_axis: "frequency in Hz",
    y_axis: "power in watts",
};

pub const CPS: StdOp = StdOp {
    name:   "cross power spectrum",
    sym:    "cps",
    domain: "frequency",
    label:  "power peaks in signal pair",
    x_axis: "frequency in Hz",
    y_axis: "power in watts",
};

pub const CCR: StdOp = StdOp {
    name:   "cross correlation",
    sym:    "ccr",
    domain: "frequency",
    label:  "r-wave correlation of signals",
    x_axis: "time in milliseconds (ms)",
    y_axis: "amplitude in millivolts (mV)",
};

pub const IMR: StdOp = StdOp {
    name:   "impulse response",
    sym:    "imr",
    domain: "transfer",
    label:  "ratio of latency to amplitude",
    x_axis: "latency",
    y_axis: "amplitude in millivolts (mV)",
};

pub const PSA: StdOp = StdOp {
    name:   "phase shift angle",
    sym:    "psa",
    domain: "transfer",
    label:  "degree of synchronization between signals",
    x_axis: "frequency in Hz",
    y_axis: "phase shift in degrees",
};

pub const XAR: StdOp = StdOp {
    name:   "transfer amplitude ratio",
    sym:    "xar",
    domain: "transfer",
    label:  "ratio of cross to auto power spectrum",
    x_axis: "frequency in Hz",
    y_axis: "amplitude ratio of cps and aps",
};

pub const COH: StdOp = StdOp {
    name:   "coherence",
    sym:    "coh",
    domain: "correlation",
    label:  "ratio of square of cross to auto power spectrum",
    x_axis: "frequency in Hz",
    y_axis: "amplitude ratio squared",
};

/// Catalogue order.
pub const STD_OPERATIONS: [&StdOp; 9] = [&QRS, &APS, &CCR, &CPS, &AMP, &XAR, &IMR, &PSA, &COH];

/// Per-signal operations, each created once per lead.
pub(super) const SIGNAL_OPS: [&StdOp; 3] = [&QRS, &APS, &AMP];

/// Signal-pair operations, created once for the pair.
pub(super) const PAIR_OPS: [&StdOp; 6] = [&CPS, &CCR, &IMR, &PSA, &XAR, &COH];

pub fn by_sym(sym: &str) -> Option<&'static StdOp> {
    STD_OPERATIONS.iter().copied().find(|op| op.sym == sym)
}

/// Source label for a signal pair, e.g. `(V5,II)`.
pub fn pair_label(sig_a: &str, sig_b: &str) -> String {
    format!("({sig_a},{sig_b})")
}
