pub mod error;
pub mod wire;
pub mod value;
pub mod header;
pub mod container;
pub mod json;
pub mod dcf;
pub mod dgo;
pub mod dsp;
pub mod sar;
pub mod ecg;

pub use error::{FormatError, Result};
pub use value::{ElementArray, ElementType, TableValue, TaggedValue, TypeTag};
pub use header::{FamilyFormat, Generation, LegacyLayout, Opened};
pub use container::{Container, Record};
pub use json::JsonMirror;
pub use dcf::{Dcf, DcfList};
pub use dgo::{Algorithm, Diagnosis, Dgo};
pub use dsp::{Dsp, Op};
pub use sar::{Analysis, Index, IntData, Sar};
pub use ecg::{Sample, Signal, SignalPair, SignalSample};
