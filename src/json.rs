//! JSON mirror of the in-memory containers.
//!
//! A thin pass-through to `serde_json`; the binary codecs never consult it.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub trait JsonMirror: Serialize + DeserializeOwned {
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
