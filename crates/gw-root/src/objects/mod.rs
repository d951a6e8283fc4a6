//! Streamed-object decoding, dispatched on the key's class name.

mod th1;

use crate::error::{Result, RootError};
use crate::histogram::Histogram;

/// Decode a histogram from an uncompressed key payload.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    let cells = match class_name {
        "TH1D" => th1::Cells::F64,
        "TH1F" => th1::Cells::F32,
        "TH1I" => th1::Cells::I32,
        _ => return Err(RootError::UnsupportedClass(class_name.to_string())),
    };
    let mut h = th1::read_th1x(payload, cells)?;
    h.class_name = class_name.to_string();
    Ok(h)
}
