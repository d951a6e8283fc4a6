//! TH1D / TH1F / TH1I streamers.
//!
//! ```text
//! TH1x
//!   ├─ TH1
//!   │    ├─ TNamed, TAttLine, TAttFill, TAttMarker
//!   │    ├─ fNcells
//!   │    ├─ fXaxis, fYaxis, fZaxis          (TAxis)
//!   │    ├─ fBarOffset, fBarWidth           (i16)
//!   │    ├─ fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
//!   │    ├─ fMaximum, fMinimum              (v >= 2)
//!   │    ├─ fNormFactor                     (v >= 3)
//!   │    ├─ fContour, fSumw2                (TArrayD)
//!   │    └─ fOption, fFunctions, fBuffer, ... (skipped via byte count)
//!   └─ TArrayD / TArrayF / TArrayI          (fNcells cell contents)
//! ```

use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::rbuffer::RBuffer;

/// Cell storage type of the concrete TH1 class.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Cells {
    F64,
    F32,
    I32,
}

/// Body sizes of the attribute classes when written without a byte count.
const TATTLINE_LEN: usize = 6;
const TATTFILL_LEN: usize = 4;
const TATTMARKER_LEN: usize = 8;

struct Th1Base {
    name: String,
    title: String,
    n_cells: usize,
    axis: Axis,
    entries: f64,
}

struct Axis {
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    /// Variable bin edges; empty for uniform binning
    edges: Vec<f64>,
}

pub(crate) fn read_th1x(data: &[u8], cells: Cells) -> Result<Histogram> {
    let mut r = RBuffer::new(data);
    let header = r.read_version()?;
    let base = read_th1(&mut r)?;

    let raw = match cells {
        Cells::F64 => r.read_array_f64()?,
        Cells::F32 => r.read_array_f32()?,
        Cells::I32 => r.read_array_i32()?,
    };
    r.finish(header)?;

    if raw.len() != base.n_cells || base.n_cells != base.axis.n_bins + 2 {
        return Err(RootError::Deserialization(format!(
            "histogram '{}': {} cells stored, fNcells {}, {} bins",
            base.name,
            raw.len(),
            base.n_cells,
            base.axis.n_bins
        )));
    }

    let Axis { n_bins, x_min, x_max, edges } = base.axis;
    let edges = if edges.is_empty() {
        let width = (x_max - x_min) / n_bins as f64;
        (0..=n_bins).map(|i| x_min + i as f64 * width).collect()
    } else {
        edges
    };

    Ok(Histogram {
        name: base.name,
        title: base.title,
        class_name: String::new(),
        n_bins,
        edges,
        cells: raw,
        entries: base.entries,
    })
}

fn read_th1(r: &mut RBuffer) -> Result<Th1Base> {
    let header = r.read_version()?;
    let version = header.version;

    let (name, title) = r.read_tnamed()?;
    r.skip_object(TATTLINE_LEN)?;
    r.skip_object(TATTFILL_LEN)?;
    r.skip_object(TATTMARKER_LEN)?;

    let n_cells = r.read_i32()?;
    let n_cells = usize::try_from(n_cells)
        .map_err(|_| RootError::Deserialization(format!("negative fNcells {n_cells}")))?;

    let axis = read_axis(r)?;
    skip_axis(r)?;
    skip_axis(r)?;

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    r.skip(4 * 8)?;
    if version >= 2 {
        // fMaximum, fMinimum
        r.skip(2 * 8)?;
    }
    if version >= 3 {
        let _norm_factor = r.read_f64()?;
    }
    let _contour = r.read_array_f64()?;
    let _sumw2 = r.read_array_f64()?;

    if header.end.is_some() {
        r.finish(header)?;
    } else {
        skip_th1_tail(r, version)?;
    }

    Ok(Th1Base { name, title, n_cells, axis, entries })
}

/// fOption, fFunctions, fBuffer and the statistics options of very old files
/// that were written without a TH1 byte count.
fn skip_th1_tail(r: &mut RBuffer, version: u16) -> Result<()> {
    let _option = r.read_string()?;
    let functions = r.read_version()?;
    if functions.end.is_none() {
        return Err(RootError::Deserialization("TH1 fFunctions without byte count".into()));
    }
    r.finish(functions)?;
    if version >= 4 {
        let buffer_size = r.read_i32()?;
        r.skip(1)?;
        r.skip(usize::try_from(buffer_size).unwrap_or(0) * 8)?;
    }
    if version >= 7 {
        let _bin_stat_err_opt = r.read_i32()?;
    }
    if version >= 8 {
        let _stat_overflows = r.read_i32()?;
    }
    Ok(())
}

fn read_axis(r: &mut RBuffer) -> Result<Axis> {
    let header = r.read_version()?;
    if header.end.is_none() {
        return Err(RootError::Deserialization("TAxis without byte count".into()));
    }
    r.read_tnamed()?;
    // TAttAxis is always written with a byte count alongside a TAxis one.
    r.skip_object(0)?;

    let n_bins = r.read_i32()?;
    let n_bins = usize::try_from(n_bins)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| RootError::Deserialization(format!("axis with {n_bins} bins")))?;
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;
    let edges = r.read_array_f64()?;
    if !edges.is_empty() && edges.len() != n_bins + 1 {
        return Err(RootError::Deserialization(format!(
            "axis has {} edges for {n_bins} bins",
            edges.len()
        )));
    }

    // fFirst, fLast, fBits2, fTimeDisplay, fTimeFormat, fLabels, fModLabs
    r.finish(header)?;
    Ok(Axis { n_bins, x_min, x_max, edges })
}

fn skip_axis(r: &mut RBuffer) -> Result<()> {
    let header = r.skip_object(0)?;
    if header.end.is_none() {
        return Err(RootError::Deserialization("TAxis without byte count".into()));
    }
    Ok(())
}
