//! # gw-root
//!
//! Native reader for the ROOT objects getweights needs: 1D histograms
//! (TH1D, TH1F, TH1I) stored at any directory depth of a `.root` file.
//! Keys compressed with zlib, LZ4, ZSTD or XZ are supported.
//!
//! ## Example
//!
//! ```no_run
//! use gw_root::RootFile;
//!
//! let f = RootFile::open("DAOD_SUSY10.root").unwrap();
//! let cutflow = f.get_histogram("cut_flow").unwrap();
//! println!("processed events: {:?}", cutflow.bin_content(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;

pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::Histogram;
pub use key::KeyInfo;
