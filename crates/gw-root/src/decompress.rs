//! Inflate ROOT compressed object payloads.
//!
//! A compressed payload is a sequence of blocks, each with a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm ("ZL" zlib, "L4" LZ4, "ZS" zstd, "XZ" lzma)
//! byte  2:    method (unused here)
//! bytes 3-5:  compressed size   (24-bit little-endian)
//! bytes 6-8:  uncompressed size (24-bit little-endian)
//! ```

use std::io::Read;

use crate::error::{Result, RootError};

const BLOCK_HEADER_LEN: usize = 9;
/// LZ4 blocks start with an xxhash64 checksum of the uncompressed data.
const LZ4_CHECKSUM_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Zlib,
    Lz4,
    Zstd,
    Xz,
}

impl Algorithm {
    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"ZL" => Ok(Self::Zlib),
            b"L4" => Ok(Self::Lz4),
            b"ZS" => Ok(Self::Zstd),
            b"XZ" => Ok(Self::Xz),
            other => Err(RootError::Decompression(format!(
                "unsupported compression algorithm {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn inflate(self, block: &[u8], expected: usize) -> Result<Vec<u8>> {
        let fail = |e: &dyn std::fmt::Display| RootError::Decompression(format!("{self:?}: {e}"));
        let mut out = Vec::with_capacity(expected);
        match self {
            Self::Zlib => {
                flate2::read::ZlibDecoder::new(block).read_to_end(&mut out).map_err(|e| fail(&e))?;
            }
            Self::Lz4 => {
                let body = block.get(LZ4_CHECKSUM_LEN..).ok_or_else(|| {
                    RootError::Decompression("LZ4 block shorter than its checksum".into())
                })?;
                out = lz4_flex::decompress(body, expected).map_err(|e| fail(&e))?;
            }
            Self::Zstd => {
                out = zstd::bulk::decompress(block, expected).map_err(|e| fail(&e))?;
            }
            Self::Xz => {
                lzma_rs::xz_decompress(&mut std::io::BufReader::new(block), &mut out)
                    .map_err(|e| fail(&e))?;
            }
        }
        Ok(out)
    }
}

/// Inflate `src` into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len {
        let header = src.get(offset..offset + BLOCK_HEADER_LEN).ok_or_else(|| {
            RootError::Decompression(format!(
                "truncated block header at offset {offset} ({} of {expected_len} bytes inflated)",
                out.len()
            ))
        })?;
        let algorithm = Algorithm::from_tag(&header[0..2])?;
        let c_size = le24(&header[3..6]);
        let u_size = le24(&header[6..9]);
        offset += BLOCK_HEADER_LEN;

        let block = src.get(offset..offset + c_size).ok_or_else(|| {
            RootError::Decompression(format!(
                "block claims {c_size} bytes but only {} remain",
                src.len().saturating_sub(offset)
            ))
        })?;
        let inflated = algorithm.inflate(block, u_size)?;
        if inflated.len() != u_size {
            return Err(RootError::Decompression(format!(
                "{algorithm:?} block inflated to {} bytes, header says {u_size}",
                inflated.len()
            )));
        }
        out.extend_from_slice(&inflated);
        offset += c_size;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "inflated {} bytes, key says {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

fn le24(b: &[u8]) -> usize {
    usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16
}
