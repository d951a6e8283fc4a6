//! TFile header parsing and histogram lookup.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::directory::Directory;
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;

const ROOT_MAGIC: &[u8; 4] = b"root";
/// File versions at or above this use 64-bit offsets in the header.
const LARGE_FILE_VERSION: u32 = 1_000_000;
/// Smallest possible header, up to and including the UUID.
const MIN_HEADER_LEN: usize = 64;

/// File bytes: memory-mapped from disk, or owned.
enum Bytes {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Owned(v) => v,
            Bytes::Mapped(m) => m,
        }
    }
}

/// A ROOT file opened for histogram reads.
pub struct RootFile {
    data: Bytes,
    /// Offset of the top directory record
    top_dir: usize,
    path: PathBuf,
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile").field("path", &self.path).field("len", &self.data.len()).finish()
    }
}

impl RootFile {
    /// Memory-map and parse a ROOT file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the mapping is read-only; files being rewritten while a
        // count runs are not supported.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::parse(Bytes::Mapped(mmap), path)
    }

    /// Parse a ROOT file already held in memory.
    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::parse(Bytes::Owned(data), path.into())
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys of the top directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        Ok(self.top_directory()?.keys().iter().map(KeyInfo::from).collect())
    }

    /// Read a histogram by path, e.g. `"cut_flow"` or `"MetaData/EventCount"`.
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let key = self.resolve(path)?;
        let payload = key.payload(&self.data)?;
        let histogram = objects::read_histogram(&payload, &key.class_name)?;
        tracing::trace!(
            file = %self.path.display(),
            histogram = path,
            class = %key.class_name,
            n_bins = histogram.n_bins,
            "histogram read"
        );
        Ok(histogram)
    }

    /// Header layout (small files; large files widen fEND, fSeekFree, fSeekInfo to u64):
    /// ```text
    /// offset  size  field
    ///    0      4   magic "root"
    ///    4      4   fVersion
    ///    8      4   fBEGIN
    ///   12      4   fEND
    ///   16      4   fSeekFree
    ///   20      4   fNbytesFree
    ///   24      4   nfree
    ///   28      4   fNbytesName
    /// ```
    /// The top TDirectory record sits at `fBEGIN + fNbytesName`.
    fn parse(data: Bytes, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_HEADER_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }

        let mut r = RBuffer::at(&data, 4)?;
        let version = r.read_u32()?;
        let begin = r.read_u32()? as usize;
        let seek_width = if version >= LARGE_FILE_VERSION { 8 } else { 4 };
        // fEND, fSeekFree
        r.skip(2 * seek_width)?;
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;

        let top_dir = begin + nbytes_name;
        if top_dir >= data.len() {
            return Err(RootError::Deserialization(format!(
                "top directory offset {top_dir} past end of file ({} bytes)",
                data.len()
            )));
        }
        Ok(Self { data, top_dir, path })
    }

    fn top_directory(&self) -> Result<Directory> {
        Directory::read(&self.data, self.top_dir, &self.data)
    }

    /// Walk `path` through sub-directories and return the key of its last component.
    fn resolve(&self, path: &str) -> Result<Key> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let mut dir = self.top_directory()?;
        for &part in dirs {
            let key = dir
                .find(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{part} (in path {path})")))?;
            if !key.is_directory() {
                return Err(RootError::Deserialization(format!(
                    "'{part}' in path {path} is a {}, not a directory",
                    key.class_name
                )));
            }
            let payload = key.payload(&self.data)?;
            dir = Directory::read(&payload, 0, &self.data)?;
        }

        dir.find(leaf).cloned().ok_or_else(|| RootError::KeyNotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_root_bytes() {
        let result = RootFile::from_bytes(vec![0u8; 100], "junk.root");
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn rejects_short_files() {
        let result = RootFile::from_bytes(b"root".to_vec(), "short.root");
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = RootFile::open("/nonexistent/dir/file.root");
        assert!(matches!(result, Err(RootError::Io(_))));
    }

    #[test]
    fn top_directory_past_end_is_rejected() {
        let mut data = vec![0u8; 80];
        data[0..4].copy_from_slice(ROOT_MAGIC);
        data[4..8].copy_from_slice(&62206u32.to_be_bytes());
        data[8..12].copy_from_slice(&100u32.to_be_bytes());
        let err = RootFile::from_bytes(data, "bad.root").unwrap_err();
        assert!(matches!(err, RootError::Deserialization(_)));
    }
}
