//! TKey records: where each object of a directory lives in the file.

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;

/// Key versions above this use 64-bit seek pointers.
const LARGE_KEY_VERSION: u16 = 1000;

/// A parsed TKey header.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Bytes on disk: key header plus (possibly compressed) object
    pub n_bytes: u32,
    /// Uncompressed object length
    pub obj_len: u32,
    /// Length of the key header
    pub key_len: u16,
    /// Cycle number; several cycles of one name may coexist
    pub cycle: u16,
    /// Absolute file offset of the key header
    pub seek_key: u64,
    /// Class of the stored object
    pub class_name: String,
    /// Object name
    pub name: String,
    /// Object title
    pub title: String,
}

/// Name and class of a key, as returned by `RootFile::list_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name
    pub name: String,
    /// Object class (e.g. `TH1D`, `TDirectoryFile`)
    pub class_name: String,
    /// Cycle number
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

impl Key {
    /// Read a TKey header at the cursor.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;
        let seek_key = if version > LARGE_KEY_VERSION {
            let seek = r.read_u64()?;
            let _seek_pdir = r.read_u64()?;
            seek
        } else {
            let seek = r.read_u32()?;
            let _seek_pdir = r.read_u32()?;
            u64::from(seek)
        };
        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key { n_bytes, obj_len, key_len, cycle, seek_key, class_name, name, title })
    }

    /// Whether the object payload is stored compressed.
    pub fn is_compressed(&self) -> bool {
        self.obj_len != self.n_bytes.saturating_sub(u32::from(self.key_len))
    }

    /// Whether the key points at a sub-directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectoryFile" | "TDirectory")
    }

    /// Uncompressed object bytes, read out of the whole-file buffer.
    pub fn payload(&self, file: &[u8]) -> Result<Vec<u8>> {
        let start = usize::try_from(self.seek_key)
            .map_err(|_| RootError::Deserialization(format!("seek {} too large", self.seek_key)))?;
        let mut r = RBuffer::at(file, start)?;
        let record = r.read_bytes(self.n_bytes as usize)?;
        let body = record.get(usize::from(self.key_len)..).ok_or_else(|| {
            RootError::Deserialization(format!(
                "key '{}' header length {} exceeds record length {}",
                self.name, self.key_len, self.n_bytes
            ))
        })?;

        if self.is_compressed() {
            decompress(body, self.obj_len as usize)
        } else {
            Ok(body.to_vec())
        }
    }
}
