//! TDirectory records and their key lists.

use crate::error::Result;
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Directory versions above this use 64-bit seek pointers.
const LARGE_DIRECTORY_VERSION: u16 = 1000;

/// The keys of one directory.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Parse a TDirectory record at `pos` and load the key list it points to.
    ///
    /// The same record layout is used for the top directory (right after the
    /// file's name record) and for the payload of a `TDirectoryFile` key.
    pub fn read(record: &[u8], pos: usize, file: &[u8]) -> Result<Self> {
        let mut r = RBuffer::at(record, pos)?;
        let version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let _nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;
        let seek_keys = if version > LARGE_DIRECTORY_VERSION {
            r.skip(16)?;
            r.read_u64()?
        } else {
            r.skip(8)?;
            u64::from(r.read_u32()?)
        };

        if seek_keys == 0 {
            return Ok(Self::default());
        }
        Self::read_key_list(file, seek_keys as usize)
    }

    /// Read the key list stored at `seek_keys`: a TKey header describing the
    /// list itself, a u32 count, then one TKey header per object.
    pub fn read_key_list(file: &[u8], seek_keys: usize) -> Result<Self> {
        let mut r = RBuffer::at(file, seek_keys)?;
        Key::read(&mut r)?;
        let n_keys = r.read_u32()? as usize;
        let keys = (0..n_keys).map(|_| Key::read(&mut r)).collect::<Result<Vec<_>>>()?;
        tracing::trace!(seek_keys, n_keys, "read directory key list");
        Ok(Self { keys })
    }

    /// All keys, in file order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The highest cycle of `name`.
    pub fn find(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
