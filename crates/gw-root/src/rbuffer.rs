//! Cursor over ROOT's big-endian streamer encoding.

use crate::error::{Result, RootError};

/// Set on the first u32 of a streamed object when a byte count follows.
const BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// Same flag seen from the leading u16 of a `TObject` version.
const BYTE_COUNT_VMASK: u16 = 0x4000;
/// `TObject::fBits` flag: a process-id index follows the header.
const IS_REFERENCED: u32 = 1 << 4;
/// `TObject::fBits` flag ROOT forces on every object read from a buffer.
const IS_ON_HEAP: u32 = 0x0100_0000;

/// Version header of a streamed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Class version
    pub version: u16,
    /// Absolute position right after the object, if a byte count was written
    pub end: Option<usize>,
}

/// A read cursor over a byte slice.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a big-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self) -> Result<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let mut raw = [0u8; N];
                raw.copy_from_slice(self.read_bytes(N)?);
                Ok(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

impl<'a> RBuffer<'a> {
    /// Cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor at absolute position `pos` of `data`.
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        if pos > data.len() {
            return Err(RootError::BufferUnderflow { offset: pos, need: 0, have: 0 });
        }
        Ok(Self { data, pos })
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute position inside the buffer.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: pos.saturating_sub(self.pos),
                have: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len()).ok_or(
            RootError::BufferUnderflow { offset: self.pos, need: n, have: self.remaining() },
        )?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    read_be! {
        read_u8 => u8,
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Read a `TString`: one length byte, or 255 followed by a u32 length.
    pub fn read_string(&mut self) -> Result<String> {
        let len = match self.read_u8()? {
            255 => self.read_u32()? as usize,
            n => n as usize,
        };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read an object version header.
    ///
    /// With a byte count, the count covers everything after the leading u32,
    /// version included. Without one, only the u16 version was written.
    pub fn read_version(&mut self) -> Result<Version> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & BYTE_COUNT_MASK != 0 {
            let count = (raw & !BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok(Version { version, end: Some(start + 4 + count) })
        } else {
            self.pos = start + 2;
            Ok(Version { version: (raw >> 16) as u16, end: None })
        }
    }

    /// Read a `TObject` header and return its `fBits`.
    pub fn read_tobject(&mut self) -> Result<u32> {
        let version = self.read_u16()?;
        if version & BYTE_COUNT_VMASK != 0 {
            self.skip(4)?;
        }
        let _unique_id = self.read_u32()?;
        let bits = self.read_u32()? | IS_ON_HEAP;
        if bits & IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok(bits)
    }

    /// Read a `TNamed` and return `(name, title)`.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let header = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.finish(header)?;
        Ok((name, title))
    }

    /// Skip a streamed object. `fallback_len` is the body size to skip when
    /// the object was written without a byte count.
    pub fn skip_object(&mut self, fallback_len: usize) -> Result<Version> {
        let header = self.read_version()?;
        match header.end {
            Some(end) => self.seek(end)?,
            None => self.skip(fallback_len)?,
        }
        Ok(header)
    }

    /// Jump to the end of an object whose header carried a byte count.
    pub fn finish(&mut self, header: Version) -> Result<()> {
        match header.end {
            Some(end) if end >= self.pos => self.seek(end),
            Some(end) => Err(RootError::Deserialization(format!(
                "object overran its byte count: ends at {end}, cursor at {}",
                self.pos
            ))),
            None => Ok(()),
        }
    }

    /// Read a `TArrayD`-style payload: an i32 length then that many f64.
    pub fn read_array_f64(&mut self) -> Result<Vec<f64>> {
        let n = self.read_len()?;
        (0..n).map(|_| self.read_f64()).collect()
    }

    /// Read a `TArrayF`-style payload, widened to f64.
    pub fn read_array_f32(&mut self) -> Result<Vec<f64>> {
        let n = self.read_len()?;
        (0..n).map(|_| self.read_f32().map(f64::from)).collect()
    }

    /// Read a `TArrayI`-style payload, widened to f64.
    pub fn read_array_i32(&mut self) -> Result<Vec<f64>> {
        let n = self.read_len()?;
        (0..n).map(|_| self.read_i32().map(f64::from)).collect()
    }

    fn read_len(&mut self) -> Result<usize> {
        let n = self.read_i32()?;
        usize::try_from(n)
            .map_err(|_| RootError::Deserialization(format!("negative array length {n}")))
    }
}
