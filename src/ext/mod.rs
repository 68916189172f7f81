//! Wire buffer helpers.
use bytes::{Buf, BufMut, Bytes};

use crate::{common::ByteStr, protocol::ProtocolError};

/// Checked narrowing for buffer lengths.
pub trait UsizeExt {
    /// Length is `usize` in rust, while the wire wants `u32`,
    /// this will panic when overflow instead of wrapping.
    fn to_u32(self) -> u32;
    /// Length is `usize` in rust, while the wire wants `u16`,
    /// this will panic when overflow instead of wrapping.
    fn to_u16(self) -> u16;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for protocol")
    }

    fn to_u16(self) -> u16 {
        self.try_into().expect("message size too large for protocol")
    }
}

/// Length-prefixed string operation in [`BufMut`].
pub trait BufMutExt {
    /// Write a `u32` length prefix followed by the utf-8 content.
    fn put_str(&mut self, string: &str);

    /// Write a `u32` length prefix followed by raw bytes.
    fn put_blob(&mut self, blob: &[u8]);
}

impl<B: BufMut> BufMutExt for B {
    fn put_str(&mut self, string: &str) {
        self.put_u32(string.len().to_u32());
        self.put(string.as_bytes());
    }

    fn put_blob(&mut self, blob: &[u8]) {
        self.put_u32(blob.len().to_u32());
        self.put(blob);
    }
}

/// Wire length of a length-prefixed string or blob.
pub trait WireLenExt {
    /// Content length plus the `u32` prefix.
    fn wire_len(&self) -> u32;
}

impl WireLenExt for str {
    fn wire_len(&self) -> u32 {
        self.len().to_u32() + 4
    }
}

impl WireLenExt for [u8] {
    fn wire_len(&self) -> u32 {
        self.len().to_u32() + 4
    }
}

/// Length-prefixed read operation in [`Bytes`].
pub trait BufExt {
    /// Read a `u32` length-prefixed utf-8 string.
    fn try_get_str(&mut self) -> Result<ByteStr, ProtocolError>;

    /// Read a `u32` length-prefixed blob.
    fn try_get_blob(&mut self) -> Result<Bytes, ProtocolError>;
}

impl BufExt for Bytes {
    fn try_get_str(&mut self) -> Result<ByteStr, ProtocolError> {
        ByteStr::from_utf8(self.try_get_blob()?).map_err(ProtocolError::non_utf8)
    }

    fn try_get_blob(&mut self) -> Result<Bytes, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::malformed("length prefix"));
        }
        let len = self.get_u32() as usize;
        if self.remaining() < len {
            return Err(ProtocolError::malformed("length-prefixed payload"));
        }
        Ok(self.split_to(len))
    }
}
