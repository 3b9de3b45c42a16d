use std::{convert::TryInto, mem::size_of};

use crate::error::TinyError;

pub trait Encodeable {
    fn to_bytes(&self) -> Vec<u8>;
}

pub trait Decodeable {
    fn read_from<R: std::io::Read>(reader: &mut R) -> Result<Self, TinyError>
    where
        Self: Sized;
}

pub fn read_exact<R: std::io::Read>(
    reader: &mut R,
    bytes_count: usize,
) -> Result<Vec<u8>, TinyError> {
    let mut buffer = vec![0u8; bytes_count];
    reader
        .read_exact(&mut buffer)
        .or_else(|_| Err(TinyError::new(&format!("io error, expect {} bytes", bytes_count))))?;
    Ok(buffer)
}

/// An in-memory writer used to assemble fixed-size byte images
/// (page payloads in particular).
pub struct TinyWriter {
    buf: Vec<u8>,
}

impl TinyWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, obj: &T) {
        self.buf.extend_from_slice(obj.to_bytes().as_slice());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// The assembled bytes, zero-padded to the requested size.
    /// Panics if the content already exceeds the size, since that
    /// means a page image was assembled from a broken layout.
    pub fn to_padded_bytes(&self, size: usize) -> Vec<u8> {
        let mut buf = self.buf.clone();

        if buf.len() > size {
            panic!(
                "buffer size is larger than the given size: {} > {}",
                buf.len(),
                size
            );
        }

        buf.resize(size, 0);
        buf
    }
}

// All fixed-width integers in the file format are big-endian.
macro_rules! impl_serialization {
    (for $($t:ty),+) => {
        $(
            impl Encodeable for $t {
                fn to_bytes(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
            }

            impl Decodeable for $t {
                fn read_from<R: std::io::Read>(reader: &mut R) -> Result<Self, TinyError> {
                    let bytes = read_exact(reader, size_of::<Self>())?;
                    Ok(Self::from_be_bytes(bytes.try_into().unwrap()))
                }
            }
        )*
    }
}

impl_serialization!(for u8, u16, u32, u64, i8, i16, i32, i64);
