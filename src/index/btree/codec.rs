//! Key and value encoding.
//!
//! A [`Codec`] turns keys or values into bytes for the page wire format.
//! Trees that are not given a codec use [`NativeCodec`], which writes each
//! type's [`NativeEncoding`].
//!
//! # Slot framing
//! Every key slot (and value slot of a leaf) is written with
//! [`Codec::write_slot`], which has to represent the absent key too:
//! ```text
//! user codec:    len:i32 (-1 = absent) | encode(value)
//! NativeCodec:   present:u8 (0 | 1)    | native form
//! ```

use crate::common::{Error, Result};

/// Serializes values of type `T` to and from bytes.
///
/// Errors returned by `encode`/`decode` reach the caller of the tree
/// operation unchanged.
pub trait Codec<T> {
    /// Append the encoding of `value` to `out`.
    fn encode(&self, value: &T, out: &mut Vec<u8>) -> Result<()>;

    /// Decode a value from exactly `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<T>;

    /// Write one page slot (length-prefixed).
    fn write_slot(&self, value: Option<&T>, out: &mut Vec<u8>) -> Result<()> {
        let Some(value) = value else {
            out.extend_from_slice(&(-1i32).to_le_bytes());
            return Ok(());
        };

        let len_at = out.len();
        out.extend_from_slice(&[0u8; 4]);
        self.encode(value, out)?;

        let len = out.len() - len_at - 4;
        let len = i32::try_from(len)
            .map_err(|_| Error::Codec(format!("encoded length {} does not fit i32", len)))?;
        out[len_at..len_at + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    /// Read one page slot written by [`Codec::write_slot`].
    fn read_slot(&self, input: &mut ByteReader<'_>) -> Result<Option<T>> {
        let len = input.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        let bytes = input.read_bytes(len as usize)?;
        self.decode(bytes).map(Some)
    }
}

/// Cursor over a byte slice with bounds-checked little-endian reads.
///
/// Running off the end is reported as `Error::Corrupted`.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::Corrupted(format!(
                "need {} bytes at offset {}, only {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Fail if any input is left over.
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::Corrupted(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Built-in binary form of a type, used when a tree has no explicit codec.
///
/// Integers are fixed-width little-endian; strings and byte vectors carry a
/// `u32` length prefix.
pub trait NativeEncoding: Sized {
    fn write_native(&self, out: &mut Vec<u8>);
    fn read_native(input: &mut ByteReader<'_>) -> Result<Self>;
}

macro_rules! native_int {
    ($($t:ty),*) => {
        $(
            impl NativeEncoding for $t {
                #[inline]
                fn write_native(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_native(input: &mut ByteReader<'_>) -> Result<Self> {
                    Ok(<$t>::from_le_bytes(input.read_array()?))
                }
            }
        )*
    };
}

native_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl NativeEncoding for bool {
    fn write_native(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_native(input: &mut ByteReader<'_>) -> Result<Self> {
        match input.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Codec(format!("invalid bool byte {}", other))),
        }
    }
}

impl NativeEncoding for () {
    fn write_native(&self, _out: &mut Vec<u8>) {}

    fn read_native(_input: &mut ByteReader<'_>) -> Result<Self> {
        Ok(())
    }
}

impl NativeEncoding for Vec<u8> {
    fn write_native(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        out.extend_from_slice(self);
    }

    fn read_native(input: &mut ByteReader<'_>) -> Result<Self> {
        let len = input.read_u32()? as usize;
        Ok(input.read_bytes(len)?.to_vec())
    }
}

impl NativeEncoding for String {
    fn write_native(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        out.extend_from_slice(self.as_bytes());
    }

    fn read_native(input: &mut ByteReader<'_>) -> Result<Self> {
        let len = input.read_u32()? as usize;
        let bytes = input.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Codec(e.to_string()))
    }
}

impl<A: NativeEncoding, B: NativeEncoding> NativeEncoding for (A, B) {
    fn write_native(&self, out: &mut Vec<u8>) {
        self.0.write_native(out);
        self.1.write_native(out);
    }

    fn read_native(input: &mut ByteReader<'_>) -> Result<Self> {
        let a = A::read_native(input)?;
        let b = B::read_native(input)?;
        Ok((a, b))
    }
}

/// The codec used when none is configured.
///
/// Slots are written in native form: a presence byte followed by the
/// value's [`NativeEncoding`], with no length prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl<T: NativeEncoding> Codec<T> for NativeCodec {
    fn encode(&self, value: &T, out: &mut Vec<u8>) -> Result<()> {
        value.write_native(out);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        let mut input = ByteReader::new(bytes);
        let value = T::read_native(&mut input)?;
        input.finish()?;
        Ok(value)
    }

    fn write_slot(&self, value: Option<&T>, out: &mut Vec<u8>) -> Result<()> {
        match value {
            None => out.push(0),
            Some(value) => {
                out.push(1);
                value.write_native(out);
            }
        }
        Ok(())
    }

    fn read_slot(&self, input: &mut ByteReader<'_>) -> Result<Option<T>> {
        match input.read_u8()? {
            0 => Ok(None),
            1 => T::read_native(input).map(Some),
            other => Err(Error::Corrupted(format!("invalid slot tag {}", other))),
        }
    }
}

/// Stores strings as their raw UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec<String> for Utf8Codec {
    fn encode(&self, value: &String, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Codec(e.to_string()))
    }
}

/// Stores byte vectors verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesCodec;

impl Codec<Vec<u8>> for RawBytesCodec {
    fn encode(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_int_layout() {
        let mut out = Vec::new();
        NativeCodec.encode(&0x0102_0304u32, &mut out).unwrap();
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01]);

        let back: u32 = NativeCodec.decode(&out).unwrap();
        assert_eq!(back, 0x0102_0304);
    }

    #[test]
    fn test_native_slot_framing() {
        let mut out = Vec::new();
        Codec::<u16>::write_slot(&NativeCodec, Some(&7u16), &mut out).unwrap();
        Codec::<u16>::write_slot(&NativeCodec, None, &mut out).unwrap();
        assert_eq!(out, vec![1, 7, 0, 0]);

        let mut input = ByteReader::new(&out);
        assert_eq!(Codec::<u16>::read_slot(&NativeCodec, &mut input).unwrap(), Some(7));
        assert_eq!(Codec::<u16>::read_slot(&NativeCodec, &mut input).unwrap(), None);
        input.finish().unwrap();
    }

    #[test]
    fn test_length_prefixed_framing() {
        let mut out = Vec::new();
        Utf8Codec.write_slot(Some(&"hey".to_string()), &mut out).unwrap();
        Utf8Codec.write_slot(None, &mut out).unwrap();
        assert_eq!(&out[..4], &3i32.to_le_bytes());
        assert_eq!(&out[4..7], b"hey");
        assert_eq!(&out[7..], &(-1i32).to_le_bytes());

        let mut input = ByteReader::new(&out);
        assert_eq!(
            Utf8Codec.read_slot(&mut input).unwrap(),
            Some("hey".to_string())
        );
        assert_eq!(Utf8Codec.read_slot(&mut input).unwrap(), None);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_native_string_and_tuple() {
        let value = ("key".to_string(), 42i64);
        let mut out = Vec::new();
        NativeCodec.encode(&value, &mut out).unwrap();

        let back: (String, i64) = NativeCodec.decode(&out).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_truncated_input() {
        let result: Result<u64> = NativeCodec.decode(&[1, 2, 3]);
        assert!(matches!(result, Err(Error::Corrupted(_))));

        let mut input = ByteReader::new(&[5, 0, 0, 0, b'a']);
        assert!(matches!(
            Utf8Codec.read_slot(&mut input),
            Err(Error::Corrupted(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let result: Result<u8> = NativeCodec.decode(&[1, 2]);
        assert!(matches!(result, Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_invalid_utf8_is_codec_error() {
        assert!(matches!(
            Utf8Codec.decode(&[0xFF, 0xFE]),
            Err(Error::Codec(_))
        ));
        assert!(matches!(
            NativeCodec.decode(&[2]) as Result<bool>,
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_raw_bytes_codec() {
        let mut out = Vec::new();
        RawBytesCodec.encode(&vec![9, 8, 7], &mut out).unwrap();
        assert_eq!(RawBytesCodec.decode(&out).unwrap(), vec![9, 8, 7]);
    }
}
