//! Self-describing frame around an entropy-coded payload.
//!
//! ```text
//! header_size: u32
//! header:
//!   [ndim: u32, ndim × dim: u32]                 ← optional shape section
//!   dtype_code: u32, num_coded_words: u32,
//!   decoded_length: u32, num_symbols: u32
//!   state: u64
//!   num_symbols × count: u32
//!   num_symbols × value: dtype width
//! coded words: num_coded_words × u32
//! ```
//!
//! All integers are little-endian.

use crate::entropy::EncodedSignal;
use crate::error::{Error, Result};
use crate::reader::ByteReader;
use crate::signal::{Dtype, Sample, Shape};
use crate::writer::ByteWriter;

/// Decoded representation of a frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader<T> {
    /// Present when the frame carries its own shape section.
    pub shape: Option<Vec<u32>>,
    pub num_coded_words: u32,
    pub decoded_length: u32,
    pub state: u64,
    pub symbol_counts: Vec<u32>,
    pub symbol_values: Vec<T>,
}

impl<T: Sample> FrameHeader<T> {
    pub fn dtype(&self) -> Dtype {
        T::DTYPE
    }

    /// Serialize the header (without the leading `header_size`).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let num_symbols = u32_len(self.symbol_counts.len(), "symbol table")?;
        let mut w = ByteWriter::new();
        if let Some(dims) = &self.shape {
            w.put_u32(u32_len(dims.len(), "shape rank")?);
            for &d in dims {
                w.put_u32(d);
            }
        }
        w.put_u32(T::DTYPE.code());
        w.put_u32(self.num_coded_words);
        w.put_u32(self.decoded_length);
        w.put_u32(num_symbols);
        w.put_u64(self.state);
        for &c in &self.symbol_counts {
            w.put_u32(c);
        }
        for &v in &self.symbol_values {
            w.put_sample(v);
        }
        Ok(w.into_inner())
    }

    /// Parse a header, checking its dtype code against `T`.
    ///
    /// `with_shape` selects whether the leading shape section is present; it is
    /// a property of the frame format, not of the data.
    pub fn from_bytes(buf: &[u8], with_shape: bool) -> Result<Self> {
        let mut r = ByteReader::new(buf);

        let shape = if with_shape {
            let ndim = r.u32("shape rank")? as usize;
            let mut dims = Vec::with_capacity(ndim.min(8));
            for _ in 0..ndim {
                dims.push(r.u32("shape dimension")?);
            }
            Some(dims)
        } else {
            None
        };

        let found = Dtype::from_code(r.u32("dtype code")?)?;
        if found != T::DTYPE {
            return Err(Error::DtypeMismatch {
                expected: T::DTYPE,
                found,
            });
        }
        let num_coded_words = r.u32("coded word count")?;
        let decoded_length = r.u32("decoded length")?;
        let num_symbols = r.u32("symbol count")? as usize;
        let state = r.u64("coder state")?;

        let symbol_counts = r.u32_array(num_symbols, "symbol counts")?;
        let symbol_values: Vec<T> = r.samples_upto(num_symbols);
        if symbol_counts.len() != symbol_values.len() {
            return Err(Error::corrupt(format!(
                "mismatch between number of symbol counts ({}) and symbol values ({})",
                symbol_counts.len(),
                symbol_values.len()
            )));
        }

        Ok(Self {
            shape,
            num_coded_words,
            decoded_length,
            state,
            symbol_counts,
            symbol_values,
        })
    }

    /// Compare the embedded shape (if any) with the caller's.
    pub fn check_shape(&self, expected: Shape) -> Result<()> {
        let Some(dims) = &self.shape else {
            return Ok(());
        };
        let matches = dims.len() == 2
            && dims[0] as usize == expected.rows
            && dims[1] as usize == expected.cols;
        if !matches {
            let found = match dims.as_slice() {
                [r, c] => Shape::new(*r as usize, *c as usize),
                [n] => Shape::new(*n as usize, 1),
                _ => Shape::new(dims.iter().map(|&d| d as usize).product(), 1),
            };
            return Err(Error::ShapeMismatch { expected, found });
        }
        Ok(())
    }
}

fn u32_len(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::InvalidShape(format!("{what} of {n} exceeds u32")))
}

/// Assemble `header_size ‖ header ‖ words` from a coder's output.
pub fn encode_frame<T: Sample>(encoded: EncodedSignal<T>, shape: Option<Shape>) -> Result<Vec<u8>> {
    let shape = match shape {
        Some(s) => Some(vec![u32_len(s.rows, "row count")?, u32_len(s.cols, "column count")?]),
        None => None,
    };
    let header = FrameHeader {
        shape,
        num_coded_words: u32_len(encoded.words.len(), "coded word count")?,
        decoded_length: encoded.signal_length,
        state: encoded.state,
        symbol_counts: encoded.symbol_counts,
        symbol_values: encoded.symbol_values,
    };
    let header_bytes = header.to_bytes()?;

    let mut w = ByteWriter::with_capacity(4 + header_bytes.len() + 4 * encoded.words.len());
    w.put_u32(u32_len(header_bytes.len(), "header")?);
    w.put_bytes(&header_bytes);
    for &word in &encoded.words {
        w.put_u32(word);
    }
    Ok(w.into_inner())
}

/// Split a frame back into its header and the coder input.
pub fn decode_frame<T: Sample>(buf: &[u8], with_shape: bool) -> Result<(FrameHeader<T>, EncodedSignal<T>)> {
    let mut r = ByteReader::new(buf);
    let header_size = r.u32("header size")? as usize;
    let header = FrameHeader::<T>::from_bytes(r.take(header_size, "frame header")?, with_shape)?;
    let words = r.u32_array(header.num_coded_words as usize, "coded words")?;
    let encoded = EncodedSignal {
        state: header.state,
        symbol_counts: header.symbol_counts.clone(),
        symbol_values: header.symbol_values.clone(),
        words,
        signal_length: header.decoded_length,
    };
    Ok((header, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> FrameHeader<i16> {
        FrameHeader {
            shape: Some(vec![4, 2]),
            num_coded_words: 3,
            decoded_length: 8,
            state: 0xDEAD_BEEF_0000_0001,
            symbol_counts: vec![60_000, 5_536],
            symbol_values: vec![-3, 7],
        }
    }

    #[test]
    fn header_layout_is_fixed_width_little_endian() {
        let bytes = header().to_bytes().unwrap();
        // shape (4 + 8) + fixed (16) + state (8) + counts (8) + values (4)
        assert_eq!(bytes.len(), 12 + 16 + 8 + 8 + 4);
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes()); // int16 dtype code
        assert_eq!(FrameHeader::<i16>::from_bytes(&bytes, true).unwrap(), header());
    }

    #[test]
    fn header_without_shape_section() {
        let mut h = header();
        h.shape = None;
        let bytes = h.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(FrameHeader::<i16>::from_bytes(&bytes, false).unwrap(), h);
    }

    #[test]
    fn truncated_symbol_values_are_corrupt() {
        let bytes = header().to_bytes().unwrap();
        let err = FrameHeader::<i16>::from_bytes(&bytes[..bytes.len() - 1], true).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader(_)), "{err}");
    }

    #[test]
    fn wrong_dtype_is_reported_before_symbol_table() {
        let bytes = header().to_bytes().unwrap();
        let err = FrameHeader::<u16>::from_bytes(&bytes, true).unwrap_err();
        assert!(matches!(
            err,
            Error::DtypeMismatch {
                expected: Dtype::U16,
                found: Dtype::I16
            }
        ));
    }

    #[test]
    fn unknown_dtype_code_is_unsupported() {
        let mut bytes = header().to_bytes().unwrap();
        bytes[12..16].copy_from_slice(&9u32.to_le_bytes());
        let err = FrameHeader::<i16>::from_bytes(&bytes, true).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDtype(_)));
    }

    #[test]
    fn shape_check() {
        let h = header();
        assert!(h.check_shape(Shape::new(4, 2)).is_ok());
        assert!(matches!(
            h.check_shape(Shape::new(2, 4)),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
