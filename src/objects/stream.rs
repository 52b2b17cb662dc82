use crate::error::{PdfError, Result};
use crate::objects::Name;
use std::io::{Read, Write};

/// The byte payload of an indirect object with its filter chain.
///
/// `data` holds the encoded (raw) bytes as they are written to the file;
/// `decoded` applies the filters in order. Replacing the payload sets the
/// stream's own dirty bit.
#[derive(Debug, Clone, Default)]
pub struct Stream {
    data: Vec<u8>,
    filters: Vec<Name>,
    dirty: bool,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            filters: Vec::new(),
            dirty: false,
        }
    }

    /// The encoded bytes, exactly as serialized. `/Length` is this length.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn filters(&self) -> &[Name] {
        &self.filters
    }

    /// Replace the payload with unfiltered bytes.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.filters.clear();
        self.dirty = true;
    }

    /// Replace the payload with flate-compressed bytes.
    pub fn set_data_flate(&mut self, data: &[u8]) -> Result<()> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        self.data = encoder.finish()?;
        self.filters = vec![Name::from("FlateDecode")];
        self.dirty = true;
        Ok(())
    }

    /// The decoded bytes, applying the filter chain in order. Filters this
    /// library does not implement fail with `UnsupportedFilter`.
    pub fn decoded(&self) -> Result<Vec<u8>> {
        let mut data = self.data.clone();
        for filter in &self.filters {
            data = apply_decode_filter(filter, &data)?;
        }
        Ok(data)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

fn apply_decode_filter(filter: &Name, data: &[u8]) -> Result<Vec<u8>> {
    if filter.as_bytes() == b"FlateDecode" {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else {
        Err(PdfError::UnsupportedFilter(
            String::from_utf8_lossy(filter.as_bytes()).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_data_passthrough() {
        let stream = Stream::with_data(vec![1, 2, 3]);
        assert_eq!(stream.raw(), &[1, 2, 3]);
        assert_eq!(stream.decoded().unwrap(), vec![1, 2, 3]);
        assert!(stream.filters().is_empty());
        assert!(!stream.is_dirty());
    }

    #[test]
    fn test_set_data_marks_dirty() {
        let mut stream = Stream::new();
        stream.set_data(vec![9]);
        assert!(stream.is_dirty());
        assert_eq!(stream.raw(), &[9]);

        stream.set_dirty(false);
        assert!(!stream.is_dirty());
    }

    #[test]
    fn test_flate_round_trip() {
        let payload = b"stream payload stream payload stream payload".to_vec();
        let mut stream = Stream::new();
        stream.set_data_flate(&payload).unwrap();

        assert_eq!(stream.filters(), &[Name::from("FlateDecode")]);
        assert_ne!(stream.raw(), payload.as_slice());
        assert_eq!(stream.decoded().unwrap(), payload);
    }

    #[test]
    fn test_unknown_filter_is_rejected() {
        let mut stream = Stream::with_data(vec![1]);
        stream.filters = vec![Name::from("JPXDecode")];

        match stream.decoded() {
            Err(PdfError::UnsupportedFilter(name)) => assert_eq!(name, "JPXDecode"),
            other => panic!("expected UnsupportedFilter, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_corrupt_flate_data_fails() {
        let mut stream = Stream::with_data(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        stream.filters = vec![Name::from("FlateDecode")];
        assert!(stream.decoded().is_err());
    }
}
