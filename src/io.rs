//! Byte device abstractions used by the variant parser and the font
//! subsetter.
//!
//! Input devices are random access with single-byte lookahead; the
//! concatenating device relaxes that to a forward-only stream. The output
//! device counts written bytes and remembers the last emitted byte so the
//! compact-mode writer can decide whether a token separator is required.

use crate::error::{PdfError, Result};

/// A random-access byte source.
///
/// `look` peeks at the next byte without consuming it; `try_get_char`
/// consumes it. Both report end of input as `None`. `read` returns zero once
/// the device is exhausted.
pub trait InputDevice {
    /// Read up to `buf.len()` bytes, returning the number read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reposition the device to an absolute offset.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Current absolute offset.
    fn tell(&mut self) -> Result<u64>;

    /// Consume and return the next byte, or `None` at end of input.
    fn try_get_char(&mut self) -> Result<Option<u8>>;

    /// Peek at the next byte without consuming it, or `None` at end of input.
    fn look(&mut self) -> Result<Option<u8>>;
}

/// Fill `buf` completely or fail with `UnexpectedEof`.
pub fn read_exact(device: &mut dyn InputDevice, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = device.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(PdfError::UnexpectedEof);
        }
        filled += n;
    }
    Ok(())
}

/// An input device over an owned byte buffer.
#[derive(Debug, Clone)]
pub struct MemoryInputDevice {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryInputDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&[u8]> for MemoryInputDevice {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl InputDevice for MemoryInputDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        // Seeking past the end is legal; subsequent reads return zero.
        self.pos = usize::try_from(pos).unwrap_or(usize::MAX);
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn try_get_char(&mut self) -> Result<Option<u8>> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    fn look(&mut self) -> Result<Option<u8>> {
        Ok(self.data.get(self.pos).copied())
    }
}

/// A read-only concatenation of input devices, exposed as a single stream.
///
/// Reads span device boundaries. Repositioning is not supported: `seek` and
/// `tell` fail, as the concatenation has no single underlying offset.
pub struct ChainInputDevice {
    devices: Vec<Box<dyn InputDevice>>,
    current: usize,
}

impl ChainInputDevice {
    pub fn new(devices: Vec<Box<dyn InputDevice>>) -> Self {
        Self {
            devices,
            current: 0,
        }
    }
}

impl InputDevice for ChainInputDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && self.current < self.devices.len() {
            let n = self.devices[self.current].read(&mut buf[filled..])?;
            if n == 0 {
                self.current += 1;
            } else {
                filled += n;
            }
        }
        Ok(filled)
    }

    fn seek(&mut self, _pos: u64) -> Result<()> {
        Err(PdfError::NotImplemented(
            "seek on a concatenated device".to_string(),
        ))
    }

    fn tell(&mut self) -> Result<u64> {
        Err(PdfError::NotImplemented(
            "tell on a concatenated device".to_string(),
        ))
    }

    fn try_get_char(&mut self) -> Result<Option<u8>> {
        while self.current < self.devices.len() {
            if let Some(b) = self.devices[self.current].try_get_char()? {
                return Ok(Some(b));
            }
            self.current += 1;
        }
        Ok(None)
    }

    fn look(&mut self) -> Result<Option<u8>> {
        while self.current < self.devices.len() {
            if let Some(b) = self.devices[self.current].look()? {
                return Ok(Some(b));
            }
            self.current += 1;
        }
        Ok(None)
    }
}

/// A counting byte sink that remembers the last byte it emitted.
pub struct OutputDevice<W: std::io::Write> {
    inner: W,
    written: u64,
    last: Option<u8>,
}

impl<W: std::io::Write> OutputDevice<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            last: None,
        }
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len() as u64;
        if let Some(&b) = data.last() {
            self.last = Some(b);
        }
        Ok(())
    }

    /// Total bytes written so far.
    pub fn position(&self) -> u64 {
        self.written
    }

    /// The last byte written, if any.
    pub fn last_byte(&self) -> Option<u8> {
        self.last
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_device_read_and_seek() {
        let mut device = MemoryInputDevice::new(vec![1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(device.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(device.tell().unwrap(), 3);

        device.seek(1).unwrap();
        assert_eq!(device.try_get_char().unwrap(), Some(2));

        device.seek(5).unwrap();
        assert_eq!(device.read(&mut buf).unwrap(), 0);

        // Past the end: reads simply return nothing
        device.seek(100).unwrap();
        assert_eq!(device.read(&mut buf).unwrap(), 0);
        assert_eq!(device.look().unwrap(), None);
    }

    #[test]
    fn test_memory_device_look_does_not_consume() {
        let mut device = MemoryInputDevice::new(vec![b'a', b'b']);

        assert_eq!(device.look().unwrap(), Some(b'a'));
        assert_eq!(device.look().unwrap(), Some(b'a'));
        assert_eq!(device.try_get_char().unwrap(), Some(b'a'));
        assert_eq!(device.try_get_char().unwrap(), Some(b'b'));
        assert_eq!(device.look().unwrap(), None);
        assert_eq!(device.try_get_char().unwrap(), None);
    }

    #[test]
    fn test_read_exact_eof() {
        let mut device = MemoryInputDevice::new(vec![1, 2]);
        let mut buf = [0u8; 4];
        match read_exact(&mut device, &mut buf) {
            Err(PdfError::UnexpectedEof) => {}
            other => panic!("expected UnexpectedEof, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_chain_device_spans_boundaries() {
        let mut chain = ChainInputDevice::new(vec![
            Box::new(MemoryInputDevice::new(vec![1, 2])),
            Box::new(MemoryInputDevice::new(vec![])),
            Box::new(MemoryInputDevice::new(vec![3, 4, 5])),
        ]);

        let mut buf = [0u8; 4];
        assert_eq!(chain.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);

        assert_eq!(chain.look().unwrap(), Some(5));
        assert_eq!(chain.try_get_char().unwrap(), Some(5));
        assert_eq!(chain.look().unwrap(), None);
        assert_eq!(chain.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_chain_device_rejects_positioning() {
        let mut chain =
            ChainInputDevice::new(vec![Box::new(MemoryInputDevice::new(vec![1]))]);

        assert!(matches!(chain.tell(), Err(PdfError::NotImplemented(_))));
        assert!(matches!(chain.seek(0), Err(PdfError::NotImplemented(_))));
    }

    #[test]
    fn test_chain_device_skips_empty_devices_on_look() {
        let mut chain = ChainInputDevice::new(vec![
            Box::new(MemoryInputDevice::new(vec![])),
            Box::new(MemoryInputDevice::new(vec![9])),
        ]);

        assert_eq!(chain.look().unwrap(), Some(9));
        assert_eq!(chain.try_get_char().unwrap(), Some(9));
        assert_eq!(chain.try_get_char().unwrap(), None);
    }

    #[test]
    fn test_output_device_tracks_position_and_last_byte() {
        let mut out = OutputDevice::new(Vec::new());
        assert_eq!(out.position(), 0);
        assert_eq!(out.last_byte(), None);

        out.write_all(b"abc").unwrap();
        assert_eq!(out.position(), 3);
        assert_eq!(out.last_byte(), Some(b'c'));

        out.write_all(b"").unwrap();
        assert_eq!(out.last_byte(), Some(b'c'));

        assert_eq!(out.into_inner(), b"abc".to_vec());
    }
}
