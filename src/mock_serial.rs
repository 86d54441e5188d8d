//! Mock serial port for the host-side tests.

use thiserror::Error;

/// Captures everything written and replays pre-configured read data.
pub struct MockSerial {
    write_buffer: heapless::Vec<u8, 512>,
    read_buffer: heapless::Vec<u8, 128>,
    read_position: usize,
    should_error_on_write: bool,
}

/// `embedded_io::Error` requires `core::error::Error`, hence the derive.
#[derive(Error, Debug)]
pub enum MockSerialError {
    /// Simulated transport failure.
    #[error("simulated transport failure")]
    SimulatedError,
    /// No data available right now.
    #[error("no data available")]
    WouldBlock,
    /// A buffer capacity was exceeded.
    #[error("buffer capacity exceeded")]
    BufferOverflow,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::SimulatedError => embedded_io::ErrorKind::BrokenPipe,
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        for &byte in buf {
            self.write_buffer
                .push(byte)
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::WouldBlock);
        }
        let available = self.read_buffer.len() - self.read_position;
        let count = core::cmp::min(buf.len(), available);
        buf[..count].copy_from_slice(&self.read_buffer[self.read_position..self.read_position + count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
        }
    }

    /// Queue data to be returned by subsequent `read()` calls.
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Everything written so far, as text.
    pub fn written_str(&self) -> &str {
        core::str::from_utf8(&self.write_buffer).unwrap_or("<non-utf8>")
    }

    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn writes_accumulate() {
        let mut mock = MockSerial::new();
        mock.write_all(b"HELLO ").unwrap();
        mock.write_all(b"WORLD").unwrap();
        assert_eq!(mock.written_str(), "HELLO WORLD");
        mock.clear_written_data();
        assert!(mock.written_str().is_empty());
    }

    #[test]
    fn reads_replay_then_block() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"AB").unwrap();
        let mut byte = [0u8; 1];
        assert_eq!(mock.read(&mut byte).unwrap(), 1);
        assert_eq!(byte[0], b'A');
        assert_eq!(mock.read(&mut byte).unwrap(), 1);
        assert_eq!(byte[0], b'B');
        assert!(matches!(
            mock.read(&mut byte),
            Err(MockSerialError::WouldBlock)
        ));
    }

    #[test]
    fn error_type_satisfies_the_transport_bound() {
        fn assert_transport_error<E: embedded_io::Error>() {}
        assert_transport_error::<MockSerialError>();
        use embedded_io::Error as _;
        assert_eq!(
            MockSerialError::WouldBlock.kind(),
            embedded_io::ErrorKind::Other
        );
    }

    #[test]
    fn injected_write_error_surfaces() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(mock.write_all(b"X").is_err());
    }
}
