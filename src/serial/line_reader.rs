//! # Serial Line Reader
//!
//! Splits the serial byte stream into newline-terminated lines.
//!
//! Reads never block: [`LineReader::poll_line`] hands back a buffered line if
//! one is complete, otherwise takes whatever the port has ready right now.

use bytes::{Bytes, BytesMut};
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use super::port_trait::SerialPortIO;

/// Longest line kept while waiting for its terminator
///
/// Well-formed sensor lines are under 100 bytes. Anything longer without a
/// newline is noise and gets dropped.
pub const MAX_LINE_LEN: usize = 1024;

/// Initial read buffer capacity
const READ_BUFFER_CAPACITY: usize = 4096;

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line, terminator included
    Line(Bytes),
    /// No complete line available right now
    Idle,
    /// The port reported end of stream
    Closed,
}

/// Line splitter over a serial port
pub struct LineReader<P> {
    port: P,
    buffer: BytesMut,
    /// Inside an overlong line; everything up to the next newline is dropped
    discarding: bool,
}

impl<P: SerialPortIO> LineReader<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            discarding: false,
        }
    }

    /// Return the next complete line without waiting for the device
    ///
    /// # Errors
    ///
    /// Propagates read errors from the port.
    pub async fn poll_line(&mut self) -> io::Result<LineEvent> {
        if let Some(line) = self.take_line() {
            return Ok(LineEvent::Line(line));
        }

        // A zero timeout polls the read once and gives up if it is not ready.
        match tokio::time::timeout(Duration::ZERO, self.port.read_into(&mut self.buffer)).await {
            Err(_) => Ok(LineEvent::Idle),
            Ok(Ok(0)) => Ok(LineEvent::Closed),
            Ok(Ok(_)) => Ok(self.take_line().map_or(LineEvent::Idle, LineEvent::Line)),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Bytes received but not yet returned as a line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn take_line(&mut self) -> Option<Bytes> {
        loop {
            match self.buffer.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    let line = self.buffer.split_to(end + 1).freeze();
                    if !self.discarding {
                        return Some(line);
                    }
                    // Tail of an overlong line
                    debug!("Dropping {} trailing bytes of an overlong serial line", line.len());
                    self.discarding = false;
                }
                None => {
                    if self.discarding {
                        self.buffer.clear();
                    } else if self.buffer.len() > MAX_LINE_LEN {
                        warn!("Dropping {} bytes of serial input without a line break", self.buffer.len());
                        self.buffer.clear();
                        self.discarding = true;
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::MockSerialPort;

    #[tokio::test]
    async fn test_single_line() {
        let port = MockSerialPort::new();
        port.push_data(b"1,2,3\n");
        let mut reader = LineReader::new(port);

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Line(Bytes::from_static(b"1,2,3\n")));
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
    }

    #[tokio::test]
    async fn test_idle_when_no_data() {
        let port = MockSerialPort::new();
        let mut reader = LineReader::new(port.clone());

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(port.read_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_line_waits_for_terminator() {
        let port = MockSerialPort::new();
        port.push_data(b"1,2,");
        port.push_data(b"3\r\n");
        let mut reader = LineReader::new(port);

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.pending(), 4);
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Line(Bytes::from_static(b"1,2,3\r\n")));
        assert_eq!(reader.pending(), 0);
    }

    #[tokio::test]
    async fn test_several_lines_in_one_read() {
        let port = MockSerialPort::new();
        port.push_data(b"a\nb\nc");
        let mut reader = LineReader::new(port.clone());

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Line(Bytes::from_static(b"a\n")));
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Line(Bytes::from_static(b"b\n")));
        // Second line came from the buffer without touching the port
        assert_eq!(port.read_count(), 1);
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.pending(), 1);
    }

    #[tokio::test]
    async fn test_closed_port() {
        let port = MockSerialPort::new();
        port.push_closed();
        let mut reader = LineReader::new(port);

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Closed);
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let port = MockSerialPort::new();
        port.push_error(io::ErrorKind::BrokenPipe);
        let mut reader = LineReader::new(port);

        let err = reader.poll_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_overlong_garbage_is_dropped() {
        let port = MockSerialPort::new();
        port.push_data(&vec![b'x'; MAX_LINE_LEN + 1]);
        port.push_data(b"1,2\n");
        port.push_data(b"3,4\n");
        let mut reader = LineReader::new(port);

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.pending(), 0);
        // "1,2\n" ends the overlong line, so it is dropped with it
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Line(Bytes::from_static(b"3,4\n")));
    }

    #[tokio::test]
    async fn test_overlong_line_tail_in_later_reads_is_dropped() {
        let port = MockSerialPort::new();
        port.push_data(&vec![b'x'; 1100]);
        port.push_data(b"xxxx");
        port.push_data(b"xx,garbage-tail\n1,2,3,4,5,6,7,8,9,10\n");
        let mut reader = LineReader::new(port);

        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
        assert_eq!(reader.pending(), 0);
        assert_eq!(
            reader.poll_line().await.unwrap(),
            LineEvent::Line(Bytes::from_static(b"1,2,3,4,5,6,7,8,9,10\n"))
        );
        assert_eq!(reader.poll_line().await.unwrap(), LineEvent::Idle);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_kept() {
        let port = MockSerialPort::new();
        let mut data = vec![b'1'; MAX_LINE_LEN];
        data.push(b'\n');
        port.push_data(&data);
        let mut reader = LineReader::new(port);

        match reader.poll_line().await.unwrap() {
            LineEvent::Line(line) => assert_eq!(line.len(), MAX_LINE_LEN + 1),
            other => panic!("Expected a line, got: {:?}", other),
        }
    }
}
