//! Serial link to the desk bus

use std::io::{self, ErrorKind, Read};
use std::time::Duration;

use desk_protocol::CancelToken;
use serialport::SerialPort;

/// How long a single port read may block before the cancel token is polled
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Open serial port that reads like a blocking stream
///
/// The port itself times out every [`READ_POLL_INTERVAL`]; timeouts are
/// retried here so a quiet desk looks like a slow link to the decoder. Once
/// the cancel token is set, a pending read fails with `TimedOut`. The error
/// kind must not be `Interrupted`, which byte sources retry.
pub struct SerialLink<P = Box<dyn SerialPort>> {
    port: P,
    cancel: CancelToken,
}

impl SerialLink {
    /// Open the port at `path`
    pub fn open(path: &str, baud_rate: u32, cancel: CancelToken) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_POLL_INTERVAL)
            .open()?;

        Ok(Self::new(port, cancel))
    }
}

impl<P: Read> SerialLink<P> {
    /// Wrap an already open port that times out its reads
    pub fn new(port: P, cancel: CancelToken) -> Self {
        Self { port, cancel }
    }
}

impl<P: Read> Read for SerialLink<P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.port.read(buf) {
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    if self.cancel.is_cancelled() {
                        return Err(io::Error::new(
                            ErrorKind::TimedOut,
                            "cancelled while waiting for data",
                        ));
                    }
                }
                result => return result,
            }
        }
    }
}
