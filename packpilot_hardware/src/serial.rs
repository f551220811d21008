//! Serial implementations of the transport and relay seams.
//!
//! The telemetry board shares one UART for both directions: it streams
//! `DATA,...` lines and accepts `S,<id>,<0|1>` relay commands. The port is
//! opened once and cloned so the reader thread and the control loop can
//! hold independent handles.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use packpilot_traits::{Relays, Transport};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unterminated garbage beyond this length is discarded wholesale.
const MAX_PENDING: usize = 4096;

/// Line-oriented reader over a serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialTransport {
    pub fn open(path: &str, baud: u32) -> Result<Self, HwError> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| HwError::Open {
                port: path.to_string(),
                source: e,
            })?;
        tracing::info!(port = path, baud, "serial port open");
        Ok(Self {
            port,
            pending: Vec::new(),
        })
    }

    fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            pending: Vec::new(),
        }
    }

    /// Pop the first complete line (newline included) off the buffer.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl Transport for SerialTransport {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        self.pending.clear();
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| Box::new(HwError::Read(e.into())) as BoxError)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        if let Err(e) = self.port.set_timeout(timeout) {
            return Err(Box::new(HwError::Read(e.into())));
        }

        let mut buf = [0u8; 256];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.pending.extend_from_slice(&buf[..n]);
                if self.pending.len() > MAX_PENDING {
                    tracing::warn!(
                        len = self.pending.len(),
                        "no newline in pending buffer, discarding"
                    );
                    self.pending.clear();
                }
                Ok(self.take_line())
            }
            // A quiet bus is not an error; partial data stays pending.
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(Box::new(HwError::Read(e))),
        }
    }
}

/// Relay command writer over a serial port.
pub struct SerialRelays {
    port: Box<dyn SerialPort>,
}

impl SerialRelays {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Relays for SerialRelays {
    fn drive(&mut self, relay_id: u8, on: bool) -> Result<(), BoxError> {
        let cmd = format!("S,{relay_id},{}\n", u8::from(on));
        self.port
            .write_all(cmd.as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|e| Box::new(HwError::Write(e)) as BoxError)?;
        tracing::debug!(relay_id, on, "relay command sent");
        Ok(())
    }
}

/// Open one port and split it into a reader half and a relay half.
pub fn open_pair(path: &str, baud: u32) -> Result<(SerialTransport, SerialRelays), HwError> {
    let port = serialport::new(path, baud)
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| HwError::Open {
            port: path.to_string(),
            source: e,
        })?;
    tracing::info!(port = path, baud, "serial port open");
    let writer = port.try_clone().map_err(HwError::Clone)?;
    Ok((SerialTransport::from_port(port), SerialRelays::new(writer)))
}
