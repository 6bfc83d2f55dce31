//! # Serial Transport
//!
//! The protocol engine only ever sees the `Transport` trait, a duplex byte
//! stream with a non-blocking write and a blocking read with a deadline.
//! `SerialTransport` backs it with a real serial port at 8N1, which is the
//! only framing the FDC+ uses.  Tests substitute a scripted object.
//!
//! The FDC+ runs at 403.2K baud when the host can produce it; 460.8K is
//! off by about 3.5% but workable, and 230.4K runs at 80-90% of real disk
//! speed.  All three are accepted here.

use std::io::{Read,Write};
use std::time::Duration;
use log::info;
use crate::DYNERR;

/// Byte stream seam between the engine and the serial line.
pub trait Transport {
    /// Queue every byte for transmission.
    fn write_all(&mut self,buf: &[u8]) -> std::io::Result<()>;
    /// Read whatever arrives within `timeout`.  `Ok(0)` strictly means the
    /// deadline passed with nothing arriving; an `Err` is a hard fault.
    fn read_timeout(&mut self,buf: &mut [u8],timeout: Duration) -> std::io::Result<usize>;
}

/// Transport over a real serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>
}

impl SerialTransport {
    /// Open `name` at `baud`, 8N1, no flow control, DTR and RTS asserted,
    /// with any pending input discarded.
    pub fn open(name: &str,baud: u32) -> Result<Self,DYNERR> {
        let mut port = serialport::new(name,baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(500))
            .open()?;
        port.write_data_terminal_ready(true)?;
        port.write_request_to_send(true)?;
        port.clear(serialport::ClearBuffer::All)?;
        info!("opened {} at {} baud",name,baud);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self,buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()
    }
    fn read_timeout(&mut self,buf: &mut [u8],timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(e) if e.kind()==std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e)
        }
    }
}

/// Names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>,DYNERR> {
    let mut ans = Vec::new();
    for port in serialport::available_ports()? {
        ans.push(port.port_name);
    }
    Ok(ans)
}
