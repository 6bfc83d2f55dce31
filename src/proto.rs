//! # Protocol Engine
//!
//! Runs the FDC side of the three FDC+ transactions over a `Transport`.
//! Every transaction is synchronous and there is never more than one in
//! flight; the engine owns the transport for the whole session.
//!
//! Two timeout classes are in play.  A full 10 byte response gets the
//! 500 ms command timeout.  Once a continuous track transfer has begun,
//! each read attempt gets only 100 ms, since silence for even a short
//! interval means the sender has stopped.
//!
//! Nothing here retries.  Retry is a re-issue of the whole transaction by
//! the caller, which is where the protocol places that responsibility.

use std::time::Duration;
use log::{trace,info,warn,error};
use crate::frame::{self,CommandFrame,ResponseFrame,ResponseCode,Tag,FRAME_SIZE};
use crate::drive::{DriveState,MAX_DRIVE};
use crate::transport::Transport;

/// Wait applied to a full 10 byte response frame.
pub const CMD_TIMEOUT: Duration = Duration::from_millis(500);
/// Per-attempt wait once a continuous track transfer is underway.
pub const DATA_TIMEOUT: Duration = Duration::from_millis(100);

/// Enumerates protocol failures.  Each one ends only the current
/// transaction; the state record and transport remain usable.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("serial port is not open")]
    TransportNotOpen,
    #[error("transport i/o failed")]
    Io(#[from] std::io::Error),
    #[error("response timed out with {got} of {expected} bytes")]
    Timeout { got: usize, expected: usize },
    #[error("expected '{expected}' response, received '{got}'")]
    TagMismatch { expected: Tag, got: String },
    #[error("bad checksum on received frame")]
    FrameChecksum,
    #[error("invalid drive number {0}")]
    InvalidDrive(u8),
    #[error("track {0} exceeds the geometry maximum")]
    InvalidTrack(u16),
    #[error("track buffer is {0} bytes, geometry wants {1}")]
    TrackLength(usize,usize),
    #[error("server answered {0}")]
    Server(ResponseCode)
}

/// What a successful READ hands back.  A checksum mismatch on a fully
/// received track is data, not an error; the caller decides on a retry.
pub struct TrackRead {
    pub data: Vec<u8>,
    pub checksum_ok: bool
}

/// The protocol engine.  Holds the transport for the session; a detached
/// engine fails every transaction with `TransportNotOpen`.
pub struct Fdc {
    port: Option<Box<dyn Transport>>
}

impl Fdc {
    pub fn new(port: Box<dyn Transport>) -> Self {
        Self { port: Some(port) }
    }
    pub fn detached() -> Self {
        Self { port: None }
    }
    pub fn attach(&mut self,port: Box<dyn Transport>) {
        self.port = Some(port);
    }
    /// Dropping the transport also aborts any wait the next caller might
    /// have expected to resume; there is nothing else to cancel.
    pub fn detach(&mut self) {
        self.port = None;
    }
    pub fn is_attached(&self) -> bool {
        self.port.is_some()
    }

    /// Accumulate reads until `buf` is full or one attempt comes back empty.
    /// Returns the byte count either way, hard faults propagate.
    fn fill(port: &mut Box<dyn Transport>,buf: &mut [u8],timeout: Duration) -> Result<usize,Error> {
        let mut count = 0;
        while count < buf.len() {
            let n = port.read_timeout(&mut buf[count..],timeout)?;
            if n==0 {
                break;
            }
            count += n;
        }
        Ok(count)
    }

    /// Wait out a 10 byte response, verify its checksum, and demand `expect`
    /// as its tag, echoing the actual tag on a mismatch.
    fn recv_frame(port: &mut Box<dyn Transport>,expect: Tag) -> Result<ResponseFrame,Error> {
        let mut buf = [0;FRAME_SIZE];
        let count = Self::fill(port,&mut buf,CMD_TIMEOUT)?;
        if count < FRAME_SIZE {
            return Err(Error::Timeout { got: count, expected: FRAME_SIZE });
        }
        trace!("recv {}",hex::encode(buf));
        let resp = ResponseFrame::from_bytes(&buf);
        if !resp.checksum_ok {
            return Err(Error::FrameChecksum);
        }
        if resp.tag != expect.as_bytes() {
            return Err(Error::TagMismatch { expected: expect, got: resp.tag_str() });
        }
        Ok(resp)
    }

    fn send(port: &mut Box<dyn Transport>,cmd: &CommandFrame) -> Result<(),Error> {
        let buf = cmd.to_bytes();
        trace!("send {}",hex::encode(buf));
        port.write_all(&buf)?;
        Ok(())
    }

    fn check_drive(drive: u8) -> Result<(),Error> {
        if drive as usize >= MAX_DRIVE {
            error!("drive {} is outside 0..{}",drive,MAX_DRIVE);
            return Err(Error::InvalidDrive(drive));
        }
        Ok(())
    }

    /// STAT transaction.  Parameter 1 carries the selected drive in the low
    /// byte (0xff if none) with the head-load flags in bits 8..8+MAX_DRIVE,
    /// per the protocol header table.  The response code is ignored for
    /// STAT by protocol definition; the response data is the mount bitmap,
    /// which is stored into `state` and returned.
    pub fn stat(&mut self,state: &mut DriveState) -> Result<u16,Error> {
        let mut param1 = state.drive_byte() as u16;
        for d in 0..MAX_DRIVE {
            if state.head_loaded(d) {
                param1 |= 1 << (8+d);
            }
        }
        let cmd = CommandFrame { tag: Tag::Stat, param1, param2: 0 };
        let port = match &mut self.port {
            Some(p) => p,
            None => return Err(Error::TransportNotOpen)
        };
        Self::send(port,&cmd)?;
        let resp = Self::recv_frame(port,Tag::Stat)?;
        state.set_mounted(resp.data);
        info!("mount bitmap {:#06x}",resp.data);
        Ok(resp.data)
    }

    /// READ transaction.  Sends the seek frame, then accumulates the track
    /// plus its 2 byte checksum trailer under the data-stream timeout.
    /// Partial reception reports actual versus expected byte counts.  On
    /// full reception the trailer is verified and reported, and the state's
    /// track number advances to the requested track.
    pub fn read_track(&mut self,state: &mut DriveState,drive: u8,track: u16) -> Result<TrackRead,Error> {
        Self::check_drive(drive)?;
        let geom = state.geometry();
        if track >= geom.track_max() {
            return Err(Error::InvalidTrack(track));
        }
        let track_len = geom.track_len();
        let cmd = CommandFrame {
            tag: Tag::Read,
            param1: frame::seek_word(drive,track),
            param2: track_len as u16
        };
        let port = match &mut self.port {
            Some(p) => p,
            None => return Err(Error::TransportNotOpen)
        };
        Self::send(port,&cmd)?;
        let mut buf = vec![0;track_len+2];
        let count = Self::fill(port,&mut buf,DATA_TIMEOUT)?;
        if count < track_len+2 {
            error!("received {} of {} bytes",count,track_len+2);
            return Err(Error::Timeout { got: count, expected: track_len+2 });
        }
        let trailer = u16::from_le_bytes([buf[track_len],buf[track_len+1]]);
        let checksum_ok = frame::checksum(&buf[0..track_len])==trailer;
        if !checksum_ok {
            warn!("track data checksum did not verify");
        }
        buf.truncate(track_len);
        state.advance_track(track);
        info!("received {} byte track",track_len);
        Ok(TrackRead { data: buf, checksum_ok })
    }

    /// WRIT transaction, three phases.  The seek frame goes out first and
    /// the server must grant the transfer with a WRIT response carrying OK;
    /// any other code aborts before a single data byte is sent.  The track
    /// then goes out with its checksum trailer in one write, and the final
    /// WSTA code is returned verbatim as the transaction outcome.
    pub fn write_track(&mut self,state: &mut DriveState,drive: u8,track: u16,data: &[u8]) -> Result<ResponseCode,Error> {
        Self::check_drive(drive)?;
        let geom = state.geometry();
        if track >= geom.track_max() {
            return Err(Error::InvalidTrack(track));
        }
        let track_len = geom.track_len();
        if data.len() != track_len {
            return Err(Error::TrackLength(data.len(),track_len));
        }
        let cmd = CommandFrame {
            tag: Tag::Writ,
            param1: frame::seek_word(drive,track),
            param2: track_len as u16
        };
        let port = match &mut self.port {
            Some(p) => p,
            None => return Err(Error::TransportNotOpen)
        };
        Self::send(port,&cmd)?;
        let grant = Self::recv_frame(port,Tag::Writ)?;
        match grant.response_code() {
            ResponseCode::Ok => {},
            code => {
                error!("server refused the transfer: {}",code);
                return Err(Error::Server(code));
            }
        }
        let mut block = data.to_vec();
        let sum = frame::checksum(data);
        block.extend_from_slice(&sum.to_le_bytes());
        trace!("sending {} byte block",block.len());
        port.write_all(&block)?;
        let wsta = Self::recv_frame(port,Tag::Wsta)?;
        let code = wsta.response_code();
        info!("WSTA {}",code);
        Ok(code)
    }
}
