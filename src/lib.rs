//! # `fdcplus` main library
//!
//! This library speaks the Altair FDC+ serial drive protocol from the FDC
//! (initiator) side, so that a PC-hosted drive server can be exercised over
//! an ordinary serial port.
//!
//! ## Architecture
//!
//! The protocol core is built around three pieces:
//! * `frame` packs and unpacks the fixed 10-byte command/response messages
//!   and computes the 16-bit additive checksum used everywhere
//! * `transport::Transport` is the byte-stream seam; the engine only ever
//!   sees this trait, the `serialport` backing lives behind it
//! * `proto::Fdc` runs the STAT/READ/WRIT transactions one at a time,
//!   including the bulk track-data phase with its own checksum trailer
//!
//! Session parameters (selected drive, head-load flags, track, geometry)
//! live in `drive::DriveState`, which is passed into each transaction.
//! The engine refreshes the mount bitmap on every STAT and advances the
//! track number on every successful READ; everything else is mutated only
//! through explicit setters called by the surrounding program.
//!
//! ## Error Recovery
//!
//! The engine never retries on its own.  A timeout, tag mismatch, or bad
//! checksum ends the current transaction and is reported to the caller,
//! who may re-issue the whole transaction; this matches the protocol's
//! rule that the initiator owns retry.

pub mod frame;
pub mod drive;
pub mod transport;
pub mod proto;

type DYNERR = Box<dyn std::error::Error>;

/// Errors arising from CLI handling rather than the protocol itself.
#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand
}

/// Hex dump of a track (or any byte run) in 16 byte rows with an ASCII column.
pub fn display_track(block: &[u8]) {
    let mut slice_start = 0;
    while slice_start < block.len() {
        let mut slice_end = slice_start + 16;
        if slice_end > block.len() {
            slice_end = block.len();
        }
        let slice = block[slice_start..slice_end].to_vec();
        let txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x<32 => '.' as u8,
            x if x<127 => x,
            _ => '.' as u8
        }).collect();
        print!("{:04X} : ",slice_start);
        for byte in slice {
            print!("{:02X} ",byte);
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        println!("| {}",String::from_utf8_lossy(&txt));
        slice_start += 16;
    }
}
