//! # Frame Codec and Checksum
//!
//! Every FDC+ message is a fixed 10 byte frame: a 4 character ASCII tag,
//! two little endian 16 bit words, and a little endian 16 bit checksum over
//! the first 8 bytes.  The same additive checksum also trails every track
//! data block, where it covers exactly the track bytes and nothing else.
//!
//! The two words are overloaded by direction.  Going out they are
//! Parameter 1 and Parameter 2, coming back they are Response Code and
//! Response Data, so the codec keeps two structures with identical wire
//! layout rather than one structure with ambiguous labels.

use std::fmt;

pub const FRAME_SIZE: usize = 10;
pub const CHECKSUM_SPAN: usize = 8;

/// 16 bit sum of the bytes, wrapping modulo 65536.
/// Used identically for 8 byte command headers and whole track buffers.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for byte in data {
        sum = sum.wrapping_add(*byte as u16);
    }
    sum
}

/// Pack a drive and track into the READ/WRIT Parameter 1 word:
/// track in bits 0-11, drive in bits 12-15.
pub fn seek_word(drive: u8,track: u16) -> u16 {
    (track & 0x0fff) | ((drive as u16) << 12)
}

/// The ASCII message tags defined by the FDC+ protocol.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Tag {
    Stat,
    Read,
    Writ,
    Wsta
}

impl Tag {
    pub fn as_bytes(&self) -> [u8;4] {
        match self {
            Self::Stat => *b"STAT",
            Self::Read => *b"READ",
            Self::Writ => *b"WRIT",
            Self::Wsta => *b"WSTA"
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self,f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,"{}",String::from_utf8_lossy(&self.as_bytes()))
    }
}

/// Response codes carried in the first word of a server frame.
/// Values outside the defined four are preserved, never remapped.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum ResponseCode {
    Ok,
    NotReady,
    ChecksumError,
    WriteError,
    Unknown(u16)
}

impl ResponseCode {
    pub fn from_word(val: u16) -> Self {
        match val {
            0 => Self::Ok,
            1 => Self::NotReady,
            2 => Self::ChecksumError,
            3 => Self::WriteError,
            x => Self::Unknown(x)
        }
    }
    pub fn as_word(&self) -> u16 {
        match self {
            Self::Ok => 0,
            Self::NotReady => 1,
            Self::ChecksumError => 2,
            Self::WriteError => 3,
            Self::Unknown(x) => *x
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self,f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ok => write!(f,"OK"),
            Self::NotReady => write!(f,"NOT READY"),
            Self::ChecksumError => write!(f,"CHECKSUM ERROR"),
            Self::WriteError => write!(f,"WRITE ERROR"),
            Self::Unknown(x) => write!(f,"UNKNOWN ({:#06x})",x)
        }
    }
}

/// An outgoing frame.  The checksum is computed when the bytes are built.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct CommandFrame {
    pub tag: Tag,
    pub param1: u16,
    pub param2: u16
}

impl CommandFrame {
    pub fn to_bytes(&self) -> [u8;FRAME_SIZE] {
        let mut buf = [0;FRAME_SIZE];
        buf[0..4].copy_from_slice(&self.tag.as_bytes());
        buf[4..6].copy_from_slice(&self.param1.to_le_bytes());
        buf[6..8].copy_from_slice(&self.param2.to_le_bytes());
        let sum = checksum(&buf[0..CHECKSUM_SPAN]);
        buf[8..10].copy_from_slice(&sum.to_le_bytes());
        buf
    }
}

/// An incoming frame.  Decoding never fails; the raw tag is kept so a
/// mismatch can be echoed for diagnostics, and the caller is expected to
/// gate on `checksum_ok` and on tag recognition.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct ResponseFrame {
    pub tag: [u8;4],
    pub code: u16,
    pub data: u16,
    pub checksum_ok: bool
}

impl ResponseFrame {
    pub fn from_bytes(buf: &[u8;FRAME_SIZE]) -> Self {
        let received = u16::from_le_bytes([buf[8],buf[9]]);
        Self {
            tag: [buf[0],buf[1],buf[2],buf[3]],
            code: u16::from_le_bytes([buf[4],buf[5]]),
            data: u16::from_le_bytes([buf[6],buf[7]]),
            checksum_ok: checksum(&buf[0..CHECKSUM_SPAN])==received
        }
    }
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_word(self.code)
    }
    /// Lossy rendering of the tag for messages.
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).to_string()
    }
}
