//! # Drive and Track State
//!
//! The small set of session parameters the protocol engine works from:
//! selected drive, per-drive head-load flags, current track, and the
//! active disk geometry.  The engine refreshes the mount bitmap on every
//! STAT exchange and advances the track on every successful READ; the
//! surrounding program mutates everything else through the setters here.
//! Nothing is persisted, the record lives and dies with the session.

use std::fmt;
use std::str::FromStr;

pub const MAX_DRIVE: usize = 4;
/// Wire value for "no drive selected" in the STAT Parameter 1 low byte.
pub const NO_DRIVE: u8 = 0xff;

const TRACK_MAX_5: u16 = 35;
const TRACK_MAX_8: u16 = 77;
const TRACK_LEN_5: usize = 137*16;
const TRACK_LEN_8: usize = 137*32;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("drive number out of range")]
    DriveRange,
    #[error("track number out of range")]
    TrackRange,
    #[error("unknown disk geometry")]
    UnknownGeometry
}

/// The two disk geometries the FDC+ serial modes carry.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Geometry {
    /// 8 inch disk, 137*32 = 4384 byte tracks, 77 tracks
    Eight,
    /// Minidisk, 137*16 = 2192 byte tracks, 35 tracks
    Minidisk
}

impl Geometry {
    pub fn track_len(&self) -> usize {
        match self {
            Self::Eight => TRACK_LEN_8,
            Self::Minidisk => TRACK_LEN_5
        }
    }
    pub fn track_max(&self) -> u16 {
        match self {
            Self::Eight => TRACK_MAX_8,
            Self::Minidisk => TRACK_MAX_5
        }
    }
}

impl FromStr for Geometry {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "8in" => Ok(Self::Eight),
            "minidisk" => Ok(Self::Minidisk),
            _ => Err(Error::UnknownGeometry)
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self,f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Eight => write!(f,"8in"),
            Self::Minidisk => write!(f,"minidisk")
        }
    }
}

/// Session state record.  Starts with no drive selected, all heads
/// unloaded, track 0, 8 inch geometry.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct DriveState {
    drive: Option<u8>,
    head_loaded: [bool;MAX_DRIVE],
    track: u16,
    geometry: Geometry,
    mounted: u16
}

impl DriveState {
    pub fn new() -> Self {
        Self {
            drive: None,
            head_loaded: [false;MAX_DRIVE],
            track: 0,
            geometry: Geometry::Eight,
            mounted: 0
        }
    }
    pub fn select_drive(&mut self,drive: Option<u8>) -> Result<(),Error> {
        if let Some(d) = drive {
            if d as usize >= MAX_DRIVE {
                return Err(Error::DriveRange);
            }
        }
        self.drive = drive;
        Ok(())
    }
    pub fn drive(&self) -> Option<u8> {
        self.drive
    }
    /// Selected drive as it appears on the wire, `NO_DRIVE` if none.
    pub fn drive_byte(&self) -> u8 {
        match self.drive {
            Some(d) => d,
            None => NO_DRIVE
        }
    }
    pub fn set_head_loaded(&mut self,drive: usize,loaded: bool) -> Result<(),Error> {
        if drive >= MAX_DRIVE {
            return Err(Error::DriveRange);
        }
        self.head_loaded[drive] = loaded;
        Ok(())
    }
    pub fn head_loaded(&self,drive: usize) -> bool {
        drive < MAX_DRIVE && self.head_loaded[drive]
    }
    pub fn set_track(&mut self,track: u16) -> Result<(),Error> {
        if track >= self.geometry.track_max() {
            return Err(Error::TrackRange);
        }
        self.track = track;
        Ok(())
    }
    pub fn track(&self) -> u16 {
        self.track
    }
    /// Changing geometry clamps the track to the new maximum.
    pub fn set_geometry(&mut self,geometry: Geometry) {
        self.geometry = geometry;
        if self.track >= geometry.track_max() {
            self.track = geometry.track_max() - 1;
        }
    }
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }
    /// Mount bitmap as last reported by the server, bit i = drive i mounted.
    pub fn mounted(&self) -> u16 {
        self.mounted
    }
    pub fn is_mounted(&self,drive: usize) -> bool {
        drive < 16 && self.mounted & (1 << drive) > 0
    }
    pub(crate) fn set_mounted(&mut self,bitmap: u16) {
        self.mounted = bitmap;
    }
    pub(crate) fn advance_track(&mut self,track: u16) {
        self.track = track;
    }
}

impl Default for DriveState {
    fn default() -> Self {
        Self::new()
    }
}
