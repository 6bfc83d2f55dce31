// test of the protocol engine against a scripted transport
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use fdcplus::drive::{DriveState,Geometry};
use fdcplus::frame::{self,CommandFrame,ResponseCode,Tag};
use fdcplus::proto::{Error,Fdc};
use fdcplus::transport::Transport;

type SentLog = Rc<RefCell<Vec<Vec<u8>>>>;

/// Stands in for the serial line.  Writes are captured in a shared log,
/// reads are served from scripted chunks; running out of chunks behaves
/// like a line that has gone silent.
struct ScriptedPort {
    sent: SentLog,
    feed: VecDeque<Vec<u8>>
}

impl ScriptedPort {
    fn new(feed: Vec<Vec<u8>>) -> (Self,SentLog) {
        let sent: SentLog = Default::default();
        (Self { sent: sent.clone(), feed: feed.into() },sent)
    }
}

impl Transport for ScriptedPort {
    fn write_all(&mut self,buf: &[u8]) -> std::io::Result<()> {
        self.sent.borrow_mut().push(buf.to_vec());
        Ok(())
    }
    fn read_timeout(&mut self,buf: &mut [u8],_timeout: Duration) -> std::io::Result<usize> {
        match self.feed.pop_front() {
            Some(mut chunk) => {
                let count = usize::min(buf.len(),chunk.len());
                buf[0..count].copy_from_slice(&chunk[0..count]);
                if count < chunk.len() {
                    self.feed.push_front(chunk.split_off(count));
                }
                Ok(count)
            },
            None => Ok(0)
        }
    }
}

fn server_frame(tag: Tag,code: u16,data: u16) -> Vec<u8> {
    CommandFrame { tag, param1: code, param2: data }.to_bytes().to_vec()
}

fn track_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i%251) as u8).collect()
}

#[test]
fn stat_reports_mounted_drives() {
    // drives 0 and 2 mounted
    let (port,sent) = ScriptedPort::new(vec![server_frame(Tag::Stat,0,0b101)]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.select_drive(Some(1)).expect("bad drive");
    state.set_head_loaded(0,true).expect("bad drive");
    let bitmap = fdc.stat(&mut state).expect("transaction failed");
    assert_eq!(bitmap,5);
    assert!(state.is_mounted(0));
    assert!(!state.is_mounted(1));
    assert!(state.is_mounted(2));
    // outgoing frame: drive in the low byte, head-load bits in the high byte
    let log = sent.borrow();
    assert_eq!(log.len(),1);
    assert_eq!(&log[0][0..4],b"STAT");
    assert_eq!(u16::from_le_bytes([log[0][4],log[0][5]]),0x0101);
    assert_eq!(u16::from_le_bytes([log[0][6],log[0][7]]),0);
}

#[test]
fn stat_with_no_drive_selected() {
    // the response code is defined to be ignored for STAT
    let (port,sent) = ScriptedPort::new(vec![server_frame(Tag::Stat,2,0)]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    let bitmap = fdc.stat(&mut state).expect("transaction failed");
    assert_eq!(bitmap,0);
    let log = sent.borrow();
    assert_eq!(log[0][4],0xff);
    assert_eq!(log[0][5],0);
}

#[test]
fn tag_mismatch_echoes_actual() {
    let (port,_sent) = ScriptedPort::new(vec![server_frame(Tag::Read,0,0)]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    match fdc.stat(&mut state) {
        Err(Error::TagMismatch { expected, got }) => {
            assert_eq!(expected,Tag::Stat);
            assert_eq!(got,"READ");
        },
        _ => panic!("expected a tag mismatch")
    }
}

#[test]
fn bad_frame_checksum_is_rejected() {
    let mut buf = server_frame(Tag::Stat,0,0);
    buf[6] ^= 1;
    let (port,_sent) = ScriptedPort::new(vec![buf]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    assert!(matches!(fdc.stat(&mut state),Err(Error::FrameChecksum)));
}

#[test]
fn response_timeout_counts_bytes() {
    let (port,_sent) = ScriptedPort::new(vec![vec![1,2,3,4]]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    match fdc.stat(&mut state) {
        Err(Error::Timeout { got, expected }) => {
            assert_eq!(got,4);
            assert_eq!(expected,10);
        },
        _ => panic!("expected a timeout")
    }
}

#[test]
fn detached_engine_refuses() {
    let mut fdc = Fdc::detached();
    let mut state = DriveState::new();
    assert!(matches!(fdc.stat(&mut state),Err(Error::TransportNotOpen)));
}

#[test]
fn read_full_track() {
    let data = track_pattern(2192);
    let mut stream = data.clone();
    stream.extend_from_slice(&frame::checksum(&data).to_le_bytes());
    // deliver in ragged chunks the way a serial line would
    let feed = vec![
        stream[0..700].to_vec(),
        stream[700..2100].to_vec(),
        stream[2100..].to_vec()
    ];
    let (port,sent) = ScriptedPort::new(feed);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    let ans = fdc.read_track(&mut state,2,30).expect("transaction failed");
    assert_eq!(ans.data,data);
    assert!(ans.checksum_ok);
    assert_eq!(state.track(),30);
    let log = sent.borrow();
    assert_eq!(log.len(),1);
    assert_eq!(&log[0][0..4],b"READ");
    assert_eq!(u16::from_le_bytes([log[0][4],log[0][5]]),frame::seek_word(2,30));
    assert_eq!(u16::from_le_bytes([log[0][6],log[0][7]]),2192);
}

#[test]
fn read_partial_track_times_out() {
    // server stops after 4000 bytes of an 8 inch track
    let (port,_sent) = ScriptedPort::new(vec![track_pattern(4000)]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    match fdc.read_track(&mut state,0,5) {
        Err(Error::Timeout { got, expected }) => {
            assert_eq!(got,4000);
            assert_eq!(expected,4386);
        },
        _ => panic!("expected a timeout")
    }
}

#[test]
fn read_bad_trailer_is_reported_not_fatal() {
    let data = track_pattern(2192);
    let mut stream = data.clone();
    let bad = frame::checksum(&data).wrapping_add(1);
    stream.extend_from_slice(&bad.to_le_bytes());
    let (port,_sent) = ScriptedPort::new(vec![stream]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    let ans = fdc.read_track(&mut state,1,10).expect("transaction failed");
    assert_eq!(ans.data,data);
    assert!(!ans.checksum_ok);
}

#[test]
fn read_checks_drive_before_sending() {
    let (port,sent) = ScriptedPort::new(vec![]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    assert!(matches!(fdc.read_track(&mut state,4,0),Err(Error::InvalidDrive(4))));
    assert_eq!(sent.borrow().len(),0);
}

#[test]
fn read_checks_track_range() {
    let (port,sent) = ScriptedPort::new(vec![]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    assert!(matches!(fdc.read_track(&mut state,0,35),Err(Error::InvalidTrack(35))));
    assert_eq!(sent.borrow().len(),0);
}

#[test]
fn write_refused_before_data_phase() {
    let (port,sent) = ScriptedPort::new(vec![server_frame(Tag::Writ,1,0)]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    let data = track_pattern(2192);
    match fdc.write_track(&mut state,0,3,&data) {
        Err(Error::Server(code)) => assert_eq!(code,ResponseCode::NotReady),
        _ => panic!("expected the server refusal")
    }
    // only the command frame went out, never the data block
    let log = sent.borrow();
    assert_eq!(log.len(),1);
    assert_eq!(log[0].len(),10);
}

#[test]
fn write_full_transaction() {
    let feed = vec![
        server_frame(Tag::Writ,0,0),
        server_frame(Tag::Wsta,0,0)
    ];
    let (port,sent) = ScriptedPort::new(feed);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    let data = track_pattern(2192);
    let code = fdc.write_track(&mut state,3,20,&data).expect("transaction failed");
    assert_eq!(code,ResponseCode::Ok);
    let log = sent.borrow();
    assert_eq!(log.len(),2);
    assert_eq!(&log[0][0..4],b"WRIT");
    assert_eq!(u16::from_le_bytes([log[0][4],log[0][5]]),frame::seek_word(3,20));
    // data block is the track plus its little endian checksum trailer
    assert_eq!(log[1].len(),2194);
    assert_eq!(&log[1][0..2192],&data[..]);
    assert_eq!(u16::from_le_bytes([log[1][2192],log[1][2193]]),frame::checksum(&data));
}

#[test]
fn write_final_status_verbatim() {
    let feed = vec![
        server_frame(Tag::Writ,0,0),
        server_frame(Tag::Wsta,7,0)
    ];
    let (port,_sent) = ScriptedPort::new(feed);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    state.set_geometry(Geometry::Minidisk);
    let data = track_pattern(2192);
    let code = fdc.write_track(&mut state,0,0,&data).expect("transaction failed");
    assert_eq!(code,ResponseCode::Unknown(7));
}

#[test]
fn write_wrong_buffer_length() {
    let (port,sent) = ScriptedPort::new(vec![]);
    let mut fdc = Fdc::new(Box::new(port));
    let mut state = DriveState::new();
    match fdc.write_track(&mut state,0,0,&[0;100]) {
        Err(Error::TrackLength(got,want)) => {
            assert_eq!(got,100);
            assert_eq!(want,4384);
        },
        _ => panic!("expected a length complaint")
    }
    assert_eq!(sent.borrow().len(),0);
}
