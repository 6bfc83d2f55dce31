//! # Command Line Interface
//!
//! One subcommand per control the FDC+ drive server expects to be poked
//! with: `ports` lists serial ports, `stat` polls drive status (once, or
//! repeatedly with `--watch`), `read` pulls a track to a file or a hex
//! dump, `write` pushes a track from a file.

use clap::{arg,crate_version,Command,ArgAction,ArgMatches};
use env_logger;
use std::str::FromStr;
use log::{warn,error};
use fdcplus::drive::{DriveState,Geometry,MAX_DRIVE};
use fdcplus::proto::Fdc;
use fdcplus::transport::{self,SerialTransport};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"fdcplus exercises an Altair FDC+ serial drive server from the host side.
All transactions are initiated here; the server only answers.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
list serial ports:     `fdcplus ports`
one status poll:       `fdcplus stat -p /dev/ttyUSB0 -d 0`
poll like the FDC:     `fdcplus stat -p /dev/ttyUSB0 -d 0 --watch`
read a track:          `fdcplus read -p /dev/ttyUSB0 -d 0 -t 12 -o track12.bin`
write it back:         `fdcplus write -p /dev/ttyUSB0 -d 0 -t 12 -f track12.bin`";

    let baud_rates = ["230400","403200","460800"];
    let disk_kinds = ["8in","minidisk"];

    let mut main_cmd = Command::new("fdcplus")
        .about("Exercises an FDC+ serial drive server from the host.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("ports")
        .about("list serial ports on this machine"));
    main_cmd = main_cmd.subcommand(Command::new("stat")
        .about("provide and request drive status")
        .arg(arg!(-p --port <PORT> "serial port").required(true))
        .arg(arg!(-b --baud <RATE> "baud rate").value_parser(baud_rates)
            .required(false)
            .default_value("403200"))
        .arg(arg!(-d --drive <DRIVE> "selected drive number").required(false))
        .arg(arg!(--head <DRIVE> "flag this drive's head as loaded")
            .action(ArgAction::Append)
            .required(false))
        .arg(arg!(-w --watch "poll repeatedly until interrupted").action(ArgAction::SetTrue))
        .arg(arg!(-i --interval <MS> "polling interval for watch mode")
            .required(false)
            .default_value("100")));
    main_cmd = main_cmd.subcommand(Command::new("read")
        .about("read one track from the server")
        .arg(arg!(-p --port <PORT> "serial port").required(true))
        .arg(arg!(-b --baud <RATE> "baud rate").value_parser(baud_rates)
            .required(false)
            .default_value("403200"))
        .arg(arg!(-d --drive <DRIVE> "drive number").required(true))
        .arg(arg!(-t --track <TRACK> "track number").required(true))
        .arg(arg!(-k --kind <SIZE> "kind of disk").value_parser(disk_kinds)
            .required(false)
            .default_value("8in"))
        .arg(arg!(-o --out <PATH> "save track bytes to this file").required(false)));
    main_cmd = main_cmd.subcommand(Command::new("write")
        .about("write one track to the server")
        .arg(arg!(-p --port <PORT> "serial port").required(true))
        .arg(arg!(-b --baud <RATE> "baud rate").value_parser(baud_rates)
            .required(false)
            .default_value("403200"))
        .arg(arg!(-d --drive <DRIVE> "drive number").required(true))
        .arg(arg!(-t --track <TRACK> "track number").required(true))
        .arg(arg!(-k --kind <SIZE> "kind of disk").value_parser(disk_kinds)
            .required(false)
            .default_value("8in"))
        .arg(arg!(-f --file <PATH> "file holding exactly one track of data").required(true)));
    let matches = main_cmd.get_matches();

    // List serial ports

    if let Some(_cmd) = matches.subcommand_matches("ports") {
        let ports = transport::available_ports()?;
        if ports.len()==0 {
            warn!("no serial ports were found");
        }
        for name in ports {
            println!("{}",name);
        }
        return Ok(());
    }

    // Drive status

    if let Some(cmd) = matches.subcommand_matches("stat") {
        let mut state = DriveState::new();
        if let Some(d) = cmd.get_one::<String>("drive") {
            state.select_drive(Some(u8::from_str(d)?))?;
        }
        if let Some(heads) = cmd.get_many::<String>("head") {
            for h in heads {
                state.set_head_loaded(usize::from_str(h)?,true)?;
            }
        }
        let mut fdc = open_session(cmd)?;
        if cmd.get_flag("watch") {
            let mut interval = u64::from_str(cmd.get_one::<String>("interval").expect(RCH))?;
            if interval < 100 {
                warn!("raising polling interval to the 100 ms floor");
                interval = 100;
            }
            loop {
                match fdc.stat(&mut state) {
                    Ok(bitmap) => println!("{}",mount_report(bitmap)),
                    Err(e) => error!("{}",e)
                }
                std::thread::sleep(std::time::Duration::from_millis(interval));
            }
        }
        let bitmap = fdc.stat(&mut state)?;
        println!("{}",mount_report(bitmap));
        return Ok(());
    }

    // Read a track

    if let Some(cmd) = matches.subcommand_matches("read") {
        let drive = u8::from_str(cmd.get_one::<String>("drive").expect(RCH))?;
        let track = u16::from_str(cmd.get_one::<String>("track").expect(RCH))?;
        let kind = Geometry::from_str(cmd.get_one::<String>("kind").expect(RCH))?;
        let mut state = DriveState::new();
        state.set_geometry(kind);
        state.select_drive(Some(drive))?;
        let mut fdc = open_session(cmd)?;
        let ans = fdc.read_track(&mut state,drive,track)?;
        if !ans.checksum_ok {
            warn!("track arrived with a bad checksum, keeping the bytes anyway");
        }
        match cmd.get_one::<String>("out") {
            Some(path) => std::fs::write(path,&ans.data)?,
            None => fdcplus::display_track(&ans.data)
        }
        return Ok(());
    }

    // Write a track

    if let Some(cmd) = matches.subcommand_matches("write") {
        let drive = u8::from_str(cmd.get_one::<String>("drive").expect(RCH))?;
        let track = u16::from_str(cmd.get_one::<String>("track").expect(RCH))?;
        let kind = Geometry::from_str(cmd.get_one::<String>("kind").expect(RCH))?;
        let data = std::fs::read(cmd.get_one::<String>("file").expect(RCH))?;
        let mut state = DriveState::new();
        state.set_geometry(kind);
        state.select_drive(Some(drive))?;
        let mut fdc = open_session(cmd)?;
        let code = fdc.write_track(&mut state,drive,track,&data)?;
        match code {
            fdcplus::frame::ResponseCode::Ok => {
                println!("track accepted");
                return Ok(());
            },
            code => {
                error!("final status was {}",code);
                return Err(Box::new(fdcplus::proto::Error::Server(code)));
            }
        }
    }

    error!("No subcommand was found, try `fdcplus --help`");
    return Err(Box::new(fdcplus::CommandError::InvalidCommand));

}

fn open_session(cmd: &ArgMatches) -> Result<Fdc,Box<dyn std::error::Error>> {
    let name = cmd.get_one::<String>("port").expect(RCH);
    let baud = u32::from_str(cmd.get_one::<String>("baud").expect(RCH)).expect(RCH);
    let port = SerialTransport::open(name,baud)?;
    Ok(Fdc::new(Box::new(port)))
}

fn mount_report(bitmap: u16) -> String {
    let mut ans = format!("mount bitmap {:#06x}",bitmap);
    for d in 0..MAX_DRIVE {
        ans += &format!("\ndrive {}: {}",d,match bitmap & (1<<d) {
            0 => "empty",
            _ => "mounted"
        });
    }
    ans
}
