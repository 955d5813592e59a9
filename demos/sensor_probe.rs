use std::error::Error;
use std::io::{Read, Write};
use std::process::ExitCode;
use std::thread;

use roomba_oi::transport::serial::{SerialOptions, SerialTransport};
use roomba_oi::{BaudCode, OiError, PacketId, ProtocolEngine};
use tracing_subscriber::EnvFilter;

const STREAM_FRAMES: usize = 20;

const PROBED: [PacketId; 6] = [
    PacketId::OiMode,
    PacketId::ChargingState,
    PacketId::Voltage,
    PacketId::Current,
    PacketId::Temperature,
    PacketId::BatteryCharge,
];

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let Some(port) = args.next() else {
        print_usage();
        return Ok(());
    };
    let baud = match args.next() {
        Some(code) => BaudCode::try_from(code.parse::<u8>()?).map_err(OiError::from)?,
        None => BaudCode::default(),
    };

    let options = SerialOptions {
        baud,
        ..Default::default()
    };
    let engine = ProtocolEngine::with_baud(SerialTransport::open_with(&port, options)?, baud);
    engine.start()?;

    query_once(&engine)?;
    stream(&engine)?;
    Ok(())
}

fn query_once<T: Read + Write>(engine: &ProtocolEngine<T>) -> Result<(), Box<dyn Error>> {
    let ids: Vec<u8> = PROBED.iter().map(|id| id.raw()).collect();
    engine.query_list(&ids)?;
    thread::sleep(engine.telemetry().time_until_ready());
    engine.read_query_response()?;

    let telemetry = engine.telemetry().snapshot();
    for id in PROBED {
        println!("{id:>32}: {}", telemetry.sensor_value(id)?);
    }
    Ok(())
}

fn stream<T: Read + Write>(engine: &ProtocolEngine<T>) -> Result<(), Box<dyn Error>> {
    engine.stream(&[PacketId::Packets7To16.raw(), PacketId::Distance.raw(), PacketId::Angle.raw()])?;

    let mut distance = 0;
    let mut angle = 0;
    for _ in 0..STREAM_FRAMES {
        match engine.read_stream_frame() {
            Ok(_) => {}
            Err(err) if err.requires_resync() || err.is_retryable() => {
                eprintln!("skipping frame: {err}");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
        let telemetry = engine.telemetry();
        distance += telemetry.sensor_value(PacketId::Distance)?;
        angle += telemetry.sensor_value(PacketId::Angle)?;
        println!(
            "bumps/drops: {:#04x}  distance: {distance} mm  angle: {angle} deg",
            telemetry.sensor_value(PacketId::BumpsAndWheelDrops)?
        );
    }

    engine.pause_resume_stream(false)?;
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run --example sensor_probe -- <port> [baud-code]");
    eprintln!();
    eprintln!("Baud codes run from 0 (300 bps) to 11 (115200 bps, default).");
}
