use std::error::Error;
use std::io::{Read, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use roomba_oi::constants::{LED_CHECK_ROBOT, RADIUS_TURN_COUNTER_CLOCKWISE};
use roomba_oi::{Note, ProtocolEngine};
#[cfg(feature = "serial")]
use roomba_oi::transport::serial::SerialTransport;
use tracing_subscriber::EnvFilter;

const SIDE_VELOCITY: i16 = 200;
const SIDE_TIME: Duration = Duration::from_millis(2_500);
const TURN_VELOCITY: i16 = 100;
// 90 degrees at 100 mm/s around the 235 mm wheelbase.
const TURN_TIME: Duration = Duration::from_millis(1_850);

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
    let Some(mode) = args.next() else {
        print_usage();
        return Ok(());
    };

    match mode.as_str() {
        "serial" => {
            #[cfg(feature = "serial")]
            {
                let Some(port) = args.next() else {
                    print_usage();
                    return Ok(());
                };
                let engine = ProtocolEngine::new(SerialTransport::open(&port)?);
                drive_square(&engine)
            }
            #[cfg(not(feature = "serial"))]
            {
                Err("built without `serial` feature".into())
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn drive_square<T: Read + Write>(engine: &ProtocolEngine<T>) -> Result<(), Box<dyn Error>> {
    engine.start()?;
    engine.safe()?;
    println!("Mode: {}", engine.mode());

    engine.leds(LED_CHECK_ROBOT, 0, 255)?;
    engine.digit_leds_ascii(['S', 'Q', 'R', ' '])?;

    for side in 1..=4 {
        println!("Side {side}");
        engine.drive(SIDE_VELOCITY, 0)?;
        thread::sleep(SIDE_TIME);
        engine.drive(TURN_VELOCITY, RADIUS_TURN_COUNTER_CLOCKWISE)?;
        thread::sleep(TURN_TIME);
    }
    engine.drive(0, 0)?;

    engine.song(0, &[Note::new(72, 16), Note::new(76, 16), Note::new(79, 32)])?;
    engine.play(0)?;

    engine.start()?;
    println!("Done, back in {} mode", engine.mode());
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run --example drive_square -- serial <port>");
    eprintln!();
    eprintln!("Drives a 50 cm square in safe mode. Lift the robot to abort.");
}
