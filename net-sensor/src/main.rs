#![warn(clippy::all)]

use clap::{crate_version, Parser};
use tracing::{debug, info, warn, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use libsensor_detect::{DetectionConfig, Detector};
use libsensor_live::{format_device_list, list_devices, CaptureError, LiveCaptureEngine};
use libsensor_tools::{CaptureFileEngine, Config};

/// Passive network sensor
///
/// Watches IPv4 TCP and ICMP traffic on one interface and writes JSON alerts for
/// SYN scans, ICMP floods and connections to sensitive services.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture device number, starting at 1 (see --list-devices)
    device: Option<usize>,

    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Replay a pcap/pcap-ng file (optionally .gz, .xz or .lz4; "-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    read: Option<String>,

    /// Alert log file (appended)
    #[arg(short = 'o', long, value_name = "PATH")]
    alert_log: Option<String>,

    /// Do not write alerts to standard output
    #[arg(long)]
    no_stdout: bool,

    /// Disable reverse DNS lookups
    #[arg(long)]
    no_dns: bool,

    /// List capture devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn init_logging(config: &Config, verbose: bool) -> Result<(), Box<dyn Error>> {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::try_from_env("NET_SENSOR_LOG")
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).compact();
    match config.get("log_file") {
        Some(log_file) => {
            let path = Path::new(log_file);
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or("invalid log_file name")?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name)
                .build(dir)?;
            builder.with_writer(file_appender).with_ansi(false).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn open_input(input_filename: &str) -> Result<Box<dyn io::Read + Send>, io::Error> {
    if input_filename == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(Path::new(input_filename))?;
    let reader: Box<dyn io::Read + Send> = if input_filename.ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else if input_filename.ends_with(".xz") {
        Box::new(XzDecoder::new(file))
    } else if input_filename.ends_with(".lz4") {
        Box::new(lz4::Decoder::new(file)?)
    } else {
        Box::new(file)
    };
    Ok(reader)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if args.list_devices {
        let devices = list_devices()?;
        println!("Available devices:");
        print!("{}", format_device_list(&devices));
        return Ok(());
    }

    // load config
    let mut config = Config::default();
    if let Some(filename) = &args.config {
        load_config(&mut config, filename)?;
    }
    // override config options from command-line arguments
    if let Some(path) = &args.alert_log {
        config.set("output.alert_log", path.as_str());
    }
    if args.no_stdout {
        config.set("output.stdout", false);
    }
    if args.no_dns {
        config.set("dns.enabled", false);
    }

    init_logging(&config, args.verbose)?;
    info!("net-sensor {}", crate_version!());

    let detect_config = DetectionConfig::from_config(&config)?;
    debug!("{detect_config:?}");

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nSIGINT received, shutting down...");
        handler_stop.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl-C handler: {e}");
    }

    if let Some(input_filename) = &args.read {
        let mut input_reader = open_input(input_filename)?;
        let detector = Detector::from_config(&detect_config);
        let mut engine = CaptureFileEngine::new(detector, &config).with_stop_flag(stop.clone());
        info!("Replaying {input_filename}");
        engine.run(&mut input_reader)?;
    } else {
        let index = match args.device {
            Some(index) => index,
            None => {
                eprintln!("No device number specified, defaulting to 1.");
                1
            }
        };
        let detector = Detector::from_config(&detect_config);
        let mut engine = match LiveCaptureEngine::new(index, detector, &config) {
            Ok(engine) => engine,
            Err(e) => {
                if let CaptureError::DeviceNotFound { available, .. } = &e {
                    eprintln!("Error: device number {index} not found.");
                    eprintln!("Available devices:");
                    eprint!("{}", format_device_list(available));
                }
                return Err(e.into());
            }
        };
        eprintln!("Sniffing on device {}: {}", index, engine.device());
        engine.run(stop.clone())?;
    }

    if stop.load(Ordering::SeqCst) {
        eprintln!("Shutdown requested by user.");
    }
    info!("net-sensor: done, exiting");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("net-sensor: {e}");
            ExitCode::FAILURE
        }
    }
}
