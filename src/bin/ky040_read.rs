//! ky040-read
//!
//! Reads a rotary encoder on a Linux GPIO chip and prints a running count:
//! +1 per clockwise detent, -1 per counter-clockwise detent. Ctrl+C stops.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record};
use tokio::signal;

use ky040::config::parse_log_level;
use ky040::{
    action_channel, cancellation, ActionStream, EncoderConfig, EncoderMonitor, GpioChip, LogObserver,
};

/// Command line, before merging with an optional config file.
#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    chip: Option<String>,
    clock: Option<u32>,
    data: Option<u32>,
    logging: Option<String>,
}

fn print_usage() {
    println!("ky040-read - rotary encoder reader");
    println!();
    println!("USAGE:");
    println!("    ky040-read --clock <PIN> --data <PIN> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("        --chip <NAME>        GPIO chip name or path [default: gpiochip0]");
    println!("        --clock <PIN>        Line number of the encoder clock pin");
    println!("        --data <PIN>         Line number of the encoder data pin");
    println!("        --logging <LEVEL>    Log level: off, error, warn, info, debug, trace");
    println!("    -c, --config <FILE>      JSON configuration file; flags override it");
    println!("    -h, --help               Print help information");
}

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    if let Some(v) = args.get(i + 1) {
        v.clone()
    } else {
        eprintln!("error: {flag} requires a value");
        std::process::exit(1);
    }
}

fn pin_of(args: &[String], i: usize, flag: &str) -> u32 {
    let raw = value_of(args, i, flag);
    raw.parse().unwrap_or_else(|_| {
        eprintln!("error: invalid pin number for {flag}: {raw}");
        std::process::exit(1);
    })
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--chip" | "--chipName" => parsed.chip = Some(value_of(&args, i, "--chip")),
            "--clock" | "--rotaryEncoderClock" => parsed.clock = Some(pin_of(&args, i, "--clock")),
            "--data" | "--rotaryEncoderData" => parsed.data = Some(pin_of(&args, i, "--data")),
            "--logging" => parsed.logging = Some(value_of(&args, i, "--logging")),
            "--config" | "-c" => parsed.config = Some(PathBuf::from(value_of(&args, i, "--config"))),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
        i += 2;
    }

    parsed
}

fn load_config(args: Args) -> Result<EncoderConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => EncoderConfig::load(path)?,
        None => EncoderConfig::default(),
    };

    if let Some(chip) = args.chip {
        config.chip = chip;
    }
    if let Some(clock) = args.clock {
        config.clock_pin = clock;
    }
    if let Some(data) = args.data {
        config.data_pin = data;
    }
    if let Some(level) = args.logging {
        config.log_level = Some(level);
    }

    Ok(config)
}

/// Minimal stderr backend for the `log` facade.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr().lock(),
                "{:<5} {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger))?;
    log::set_max_level(level);
    Ok(())
}

/// Prints the running count; returns it once the stream closes.
fn count_actions(actions: &ActionStream) -> i64 {
    log::info!("starting actions handler");
    let mut count = 0i64;
    for action in actions.iter() {
        log::trace!("received action={action}");
        count += action.delta();
        println!("{count}");
    }
    log::info!("actions handler finished");
    count
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(parse_args())?;

    if config.clock_pin == 0 || config.data_pin == 0 {
        print_usage();
        std::process::exit(1);
    }
    config.validate()?;

    let level = match config.log_level.as_deref() {
        Some(level) => parse_log_level(level)?,
        None => LevelFilter::Info,
    };
    init_logging(level)?;

    let chip = GpioChip::new(&config.chip);
    log::info!("using gpio chip {}", chip.path().display());

    let monitor = EncoderMonitor::new(Arc::new(chip), config.monitor_config())
        .with_observer(Arc::new(LogObserver));

    let (canceller, cancel) = cancellation();
    let (tx, actions) = action_channel();

    let consumer = tokio::task::spawn_blocking(move || count_actions(&actions));
    let mut worker = tokio::task::spawn_blocking(move || monitor.run(&cancel, tx));

    log::info!("press Ctrl+C to stop");

    let outcome = tokio::select! {
        res = &mut worker => res,
        _ = signal::ctrl_c() => {
            log::info!("interrupt received, cancelling");
            canceller.cancel();
            worker.await
        }
    };

    // The consumer ends when the monitor drops its sender.
    let count = consumer.await?;
    log::info!("final count {count}");

    outcome??;
    Ok(())
}
