use clap::{value_parser, Arg, ArgAction, ArgMatches, Command, ValueEnum};
use log::{info, LevelFilter};
use simplelog::ConfigBuilder;
#[cfg(not(test))]
use simplelog::{ColorChoice, TermLogger, TerminalMode, WriteLogger};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use niblink::{MockBus, RealBus};

const IMAGE_DIR: &str = "IMAGE_DIR";
const BUS_PATH: &str = "bus";
const BUS_REGISTER: &str = "bus-register";
const DRY_RUN: &str = "dry-run";
const LOG_PATH: &str = "log";
const LOG_LEVEL: &str = "log-level";

const DIR_MSG: &str = "\
Niblink serves every .nib image found in one directory; point the\n\
positional argument at it (defaults to the current directory).";

/// Possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Info,
    Debug,
    Trace,
}

fn cli() -> Command {
    // Hack to make the build dirty when the toml changes.
    include_str!("../../Cargo.toml");

    clap::command!()
        .after_help(
            "Niblink scans the image directory for .nib disk images and \
             starts an interactive console. Type `help` there for the \
             console commands; `load` streams an image to the machine at \
             full speed, `step` walks the bus one half-cycle per keypress \
             for debugging against a logic trace.",
        )
        .arg(
            Arg::new(IMAGE_DIR)
                .help("Directory holding .nib disk images (defaults to the current directory).")
                .action(ArgAction::Set)
                .default_value("."),
        )
        .arg(
            Arg::new(BUS_PATH)
                .help("Device file exposing the GPIO register block.")
                .short('b')
                .long("bus")
                .action(ArgAction::Set)
                .default_value("/dev/mem"),
        )
        .arg(
            Arg::new(BUS_REGISTER)
                .help(
                    "Byte offset of the GPIO output data register within the \
                     bus device. Accepts hex with an 0x prefix.",
                )
                .long("bus-register")
                .action(ArgAction::Set)
                .value_parser(parse_register)
                .default_value("0"),
        )
        .arg(
            Arg::new(DRY_RUN)
                .help("Do not touch hardware; bus writes are swallowed.")
                .long("dry-run")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(LOG_PATH)
                .help("If set, a debug log will be written to the given path.")
                .short('l')
                .long("log")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(LOG_LEVEL)
                .help("Set the log level. Case insensitive.")
                .short('L')
                .long("log-level")
                .action(ArgAction::Set)
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("info"),
        )
}

/// Parse a register offset, accepting hex with an 0x prefix.
fn parse_register(s: &str) -> Result<usize, String> {
    let result = match s.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    result.map_err(|e| format!("invalid register offset '{}': {}", s, e))
}

/// Ensure that the given path exists and is a directory.
fn check_image_dir(path: &Path) -> Result<(), String> {
    match fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_dir() {
                Err(format!("'{}' is not a directory.\n\n{}", path.display(), DIR_MSG))
            } else {
                Ok(())
            }
        }
        Err(e) => Err(format!(
            "Could not access '{}': {}\n\n{}",
            path.display(),
            e,
            DIR_MSG
        )),
    }
}

/// Initialise logging: to a file if one was given, otherwise to stderr so
/// the console output stays clean.
#[cfg(not(test))]
fn init_logging(level: LevelFilter, logfile: Option<File>) {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    match logfile {
        Some(f) => WriteLogger::init(level, config, f).unwrap(),
        None => TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).unwrap(),
    }
}

/// Logging setup for testing build (properly captures output and ignores
/// multiple invocations).
#[cfg(test)]
fn init_logging(level: LevelFilter, _logfile: Option<File>) {
    let _ = simplelog::TestLogger::init(level, ConfigBuilder::new().build());
}

/// Main run function; returns an exit code.
fn run(args: ArgMatches) -> u8 {
    return match _run(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    fn _run(args: ArgMatches) -> Result<(), String> {
        let level = match args.get_one::<LogLevel>(LOG_LEVEL).unwrap() {
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        };
        let logfile = match args.get_one::<String>(LOG_PATH) {
            Some(path) => Some(
                File::create(path).map_err(|e| format!("Failed to create log file: {}", e))?,
            ),
            None => None,
        };
        init_logging(level, logfile);

        let image_dir = PathBuf::from(args.get_one::<String>(IMAGE_DIR).unwrap());
        check_image_dir(&image_dir)?;

        println!("Welcome to niblink.");
        println!("Scanning {} for disk images...", image_dir.display());

        let result = if args.get_flag(DRY_RUN) {
            info!("Dry run: bus writes will be swallowed.");
            niblink::run(&image_dir, MockBus::discard())
        } else {
            let bus_path = args.get_one::<String>(BUS_PATH).unwrap();
            let register = *args.get_one::<usize>(BUS_REGISTER).unwrap();
            let bus = RealBus::map(Path::new(bus_path), register).map_err(|e| {
                format!("Failed to map bus register from '{}': {}", bus_path, e)
            })?;
            niblink::run(&image_dir, bus)
        };
        result.map_err(|e| format!("Console error: {}", e))
    }
}

fn main() {
    let args = cli().get_matches();
    std::process::exit(run(args).into());
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! invoke {
        ($($args:expr),+) => {{
            let args = cli().try_get_matches_from(
                    vec!["niblink".to_string(), $($args.to_string()),*])
                .unwrap();
            run(args)
        }}
    }

    /// A missing image directory is rejected before anything else runs.
    #[test]
    fn test_missing_image_dir_fails() {
        let tempdir = tempfile::tempdir().unwrap();
        let absent = tempdir.path().join("absent");
        let ret = invoke!("--dry-run", absent.to_str().unwrap());
        assert_eq!(ret, 1);
    }

    /// A file in place of the image directory is rejected too.
    #[test]
    fn test_file_as_image_dir_fails() {
        let tempdir = tempfile::tempdir().unwrap();
        let file = tempdir.path().join("plain");
        std::fs::File::create(&file).unwrap();
        let ret = invoke!("--dry-run", file.to_str().unwrap());
        assert_eq!(ret, 1);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let result = cli().try_get_matches_from(vec!["niblink", "--bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_register_offset_accepts_hex() {
        let args = cli()
            .try_get_matches_from(vec!["niblink", "--bus-register", "0x41200000"])
            .unwrap();
        assert_eq!(*args.get_one::<usize>(BUS_REGISTER).unwrap(), 0x4120_0000);

        let args = cli()
            .try_get_matches_from(vec!["niblink", "--bus-register", "68"])
            .unwrap();
        assert_eq!(*args.get_one::<usize>(BUS_REGISTER).unwrap(), 68);

        assert!(cli()
            .try_get_matches_from(vec!["niblink", "--bus-register", "0xfloppy"])
            .is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let args = cli()
            .try_get_matches_from(vec!["niblink", "-L", "DEBUG"])
            .unwrap();
        assert_eq!(*args.get_one::<LogLevel>(LOG_LEVEL).unwrap(), LogLevel::Debug);
    }
}
