use crate::errors::Error;
use log::LevelFilter;
use std::path::PathBuf;
use structopt::StructOpt;

/// Options for the CLI.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "benchrun",
    about = "Command-line test executor for manufacturing test plans."
)]
pub struct Opts {
    /// Project file describing the test plan.
    #[structopt(name = "PROJECT", parse(from_os_str))]
    pub project: Option<PathBuf>,

    /// Start the test <item>: a /Project, /Project/Suite, or
    /// /Project/Suite/Case path.
    #[structopt(short = "t", long = "start-test", value_name = "item")]
    pub start_test: Option<String>,

    /// Start the items listed in <file>, one /Project/Suite/Case path per
    /// line.
    #[structopt(
        short = "m",
        long = "multi-items",
        value_name = "file",
        parse(from_os_str)
    )]
    pub multi_items: Option<PathBuf>,

    /// List the test items of the project.
    #[structopt(short = "l", long = "list-item")]
    pub list: bool,

    /// Public parameter <file> shared by every case in the run.
    #[structopt(
        short = "p",
        long = "parameters",
        value_name = "file",
        parse(from_os_str)
    )]
    pub parameters: Option<PathBuf>,

    /// Barcode of the UUT being tested.
    #[structopt(short = "b", long)]
    pub barcode: Option<String>,

    /// Operator running the test.
    #[structopt(short = "u", long)]
    pub user: Option<String>,

    /// Station identifier, unique within the factory.
    #[structopt(short = "s", long)]
    pub station: Option<String>,

    /// Work line identifier, unique within the factory.
    #[structopt(short = "w", long)]
    pub workline: Option<String>,

    /// Stop the run when a case does not pass.
    #[structopt(short = "S", long = "stop-on-failure")]
    pub stop_on_failure: bool,

    /// Directory where run records are persisted.
    #[structopt(
        long = "results-dir",
        value_name = "dir",
        parse(from_os_str),
        default_value = "results"
    )]
    pub results_dir: PathBuf,

    /// Logging level: off, error, warn, info, debug, or trace.
    #[structopt(short = "L", long = "log-level", default_value = "info")]
    pub log_level: LogLevel,

    /// File that logs are also written to.
    #[structopt(short = "O", long = "log-file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

/// Possible values for the --log-level flag.
#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(Error::Config(
                "must be one of off, error, warn, info, debug, trace."
                    .to_string(),
            )),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Process exit codes. Every failure mode has its own code; none are
/// overloaded.
pub mod exit {
    /// Successful run or listing.
    pub const OK: i32 = 0;
    /// No project file was given.
    pub const NO_PROJECT: i32 = 2;
    /// The project file failed to load or parse.
    pub const LOAD_UNITS: i32 = 3;
    /// The public parameter file failed to load.
    pub const LOAD_PARAMS: i32 = 4;
    /// The execution backend could not bind to the project.
    pub const INIT_RUNNER: i32 = 5;
    /// The result sink rejected the run identity.
    pub const INIT_RESULT: i32 = 6;
    /// The selection was empty or failed to resolve.
    pub const UNSELECTED: i32 = 7;
    /// The run stopped on a failure, aborted, or could not start.
    pub const RUNNING: i32 = 8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            exit::OK,
            exit::NO_PROJECT,
            exit::LOAD_UNITS,
            exit::LOAD_PARAMS,
            exit::INIT_RUNNER,
            exit::INIT_RESULT,
            exit::UNSELECTED,
            exit::RUNNING,
        ];
        let unique: HashSet<i32> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn parses_a_full_invocation() {
        let opts = Opts::from_iter_safe(vec![
            "benchrun",
            "plan.toml",
            "-t",
            "/P1/S1",
            "-S",
            "-u",
            "op7",
            "-s",
            "st-3",
            "-w",
            "line-a",
            "-b",
            "SN001",
        ])
        .unwrap();
        assert_eq!(opts.project, Some(PathBuf::from("plan.toml")));
        assert_eq!(opts.start_test.as_deref(), Some("/P1/S1"));
        assert!(opts.stop_on_failure);
        assert_eq!(opts.barcode.as_deref(), Some("SN001"));
    }

    #[test]
    fn log_level_parses_and_rejects() {
        assert!(matches!("debug".parse(), Ok(LogLevel::Debug)));
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
