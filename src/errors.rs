use std::{error, fmt, io};

/// Errors surfaced across component boundaries.
///
/// Every fallible operation in the crate reports one of these variants with a
/// human-readable message; callers inspect the variant to pick an exit code.
pub enum Error {
    /// The project or parameter source is unreadable or malformed.
    Config(String),
    /// A unit path does not match anything in the catalog.
    NotFound(String),
    /// The engine or the result sink could not establish its preconditions.
    Init(String),
    /// A second run was started while one is in flight.
    AlreadyRunning,
    /// The remote result service is unreachable or rejected a record.
    Upload(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Init(msg) => write!(f, "init error: {}", msg),
            Error::AlreadyRunning => write!(f, "a run is already in progress"),
            Error::Upload(msg) => write!(f, "upload error: {}", msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Config(err.to_string())
    }
}
