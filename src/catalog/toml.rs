//! The on-disk project file format. A project is described by a TOML file
//! that declares the test suites and their test cases in execution order.
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

use crate::errors::Error;

/// Top-level contents of a project file.
#[derive(Debug, Deserialize)]
pub struct ProjectFile {
    /// Name of the project. Forms the first segment of every unit path.
    pub name: String,
    /// Endpoint that finalized run records are uploaded to.
    pub upload_url: Option<String>,
    /// Test suites in declaration order.
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

/// Configuration for a test suite.
#[derive(Debug, Deserialize)]
pub struct SuiteConfig {
    /// Name of this suite, unique within the project.
    pub name: String,
    /// Test cases in declaration order.
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

/// Configuration for a single test case.
#[derive(Debug, Deserialize)]
pub struct CaseConfig {
    /// Name of this case, unique within the suite.
    pub name: String,
    /// Command to execute. `{key}` patterns are replaced with parameter
    /// values before the command runs.
    pub cmd: String,
    /// Optional timeout for this case in seconds.
    pub timeout: Option<u64>,
    /// Case-local execution parameters. These take precedence over the
    /// public parameter set during substitution.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ProjectFile {
    /// Read and parse a project file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        toml::from_str(&contents).map_err(|err| {
            Error::Config(format!("failed to parse {}: {}", path.display(), err))
        })
    }
}
