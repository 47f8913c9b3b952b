//! The public parameter set: a flat name→value table shared read-only by
//! every test case in a run.
use std::{collections::BTreeMap, path::Path};

use crate::errors::Error;

/// Parameters loaded once before a run and frozen afterwards. The engine
/// hands every case the same `&ParameterSet`, so each case observes
/// identical values regardless of execution order.
#[derive(Debug, Default)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    /// An empty set, for runs without a parameter file.
    pub fn empty() -> Self {
        ParameterSet::default()
    }

    /// Load parameters from a flat TOML table of string values.
    /// Duplicate names and non-string values are configuration errors.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let values: BTreeMap<String, String> = toml::from_str(&contents)
            .map_err(|err| {
                Error::Config(format!(
                    "failed to parse {}: {}",
                    path.display(),
                    err
                ))
            })?;
        Ok(ParameterSet { values })
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Result<&str, Error> {
        self.values
            .get(name)
            .map(|v| v.as_str())
            .ok_or_else(|| {
                Error::NotFound(format!("no public parameter named `{}`", name))
            })
    }

    /// Iterate over all name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
