//! The unit catalog: the Project → TestSuite → TestCase tree, textual unit
//! paths, and the resolution of paths into an ordered selection of cases.
pub mod toml;

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::Path,
    str,
    time::Duration,
};

use crate::errors::Error;
use self::toml::{CaseConfig, ProjectFile, SuiteConfig};

/// Default per-case timeout in seconds, used when a case does not set one.
const DEFAULT_TIMEOUT: u64 = 1200;

/// A slash-delimited path naming a project, a suite, or a case.
///
/// Paths are case-sensitive and have between one and three segments:
/// `/Project`, `/Project/Suite`, or `/Project/Suite/Case`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UnitPath {
    segments: Vec<String>,
}

impl UnitPath {
    /// The name segments of this path, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn from_names(names: &[&str]) -> Self {
        UnitPath {
            segments: names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl str::FromStr for UnitPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let segments: Vec<String> =
            body.split('/').map(|seg| seg.to_string()).collect();
        // An empty segment means a mistyped path; collapsing it could
        // resolve to a different unit than the one the caller meant.
        if segments.len() > 3 || segments.iter().any(|seg| seg.is_empty()) {
            return Err(Error::NotFound(format!(
                "`{}` is not a unit path. Expected /Project, /Project/Suite, \
                 or /Project/Suite/Case.",
                s
            )));
        }
        Ok(UnitPath { segments })
    }
}

impl fmt::Display for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A resolved reference to a single test case, carrying everything the
/// executor needs to run it.
#[derive(Clone, Debug)]
pub struct CaseRef {
    /// Full path of the case.
    pub path: UnitPath,
    /// Command to execute.
    pub cmd: String,
    /// Timeout for this case.
    pub timeout: Duration,
    /// Case-local parameters.
    pub params: BTreeMap<String, String>,
}

/// An ordered, deduplicated list of cases chosen for one run.
pub type Selection = Vec<CaseRef>;

/// The loaded unit tree. Read-only for the duration of a run; a reload
/// builds a fresh catalog rather than mutating this one.
pub struct Catalog {
    project: ProjectFile,
}

impl Catalog {
    /// Load a catalog from a project file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_project(ProjectFile::from_path(path)?)
    }

    /// Build a catalog from an already-parsed project, rejecting duplicate
    /// sibling names.
    pub fn from_project(project: ProjectFile) -> Result<Self, Error> {
        let mut suite_names = HashSet::new();
        for suite in &project.suites {
            if !suite_names.insert(&suite.name) {
                return Err(Error::Config(format!(
                    "duplicate test suite `{}` in project `{}`",
                    suite.name, project.name
                )));
            }
            let mut case_names = HashSet::new();
            for case in &suite.cases {
                if !case_names.insert(&case.name) {
                    return Err(Error::Config(format!(
                        "duplicate test case `{}` in suite `{}`",
                        case.name, suite.name
                    )));
                }
            }
        }
        Ok(Catalog { project })
    }

    /// Name of the loaded project.
    pub fn project_name(&self) -> &str {
        &self.project.name
    }

    /// Upload endpoint declared by the project, if any.
    pub fn upload_url(&self) -> Option<&str> {
        self.project.upload_url.as_deref()
    }

    /// Resolve a path into a selection. A case path yields that single case;
    /// a suite or project path expands to all descendant cases in
    /// declaration order.
    pub fn resolve_single(&self, path: &UnitPath) -> Result<Selection, Error> {
        let segs = path.segments();
        if segs[0] != self.project.name {
            return Err(Error::NotFound(format!(
                "no project named `{}` (loaded project is `{}`)",
                segs[0], self.project.name
            )));
        }
        match segs.len() {
            1 => Ok(self
                .project
                .suites
                .iter()
                .flat_map(|suite| self.expand_suite(suite))
                .collect()),
            2 => Ok(self.expand_suite(self.find_suite(path)?)),
            _ => {
                let suite = self.find_suite(path)?;
                let case = suite
                    .cases
                    .iter()
                    .find(|c| c.name == segs[2])
                    .ok_or_else(|| {
                        Error::NotFound(format!(
                            "no test case matches `{}`",
                            path
                        ))
                    })?;
                Ok(vec![self.case_ref(suite, case)])
            }
        }
    }

    /// Resolve a list of paths, each of which must name exactly one test
    /// case. The whole call fails if any entry fails to resolve; a partial
    /// selection is never produced. Duplicate entries keep their first
    /// position.
    pub fn resolve_multi(&self, paths: &[UnitPath]) -> Result<Selection, Error> {
        let mut seen = HashSet::new();
        let mut selection = Vec::with_capacity(paths.len());
        for path in paths {
            if path.segments().len() != 3 {
                return Err(Error::NotFound(format!(
                    "`{}` does not name a test case. Multi-item entries must \
                     be /Project/Suite/Case paths.",
                    path
                )));
            }
            let mut resolved = self.resolve_single(path)?;
            if let Some(case) = resolved.pop() {
                if seen.insert(case.path.clone()) {
                    selection.push(case);
                }
            }
        }
        Ok(selection)
    }

    /// Every test case path in declaration order.
    pub fn list(&self) -> Vec<UnitPath> {
        self.project
            .suites
            .iter()
            .flat_map(|suite| {
                let project = self.project.name.as_str();
                suite.cases.iter().map(move |case| {
                    UnitPath::from_names(&[project, &suite.name, &case.name])
                })
            })
            .collect()
    }

    fn find_suite(&self, path: &UnitPath) -> Result<&SuiteConfig, Error> {
        let name = &path.segments()[1];
        self.project
            .suites
            .iter()
            .find(|s| &s.name == name)
            .ok_or_else(|| {
                Error::NotFound(format!("no test suite matches `{}`", path))
            })
    }

    fn expand_suite(&self, suite: &SuiteConfig) -> Vec<CaseRef> {
        suite
            .cases
            .iter()
            .map(|case| self.case_ref(suite, case))
            .collect()
    }

    fn case_ref(&self, suite: &SuiteConfig, case: &CaseConfig) -> CaseRef {
        CaseRef {
            path: UnitPath::from_names(&[
                &self.project.name,
                &suite.name,
                &case.name,
            ]),
            cmd: case.cmd.clone(),
            timeout: Duration::from_secs(
                case.timeout.unwrap_or(DEFAULT_TIMEOUT),
            ),
            params: case.params.clone(),
        }
    }
}

/// Parse a multi-item file: one unit path per line, blank lines skipped.
/// Any line that is not a valid path fails the whole batch.
pub fn paths_from_file(path: &Path) -> Result<Vec<UnitPath>, Error> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("cannot read {}: {}", path.display(), err))
    })?;
    contents
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.parse())
        .collect()
}
