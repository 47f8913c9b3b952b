//! The execution backend boundary: how a single test case's logic runs.
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::{process::Command, time};

use crate::catalog::CaseRef;
use crate::errors::Error;
use crate::params::ParameterSet;
use crate::results::Verdict;

/// What the backend reports for one executed case. The engine stamps the
/// timing and the path around this to build a full outcome.
#[derive(Debug)]
pub struct CaseReport {
    pub verdict: Verdict,
    pub detail: Option<String>,
}

/// Executes the logic of a single test case against the unit under test.
///
/// The call is opaque to the engine and may run for a long time. It never
/// fails hard: anything that prevents a verdict comes back as
/// [`Verdict::Error`] with a diagnostic.
#[async_trait]
pub trait CaseBackend: Send + Sync {
    async fn run_case(
        &self,
        case: &CaseRef,
        params: &ParameterSet,
    ) -> CaseReport;
}

/// Runs case commands through `sh -c`, rooted at the project directory.
/// Exit code 0 is a pass, any other exit code is a fail, and a spawn
/// failure or timeout is an error.
pub struct ShellBackend {
    project_dir: PathBuf,
}

impl ShellBackend {
    /// Bind to the directory containing the project. A missing directory
    /// is reported, not retried.
    pub fn init(project_dir: &Path) -> Result<Self, Error> {
        if !project_dir.is_dir() {
            return Err(Error::Init(format!(
                "project directory {} does not exist",
                project_dir.display()
            )));
        }
        Ok(ShellBackend {
            project_dir: project_dir.to_path_buf(),
        })
    }

    /// Replace `{name}` patterns in the command. Case-local parameters are
    /// applied before the public set, so a case can pin its own value for
    /// a shared name.
    fn substitute(case: &CaseRef, params: &ParameterSet) -> String {
        let mut cmd = case.cmd.clone();
        let case_params =
            case.params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        for (key, value) in case_params.chain(params.iter()) {
            cmd = cmd.replace(&format!("{{{}}}", key), value);
        }
        cmd
    }
}

#[async_trait]
impl CaseBackend for ShellBackend {
    async fn run_case(
        &self,
        case: &CaseRef,
        params: &ParameterSet,
    ) -> CaseReport {
        let concrete = Self::substitute(case, params);
        debug!("{}: running `{}`", case.path, concrete);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&concrete)
            .current_dir(&self.project_dir);
        cmd.kill_on_drop(true);

        match time::timeout(case.timeout, cmd.output()).await {
            Err(_) => CaseReport {
                verdict: Verdict::Error,
                detail: Some(format!(
                    "timed out after {} seconds",
                    case.timeout.as_secs()
                )),
            },
            Ok(Err(err)) => CaseReport {
                verdict: Verdict::Error,
                detail: Some(format!("failed to run `{}`: {}", concrete, err)),
            },
            Ok(Ok(out)) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let detail = if stderr.trim().is_empty() {
                    None
                } else {
                    Some(stderr.trim().to_string())
                };
                let verdict = if out.status.success() {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                };
                CaseReport { verdict, detail }
            }
        }
    }
}
