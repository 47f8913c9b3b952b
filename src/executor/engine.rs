//! The serial execution engine. One run moves through
//! `Idle → Running → {Completed, Failed, Aborted}`; the terminal state is
//! the [`RunStatus`] of the returned [`RunResult`].
use chrono::Local;
use log::info;

use super::backend::CaseBackend;
use super::controller::AbortHandle;
use crate::catalog::CaseRef;
use crate::params::ParameterSet;
use crate::results::{CaseOutcome, ResultSink};

/// Terminal state of one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunStatus {
    /// Every case in the selection was executed. This does not mean every
    /// case passed; the aggregate verdict lives in the run record.
    Completed,
    /// A case failed while stop-on-failure was set.
    Failed,
    /// The abort signal was observed between cases.
    Aborted,
}

/// Summary of one run.
#[derive(Debug)]
pub struct RunResult {
    pub status: RunStatus,
    /// Number of cases that were executed.
    pub executed: usize,
    /// Index of the last executed case, if any.
    pub last_index: Option<usize>,
}

/// Drives a selection through the backend, strictly in order and one case
/// at a time. A manufacturing test sequence has real-world ordering
/// dependencies, so cases are never reordered or run in parallel.
pub struct Engine<B: CaseBackend> {
    backend: B,
    params: ParameterSet,
}

impl<B: CaseBackend> Engine<B> {
    /// Build an engine over a backend and a frozen parameter set.
    pub fn new(backend: B, params: ParameterSet) -> Self {
        Engine { backend, params }
    }

    /// Execute every case of the selection in declared order, pushing one
    /// outcome per executed case into the sink. Stops early with
    /// [`RunStatus::Failed`] on a non-passing case when `stop_on_failure`
    /// is set, or with [`RunStatus::Aborted`] when the abort signal is
    /// observed after a case finishes.
    pub async fn run(
        &self,
        selection: &[CaseRef],
        stop_on_failure: bool,
        abort: &AbortHandle,
        sink: &mut ResultSink,
    ) -> RunResult {
        info!("starting run of {} test cases", selection.len());
        for (idx, case) in selection.iter().enumerate() {
            let started = Local::now();
            let report = self.backend.run_case(case, &self.params).await;
            let outcome = CaseOutcome {
                path: case.path.to_string(),
                started,
                ended: Local::now(),
                verdict: report.verdict,
                detail: report.detail,
            };
            println!("{}", outcome.report_str());
            let verdict = outcome.verdict;
            sink.record(outcome);

            if stop_on_failure && !verdict.passed() {
                info!("{} did not pass, stopping the run", case.path);
                return RunResult {
                    status: RunStatus::Failed,
                    executed: idx + 1,
                    last_index: Some(idx),
                };
            }
            if abort.is_aborted() {
                info!("abort observed after {}", case.path);
                return RunResult {
                    status: RunStatus::Aborted,
                    executed: idx + 1,
                    last_index: Some(idx),
                };
            }
        }
        RunResult {
            status: RunStatus::Completed,
            executed: selection.len(),
            last_index: selection.len().checked_sub(1),
        }
    }
}
