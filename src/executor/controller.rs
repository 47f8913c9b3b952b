//! Run supervision: the re-entrancy guard around the engine and the
//! cross-context abort signal.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::backend::CaseBackend;
use super::engine::{Engine, RunResult};
use crate::catalog::CaseRef;
use crate::errors::Error;
use crate::results::ResultSink;

/// A cloneable handle that raises the abort signal for a run.
///
/// Raising the signal never blocks the caller; the engine polls the flag
/// between cases and finishes the current case before stopping.
#[derive(Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Ask the engine to stop after the case currently executing.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has been raised.
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Supervises engine runs: at most one run is active per controller, and
/// the abort handle it hands out is wired into that run.
#[derive(Default)]
pub struct Controller {
    abort: AbortHandle,
    running: Arc<AtomicBool>,
}

impl Controller {
    pub fn new() -> Self {
        Controller::default()
    }

    /// Handle for signaling the active (or next) run to abort.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run the engine over a selection and block until it reaches a
    /// terminal state. Rejected with [`Error::AlreadyRunning`] while
    /// another run started through this controller is still in flight.
    pub async fn start<B: CaseBackend>(
        &self,
        engine: &Engine<B>,
        selection: &[CaseRef],
        stop_on_failure: bool,
        sink: &mut ResultSink,
    ) -> Result<RunResult, Error> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        // The guard must survive cancellation: if the caller drops this
        // future mid-run, the flag still has to clear.
        let _guard = RunningGuard {
            running: Arc::clone(&self.running),
        };
        let result = engine
            .run(selection, stop_on_failure, &self.abort, sink)
            .await;
        Ok(result)
    }
}

struct RunningGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::backend::CaseReport;
    use crate::params::ParameterSet;
    use crate::results::Verdict;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct SlowBackend;

    #[async_trait]
    impl CaseBackend for SlowBackend {
        async fn run_case(
            &self,
            _case: &CaseRef,
            _params: &ParameterSet,
        ) -> CaseReport {
            tokio::time::sleep(Duration::from_millis(500)).await;
            CaseReport {
                verdict: Verdict::Pass,
                detail: None,
            }
        }
    }

    fn one_case() -> Vec<CaseRef> {
        vec![CaseRef {
            path: "/P/S/C".parse().unwrap(),
            cmd: String::new(),
            timeout: Duration::from_secs(1),
            params: BTreeMap::new(),
        }]
    }

    fn sink() -> (tempfile::TempDir, ResultSink) {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(tmp.path().to_path_buf(), None);
        sink.init("op", "st", "wl", "SN").unwrap();
        (tmp, sink)
    }

    #[test]
    fn abort_handle_is_observable_across_clones() {
        let handle = AbortHandle::default();
        let clone = handle.clone();
        assert!(!handle.is_aborted());
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let controller = Arc::new(Controller::new());
        let engine = Arc::new(Engine::new(SlowBackend, ParameterSet::empty()));

        let first = {
            let controller = Arc::clone(&controller);
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let (_tmp, mut sink) = sink();
                controller
                    .start(&engine, &one_case(), false, &mut sink)
                    .await
            })
        };
        // Give the first run time to take the guard.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (_tmp, mut other) = sink();
        assert!(matches!(
            controller.start(&engine, &one_case(), false, &mut other).await,
            Err(Error::AlreadyRunning)
        ));

        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropping_an_in_flight_start_releases_the_guard() {
        let controller = Controller::new();
        let engine = Engine::new(SlowBackend, ParameterSet::empty());

        {
            let (_tmp, mut sink) = sink();
            let cases = one_case();
            let run = controller.start(&engine, &cases, false, &mut sink);
            // Cancel the run mid-case by timing the future out and
            // dropping it.
            let cancelled =
                tokio::time::timeout(Duration::from_millis(50), run).await;
            assert!(cancelled.is_err());
        }

        let (_tmp, mut sink) = sink();
        assert!(controller
            .start(&engine, &[], false, &mut sink)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn controller_can_start_again_after_completion() {
        let controller = Controller::new();
        let engine = Engine::new(SlowBackend, ParameterSet::empty());

        let (_tmp, mut sink) = sink();
        controller
            .start(&engine, &[], false, &mut sink)
            .await
            .unwrap();
        controller
            .start(&engine, &[], false, &mut sink)
            .await
            .unwrap();
    }
}
