//! Execution of a resolved selection: the serial engine, the backend that
//! runs a single case's logic, and the controller that supervises a run.
pub mod backend;
pub mod controller;
pub mod engine;

pub use backend::{CaseBackend, CaseReport, ShellBackend};
pub use controller::{AbortHandle, Controller};
pub use engine::{Engine, RunResult, RunStatus};
