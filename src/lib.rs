//! Benchrun is a command-line test executor for manufacturing-floor test
//! plans.
//!
//! A plan is a three-level tree: a project contains test suites, and each
//! suite contains test cases that run against the unit under test (UUT).
//! Benchrun resolves a caller-specified selection of that tree, executes
//! the selected cases strictly in order, and persists the aggregated run
//! record for upload to a result server.
//!
//! ## Project files
//!
//! A project is described by a TOML file:
//! ```toml
//! name = "Mainboard"
//! # Optional endpoint for uploading finalized run records.
//! upload_url = "http://results.factory.local/api/runs"
//!
//! [[suites]]
//! name = "PowerOn"
//!
//! [[suites.cases]]
//! name = "Vcc"
//! cmd = "scripts/vcc.sh {limit}"
//! # (Optional) Timeout for this case in seconds.
//! timeout = 30
//! [suites.cases.params]
//! limit = "3.3"
//! ```
//! Every unit has a path of the form `/Project/Suite/Case`. A case command
//! is run through the shell with `{name}` patterns replaced by case-local
//! parameters first and public parameters second; exit code 0 is a pass.
//!
//! ## Selecting what to run
//!
//! A single path selects one case, or — when it names a suite or the
//! project — every descendant case in declaration order:
//! ```bash
//! benchrun plan.toml -t /Mainboard/PowerOn -u op7 -s st-3 -w line-a -b SN001
//! ```
//! A multi-item file selects an explicit list, one `/Project/Suite/Case`
//! path per line. The whole selection is rejected if any line fails to
//! resolve; a truncated plan never runs on the line:
//! ```bash
//! benchrun plan.toml -m picks.txt -u op7 -s st-3 -w line-a -b SN001
//! ```
//! `--list-item` prints every case path in declaration order and pushes
//! any pending run records to the result server.
//!
//! ## Execution
//!
//! Cases run one at a time, in order, never in parallel: a UUT sequence
//! has real-world ordering dependencies (power-on before measurement).
//! With `-S/--stop-on-failure` the run stops at the first non-passing
//! case. Ctrl-C aborts the run after the case currently executing; the
//! partial run record is still finalized and persisted.
//!
//! Finalized records land under `<results-dir>/pending/` as JSON and move
//! to `<results-dir>/sent/` once the result server acknowledges them.
//! Upload failures leave records pending for a later retry.
pub mod catalog;
pub mod cli;
pub mod errors;
pub mod executor;
pub mod params;
pub mod results;
