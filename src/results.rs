//! Result collection: per-case outcomes, the run record they aggregate
//! into, and the sink that persists finalized records and uploads history
//! to the remote result service.
use chrono::{DateTime, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Verdict of one executed test case.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The case ran and met its criteria.
    Pass,
    /// The case ran and did not meet its criteria.
    Fail,
    /// The case could not produce a verdict (crash, timeout, bad command).
    Error,
}

impl Verdict {
    /// Errors count against the run the same way failures do.
    pub fn passed(self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Outcome of a single executed case. Created exactly once by the engine
/// and owned by the sink afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// Full unit path of the case.
    pub path: String,
    /// Wall-clock start of execution.
    pub started: DateTime<Local>,
    /// Wall-clock end of execution.
    pub ended: DateTime<Local>,
    /// Verdict reported by the execution backend.
    pub verdict: Verdict,
    /// Diagnostic text from the backend, if any.
    pub detail: Option<String>,
}

impl CaseOutcome {
    /// Generate a colorized one-line report for this outcome.
    pub fn report_str(&self) -> String {
        use colored::*;
        match self.verdict {
            Verdict::Pass => {
                format!("{}{}", "✓ ".green(), self.path.green())
            }
            Verdict::Fail => format!("{}{}", "✗ ".red(), self.path.red()),
            Verdict::Error => format!(
                "{}{} {}",
                "✗ ".red(),
                self.path.red(),
                "(error)".dimmed()
            ),
        }
    }
}

/// The persisted result of one run: identity of the station and UUT, the
/// executed outcomes in order, and the aggregate status.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub user: String,
    pub station: String,
    pub workline: String,
    pub barcode: String,
    pub started: DateTime<Local>,
    pub ended: Option<DateTime<Local>>,
    pub outcomes: Vec<CaseOutcome>,
    /// `Some(true)` iff every outcome passed. `None` until finalized.
    pub passed: Option<bool>,
}

/// Accumulates outcomes into a run record, finalizes it exactly once, and
/// pushes previously finalized records to the remote service.
///
/// Records are persisted as JSON files under `<dir>/pending/` and moved to
/// `<dir>/sent/` once the remote service acknowledges them.
pub struct ResultSink {
    dir: PathBuf,
    upload_url: Option<String>,
    record: Option<RunRecord>,
    finalized: bool,
}

impl ResultSink {
    pub fn new(dir: PathBuf, upload_url: Option<String>) -> Self {
        ResultSink {
            dir,
            upload_url,
            record: None,
            finalized: false,
        }
    }

    /// Open a new run record. All four identity fields are required.
    pub fn init(
        &mut self,
        user: &str,
        station: &str,
        workline: &str,
        barcode: &str,
    ) -> Result<(), Error> {
        let fields = [
            ("user", user),
            ("station", station),
            ("workline", workline),
            ("barcode", barcode),
        ];
        for (name, value) in &fields {
            if value.trim().is_empty() {
                return Err(Error::Init(format!(
                    "missing required identity field `{}`",
                    name
                )));
            }
        }
        self.record = Some(RunRecord {
            user: user.to_string(),
            station: station.to_string(),
            workline: workline.to_string(),
            barcode: barcode.to_string(),
            started: Local::now(),
            ended: None,
            outcomes: Vec::new(),
            passed: None,
        });
        self.finalized = false;
        Ok(())
    }

    /// Append an outcome to the current record. Outcomes arriving without
    /// an open record are dropped with a warning rather than failing the
    /// run.
    pub fn record(&mut self, outcome: CaseOutcome) {
        match &mut self.record {
            Some(record) => record.outcomes.push(outcome),
            None => warn!(
                "dropping outcome for {}: no run record is open",
                outcome.path
            ),
        }
    }

    /// Close the current record, compute the aggregate status, and persist
    /// it under the pending directory. Calling this again after the first
    /// success is a no-op.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }
        let record = match &mut self.record {
            Some(record) => record,
            None => return Ok(()),
        };
        record.ended = Some(Local::now());
        record.passed =
            Some(record.outcomes.iter().all(|o| o.verdict.passed()));

        let pending = self.dir.join("pending");
        std::fs::create_dir_all(&pending)?;
        let name = format!(
            "{}-{}.json",
            record.started.format("%Y%m%d-%H%M%S%3f"),
            record.barcode
        );
        let path = pending.join(name);
        let contents = serde_json::to_string_pretty(record).map_err(|err| {
            Error::Config(format!("cannot serialize run record: {}", err))
        })?;
        std::fs::write(&path, contents)?;
        info!("run record persisted to {}", path.display());
        self.finalized = true;
        Ok(())
    }

    /// Upload every pending record to the remote result service. Records
    /// the service acknowledges move to the sent directory; the rest stay
    /// pending for a later retry. Having no upload endpoint configured is
    /// not an error.
    pub async fn upload_history(&self) -> Result<usize, Error> {
        let url = match &self.upload_url {
            Some(url) => url,
            None => return Ok(0),
        };
        let pending = self.dir.join("pending");
        if !pending.is_dir() {
            return Ok(0);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&pending)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort();

        let sent = self.dir.join("sent");
        std::fs::create_dir_all(&sent)?;
        let client = reqwest::Client::new();
        let mut uploaded = 0;
        for file in files {
            let body: serde_json::Value = serde_json::from_str(
                &std::fs::read_to_string(&file)?,
            )
            .map_err(|err| {
                Error::Upload(format!(
                    "corrupt pending record {}: {}",
                    file.display(),
                    err
                ))
            })?;
            let response = client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|err| Error::Upload(err.to_string()))?;
            if !response.status().is_success() {
                return Err(Error::Upload(format!(
                    "server rejected {}: {}",
                    file.display(),
                    response.status()
                )));
            }
            if let Some(name) = file.file_name() {
                std::fs::rename(&file, sent.join(name))?;
            }
            uploaded += 1;
        }
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn outcome(path: &str, verdict: Verdict) -> CaseOutcome {
        CaseOutcome {
            path: path.to_string(),
            started: Local::now(),
            ended: Local::now(),
            verdict,
            detail: None,
        }
    }

    fn pending_files(dir: &Path) -> Vec<PathBuf> {
        let pending = dir.join("pending");
        if !pending.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(pending)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn init_requires_identity_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(tmp.path().to_path_buf(), None);
        assert!(matches!(
            sink.init("op7", "", "line-a", "SN001"),
            Err(Error::Init(_))
        ));
        assert!(sink.init("op7", "st-3", "line-a", "SN001").is_ok());
    }

    #[test]
    fn finalize_computes_aggregate_status() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(tmp.path().to_path_buf(), None);
        sink.init("op7", "st-3", "line-a", "SN001").unwrap();
        sink.record(outcome("/P/S/C1", Verdict::Pass));
        sink.record(outcome("/P/S/C2", Verdict::Fail));
        sink.finalize().unwrap();

        let files = pending_files(tmp.path());
        assert_eq!(files.len(), 1);
        let record: RunRecord = serde_json::from_str(
            &std::fs::read_to_string(&files[0]).unwrap(),
        )
        .unwrap();
        assert_eq!(record.passed, Some(false));
        assert_eq!(record.outcomes.len(), 2);
        assert!(record.ended.is_some());
    }

    #[test]
    fn finalize_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(tmp.path().to_path_buf(), None);
        sink.init("op7", "st-3", "line-a", "SN001").unwrap();
        sink.record(outcome("/P/S/C1", Verdict::Pass));
        sink.finalize().unwrap();
        let first = pending_files(tmp.path());
        let contents = std::fs::read_to_string(&first[0]).unwrap();

        sink.finalize().unwrap();
        let second = pending_files(tmp.path());
        assert_eq!(first, second);
        assert_eq!(contents, std::fs::read_to_string(&second[0]).unwrap());
    }

    #[test]
    fn finalize_without_record_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(tmp.path().to_path_buf(), None);
        sink.finalize().unwrap();
        assert!(pending_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn upload_without_endpoint_does_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(tmp.path().to_path_buf(), None);
        assert_eq!(sink.upload_history().await.unwrap(), 0);
    }

    /// True once `buf` holds a complete HTTP request (headers plus the
    /// declared content-length worth of body).
    fn request_complete(buf: &[u8]) -> bool {
        let split = match buf.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(i) => i,
            None => return false,
        };
        let headers = String::from_utf8_lossy(&buf[..split]);
        let expected = headers
            .lines()
            .find_map(|line| {
                let mut parts = line.splitn(2, ':');
                let name = parts.next()?.trim().to_ascii_lowercase();
                if name == "content-length" {
                    parts.next()?.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        buf.len() - (split + 4) >= expected
    }

    #[tokio::test]
    async fn acknowledged_records_move_to_sent() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            loop {
                let mut chunk = [0u8; 1024];
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if n == 0 || request_complete(&buf) {
                    break;
                }
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      content-length: 0\r\n\
                      connection: close\r\n\r\n",
                )
                .await
                .unwrap();
        });

        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(
            tmp.path().to_path_buf(),
            Some(format!("http://{}/results", addr)),
        );
        sink.init("op7", "st-3", "line-a", "SN001").unwrap();
        sink.record(outcome("/P/S/C1", Verdict::Pass));
        sink.finalize().unwrap();

        assert_eq!(sink.upload_history().await.unwrap(), 1);
        server.await.unwrap();

        assert!(pending_files(tmp.path()).is_empty());
        let sent: Vec<_> = std::fs::read_dir(tmp.path().join("sent"))
            .unwrap()
            .collect();
        assert_eq!(sent.len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_keeps_records_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(
            tmp.path().to_path_buf(),
            // Nothing listens here; the request must fail.
            Some("http://127.0.0.1:9/results".to_string()),
        );
        sink.init("op7", "st-3", "line-a", "SN001").unwrap();
        sink.record(outcome("/P/S/C1", Verdict::Pass));
        sink.finalize().unwrap();

        assert!(matches!(
            sink.upload_history().await,
            Err(Error::Upload(_))
        ));
        assert_eq!(pending_files(tmp.path()).len(), 1);
    }
}
