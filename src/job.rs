use std::collections::HashMap;
use std::path::PathBuf;

/// Immutable description of one download: where the bytes come from, where
/// they land, and the inclusive end offset of the wanted content.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    pub url: String,
    /// Offset of the last wanted byte, inclusive. `end_byte == 999` means a
    /// 1000-byte file.
    pub end_byte: u64,
    pub output_path: PathBuf,
    /// Extra headers applied to every request. The range header always wins
    /// over these.
    pub headers: HashMap<String, String>,
}

impl DownloadJob {
    /// Size in bytes of the fully downloaded file.
    pub fn total_bytes(&self) -> u64 {
        self.end_byte + 1
    }
}

/// Terminal state of a job after a coordinator run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The output file was already complete; no network work was done.
    Skipped,
    Succeeded,
    Failed,
}

/// Per-job result returned by the coordinator. Failures are reported here
/// (and logged) rather than raised as an aggregate error.
#[derive(Debug)]
pub struct JobReport {
    pub url: String,
    pub output_path: PathBuf,
    pub outcome: JobOutcome,
}
