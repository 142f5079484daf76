//! Fans many downloads out across a bounded worker pool.
//!
//! Jobs already satisfied on disk are skipped without touching the network.
//! Everything else is launched at once; a counting semaphore admits at most
//! `max_in_flight` jobs into their network phase at a time. One job failing
//! never cancels or blocks its siblings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Semaphore;

use crate::fetcher::ResumableFetcher;
use crate::job::{DownloadJob, JobOutcome, JobReport};
use crate::progress::ProgressSink;
use crate::utils::{filename_from_url, sanitize_filename};

/// How many jobs may run their network phase simultaneously.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

pub struct Coordinator {
    fetcher: ResumableFetcher,
    sink: Arc<dyn ProgressSink>,
    output_dir: PathBuf,
    max_in_flight: usize,
}

impl Coordinator {
    pub fn new(fetcher: ResumableFetcher, output_dir: PathBuf, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            fetcher,
            sink,
            output_dir,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit.max(1);
        self
    }

    /// Run every `(url, end_byte)` pair to a terminal state and report each
    /// one. Fetch failures are logged and recorded per job, never raised.
    pub async fn run(
        &self,
        requests: Vec<(String, u64)>,
        headers: &HashMap<String, String>,
    ) -> Result<Vec<JobReport>> {
        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("failed to create output directory {:?}", self.output_dir))?;

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut reports = Vec::with_capacity(requests.len());
        let mut handles = Vec::new();

        for (url, end_byte) in requests {
            // A bad URL fails its own job only; siblings still run.
            let filename = match filename_from_url(&url) {
                Ok(name) => sanitize_filename(&name),
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "invalid download URL");
                    reports.push(JobReport {
                        url,
                        output_path: PathBuf::new(),
                        outcome: JobOutcome::Failed,
                    });
                    continue;
                }
            };
            let output_path = self.output_dir.join(&filename);
            let total = end_byte + 1;

            if let Ok(meta) = fs::metadata(&output_path).await {
                if meta.is_file() && meta.len() == total {
                    tracing::info!(path = %output_path.display(), "already fully downloaded, skipping");
                    reports.push(JobReport {
                        url,
                        output_path,
                        outcome: JobOutcome::Skipped,
                    });
                    continue;
                }
            }

            let task = self.sink.register(&filename, total);
            let job = DownloadJob {
                url,
                end_byte,
                output_path,
                headers: headers.clone(),
            };

            let fetcher = self.fetcher.clone();
            let sink = self.sink.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                // Held for the whole network phase; dropped on every exit
                // path, including panics, so a permit can never leak.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("admission semaphore closed");

                let outcome = match fetcher.fetch(&job, sink.as_ref(), task).await {
                    Ok(()) => JobOutcome::Succeeded,
                    Err(e) => {
                        tracing::error!(url = %job.url, error = %e, "download failed");
                        JobOutcome::Failed
                    }
                };
                JobReport {
                    url: job.url,
                    output_path: job.output_path,
                    outcome,
                }
            }));
        }

        for handle in handles {
            reports.push(handle.await.context("download task panicked")?);
        }

        Ok(reports)
    }
}
