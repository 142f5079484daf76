//! Resumable single-file fetcher.
//!
//! Transfers bytes `[start, end_byte]` of one remote resource into one local
//! file, where `start` is always the current on-disk size of the output file.
//! The partial file itself is the resume checkpoint: every retry re-reads the
//! file size and asks the server only for what is still missing, so no byte
//! is ever duplicated or dropped across attempt boundaries.

use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::job::DownloadJob;
use crate::progress::{ProgressSink, TaskId};
use crate::retry::{RetryDecision, RetryPolicy};

/// Writes (and therefore progress updates) happen in slices of at most this
/// many bytes, regardless of how the network delivers the body.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Classified fetch failure. Transient variants are candidates for retry;
/// everything else aborts the job immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("retryable HTTP status {0}")]
    RetryableStatus(StatusCode),

    #[error("HTTP status {0}")]
    Status(StatusCode),

    /// Server answered a resume request with a full body instead of 206.
    /// Appending it to the partial file would corrupt it, so this is fatal.
    #[error("server for {url} ignored the range request; cannot resume")]
    RangeNotHonored { url: String },

    /// Stream ended cleanly before the requested range was fully delivered.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },

    #[error("storage failure at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },
}

impl FetchError {
    fn storage(path: &Path, source: io::Error) -> Self {
        FetchError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the retry policy gets a say before this error is surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_)
                | FetchError::RetryableStatus(_)
                | FetchError::PartialTransfer { .. }
        )
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), FetchError> {
    let invalid = || FetchError::InvalidHeader {
        name: name.to_string(),
    };
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name, value))
}

/// Downloads one job with resume and retry. Cheap to clone; the inner
/// `reqwest::Client` shares its connection pool across clones.
#[derive(Clone)]
pub struct ResumableFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl ResumableFetcher {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Run attempts until the file is complete, the retry policy gives up,
    /// or a fatal error occurs. Retries are silent at default log level.
    pub async fn fetch(
        &self,
        job: &DownloadJob,
        sink: &dyn ProgressSink,
        task: TaskId,
    ) -> Result<(), FetchError> {
        let mut attempt = 1u32;
        loop {
            match self.attempt(job, sink, task).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => match self.retry.decide(attempt) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(delay) => {
                        tracing::debug!(url = %job.url, attempt, error = %e, "transient failure, retrying");
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        job: &DownloadJob,
        sink: &dyn ProgressSink,
        task: TaskId,
    ) -> Result<(), FetchError> {
        let path = &job.output_path;

        // The on-disk size is the resume point.
        let start_byte = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                return Err(FetchError::storage(
                    path,
                    io::Error::other("output path is not a regular file"),
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(FetchError::storage(path, e)),
        };

        let total = job.total_bytes();
        if start_byte >= total {
            sink.set_completed(task, total);
            return Ok(());
        }

        // Caller headers first, range last, so the range always wins.
        let mut headers = HeaderMap::new();
        for (name, value) in &job.headers {
            let (name, value) = header_pair(name, value)?;
            headers.insert(name, value);
        }
        let range = format!("bytes={}-{}", start_byte, job.end_byte);
        let (_, range) = header_pair("range", &range)?;
        headers.insert(header::RANGE, range);

        let response = self
            .client
            .get(&job.url)
            .headers(headers)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(if is_retryable_status(status) {
                FetchError::RetryableStatus(status)
            } else {
                FetchError::Status(status)
            });
        }
        if start_byte > 0 && status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::RangeNotHonored {
                url: job.url.clone(),
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FetchError::storage(parent, e))?;
            }
        }

        // Append mode: extends a pre-existing partial file, never truncates.
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| FetchError::storage(path, e))?;

        let mut downloaded = start_byte;
        let mut stream = response.bytes_stream();

        'stream: while let Some(next) = stream.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    // Tokio file writes land in a background task; await them
                    // before returning, or the next attempt's size probe can
                    // run ahead of the last chunk and re-fetch bytes the
                    // pending append will also write.
                    let _ = file.flush().await;
                    return Err(FetchError::Transport(e));
                }
            };
            for chunk in bytes.chunks(CHUNK_SIZE) {
                // Never write past the requested range, even if the server
                // over-delivers (e.g. ignores Range on a fresh download).
                let want = chunk.len().min((total - downloaded) as usize);
                if want == 0 {
                    break 'stream;
                }
                file.write_all(&chunk[..want])
                    .await
                    .map_err(|e| FetchError::storage(path, e))?;
                downloaded += want as u64;
                sink.set_completed(task, downloaded);
            }
        }
        file.flush()
            .await
            .map_err(|e| FetchError::storage(path, e))?;

        // A clean end-of-stream short of the range means the server closed
        // early; the next attempt resumes from the bytes written so far.
        if downloaded < total {
            return Err(FetchError::PartialTransfer {
                expected: total - start_byte,
                received: downloaded - start_byte,
            });
        }

        Ok(())
    }
}
