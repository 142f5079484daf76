//! Concurrent resumable HTTP downloader.
//!
//! A [`ResumableFetcher`] transfers one byte range into one local file,
//! resuming from the current on-disk size and retrying transient failures
//! under an injected [`RetryPolicy`]. A [`Coordinator`] fans many such jobs
//! out across a semaphore-bounded worker pool and publishes per-file
//! progress through a [`ProgressSink`].

pub mod commands;
pub mod coordinator;
pub mod fetcher;
pub mod job;
pub mod progress;
pub mod retry;
pub mod utils;

pub use coordinator::{Coordinator, DEFAULT_MAX_IN_FLIGHT};
pub use fetcher::{FetchError, ResumableFetcher, CHUNK_SIZE};
pub use job::{DownloadJob, JobOutcome, JobReport};
pub use progress::{MultiProgressSink, ProgressSink, TaskId};
pub use retry::{RetryDecision, RetryPolicy};
