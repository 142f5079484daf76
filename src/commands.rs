//! Launcher plumbing: task-file and header parsing, client construction,
//! and the run summary. The core download logic lives in `coordinator` and
//! `fetcher`; nothing here touches the network directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::coordinator::Coordinator;
use crate::fetcher::ResumableFetcher;
use crate::job::{JobOutcome, JobReport};
use crate::progress::MultiProgressSink;
use crate::retry::RetryPolicy;

/// Parse the task file: one `url|end_byte` entry per line, blank lines and
/// `#` comments ignored. `end_byte` is the inclusive last byte offset.
pub async fn read_tasks(path: &Path) -> Result<Vec<(String, u64)>> {
    let file = fs::File::open(path)
        .await
        .with_context(|| format!("failed to open tasks file {:?}", path))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let mut tasks = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let (url, end) = raw
            .split_once('|')
            .with_context(|| format!("malformed task line (expected url|end_byte): {raw}"))?;
        let end_byte = end
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid end byte in task line: {raw}"))?;
        tasks.push((url.trim().to_string(), end_byte));
    }

    Ok(tasks)
}

/// Parse repeated `-H "Name: Value"` flags into a header map.
pub fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .with_context(|| format!("malformed header (expected \"Name: Value\"): {entry}"))?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}

pub async fn run_downloads(
    tasks_file: PathBuf,
    output_dir: PathBuf,
    concurrency: usize,
    headers: HashMap<String, String>,
) -> Result<()> {
    let requests = read_tasks(&tasks_file).await?;
    if requests.is_empty() {
        bail!("no download tasks found in {:?}", tasks_file);
    }

    let client = Client::builder()
        .user_agent(concat!("rangedl/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    // Never give up on flaky networks, but pause between attempts so a
    // persistently failing server is not hammered in a tight loop.
    let retry = RetryPolicy::unbounded().with_backoff(Duration::from_millis(500));
    let fetcher = ResumableFetcher::new(client, retry);
    let sink = Arc::new(MultiProgressSink::new());
    let coordinator = Coordinator::new(fetcher, output_dir, sink).max_in_flight(concurrency);

    let reports = coordinator.run(requests, &headers).await?;
    let (succeeded, skipped, failed) = tally(&reports);
    println!("Done: {succeeded} downloaded, {skipped} skipped, {failed} failed");
    if failed > 0 {
        bail!("{failed} download(s) failed");
    }
    Ok(())
}

fn tally(reports: &[JobReport]) -> (usize, usize, usize) {
    let mut succeeded = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for report in reports {
        match report.outcome {
            JobOutcome::Succeeded => succeeded += 1,
            JobOutcome::Skipped => skipped += 1,
            JobOutcome::Failed => failed += 1,
        }
    }
    (succeeded, skipped, failed)
}
