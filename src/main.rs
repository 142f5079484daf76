use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rangedl::commands;
use rangedl::DEFAULT_MAX_IN_FLIGHT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the task file (one `url|end_byte` entry per line)
    #[arg(short = 't', long = "tasks-file", default_value = "download.txt")]
    tasks_file: PathBuf,

    /// Directory to save downloaded files
    #[arg(short = 'd', long = "download-dir", default_value = "downloads")]
    download_dir: PathBuf,

    /// Maximum number of downloads fetching concurrently
    #[arg(short = 'c', long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    concurrency: usize,

    /// Extra header applied to every request, as "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ANSI off so log lines compose with the progress bars on stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let headers = commands::parse_headers(&args.headers)?;
    commands::run_downloads(
        args.tasks_file,
        args.download_dir,
        args.concurrency,
        headers,
    )
    .await
}
