//! Minimal HTTP/1.1 server with Range GET support for integration tests.
//!
//! Serves one static body for every path, records each GET (requested range
//! and headers), tracks how many requests were in flight at once, and can be
//! configured to ignore ranges, answer 404, delay the body, or cut the first
//! N transfers short to exercise retry-and-resume.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Truncated responses deliver exactly this many body bytes before the
/// connection is closed.
pub const TRUNCATE_AT: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Cut the first N GET responses short after `TRUNCATE_AT` bytes.
    pub truncate_first: u32,
    /// Sleep this long before writing the body (holds the request in flight).
    pub body_delay: Duration,
    /// Answer every GET with 404.
    pub not_found: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            truncate_first: 0,
            body_delay: Duration::ZERO,
            not_found: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServedRequest {
    /// Parsed `Range: bytes=a-b` header, if the client sent one.
    pub range: Option<(u64, u64)>,
    /// All request headers, names lowercased.
    pub headers: Vec<(String, String)>,
}

impl ServedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Stats {
    requests: Mutex<Vec<ServedRequest>>,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

pub struct ServerHandle {
    base_url: String,
    stats: Arc<Stats>,
}

impl ServerHandle {
    /// URL for a named file; every path serves the same body.
    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }

    pub fn request_count(&self) -> usize {
        self.stats.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ServedRequest> {
        self.stats.requests.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> u32 {
        self.stats.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub fn start(body: Vec<u8>) -> ServerHandle {
    start_with_options(body, ServerOptions::default())
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> ServerHandle {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let stats = Arc::new(Stats::default());

    let accept_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let stats = Arc::clone(&accept_stats);
            thread::spawn(move || handle(stream, &body, opts, &stats));
        }
    });

    ServerHandle {
        base_url: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

fn handle(mut stream: TcpStream, body: &[u8], opts: ServerOptions, stats: &Stats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range, headers) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    let ordinal = {
        let mut requests = stats.requests.lock().unwrap();
        requests.push(ServedRequest { range, headers });
        requests.len() as u32 - 1
    };

    let now_in_flight = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
    respond(&mut stream, body, opts, range, ordinal);
    stats.in_flight.fetch_sub(1, Ordering::SeqCst);
}

fn respond(
    stream: &mut TcpStream,
    body: &[u8],
    opts: ServerOptions,
    range: Option<(u64, u64)>,
    ordinal: u32,
) {
    if opts.not_found {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        return;
    }

    let total = body.len() as u64;
    let (status, slice, content_range) = match range {
        Some((start, end_incl)) if opts.support_ranges => {
            let start = start.min(total) as usize;
            let end_excl = (end_incl.saturating_add(1)).min(total) as usize;
            if start >= end_excl {
                let head = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Length: 0\r\nContent-Range: bytes */{}\r\nConnection: close\r\n\r\n",
                    total
                );
                let _ = stream.write_all(head.as_bytes());
                return;
            }
            (
                "206 Partial Content",
                &body[start..end_excl],
                format!("bytes {}-{}/{}", start, end_excl - 1, total),
            )
        }
        _ => (
            "200 OK",
            body,
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
        ),
    };

    if !opts.body_delay.is_zero() {
        thread::sleep(opts.body_delay);
    }

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\nConnection: close\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(head.as_bytes());

    if ordinal < opts.truncate_first && slice.len() > TRUNCATE_AT {
        let _ = stream.write_all(&slice[..TRUNCATE_AT]);
        let _ = stream.flush();
        // Give the client time to consume the short body before the reset.
        thread::sleep(Duration::from_millis(50));
        let _ = stream.shutdown(Shutdown::Both);
        return;
    }

    let _ = stream.write_all(slice);
}

/// Returns (method, parsed Range bounds, all headers lowercased).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>, Vec<(String, String)>) {
    let mut method = "";
    let mut range = None;
    let mut headers = Vec::new();

    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "range" {
                if let Some(bounds) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = bounds.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
            headers.push((name, value));
        }
    }

    (method, range, headers)
}
