//! Tests for the HTTP batch sink
//!
//! A minimal in-process TCP responder stands in for the collection server,
//! capturing request bodies and optionally failing the first N requests.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lumber_core::{BufferPool, Level, Record, Sink};
use parking_lot::Mutex;

use crate::http::{HttpSink, HttpSinkOptions};

struct StubServer {
    url: String,
    bodies: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl StubServer {
    /// Start a responder that fails the first `fail_first` requests with
    /// a 500 and accepts the rest.
    fn start(fail_first: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        listener.set_nonblocking(true).unwrap();

        let bodies: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let failures_left = AtomicUsize::new(fail_first);

        let handle = {
            let bodies = Arc::clone(&bodies);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((mut stream, _)) => {
                            stream.set_nonblocking(false).ok();
                            stream
                                .set_read_timeout(Some(Duration::from_secs(2)))
                                .ok();
                            if let Some(body) = read_request(&mut stream) {
                                let fail =
                                    failures_left.fetch_update(
                                        Ordering::Relaxed,
                                        Ordering::Relaxed,
                                        |n| n.checked_sub(1),
                                    );
                                if fail.is_ok() {
                                    respond(&mut stream, 500);
                                } else {
                                    bodies.lock().push(body);
                                    respond(&mut stream, 200);
                                }
                            }
                        }
                        Err(_) => std::thread::sleep(Duration::from_millis(5)),
                    }
                }
            })
        };

        Self {
            url,
            bodies,
            stop,
            handle: Some(handle),
        }
    }

    fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request(stream: &mut std::net::TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&chunk[..n]);
        if let Some(at) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break at + 4;
        }
    };

    let headers = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let content_length: usize = headers
        .lines()
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::to_string))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&data[header_end..]).into_owned())
}

fn respond(stream: &mut std::net::TcpStream, status: u16) {
    let reason = if status == 200 { "OK" } else { "Internal Server Error" };
    let _ = write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        status, reason
    );
    let _ = stream.flush();
}

fn make_record(pool: &Arc<BufferPool>, payload: &str) -> Record {
    let mut buf = pool.alloc();
    buf.append(payload.as_bytes());
    Record::new(Level::Warn, "src/net.rs", 9, 5, 1_700_000_000_000_000_000, buf)
}

fn sink_for(server: &StubServer, batch_size: usize, retries: u32) -> HttpSink {
    HttpSink::new(
        HttpSinkOptions::new(&server.url)
            .with_batch_size(batch_size)
            .with_max_retries(retries)
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

#[test]
fn test_empty_url_is_rejected() {
    assert!(HttpSink::new(HttpSinkOptions::new("")).is_err());
}

#[test]
fn test_batch_sends_when_threshold_reached() {
    let server = StubServer::start(0);
    let pool = BufferPool::new(8);
    let sink = sink_for(&server, 3, 0);

    sink.log(&make_record(&pool, "one"));
    sink.log(&make_record(&pool, "two"));
    assert_eq!(sink.pending_count(), 2);
    assert!(server.bodies().is_empty());

    sink.log(&make_record(&pool, "three"));
    assert_eq!(sink.pending_count(), 0);

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 1);
    let json: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    let logs = json["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["content"], "one");
    assert_eq!(logs[0]["level"], "WARN");
    assert_eq!(logs[0]["thread_id"], 5);
    assert_eq!(logs[0]["file"], "src/net.rs");
    assert_eq!(logs[0]["line"], 9);
    assert!(logs[0]["timestamp"].as_str().unwrap().len() >= 19);
}

#[test]
fn test_flush_sends_partial_batch() {
    let server = StubServer::start(0);
    let pool = BufferPool::new(4);
    let sink = sink_for(&server, 100, 0);

    sink.log(&make_record(&pool, "partial"));
    assert!(server.bodies().is_empty());
    sink.flush();

    assert_eq!(sink.pending_count(), 0);
    assert_eq!(server.bodies().len(), 1);
    assert_eq!(sink.snapshot().records_written, 1);
}

#[test]
fn test_retry_succeeds_after_transient_failure() {
    let server = StubServer::start(1);
    let pool = BufferPool::new(4);
    let sink = sink_for(&server, 1, 2);

    sink.log(&make_record(&pool, "retried"));
    assert_eq!(sink.pending_count(), 0);
    assert_eq!(server.bodies().len(), 1);
    assert!(sink.snapshot().write_errors >= 1);
}

#[test]
fn test_persistent_failure_keeps_pending_and_trims_overflow() {
    let server = StubServer::start(usize::MAX);
    let pool = BufferPool::new(16);
    let sink = sink_for(&server, 2, 0);

    // Every send fails; pending accumulates but is trimmed past
    // 2 x batch_size.
    for i in 0..10 {
        sink.log(&make_record(&pool, &format!("m{}", i)));
    }
    assert!(sink.pending_count() <= 4);
    assert!(sink.snapshot().write_errors > 0);
    assert_eq!(sink.snapshot().records_written, 0);
}

#[test]
fn test_log_batch_accumulates_once() {
    let server = StubServer::start(0);
    let pool = BufferPool::new(8);
    let sink = sink_for(&server, 4, 0);

    let records: Vec<_> = (0..4).map(|i| make_record(&pool, &format!("b{}", i))).collect();
    sink.log_batch(&records);

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 1);
    let json: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(json["logs"].as_array().unwrap().len(), 4);
}
