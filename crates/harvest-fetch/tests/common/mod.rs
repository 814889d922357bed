//! Scripted in-memory HTTP server shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use harvest_fetch::{BoxStream, HttpClient, HttpResponse, RemoteMetadata};

#[derive(Debug)]
pub struct FakeError(pub String);

impl std::fmt::Display for FakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

impl std::error::Error for FakeError {}

pub struct FakeFile {
    pub data:              Vec<u8>,
    /// Answer ranged GETs with 206 and the slice.
    pub honors_ranges:     bool,
    /// Send `Accept-Ranges: bytes` on HEAD.
    pub advertises_ranges: bool,
}

type Latency = Box<dyn Fn(Option<u64>) -> Duration + Send + Sync>;

/// Serves registered files, counting requests and peak concurrency.
pub struct FakeServer {
    files:         HashMap<String, FakeFile>,
    failures:      Mutex<HashMap<(String, u64), u32>>,
    breaks:        Mutex<HashMap<String, (usize, u32)>>,
    latency:       Latency,
    in_flight:     AtomicUsize,
    max_in_flight: AtomicUsize,
    heads:         Mutex<Vec<String>>,
    gets:          Mutex<Vec<(String, Option<String>)>>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            files:         HashMap::new(),
            failures:      Mutex::new(HashMap::new()),
            breaks:        Mutex::new(HashMap::new()),
            latency:       Box::new(|_| Duration::ZERO),
            in_flight:     AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            heads:         Mutex::new(Vec::new()),
            gets:          Mutex::new(Vec::new()),
        }
    }
}

impl FakeServer {
    pub fn new() -> Self { Self::default() }

    /// A well-behaved file with range support.
    pub fn with_file(self, url: &str, data: Vec<u8>) -> Self {
        self.with(url, FakeFile {
            data,
            honors_ranges: true,
            advertises_ranges: true,
        })
    }

    pub fn with(mut self, url: &str, file: FakeFile) -> Self {
        self.files.insert(url.to_string(), file);
        self
    }

    /// Delay per request; the argument is the range start, if any.
    pub fn with_latency(mut self, latency: impl Fn(Option<u64>) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Box::new(latency);
        self
    }

    /// The next `times` requests for the range starting at `start` get a 503.
    pub fn fail(self, url: &str, start: u64, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert((url.to_string(), start), times);
        self
    }

    /// The next `times` GETs of `url` send `after` bytes of the body and then
    /// fail with a connection reset.
    pub fn break_body(self, url: &str, after: usize, times: u32) -> Self {
        self.breaks.lock().unwrap().insert(url.to_string(), (after, times));
        self
    }

    pub fn head_count(&self) -> usize { self.heads.lock().unwrap().len() }

    pub fn get_count(&self) -> usize { self.gets.lock().unwrap().len() }

    pub fn gets(&self) -> Vec<(String, Option<String>)> { self.gets.lock().unwrap().clone() }

    pub fn max_in_flight(&self) -> usize { self.max_in_flight.load(Ordering::SeqCst) }

    /// Range starts requested for `url`, in request order.
    pub fn requested_starts(&self, url: &str) -> Vec<u64> {
        self.gets()
            .into_iter()
            .filter(|(u, _)| u == url)
            .filter_map(|(_, range)| range.and_then(|r| parse_range(&r)).map(|(s, _)| s))
            .collect()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) { self.in_flight.fetch_sub(1, Ordering::SeqCst); }

    fn should_fail(&self, url: &str, start: u64) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&(url.to_string(), start)) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn break_after(&self, url: &str) -> Option<usize> {
        let mut breaks = self.breaks.lock().unwrap();
        match breaks.get_mut(url) {
            Some((after, left)) if *left > 0 => {
                *left -= 1;
                Some(*after)
            }
            _ => None,
        }
    }

    fn respond(&self, url: &str, range: Option<&str>) -> HttpResponse<FakeError> {
        let Some(file) = self.files.get(url) else {
            return response(404, None, Vec::new());
        };
        let parsed = range.and_then(parse_range);
        if let Some((start, _)) = parsed
            && self.should_fail(url, start)
        {
            return response(503, None, Vec::new());
        }
        let mut reply = match parsed {
            Some((start, last)) if file.honors_ranges => {
                let last = last.min(file.data.len() as u64 - 1);
                let slice = file.data[start as usize..=last as usize].to_vec();
                let content_range = format!("bytes {}-{}/{}", start, last, file.data.len());
                response(206, Some(content_range), slice)
            }
            _ => response(200, None, file.data.clone()),
        };
        if let Some(after) = self.break_after(url) {
            reply.body = broken_body(reply.body, after);
        }
        reply
    }
}

fn response(status: u16, content_range: Option<String>, body: Vec<u8>) -> HttpResponse<FakeError> {
    let pieces: Vec<Result<Bytes, FakeError>> = body
        .chunks(64 * 1024)
        .map(|p| Ok(Bytes::copy_from_slice(p)))
        .collect();
    let stream: BoxStream<'static, Result<Bytes, FakeError>> = Box::pin(futures_util::stream::iter(pieces));
    HttpResponse {
        status,
        content_range,
        body: stream,
    }
}

/// The first `after` bytes of `body`, then a transport error.
fn broken_body(
    body: BoxStream<'static, Result<Bytes, FakeError>>,
    after: usize,
) -> BoxStream<'static, Result<Bytes, FakeError>> {
    let mut left = after;
    let head = body.map(move |piece| {
        piece.map(|mut bytes| {
            bytes.truncate(left);
            left -= bytes.len();
            bytes
        })
    });
    let head = head.filter(|piece| futures_util::future::ready(!matches!(piece, Ok(b) if b.is_empty())));
    let tail = futures_util::stream::once(futures_util::future::ready(Err(FakeError("connection reset".into()))));
    Box::pin(head.chain(tail))
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, last) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, last.parse().ok()?))
}

impl HttpClient for FakeServer {
    type Error = FakeError;

    async fn head(&self, url: &str) -> Result<RemoteMetadata, Self::Error> {
        self.heads.lock().unwrap().push(url.to_string());
        Ok(match self.files.get(url) {
            Some(file) => RemoteMetadata {
                status:         200,
                content_length: Some(file.data.len() as u64),
                accepts_ranges: file.advertises_ranges,
            },
            None => RemoteMetadata {
                status:         404,
                content_length: None,
                accepts_ranges: false,
            },
        })
    }

    async fn get(&self, url: &str, range: Option<&str>) -> Result<HttpResponse<Self::Error>, Self::Error> {
        self.gets
            .lock()
            .unwrap()
            .push((url.to_string(), range.map(str::to_string)));
        self.enter();
        let delay = (self.latency)(range.and_then(parse_range).map(|(s, _)| s));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let response = self.respond(url, range);
        self.leave();
        Ok(response)
    }
}

/// Deterministic, non-repeating-looking test content.
pub fn pattern(len: usize) -> Vec<u8> { (0..len).map(|i| (i * 31 % 251) as u8).collect() }
