//! Test doubles for driving rounds in virtual time, plus a loopback HTTP
//! stub standing in for the Spotify endpoints.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::PlaybackError;
use crate::library::Track;
use crate::playback::{Ack, PlaybackController};
use crate::round::{Key, KeySource, RoundSnapshot, RoundView, TimeSource};

/// Virtual clock: `sleep` advances time instantly.
#[derive(Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<Duration>>,
}

impl ManualTime {
    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Keys that become available at fixed virtual times.
pub struct ScriptedKeys {
    time: ManualTime,
    script: VecDeque<(Duration, Key)>,
}

impl ScriptedKeys {
    pub fn new(time: &ManualTime, script: Vec<(u64, Key)>) -> Self {
        Self {
            time: time.clone(),
            script: script
                .into_iter()
                .map(|(ms, k)| (Duration::from_millis(ms), k))
                .collect(),
        }
    }

    /// Typed characters, each pressed at the paired millisecond offset.
    pub fn chars(time: &ManualTime, script: &[(u64, char)]) -> Self {
        Self::new(
            time,
            script.iter().map(|&(ms, c)| (ms, Key::Char(c))).collect(),
        )
    }

    pub fn silent(time: &ManualTime) -> Self {
        Self::new(time, Vec::new())
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self) -> io::Result<Option<Key>> {
        match self.script.front() {
            Some(&(at, key)) if at <= self.time.now() => {
                self.script.pop_front();
                Ok(Some(key))
            }
            _ => Ok(None),
        }
    }
}

/// Playback controller that records calls and can be told to fail or lag.
#[derive(Default)]
pub struct FakePlayback {
    pub starts: Vec<(String, u64)>,
    pub pauses: usize,
    pub fail_start: bool,
    pub fail_pause: bool,
    /// Starts that report a too-short snippet window before one succeeds.
    pub window_misses: usize,
    /// Positions of the starts that missed their window.
    pub missed: Vec<u64>,
    /// Simulated start latency, applied to `time` when set.
    pub latency: Duration,
    pub time: Option<ManualTime>,
}

impl FakePlayback {
    pub fn with_latency(time: &ManualTime, latency: Duration) -> Self {
        Self {
            latency,
            time: Some(time.clone()),
            ..Self::default()
        }
    }
}

impl PlaybackController for FakePlayback {
    fn start(&mut self, track_uri: &str, position_ms: u64) -> Result<Ack, PlaybackError> {
        if let Some(t) = &self.time {
            t.advance(self.latency);
        }
        if self.fail_start {
            return Err(PlaybackError::NoDevice);
        }
        if self.window_misses > 0 {
            self.window_misses -= 1;
            self.missed.push(position_ms);
            return Err(PlaybackError::SnippetWindow {
                uri: track_uri.to_string(),
            });
        }
        self.starts.push((track_uri.to_string(), position_ms));
        Ok(Ack)
    }

    fn pause(&mut self) -> Result<Ack, PlaybackError> {
        self.pauses += 1;
        if self.fail_pause {
            return Err(PlaybackError::Disconnected);
        }
        Ok(Ack)
    }
}

/// Keeps the remaining time and score of every rendered frame.
#[derive(Default)]
pub struct RecordingView {
    pub frames: Vec<(Duration, u32)>,
}

impl RoundView for RecordingView {
    fn render(&mut self, snapshot: &RoundSnapshot<'_>) {
        self.frames.push((snapshot.remaining, snapshot.score));
    }
}

pub fn track(uri: &str) -> Track {
    Track {
        uri: uri.to_string(),
        name: format!("Song {uri}"),
        artists: vec![format!("Artist {uri}")],
        duration_ms: 180_000,
    }
}

pub fn library(uris: &[&str]) -> Vec<Track> {
    uris.iter().map(|u| track(u)).collect()
}

/// One request as seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl StubRequest {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

/// Minimal HTTP/1.1 server on 127.0.0.1. Every connection carries one
/// request; `respond` picks the status and JSON body.
pub struct StubServer {
    pub base: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    pub fn start(respond: impl Fn(&StubRequest) -> (u16, String) + Send + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let Some(request) = read_request(&stream) else {
                    continue;
                };
                let (status, body) = respond(&request);
                log.lock().unwrap().push(request);
                let body = if status == 204 { String::new() } else { body };
                let response = format!(
                    "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = (&stream).write_all(response.as_bytes());
            }
        });

        Self { base, requests }
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests().iter().filter(|r| r.is(method, path)).count()
    }
}

fn read_request(stream: &TcpStream) -> Option<StubRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut content_length = 0;
    let mut authorization = None;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok()?;
            } else if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).ok()?;

    Some(StubRequest {
        method,
        path: path.to_string(),
        query: query.to_string(),
        authorization,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
