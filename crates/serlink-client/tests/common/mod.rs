//! In-process device emulator for integration tests.
//!
//! Speaks the device's side of the protocol over one half of a
//! `UnixStream` pair: a byte-at-a-time receive state machine (which
//! stalls exactly like the hardware when a header over-declares its
//! payload length), an idle deadline that closes the connection absent
//! qualifying traffic, and framed JSON replies with a configurable
//! identifier behavior.

// Each integration test binary compiles this module; not all of them
// use every helper.
#![allow(dead_code)]

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serlink_client::{LivelinessMode, WATCHDOG_PING};
use serlink_frame::{crc16, encode_frame};

/// How the emulator fills the `id` field of its replies.
#[derive(Debug, Clone, Copy)]
pub enum ReplyBehavior {
    /// Echo the request's id.
    EchoId,
    /// Always reply with this id, regardless of the request.
    FixedId(i64),
    /// Reply without any id field.
    NoId,
    /// Never reply (liveliness/hang tests).
    Silent,
}

#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    pub mode: LivelinessMode,
    pub interval: Duration,
    pub reply: ReplyBehavior,
}

impl EmulatorConfig {
    pub fn new(mode: LivelinessMode, interval: Duration) -> Self {
        Self {
            mode,
            interval,
            reply: ReplyBehavior::Silent,
        }
    }

    pub fn replying(mut self, reply: ReplyBehavior) -> Self {
        self.reply = reply;
        self
    }
}

/// Spawn the emulator; returns the client-side stream. The connection
/// closes (EOF on the returned stream) when the idle deadline passes.
pub fn spawn(config: EmulatorConfig) -> (UnixStream, JoinHandle<()>) {
    let (client_side, device_side) = UnixStream::pair().expect("socketpair");
    let handle = std::thread::spawn(move || run_device(device_side, config));
    (client_side, handle)
}

fn run_device(mut stream: UnixStream, config: EmulatorConfig) {
    stream
        .set_read_timeout(Some(Duration::from_millis(5)))
        .expect("read timeout");

    let mut parser = Parser::new();
    let mut raw_tail: Vec<u8> = Vec::new();
    let mut deadline = Instant::now() + config.interval;
    let mut chunk = [0u8; 256];

    loop {
        if Instant::now() >= deadline {
            // Idle timeout: unilateral close, observed by the client as EOF.
            return;
        }

        let n = match stream.read(&mut chunk) {
            Ok(0) => return, // client closed
            Ok(n) => n,
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(_) => return,
        };

        if config.mode == LivelinessMode::Watchdog {
            raw_tail.extend_from_slice(&chunk[..n]);
            if contains(&raw_tail, WATCHDOG_PING) {
                deadline = Instant::now() + config.interval;
                raw_tail.clear();
            } else if raw_tail.len() > 4096 {
                let keep = raw_tail.len() - WATCHDOG_PING.len();
                raw_tail.drain(..keep);
            }
        }

        for &byte in &chunk[..n] {
            let Some(raw) = parser.push(byte) else {
                continue;
            };
            if crc16(&raw.payload) != raw.crc {
                continue; // protocol error: not a qualifying frame
            }
            if config.mode == LivelinessMode::Keepalive {
                deadline = Instant::now() + config.interval;
            }
            let Ok(request) = serde_json::from_slice::<serde_json::Value>(&raw.payload) else {
                continue;
            };
            if let Some(reply) = build_reply(&config.reply, &request) {
                let mut wire = BytesMut::new();
                encode_frame(&reply, &mut wire).expect("reply fits one frame");
                if stream.write_all(&wire).is_err() {
                    return;
                }
            }
        }
    }
}

fn build_reply(behavior: &ReplyBehavior, request: &serde_json::Value) -> Option<Vec<u8>> {
    let reply = match behavior {
        ReplyBehavior::Silent => return None,
        ReplyBehavior::EchoId => {
            serde_json::json!({ "id": request.get("id").cloned(), "result": "ok" })
        }
        ReplyBehavior::FixedId(id) => serde_json::json!({ "id": id, "result": "ok" }),
        ReplyBehavior::NoId => serde_json::json!({ "result": "ok" }),
    };
    Some(serde_json::to_vec(&reply).expect("reply serializes"))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub struct RawFrame {
    pub payload: Vec<u8>,
    pub crc: u16,
}

enum State {
    Idle,
    MaybeHeader,
    Length,
    Payload,
    Crc,
    Trailer,
}

/// The device's receive state machine, byte at a time.
///
/// In `Payload` it waits for exactly the declared byte count — a header
/// declaring more than will ever arrive stalls it here, unresponsive to
/// well-formed frames until the debt is paid. In `Trailer` it discards
/// bytes until a terminator appears.
pub struct Parser {
    state: State,
    field: Vec<u8>,
    payload_len: usize,
    payload: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            field: Vec::new(),
            payload_len: 0,
            payload: Vec::new(),
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<RawFrame> {
        match self.state {
            State::Idle => {
                if byte == 0xFF {
                    self.state = State::MaybeHeader;
                }
            }
            State::MaybeHeader => {
                if byte == 0xAA {
                    self.state = State::Length;
                    self.field.clear();
                    self.payload.clear();
                    self.payload_len = 0;
                } else {
                    self.state = State::Idle;
                }
            }
            State::Length => {
                self.field.push(byte);
                if self.field.len() == 2 {
                    self.payload_len = u16::from_le_bytes([self.field[0], self.field[1]]) as usize;
                    self.field.clear();
                    self.state = if self.payload_len == 0 {
                        State::Crc
                    } else {
                        State::Payload
                    };
                }
            }
            State::Payload => {
                self.payload.push(byte);
                if self.payload.len() == self.payload_len {
                    self.state = State::Crc;
                }
            }
            State::Crc => {
                self.field.push(byte);
                if self.field.len() == 2 {
                    self.state = State::Trailer;
                }
            }
            State::Trailer => {
                if byte == 0xFE {
                    self.state = State::Idle;
                    let crc = u16::from_le_bytes([self.field[0], self.field[1]]);
                    return Some(RawFrame {
                        payload: std::mem::take(&mut self.payload),
                        crc,
                    });
                }
                // Discard until a terminator shows up.
            }
        }
        None
    }
}
