use std::time::{Duration, Instant};

use serlink_frame::{Frame, FrameError, FrameReader, FrameWriter};
use serlink_transport::Link;

use crate::error::{ClientError, Result};
use crate::liveliness::{LivelinessMode, LivelinessWindow, WATCHDOG_PING};
use crate::rpc::{extract_id, PendingRequest, Reply, Request};

/// A client for one logical device connection.
///
/// Owns reader and writer halves of the link (duplicated handles over
/// the same connection) plus the current liveliness window. Strictly
/// sequential: one frame in flight per direction, blocking reads,
/// cancellation only by dropping the client (which closes the handles
/// and unblocks the peer).
pub struct DeviceClient<L> {
    reader: FrameReader<L>,
    writer: FrameWriter<L>,
    window: LivelinessWindow,
}

impl<L: Link> DeviceClient<L> {
    /// Take ownership of a freshly opened link, governed by `mode`.
    pub fn connect(link: L, mode: LivelinessMode) -> Result<Self> {
        Self::with_window(link, LivelinessWindow::new(mode))
    }

    /// Take ownership of a link with an explicit window.
    ///
    /// This is the reconnect path: the deadline is state held by the
    /// device, so a window carried over from a closed connection (via
    /// [`into_window`](Self::into_window)) stays accurate across a
    /// local close/reopen.
    pub fn with_window(link: L, window: LivelinessWindow) -> Result<Self> {
        let reader_half = link.try_clone()?;
        tracing::debug!(mode = ?window.mode(), "device client attached");
        Ok(Self {
            reader: FrameReader::new(reader_half),
            writer: FrameWriter::new(link),
            window,
        })
    }

    /// The liveliness window currently governing this connection.
    pub fn window(&self) -> &LivelinessWindow {
        &self.window
    }

    /// Close the connection, keeping the window for a reconnect.
    pub fn into_window(self) -> LivelinessWindow {
        self.window
    }

    /// Mutable access to the writer-half link, for recovery probing.
    pub fn link_mut(&mut self) -> &mut L {
        self.writer.get_mut()
    }

    /// Frame and send a payload. In keepalive mode this is a qualifying
    /// event and resets the window.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)?;
        if self.window.mode() == LivelinessMode::Keepalive {
            self.window = self.window.reset(Instant::now());
        }
        Ok(())
    }

    /// Write bytes unframed, classifying them against the window.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.send_raw(bytes)?;
        self.window = self.window.observe_write(bytes, Instant::now());
        Ok(())
    }

    /// Send the watchdog ping literal. In watchdog mode this resets the
    /// window; the keepalive variant ignores it.
    pub fn ping_watchdog(&mut self) -> Result<()> {
        self.send_raw(WATCHDOG_PING)
    }

    /// Read one frame (blocking). Inbound traffic never qualifies —
    /// both liveliness variants are defined by what the device receives.
    pub fn read_frame(&mut self) -> Result<Frame> {
        Ok(self.reader.read_frame()?)
    }

    /// Block until the peer closes the connection, discarding any
    /// intervening device output, and return the elapsed real time
    /// since the window's last reset — the measured quiet interval.
    pub fn wait_for_closure(&mut self) -> Result<Duration> {
        let mut scratch = [0u8; 64];
        loop {
            match self.reader.get_mut().read(&mut scratch) {
                Ok(0) => {
                    let measured = self.window.elapsed(Instant::now());
                    tracing::debug!(?measured, "peer closed connection");
                    return Ok(measured);
                }
                Ok(_) => continue,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err).into()),
            }
        }
    }

    /// Write one request frame and read exactly one reply frame,
    /// surfacing whatever identifier the device echoed.
    pub fn exchange(&mut self, request: &Request) -> Result<Reply> {
        let payload = request.to_payload()?;
        let pending = PendingRequest::new(request.id, Instant::now());
        self.send_frame(&payload)?;
        let frame = self.read_frame()?;
        let id = extract_id(&frame.payload);
        Ok(Reply {
            id,
            payload: frame.payload,
            round_trip: pending.elapsed(Instant::now()),
        })
    }

    /// [`exchange`](Self::exchange) plus the correlation check: the
    /// reply's `id` must echo the request's.
    pub fn call(&mut self, request: &Request) -> Result<Reply> {
        let reply = self.exchange(request)?;
        if reply.id != Some(request.id) {
            tracing::warn!(
                expected = request.id,
                actual = ?reply.id,
                "reply id does not echo request"
            );
            return Err(ClientError::CorrelationMismatch {
                expected: request.id,
                actual: reply.id,
            });
        }
        Ok(reply)
    }
}

impl<L> std::fmt::Debug for DeviceClient<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    use bytes::BytesMut;
    use serlink_frame::{decode_frame, encode_frame, FrameReader, MAX_PAYLOAD};

    use super::*;

    fn pair() -> (UnixStream, UnixStream) {
        UnixStream::pair().unwrap()
    }

    fn respond(peer: &UnixStream, payload: &[u8]) {
        let mut wire = BytesMut::new();
        encode_frame(payload, &mut wire).unwrap();
        (&mut &*peer).write_all(&wire).unwrap();
    }

    #[test]
    fn send_frame_reaches_peer_framed() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        client.send_frame(b"{\"id\":1,\"method\":\"status\"}").unwrap();

        let mut reader = FrameReader::new(peer);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"{\"id\":1,\"method\":\"status\"}");
    }

    #[test]
    fn keepalive_send_frame_resets_window() {
        let (local, _peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();
        let before = *client.window();

        std::thread::sleep(Duration::from_millis(20));
        client.send_frame(b"{}").unwrap();

        assert!(client.window().last_reset() > before.last_reset());
    }

    #[test]
    fn watchdog_ignores_frames_but_accepts_ping() {
        let (local, _peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Watchdog).unwrap();
        let opened = *client.window();

        client.send_frame(b"{}").unwrap();
        assert_eq!(client.window().last_reset(), opened.last_reset());

        client.ping_watchdog().unwrap();
        assert!(client.window().last_reset() > opened.last_reset());
    }

    #[test]
    fn raw_junk_never_qualifies() {
        let (local, _peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();
        let opened = *client.window();

        client.send_raw(b"arbitrary junk").unwrap();
        assert_eq!(client.window().last_reset(), opened.last_reset());
    }

    #[test]
    fn exchange_surfaces_echoed_id() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        respond(&peer, br#"{"id":100,"result":"ok"}"#);
        let reply = client.exchange(&Request::new(100, "status")).unwrap();
        assert_eq!(reply.id, Some(100));

        respond(&peer, br#"{"id":101,"result":"ok"}"#);
        let reply = client.exchange(&Request::new(100, "status")).unwrap();
        assert_eq!(reply.id, Some(101));
    }

    #[test]
    fn exchange_records_round_trip() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        let responder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            respond(&peer, br#"{"id":1,"result":"ok"}"#);
            peer
        });

        let reply = client.exchange(&Request::new(1, "status")).unwrap();
        let _peer = responder.join().unwrap();
        assert!(reply.round_trip >= Duration::from_millis(25));
        assert!(reply.round_trip < Duration::from_secs(2));
    }

    #[test]
    fn call_reports_mismatch() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        respond(&peer, br#"{"id":101,"result":"ok"}"#);
        let err = client.call(&Request::new(100, "status")).unwrap_err();
        assert!(matches!(
            err,
            ClientError::CorrelationMismatch {
                expected: 100,
                actual: Some(101)
            }
        ));
    }

    #[test]
    fn call_reports_absent_id() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        respond(&peer, br#"{"result":"ok"}"#);
        let err = client.call(&Request::new(100, "status")).unwrap_err();
        assert!(matches!(
            err,
            ClientError::CorrelationMismatch {
                expected: 100,
                actual: None
            }
        ));
    }

    #[test]
    fn call_succeeds_on_matching_id() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        respond(&peer, br#"{"id":100,"result":"ok"}"#);
        let reply = client.call(&Request::new(100, "status")).unwrap();
        assert_eq!(reply.json().unwrap()["result"], "ok");
    }

    #[test]
    fn closure_observed_as_connection_closed() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        drop(peer);
        let err = client.read_frame().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn wait_for_closure_measures_from_last_reset() {
        let (local, peer) = pair();
        let mut client = DeviceClient::connect(local, LivelinessMode::Keepalive).unwrap();

        // Non-frame device output must be discarded, not treated as an error.
        (&mut &peer).write_all(b"WE DID IT").unwrap();

        let closer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            drop(peer);
        });

        let measured = client.wait_for_closure().unwrap();
        closer.join().unwrap();
        assert!(measured >= Duration::from_millis(100));
        assert!(measured < Duration::from_secs(2));
    }

    #[test]
    fn window_survives_reconnect() {
        let (local, _peer) = pair();
        let client = DeviceClient::connect(local, LivelinessMode::Watchdog).unwrap();
        let window = client.into_window();

        let (local2, peer2) = pair();
        let client2 = DeviceClient::with_window(local2, window).unwrap();
        assert_eq!(client2.window().last_reset(), window.last_reset());
        drop((client2, peer2));
    }

    #[test]
    fn request_payload_stays_within_frame_budget() {
        let request = Request::new(i64::MAX, "very_long_method_name_for_the_wire")
            .with_params(serde_json::json!({ "values": vec![0u8; 64] }));
        let payload = request.to_payload().unwrap();
        assert!(payload.len() <= MAX_PAYLOAD);

        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();
        let frame = decode_frame(&mut wire, MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(extract_id(&frame.payload), Some(i64::MAX));
    }
}
