//! The session state machine and its reader/writer tasks.
//!
//! One mutex guards all mutable session state; no I/O ever happens under it.
//! All outbound writes, keepalive ticks and the deferred close-timeout run on
//! a single writer task, so at most one write is in flight and frame order is
//! exactly enqueue order. A separate reader task blocks on the codec and
//! feeds inbound frames back into the state machine.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, warn};

use crate::{
    CloseCode, Error, Event, EventReceiver, FrameCallback, FrameReader, FrameWriter, Message,
    OpCode, SessionConfig,
    close_code::validate_close_code,
    event::EventSender,
    handshake,
    http::{Request, Response},
    keepalive::{KeepaliveState, Tick},
    queue::{Admission, OutboundQueue, PendingWrite},
};

/// RFC 6455 §5.5: a control-frame payload is at most 125 bytes, two of which
/// hold the close code.
const MAX_CLOSE_REASON: usize = 123;

/// Session lifecycle. `Failed` is absorbing from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Open,
    /// The close handshake is underway; the flags record which halves have
    /// happened (`local`: our close is enqueued, `remote`: the peer's close
    /// frame arrived).
    Closing { local: bool, remote: bool },
    Closed,
    Failed,
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    queue: OutboundQueue,
    keepalive: KeepaliveState,
    /// The peer's close frame, recorded at most once. `None` means no close
    /// has been received yet.
    received_close: Option<(u16, String)>,
    /// Our terminal close has been fully written to the codec.
    close_sent: bool,
    failed: bool,
    /// Teardown happened; exactly one of `Closed`/`Failure` was emitted and
    /// the stream pair is released. Nothing may be emitted after this.
    terminal: bool,
    reader_abort: Option<AbortHandle>,
    writer_abort: Option<AbortHandle>,
}

impl SessionState {
    fn new() -> Self {
        SessionState {
            phase: Phase::Connecting,
            queue: OutboundQueue::default(),
            keepalive: KeepaliveState::default(),
            received_close: None,
            close_sent: false,
            failed: false,
            terminal: false,
            reader_abort: None,
            writer_abort: None,
        }
    }

    fn transition(&mut self, to: Phase) {
        debug!(from = ?self.phase, to = ?to, "session transition");
        self.phase = to;
    }

    fn mark_closing_local(&mut self) {
        let next = match self.phase {
            Phase::Closing { remote, .. } => Phase::Closing {
                local: true,
                remote,
            },
            _ => Phase::Closing {
                local: true,
                remote: false,
            },
        };
        self.transition(next);
    }

    fn mark_closing_remote(&mut self) {
        let next = match self.phase {
            Phase::Closing { local, .. } => Phase::Closing {
                local,
                remote: true,
            },
            _ => Phase::Closing {
                local: false,
                remote: true,
            },
        };
        self.transition(next);
    }

    /// One writer cycle's pick: a pong if any, else the next FIFO item.
    /// After the terminal close went out only pongs are still served.
    fn next_write(&mut self) -> Option<PendingWrite> {
        if let Some(payload) = self.queue.pop_pong() {
            return Some(PendingWrite::Pong(payload));
        }

        if self.close_sent {
            return None;
        }

        self.queue.pop_item()
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    writer_wake: Notify,
    events: EventSender,
    config: SessionConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state lock poisoned")
    }

    fn emit(&self, event: Event) {
        // The caller may have dropped the receiver; the session still runs.
        let _ = self.events.send(event);
    }

    fn enqueue_message(&self, opcode: OpCode, payload: Bytes) -> bool {
        let mut st = self.lock();

        // Stricter than the pong rule: once a close is enqueued no message
        // is admitted, even while earlier items are still draining. A
        // message behind the terminal close could never be written.
        if st.failed || st.queue.close_enqueued() {
            return false;
        }

        match st
            .queue
            .push_message(opcode, payload, self.config.max_queue_size)
        {
            Admission::Accepted => {
                drop(st);
                self.writer_wake.notify_one();
                true
            }
            Admission::Overflow => {
                warn!(
                    cap = self.config.max_queue_size,
                    "outbound queue overflow, going away"
                );
                if st.queue.push_close(
                    CloseCode::Away.into_u16(),
                    String::new(),
                    self.config.close_grace_period,
                ) {
                    st.mark_closing_local();
                }
                drop(st);
                self.writer_wake.notify_one();
                false
            }
        }
    }

    fn enqueue_pong(&self, payload: Bytes) -> bool {
        let mut st = self.lock();

        if st.failed || !st.queue.accepts_new_work() {
            return false;
        }

        st.queue.push_pong(payload);
        drop(st);
        self.writer_wake.notify_one();

        true
    }

    fn enqueue_close(&self, code: u16, reason: &str) -> Result<bool, Error> {
        validate_close_code(code)?;

        if reason.len() > MAX_CLOSE_REASON {
            return Err(Error::IllegalArgument(format!(
                "reason.len() > {MAX_CLOSE_REASON}: {reason}"
            )));
        }

        let mut st = self.lock();

        if st.failed || st.queue.close_enqueued() {
            return Ok(false);
        }

        st.queue
            .push_close(code, reason.to_owned(), self.config.close_grace_period);
        st.mark_closing_local();
        drop(st);
        self.writer_wake.notify_one();

        Ok(true)
    }

    /// The single failure path. Idempotent: the first caller wins, every
    /// later call is a no-op, and a session that already closed cleanly can
    /// no longer fail.
    fn fail(&self, error: Error) {
        let (reader_abort, writer_abort) = {
            let mut st = self.lock();

            if st.terminal {
                return;
            }

            st.failed = true;
            st.terminal = true;
            st.transition(Phase::Failed);

            (st.reader_abort.take(), st.writer_abort.take())
        };

        warn!(%error, "web socket failed");
        self.emit(Event::Failure(error));
        self.writer_wake.notify_one();

        if let Some(handle) = reader_abort {
            handle.abort();
        }
        if let Some(handle) = writer_abort {
            handle.abort();
        }
    }

    /// Both directions of the close handshake are done: tear down once and
    /// emit the single `Closed`. Reader and writer wind down cooperatively;
    /// the deferred cancel dies with the writer task.
    fn finish_close_handshake(&self) {
        let finished = {
            let mut st = self.lock();

            if st.terminal {
                return;
            }

            debug_assert!(
                st.close_sent && st.received_close.is_some(),
                "close handshake finished with a half missing"
            );

            st.terminal = true;
            st.transition(Phase::Closed);
            st.reader_abort.take();
            st.writer_abort.take();

            st.received_close.clone()
        };

        if let Some((code, reason)) = finished {
            debug!(code, "close handshake complete");
            self.emit(Event::Closed { code, reason });
            self.writer_wake.notify_one();
        }
    }
}

/// The session's side of the codec callback surface. Only touches in-memory
/// state and the event channel; caller code never runs under the lock.
struct SessionCallback {
    shared: Arc<Shared>,
}

impl FrameCallback for SessionCallback {
    fn on_text(&mut self, text: String) {
        self.shared.emit(Event::Message(Message::Text(text)));
    }

    fn on_binary(&mut self, payload: Bytes) {
        self.shared.emit(Event::Message(Message::Binary(payload)));
    }

    fn on_ping(&mut self, payload: Bytes) {
        // A ping counts only if we actually answer it.
        if self.shared.enqueue_pong(payload) {
            self.shared.lock().keepalive.record_ping_received();
        }
    }

    fn on_pong(&mut self, _payload: Bytes) {
        self.shared.lock().keepalive.record_pong_received();
    }

    fn on_close(&mut self, code: u16, reason: String) {
        let finalize = {
            let mut st = self.shared.lock();

            if st.terminal {
                return;
            }

            assert!(
                st.received_close.is_none(),
                "received a second close frame"
            );

            st.received_close = Some((code, reason.clone()));
            st.mark_closing_remote();

            st.close_sent
        };

        self.shared.emit(Event::Closing { code, reason });

        if finalize {
            // We had already finished writing our close: the peer's frame
            // was the second half of the handshake.
            self.shared.finish_close_handshake();
        }
    }
}

async fn read_loop<R: FrameReader>(shared: Arc<Shared>, mut reader: R) {
    let mut callback = SessionCallback {
        shared: shared.clone(),
    };

    loop {
        {
            let st = shared.lock();
            if st.terminal || st.received_close.is_some() {
                break;
            }
        }

        if let Err(err) = reader.process_next_frame(&mut callback).await {
            shared.fail(err);
            break;
        }
    }
}

async fn write_loop<W: FrameWriter>(shared: Arc<Shared>, mut writer: W) {
    let mut ping = keepalive_timer(shared.config.ping_interval);
    let mut cancel_at: Option<Instant> = None;

    loop {
        let work = {
            let mut st = shared.lock();
            if st.terminal {
                break;
            }
            st.next_write()
        };

        match work {
            Some(PendingWrite::Pong(payload)) => {
                if let Err(err) = writer.write_pong(&payload).await {
                    shared.fail(Error::Io(err));
                    break;
                }
            }
            Some(PendingWrite::Message { opcode, payload }) => {
                if let Err(err) = writer.write_message(opcode, &payload).await {
                    shared.fail(Error::Io(err));
                    break;
                }

                shared.lock().queue.finish_message(payload.len() as u64);
            }
            Some(PendingWrite::Close {
                code,
                reason,
                grace,
            }) => {
                if let Err(err) = writer.write_close(code, &reason).await {
                    shared.fail(Error::Io(err));
                    break;
                }

                let handshake_done = {
                    let mut st = shared.lock();
                    st.close_sent = true;
                    st.received_close.is_some()
                };

                if handshake_done {
                    // The peer closed first; our close frame completed the
                    // handshake.
                    shared.finish_close_handshake();
                    break;
                }

                // Waiting on the peer's close now; cancel hard if it never
                // comes.
                cancel_at = Some(Instant::now() + grace);
            }
            None => {
                tokio::select! {
                    _ = shared.writer_wake.notified() => {}
                    _ = next_tick(ping.as_mut()) => {
                        let decision = {
                            let mut st = shared.lock();
                            if st.terminal {
                                break;
                            }
                            st.keepalive.on_tick()
                        };

                        match decision {
                            Tick::MissedPong { successful } => {
                                shared.fail(Error::PongTimeout {
                                    interval_ms: shared.config.ping_interval.as_millis() as u64,
                                    successful_pings: successful,
                                });
                                break;
                            }
                            Tick::SendPing => {
                                debug!("keepalive ping");
                                if let Err(err) = writer.write_ping(&[]).await {
                                    shared.fail(Error::Io(err));
                                    break;
                                }
                            }
                        }
                    }
                    _ = deadline(cancel_at) => {
                        warn!("peer never answered our close, cancelling the connection");
                        shared.fail(Error::Canceled);
                        break;
                    }
                }
            }
        }
    }
}

fn keepalive_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }

    // First tick one full period from now, not immediately.
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    Some(timer)
}

async fn next_tick(ping: Option<&mut Interval>) {
    match ping {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// A live WebSocket session.
///
/// The handle is cheap to clone and all of its operations are non-blocking
/// and thread-safe: they enqueue work under the session lock and return.
/// Returned booleans mean the work was *accepted*, not that it reached the
/// peer. What happens afterwards arrives on the [`EventReceiver`].
#[derive(Debug, Clone)]
pub struct WebSocket {
    shared: Arc<Shared>,
}

impl WebSocket {
    /// Upgrades an established stream and starts the session over it.
    ///
    /// Writes the HTTP/1.1 upgrade request for `request`, reads and
    /// validates the server's reply, then splits the stream and hands the
    /// halves to `codec` to build the frame reader/writer pair. Handshake
    /// problems surface here as [`Error::InvalidRequest`] (caller misuse) or
    /// [`Error::Protocol`] (offending response attached); the session never
    /// starts in that case.
    pub async fn connect<S, R, W, F>(
        mut stream: S,
        request: &Request,
        config: SessionConfig,
        codec: F,
    ) -> Result<(WebSocket, EventReceiver, Response), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        R: FrameReader,
        W: FrameWriter,
        F: FnOnce(ReadHalf<S>, WriteHalf<S>) -> (R, W),
    {
        let response = handshake::perform(&mut stream, request).await?;

        let (read_half, write_half) = tokio::io::split(stream);
        let (reader, writer) = codec(read_half, write_half);
        let (socket, events) = WebSocket::start(reader, writer, config);

        Ok((socket, events, response))
    }

    /// Starts a session over an already-upgraded codec pair.
    ///
    /// Spawns the reader and writer tasks; must be called inside a tokio
    /// runtime. The session owns both halves until teardown.
    pub fn start<R, W>(reader: R, writer: W, config: SessionConfig) -> (WebSocket, EventReceiver)
    where
        R: FrameReader,
        W: FrameWriter,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState::new()),
            writer_wake: Notify::new(),
            events: events_tx,
            config,
        });

        // Hold the lock across the spawns so neither task can observe the
        // session before both abort handles are registered.
        {
            let mut st = shared.lock();
            st.transition(Phase::Open);

            let read_task = tokio::spawn(read_loop(shared.clone(), reader));
            let write_task = tokio::spawn(write_loop(shared.clone(), writer));

            st.reader_abort = Some(read_task.abort_handle());
            st.writer_abort = Some(write_task.abort_handle());
        }

        (WebSocket { shared }, events_rx)
    }

    /// Enqueues a text message. False means rejected: the session has
    /// failed, a close is already enqueued, or the message would overflow
    /// the queue cap (which also force-closes the session with code 1001).
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.shared
            .enqueue_message(OpCode::Text, Bytes::from(text.into()))
    }

    /// Enqueues a binary message. Same admission rules as [`Self::send_text`].
    pub fn send_binary(&self, payload: impl Into<Bytes>) -> bool {
        self.shared.enqueue_message(OpCode::Binary, payload.into())
    }

    /// Enqueues an unsolicited pong. Pongs skip the queue cap and are
    /// written ahead of pending messages.
    pub fn pong(&self, payload: impl Into<Bytes>) -> bool {
        self.shared.enqueue_pong(payload.into())
    }

    /// Starts the close handshake.
    ///
    /// `Err` for a close code outside the protocol's sendable ranges or a
    /// reason over 123 bytes (no state change); `Ok(false)` when the session
    /// already failed or a close is already enqueued.
    pub fn close(&self, code: u16, reason: &str) -> Result<bool, Error> {
        self.shared.enqueue_close(code, reason)
    }

    /// Forcibly tears the session down, releasing the codec pair without a
    /// close handshake. Idempotent.
    pub fn cancel(&self) {
        self.shared.fail(Error::Canceled);
    }

    /// Total bytes of queued, not-yet-written message payloads.
    pub fn queue_size(&self) -> u64 {
        self.shared.lock().queue.queued_bytes()
    }

    /// Keepalive pings sent so far.
    pub fn sent_ping_count(&self) -> u64 {
        self.shared.lock().keepalive.sent_ping_count()
    }

    /// Peer pings received (each answered with a pong).
    pub fn received_ping_count(&self) -> u64 {
        self.shared.lock().keepalive.received_ping_count()
    }

    /// Peer pongs received.
    pub fn received_pong_count(&self) -> u64 {
        self.shared.lock().keepalive.received_pong_count()
    }
}
