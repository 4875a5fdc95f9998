//! Scripted codec halves for driving a session without a network.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{Error, FrameCallback, FrameReader, FrameWriter, OpCode};

/// One scripted inbound frame.
#[derive(Debug)]
pub enum InboundFrame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close { code: u16, reason: String },
}

/// Feeds inbound frames (or read errors) to a [`MockReader`]. Clone freely;
/// dropping every clone makes the reader report an unexpected EOF.
#[derive(Debug, Clone)]
pub struct Script {
    tx: mpsc::UnboundedSender<Result<InboundFrame, Error>>,
}

impl Script {
    pub fn text(&self, text: impl Into<String>) {
        self.push(InboundFrame::Text(text.into()));
    }

    pub fn binary(&self, payload: impl Into<Bytes>) {
        self.push(InboundFrame::Binary(payload.into()));
    }

    pub fn ping(&self, payload: impl Into<Bytes>) {
        self.push(InboundFrame::Ping(payload.into()));
    }

    pub fn pong(&self, payload: impl Into<Bytes>) {
        self.push(InboundFrame::Pong(payload.into()));
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) {
        self.push(InboundFrame::Close {
            code,
            reason: reason.into(),
        });
    }

    /// Makes the reader's next frame read fail with `error`.
    pub fn error(&self, error: Error) {
        let _ = self.tx.send(Err(error));
    }

    fn push(&self, frame: InboundFrame) {
        let _ = self.tx.send(Ok(frame));
    }
}

/// A [`FrameReader`] that replays whatever its [`Script`] sends.
#[derive(Debug)]
pub struct MockReader {
    rx: mpsc::UnboundedReceiver<Result<InboundFrame, Error>>,
}

impl FrameReader for MockReader {
    fn process_next_frame(
        &mut self,
        callback: &mut dyn FrameCallback,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            match self.rx.recv().await {
                Some(Ok(frame)) => {
                    match frame {
                        InboundFrame::Text(text) => callback.on_text(text),
                        InboundFrame::Binary(payload) => callback.on_binary(payload),
                        InboundFrame::Ping(payload) => callback.on_ping(payload),
                        InboundFrame::Pong(payload) => callback.on_pong(payload),
                        InboundFrame::Close { code, reason } => callback.on_close(code, reason),
                    }

                    Ok(())
                }
                Some(Err(err)) => Err(err),
                None => Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "script ended",
                ))),
            }
        }
    }
}

/// A frame as a [`MockWriter`] recorded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrittenFrame {
    Ping(Bytes),
    Pong(Bytes),
    Close { code: u16, reason: String },
    Message { opcode: OpCode, payload: Bytes },
}

/// Shared view of everything a [`MockWriter`] wrote, plus a write-failure
/// switch.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    frames: Arc<Mutex<Vec<WrittenFrame>>>,
    fail_writes: Arc<AtomicBool>,
}

impl WriteLog {
    /// Snapshot of all frames written so far, in write order.
    pub fn frames(&self) -> Vec<WrittenFrame> {
        self.frames.lock().expect("write log poisoned").clone()
    }

    /// When set, every subsequent write fails with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, frame: WrittenFrame) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
        }

        self.frames.lock().expect("write log poisoned").push(frame);

        Ok(())
    }
}

/// A [`FrameWriter`] that records frames into its [`WriteLog`].
#[derive(Debug)]
pub struct MockWriter {
    log: WriteLog,
}

impl FrameWriter for MockWriter {
    fn write_ping(&mut self, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        let result = self.log.record(WrittenFrame::Ping(Bytes::copy_from_slice(payload)));
        async move { result }
    }

    fn write_pong(&mut self, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        let result = self.log.record(WrittenFrame::Pong(Bytes::copy_from_slice(payload)));
        async move { result }
    }

    fn write_close(
        &mut self,
        code: u16,
        reason: &str,
    ) -> impl Future<Output = io::Result<()>> + Send {
        let result = self.log.record(WrittenFrame::Close {
            code,
            reason: reason.to_owned(),
        });
        async move { result }
    }

    fn write_message(
        &mut self,
        opcode: OpCode,
        payload: &[u8],
    ) -> impl Future<Output = io::Result<()>> + Send {
        let result = self.log.record(WrittenFrame::Message {
            opcode,
            payload: Bytes::copy_from_slice(payload),
        });
        async move { result }
    }
}

/// A scripted reader/writer pair plus their driving handles.
pub fn pair() -> (MockReader, MockWriter, Script, WriteLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = WriteLog::default();

    (
        MockReader { rx },
        MockWriter { log: log.clone() },
        Script { tx },
        log,
    )
}
