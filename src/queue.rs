use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;

use crate::OpCode;

/// One queued outbound write.
#[derive(Debug)]
pub(crate) enum PendingWrite {
    /// A pong, usually answering a peer ping. Bypasses the size cap and is
    /// drained ahead of the FIFO queue.
    Pong(Bytes),
    /// A data message, counted against the queue cap until written.
    Message { opcode: OpCode, payload: Bytes },
    /// The terminal close. At most one is ever admitted.
    Close {
        code: u16,
        reason: String,
        grace: Duration,
    },
}

/// Outcome of offering a message to the queue.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    Accepted,
    /// Admitting the payload would push `queued_bytes` past the cap; the
    /// session must force-close instead.
    Overflow,
}

/// The ordered outbound queue.
///
/// Pongs live in their own deque and win every writer cycle; messages and
/// the terminal close share a strict FIFO. Invariants: `queued_bytes` is the
/// byte sum of queued `Message` payloads only, and at most one close is ever
/// enqueued.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    pongs: VecDeque<Bytes>,
    items: VecDeque<PendingWrite>,
    queued_bytes: u64,
    close_enqueued: bool,
}

impl OutboundQueue {
    /// The pong admission rule: false once shutdown is underway, meaning a
    /// close is enqueued and nothing is left in front of it. Messages use
    /// the stricter [`Self::close_enqueued`] check.
    pub(crate) fn accepts_new_work(&self) -> bool {
        !(self.close_enqueued && self.items.is_empty())
    }

    pub(crate) fn push_message(&mut self, opcode: OpCode, payload: Bytes, cap: u64) -> Admission {
        if self.queued_bytes + payload.len() as u64 > cap {
            return Admission::Overflow;
        }

        self.queued_bytes += payload.len() as u64;
        self.items.push_back(PendingWrite::Message { opcode, payload });

        Admission::Accepted
    }

    pub(crate) fn push_pong(&mut self, payload: Bytes) {
        self.pongs.push_back(payload);
    }

    /// Returns false if a close is already enqueued.
    pub(crate) fn push_close(&mut self, code: u16, reason: String, grace: Duration) -> bool {
        if self.close_enqueued {
            return false;
        }

        self.close_enqueued = true;
        self.items.push_back(PendingWrite::Close {
            code,
            reason,
            grace,
        });

        true
    }

    pub(crate) fn pop_pong(&mut self) -> Option<Bytes> {
        self.pongs.pop_front()
    }

    pub(crate) fn pop_item(&mut self) -> Option<PendingWrite> {
        self.items.pop_front()
    }

    /// Removes a written message's bytes from the running total. Called
    /// after the write completed, never on pop.
    pub(crate) fn finish_message(&mut self, len: u64) {
        debug_assert!(self.queued_bytes >= len, "queued byte accounting underflow");
        self.queued_bytes -= len;
    }

    pub(crate) fn queued_bytes(&self) -> u64 {
        self.queued_bytes
    }

    pub(crate) fn close_enqueued(&self) -> bool {
        self.close_enqueued
    }
}
