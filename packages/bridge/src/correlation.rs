//! Correlating redirect answers with the calls waiting for them.
//!
//! The wallet echoes no request id; the only thing tying an answer to its
//! request is the method name in the redirect link. The table is therefore
//! keyed by wire method name and holds at most one pending call per name.
//! A second registration for a name that is still waiting fails fast with
//! [`ProtocolError::DuplicateInFlightRequest`] instead of replacing the
//! first slot, which would leave the first caller waiting forever.
//!
//! ```text
//!  register("onConnect") ──► Sent ──resolve(msg)──► Resolved(msg)
//!                             │
//!                             └──────close()──────► Cancelled(ProtocolClosed)
//! ```
//!
//! One [`Mutex`] guards the whole table. The answer may arrive on any
//! thread; the lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;
use walletlink::InboundMessage;

use crate::error::ProtocolError;

/// What a pending call eventually yields.
pub type Reply = Result<InboundMessage, ProtocolError>;

/// Outcome of handing an inbound message to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A waiting call received the message.
    Delivered,
    /// No call is waiting for this method; the message was dropped.
    Unmatched,
    /// A slot existed but its caller had already gone away.
    CallerGone,
    /// The table is closed; nothing was touched.
    Closed,
}

struct Inner {
    pending: HashMap<String, oneshot::Sender<Reply>>,
    closed: bool,
}

/// In-memory map from wire method name to the single call awaiting it.
pub struct CorrelationTable {
    inner: Mutex<Inner>,
}

/// The waiting half of a registered call.
#[derive(Debug)]
pub struct PendingCall {
    method: String,
    rx: oneshot::Receiver<Reply>,
}

impl PendingCall {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Suspend until the call is resolved or cancelled.
    pub async fn wait(self) -> Reply {
        self.rx.await.unwrap_or(Err(ProtocolError::ProtocolClosed))
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Open a slot for `method`.
    ///
    /// A slot whose caller has already dropped its [`PendingCall`] (for
    /// instance after an external timeout) is dead and may be replaced.
    pub fn register(&self, method: &str) -> Result<PendingCall, ProtocolError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ProtocolError::ProtocolClosed);
        }
        if let Some(existing) = inner.pending.get(method) {
            if !existing.is_closed() {
                return Err(ProtocolError::DuplicateInFlightRequest(method.to_string()));
            }
        }
        let (tx, rx) = oneshot::channel();
        inner.pending.insert(method.to_string(), tx);
        Ok(PendingCall {
            method: method.to_string(),
            rx,
        })
    }

    /// Resolve the call waiting on `message.method`, if any, and remove it.
    pub fn resolve(&self, message: InboundMessage) -> Resolution {
        let mut inner = self.lock();
        if inner.closed {
            return Resolution::Closed;
        }
        match inner.pending.remove(&message.method) {
            Some(tx) => match tx.send(Ok(message)) {
                Ok(()) => Resolution::Delivered,
                Err(_) => Resolution::CallerGone,
            },
            None => Resolution::Unmatched,
        }
    }

    /// Drop the slot for `method` without resolving it. Used when the
    /// request never made it out.
    pub fn abandon(&self, method: &str) {
        self.lock().pending.remove(method);
    }

    /// Cancel every pending call with [`ProtocolError::ProtocolClosed`] and
    /// refuse further registrations. Returns the methods that were cancelled.
    /// Safe to call repeatedly.
    pub fn close(&self) -> Vec<String> {
        let mut inner = self.lock();
        inner.closed = true;
        let mut cancelled = Vec::with_capacity(inner.pending.len());
        for (method, tx) in inner.pending.drain() {
            let _ = tx.send(Err(ProtocolError::ProtocolClosed));
            cancelled.push(method);
        }
        cancelled.sort();
        cancelled
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Wire methods currently awaiting an answer, sorted.
    pub fn pending_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.lock().pending.keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
