//! The host platform boundary.
//!
//! Two primitives are provided by the host (mobile OS, desktop shell, game
//! engine) and nothing else in this crate talks to the outside world:
//!
//! - **open a URL** — fire-and-forget hand-off to the OS, modelled by the
//!   [`UrlOpener`] trait;
//! - **a URL arrived** — a single notification the OS raises when one of
//!   the app's redirect links is opened, modelled by [`LinkEvents`].
//!
//! The OS notification is process-wide. Rather than letting every protocol
//! instance hook a global, the host owns one [`LinkEvents`] hub, forwards the
//! OS callback into [`LinkEvents::deliver`], and each consumer holds a
//! [`Subscription`] that unhooks itself exactly once. Tests build their own
//! hub, so sessions in different tests never see each other's traffic.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use thiserror::Error;

/// Errors reported by the host platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("failed to open url: {0}")]
    OpenFailed(String),
}

/// The host's "open this URL externally" primitive.
pub trait UrlOpener: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), PlatformError>;
}

impl<F> UrlOpener for F
where
    F: Fn(&str) -> Result<(), PlatformError> + Send + Sync,
{
    fn open_url(&self, url: &str) -> Result<(), PlatformError> {
        self(url)
    }
}

type Handler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    handlers: BTreeMap<u64, Handler>,
}

/// Fan-out hub for the host's "a URL arrived" notification.
///
/// Cheap to clone; clones share the same listener set.
#[derive(Clone, Default)]
pub struct LinkEvents {
    inner: Arc<Mutex<Listeners>>,
}

impl LinkEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every delivered URL until the returned
    /// [`Subscription`] is released or dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut listeners = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.handlers.insert(id, Arc::new(handler));
        Subscription {
            id: Some(id),
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Hand an inbound URL to every current subscriber. Returns how many
    /// were notified.
    ///
    /// Handlers run on the caller's thread, outside the hub lock, so a
    /// handler may itself subscribe or unsubscribe.
    pub fn deliver(&self, url: &str) -> usize {
        let handlers: Vec<Handler> = {
            let listeners = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            listeners.handlers.values().cloned().collect()
        };
        for handler in &handlers {
            handler(url);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .handlers
            .len()
    }
}

impl std::fmt::Debug for LinkEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkEvents")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A registration on a [`LinkEvents`] hub. Unhooks on [`release`] or drop,
/// whichever comes first.
///
/// [`release`]: Subscription::release
#[derive(Debug)]
pub struct Subscription {
    id: Option<u64>,
    hub: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the handler. Later calls are no-ops.
    pub fn release(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(hub) = self.hub.upgrade() {
            hub.lock()
                .unwrap_or_else(|p| p.into_inner())
                .handlers
                .remove(&id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(events: &LinkEvents) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = events.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    #[test]
    fn deliver_reaches_every_subscriber() {
        let events = LinkEvents::new();
        let (a, _sa) = counter(&events);
        let (b, _sb) = counter(&events);
        assert_eq!(events.deliver("myapp://x"), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let events = LinkEvents::new();
        let (hits, mut sub) = counter(&events);
        let (_, _other) = counter(&events);
        sub.release();
        sub.release();
        assert!(!sub.is_active());
        assert_eq!(events.subscriber_count(), 1);
        events.deliver("myapp://x");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_unsubscribes() {
        let events = LinkEvents::new();
        {
            let (_, _sub) = counter(&events);
            assert_eq!(events.subscriber_count(), 1);
        }
        assert_eq!(events.subscriber_count(), 0);
        assert_eq!(events.deliver("myapp://x"), 0);
    }

    #[test]
    fn separate_hubs_do_not_interfere() {
        let one = LinkEvents::new();
        let two = LinkEvents::new();
        let (hits, _sub) = counter(&one);
        two.deliver("myapp://x");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_hub_releases_quietly() {
        let events = LinkEvents::new();
        let (_, mut sub) = counter(&events);
        drop(events);
        sub.release();
        assert!(!sub.is_active());
    }

    #[test]
    fn closures_are_openers() {
        let opener = |url: &str| {
            if url.is_empty() {
                Err(PlatformError::OpenFailed("empty".into()))
            } else {
                Ok(())
            }
        };
        assert!(opener.open_url("myapp://x").is_ok());
        assert!(opener.open_url("").is_err());
    }
}
