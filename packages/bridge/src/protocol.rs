//! `send(request) -> response` over a one-shot redirect channel.
//!
//! A [`RequestProtocol`] glues three things together:
//!
//! 1. the [`LinkConfig`] that says which wire name an answer arrives on,
//! 2. the [`CorrelationTable`] holding one pending slot per wire name,
//! 3. the host's open-URL primitive and "URL arrived" hub.
//!
//! ```text
//!  send(msg) ─► register(wire) ─► open_url(provider/method?…) ─► wait ─┐
//!                                                                     │
//!  LinkEvents::deliver(url) ─► parse ─► resolve(wire) ────────────────┘
//! ```
//!
//! There is no timeout. A call whose answer never comes back waits until
//! [`RequestProtocol::close`] cancels it or the caller gives up on the
//! future (for example with `tokio::time::timeout`).

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use walletlink::{InboundMessage, LinkConfig, LinkMessage, OutboundMessage};

use crate::correlation::{CorrelationTable, Resolution};
use crate::error::ProtocolError;
use crate::platform::{LinkEvents, PlatformError, Subscription, UrlOpener};

pub struct RequestProtocol {
    provider_url: String,
    link: Arc<LinkConfig>,
    table: Arc<CorrelationTable>,
    opener: Arc<dyn UrlOpener>,
    subscription: Mutex<Option<Subscription>>,
}

impl RequestProtocol {
    /// Build a protocol that sends requests to `provider_url` and listens on
    /// `events` for answers. The subscription is held until [`close`] or drop.
    ///
    /// [`close`]: RequestProtocol::close
    pub fn new(
        provider_url: impl Into<String>,
        link: Arc<LinkConfig>,
        opener: Arc<dyn UrlOpener>,
        events: &LinkEvents,
    ) -> Self {
        let table = Arc::new(CorrelationTable::new());

        let subscription = {
            let link = Arc::clone(&link);
            let table = Arc::clone(&table);
            events.subscribe(move |url| {
                if let Err(e) = route(url, &link, &table) {
                    warn!(error = %e, "ignoring inbound url");
                }
            })
        };

        Self {
            provider_url: provider_url.into().trim_end_matches('/').to_string(),
            link,
            table,
            opener,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }

    pub fn link(&self) -> &Arc<LinkConfig> {
        &self.link
    }

    /// Open `message` as a provider URL and wait for the redirect answering
    /// it.
    ///
    /// The provider URL carries the logical method name; the answer is
    /// matched on the wire name the [`LinkConfig`] maps it to. The returned
    /// message's `method` is that wire name.
    pub async fn send(&self, message: OutboundMessage) -> Result<InboundMessage, ProtocolError> {
        let wire = self.link.wire_method(&message.method).to_string();
        let pending = self.table.register(&wire)?;

        let url = message.to_url(&self.provider_url);
        debug!(method = %message.method, wire = %wire, "opening request url");
        if let Err(e) = self.opener.open_url(&url) {
            self.table.abandon(&wire);
            warn!(method = %message.method, error = %e, "request url did not open");
            return Err(ProtocolError::OpenFailed(e.to_string()));
        }

        let response = pending.wait().await?;
        debug!(wire = %wire, params = response.params.len(), "request answered");
        Ok(response)
    }

    /// Open `url` without expecting an answer.
    pub fn open(&self, url: &str) -> Result<(), PlatformError> {
        debug!("opening fire-and-forget url");
        self.opener.open_url(url)
    }

    /// Feed an inbound URL straight to the table, bypassing the hub.
    pub fn receive(&self, url: &str) -> Result<Resolution, ProtocolError> {
        route(url, &self.link, &self.table)
    }

    /// Wire methods still waiting for an answer.
    pub fn pending_methods(&self) -> Vec<String> {
        self.table.pending_methods()
    }

    pub fn is_closed(&self) -> bool {
        self.table.is_closed()
    }

    /// Cancel every pending call and stop listening for inbound URLs.
    /// Idempotent.
    pub fn close(&self) {
        let released = self
            .subscription
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let Some(mut subscription) = released else {
            return;
        };
        subscription.release();

        let cancelled = self.table.close();
        if cancelled.is_empty() {
            debug!("request protocol closed");
        } else {
            warn!(?cancelled, "request protocol closed with calls pending");
        }
    }
}

impl Drop for RequestProtocol {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RequestProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestProtocol")
            .field("provider_url", &self.provider_url)
            .field("pending", &self.table.pending_methods())
            .field("closed", &self.table.is_closed())
            .finish_non_exhaustive()
    }
}

fn route(
    url: &str,
    link: &LinkConfig,
    table: &CorrelationTable,
) -> Result<Resolution, ProtocolError> {
    let message = LinkMessage::from_url(url, link)?;
    let method = message.method.clone();
    let outcome = table.resolve(message);
    match outcome {
        Resolution::Delivered => debug!(wire = %method, "inbound url matched"),
        Resolution::Unmatched => debug!(wire = %method, "unsolicited inbound url dropped"),
        Resolution::CallerGone => debug!(wire = %method, "inbound url for abandoned call"),
        Resolution::Closed => debug!(wire = %method, "inbound url after close"),
    }
    Ok(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const PROVIDER: &str = "https://wallet.example/ul/v1";

    struct Harness {
        events: LinkEvents,
        protocol: Arc<RequestProtocol>,
        opened: mpsc::UnboundedReceiver<String>,
    }

    fn harness(link: LinkConfig) -> Harness {
        let events = LinkEvents::new();
        let (tx, opened) = mpsc::unbounded_channel();
        let opener = move |url: &str| -> Result<(), PlatformError> {
            let _ = tx.send(url.to_string());
            Ok(())
        };
        let protocol = Arc::new(RequestProtocol::new(
            PROVIDER,
            Arc::new(link),
            Arc::new(opener),
            &events,
        ));
        Harness {
            events,
            protocol,
            opened,
        }
    }

    fn spawn_send(
        protocol: &Arc<RequestProtocol>,
        message: OutboundMessage,
    ) -> tokio::task::JoinHandle<Result<InboundMessage, ProtocolError>> {
        let protocol = Arc::clone(protocol);
        tokio::spawn(async move { protocol.send(message).await })
    }

    #[tokio::test]
    async fn answer_resolves_matching_call() {
        let mut h = harness(LinkConfig::deep_link("myapp"));
        let call = spawn_send(&h.protocol, LinkMessage::new("connect").with_param("a", "1"));

        let url = h.opened.recv().await.unwrap();
        assert_eq!(url, format!("{PROVIDER}/connect?a=1"));

        assert_eq!(h.events.deliver("myapp://connect?nonce=abc&data=xyz"), 1);
        let response = call.await.unwrap().unwrap();
        assert_eq!(response.method, "connect");
        assert_eq!(response.params.get("nonce"), Some("abc"));
        assert_eq!(response.params.get("data"), Some("xyz"));
        assert!(h.protocol.pending_methods().is_empty());
    }

    #[tokio::test]
    async fn unrelated_answer_leaves_call_pending() {
        let mut h = harness(LinkConfig::deep_link("myapp"));
        let call = spawn_send(&h.protocol, LinkMessage::new("connect"));
        h.opened.recv().await.unwrap();

        h.events.deliver("myapp://signMessage?nonce=abc");
        h.events.deliver("this is not a url");
        assert_eq!(h.protocol.pending_methods(), vec!["connect"]);
        assert!(!call.is_finished());

        h.events.deliver("myapp://connect");
        assert!(call.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn second_send_for_same_method_fails_fast() {
        let mut h = harness(LinkConfig::deep_link("myapp"));
        let first = spawn_send(&h.protocol, LinkMessage::new("signMessage"));
        h.opened.recv().await.unwrap();

        let second = h.protocol.send(LinkMessage::new("signMessage")).await;
        assert_eq!(
            second.unwrap_err(),
            ProtocolError::DuplicateInFlightRequest("signMessage".into())
        );
        assert!(h.opened.try_recv().is_err());

        h.events.deliver("myapp://signMessage?signature=s");
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn different_methods_run_concurrently() {
        let mut h = harness(LinkConfig::deep_link("myapp"));
        let sign = spawn_send(&h.protocol, LinkMessage::new("signMessage"));
        let tx = spawn_send(&h.protocol, LinkMessage::new("signTransaction"));
        h.opened.recv().await.unwrap();
        h.opened.recv().await.unwrap();

        h.events.deliver("myapp://signTransaction?transaction=t");
        h.events.deliver("myapp://signMessage?signature=s");
        assert_eq!(tx.await.unwrap().unwrap().params.get("transaction"), Some("t"));
        assert_eq!(sign.await.unwrap().unwrap().params.get("signature"), Some("s"));
    }

    #[tokio::test]
    async fn alias_is_the_correlation_key() {
        let link = LinkConfig::universal_link("https", "app.example.com")
            .with_path_prefix("wallet")
            .with_alias("connect", "onConnect");
        let mut h = harness(link);
        let call = spawn_send(&h.protocol, LinkMessage::new("connect"));
        assert!(h.opened.recv().await.unwrap().starts_with(&format!("{PROVIDER}/connect")));
        assert_eq!(h.protocol.pending_methods(), vec!["onConnect"]);

        h.events.deliver("https://app.example.com/wallet/connect");
        assert!(!call.is_finished());

        h.events.deliver("https://app.example.com/wallet/onConnect?nonce=n");
        let response = call.await.unwrap().unwrap();
        assert_eq!(response.method, "onConnect");
    }

    #[tokio::test]
    async fn close_cancels_pending_and_unsubscribes() {
        let mut h = harness(LinkConfig::deep_link("myapp"));
        let call = spawn_send(&h.protocol, LinkMessage::new("connect"));
        h.opened.recv().await.unwrap();

        h.protocol.close();
        h.protocol.close();
        assert_eq!(call.await.unwrap().unwrap_err(), ProtocolError::ProtocolClosed);
        assert_eq!(h.events.subscriber_count(), 0);
        assert_eq!(h.events.deliver("myapp://connect"), 0);
        assert_eq!(
            h.protocol.send(LinkMessage::new("connect")).await.unwrap_err(),
            ProtocolError::ProtocolClosed
        );
    }

    #[tokio::test]
    async fn close_with_nothing_pending_is_fine() {
        let h = harness(LinkConfig::deep_link("myapp"));
        h.protocol.close();
        assert!(h.protocol.is_closed());
    }

    #[tokio::test]
    async fn drop_releases_subscription() {
        let h = harness(LinkConfig::deep_link("myapp"));
        assert_eq!(h.events.subscriber_count(), 1);
        drop(h.protocol);
        assert_eq!(h.events.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn failed_open_frees_the_slot() {
        let events = LinkEvents::new();
        let opener =
            |_: &str| -> Result<(), PlatformError> { Err(PlatformError::OpenFailed("no handler".into())) };
        let protocol = RequestProtocol::new(
            PROVIDER,
            Arc::new(LinkConfig::deep_link("myapp")),
            Arc::new(opener),
            &events,
        );
        let err = protocol.send(LinkMessage::new("connect")).await.unwrap_err();
        assert!(matches!(err, ProtocolError::OpenFailed(_)));
        assert!(protocol.pending_methods().is_empty());
    }

    #[test]
    fn receive_reports_parse_failures() {
        let h = harness(LinkConfig::deep_link("myapp"));
        assert!(matches!(
            h.protocol.receive("nope"),
            Err(ProtocolError::Link(_))
        ));
        assert_eq!(
            h.protocol.receive("myapp://connect").unwrap(),
            Resolution::Unmatched
        );
    }
}
