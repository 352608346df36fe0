//! Link messages — one method name plus an ordered set of string params.
//!
//! The same shape is used in both directions: an outbound request is
//! rendered into a provider URL with [`LinkMessage::to_url`], and an inbound
//! answer is recovered from a redirect URL with [`LinkMessage::from_url`].

use crate::link::{parse_query, render_query, LinkConfig, LinkError, ParsedUrl};

/// Insertion-ordered string map. Inserting an existing key replaces its
/// value in place, so rendering order stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A request or response carried over a redirect link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub method: String,
    pub params: Params,
}

/// A request about to be opened as a URL.
pub type OutboundMessage = LinkMessage;

/// A response recovered from an inbound redirect URL.
pub type InboundMessage = LinkMessage;

impl LinkMessage {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::new(),
        }
    }

    /// Builder-style [`Params::insert`].
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// `{base_url}/{method}[?query]`
    pub fn to_url(&self, base_url: &str) -> String {
        let mut url = format!("{}/{}", base_url.trim_end_matches('/'), self.method);
        if !self.params.is_empty() {
            url.push('?');
            url.push_str(&render_query(&self.params));
        }
        url
    }

    /// Recover a message from a redirect URL built with `config`.
    ///
    /// The method is the wire name with the configured path prefix removed;
    /// aliases are not reversed here.
    pub fn from_url(url: &str, config: &LinkConfig) -> Result<Self, LinkError> {
        let parsed = ParsedUrl::parse(url)?;
        let method = parsed
            .method_name(config.path_prefix())
            .ok_or_else(|| LinkError::MissingMethod(url.to_string()))?;
        let params = match &parsed.query {
            Some(q) => parse_query(q)?,
            None => Params::new(),
        };
        Ok(Self { method, params })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut p = Params::new();
        p.insert("a", "1");
        p.insert("b", "2");
        p.insert("a", "3");
        let order: Vec<_> = p.iter().collect();
        assert_eq!(order, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn to_url_without_params() {
        let msg = LinkMessage::new("connect");
        assert_eq!(msg.to_url("https://wallet.example/ul/v1/"), "https://wallet.example/ul/v1/connect");
    }

    #[test]
    fn to_url_keeps_param_order() {
        let msg = LinkMessage::new("connect")
            .with_param("cluster", "devnet")
            .with_param("app_url", "https://app.example");
        assert_eq!(
            msg.to_url("https://wallet.example/ul/v1"),
            "https://wallet.example/ul/v1/connect?cluster=devnet&app_url=https%3A%2F%2Fapp.example"
        );
    }

    #[test]
    fn from_url_strips_prefix_and_decodes() {
        let config = LinkConfig::universal_link("https", "app.example.com").with_path_prefix("cb");
        let msg = LinkMessage::from_url(
            "https://app.example.com/cb/onSign?nonce=abc&errorMessage=User%20rejected",
            &config,
        )
        .unwrap();
        assert_eq!(msg.method, "onSign");
        assert_eq!(msg.params.get("nonce"), Some("abc"));
        assert_eq!(msg.params.get("errorMessage"), Some("User rejected"));
    }

    #[test]
    fn from_url_without_method_fails() {
        let config = LinkConfig::universal_link("https", "app.example.com");
        assert!(matches!(
            LinkMessage::from_url("https://app.example.com?x=1", &config),
            Err(LinkError::MissingMethod(_))
        ));
    }

    #[test]
    fn outbound_then_inbound_roundtrip() {
        let config = LinkConfig::deep_link("myapp").with_path_prefix("wallet");
        let out = LinkMessage::new("signMessage")
            .with_param("nonce", "3mJr7AoUXx2Wqd")
            .with_param("redirect_link", config.redirect_url("signMessage"));
        let back = LinkMessage::from_url(&out.to_url("myapp://wallet"), &config).unwrap();
        assert_eq!(back, out);
    }
}
