//! Redirect links — building the URL a wallet answers on, and parsing the
//! URL it answers with.
//!
//! Two link technologies are supported and treated identically once the
//! domain and path prefix are accounted for:
//!
//! ```text
//! deep link:       myapp://onConnect?nonce=…&data=…
//! universal link:  https://example.com/wallet/onConnect?nonce=…&data=…
//!                  └───┘   └─────────┘ └────┘ └───────┘
//!                  scheme    domain    prefix  wire method
//! ```
//!
//! A [`LinkConfig`] may rename methods on the way out (`connect` →
//! `onConnect`); the renamed form is the *wire method name* and is what the
//! wallet echoes back, so correlation happens on wire names.
//!
//! Query strings are percent-encoded on build and percent-decoded on parse
//! with the same codec, so any value survives a round trip.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use urlencoding::{decode, encode};

use crate::message::Params;

/// Errors that can occur when parsing a redirect URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("malformed url: '{0}'")]
    MalformedUrl(String),

    #[error("url carries no method name: '{0}'")]
    MissingMethod(String),

    #[error("query parameter is not valid percent-encoded UTF-8: '{0}'")]
    MalformedQuery(String),
}

/// `scheme://[domain/]path[?query][#fragment]`
///
/// A host segment is only read as a domain when it contains a dot; a
/// dotless first segment (`myapp://onConnect`) is the start of the path.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<domain>[^/?#]*\.[^/?#]*)?/*(?P<path>[^?#]*)(?:\?(?P<query>[^#]*))?(?:#(?P<fragment>.*))?$",
    )
    .expect("invalid url regex")
});

// ── LinkConfig ────────────────────────────────────────────────────────────────

/// Where the wallet should send its answers.
///
/// Immutable once built; share it behind an `Arc` between the protocol and
/// the session. Aliases keep registration order: when two logical names
/// share a wire name, the reverse lookup yields the one registered first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    scheme: String,
    domain: Option<String>,
    path_prefix: Option<String>,
    method_aliases: Vec<(String, String)>,
}

impl LinkConfig {
    /// A custom-scheme deep link: `scheme://method`.
    pub fn deep_link(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            domain: None,
            path_prefix: None,
            method_aliases: Vec::new(),
        }
    }

    /// A universal link: `scheme://domain/method`, usually with `https`.
    pub fn universal_link(scheme: impl Into<String>, domain: impl Into<String>) -> Self {
        let mut config = Self::deep_link(scheme);
        config.domain = non_empty(domain.into().trim_matches('/'));
        config
    }

    /// Put `prefix/` in front of every method name.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = non_empty(prefix.into().trim_matches('/'));
        self
    }

    /// Answer `logical` calls on the wire name `wire` instead.
    /// Re-aliasing a logical name replaces its wire name in place.
    pub fn with_alias(mut self, logical: impl Into<String>, wire: impl Into<String>) -> Self {
        let (logical, wire) = (logical.into(), wire.into());
        match self.method_aliases.iter_mut().find(|(l, _)| *l == logical) {
            Some(entry) => entry.1 = wire,
            None => self.method_aliases.push((logical, wire)),
        }
        self
    }

    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (logical, wire) in aliases {
            self = self.with_alias(logical, wire);
        }
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    /// `(logical, wire)` pairs in registration order.
    pub fn method_aliases(&self) -> &[(String, String)] {
        &self.method_aliases
    }

    /// Logical → wire method name. Unaliased names pass through.
    pub fn wire_method<'a>(&'a self, logical: &'a str) -> &'a str {
        self.method_aliases
            .iter()
            .find(|(l, _)| l == logical)
            .map(|(_, wire)| wire.as_str())
            .unwrap_or(logical)
    }

    /// Wire → logical method name. Unaliased names pass through.
    pub fn logical_method<'a>(&'a self, wire: &'a str) -> &'a str {
        self.method_aliases
            .iter()
            .find(|(_, w)| w.as_str() == wire)
            .map(|(logical, _)| logical.as_str())
            .unwrap_or(wire)
    }

    /// `scheme://[domain/][prefix/]wire_method` — the redirect link a
    /// response to `method` must target.
    pub fn redirect_url(&self, method: &str) -> String {
        let mut url = format!("{}://", self.scheme);
        if let Some(domain) = &self.domain {
            url.push_str(domain);
            url.push('/');
        }
        if let Some(prefix) = &self.path_prefix {
            url.push_str(prefix);
            url.push('/');
        }
        url.push_str(self.wire_method(method));
        url
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

// ── ParsedUrl ─────────────────────────────────────────────────────────────────

/// The components of an inbound URL. Absent or empty parts are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub scheme: String,
    pub domain: Option<String>,
    pub method_path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl ParsedUrl {
    /// Split `url` into its parts.
    pub fn parse(url: &str) -> Result<Self, LinkError> {
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LinkError::MalformedUrl(url.to_string()));
        }
        let caps = URL_RE
            .captures(url)
            .ok_or_else(|| LinkError::MalformedUrl(url.to_string()))?;

        let part = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            scheme: caps["scheme"].to_string(),
            domain: part("domain"),
            method_path: part("path"),
            query: part("query"),
            fragment: part("fragment"),
        })
    }

    /// The method name carried in the path, with `path_prefix` stripped.
    pub fn method_name(&self, path_prefix: Option<&str>) -> Option<String> {
        self.method_path
            .as_deref()
            .map(|path| extract_method_name(path, path_prefix))
            .filter(|m| !m.is_empty())
    }

    /// Decode the query string. A URL without one yields empty params.
    pub fn params(&self) -> Result<Params, LinkError> {
        match &self.query {
            Some(q) => parse_query(q),
            None => Ok(Params::new()),
        }
    }
}

/// Strip `prefix/` from the front of `method_path` when it is there.
pub fn extract_method_name(method_path: &str, path_prefix: Option<&str>) -> String {
    let stripped = path_prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .and_then(|p| method_path.strip_prefix(p)?.strip_prefix('/'));
    stripped.unwrap_or(method_path).to_string()
}

// ── Query strings ─────────────────────────────────────────────────────────────

/// `k=v&k=v`, percent-decoding both sides. Later duplicates overwrite earlier
/// ones; a pair without `=` gets an empty value.
pub fn parse_query(query: &str) -> Result<Params, LinkError> {
    let mut params = Params::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(key).map_err(|_| LinkError::MalformedQuery(pair.to_string()))?;
        let value = decode(value).map_err(|_| LinkError::MalformedQuery(pair.to_string()))?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Inverse of [`parse_query`].
pub fn render_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
