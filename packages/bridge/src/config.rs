//! Bridge configuration, built in code or populated from environment variables.

use std::sync::Arc;

use thiserror::Error;
use walletlink::LinkConfig;
use walletlink_wire::Cluster;

pub const DEFAULT_PROVIDER_URL: &str = "https://phantom.app/ul/v1";
pub const DEFAULT_BROWSE_URL: &str = "https://phantom.app/ul/browse";
pub const DEFAULT_SCHEME: &str = "walletlink";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything a [`WalletSession`](crate::session::WalletSession) needs to
/// know about the app and the wallet it talks to.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `WALLETLINK_SCHEME` | `walletlink` | Redirect link scheme |
/// | `WALLETLINK_DOMAIN` | (absent = deep link) | Universal link domain |
/// | `WALLETLINK_PATH_PREFIX` | (absent) | Path segment before the method name |
/// | `WALLETLINK_METHOD_ALIASES` | (absent) | `logical=wire,logical=wire` |
/// | `WALLETLINK_APP_URL` | required | App metadata URL shown by the wallet |
/// | `WALLETLINK_CLUSTER` | `devnet` | `mainnet-beta`, `testnet` or `devnet` |
/// | `WALLETLINK_PROVIDER_URL` | `https://phantom.app/ul/v1` | Where requests are opened |
/// | `WALLETLINK_BROWSE_URL` | `https://phantom.app/ul/browse` | In-app browser entry point |
/// | `WALLETLINK_AUTO_CONNECT` | `false` | Connect on first signing call |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL request methods are appended to.
    pub provider_url: String,

    /// Base URL of the wallet's in-app browser link.
    pub browse_url: String,

    /// App metadata URL. Sent on connect and as the browse referrer.
    pub app_url: String,

    pub cluster: Cluster,

    /// Connect transparently before a signing call on a disconnected session.
    pub auto_connect: bool,

    /// Where answers are sent. Shared with the request protocol.
    pub link: Arc<LinkConfig>,
}

impl BridgeConfig {
    pub fn new(link: LinkConfig, app_url: impl Into<String>) -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            browse_url: DEFAULT_BROWSE_URL.to_string(),
            app_url: app_url.into(),
            cluster: Cluster::default(),
            auto_connect: false,
            link: Arc::new(link),
        }
    }

    /// Answers arrive on `scheme://method`.
    pub fn deep_link(scheme: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self::new(LinkConfig::deep_link(scheme), app_url)
    }

    /// Answers arrive on a universal link described by `link`.
    pub fn universal_link(link: LinkConfig, app_url: impl Into<String>) -> Self {
        Self::new(link, app_url)
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider_url = url.into();
        self
    }

    pub fn with_browse_url(mut self, url: impl Into<String>) -> Self {
        self.browse_url = url.into();
        self
    }

    /// Populate config from `WALLETLINK_*` environment variables, applying
    /// defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through
    /// `lookup`. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let scheme = var("WALLETLINK_SCHEME").unwrap_or_else(|| DEFAULT_SCHEME.into());
        let mut link = match var("WALLETLINK_DOMAIN") {
            Some(domain) => LinkConfig::universal_link(scheme, domain),
            None => LinkConfig::deep_link(scheme),
        };
        if let Some(prefix) = var("WALLETLINK_PATH_PREFIX") {
            link = link.with_path_prefix(prefix);
        }
        if let Some(raw) = var("WALLETLINK_METHOD_ALIASES") {
            link = link.with_aliases(parse_aliases(&raw)?);
        }

        let app_url = var("WALLETLINK_APP_URL").ok_or(ConfigError::Missing("WALLETLINK_APP_URL"))?;
        let mut config = Self::new(link, app_url);

        if let Some(raw) = var("WALLETLINK_CLUSTER") {
            config.cluster = raw.trim().parse::<Cluster>().map_err(|reason| ConfigError::Invalid {
                var: "WALLETLINK_CLUSTER",
                reason,
            })?;
        }
        if let Some(url) = var("WALLETLINK_PROVIDER_URL") {
            config.provider_url = url;
        }
        if let Some(url) = var("WALLETLINK_BROWSE_URL") {
            config.browse_url = url;
        }
        if let Some(raw) = var("WALLETLINK_AUTO_CONNECT") {
            config.auto_connect = parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "WALLETLINK_AUTO_CONNECT",
                reason: format!("expected true or false, got {raw:?}"),
            })?;
        }

        Ok(config)
    }
}

/// `connect=onConnect, signMessage=onSign` → pairs.
fn parse_aliases(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(String, String), ConfigError> {
            let (logical, wire) = entry
                .split_once('=')
                .map(|(l, w)| (l.trim(), w.trim()))
                .filter(|(l, w)| !l.is_empty() && !w.is_empty())
                .ok_or_else(|| ConfigError::Invalid {
                    var: "WALLETLINK_METHOD_ALIASES",
                    reason: format!("expected logical=wire, got {entry:?}"),
                })?;
            Ok((logical.to_string(), wire.to_string()))
        })
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_app_url_is_set() {
        let config =
            BridgeConfig::from_lookup(lookup(&[("WALLETLINK_APP_URL", "https://app.example")]))
                .unwrap();
        assert_eq!(config.provider_url, DEFAULT_PROVIDER_URL);
        assert_eq!(config.browse_url, DEFAULT_BROWSE_URL);
        assert_eq!(config.cluster, Cluster::Devnet);
        assert!(!config.auto_connect);
        assert_eq!(config.link.scheme(), DEFAULT_SCHEME);
        assert_eq!(config.link.domain(), None);
    }

    #[test]
    fn missing_app_url_is_an_error() {
        assert_eq!(
            BridgeConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("WALLETLINK_APP_URL")
        );
    }

    #[test]
    fn universal_link_from_env() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("WALLETLINK_APP_URL", "https://app.example"),
            ("WALLETLINK_SCHEME", "https"),
            ("WALLETLINK_DOMAIN", "app.example.com"),
            ("WALLETLINK_PATH_PREFIX", "wallet"),
            ("WALLETLINK_METHOD_ALIASES", "connect=onConnect, signMessage=onSign"),
            ("WALLETLINK_CLUSTER", "mainnet-beta"),
            ("WALLETLINK_AUTO_CONNECT", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.cluster, Cluster::MainnetBeta);
        assert!(config.auto_connect);
        assert_eq!(
            config.link.redirect_url("connect"),
            "https://app.example.com/wallet/onConnect"
        );
        assert_eq!(config.link.wire_method("signMessage"), "onSign");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let bad_cluster = BridgeConfig::from_lookup(lookup(&[
            ("WALLETLINK_APP_URL", "https://app.example"),
            ("WALLETLINK_CLUSTER", "moonnet"),
        ]));
        assert!(matches!(
            bad_cluster,
            Err(ConfigError::Invalid { var: "WALLETLINK_CLUSTER", .. })
        ));

        let bad_alias = BridgeConfig::from_lookup(lookup(&[
            ("WALLETLINK_APP_URL", "https://app.example"),
            ("WALLETLINK_METHOD_ALIASES", "connect"),
        ]));
        assert!(matches!(
            bad_alias,
            Err(ConfigError::Invalid { var: "WALLETLINK_METHOD_ALIASES", .. })
        ));

        let bad_flag = BridgeConfig::from_lookup(lookup(&[
            ("WALLETLINK_APP_URL", "https://app.example"),
            ("WALLETLINK_AUTO_CONNECT", "maybe"),
        ]));
        assert!(matches!(
            bad_flag,
            Err(ConfigError::Invalid { var: "WALLETLINK_AUTO_CONNECT", .. })
        ));
    }

    #[test]
    fn builders_override_defaults() {
        let config = BridgeConfig::deep_link("myapp", "https://app.example")
            .with_cluster(Cluster::Testnet)
            .with_auto_connect(true)
            .with_provider_url("https://wallet.example/ul/v1")
            .with_browse_url("https://wallet.example/ul/browse");
        assert_eq!(config.cluster, Cluster::Testnet);
        assert!(config.auto_connect);
        assert_eq!(config.provider_url, "https://wallet.example/ul/v1");
        assert_eq!(config.link.redirect_url("connect"), "myapp://connect");
    }
}
