//! `wlink` — walletlink command-line interface.
//!
//! Offline tooling for apps that talk to a wallet over redirect links:
//!
//! - **`keygen`** / **`nonce`** — fresh X25519 keys and 24-byte nonces.
//! - **`redirect`** — the redirect link a wallet will answer a method on.
//! - **`parse`** — split an inbound URL into its parts and params.
//! - **`browse-url`** — the in-app browser link for a page.
//! - **`encrypt`** / **`decrypt`** — seal or open a payload captured from
//!   the wire, given one side's private key and the other's public key.
//!
//! Link options fall back to the same `WALLETLINK_*` variables the bridge
//! reads. Diagnostics go to stderr; set `RUST_LOG=wlink=debug` for detail.

use std::io::{self, Read};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, warn};
use walletlink::crypto::random_private_key;
use walletlink::{codec, LinkConfig, LinkMessage, Nonce, ParsedUrl, SecureSession};
use walletlink_bridge::{browse_url, BridgeConfig};

/// wlink — walletlink CLI
///
/// Build, parse and decrypt wallet redirect links.
#[derive(Parser)]
#[command(name = "wlink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct LinkArgs {
    /// Redirect link scheme.
    #[arg(long, env = "WALLETLINK_SCHEME", default_value = "walletlink")]
    scheme: String,

    /// Universal link domain. Omit for a custom-scheme deep link.
    #[arg(long, env = "WALLETLINK_DOMAIN")]
    domain: Option<String>,

    /// Path segment in front of every method name.
    #[arg(long, env = "WALLETLINK_PATH_PREFIX")]
    prefix: Option<String>,

    /// Method renaming as logical=wire. Repeat for several.
    #[arg(long = "alias", value_name = "LOGICAL=WIRE")]
    aliases: Vec<String>,
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Own X25519 private key, base58.
    #[arg(long, value_name = "BASE58")]
    private_key: String,

    /// The other side's X25519 public key, base58.
    #[arg(long, value_name = "BASE58")]
    peer_public_key: String,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an X25519 key pair and print it as JSON.
    ///
    /// The private key is printed in the clear. Use it for test fixtures and
    /// offline decryption only.
    Keygen,

    /// Print a fresh 24-byte nonce, base58.
    Nonce,

    /// Print the redirect link a wallet answers METHOD on.
    ///
    /// Examples:
    ///   wlink redirect connect --scheme myapp
    ///   wlink redirect connect --scheme https --domain app.example.com \
    ///     --prefix wallet --alias connect=onConnect
    Redirect {
        /// Logical method name, e.g. connect or signMessage.
        method: String,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Parse an inbound redirect URL and print its parts as JSON.
    Parse {
        /// The full URL, quoted.
        url: String,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Print the link that opens URL in the wallet's in-app browser.
    BrowseUrl {
        /// Page to open.
        url: String,

        /// App metadata URL sent as the referrer.
        #[arg(long, env = "WALLETLINK_APP_URL")]
        app_url: String,

        /// In-app browser entry point.
        #[arg(long, env = "WALLETLINK_BROWSE_URL")]
        browse_base: Option<String>,
    },

    /// Seal a UTF-8 payload and print {nonce, payload} as JSON.
    ///
    /// Pass `-` as PLAINTEXT to read from stdin.
    Encrypt {
        #[command(flatten)]
        keys: KeyArgs,

        /// Nonce to seal under, base58. A fresh one is drawn when omitted.
        #[arg(long, value_name = "BASE58")]
        nonce: Option<String>,

        plaintext: String,
    },

    /// Open a sealed payload captured from a request or an answer.
    Decrypt {
        #[command(flatten)]
        keys: KeyArgs,

        /// The nonce sent alongside the payload, base58.
        #[arg(long, value_name = "BASE58")]
        nonce: String,

        /// The sealed `payload` or `data` value, base58.
        ciphertext: String,
    },
}

#[derive(Serialize)]
struct KeygenOutput {
    private_key: String,
    public_key: String,
}

#[derive(Serialize)]
struct ParseOutput {
    scheme: String,
    domain: Option<String>,
    method_path: Option<String>,
    fragment: Option<String>,
    method: Option<String>,
    logical_method: Option<String>,
    params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct SealedOutput {
    nonce: String,
    payload: String,
}

/// Used when `RUST_LOG` is unset. Targets this binary's own events.
const DEFAULT_LOG_FILTER: &str = "wlink=warn";

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Keygen => {
            let private_key = random_private_key();
            let session = SecureSession::from_private_key(private_key);
            print_json(&KeygenOutput {
                private_key: codec::encode(private_key),
                public_key: session.public_key_base58(),
            });
        }

        Command::Nonce => println!("{}", codec::encode(walletlink::nonce())),

        Command::Redirect { method, link } => {
            println!("{}", link_config(link).redirect_url(&method));
        }

        Command::Parse { url, link } => {
            let config = link_config(link);
            let parsed = ParsedUrl::parse(&url).unwrap_or_else(|e| fatal(&e.to_string()));
            let message = LinkMessage::from_url(&url, &config)
                .map_err(|e| warn!(error = %e, "url would not be routed to a pending call"))
                .ok();
            let params = parsed
                .params()
                .unwrap_or_else(|e| fatal(&e.to_string()))
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                .collect();
            let method = message.map(|m| m.method);
            print_json(&ParseOutput {
                logical_method: method
                    .as_deref()
                    .map(|m| config.logical_method(m).to_string()),
                method,
                scheme: parsed.scheme,
                domain: parsed.domain,
                method_path: parsed.method_path,
                fragment: parsed.fragment,
                params,
            });
        }

        Command::BrowseUrl {
            url,
            app_url,
            browse_base,
        } => {
            let mut config = BridgeConfig::deep_link("walletlink", app_url);
            if let Some(base) = browse_base {
                config = config.with_browse_url(base);
            }
            debug!(browse_base = %config.browse_url, "building browse link");
            println!("{}", browse_url(&config, &url));
        }

        Command::Encrypt {
            keys,
            nonce,
            plaintext,
        } => {
            let session = established(&keys);
            let nonce = match nonce {
                Some(text) => decode_nonce(&text),
                None => walletlink::nonce(),
            };
            let plaintext = read_arg(plaintext);
            let payload = session
                .encrypt(&plaintext, &nonce)
                .unwrap_or_else(|e| fatal(&e.to_string()));
            print_json(&SealedOutput {
                nonce: codec::encode(nonce),
                payload,
            });
        }

        Command::Decrypt {
            keys,
            nonce,
            ciphertext,
        } => {
            let session = established(&keys);
            match session.decrypt(ciphertext.trim(), &decode_nonce(&nonce)) {
                Ok(plaintext) => println!("{plaintext}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
    }
}

fn link_config(args: LinkArgs) -> LinkConfig {
    let mut config = match args.domain {
        Some(domain) => LinkConfig::universal_link(args.scheme, domain),
        None => LinkConfig::deep_link(args.scheme),
    };
    if let Some(prefix) = args.prefix {
        config = config.with_path_prefix(prefix);
    }
    for raw in &args.aliases {
        let (logical, wire) = raw.split_once('=').unwrap_or_else(|| {
            fatal(&format!("invalid --alias {raw:?}: expected format logical=wire"))
        });
        config = config.with_alias(logical.trim(), wire.trim());
    }
    debug!(?config, "link configuration");
    config
}

/// A session rebuilt from `keys` with the shared secret already derived.
fn established(keys: &KeyArgs) -> SecureSession {
    let private_key = codec::decode_array(keys.private_key.trim())
        .unwrap_or_else(|e| fatal(&format!("--private-key: {e}")));
    let peer = codec::decode_array(keys.peer_public_key.trim())
        .unwrap_or_else(|e| fatal(&format!("--peer-public-key: {e}")));
    let mut session = SecureSession::from_private_key(private_key);
    session
        .derive_shared_secret(&peer)
        .unwrap_or_else(|e| fatal(&e.to_string()));
    session
}

fn decode_nonce(text: &str) -> Nonce {
    codec::decode_array(text.trim()).unwrap_or_else(|e| fatal(&format!("--nonce: {e}")))
}

/// The argument itself, or all of stdin when it is `"-"`.
fn read_arg(arg: String) -> String {
    if arg != "-" {
        return arg;
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
    buf
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("failed to render output: {e}")),
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("wlink: {}", msg);
    process::exit(2);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_targets_this_binary() {
        let target = DEFAULT_LOG_FILTER.split('=').next().unwrap();
        assert_eq!(Some(target), module_path!().split("::").next());
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn link_config_applies_alias_args() {
        let config = link_config(LinkArgs {
            scheme: "myapp".into(),
            domain: None,
            prefix: None,
            aliases: vec!["connect = onConnect".into()],
        });
        assert_eq!(config.redirect_url("connect"), "myapp://onConnect");
    }
}
