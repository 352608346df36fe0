//! Optional knobs carried inside sealed signing requests.

use serde::{Deserialize, Serialize};

/// How far along consensus a block must be before the wallet queries it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Most recent block with one confirmation from the connected node.
    Processed,
    /// Most recent block with one confirmation from the cluster.
    Confirmed,
    /// Most recent block the cluster has finalized.
    Finalized,
    Recent,
    Single,
    #[serde(rename = "root")]
    SingleGossip,
    Max,
}

/// How `signMessage` should show the message to the user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayEncoding {
    #[default]
    Utf8,
    Hex,
}

impl DisplayEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayEncoding::Utf8 => "utf8",
            DisplayEncoding::Hex => "hex",
        }
    }
}

impl std::str::FromStr for DisplayEncoding {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utf8" => Ok(DisplayEncoding::Utf8),
            "hex" => Ok(DisplayEncoding::Hex),
            _ => Err(format!("unknown display encoding {s:?}; expected utf8 or hex")),
        }
    }
}

/// How the wallet should submit a transaction in `signAndSendTransaction`.
///
/// Absent fields are omitted from the JSON so the wallet applies its own
/// defaults.
///
/// ```json
/// { "maxRetries": 3, "preflightCommitment": "confirmed", "skipPreflight": false }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    /// Maximum number of times the RPC node retries sending to the leader.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// The minimum slot the request can be evaluated at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<Commitment>,

    /// Disable the transaction verification step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_preflight: Option<bool>,
}
