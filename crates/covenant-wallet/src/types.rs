//! Argument and result types for the action-service seam.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use covenant_core::{Outpoint, Satoshis, Txid};

/// How a multi-valued filter combines its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryMode {
    /// Every term must match.
    All,
    /// Any term may match.
    Any,
}

/// Arguments to `list_outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOutputsArgs {
    /// Basket to search within.
    pub basket: String,
    /// Tag filter terms.
    pub tags: Vec<String>,
    /// How the tag terms combine.
    pub tag_query_mode: QueryMode,
    /// Whether to return the backing transaction bundle.
    pub include_transactions: bool,
    /// Maximum outputs to return.
    pub limit: usize,
}

impl ListOutputsArgs {
    /// Query a basket for outputs matching every tag, with transactions.
    pub fn tagged_all(basket: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            basket: basket.into(),
            tags,
            tag_query_mode: QueryMode::All,
            include_transactions: true,
            limit: 10_000,
        }
    }
}

/// One spendable output as reported by the action service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletOutput {
    /// Where the output lives.
    pub outpoint: Outpoint,
    /// Amount carried.
    pub satoshis: Satoshis,
    /// The locking script bytes.
    pub locking_script: Bytes,
    /// Whether the output is currently spendable.
    pub spendable: bool,
    /// Tags attached at creation.
    pub tags: Vec<String>,
}

/// Result of `list_outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOutputsResult {
    /// Total number of matches (before the limit).
    pub total: usize,
    /// The matching outputs.
    pub outputs: Vec<WalletOutput>,
    /// Backing transaction bundle, present when requested.
    pub bundle: Option<Bytes>,
}

/// Arguments to `list_actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListActionsArgs {
    /// Label filter terms.
    pub labels: Vec<String>,
    /// How the label terms combine.
    pub label_query_mode: QueryMode,
}

/// One recorded action (transaction) as reported by the action service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The finalized transaction id.
    pub txid: Txid,
    /// Net satoshi delta to the wallet (negative for outgoing).
    pub satoshis: Satoshis,
    /// Human-readable description.
    pub description: String,
    /// Labels attached at creation.
    pub labels: Vec<String>,
}

/// Result of `list_actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListActionsResult {
    /// Total number of matches.
    pub total: usize,
    /// The matching actions.
    pub actions: Vec<ActionRecord>,
}

/// One input to a new action.
///
/// Unlocking-script construction belongs to the signing wallet; callers
/// supply only the outpoint, a length hint, and a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
    /// The output being spent.
    pub outpoint: Outpoint,
    /// Expected unlocking script length, for fee sizing.
    pub unlocking_script_length: u32,
    /// Human-readable description.
    pub description: String,
}

/// One output of a new action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// The locking script.
    pub locking_script: Bytes,
    /// Amount to carry.
    pub satoshis: Satoshis,
    /// Basket to deposit the output into, if any.
    pub basket: Option<String>,
    /// Tags to index the output under.
    pub tags: Vec<String>,
    /// Human-readable description.
    pub description: String,
}

/// Arguments to `create_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateActionArgs {
    /// Human-readable description of the action.
    pub description: String,
    /// Inputs to spend.
    pub inputs: Vec<ActionInput>,
    /// Outputs to create.
    pub outputs: Vec<ActionOutput>,
    /// Labels to index the action under.
    pub labels: Vec<String>,
}

/// Result of `create_action`: a signable draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateActionResult {
    /// Handle used to finalize the draft.
    pub reference: String,
    /// The draft transaction, opaque to this core.
    pub signable: Bytes,
}

/// Arguments to `sign_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignActionArgs {
    /// The draft to finalize.
    pub reference: String,
    /// Caller-supplied unlocking scripts by input index. Inputs absent
    /// from the map are unlocked by the signing wallet itself.
    pub spends: BTreeMap<u32, Bytes>,
}

impl SignActionArgs {
    /// Finalize a draft with wallet-derived unlocking throughout.
    pub fn wallet_signed(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            spends: BTreeMap::new(),
        }
    }
}

/// Result of `sign_action`: the finalized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignActionResult {
    /// The finalized transaction id.
    pub txid: Txid,
    /// The finalized transaction bundle.
    pub tx: Bytes,
}
