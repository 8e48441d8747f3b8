//! Trait seams to the external wallet services.
//!
//! The permission core never constructs, signs, or broadcasts transactions
//! itself, and never touches key material. Everything ledger- or
//! key-shaped goes through these two traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    CreateActionArgs, CreateActionResult, ListActionsArgs, ListActionsResult, ListOutputsArgs,
    ListOutputsResult, SignActionArgs, SignActionResult,
};

/// The action service: transaction construction, signing, and queries.
///
/// Implementations must be thread-safe (Send + Sync). Calls may suspend
/// indefinitely; the permission core never holds a lock across them.
///
/// # Design Notes
///
/// - **Two-phase submission**: `create_action` produces a signable draft,
///   `sign_action` finalizes it. Unlocking-script construction for spent
///   permission tokens is the signing wallet's concern.
/// - **No retries here**: failures propagate to the caller unchanged;
///   retry policy lives behind this seam.
#[async_trait]
pub trait WalletActions: Send + Sync {
    /// List spendable outputs in a basket, filtered by tags.
    async fn list_outputs(&self, args: ListOutputsArgs) -> Result<ListOutputsResult>;

    /// List recorded actions, filtered by labels.
    async fn list_actions(&self, args: ListActionsArgs) -> Result<ListActionsResult>;

    /// Stage a new transaction and return a signable draft.
    async fn create_action(&self, args: CreateActionArgs) -> Result<CreateActionResult>;

    /// Finalize a previously staged draft.
    async fn sign_action(&self, args: SignActionArgs) -> Result<SignActionResult>;
}

/// The encryption service guarding token field contents.
///
/// The permission core always calls with `key_id = "1"` and
/// `counterparty = "self"`; the parameters exist because the seam is shared
/// with other wallet subsystems that scope keys differently.
#[async_trait]
pub trait WalletCipher: Send + Sync {
    /// Encrypt a plaintext under the derived key.
    async fn encrypt(&self, plaintext: &[u8], key_id: &str, counterparty: &str)
        -> Result<Vec<u8>>;

    /// Decrypt a ciphertext under the derived key.
    async fn decrypt(&self, ciphertext: &[u8], key_id: &str, counterparty: &str)
        -> Result<Vec<u8>>;
}

/// Key id used for all permission-token fields.
pub const TOKEN_KEY_ID: &str = "1";

/// Counterparty used for all permission-token fields.
pub const TOKEN_COUNTERPARTY: &str = "self";
