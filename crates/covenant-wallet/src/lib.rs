//! # Covenant Wallet
//!
//! Trait seams to the external wallet services, plus an in-memory
//! implementation for tests.
//!
//! Persistence is entirely ledger-native: the permission core stores
//! nothing itself, it only asks the action service to list, create, and
//! finalize transactions. The encryption seam is equally opaque; the core
//! never sees key material.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{Result, WalletError};
pub use memory::MemoryWallet;
pub use traits::{WalletActions, WalletCipher, TOKEN_COUNTERPARTY, TOKEN_KEY_ID};
pub use types::{
    ActionInput, ActionOutput, ActionRecord, CreateActionArgs, CreateActionResult,
    ListActionsArgs, ListActionsResult, ListOutputsArgs, ListOutputsResult, QueryMode,
    SignActionArgs, SignActionResult, WalletOutput,
};
