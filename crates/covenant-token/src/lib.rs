//! # Covenant Token
//!
//! On-chain permission tokens: the encrypted field codec, the search-tag
//! vocabulary, the finder, and the lifecycle manager.
//!
//! A token is a 1-satoshi output in a reserved admin basket whose locking
//! script embeds the kind's ordered encrypted fields. The tag set attached
//! at mint time doubles as the search index, so any compatible wallet can
//! audit or reconstruct permission state from the ledger alone.

pub mod error;
pub mod fields;
pub mod finder;
pub mod lifecycle;
pub mod script;
pub mod tags;

pub use error::{Result, TokenError};
pub use fields::FieldCodec;
pub use finder::TokenFinder;
pub use lifecycle::{TokenLifecycle, TOKEN_SATOSHIS};
pub use script::{ScriptFormat, TokenScript, SCRIPT_MAGIC};
pub use tags::{build_tags, grant_tags, month_label, originator_label};
