//! In-memory implementation of the wallet seams.
//!
//! This is primarily for testing. It has the same observable semantics as
//! a real action service but keeps everything in memory: basket/tag-indexed
//! outputs, recorded actions with labels, and two-phase drafts that commit
//! on `sign_action`. Every entry point counts its calls so tests can assert
//! zero-I/O properties.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use covenant_core::{Outpoint, Satoshis, Txid};

use crate::error::{Result, WalletError};
use crate::traits::{WalletActions, WalletCipher};
use crate::types::{
    ActionRecord, CreateActionArgs, CreateActionResult, ListActionsArgs, ListActionsResult,
    ListOutputsArgs, ListOutputsResult, QueryMode, SignActionArgs, SignActionResult, WalletOutput,
};

/// In-memory wallet implementing both seams.
///
/// All data is lost when the wallet is dropped. Thread-safe via RwLock.
pub struct MemoryWallet {
    inner: RwLock<MemoryWalletInner>,
    cipher_seed: [u8; 32],
    list_outputs_calls: AtomicUsize,
    list_actions_calls: AtomicUsize,
    create_action_calls: AtomicUsize,
    sign_action_calls: AtomicUsize,
}

struct MemoryWalletInner {
    /// All outputs ever created, spent or not.
    outputs: Vec<StoredOutput>,

    /// Recorded actions, in creation order.
    actions: Vec<ActionRecord>,

    /// Drafts awaiting `sign_action`, by reference.
    pending: HashMap<String, PendingAction>,

    /// Monotonic counter feeding txid fabrication.
    next_tx: u64,
}

struct StoredOutput {
    outpoint: Outpoint,
    satoshis: Satoshis,
    locking_script: Bytes,
    basket: Option<String>,
    tags: Vec<String>,
    spendable: bool,
}

struct PendingAction {
    args: CreateActionArgs,
    txid: Txid,
}

impl MemoryWallet {
    /// Create a new empty wallet with a random cipher seed.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::with_seed(seed)
    }

    /// Create with a deterministic cipher seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            inner: RwLock::new(MemoryWalletInner {
                outputs: Vec::new(),
                actions: Vec::new(),
                pending: HashMap::new(),
                next_tx: 0,
            }),
            cipher_seed: seed,
            list_outputs_calls: AtomicUsize::new(0),
            list_actions_calls: AtomicUsize::new(0),
            create_action_calls: AtomicUsize::new(0),
            sign_action_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `list_outputs` calls so far.
    pub fn list_outputs_calls(&self) -> usize {
        self.list_outputs_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_actions` calls so far.
    pub fn list_actions_calls(&self) -> usize {
        self.list_actions_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_action` calls so far.
    pub fn create_action_calls(&self) -> usize {
        self.create_action_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_action` calls so far.
    pub fn sign_action_calls(&self) -> usize {
        self.sign_action_calls.load(Ordering::SeqCst)
    }

    /// Seed a recorded action directly, bypassing the draft flow.
    pub fn seed_action(&self, record: ActionRecord) {
        self.inner.write().unwrap().actions.push(record);
    }

    /// Snapshot of recorded actions.
    pub fn actions(&self) -> Vec<ActionRecord> {
        self.inner.read().unwrap().actions.clone()
    }

    /// Spendable outputs currently sitting in a basket.
    pub fn spendable_in_basket(&self, basket: &str) -> Vec<WalletOutput> {
        let inner = self.inner.read().unwrap();
        inner
            .outputs
            .iter()
            .filter(|o| o.spendable && o.basket.as_deref() == Some(basket))
            .map(StoredOutput::to_wallet_output)
            .collect()
    }

    fn fabricate_txid(&self, counter: u64) -> Txid {
        let mut hasher = blake3::Hasher::new_derive_key("covenant-memory-wallet-txid");
        hasher.update(&self.cipher_seed);
        hasher.update(&counter.to_le_bytes());
        Txid::from_bytes(*hasher.finalize().as_bytes())
    }

    fn derive_cipher(&self, key_id: &str, counterparty: &str) -> Result<ChaCha20Poly1305> {
        let mut hasher = blake3::Hasher::new_derive_key("covenant-memory-wallet-cipher");
        hasher.update(&self.cipher_seed);
        hasher.update(&(key_id.len() as u64).to_le_bytes());
        hasher.update(key_id.as_bytes());
        hasher.update(counterparty.as_bytes());
        let key = hasher.finalize();
        ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| WalletError::Cipher(e.to_string()))
    }
}

impl Default for MemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl StoredOutput {
    fn to_wallet_output(&self) -> WalletOutput {
        WalletOutput {
            outpoint: self.outpoint,
            satoshis: self.satoshis,
            locking_script: self.locking_script.clone(),
            spendable: self.spendable,
            tags: self.tags.clone(),
        }
    }
}

fn terms_match(mode: QueryMode, wanted: &[String], present: &[String]) -> bool {
    match mode {
        QueryMode::All => wanted.iter().all(|t| present.contains(t)),
        QueryMode::Any => wanted.iter().any(|t| present.contains(t)),
    }
}

#[async_trait]
impl WalletActions for MemoryWallet {
    async fn list_outputs(&self, args: ListOutputsArgs) -> Result<ListOutputsResult> {
        self.list_outputs_calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().unwrap();

        let matches: Vec<&StoredOutput> = inner
            .outputs
            .iter()
            .filter(|o| o.spendable)
            .filter(|o| o.basket.as_deref() == Some(args.basket.as_str()))
            .filter(|o| args.tags.is_empty() || terms_match(args.tag_query_mode, &args.tags, &o.tags))
            .collect();

        let total = matches.len();
        let outputs: Vec<WalletOutput> = matches
            .iter()
            .take(args.limit)
            .map(|o| o.to_wallet_output())
            .collect();

        // The bundle is opaque to callers; fabricate stable bytes from the
        // returned outpoints.
        let bundle = if args.include_transactions {
            let mut hasher = blake3::Hasher::new_derive_key("covenant-memory-wallet-bundle");
            for output in &outputs {
                hasher.update(output.outpoint.txid.as_bytes());
                hasher.update(&output.outpoint.vout.to_le_bytes());
            }
            Some(Bytes::copy_from_slice(hasher.finalize().as_bytes()))
        } else {
            None
        };

        Ok(ListOutputsResult {
            total,
            outputs,
            bundle,
        })
    }

    async fn list_actions(&self, args: ListActionsArgs) -> Result<ListActionsResult> {
        self.list_actions_calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().unwrap();

        let actions: Vec<ActionRecord> = inner
            .actions
            .iter()
            .filter(|a| {
                args.labels.is_empty()
                    || terms_match(args.label_query_mode, &args.labels, &a.labels)
            })
            .cloned()
            .collect();

        Ok(ListActionsResult {
            total: actions.len(),
            actions,
        })
    }

    async fn create_action(&self, args: CreateActionArgs) -> Result<CreateActionResult> {
        self.create_action_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().unwrap();

        // Validate inputs exist and are spendable before staging anything.
        for input in &args.inputs {
            let found = inner
                .outputs
                .iter()
                .find(|o| o.outpoint == input.outpoint)
                .ok_or_else(|| WalletError::NotFound(format!("output {}", input.outpoint)))?;
            if !found.spendable {
                return Err(WalletError::Rejected(format!(
                    "output {} already spent",
                    input.outpoint
                )));
            }
        }

        inner.next_tx += 1;
        let counter = inner.next_tx;
        let txid = self.fabricate_txid(counter);
        let reference = format!("draft-{counter}");

        inner.pending.insert(
            reference.clone(),
            PendingAction {
                args,
                txid,
            },
        );

        Ok(CreateActionResult {
            reference,
            signable: Bytes::copy_from_slice(txid.as_bytes()),
        })
    }

    async fn sign_action(&self, args: SignActionArgs) -> Result<SignActionResult> {
        self.sign_action_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().unwrap();

        let pending = inner
            .pending
            .remove(&args.reference)
            .ok_or_else(|| WalletError::NotFound(format!("draft {}", args.reference)))?;

        let txid = pending.txid;
        let mut inputs_total: Satoshis = 0;
        let mut outputs_total: Satoshis = 0;

        for input in &pending.args.inputs {
            if let Some(output) = inner
                .outputs
                .iter_mut()
                .find(|o| o.outpoint == input.outpoint)
            {
                output.spendable = false;
                inputs_total += output.satoshis;
            }
        }

        for (vout, output) in pending.args.outputs.iter().enumerate() {
            outputs_total += output.satoshis;
            inner.outputs.push(StoredOutput {
                outpoint: Outpoint::new(txid, vout as u32),
                satoshis: output.satoshis,
                locking_script: output.locking_script.clone(),
                basket: output.basket.clone(),
                tags: output.tags.clone(),
                spendable: true,
            });
        }

        inner.actions.push(ActionRecord {
            txid,
            satoshis: outputs_total - inputs_total,
            description: pending.args.description.clone(),
            labels: pending.args.labels.clone(),
        });

        Ok(SignActionResult {
            txid,
            tx: Bytes::copy_from_slice(txid.as_bytes()),
        })
    }
}

#[async_trait]
impl WalletCipher for MemoryWallet {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
        counterparty: &str,
    ) -> Result<Vec<u8>> {
        let cipher = self.derive_cipher(key_id, counterparty)?;

        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| WalletError::Cipher(e.to_string()))?;

        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &str,
        counterparty: &str,
    ) -> Result<Vec<u8>> {
        if ciphertext.len() < 12 {
            return Err(WalletError::Cipher("ciphertext too short".into()));
        }
        let cipher = self.derive_cipher(key_id, counterparty)?;

        let nonce = Nonce::from_slice(&ciphertext[..12]);
        cipher
            .decrypt(nonce, &ciphertext[12..])
            .map_err(|e| WalletError::Cipher(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{TOKEN_COUNTERPARTY, TOKEN_KEY_ID};
    use crate::types::{ActionInput, ActionOutput};

    fn basket_output(script: &[u8]) -> ActionOutput {
        ActionOutput {
            locking_script: Bytes::copy_from_slice(script),
            satoshis: 1,
            basket: Some("admin basket-access".into()),
            tags: vec!["originator example.com".into()],
            description: "token".into(),
        }
    }

    #[tokio::test]
    async fn test_create_sign_deposits_output() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);

        let created = wallet
            .create_action(CreateActionArgs {
                description: "mint".into(),
                inputs: vec![],
                outputs: vec![basket_output(b"script")],
                labels: vec!["admin originator example.com".into()],
            })
            .await
            .unwrap();

        let signed = wallet
            .sign_action(SignActionArgs::wallet_signed(created.reference))
            .await
            .unwrap();

        let listed = wallet
            .list_outputs(ListOutputsArgs::tagged_all(
                "admin basket-access",
                vec!["originator example.com".into()],
            ))
            .await
            .unwrap();

        assert_eq!(listed.total, 1);
        assert_eq!(listed.outputs[0].outpoint.txid, signed.txid);
        assert!(listed.bundle.is_some());
    }

    #[tokio::test]
    async fn test_tag_query_mode_all() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);

        let created = wallet
            .create_action(CreateActionArgs {
                description: "mint".into(),
                inputs: vec![],
                outputs: vec![basket_output(b"script")],
                labels: vec![],
            })
            .await
            .unwrap();
        wallet
            .sign_action(SignActionArgs::wallet_signed(created.reference))
            .await
            .unwrap();

        // One matching, one missing tag: All fails, Any matches.
        let mut args = ListOutputsArgs::tagged_all(
            "admin basket-access",
            vec![
                "originator example.com".into(),
                "basket todo".into(),
            ],
        );
        assert_eq!(wallet.list_outputs(args.clone()).await.unwrap().total, 0);

        args.tag_query_mode = QueryMode::Any;
        assert_eq!(wallet.list_outputs(args).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_spending_input_consumes_output() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);

        let created = wallet
            .create_action(CreateActionArgs {
                description: "mint".into(),
                inputs: vec![],
                outputs: vec![basket_output(b"script")],
                labels: vec![],
            })
            .await
            .unwrap();
        let signed = wallet
            .sign_action(SignActionArgs::wallet_signed(created.reference))
            .await
            .unwrap();
        let outpoint = Outpoint::new(signed.txid, 0);

        let spend = wallet
            .create_action(CreateActionArgs {
                description: "revoke".into(),
                inputs: vec![ActionInput {
                    outpoint,
                    unlocking_script_length: 73,
                    description: "old token".into(),
                }],
                outputs: vec![],
                labels: vec![],
            })
            .await
            .unwrap();
        wallet
            .sign_action(SignActionArgs::wallet_signed(spend.reference))
            .await
            .unwrap();

        assert!(wallet.spendable_in_basket("admin basket-access").is_empty());

        // Double-spend is rejected at staging time.
        let again = wallet
            .create_action(CreateActionArgs {
                description: "revoke again".into(),
                inputs: vec![ActionInput {
                    outpoint,
                    unlocking_script_length: 73,
                    description: "old token".into(),
                }],
                outputs: vec![],
                labels: vec![],
            })
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_sign_unknown_reference_fails() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);
        let result = wallet
            .sign_action(SignActionArgs::wallet_signed("draft-99"))
            .await;
        assert!(matches!(result, Err(WalletError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cipher_roundtrip() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);

        let ciphertext = wallet
            .encrypt(b"example.com", TOKEN_KEY_ID, TOKEN_COUNTERPARTY)
            .await
            .unwrap();
        assert_ne!(ciphertext, b"example.com");

        let plaintext = wallet
            .decrypt(&ciphertext, TOKEN_KEY_ID, TOKEN_COUNTERPARTY)
            .await
            .unwrap();
        assert_eq!(plaintext, b"example.com");
    }

    #[tokio::test]
    async fn test_cipher_wrong_scope_fails() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);

        let ciphertext = wallet
            .encrypt(b"secret", TOKEN_KEY_ID, TOKEN_COUNTERPARTY)
            .await
            .unwrap();
        assert!(wallet.decrypt(&ciphertext, "2", TOKEN_COUNTERPARTY).await.is_err());
    }

    #[tokio::test]
    async fn test_call_counters() {
        let wallet = MemoryWallet::with_seed([7u8; 32]);
        assert_eq!(wallet.list_outputs_calls(), 0);

        wallet
            .list_outputs(ListOutputsArgs::tagged_all("admin basket-access", vec![]))
            .await
            .unwrap();
        assert_eq!(wallet.list_outputs_calls(), 1);
    }
}
