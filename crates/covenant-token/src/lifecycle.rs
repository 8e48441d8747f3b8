//! Token lifecycle: create, renew, revoke, coalesce.
//!
//! Every operation is one atomic action at the ledger level. Renewal
//! spends the old output and emits its replacement in the same action, so
//! a slot never has two outstanding transactions. Failures propagate
//! unchanged: by the time a lifecycle call runs, the grant decision has
//! already been communicated and cannot be retracted.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use covenant_core::{GrantedAccess, Outpoint, PermissionRequest, PermissionToken, Satoshis};
use covenant_wallet::{
    ActionInput, ActionOutput, CreateActionArgs, SignActionArgs, SignActionResult, WalletActions,
    WalletCipher,
};

use crate::error::{Result, TokenError};
use crate::fields::FieldCodec;
use crate::script::TokenScript;
use crate::tags::{grant_tags, originator_label};

/// Satoshis carried by every token output.
pub const TOKEN_SATOSHIS: Satoshis = 1;

/// Unlocking-script length hint for spending a token output. The actual
/// script is constructed by the signing wallet.
const TOKEN_UNLOCK_LEN: u32 = 74;

/// Creates, renews, revokes, and coalesces permission tokens.
#[derive(Clone)]
pub struct TokenLifecycle {
    wallet: Arc<dyn WalletActions>,
    codec: FieldCodec,
}

impl TokenLifecycle {
    /// Create a lifecycle manager over the wallet seams.
    pub fn new(wallet: Arc<dyn WalletActions>, cipher: Arc<dyn WalletCipher>) -> Self {
        Self {
            wallet,
            codec: FieldCodec::new(cipher),
        }
    }

    /// Mint a new token for a granted request.
    pub async fn create(
        &self,
        request: &PermissionRequest,
        expiry: u64,
        amount: Option<Satoshis>,
    ) -> Result<PermissionToken> {
        let access = GrantedAccess::from_request(request, amount);
        let expiry = if request.kind().expires() { expiry } else { 0 };

        let signed = self
            .submit(
                format!("admin create {} permission", request.kind().label()),
                vec![],
                vec![self.token_output(request.originator(), &access, expiry).await?],
                request.originator(),
            )
            .await?;

        debug!(txid = %signed.txid, kind = %request.kind(), "minted permission token");
        Ok(self.assemble(signed, request.originator(), expiry, access))
    }

    /// Replace an existing token in one atomic action.
    pub async fn renew(
        &self,
        old: &PermissionToken,
        request: &PermissionRequest,
        new_expiry: u64,
        new_amount: Option<Satoshis>,
    ) -> Result<PermissionToken> {
        let access = GrantedAccess::from_request(request, new_amount);
        let expiry = if request.kind().expires() { new_expiry } else { 0 };

        let signed = self
            .submit(
                format!("admin renew {} permission", request.kind().label()),
                vec![token_input(old)],
                vec![self.token_output(request.originator(), &access, expiry).await?],
                request.originator(),
            )
            .await?;

        debug!(
            old = %old.outpoint,
            txid = %signed.txid,
            kind = %request.kind(),
            "renewed permission token"
        );
        Ok(self.assemble(signed, request.originator(), expiry, access))
    }

    /// Destroy a token by spending it with no replacement.
    pub async fn revoke(&self, token: &PermissionToken) -> Result<()> {
        let signed = self
            .submit(
                format!("admin revoke {} permission", token.kind().label()),
                vec![token_input(token)],
                vec![],
                &token.originator,
            )
            .await?;

        debug!(outpoint = %token.outpoint, txid = %signed.txid, "revoked permission token");
        Ok(())
    }

    /// Consolidate several tokens of one slot into a single output.
    ///
    /// Requires at least two inputs sharing kind and originator. The
    /// replacement keeps the furthest expiry and (for spending) the
    /// highest authorized amount; input satoshis are preserved in the new
    /// output so coalescing never burns value.
    pub async fn coalesce(&self, tokens: &[PermissionToken]) -> Result<PermissionToken> {
        if tokens.len() < 2 {
            return Err(TokenError::TokenSetMismatch(
                "coalescing requires at least two tokens".into(),
            ));
        }
        let kind = tokens[0].kind();
        let originator = tokens[0].originator.clone();
        if tokens
            .iter()
            .any(|t| t.kind() != kind || t.originator != originator)
        {
            return Err(TokenError::TokenSetMismatch(
                "coalesced tokens must share kind and originator".into(),
            ));
        }

        let keeper = tokens
            .iter()
            .max_by_key(|t| t.expiry)
            .expect("token set is non-empty");
        let expiry = keeper.expiry;
        let access = match kind {
            covenant_core::PermissionType::Spending => GrantedAccess::Spending {
                authorized_amount: tokens
                    .iter()
                    .filter_map(PermissionToken::authorized_amount)
                    .max()
                    .unwrap_or(0),
            },
            _ => keeper.access.clone(),
        };
        let satoshis: Satoshis = tokens.iter().map(|t| t.satoshis).sum();

        let mut output = self.token_output(&originator, &access, expiry).await?;
        output.satoshis = satoshis;

        let signed = self
            .submit(
                format!("admin coalesce {} permission", kind.label()),
                tokens.iter().map(token_input).collect(),
                vec![output],
                &originator,
            )
            .await?;

        debug!(
            inputs = tokens.len(),
            txid = %signed.txid,
            %kind,
            "coalesced permission tokens"
        );
        Ok(PermissionToken {
            tx: signed.tx,
            outpoint: Outpoint::new(signed.txid, 0),
            satoshis,
            originator,
            expiry,
            access,
        })
    }

    async fn token_output(
        &self,
        originator: &str,
        access: &GrantedAccess,
        expiry: u64,
    ) -> Result<ActionOutput> {
        let fields = self
            .codec
            .build_grant_fields(originator, access, expiry)
            .await?;
        Ok(ActionOutput {
            locking_script: Bytes::from(TokenScript::new(fields).to_bytes()),
            satoshis: TOKEN_SATOSHIS,
            basket: Some(access.kind().admin_basket().to_string()),
            tags: grant_tags(originator, access),
            description: format!("{} permission token", access.kind().label()),
        })
    }

    // Token actions are admin bookkeeping, never originator spends: they
    // carry the originator label for auditability but no month label, so
    // spending accounting (which requires both) excludes them.
    async fn submit(
        &self,
        description: String,
        inputs: Vec<ActionInput>,
        outputs: Vec<ActionOutput>,
        originator: &str,
    ) -> Result<SignActionResult> {
        let draft = self
            .wallet
            .create_action(CreateActionArgs {
                description,
                inputs,
                outputs,
                labels: vec![originator_label(originator)],
            })
            .await?;
        Ok(self
            .wallet
            .sign_action(SignActionArgs::wallet_signed(draft.reference))
            .await?)
    }

    fn assemble(
        &self,
        signed: SignActionResult,
        originator: &str,
        expiry: u64,
        access: GrantedAccess,
    ) -> PermissionToken {
        PermissionToken {
            tx: signed.tx,
            outpoint: Outpoint::new(signed.txid, 0),
            satoshis: TOKEN_SATOSHIS,
            originator: originator.to_string(),
            expiry,
            access,
        }
    }
}

fn token_input(token: &PermissionToken) -> ActionInput {
    ActionInput {
        outpoint: token.outpoint,
        unlocking_script_length: TOKEN_UNLOCK_LEN,
        description: format!("{} permission token", token.kind().label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::TokenFinder;
    use covenant_core::{PermissionType, RequestedAccess};
    use covenant_wallet::MemoryWallet;

    fn harness() -> (Arc<MemoryWallet>, TokenFinder, TokenLifecycle) {
        let wallet = Arc::new(MemoryWallet::with_seed([5u8; 32]));
        let finder = TokenFinder::new(wallet.clone(), wallet.clone());
        let lifecycle = TokenLifecycle::new(wallet.clone(), wallet.clone());
        (wallet, finder, lifecycle)
    }

    fn spending_request(satoshis: Satoshis) -> PermissionRequest {
        PermissionRequest::new(
            "example.com",
            RequestedAccess::Spending {
                satoshis,
                line_items: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_create_lands_in_admin_basket() {
        let (wallet, _, lifecycle) = harness();
        let request = spending_request(500);

        let token = lifecycle.create(&request, 0, Some(1000)).await.unwrap();
        assert_eq!(token.authorized_amount(), Some(1000));
        assert_eq!(token.expiry, 0);

        let outputs = wallet.spendable_in_basket(PermissionType::Spending.admin_basket());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].outpoint, token.outpoint);
    }

    #[tokio::test]
    async fn test_renew_replaces_in_one_action() {
        let (wallet, finder, lifecycle) = harness();
        let request = PermissionRequest::new(
            "example.com",
            RequestedAccess::Basket {
                basket: "todo".into(),
            },
        );

        let old = lifecycle.create(&request, 2000, None).await.unwrap();
        let actions_before = wallet.actions().len();

        let renewed = lifecycle
            .renew(&old, &request.clone().with_renewal(true), 9000, None)
            .await
            .unwrap();

        // Exactly one more action; exactly one live token, the new one.
        assert_eq!(wallet.actions().len(), actions_before + 1);
        let outputs = wallet.spendable_in_basket(PermissionType::Basket.admin_basket());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].outpoint, renewed.outpoint);

        let found = finder.find_token(&request, false, 3000).await.unwrap().unwrap();
        assert_eq!(found.expiry, 9000);
    }

    #[tokio::test]
    async fn test_revoke_leaves_nothing() {
        let (wallet, finder, lifecycle) = harness();
        let request = spending_request(500);

        let token = lifecycle.create(&request, 0, Some(1000)).await.unwrap();
        lifecycle.revoke(&token).await.unwrap();

        assert!(wallet
            .spendable_in_basket(PermissionType::Spending.admin_basket())
            .is_empty());
        assert!(finder.find_token(&request, true, 2000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_coalesce_requires_two() {
        let (_, _, lifecycle) = harness();
        let request = spending_request(500);
        let token = lifecycle.create(&request, 0, Some(1000)).await.unwrap();

        assert!(matches!(
            lifecycle.coalesce(std::slice::from_ref(&token)).await,
            Err(TokenError::TokenSetMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_coalesce_consolidates() {
        let (wallet, _, lifecycle) = harness();
        let request = spending_request(500);

        let a = lifecycle.create(&request, 0, Some(1000)).await.unwrap();
        let b = lifecycle.create(&request, 0, Some(4000)).await.unwrap();

        let merged = lifecycle.coalesce(&[a, b]).await.unwrap();
        assert_eq!(merged.authorized_amount(), Some(4000));
        assert_eq!(merged.satoshis, 2 * TOKEN_SATOSHIS);

        let outputs = wallet.spendable_in_basket(PermissionType::Spending.admin_basket());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].outpoint, merged.outpoint);
    }

    #[tokio::test]
    async fn test_coalesce_rejects_mixed_slots() {
        let (_, _, lifecycle) = harness();
        let a = lifecycle
            .create(&spending_request(500), 0, Some(1000))
            .await
            .unwrap();
        let b = lifecycle
            .create(
                &PermissionRequest::new(
                    "other.com",
                    RequestedAccess::Spending {
                        satoshis: 500,
                        line_items: vec![],
                    },
                ),
                0,
                Some(1000),
            )
            .await
            .unwrap();

        assert!(matches!(
            lifecycle.coalesce(&[a, b]).await,
            Err(TokenError::TokenSetMismatch(_))
        ));
    }
}
