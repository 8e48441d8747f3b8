//! Token lookup against the action service.
//!
//! The finder turns a request into a tag query over the kind's admin
//! basket, decodes every candidate, and applies the strict-equality match.
//! It also answers the spending-accounting question: how much has an
//! originator spent this month.

use std::sync::Arc;

use tracing::{debug, warn};

use covenant_core::{Month, PermissionRequest, PermissionToken, Satoshis};
use covenant_wallet::{
    ListActionsArgs, ListOutputsArgs, QueryMode, WalletActions, WalletCipher,
};

use crate::error::Result;
use crate::fields::FieldCodec;
use crate::tags::{build_tags, month_label, originator_label};

/// Locates permission tokens on the ledger.
#[derive(Clone)]
pub struct TokenFinder {
    wallet: Arc<dyn WalletActions>,
    codec: FieldCodec,
}

impl TokenFinder {
    /// Create a finder over the wallet seams.
    pub fn new(wallet: Arc<dyn WalletActions>, cipher: Arc<dyn WalletCipher>) -> Self {
        Self {
            wallet,
            codec: FieldCodec::new(cipher),
        }
    }

    /// Find the token matching a request, if one exists.
    ///
    /// Live tokens are preferred; an expired token is returned only when
    /// `include_expired` is set and no live token matches. More than one
    /// live match for a slot is a data-integrity anomaly: it is logged and
    /// the first match returned, never silently merged.
    pub async fn find_token(
        &self,
        request: &PermissionRequest,
        include_expired: bool,
        now: u64,
    ) -> Result<Option<PermissionToken>> {
        let kind = request.kind();
        let listed = self
            .wallet
            .list_outputs(ListOutputsArgs::tagged_all(
                kind.admin_basket(),
                build_tags(request),
            ))
            .await?;

        let bundle = listed.bundle.unwrap_or_default();
        let mut live = Vec::new();
        let mut expired = Vec::new();

        for output in &listed.outputs {
            let Some(token) = self.codec.decode_token(kind, output, bundle.clone()).await
            else {
                debug!(outpoint = %output.outpoint, %kind, "skipping undecodable output");
                continue;
            };
            if !token.satisfies(request) {
                continue;
            }
            if token.is_expired(now) {
                expired.push(token);
            } else {
                live.push(token);
            }
        }

        if live.len() > 1 {
            warn!(
                count = live.len(),
                originator = request.originator(),
                %kind,
                "multiple live permission tokens for one slot"
            );
        }

        if let Some(token) = live.into_iter().next() {
            return Ok(Some(token));
        }
        if include_expired {
            return Ok(expired.into_iter().next());
        }
        Ok(None)
    }

    /// Total satoshis an originator has spent in the given month.
    ///
    /// Sums the absolute satoshi delta of every action carrying both the
    /// originator and the month label.
    pub async fn spent_since(&self, originator: &str, month: &Month) -> Result<Satoshis> {
        let listed = self
            .wallet
            .list_actions(ListActionsArgs {
                labels: vec![originator_label(originator), month_label(month)],
                label_query_mode: QueryMode::All,
            })
            .await?;

        Ok(listed.actions.iter().map(|a| a.satoshis.abs()).sum())
    }
}
