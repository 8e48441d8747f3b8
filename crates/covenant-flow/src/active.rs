//! Active-request tracking and waiter fan-out.
//!
//! Concurrent identical requests coalesce into one entry servicing N
//! waiters: one UI prompt, N independent resolution signals. Each waiter
//! holds its own oneshot receiver fed by the shared grant/deny event; a
//! pending request resolves exactly once, by whichever of grant or deny
//! arrives first.

use std::collections::HashMap;

use tokio::sync::{oneshot, RwLock};

use covenant_core::{
    Fingerprint, GroupedPermissionRequest, PermissionRequest, PermissionToken, RequestId,
};

use crate::error::{FlowError, Result};

/// The decision the UI boundary hands back for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Granted, with the expiry the new or renewed token will carry.
    Granted {
        /// Unix-seconds expiry communicated to every waiter.
        expiry: u64,
    },
    /// Denied.
    Denied,
}

/// What a pending entry is waiting on.
#[derive(Debug, Clone)]
pub enum Pending {
    /// A single permission request.
    Single {
        /// Snapshot of the request.
        request: PermissionRequest,
        /// The expired token being renewed, when this is a renewal flow.
        previous: Option<PermissionToken>,
    },
    /// A grouped (BRC-73) request.
    Grouped {
        /// Snapshot of the group.
        group: GroupedPermissionRequest,
    },
}

impl Pending {
    fn kind_name(&self) -> &'static str {
        match self {
            Pending::Single { .. } => "single",
            Pending::Grouped { .. } => "grouped",
        }
    }
}

struct ActiveRequest {
    pending: Pending,
    waiters: Vec<oneshot::Sender<Decision>>,
}

/// Outcome of registering interest in a slot.
pub enum Registration {
    /// This caller created the entry and must dispatch the UI callback.
    New {
        /// Id to hand to the UI boundary.
        request_id: RequestId,
        /// This caller's resolution signal.
        rx: oneshot::Receiver<Decision>,
    },
    /// An identical request is already pending; await its outcome.
    Joined {
        /// This caller's resolution signal.
        rx: oneshot::Receiver<Decision>,
    },
}

/// Per-manager registry of in-flight requests.
pub struct ActiveRequestTracker {
    inner: RwLock<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    by_fingerprint: HashMap<Fingerprint, ActiveRequest>,
    by_id: HashMap<RequestId, Fingerprint>,
}

impl ActiveRequestTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TrackerInner::default()),
        }
    }

    /// Register interest in a slot.
    ///
    /// If an identical request is already pending, the caller joins it and
    /// `pending` is discarded; otherwise a new entry is created.
    pub async fn register(&self, fingerprint: Fingerprint, pending: Pending) -> Registration {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.by_fingerprint.get_mut(&fingerprint) {
            entry.waiters.push(tx);
            return Registration::Joined { rx };
        }

        let request_id = RequestId::generate();
        inner.by_fingerprint.insert(
            fingerprint,
            ActiveRequest {
                pending,
                waiters: vec![tx],
            },
        );
        inner.by_id.insert(request_id, fingerprint);

        Registration::New { request_id, rx }
    }

    /// Resolve a pending single request, fanning the decision out to every
    /// waiter.
    ///
    /// Returns the request snapshot and the token under renewal, if any.
    /// Unknown ids and grouped entries fail without mutating anything.
    pub async fn resolve_single(
        &self,
        request_id: &RequestId,
        decision: Decision,
    ) -> Result<(PermissionRequest, Option<PermissionToken>)> {
        match self.take(request_id, false, decision).await? {
            Pending::Single { request, previous } => Ok((request, previous)),
            Pending::Grouped { .. } => unreachable!("kind checked before removal"),
        }
    }

    /// Resolve a pending grouped request, fanning the decision out to every
    /// waiter.
    pub async fn resolve_grouped(
        &self,
        request_id: &RequestId,
        decision: Decision,
    ) -> Result<GroupedPermissionRequest> {
        match self.take(request_id, true, decision).await? {
            Pending::Grouped { group } => Ok(group),
            Pending::Single { .. } => unreachable!("kind checked before removal"),
        }
    }

    /// Number of in-flight entries.
    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.by_fingerprint.len()
    }

    async fn take(
        &self,
        request_id: &RequestId,
        want_grouped: bool,
        decision: Decision,
    ) -> Result<Pending> {
        let mut inner = self.inner.write().await;

        let fingerprint = *inner
            .by_id
            .get(request_id)
            .ok_or_else(|| FlowError::RequestNotFound(request_id.to_hex()))?;

        // Check the kind before touching anything: a mismatched entry
        // point must leave the request pending.
        let entry = inner
            .by_fingerprint
            .get(&fingerprint)
            .expect("id index and entry map are updated together");
        let is_grouped = matches!(entry.pending, Pending::Grouped { .. });
        if is_grouped != want_grouped {
            return Err(FlowError::KindMismatch(format!(
                "request {} is {}, not {}",
                request_id.to_hex(),
                entry.pending.kind_name(),
                if want_grouped { "grouped" } else { "single" },
            )));
        }

        inner.by_id.remove(request_id);
        let entry = inner
            .by_fingerprint
            .remove(&fingerprint)
            .expect("entry presence checked above");

        // Every waiter gets its own signal; dropped receivers are fine.
        for waiter in entry.waiters {
            let _ = waiter.send(decision);
        }

        Ok(entry.pending)
    }
}

impl Default for ActiveRequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{request_fingerprint, RequestedAccess};

    fn request(basket: &str) -> PermissionRequest {
        PermissionRequest::new(
            "example.com",
            RequestedAccess::Basket {
                basket: basket.into(),
            },
        )
    }

    fn pending(basket: &str) -> Pending {
        Pending::Single {
            request: request(basket),
            previous: None,
        }
    }

    #[tokio::test]
    async fn test_first_registration_is_new() {
        let tracker = ActiveRequestTracker::new();
        let fp = request_fingerprint(&request("todo"));

        match tracker.register(fp, pending("todo")).await {
            Registration::New { .. } => {}
            Registration::Joined { .. } => panic!("expected a new entry"),
        }
        assert_eq!(tracker.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_identical_requests_coalesce() {
        let tracker = ActiveRequestTracker::new();
        let fp = request_fingerprint(&request("todo"));

        let first = tracker.register(fp, pending("todo")).await;
        let Registration::New { request_id, rx } = first else {
            panic!("expected a new entry");
        };

        let mut receivers = vec![rx];
        for _ in 0..4 {
            match tracker.register(fp, pending("todo")).await {
                Registration::Joined { rx } => receivers.push(rx),
                Registration::New { .. } => panic!("duplicate entry created"),
            }
        }
        assert_eq!(tracker.pending_count().await, 1);

        tracker
            .resolve_single(&request_id, Decision::Granted { expiry: 42 })
            .await
            .unwrap();

        // Every waiter receives its own independent signal.
        for rx in receivers {
            assert_eq!(rx.await.unwrap(), Decision::Granted { expiry: 42 });
        }
        assert_eq!(tracker.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_deny_fans_out() {
        let tracker = ActiveRequestTracker::new();
        let fp = request_fingerprint(&request("todo"));

        let Registration::New { request_id, rx } = tracker.register(fp, pending("todo")).await
        else {
            panic!("expected a new entry");
        };

        tracker
            .resolve_single(&request_id, Decision::Denied)
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), Decision::Denied);
    }

    #[tokio::test]
    async fn test_unknown_id_mutates_nothing() {
        let tracker = ActiveRequestTracker::new();
        let fp = request_fingerprint(&request("todo"));
        tracker.register(fp, pending("todo")).await;

        let bogus = RequestId::generate();
        let result = tracker
            .resolve_single(&bogus, Decision::Granted { expiry: 0 })
            .await;
        assert!(matches!(result, Err(FlowError::RequestNotFound(_))));
        assert_eq!(tracker.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_kind_mismatch_leaves_entry_pending() {
        let tracker = ActiveRequestTracker::new();
        let fp = Fingerprint::from_bytes([7u8; 32]);
        let group = GroupedPermissionRequest::new("example.com").with_access(
            RequestedAccess::Basket {
                basket: "todo".into(),
            },
        );

        let Registration::New { request_id, rx } = tracker
            .register(fp, Pending::Grouped { group })
            .await
        else {
            panic!("expected a new entry");
        };

        let result = tracker
            .resolve_single(&request_id, Decision::Denied)
            .await;
        assert!(matches!(result, Err(FlowError::KindMismatch(_))));
        assert_eq!(tracker.pending_count().await, 1);

        // The proper entry point still works afterwards.
        tracker
            .resolve_grouped(&request_id, Decision::Denied)
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), Decision::Denied);
    }

    #[tokio::test]
    async fn test_resolution_is_single_shot() {
        let tracker = ActiveRequestTracker::new();
        let fp = request_fingerprint(&request("todo"));

        let Registration::New { request_id, .. } = tracker.register(fp, pending("todo")).await
        else {
            panic!("expected a new entry");
        };

        tracker
            .resolve_single(&request_id, Decision::Granted { expiry: 1 })
            .await
            .unwrap();

        let again = tracker
            .resolve_single(&request_id, Decision::Denied)
            .await;
        assert!(matches!(again, Err(FlowError::RequestNotFound(_))));
    }
}
