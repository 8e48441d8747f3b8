//! Event dispatch to the UI boundary.
//!
//! The manager never renders anything; it hands `{request, request_id}`
//! pairs to registered listeners and waits for `grant`/`deny` to come back
//! through the public entry points. Listener failures are logged and never
//! fail the dispatch: a broken UI must not wedge a gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use covenant_core::{GroupedPermissionRequest, PermissionRequest, PermissionType, RequestId};

/// A pending single request, as seen by the UI boundary.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// Snapshot of the request awaiting a decision.
    pub request: PermissionRequest,
    /// Id to pass back to `grant`/`deny`.
    pub request_id: RequestId,
}

/// A pending grouped request, as seen by the UI boundary.
#[derive(Debug, Clone)]
pub struct GroupedRequestEvent {
    /// Snapshot of the group awaiting a decision.
    pub group: GroupedPermissionRequest,
    /// Id to pass back to `grant_grouped`/`deny_grouped`.
    pub request_id: RequestId,
}

/// Listener for permission requests.
///
/// All methods default to no-ops so implementations only handle the
/// domains they care about.
#[async_trait]
pub trait PermissionEvents: Send + Sync {
    /// A protocol permission is awaiting a decision.
    async fn protocol_permission_requested(&self, event: RequestEvent) -> anyhow::Result<()> {
        let _ = event;
        Ok(())
    }

    /// A basket access is awaiting a decision.
    async fn basket_access_requested(&self, event: RequestEvent) -> anyhow::Result<()> {
        let _ = event;
        Ok(())
    }

    /// A certificate disclosure is awaiting a decision.
    async fn certificate_access_requested(&self, event: RequestEvent) -> anyhow::Result<()> {
        let _ = event;
        Ok(())
    }

    /// A spending authorization is awaiting a decision.
    async fn spending_authorization_requested(&self, event: RequestEvent) -> anyhow::Result<()> {
        let _ = event;
        Ok(())
    }

    /// A grouped permission is awaiting a decision.
    async fn grouped_permission_requested(&self, event: GroupedRequestEvent) -> anyhow::Result<()> {
        let _ = event;
        Ok(())
    }
}

/// Listener registry with handle-based unbinding.
pub struct EventBus {
    listeners: RwLock<Vec<(usize, Arc<dyn PermissionEvents>)>>,
    next_handle: AtomicUsize,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_handle: AtomicUsize::new(0),
        }
    }

    /// Register a listener; returns a handle for `unbind`.
    pub async fn bind(&self, listener: Arc<dyn PermissionEvents>) -> usize {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().await.push((handle, listener));
        handle
    }

    /// Remove a listener. Returns whether the handle was known.
    pub async fn unbind(&self, handle: usize) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    /// Dispatch a single-request event to every listener.
    pub async fn dispatch_request(&self, kind: PermissionType, event: RequestEvent) {
        for listener in self.snapshot().await {
            let result = match kind {
                PermissionType::Protocol => {
                    listener.protocol_permission_requested(event.clone()).await
                }
                PermissionType::Basket => listener.basket_access_requested(event.clone()).await,
                PermissionType::Certificate => {
                    listener.certificate_access_requested(event.clone()).await
                }
                PermissionType::Spending => {
                    listener.spending_authorization_requested(event.clone()).await
                }
            };
            if let Err(error) = result {
                warn!(%kind, %error, "permission event listener failed");
            }
        }
    }

    /// Dispatch a grouped-request event to every listener.
    pub async fn dispatch_grouped(&self, event: GroupedRequestEvent) {
        for listener in self.snapshot().await {
            if let Err(error) = listener.grouped_permission_requested(event.clone()).await {
                warn!(%error, "grouped permission event listener failed");
            }
        }
    }

    /// Number of bound listeners.
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    // Clone the Arc list so no lock is held across listener awaits.
    async fn snapshot(&self) -> Vec<Arc<dyn PermissionEvents>> {
        self.listeners
            .read()
            .await
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
