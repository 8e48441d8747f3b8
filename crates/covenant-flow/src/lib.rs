//! # Covenant Flow
//!
//! The asynchronous request machinery: a TTL cache over verified grants,
//! an active-request tracker that deduplicates concurrent identical
//! requests, and the event bus carrying pending requests to the UI
//! boundary.
//!
//! All shared state is owned per manager instance; nothing here is
//! process-global.

pub mod active;
pub mod cache;
pub mod error;
pub mod events;

pub use active::{ActiveRequestTracker, Decision, Pending, Registration};
pub use cache::{CachedPermission, PermissionCache, DEFAULT_CACHE_TTL};
pub use error::{FlowError, Result};
pub use events::{EventBus, GroupedRequestEvent, PermissionEvents, RequestEvent};
