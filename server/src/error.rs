use thiserror::Error;

use proxysend_shared::{EncodeError, SnapshotId};

/// Errors that can occur while computing one tick's client packs.
///
/// All of them are fatal for the tick. When one is returned the tick's
/// packing parameters have already been freed, so nothing produced by the
/// failed pass can reach a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    /// The host's packing call failed while encoding an entity
    #[error("{0}")]
    Encode(#[from] EncodeError),

    /// An interceptor failed an encode during the pass, but the host's
    /// packing call reported success anyway
    #[error("Per-client packing of snapshot {snapshot} failed")]
    PackingFailed { snapshot: SnapshotId },

    /// The override registry lock was poisoned by a panic on another thread
    #[error("Override registry is unavailable (lock poisoned)")]
    StateUnavailable,
}
