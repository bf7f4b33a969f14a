use thiserror::Error;

use crate::{ClientSlot, EntityIndex};

/// Errors that can occur while encoding an entity into a packed buffer.
///
/// Every variant is fatal for the tick: the host treats it like a protocol
/// violation and nothing produced by the failed pass is transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The host's encoder reported failure
    #[error("SendTable encode returned false (ent {entity})")]
    EncodeFailed { entity: EntityIndex },

    /// The encoded entity did not fit in the packed-entity buffer
    #[error("Packed data for entity {entity} exceeds {max_bytes} bytes")]
    BufferOverflow { entity: EntityIndex, max_bytes: usize },

    /// A per-client re-encode failed
    #[error("Per-client encode of entity {entity} for client slot {slot} failed: {reason}")]
    PerClientEncodeFailed {
        entity: EntityIndex,
        slot: ClientSlot,
        reason: String,
    },
}
