//! # ProxySend Server
//! Sends different serialized entity state to different connected clients.
//! Wraps the host's snapshot encode, delta and packed-entity fetch calls,
//! runs registered property callbacks once per eligible client, and feeds
//! each client its own packed bytes during transmission.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use proxysend_shared::{
        client_number, CallbackArgs, CallbackId, CallbackResult, CallbackValue, ChangeList,
        ClientSlot, EntityIndex, EntityState, HookCallback, PackedBits, PluginId, PropKind,
        PropValue, SendProp, SendPropType, SendProxy, SendTable, StandardProxies,
    };
}

mod error;
mod host;
mod intercept;
mod listener;
mod orchestrator;
mod proxy_send;
mod server_config;

pub use error::PackError;
pub use host::{
    ClientInfo, ClientKind, EntityMetadata, FrameSnapshot, PackedEntity, PackedEntitySource,
    PropertyLeaf, TableEncoder,
};
pub use intercept::{
    BufferSupplyInterceptor, DeltaWriter, DiffInterceptor, EncodeInterceptor, InterceptorSwitch,
};
pub use listener::{PackListener, PackListeners};
pub use orchestrator::{PackState, SnapshotOrchestrator};
pub use proxy_send::ProxySend;
pub use server_config::ProxySendConfig;
