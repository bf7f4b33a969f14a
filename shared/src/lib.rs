//! # ProxySend Shared
//! Property interception primitives shared between the proxysend server
//! service and its test harness: property descriptors and classification,
//! packed entity buffers, the override registry with its per-property
//! dispatchers, and the per-thread packing context.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod context;
mod hook;
mod packed;
mod prop;
mod types;

pub use context::{
    pack_context::{
        active_slot, current_params, delta_client, in_diff_step, in_packing_pass,
        ActiveSlotScope, DeltaClientScope, DiffScope, PackScope,
    },
    tick_params::TickPackingParams,
};
pub use hook::{
    binding_table::{Binding, BindingHandle, BindingTable},
    callback::{CallbackArgs, CallbackResult, CallbackValue, HookCallback, PropertyCallback},
    dispatcher::{DispatchContext, PropertyDispatcher},
    error::HookError,
    override_registry::{EntityHookSet, OverrideEntry, OverrideKey, OverrideRegistry},
};
pub use naia_serde::{BitReader, BitWrite, Serde, SerdeErr};
pub use packed::{
    change_list::ChangeList,
    error::EncodeError,
    packed_entity_data::PackedEntityData,
    packed_writer::{PackedBits, PackedWriter, MAX_PACKED_ENTITY_BYTES},
};
pub use prop::{
    classifier::{PropClassifier, StandardProxies},
    error::ClassifyError,
    prop_kind::PropKind,
    send_prop::{same_proxy, PropKey, PropValue, SendProp, SendPropType, SendProxy},
    send_table::{EntityState, SendTable},
};
pub use types::{client_number, CallbackId, ClientSlot, EntityIndex, PluginId, SnapshotId};
