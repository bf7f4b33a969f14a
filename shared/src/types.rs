/// Index of an entity in the host's entity table
pub type EntityIndex = u32;
/// Zero-based index of a connected client
pub type ClientSlot = u16;
/// Identity of a frame snapshot (the host tick it was taken on)
pub type SnapshotId = u32;

/// Identifies the script plugin that owns a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub u32);

/// Identity of one registered callback: the owning plugin plus the
/// plugin-local function id. Two registrations with the same id are the
/// same callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId {
    pub plugin: PluginId,
    pub function: u32,
}

impl CallbackId {
    pub fn new(plugin: PluginId, function: u32) -> Self {
        Self { plugin, function }
    }
}

/// Converts a zero-based client slot into the 1-based client number handed
/// to callbacks
pub fn client_number(slot: ClientSlot) -> u32 {
    u32::from(slot) + 1
}
