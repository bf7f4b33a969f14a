use std::default::Default;

/// Contains Config properties which will be used by the ProxySend service
#[derive(Clone)]
pub struct ProxySendConfig {
    /// Whether fake (bot) clients receive per-client packs
    pub include_bots: bool,
    /// Whether relay (broadcast proxy) clients receive per-client packs
    pub include_relays: bool,
    /// Whether replay-recording clients receive per-client packs
    pub include_replays: bool,
    /// Size of the buffer string values are copied back through, including
    /// the terminator. Longer strings written by callbacks are truncated.
    pub max_string_length: usize,
    /// Whether the host may fan the packing pass out across worker threads.
    /// Listeners and registered overrides can only veto this further.
    pub allow_parallel_packing: bool,
    /// Properties always treated as unsigned 32-bit integers, as
    /// `(table name, property name)` pairs
    pub unsigned_bitfields: Vec<(String, String)>,
}

impl Default for ProxySendConfig {
    fn default() -> Self {
        Self {
            include_bots: false,
            include_relays: false,
            include_replays: false,
            max_string_length: 4096,
            allow_parallel_packing: false,
            unsigned_bitfields: vec![
                ("DT_BaseEntity".to_string(), "m_fEffects".to_string()),
                ("DT_BasePlayer".to_string(), "m_fFlags".to_string()),
                ("DT_BaseCombatCharacter".to_string(), "m_fFlags".to_string()),
            ],
        }
    }
}
