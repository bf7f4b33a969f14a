use std::sync::Arc;

use crate::{CallbackId, EntityIndex, PluginId, PropKind, PropValue};

/// A property value in the shape a script callback receives it: integers as
/// a single cell by reference, vectors as a 3-element copy-back array,
/// strings as a copy-back buffer of bounded length.
#[derive(Clone, Debug, PartialEq)]
pub enum CallbackValue {
    Cell(i32),
    Float(f32),
    Vector([f32; 3]),
    String(String),
}

impl CallbackValue {
    /// Converts a raw property value for a callback. Returns `None` when the
    /// value does not have the shape `kind` expects.
    pub fn marshal(kind: PropKind, value: &PropValue, max_length: usize) -> Option<Self> {
        match (kind, value) {
            (kind, PropValue::Int(value)) if kind.is_integer() => {
                Some(CallbackValue::Cell(*value as i32))
            }
            (PropKind::Float, PropValue::Float(value)) => Some(CallbackValue::Float(*value)),
            (PropKind::Vector | PropKind::QAngle, PropValue::Vector(value)) => {
                Some(CallbackValue::Vector(*value))
            }
            (PropKind::String, PropValue::String(value)) => {
                Some(CallbackValue::String(truncate(value, max_length)))
            }
            _ => None,
        }
    }

    /// Converts a callback's copy-back value into a property value of `kind`
    pub fn unmarshal(self, kind: PropKind, max_length: usize) -> Option<PropValue> {
        match (kind, self) {
            (kind, CallbackValue::Cell(value)) if kind.is_integer() => {
                Some(PropValue::Int(kind.narrow(value as i64)))
            }
            (PropKind::Float, CallbackValue::Float(value)) => Some(PropValue::Float(value)),
            (PropKind::Vector | PropKind::QAngle, CallbackValue::Vector(value)) => {
                Some(PropValue::Vector(value))
            }
            (PropKind::String, CallbackValue::String(value)) => {
                Some(PropValue::String(truncate(&value, max_length)))
            }
            _ => None,
        }
    }
}

// copy-back buffers are nul-terminated, so at most max_length - 1 bytes survive
fn truncate(value: &str, max_length: usize) -> String {
    let limit = max_length.saturating_sub(1);
    if value.len() <= limit {
        return value.to_string();
    }
    let mut end = limit;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// What a callback did with the value it was given
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    Changed,
}

/// Arguments of one callback invocation
pub struct CallbackArgs<'a> {
    pub entity: EntityIndex,
    pub property: &'a str,
    pub value: &'a mut CallbackValue,
    pub element: usize,
    /// 1-based number of the client being encoded for, `None` for the
    /// shared encoding
    pub client: Option<u32>,
    /// Size of the string copy-back buffer
    pub max_length: usize,
}

pub trait PropertyCallback: Send + Sync {
    fn call(&self, args: &mut CallbackArgs<'_>) -> CallbackResult;
}

impl<F> PropertyCallback for F
where
    F: Fn(&mut CallbackArgs<'_>) -> CallbackResult + Send + Sync,
{
    fn call(&self, args: &mut CallbackArgs<'_>) -> CallbackResult {
        self(args)
    }
}

/// A callback as registered on a property: its identity, whether it wants
/// to be called once per client, and the function itself
#[derive(Clone)]
pub struct HookCallback {
    id: CallbackId,
    per_client: bool,
    function: Arc<dyn PropertyCallback>,
}

impl HookCallback {
    pub fn new<F: PropertyCallback + 'static>(id: CallbackId, per_client: bool, function: F) -> Self {
        Self {
            id,
            per_client,
            function: Arc::new(function),
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn plugin(&self) -> PluginId {
        self.id.plugin
    }

    pub fn per_client(&self) -> bool {
        self.per_client
    }

    pub fn call(&self, args: &mut CallbackArgs<'_>) -> CallbackResult {
        self.function.call(args)
    }
}

impl std::fmt::Debug for HookCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookCallback")
            .field("id", &self.id)
            .field("per_client", &self.per_client)
            .finish()
    }
}
