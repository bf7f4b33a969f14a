use std::sync::{Arc, RwLock};

use crate::EntityIndex;

/// Declared wire kind of a property, as reported by the host's metadata
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SendPropType {
    Int,
    Float,
    Vector,
    VectorXY,
    String,
    Array,
    DataTable,
}

impl SendPropType {
    pub fn name(&self) -> &'static str {
        match self {
            SendPropType::Int => "Int",
            SendPropType::Float => "Float",
            SendPropType::Vector => "Vector",
            SendPropType::VectorXY => "VectorXY",
            SendPropType::String => "String",
            SendPropType::Array => "Array",
            SendPropType::DataTable => "DataTable",
        }
    }
}

/// A raw property value read from an entity, or the encoded value an encode
/// function produces from it
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Int(i64),
    Float(f32),
    Vector([f32; 3]),
    String(String),
}

impl PropValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// The per-property encode function: turns the raw value of one property
/// element into the value that is written to the wire.
pub trait SendProxy: Send + Sync {
    fn encode(
        &self,
        prop: &SendProp,
        value: &PropValue,
        element: usize,
        entity: EntityIndex,
    ) -> PropValue;
}

impl<F> SendProxy for F
where
    F: Fn(&SendProp, &PropValue, usize, EntityIndex) -> PropValue + Send + Sync,
{
    fn encode(
        &self,
        prop: &SendProp,
        value: &PropValue,
        element: usize,
        entity: EntityIndex,
    ) -> PropValue {
        self(prop, value, element, entity)
    }
}

/// Whether two encode functions are the same installed instance
pub fn same_proxy(a: &Arc<dyn SendProxy>, b: &Arc<dyn SendProxy>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Stable identity of a property descriptor. Descriptors are host-owned and
/// never move while an `Arc` to them is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropKey(usize);

impl PropKey {
    pub fn of(prop: &SendProp) -> Self {
        Self(prop as *const SendProp as usize)
    }
}

/// Host-owned descriptor of one serializable field of an entity class.
///
/// Everything except the installed encode function is immutable. Interception
/// only ever swaps the encode function; it never changes the metadata.
pub struct SendProp {
    name: String,
    prop_type: SendPropType,
    unsigned: bool,
    bits: u8,
    low_value: f32,
    high_value: f32,
    elements: usize,
    proxy: RwLock<Arc<dyn SendProxy>>,
}

impl SendProp {
    pub fn new(name: &str, prop_type: SendPropType, proxy: Arc<dyn SendProxy>) -> Self {
        Self {
            name: name.to_string(),
            prop_type,
            unsigned: false,
            bits: 32,
            low_value: 0.0,
            high_value: 0.0,
            elements: 1,
            proxy: RwLock::new(proxy),
        }
    }

    pub fn with_bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    pub fn with_range(mut self, low_value: f32, high_value: f32) -> Self {
        self.low_value = low_value;
        self.high_value = high_value;
        self
    }

    pub fn with_elements(mut self, elements: usize) -> Self {
        self.elements = elements;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prop_type(&self) -> SendPropType {
        self.prop_type
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn low_value(&self) -> f32 {
        self.low_value
    }

    pub fn high_value(&self) -> f32 {
        self.high_value
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn key(&self) -> PropKey {
        PropKey::of(self)
    }

    /// The encode function currently installed on this property
    pub fn proxy(&self) -> Arc<dyn SendProxy> {
        // a poisoned slot still holds a whole Arc
        match self.proxy.read() {
            Ok(proxy) => proxy.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Installs a new encode function, returning the one it replaced
    pub fn set_proxy(&self, proxy: Arc<dyn SendProxy>) -> Arc<dyn SendProxy> {
        let mut slot = match self.proxy.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *slot, proxy)
    }

    /// Runs the installed encode function
    pub fn encode(&self, value: &PropValue, element: usize, entity: EntityIndex) -> PropValue {
        let proxy = self.proxy();
        proxy.encode(self, value, element, entity)
    }
}

impl std::fmt::Debug for SendProp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendProp")
            .field("name", &self.name)
            .field("prop_type", &self.prop_type)
            .field("unsigned", &self.unsigned)
            .field("bits", &self.bits)
            .field("elements", &self.elements)
            .finish()
    }
}
