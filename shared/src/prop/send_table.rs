use std::sync::Arc;

use super::send_prop::{PropValue, SendProp};

/// The ordered list of properties that make up one entity class's
/// replicated state. Property indices in change-lists are positions in the
/// flattened element list (`flat_len`).
pub struct SendTable {
    name: String,
    props: Vec<Arc<SendProp>>,
}

impl SendTable {
    pub fn new(name: &str, props: Vec<Arc<SendProp>>) -> Self {
        Self {
            name: name.to_string(),
            props,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &[Arc<SendProp>] {
        &self.props
    }

    pub fn find(&self, name: &str) -> Option<&Arc<SendProp>> {
        self.props.iter().find(|prop| prop.name() == name)
    }

    /// Number of encoded elements across all properties
    pub fn flat_len(&self) -> usize {
        self.props.iter().map(|prop| prop.elements()).sum()
    }

    /// Position of `(prop, element)` in the flattened element list
    pub fn flat_index(&self, name: &str, element: usize) -> Option<usize> {
        let mut index = 0;
        for prop in &self.props {
            if prop.name() == name {
                if element >= prop.elements() {
                    return None;
                }
                return Some(index + element);
            }
            index += prop.elements();
        }
        None
    }
}

/// Read access to the current property values of one entity
pub trait EntityState: Send + Sync {
    fn read(&self, prop: &SendProp, element: usize) -> Option<PropValue>;
}
