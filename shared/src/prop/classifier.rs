use std::sync::Arc;

use log::debug;

use super::{
    error::ClassifyError,
    prop_kind::PropKind,
    send_prop::{same_proxy, PropValue, SendProp, SendPropType, SendProxy},
};

/// Value fed through an unknown integer encoder to learn its width
const PROBE_SENTINEL: i64 = 0x1234_5678;
/// Entity index used for probe calls; never a real entity
const PROBE_ENTITY: u32 = u32::MAX;

/// The host's standard encode functions, compared by identity against the
/// function installed on a property
#[derive(Clone)]
pub struct StandardProxies {
    pub uint8_to_int32: Arc<dyn SendProxy>,
    pub uint16_to_int32: Arc<dyn SendProxy>,
    pub ehandle_to_int: Option<Arc<dyn SendProxy>>,
    pub color32_to_int: Option<Arc<dyn SendProxy>>,
}

/// Infers the value kind of a property. Runs once per registration; the
/// result is cached on the interception binding.
pub struct PropClassifier {
    standard: StandardProxies,
    unsigned_bitfields: Vec<(String, String)>,
}

impl PropClassifier {
    pub fn new(standard: StandardProxies, unsigned_bitfields: Vec<(String, String)>) -> Self {
        Self {
            standard,
            unsigned_bitfields,
        }
    }

    pub fn classify(&self, prop: &SendProp, table_name: &str) -> Result<PropKind, ClassifyError> {
        // bitfields whose real encoder is non-standard
        if self
            .unsigned_bitfields
            .iter()
            .any(|(table, name)| table == table_name && name == prop.name())
        {
            return Ok(PropKind::UInt32);
        }

        match prop.prop_type() {
            SendPropType::Int => Ok(self.classify_int(prop)),
            SendPropType::Float => Ok(PropKind::Float),
            SendPropType::Vector => {
                if prop.low_value() == 0.0 && prop.high_value() == 360.0 {
                    Ok(PropKind::QAngle)
                } else {
                    Ok(PropKind::Vector)
                }
            }
            SendPropType::VectorXY => Ok(PropKind::Vector),
            SendPropType::String => Ok(PropKind::String),
            SendPropType::Array | SendPropType::DataTable => Err(ClassifyError::UnsupportedKind {
                property: prop.name().to_string(),
                kind: prop.prop_type().name(),
            }),
        }
    }

    fn classify_int(&self, prop: &SendProp) -> PropKind {
        let proxy = prop.proxy();

        if let Some(ehandle) = &self.standard.ehandle_to_int {
            if same_proxy(&proxy, ehandle) {
                return PropKind::Handle;
            }
        }
        if let Some(color) = &self.standard.color32_to_int {
            if same_proxy(&proxy, color) {
                return PropKind::Color;
            }
        }
        if prop.is_unsigned() && prop.bits() == 1 {
            return PropKind::Bool;
        }

        let width = if same_proxy(&proxy, &self.standard.uint8_to_int32) {
            8
        } else if same_proxy(&proxy, &self.standard.uint16_to_int32) {
            16
        } else if prop.bits() > 16 {
            32
        } else {
            probe_int_width(prop, &proxy).unwrap_or_else(|| bit_width_fallback(prop.bits()))
        };

        match (prop.is_unsigned(), width) {
            (true, 8) => PropKind::UInt8,
            (true, 16) => PropKind::UInt16,
            (true, _) => PropKind::UInt32,
            (false, 8) => PropKind::Int8,
            (false, 16) => PropKind::Int16,
            (false, _) => PropKind::Int32,
        }
    }
}

/// Feeds a sentinel through a custom integer encoder and reports the field
/// width it narrows to. Heuristic: assumes the encoder is a pure transform.
fn probe_int_width(prop: &SendProp, proxy: &Arc<dyn SendProxy>) -> Option<u8> {
    let output = proxy
        .encode(prop, &PropValue::Int(PROBE_SENTINEL), 0, PROBE_ENTITY)
        .as_int()?;

    let width = if output == PROBE_SENTINEL {
        32
    } else if output == PROBE_SENTINEL & 0xffff || output == PROBE_SENTINEL as i16 as i64 {
        16
    } else if output == PROBE_SENTINEL & 0xff || output == PROBE_SENTINEL as i8 as i64 {
        8
    } else {
        return None;
    };

    debug!(
        "PropClassifier: probe of custom encoder on {} suggests {} bits",
        prop.name(),
        width
    );
    Some(width)
}

fn bit_width_fallback(bits: u8) -> u8 {
    match bits {
        0..=8 => 8,
        9..=16 => 16,
        _ => 32,
    }
}
