/// The wire-level value kind inferred for a hooked property. Determines how
/// a raw value is handed to callbacks and read back from them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropKind {
    Int32,
    Int16,
    Int8,
    UInt32,
    UInt16,
    UInt8,
    Float,
    Vector,
    QAngle,
    String,
    Handle,
    Color,
    Bool,
}

impl PropKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropKind::Int32 => "int",
            PropKind::Int16 => "short",
            PropKind::Int8 => "char",
            PropKind::UInt32 => "unsigned int",
            PropKind::UInt16 => "unsigned short",
            PropKind::UInt8 => "unsigned char",
            PropKind::Float => "float",
            PropKind::Vector => "vector",
            PropKind::QAngle => "qangle",
            PropKind::String => "string",
            PropKind::Handle => "handle",
            PropKind::Color => "color",
            PropKind::Bool => "bool",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            PropKind::Int32
                | PropKind::Int16
                | PropKind::Int8
                | PropKind::UInt32
                | PropKind::UInt16
                | PropKind::UInt8
                | PropKind::Handle
                | PropKind::Color
                | PropKind::Bool
        )
    }

    /// Narrows an integer to the range this kind can hold, the way a
    /// store into a field of that width would
    pub fn narrow(&self, value: i64) -> i64 {
        match self {
            PropKind::Int32 => value as i32 as i64,
            PropKind::Int16 => value as i16 as i64,
            PropKind::Int8 => value as i8 as i64,
            PropKind::UInt32 | PropKind::Handle | PropKind::Color => value as u32 as i64,
            PropKind::UInt16 => value as u16 as i64,
            PropKind::UInt8 => value as u8 as i64,
            PropKind::Bool => (value != 0) as i64,
            _ => value,
        }
    }
}
