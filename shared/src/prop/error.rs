use thiserror::Error;

/// Errors that can occur while inferring the value kind of a property
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// Containers and nested tables have no single value kind; they must be
    /// expanded into their leaf elements before registering
    #[error("Property {property} of kind {kind} is not supported, expand it into its elements first")]
    UnsupportedKind {
        property: String,
        kind: &'static str,
    },
}
