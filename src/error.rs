use thiserror::Error;

/// Errors raised while rewriting a class.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The same member key was resolved to two different results.
    #[error("inconsistent mapping for {owner}.{name}{desc}: already {existing}, now {requested}")]
    InconsistentMapping {
        owner: String,
        name: String,
        desc: String,
        existing: String,
        requested: String,
    },
    #[error("malformed descriptor `{0}`")]
    MalformedDescriptor(String),
    #[error("label L{0} is referenced but never bound")]
    UnknownLabel(u32),
    #[error("analysis of {method} failed: {source}")]
    Analysis {
        method: String,
        #[source]
        source: AnalyzerError,
    },
}

/// Failures of the boolean-value abstract interpreter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("stack underflow at instruction {0}")]
    StackUnderflow(usize),
    #[error("jump to unbound label L{label} at instruction {at}")]
    UnknownLabel { at: usize, label: u32 },
    #[error("incompatible stack heights at instruction {at}: {left} vs {right}")]
    StackHeightMismatch { at: usize, left: usize, right: usize },
    #[error("local {index} out of range at instruction {at}")]
    LocalOutOfRange { at: usize, index: u16 },
    #[error("malformed descriptor `{desc}` at instruction {at}")]
    MalformedDescriptor { at: usize, desc: String },
    #[error("execution falls off the end of the method")]
    FallOffEnd,
}

/// Failures reported by a [`crate::hierarchy::ClassHierarchy`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("class {0} not found")]
    ClassNotFound(String),
    #[error("failed to read class {class}: {reason}")]
    Unreadable { class: String, reason: String },
}

/// Precondition failures of the runtime distance helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error("{predicate} called on a null receiver")]
    NullReceiver { predicate: &'static str },
    #[error("parameter stack for {0} is empty")]
    EmptyParameterStack(&'static str),
}

pub type Result<T> = std::result::Result<T, TransformError>;
