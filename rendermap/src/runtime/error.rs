//! Runtime error types.

use super::task::TaskId;
use crate::machine::ProcessorKind;
use crate::serdez::CodecError;
use thiserror::Error;

/// Errors raised by the region runtime.
///
/// Cloneable so that one failed operation can fail every operation that
/// depends on it with the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A structural precondition was broken. Always fatal.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A codec failed while moving or destroying an element.
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),

    /// No task is registered under the id.
    #[error("no task registered with id {0}")]
    UnknownTask(TaskId),

    /// The task has no variant runnable on the kind of processor chosen.
    #[error("task {task} has no variant for {kind}")]
    NoVariant { task: TaskId, kind: ProcessorKind },

    /// A task body panicked.
    #[error("task {name} panicked")]
    TaskPanicked { name: String },

    /// The runtime was aborted by an earlier fatal error.
    #[error("runtime aborted: {0}")]
    Aborted(String),
}

impl RuntimeError {
    /// Shorthand for [`RuntimeError::InvariantViolation`].
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Returns true for errors that must abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation(_) | Self::Codec(_) | Self::TaskPanicked { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serdez::SerdezId;

    #[test]
    fn test_codec_error_converts() {
        let err: RuntimeError = CodecError::UnknownCodec(SerdezId(5)).into();
        assert!(matches!(err, RuntimeError::Codec(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invariant_message() {
        let err = RuntimeError::invariant("two system memories");
        assert_eq!(err.to_string(), "invariant violation: two system memories");
    }
}
