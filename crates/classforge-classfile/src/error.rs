//! Error types for the class file layer
//!
//! - [`ClassFileError`]: decoding, encoding and structural edits
//! - [`ArtifactError`]: artifact lifecycle (frozen artifacts, name checks)

use crate::name::{ClassName, NameError};

/// Errors decoding, encoding or editing a class file
#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    /// Input ended before a complete structure was read
    #[error("truncated class file: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// Not a class file
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    /// Bytes after the last attribute
    #[error("{0} trailing bytes after class file end")]
    TrailingBytes(usize),

    /// Malformed modified UTF-8
    #[error("invalid modified UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    /// Constant pool tag not defined by the format
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { index: u16, tag: u8 },

    /// Index does not point at a constant of the expected kind
    #[error("constant pool index {index} is not a valid {expected} entry")]
    InvalidConstantIndex { index: u16, expected: &'static str },

    /// More than 65535 constant pool slots
    #[error("constant pool overflow")]
    ConstantPoolOverflow,

    /// More members than a u16 count can express
    #[error("too many {0} for the class file format")]
    TooManyMembers(&'static str),

    /// Attribute body longer than u32
    #[error("attribute body too large: {0} bytes")]
    AttributeTooLarge(usize),

    /// Field with this name already declared
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// Referenced class name is not a valid name
    #[error("invalid class name: {0}")]
    InvalidName(#[from] NameError),
}

impl ClassFileError {
    /// Create truncation error
    #[inline]
    #[must_use]
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::Truncated { offset, needed }
    }

    /// Create invalid constant index error
    #[inline]
    #[must_use]
    pub fn invalid_index(index: u16, expected: &'static str) -> Self {
        Self::InvalidConstantIndex { index, expected }
    }
}

/// Errors related to artifact operations
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Mutation attempted after serialization locked the artifact
    #[error("artifact {0} is frozen")]
    Frozen(ClassName),

    /// Bytes declare a different class than requested
    #[error("class file declares {actual}, expected {expected}")]
    NameMismatch { expected: ClassName, actual: ClassName },

    /// Attached class is not an immediate member of the outer class
    #[error("{nested} is not nested directly in {outer}")]
    NotNested { outer: ClassName, nested: ClassName },

    /// Structural error
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}
