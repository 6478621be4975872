//! classforge class file layer
//!
//! Structural model of compiled JVM classes and the mutable artifacts the
//! executor works on.
//!
//! # Core Concepts
//!
//! - [`ClassName`]: logical (dotted) class name and its file path mapping
//! - [`ClassFile`]: decoded class file; untouched parts re-encode byte-for-byte
//! - [`Artifact`]: a class file plus modified/frozen state and nested classes
//! - [`ContentHash`]: Blake3 digest of encoded bytes
//!
//! # Example
//!
//! ```rust,ignore
//! use classforge_classfile::{AccessFlags, Artifact, ClassName, FieldSpec};
//!
//! let name: ClassName = "test.Example".parse()?;
//! let mut artifact = Artifact::from_bytes(&name, &bytes)?;
//! artifact.class_file_mut()?.add_field(&FieldSpec::boolean_constant(
//!     "__marker",
//!     AccessFlags::PRIVATE | AccessFlags::STATIC | AccessFlags::FINAL,
//!     true,
//! ))?;
//! let out = artifact.freeze()?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod access;
mod artifact;
mod class_file;
mod codec;
mod constant_pool;
mod error;
mod hash;
pub mod mutf8;
mod name;

pub use access::AccessFlags;
pub use artifact::Artifact;
pub use class_file::{
    attribute_names, AttributeInfo, ClassFile, ConstantValue, FieldSpec, InnerClassEntry,
    MemberInfo, BOOLEAN_DESCRIPTOR, DEFAULT_MAJOR_VERSION, MAGIC,
};
pub use constant_pool::{Constant, ConstantPool};
pub use error::{ArtifactError, ClassFileError};
pub use hash::{ContentHash, HashError};
pub use name::{ClassName, NameError, CLASS_FILE_SUFFIX, NESTED_SEPARATOR};
