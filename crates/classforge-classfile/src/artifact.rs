//! In-memory artifact
//!
//! An [`Artifact`] wraps one decoded [`ClassFile`] together with the state a
//! Run needs to track: whether anything changed it, whether it has already
//! been serialized, and the nested classes it owns.

use std::fmt::Write as _;

use crate::class_file::ClassFile;
use crate::error::ArtifactError;
use crate::hash::ContentHash;
use crate::name::ClassName;

/// One compiled class or nested class held in memory
///
/// # Invariants
/// - `name` always equals the name declared by `class_file`
/// - Once frozen, the structure cannot change until [`Artifact::defrost`]
/// - Nested artifacts are immediate members of this class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: ClassName,
    class_file: ClassFile,
    modified: bool,
    /// Bytes produced when the artifact was frozen
    frozen: Option<Vec<u8>>,
    nested: Vec<Artifact>,
}

impl Artifact {
    /// Wrap a class file
    ///
    /// # Errors
    /// Returns error if the class file does not declare a valid name
    pub fn new(class_file: ClassFile) -> Result<Self, ArtifactError> {
        let name = class_file.name()?;
        Ok(Self {
            name,
            class_file,
            modified: false,
            frozen: None,
            nested: Vec::new(),
        })
    }

    /// Decode bytes expected to hold `expected`
    ///
    /// # Errors
    /// - [`ArtifactError::ClassFile`] if the bytes do not decode
    /// - [`ArtifactError::NameMismatch`] if they declare another class
    pub fn from_bytes(expected: &ClassName, bytes: &[u8]) -> Result<Self, ArtifactError> {
        let artifact = Self::new(ClassFile::parse(bytes)?)?;
        if &artifact.name != expected {
            return Err(ArtifactError::NameMismatch {
                expected: expected.clone(),
                actual: artifact.name,
            });
        }
        Ok(artifact)
    }

    /// Logical name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &ClassName {
        &self.name
    }

    /// Read-only structure
    #[inline]
    #[must_use]
    pub fn class_file(&self) -> &ClassFile {
        &self.class_file
    }

    /// Mutable structure; marks the artifact modified
    ///
    /// # Errors
    /// Returns [`ArtifactError::Frozen`] once the artifact has been serialized
    pub fn class_file_mut(&mut self) -> Result<&mut ClassFile, ArtifactError> {
        if self.frozen.is_some() {
            return Err(ArtifactError::Frozen(self.name.clone()));
        }
        self.modified = true;
        Ok(&mut self.class_file)
    }

    /// Whether a mutating accessor was used
    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Start tracking modifications afresh
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// True between [`Artifact::freeze`] and [`Artifact::defrost`]
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// True if the class carries `ACC_INTERFACE`
    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.class_file.is_interface()
    }

    /// Serialize and lock the artifact against further changes
    ///
    /// Freezing an already frozen artifact returns the bytes from the first
    /// freeze.
    ///
    /// # Errors
    /// Returns error if the structure cannot be encoded
    pub fn freeze(&mut self) -> Result<&[u8], ArtifactError> {
        let bytes = match self.frozen.take() {
            Some(bytes) => bytes,
            None => self.class_file.to_bytes()?,
        };
        Ok(self.frozen.insert(bytes))
    }

    /// Allow mutation again after a freeze
    pub fn defrost(&mut self) {
        self.frozen = None;
    }

    /// Encoded bytes (the frozen bytes if frozen)
    ///
    /// # Errors
    /// Returns error if the structure cannot be encoded
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        match &self.frozen {
            Some(bytes) => Ok(bytes.clone()),
            None => Ok(self.class_file.to_bytes()?),
        }
    }

    /// Hash of the encoded bytes
    ///
    /// # Errors
    /// Returns error if the structure cannot be encoded
    pub fn content_hash(&self) -> Result<ContentHash, ArtifactError> {
        Ok(ContentHash::compute(&self.to_bytes()?))
    }

    /// Immediately nested artifacts
    #[inline]
    #[must_use]
    pub fn nested(&self) -> &[Artifact] {
        &self.nested
    }

    /// Nested artifacts, for units that edit them with the enclosing class
    #[inline]
    pub fn nested_mut(&mut self) -> &mut [Artifact] {
        &mut self.nested
    }

    /// Attach a nested artifact
    ///
    /// # Errors
    /// Returns [`ArtifactError::NotNested`] unless `nested` is an immediate
    /// member of this class
    pub fn attach_nested(&mut self, nested: Artifact) -> Result<(), ArtifactError> {
        if !nested.name.is_immediate_member_of(&self.name) {
            return Err(ArtifactError::NotNested {
                outer: self.name.clone(),
                nested: nested.name,
            });
        }
        self.nested.retain(|n| n.name != nested.name);
        self.nested.push(nested);
        Ok(())
    }

    /// Detach all nested artifacts
    pub fn take_nested(&mut self) -> Vec<Artifact> {
        std::mem::take(&mut self.nested)
    }

    /// One-line structural summary for debug logs
    #[must_use]
    pub fn describe(&self) -> String {
        let cf = &self.class_file;
        let mut out = format!(
            "{} v{}.{} [{}]",
            self.name, cf.major_version, cf.minor_version, cf.access_flags
        );
        if let Ok(Some(super_name)) = cf.super_name() {
            let _ = write!(out, " extends {super_name}");
        }
        if let Ok(interfaces) = cf.interface_names() {
            if !interfaces.is_empty() {
                let names: Vec<String> = interfaces.iter().map(ToString::to_string).collect();
                let _ = write!(out, " implements {}", names.join(", "));
            }
        }
        let _ = write!(
            out,
            " ({} fields, {} methods, {} nested)",
            cf.fields.len(),
            cf.methods.len(),
            self.nested.len()
        );
        out
    }
}
