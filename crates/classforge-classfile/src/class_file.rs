//! Class file structure
//!
//! [`ClassFile`] is the structural representation of one compiled class.
//! Member and class attributes are kept as opaque byte blobs, so anything
//! this crate does not edit re-encodes unchanged.

use crate::access::AccessFlags;
use crate::codec::{count_u16, Reader, WriteBe};
use crate::constant_pool::{Constant, ConstantPool};
use crate::error::ClassFileError;
use crate::mutf8;
use crate::name::ClassName;

/// Class file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Major version written by [`ClassFile::new`] (Java 8)
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// Field descriptor of `boolean`
pub const BOOLEAN_DESCRIPTOR: &str = "Z";

/// Attribute names this crate interprets
pub mod attribute_names {
    pub const CONSTANT_VALUE: &str = "ConstantValue";
    pub const INNER_CLASSES: &str = "InnerClasses";
}

/// Raw attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Index of the `Utf8` attribute name
    pub name_index: u16,
    /// Attribute body
    pub info: Vec<u8>,
}

impl AttributeInfo {
    fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let name_index = reader.u16()?;
        let len = reader.u32()? as usize;
        Ok(Self {
            name_index,
            info: reader.take(len)?.to_vec(),
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        out.put_u16(self.name_index);
        let len = u32::try_from(self.info.len())
            .map_err(|_| ClassFileError::AttributeTooLarge(self.info.len()))?;
        out.put_u32(len);
        out.extend_from_slice(&self.info);
        Ok(())
    }
}

/// Field or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MemberInfo {
    fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let access_flags = AccessFlags::from_bits(reader.u16()?);
        let name_index = reader.u16()?;
        let descriptor_index = reader.u16()?;
        let attributes = read_attributes(reader)?;
        Ok(Self {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        out.put_u16(self.access_flags.bits());
        out.put_u16(self.name_index);
        out.put_u16(self.descriptor_index);
        write_attributes(&self.attributes, out)
    }
}

/// Initial value of a new static field, stored as a `ConstantValue` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    /// `boolean`, `byte`, `char`, `short` and `int` constants
    Int(i32),
    Long(i64),
    String(String),
}

/// Description of a field to add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub descriptor: String,
    pub access_flags: AccessFlags,
    pub initializer: Option<ConstantValue>,
}

impl FieldSpec {
    /// `boolean` field with a constant initializer
    #[must_use]
    pub fn boolean_constant(name: impl Into<String>, access_flags: AccessFlags, value: bool) -> Self {
        Self {
            name: name.into(),
            descriptor: BOOLEAN_DESCRIPTOR.to_string(),
            access_flags,
            initializer: Some(ConstantValue::Int(i32::from(value))),
        }
    }
}

/// One row of the `InnerClasses` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner: ClassName,
    /// `None` for local and anonymous classes
    pub outer: Option<ClassName>,
    /// `None` for anonymous classes
    pub simple_name: Option<String>,
    pub access_flags: AccessFlags,
}

/// Parsed class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    /// 0 only for `java.lang.Object`
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Create an empty class with no members
    ///
    /// # Errors
    /// Returns error if the constant pool cannot hold the names
    pub fn new(
        name: &ClassName,
        super_name: Option<&ClassName>,
        access_flags: AccessFlags,
    ) -> Result<Self, ClassFileError> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.class_index(name)?;
        let super_class = match super_name {
            Some(super_name) => constant_pool.class_index(super_name)?,
            None => 0,
        };
        Ok(Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Decode class file bytes
    ///
    /// # Errors
    /// Returns error on bad magic, truncation, unknown constants or trailing bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = Reader::new(bytes);
        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let constant_pool = ConstantPool::read(&mut reader)?;
        let access_flags = AccessFlags::from_bits(reader.u16()?);
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;

        let interface_count = reader.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| reader.u16())
            .collect::<Result<Vec<_>, _>>()?;
        let field_count = reader.u16()?;
        let fields = (0..field_count)
            .map(|_| MemberInfo::read(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        let method_count = reader.u16()?;
        let methods = (0..method_count)
            .map(|_| MemberInfo::read(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        let attributes = read_attributes(&mut reader)?;

        if reader.remaining() > 0 {
            return Err(ClassFileError::TrailingBytes(reader.remaining()));
        }
        tracing::trace!("Decoded class file: {} bytes", reader.position());

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Encode to class file bytes
    ///
    /// # Errors
    /// Returns error if a count or length no longer fits the format
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassFileError> {
        let mut out = Vec::with_capacity(1024);
        out.put_u32(MAGIC);
        out.put_u16(self.minor_version);
        out.put_u16(self.major_version);
        self.constant_pool.write(&mut out)?;
        out.put_u16(self.access_flags.bits());
        out.put_u16(self.this_class);
        out.put_u16(self.super_class);
        out.put_u16(count_u16(self.interfaces.len(), "interfaces")?);
        for interface in &self.interfaces {
            out.put_u16(*interface);
        }
        out.put_u16(count_u16(self.fields.len(), "fields")?);
        for field in &self.fields {
            field.write(&mut out)?;
        }
        out.put_u16(count_u16(self.methods.len(), "methods")?);
        for method in &self.methods {
            method.write(&mut out)?;
        }
        write_attributes(&self.attributes, &mut out)?;
        Ok(out)
    }

    /// Name of this class
    ///
    /// # Errors
    /// Returns error if `this_class` is not a valid `Class` entry
    pub fn name(&self) -> Result<ClassName, ClassFileError> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Name of the superclass, `None` for `java.lang.Object`
    ///
    /// # Errors
    /// Returns error if `super_class` is not a valid `Class` entry
    pub fn super_name(&self) -> Result<Option<ClassName>, ClassFileError> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    /// Names of directly implemented interfaces
    ///
    /// # Errors
    /// Returns error if an interface index is not a valid `Class` entry
    pub fn interface_names(&self) -> Result<Vec<ClassName>, ClassFileError> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }

    /// Whether this is an interface (annotations included)
    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    /// Decoded name of a field or method
    ///
    /// # Errors
    /// Returns error if the name index is invalid
    pub fn member_name(&self, member: &MemberInfo) -> Result<String, ClassFileError> {
        self.constant_pool.utf8(member.name_index)
    }

    /// Decoded descriptor of a field or method
    ///
    /// # Errors
    /// Returns error if the descriptor index is invalid
    pub fn member_descriptor(&self, member: &MemberInfo) -> Result<String, ClassFileError> {
        self.constant_pool.utf8(member.descriptor_index)
    }

    /// Field declared by this class (inherited fields are not considered)
    #[must_use]
    pub fn declared_field(&self, name: &str) -> Option<&MemberInfo> {
        self.field_position(name).map(|i| &self.fields[i])
    }

    /// Names of all declared fields
    ///
    /// # Errors
    /// Returns error if a field name index is invalid
    pub fn declared_field_names(&self) -> Result<Vec<String>, ClassFileError> {
        self.fields.iter().map(|f| self.member_name(f)).collect()
    }

    fn field_position(&self, name: &str) -> Option<usize> {
        let encoded = mutf8::encode(name);
        self.fields.iter().position(|field| {
            self.constant_pool
                .utf8_bytes(field.name_index)
                .is_ok_and(|bytes| bytes == encoded.as_slice())
        })
    }

    /// Declare a new field
    ///
    /// Only appends: existing members and constant pool entries keep their
    /// positions.
    ///
    /// # Errors
    /// - [`ClassFileError::DuplicateField`] if the name is already declared
    /// - [`ClassFileError::ConstantPoolOverflow`] if the pool is full
    pub fn add_field(&mut self, spec: &FieldSpec) -> Result<(), ClassFileError> {
        if self.declared_field(&spec.name).is_some() {
            return Err(ClassFileError::DuplicateField(spec.name.clone()));
        }
        count_u16(self.fields.len() + 1, "fields")?;

        let name_index = self.constant_pool.utf8_index(&spec.name)?;
        let descriptor_index = self.constant_pool.utf8_index(&spec.descriptor)?;
        let mut attributes = Vec::new();
        if let Some(initializer) = &spec.initializer {
            let value_index = match initializer {
                ConstantValue::Int(v) => self.constant_pool.integer_index(*v)?,
                ConstantValue::Long(v) => self.constant_pool.push(Constant::Long(*v))?,
                ConstantValue::String(s) => {
                    let string_index = self.constant_pool.utf8_index(s)?;
                    self.constant_pool.push(Constant::String { string_index })?
                }
            };
            let attribute_name = self
                .constant_pool
                .utf8_index(attribute_names::CONSTANT_VALUE)?;
            attributes.push(AttributeInfo {
                name_index: attribute_name,
                info: value_index.to_be_bytes().to_vec(),
            });
        }

        self.fields.push(MemberInfo {
            access_flags: spec.access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
        Ok(())
    }

    /// Remove a declared field, returning whether it existed
    ///
    /// Constant pool entries it used are left in place.
    pub fn remove_field(&mut self, name: &str) -> bool {
        match self.field_position(name) {
            Some(i) => {
                self.fields.remove(i);
                true
            }
            None => false,
        }
    }

    /// Add a directly implemented interface if not already present
    ///
    /// # Errors
    /// Returns error if the constant pool is full
    pub fn add_interface(&mut self, name: &ClassName) -> Result<bool, ClassFileError> {
        let index = self.constant_pool.class_index(name)?;
        if self.interfaces.contains(&index) {
            return Ok(false);
        }
        count_u16(self.interfaces.len() + 1, "interfaces")?;
        self.interfaces.push(index);
        Ok(true)
    }

    /// First class-level attribute with this name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        let encoded = mutf8::encode(name);
        self.attributes.iter().find(|attribute| {
            self.constant_pool
                .utf8_bytes(attribute.name_index)
                .is_ok_and(|bytes| bytes == encoded.as_slice())
        })
    }

    /// Rows of the `InnerClasses` attribute (empty when absent)
    ///
    /// # Errors
    /// Returns error if the attribute is malformed
    pub fn inner_classes(&self) -> Result<Vec<InnerClassEntry>, ClassFileError> {
        let Some(attribute) = self.attribute(attribute_names::INNER_CLASSES) else {
            return Ok(Vec::new());
        };
        let mut reader = Reader::new(&attribute.info);
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let inner_index = reader.u16()?;
            let outer_index = reader.u16()?;
            let name_index = reader.u16()?;
            let access_flags = AccessFlags::from_bits(reader.u16()?);
            entries.push(InnerClassEntry {
                inner: self.constant_pool.class_name(inner_index)?,
                outer: match outer_index {
                    0 => None,
                    i => Some(self.constant_pool.class_name(i)?),
                },
                simple_name: match name_index {
                    0 => None,
                    i => Some(self.constant_pool.utf8(i)?),
                },
                access_flags,
            });
        }
        Ok(entries)
    }

    /// Classes nested directly inside this one
    ///
    /// An `InnerClasses` row counts when its class is named `This$Name` with
    /// no further `$`, which covers member, local and anonymous classes one
    /// level down.
    ///
    /// # Errors
    /// Returns error if the class name or the attribute is malformed
    pub fn nested_class_names(&self) -> Result<Vec<ClassName>, ClassFileError> {
        let this = self.name()?;
        let mut nested: Vec<ClassName> = Vec::new();
        for entry in self.inner_classes()? {
            if entry.inner.is_immediate_member_of(&this) && !nested.contains(&entry.inner) {
                nested.push(entry.inner);
            }
        }
        Ok(nested)
    }

    /// Set the `InnerClasses` attribute, replacing any existing one
    ///
    /// # Errors
    /// Returns error if the constant pool is full or there are too many rows
    pub fn set_inner_classes(&mut self, entries: &[InnerClassEntry]) -> Result<(), ClassFileError> {
        let mut info = Vec::with_capacity(2 + entries.len() * 8);
        info.put_u16(count_u16(entries.len(), "inner classes")?);
        for entry in entries {
            info.put_u16(self.constant_pool.class_index(&entry.inner)?);
            info.put_u16(match &entry.outer {
                Some(outer) => self.constant_pool.class_index(outer)?,
                None => 0,
            });
            info.put_u16(match &entry.simple_name {
                Some(name) => self.constant_pool.utf8_index(name)?,
                None => 0,
            });
            info.put_u16(entry.access_flags.bits());
        }
        let name_index = self.constant_pool.utf8_index(attribute_names::INNER_CLASSES)?;
        self.attributes.retain(|a| a.name_index != name_index);
        self.attributes.push(AttributeInfo { name_index, info });
        Ok(())
    }
}

fn read_attributes(reader: &mut Reader<'_>) -> Result<Vec<AttributeInfo>, ClassFileError> {
    let count = reader.u16()?;
    (0..count).map(|_| AttributeInfo::read(reader)).collect()
}

fn write_attributes(attributes: &[AttributeInfo], out: &mut Vec<u8>) -> Result<(), ClassFileError> {
    out.put_u16(count_u16(attributes.len(), "attributes")?);
    for attribute in attributes {
        attribute.write(out)?;
    }
    Ok(())
}
