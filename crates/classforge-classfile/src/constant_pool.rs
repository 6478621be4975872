//! Constant pool model
//!
//! Entries are kept in file order so untouched pools re-encode byte for byte.
//! New entries are only ever appended.

use crate::codec::{Reader, WriteBe};
use crate::error::ClassFileError;
use crate::mutf8;
use crate::name::ClassName;

/// One constant pool entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Modified UTF-8 bytes, kept raw
    Utf8(Vec<u8>),
    Integer(i32),
    /// IEEE 754 bits
    Float(u32),
    Long(i64),
    /// IEEE 754 bits
    Double(u64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot taken by a `Long` or `Double`
    Unusable,
}

impl Constant {
    /// Entries occupying two pool slots
    #[inline]
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    fn read(reader: &mut Reader<'_>, index: u16) -> Result<Self, ClassFileError> {
        let tag = reader.u8()?;
        let constant = match tag {
            1 => {
                let len = usize::from(reader.u16()?);
                Self::Utf8(reader.take(len)?.to_vec())
            }
            3 => Self::Integer(reader.u32()? as i32),
            4 => Self::Float(reader.u32()?),
            5 => Self::Long(reader.u64()? as i64),
            6 => Self::Double(reader.u64()?),
            7 => Self::Class { name_index: reader.u16()? },
            8 => Self::String { string_index: reader.u16()? },
            9 => Self::FieldRef {
                class_index: reader.u16()?,
                name_and_type_index: reader.u16()?,
            },
            10 => Self::MethodRef {
                class_index: reader.u16()?,
                name_and_type_index: reader.u16()?,
            },
            11 => Self::InterfaceMethodRef {
                class_index: reader.u16()?,
                name_and_type_index: reader.u16()?,
            },
            12 => Self::NameAndType {
                name_index: reader.u16()?,
                descriptor_index: reader.u16()?,
            },
            15 => Self::MethodHandle {
                reference_kind: reader.u8()?,
                reference_index: reader.u16()?,
            },
            16 => Self::MethodType { descriptor_index: reader.u16()? },
            17 => Self::Dynamic {
                bootstrap_method_attr_index: reader.u16()?,
                name_and_type_index: reader.u16()?,
            },
            18 => Self::InvokeDynamic {
                bootstrap_method_attr_index: reader.u16()?,
                name_and_type_index: reader.u16()?,
            },
            19 => Self::Module { name_index: reader.u16()? },
            20 => Self::Package { name_index: reader.u16()? },
            tag => return Err(ClassFileError::UnknownConstantTag { index, tag }),
        };
        Ok(constant)
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        match self {
            Self::Utf8(bytes) => {
                out.put_u8(1);
                let len = u16::try_from(bytes.len())
                    .map_err(|_| ClassFileError::AttributeTooLarge(bytes.len()))?;
                out.put_u16(len);
                out.extend_from_slice(bytes);
            }
            Self::Integer(v) => {
                out.put_u8(3);
                out.put_u32(*v as u32);
            }
            Self::Float(bits) => {
                out.put_u8(4);
                out.put_u32(*bits);
            }
            Self::Long(v) => {
                out.put_u8(5);
                out.put_u64(*v as u64);
            }
            Self::Double(bits) => {
                out.put_u8(6);
                out.put_u64(*bits);
            }
            Self::Class { name_index } => {
                out.put_u8(7);
                out.put_u16(*name_index);
            }
            Self::String { string_index } => {
                out.put_u8(8);
                out.put_u16(*string_index);
            }
            Self::FieldRef { class_index, name_and_type_index } => {
                out.put_u8(9);
                out.put_u16(*class_index);
                out.put_u16(*name_and_type_index);
            }
            Self::MethodRef { class_index, name_and_type_index } => {
                out.put_u8(10);
                out.put_u16(*class_index);
                out.put_u16(*name_and_type_index);
            }
            Self::InterfaceMethodRef { class_index, name_and_type_index } => {
                out.put_u8(11);
                out.put_u16(*class_index);
                out.put_u16(*name_and_type_index);
            }
            Self::NameAndType { name_index, descriptor_index } => {
                out.put_u8(12);
                out.put_u16(*name_index);
                out.put_u16(*descriptor_index);
            }
            Self::MethodHandle { reference_kind, reference_index } => {
                out.put_u8(15);
                out.put_u8(*reference_kind);
                out.put_u16(*reference_index);
            }
            Self::MethodType { descriptor_index } => {
                out.put_u8(16);
                out.put_u16(*descriptor_index);
            }
            Self::Dynamic { bootstrap_method_attr_index, name_and_type_index } => {
                out.put_u8(17);
                out.put_u16(*bootstrap_method_attr_index);
                out.put_u16(*name_and_type_index);
            }
            Self::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
                out.put_u8(18);
                out.put_u16(*bootstrap_method_attr_index);
                out.put_u16(*name_and_type_index);
            }
            Self::Module { name_index } => {
                out.put_u8(19);
                out.put_u16(*name_index);
            }
            Self::Package { name_index } => {
                out.put_u8(20);
                out.put_u16(*name_index);
            }
            Self::Unusable => {}
        }
        Ok(())
    }
}

/// Constant pool (index 0 is reserved by the format and not stored)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Create empty pool
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `constant_pool_count` as written in the file (slots + 1)
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len() + 1
    }

    /// Entry at a 1-based index
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        let slot = usize::from(index).checked_sub(1)?;
        self.entries.get(slot).filter(|c| **c != Constant::Unusable)
    }

    /// Iterate `(index, constant)` over usable entries
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != Constant::Unusable)
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    /// Decoded string of a `Utf8` entry
    ///
    /// # Errors
    /// Returns error if the index is not a `Utf8` entry or is malformed
    pub fn utf8(&self, index: u16) -> Result<String, ClassFileError> {
        match self.get(index) {
            Some(Constant::Utf8(bytes)) => mutf8::decode(bytes),
            _ => Err(ClassFileError::invalid_index(index, "Utf8")),
        }
    }

    /// Raw bytes of a `Utf8` entry
    ///
    /// # Errors
    /// Returns error if the index is not a `Utf8` entry
    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8], ClassFileError> {
        match self.get(index) {
            Some(Constant::Utf8(bytes)) => Ok(bytes),
            _ => Err(ClassFileError::invalid_index(index, "Utf8")),
        }
    }

    /// Class name referenced by a `Class` entry
    ///
    /// # Errors
    /// Returns error if the index is not a `Class` entry or the name is invalid
    pub fn class_name(&self, index: u16) -> Result<ClassName, ClassFileError> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => {
                Ok(ClassName::from_internal(&self.utf8(*name_index)?)?)
            }
            _ => Err(ClassFileError::invalid_index(index, "Class")),
        }
    }

    /// Index of an existing `Utf8` entry equal to `value`
    #[must_use]
    pub fn find_utf8(&self, value: &str) -> Option<u16> {
        let encoded = mutf8::encode(value);
        self.iter().find_map(|(i, c)| match c {
            Constant::Utf8(bytes) if *bytes == encoded => Some(i),
            _ => None,
        })
    }

    /// Append an entry, returning its index
    ///
    /// # Errors
    /// Returns [`ClassFileError::ConstantPoolOverflow`] past 65535 slots
    pub fn push(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.count() + slots > usize::from(u16::MAX) {
            return Err(ClassFileError::ConstantPoolOverflow);
        }
        let index = self.count() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Find or append a `Utf8` entry
    ///
    /// # Errors
    /// Returns error on pool overflow
    pub fn utf8_index(&mut self, value: &str) -> Result<u16, ClassFileError> {
        match self.find_utf8(value) {
            Some(index) => Ok(index),
            None => self.push(Constant::Utf8(mutf8::encode(value))),
        }
    }

    /// Find or append an `Integer` entry
    ///
    /// # Errors
    /// Returns error on pool overflow
    pub fn integer_index(&mut self, value: i32) -> Result<u16, ClassFileError> {
        let existing = self.iter().find_map(|(i, c)| match c {
            Constant::Integer(v) if *v == value => Some(i),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Integer(value)),
        }
    }

    /// Find or append a `Class` entry for `name`
    ///
    /// # Errors
    /// Returns error on pool overflow
    pub fn class_index(&mut self, name: &ClassName) -> Result<u16, ClassFileError> {
        let name_index = self.utf8_index(&name.to_internal())?;
        let existing = self.iter().find_map(|(i, c)| match c {
            Constant::Class { name_index: n } if *n == name_index => Some(i),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Class { name_index }),
        }
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()?;
        let mut pool = Self::new();
        let mut index: u16 = 1;
        while index < count {
            let constant = Constant::read(reader, index)?;
            let wide = constant.is_wide();
            pool.entries.push(constant);
            if wide {
                pool.entries.push(Constant::Unusable);
                index = index.saturating_add(2);
            } else {
                index += 1;
            }
        }
        Ok(pool)
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        let count =
            u16::try_from(self.count()).map_err(|_| ClassFileError::ConstantPoolOverflow)?;
        out.put_u16(count);
        for constant in &self.entries {
            constant.write(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_one_based_indices() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.push(Constant::Utf8(b"a".to_vec())).unwrap(), 1);
        assert_eq!(pool.push(Constant::Long(7)).unwrap(), 2);
        assert_eq!(pool.push(Constant::Integer(1)).unwrap(), 4);
        assert_eq!(pool.count(), 5);
        assert!(pool.get(3).is_none());
        assert!(pool.get(0).is_none());
    }

    #[test]
    fn utf8_index_reuses_entries() {
        let mut pool = ConstantPool::new();
        let first = pool.utf8_index("Z").unwrap();
        let second = pool.utf8_index("Z").unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn class_name_resolves_through_utf8() {
        let mut pool = ConstantPool::new();
        let name = ClassName::new("test.Example").unwrap();
        let index = pool.class_index(&name).unwrap();
        assert_eq!(pool.class_name(index).unwrap(), name);
        assert_eq!(pool.utf8(1).unwrap(), "test/Example");
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut pool = ConstantPool::new();
        pool.push(Constant::Integer(3)).unwrap();
        assert!(matches!(
            pool.utf8(1),
            Err(ClassFileError::InvalidConstantIndex { index: 1, expected: "Utf8" })
        ));
        assert!(pool.class_name(9).is_err());
    }

    #[test]
    fn encode_decode_keeps_wide_slots() {
        let mut pool = ConstantPool::new();
        pool.push(Constant::Double(1.5f64.to_bits())).unwrap();
        pool.push(Constant::Utf8(b"x".to_vec())).unwrap();

        let mut out = Vec::new();
        pool.write(&mut out).unwrap();
        let decoded = ConstantPool::read(&mut Reader::new(&out)).unwrap();
        assert_eq!(decoded, pool);
        assert_eq!(decoded.utf8(3).unwrap(), "x");
    }
}
