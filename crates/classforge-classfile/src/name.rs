//! Logical class names
//!
//! Provides [`ClassName`], the dot-separated name identifying a compiled class
//! across classpath entries, together with its internal (slash separated) and
//! file-path forms.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// File suffix of compiled class artifacts
pub const CLASS_FILE_SUFFIX: &str = ".class";

/// Separator between nested class simple names
pub const NESTED_SEPARATOR: char = '$';

/// Logical (dotted) name of a class
///
/// # Examples
/// - `test.Example` → internal `test/Example`, path `test/Example.class`
/// - `test.Outer$Inner` → internal `test/Outer$Inner`, path `test/Outer$Inner.class`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    /// Create a class name from its dotted form
    ///
    /// # Errors
    /// Returns error if the name is empty, has an empty segment or contains
    /// characters that cannot appear in a binary class name
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Create a class name from the internal form used inside class files
    /// (`java/lang/Object`)
    ///
    /// # Errors
    /// Same as [`ClassName::new`]
    pub fn from_internal(internal: &str) -> Result<Self, NameError> {
        Self::new(internal.replace('/', "."))
    }

    /// Derive a class name from a class file path relative to a classpath root
    ///
    /// `foo/bar/MyApp.class` → `foo.bar.MyApp`
    ///
    /// # Errors
    /// Returns error if the path is not a relative `.class` path made of
    /// UTF-8 components
    pub fn from_relative_path(path: &Path) -> Result<Self, NameError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| NameError::NonUtf8(path.to_path_buf()))?;
                    segments.push(part);
                }
                Component::CurDir => {}
                _ => return Err(NameError::NotRelative(path.to_path_buf())),
            }
        }
        let last = segments
            .pop()
            .ok_or_else(|| NameError::NotRelative(path.to_path_buf()))?;
        let stem = last
            .strip_suffix(CLASS_FILE_SUFFIX)
            .ok_or_else(|| NameError::MissingSuffix(path.to_path_buf()))?;
        segments.push(stem);
        Self::new(segments.join("."))
    }

    /// Dotted form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Internal form (`a/b/C`)
    #[inline]
    #[must_use]
    pub fn to_internal(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Iterator over the dot-separated segments
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Package part (`a.b` for `a.b.C`), `None` for the default package
    #[inline]
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(package, _)| package)
    }

    /// Last segment, including any nested class suffix
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, simple)| simple)
    }

    /// Path of the class file relative to a classpath root
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if let Some(package) = self.package() {
            path.extend(package.split('.'));
        }
        path.push(format!("{}{CLASS_FILE_SUFFIX}", self.simple_name()));
        path
    }

    /// Whether this names a nested (member, local or anonymous) class
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.simple_name().contains(NESTED_SEPARATOR)
    }

    /// Whether this is an immediate member of `outer`
    ///
    /// `a.Outer$Inner` is an immediate member of `a.Outer`;
    /// `a.Outer$Inner$Deep` is not.
    #[must_use]
    pub fn is_immediate_member_of(&self, outer: &ClassName) -> bool {
        self.0
            .strip_prefix(outer.as_str())
            .and_then(|rest| rest.strip_prefix(NESTED_SEPARATOR))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains(NESTED_SEPARATOR))
    }

    /// Whether this class lives in `package` or one of its subpackages
    #[must_use]
    pub fn is_in_package(&self, package: &str) -> bool {
        let package = package.trim_end_matches('.');
        package.is_empty()
            || self
                .0
                .strip_prefix(package)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

fn validate(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.split('.').any(str::is_empty) {
        return Err(NameError::EmptySegment(name.to_string()));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | ';' | '[')) {
        return Err(NameError::InvalidCharacter {
            name: name.to_string(),
            character: c,
        });
    }
    Ok(())
}

impl Display for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClassName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors building class names
#[derive(Debug, thiserror::Error)]
pub enum NameError {
    /// Empty name
    #[error("class name is empty")]
    Empty,

    /// Empty segment between dots
    #[error("class name '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Character not allowed in a binary class name
    #[error("class name '{name}' contains invalid character '{character}'")]
    InvalidCharacter { name: String, character: char },

    /// Path component is not valid UTF-8
    #[error("path {} is not valid UTF-8", .0.display())]
    NonUtf8(PathBuf),

    /// Path is absolute, empty or escapes its root
    #[error("path {} is not a relative class file path", .0.display())]
    NotRelative(PathBuf),

    /// Path does not end in `.class`
    #[error("path {} does not end in .class", .0.display())]
    MissingSuffix(PathBuf),
}
