//! Artifact locator
//!
//! Enumerates the logical names of every `.class` file below a root
//! directory. The walk is lazy and runs once; call [`locate`] again for a
//! fresh pass.

use classforge_classfile::{ClassName, NameError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::LocatorError;

/// Lazy, finite iterator over candidate names
///
/// Yields `None` for an entry that could not be read during the walk or
/// whose path does not map to a class name.
pub struct ClassNames {
    root: PathBuf,
    walk: walkdir::IntoIter,
}

impl std::fmt::Debug for ClassNames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassNames").field("root", &self.root).finish_non_exhaustive()
    }
}

impl Iterator for ClassNames {
    type Item = Option<ClassName>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry under {}: {}", self.root.display(), err);
                    return Some(None);
                }
            };
            if !entry.file_type().is_file() || !is_class_file(entry.path()) {
                continue;
            }
            return Some(match class_name_from_path(&self.root, entry.path()) {
                Ok(name) => Some(name),
                Err(err) => {
                    tracing::debug!("Skipping {}: {}", entry.path().display(), err);
                    None
                }
            });
        }
    }
}

fn is_class_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "class")
}

/// Start a walk of `root`
///
/// # Errors
/// Returns [`LocatorError::UnreadableRoot`] if `root` is missing, not a
/// directory, or cannot be listed
pub fn locate(root: &Path) -> Result<ClassNames, LocatorError> {
    let meta = std::fs::metadata(root).map_err(|e| LocatorError::unreadable_root(root, e))?;
    if !meta.is_dir() {
        return Err(LocatorError::unreadable_root(
            root,
            std::io::Error::other("not a directory"),
        ));
    }
    std::fs::read_dir(root).map_err(|e| LocatorError::unreadable_root(root, e))?;

    Ok(ClassNames {
        root: root.to_path_buf(),
        walk: WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter(),
    })
}

/// Logical name of the class file at `path` below `root`
///
/// # Errors
/// Returns error if `path` is not under `root` or does not name a class file
pub fn class_name_from_path(root: &Path, path: &Path) -> Result<ClassName, NameError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| NameError::NotRelative(path.to_path_buf()))?;
    ClassName::from_relative_path(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn names(root: &Path) -> BTreeSet<String> {
        locate(root)
            .unwrap()
            .flatten()
            .map(|n| n.to_string())
            .collect()
    }

    #[test]
    fn finds_class_files_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Top.class");
        touch(dir.path(), "test/Example.class");
        touch(dir.path(), "test/Outer$Inner.class");
        touch(dir.path(), "a/b/c/Deep.class");
        touch(dir.path(), "test/readme.txt");
        touch(dir.path(), "test/Example.class.bak");
        std::fs::create_dir_all(dir.path().join("empty.class")).unwrap();

        let expected: BTreeSet<String> = ["Top", "test.Example", "test.Outer$Inner", "a.b.c.Deep"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names(dir.path()), expected);
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LocatorError::UnreadableRoot { .. }));

        touch(dir.path(), "file.class");
        assert!(locate(&dir.path().join("file.class")).is_err());
    }

    #[test]
    fn each_pass_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/B.class");
        assert_eq!(names(dir.path()).len(), 1);
        touch(dir.path(), "a/C.class");
        assert_eq!(names(dir.path()).len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_yield_none() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let bad = OsStr::from_bytes(b"Bad\xFF.class");
        std::fs::write(dir.path().join(bad), b"").unwrap();
        touch(dir.path(), "Good.class");

        let all: Vec<Option<ClassName>> = locate(dir.path()).unwrap().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|n| n.is_none()).count(), 1);
    }

    #[test]
    fn class_name_from_path_requires_root_prefix() {
        let root = Path::new("/build/classes");
        assert_eq!(
            class_name_from_path(root, Path::new("/build/classes/test/Example.class"))
                .unwrap()
                .as_str(),
            "test.Example"
        );
        assert!(class_name_from_path(root, Path::new("/elsewhere/X.class")).is_err());
    }
}
